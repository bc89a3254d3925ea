//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Normalize a choice label for comparison: case-folded, `ё` folded to `е`,
/// trimmed, inner whitespace collapsed to single spaces.
pub fn normalize_choice(s: &str) -> String {
  s.split_whitespace()
    .map(|w| w.to_lowercase().replace('ё', "е"))
    .collect::<Vec<_>>()
    .join(" ")
}

/// Log-safe truncation for learner-supplied strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}

/// Round to two decimals (percentages in attempt reports).
pub fn round2(v: f64) -> f64 {
  (v * 100.0).round() / 100.0
}
