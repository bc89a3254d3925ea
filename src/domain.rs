//! Domain models: problem instances (one variant per family), convergence
//! classifications, justification criteria and compiled step specifications.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::rational::Rational;

/// A fully parameterized exercise. The `topic_id` tag doubles as the family id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "topic_id")]
pub enum ProblemInstance {
  /// sum_{k>=0} (b/c)^k
  #[serde(rename = "geometric_ratio")]
  GeometricRatio { b: i64, c: i64 },
  /// sum_{k>=0} 1/(1+c)^k
  #[serde(rename = "geometric_reciprocal")]
  GeometricReciprocal { c: i64 },
  /// sum_{k>=1} (b + p k^2)/(c k^2 + d k)
  #[serde(rename = "rational_quadratic")]
  RationalQuadratic { b: i64, c: i64, d: i64, p: i64 },
  /// sum_{k>=0} (b + p k)/(c k - d)
  #[serde(rename = "rational_linear")]
  RationalLinear { b: i64, c: i64, d: i64, p: i64 },
}

/// How the general term behaves as the index grows without bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermLimit {
  /// Finite limit with the exact value.
  Finite(Rational),
  /// |a_k| grows without bound or oscillates without settling.
  NotZero,
}

impl ProblemInstance {
  pub fn topic_id(&self) -> &'static str {
    match self {
      ProblemInstance::GeometricRatio { .. } => "geometric_ratio",
      ProblemInstance::GeometricReciprocal { .. } => "geometric_reciprocal",
      ProblemInstance::RationalQuadratic { .. } => "rational_quadratic",
      ProblemInstance::RationalLinear { .. } => "rational_linear",
    }
  }

  fn params(&self) -> Vec<i64> {
    match *self {
      ProblemInstance::GeometricRatio { b, c } => vec![b, c],
      ProblemInstance::GeometricReciprocal { c } => vec![c],
      ProblemInstance::RationalQuadratic { b, c, d, p } | ProblemInstance::RationalLinear { b, c, d, p } => {
        vec![b, c, d, p]
      }
    }
  }

  /// Index of the first summed term.
  pub fn first_index(&self) -> i64 {
    match self {
      ProblemInstance::RationalQuadratic { .. } => 1,
      _ => 0,
    }
  }

  /// Common ratio for the geometric families.
  pub fn ratio(&self) -> Option<Rational> {
    match *self {
      ProblemInstance::GeometricRatio { b, c } => Rational::new(b as i128, c as i128),
      ProblemInstance::GeometricReciprocal { c } => Rational::new(1, 1 + c as i128),
      _ => None,
    }
  }

  /// Check the family invariants: every term defined, nothing degenerate.
  pub fn validate(&self) -> Result<(), CoreError> {
    let fail = |why: &str| Err(CoreError::InvalidProblem(format!("{}: {why}", self.topic_id())));
    match *self {
      ProblemInstance::GeometricRatio { b, c } => {
        if c == 0 { return fail("zero denominator"); }
        if b == 0 { return fail("zero ratio"); }
        if b == c { return fail("ratio equal to 1"); }
      }
      ProblemInstance::GeometricReciprocal { c } => {
        if c == -1 { return fail("zero denominator"); }
        if c == 0 { return fail("ratio equal to 1"); }
      }
      ProblemInstance::RationalQuadratic { b, c, d, p } => {
        if c <= 0 { return fail("leading denominator coefficient must be positive"); }
        // c k^2 + d k vanishes at k = -d/c, which must not be a summed index
        if d < 0 && (-d) % c == 0 { return fail("denominator vanishes at a summed index"); }
        if b == 0 && p == 0 { return fail("term is zero"); }
        if b == 0 && d == 0 { return fail("term is constant"); }
      }
      ProblemInstance::RationalLinear { b, c, d, p } => {
        if c <= 0 { return fail("leading denominator coefficient must be positive"); }
        if d >= 0 && d % c == 0 { return fail("denominator vanishes at a summed index"); }
        if b as i128 * c as i128 + p as i128 * d as i128 == 0 { return fail("term is constant"); }
      }
    }
    Ok(())
  }

  /// Exact value of the general term at index `k`.
  pub fn term(&self, k: i64) -> Option<Rational> {
    let k = k as i128;
    match *self {
      ProblemInstance::GeometricRatio { .. } | ProblemInstance::GeometricReciprocal { .. } => {
        self.ratio()?.checked_pow(i32::try_from(k).ok()?)
      }
      ProblemInstance::RationalQuadratic { b, c, d, p } => {
        let num = (b as i128).checked_add((p as i128).checked_mul(k.checked_mul(k)?)?)?;
        let den = (c as i128).checked_mul(k.checked_mul(k)?)?.checked_add((d as i128).checked_mul(k)?)?;
        Rational::new(num, den)
      }
      ProblemInstance::RationalLinear { b, c, d, p } => {
        let num = (b as i128).checked_add((p as i128).checked_mul(k)?)?;
        let den = (c as i128).checked_mul(k)?.checked_sub(d as i128)?;
        Rational::new(num, den)
      }
    }
  }

  /// Sum of the terms from the first index through `n` inclusive.
  pub fn partial_sum(&self, n: i64) -> Option<Rational> {
    (self.first_index()..=n).try_fold(Rational::ZERO, |acc, k| acc.checked_add(&self.term(k)?))
  }

  /// Limit of the general term.
  pub fn term_limit(&self) -> Option<TermLimit> {
    match *self {
      ProblemInstance::GeometricRatio { .. } | ProblemInstance::GeometricReciprocal { .. } => {
        let r = self.ratio()?;
        Some(if r.abs() < Rational::ONE { TermLimit::Finite(Rational::ZERO) } else { TermLimit::NotZero })
      }
      ProblemInstance::RationalQuadratic { c, p, .. } | ProblemInstance::RationalLinear { c, p, .. } => {
        Rational::new(p as i128, c as i128).map(TermLimit::Finite)
      }
    }
  }

  /// Closed-form sum of a convergent geometric series from `start` on.
  pub fn geometric_tail(&self, start: i32) -> Option<Rational> {
    let r = self.ratio()?;
    if r.abs() >= Rational::ONE {
      return None;
    }
    r.checked_pow(start)?.checked_div(&Rational::ONE.checked_sub(&r)?)
  }

  /// Plain-text general term, e.g. `(2/5)^k` or `(-3 + 2k^2)/(4k^2 + 5k)`.
  pub fn general_term(&self) -> String {
    match *self {
      ProblemInstance::GeometricRatio { .. } => match self.ratio() {
        Some(r) => format!("({r})^k"),
        None => "undefined".into(),
      },
      ProblemInstance::GeometricReciprocal { c } => format!("1/(1 + {c})^k").replace("+ -", "- "),
      ProblemInstance::RationalQuadratic { b, c, d, p } => {
        format!("({})/({})", poly(&[(b, ""), (p, "k^2")]), poly(&[(c, "k^2"), (d, "k")]))
      }
      ProblemInstance::RationalLinear { b, c, d, p } => {
        format!("({})/({})", poly(&[(b, ""), (p, "k")]), poly(&[(c, "k"), (-d, "")]))
      }
    }
  }

  /// Plain-text statement of the whole series.
  pub fn statement(&self) -> String {
    format!("sum_{{k={}}}^{{oo}} {}", self.first_index(), self.general_term())
  }

  /// Stable seed for step-level random choices (FNV-1a over tag and parameters).
  pub fn derived_seed(&self) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let bytes = self
      .topic_id()
      .bytes()
      .chain(self.params().into_iter().flat_map(i64::to_le_bytes));
    bytes.fold(OFFSET, |h, b| (h ^ b as u64).wrapping_mul(PRIME))
  }
}

/// Render `a + b k^2 ...` skipping zero coefficients and folding signs.
fn poly(terms: &[(i64, &str)]) -> String {
  let mut out = String::new();
  for &(coef, var) in terms {
    if coef == 0 {
      continue;
    }
    let mag = coef.unsigned_abs();
    let body = match (mag, var.is_empty()) {
      (_, true) => mag.to_string(),
      (1, false) => var.to_string(),
      _ => format!("{mag}{var}"),
    };
    if out.is_empty() {
      if coef < 0 { out.push('-'); }
      out.push_str(&body);
    } else {
      out.push_str(if coef < 0 { " - " } else { " + " });
      out.push_str(&body);
    }
  }
  if out.is_empty() { "0".into() } else { out }
}

/// Outcome of the convergence question. All four labels are offered;
/// `Undefined` is never the canonical answer for the built-in families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
  Converges,
  Diverges,
  Undetermined,
  Undefined,
}

impl Classification {
  pub const ALL: [Classification; 4] = [
    Classification::Converges,
    Classification::Diverges,
    Classification::Undetermined,
    Classification::Undefined,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Classification::Converges => "converges",
      Classification::Diverges => "diverges",
      Classification::Undetermined => "undetermined",
      Classification::Undefined => "undefined",
    }
  }
}

impl fmt::Display for Classification {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Named convergence tests offered in the justification step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
  NecessaryCondition,
  GeometricSeries,
  Comparison,
  Ratio,
  Root,
  Integral,
}

impl Criterion {
  pub const ALL: [Criterion; 6] = [
    Criterion::NecessaryCondition,
    Criterion::GeometricSeries,
    Criterion::Comparison,
    Criterion::Ratio,
    Criterion::Root,
    Criterion::Integral,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Criterion::NecessaryCondition => "necessary condition",
      Criterion::GeometricSeries => "geometric series test",
      Criterion::Comparison => "comparison test",
      Criterion::Ratio => "ratio test",
      Criterion::Root => "root test",
      Criterion::Integral => "integral test",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
  /// Free-form symbolic input.
  Input,
  /// Single choice among `options`.
  Select,
}

/// One gradeable sub-question of a compiled problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
  pub key: String,
  pub kind: StepKind,
  pub label: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
  pub points: f64,
  /// Expression text for input steps, option label for select steps;
  /// `None` marks an ungraded step.
  #[serde(default)]
  pub canonical_answer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn q(n: i128, d: i128) -> Rational {
    Rational::new(n, d).unwrap()
  }

  #[test]
  fn serde_uses_topic_id_tag() {
    let p = ProblemInstance::GeometricRatio { b: 2, c: 5 };
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json, serde_json::json!({"topic_id": "geometric_ratio", "b": 2, "c": 5}));
    let back: ProblemInstance = serde_json::from_value(json).unwrap();
    assert_eq!(back, p);
  }

  #[test]
  fn geometric_terms_and_sums() {
    let p = ProblemInstance::GeometricRatio { b: 2, c: 5 };
    assert_eq!(p.term(3).unwrap(), q(8, 125));
    assert_eq!(p.partial_sum(2).unwrap(), q(39, 25));
    assert_eq!(p.geometric_tail(0).unwrap(), q(5, 3));
    assert_eq!(p.geometric_tail(2).unwrap(), q(4, 15));
    assert_eq!(p.term_limit(), Some(TermLimit::Finite(Rational::ZERO)));
    let r = ProblemInstance::GeometricReciprocal { c: -4 };
    assert_eq!(r.ratio().unwrap(), q(-1, 3));
    assert_eq!(ProblemInstance::GeometricRatio { b: -3, c: 2 }.term_limit(), Some(TermLimit::NotZero));
    assert!(ProblemInstance::GeometricRatio { b: 3, c: 2 }.geometric_tail(0).is_none());
  }

  #[test]
  fn rational_terms_and_limits() {
    let quad = ProblemInstance::RationalQuadratic { b: -3, c: 4, d: 5, p: 2 };
    assert_eq!(quad.term(1).unwrap(), q(-1, 9));
    assert_eq!(quad.term_limit(), Some(TermLimit::Finite(q(1, 2))));
    assert_eq!(quad.partial_sum(2).unwrap(), q(-1, 9).checked_add(&q(5, 26)).unwrap());

    let lin = ProblemInstance::RationalLinear { b: 1, c: 2, d: 3, p: 0 };
    assert_eq!(lin.term(0).unwrap(), q(-1, 3));
    assert_eq!(lin.term_limit(), Some(TermLimit::Finite(Rational::ZERO)));
  }

  #[test]
  fn validation_rejects_degenerate_parameters() {
    assert!(ProblemInstance::GeometricRatio { b: 4, c: 4 }.validate().is_err());
    assert!(ProblemInstance::GeometricRatio { b: 0, c: 4 }.validate().is_err());
    assert!(ProblemInstance::GeometricReciprocal { c: -1 }.validate().is_err());
    assert!(ProblemInstance::RationalLinear { b: 1, c: 2, d: 4, p: 1 }.validate().is_err());
    assert!(ProblemInstance::RationalLinear { b: 1, c: 3, d: 0, p: 1 }.validate().is_err());
    // (2 + 6k)/(3k + 1) is identically 2
    assert!(ProblemInstance::RationalLinear { b: 2, c: 3, d: -1, p: 6 }.validate().is_err());
    assert!(ProblemInstance::RationalQuadratic { b: -1, c: 2, d: -4, p: 0 }.validate().is_err());
    assert!(ProblemInstance::RationalQuadratic { b: -3, c: 4, d: 5, p: 2 }.validate().is_ok());
  }

  #[test]
  fn all_zero_numerator_is_rejected() {
    let zero = ProblemInstance::RationalQuadratic { b: 0, c: 3, d: 5, p: 0 };
    match zero.validate() {
      Err(CoreError::InvalidProblem(why)) => assert_eq!(why, "rational_quadratic: term is zero"),
      other => panic!("expected invalid problem, got {other:?}"),
    }
    assert!(ProblemInstance::RationalQuadratic { b: 0, c: 3, d: 5, p: 1 }.validate().is_ok());
    assert!(ProblemInstance::RationalQuadratic { b: 2, c: 3, d: 5, p: 0 }.validate().is_ok());
  }

  #[test]
  fn formulas_render_as_plain_text() {
    let quad = ProblemInstance::RationalQuadratic { b: -3, c: 4, d: 5, p: 2 };
    assert_eq!(quad.general_term(), "(-3 + 2k^2)/(4k^2 + 5k)");
    assert_eq!(quad.statement(), "sum_{k=1}^{oo} (-3 + 2k^2)/(4k^2 + 5k)");
    let lin = ProblemInstance::RationalLinear { b: 7, c: 1, d: 0, p: -1 };
    assert_eq!(lin.general_term(), "(7 - k)/(k)");
    assert_eq!(ProblemInstance::GeometricReciprocal { c: -4 }.general_term(), "1/(1 - 4)^k");
    assert_eq!(ProblemInstance::GeometricRatio { b: 4, c: -6 }.general_term(), "(-2/3)^k");
  }

  #[test]
  fn derived_seed_is_stable_and_parameter_sensitive() {
    let a = ProblemInstance::RationalLinear { b: 1, c: 2, d: 3, p: 4 };
    let b = ProblemInstance::RationalLinear { b: 1, c: 2, d: 3, p: 5 };
    assert_eq!(a.derived_seed(), a.clone().derived_seed());
    assert_ne!(a.derived_seed(), b.derived_seed());
    let quad = ProblemInstance::RationalQuadratic { b: 1, c: 2, d: 3, p: 4 };
    assert_ne!(a.derived_seed(), quad.derived_seed());
  }
}
