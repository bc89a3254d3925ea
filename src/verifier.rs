//! Answer checking for a single compiled step.
//!
//! `check` never fails: malformed learner input is a wrong answer with zero
//! score, not an error. Select steps compare normalized labels; input steps go
//! through the symbolic engine.

use serde::Serialize;
use tracing::{debug, error};

use crate::domain::{StepKind, StepSpec};
use crate::symbolic::{equivalent_text, ParseError};
use crate::util::{normalize_choice, trunc_for_log};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerificationResult {
  pub ok: bool,
  pub score: f64,
  /// Canonical value shown as feedback; absent for ungraded steps.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub correct: Option<String>,
}

impl VerificationResult {
  fn graded(step: &StepSpec, ok: bool) -> Self {
    Self {
      ok,
      score: if ok { step.points } else { 0.0 },
      correct: step.canonical_answer.clone(),
    }
  }
}

pub fn check(step: &StepSpec, submitted: &str) -> VerificationResult {
  let result = match step.kind {
    StepKind::Select => check_select(step, submitted),
    StepKind::Input => check_input(step, submitted),
  };
  debug!(
    target: "series",
    step = %step.key,
    submitted = %trunc_for_log(submitted, 64),
    ok = result.ok,
    score = result.score,
    "Step checked"
  );
  result
}

fn check_select(step: &StepSpec, submitted: &str) -> VerificationResult {
  let given = normalize_choice(submitted);
  let ok = match &step.canonical_answer {
    Some(canonical) => given == normalize_choice(canonical),
    // no canonical choice: any declared option is acceptable
    None => step
      .options
      .as_deref()
      .unwrap_or_default()
      .iter()
      .any(|o| normalize_choice(o) == given),
  };
  VerificationResult::graded(step, ok)
}

fn check_input(step: &StepSpec, submitted: &str) -> VerificationResult {
  let Some(canonical) = &step.canonical_answer else {
    // ungraded free text
    return VerificationResult { ok: true, score: step.points, correct: None };
  };
  match equivalent_text(submitted, canonical) {
    Ok(ok) => VerificationResult::graded(step, ok),
    Err(e) => {
      if crate::symbolic::parse(canonical).is_err() {
        error!(target: "series", step = %step.key, %canonical, "Canonical answer does not parse");
      } else {
        log_rejected_input(step, submitted, &e);
      }
      VerificationResult::graded(step, false)
    }
  }
}

fn log_rejected_input(step: &StepSpec, submitted: &str, e: &ParseError) {
  debug!(
    target: "series",
    step = %step.key,
    submitted = %trunc_for_log(submitted, 64),
    error = %e,
    "Submitted expression rejected"
  );
}
