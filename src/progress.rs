//! Attempt progress: per-question step cursor, submissions and final scoring.
//!
//! The tracker owns no storage. Callers keep the compiled `QuestionSlot`s and
//! the `AttemptState` wherever they like, hand them in for every operation and
//! persist whatever comes back. Failed transitions leave the state untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compiler::compile_with;
use crate::config::ScoringConfig;
use crate::domain::{ProblemInstance, StepKind, StepSpec};
use crate::error::CoreError;
use crate::registry::Registry;
use crate::util::round2;
use crate::verifier::check;

/// One compiled question of a test, as stored by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionSlot {
  pub order: u32,
  pub topic_id: String,
  pub problem: ProblemInstance,
  pub steps: Vec<StepSpec>,
}

/// Generate and compile one question per topic id; orders start at 1.
/// Any unknown topic fails the whole batch.
pub fn build_test(
  registry: &Registry,
  topic_ids: &[String],
  complexity: u32,
  scoring: &ScoringConfig,
) -> Result<Vec<QuestionSlot>, CoreError> {
  let mut slots = Vec::with_capacity(topic_ids.len());
  for (i, topic_id) in topic_ids.iter().enumerate() {
    let problem = registry.create(topic_id, complexity)?;
    let steps = compile_with(&problem, scoring)?;
    slots.push(QuestionSlot { order: i as u32 + 1, topic_id: topic_id.clone(), problem, steps });
  }
  info!(target: "series", questions = slots.len(), complexity, "Test built");
  Ok(slots)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepState {
  pub key: String,
  pub value: Option<String>,
  pub ok: bool,
  pub score: f64,
  pub points: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionState {
  pub current_step: usize,
  pub done: bool,
  pub steps: Vec<StepState>,
  /// Recorded at start; older states without it fall back to the step weights.
  #[serde(default)]
  pub max_points: Option<f64>,
}

/// Outcome of one accepted submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Submission {
  pub ok: bool,
  pub score: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub correct: Option<String>,
  /// Cursor after the submission.
  pub next_step: usize,
  pub question_done: bool,
}

/// Current step as shown to the learner, without its canonical answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepPrompt {
  pub key: String,
  pub kind: StepKind,
  pub label: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
  pub points: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuestionView {
  pub order: u32,
  pub step_index: usize,
  pub total_steps: usize,
  pub step: Option<StepPrompt>,
  pub question_done: bool,
  pub prev_allowed: bool,
  pub next_allowed: bool,
}

impl QuestionState {
  pub fn new(steps: &[StepSpec]) -> Self {
    Self {
      current_step: 0,
      done: steps.is_empty(),
      steps: steps
        .iter()
        .map(|s| StepState { key: s.key.clone(), value: None, ok: false, score: 0.0, points: s.points })
        .collect(),
      max_points: Some(steps.iter().map(|s| s.points).sum()),
    }
  }

  fn ensure_consistent(&self, steps: &[StepSpec]) -> Result<(), CoreError> {
    if self.steps.len() != steps.len() {
      return Err(CoreError::UnknownState(format!(
        "state has {} steps, question has {}",
        self.steps.len(),
        steps.len()
      )));
    }
    if self.current_step > steps.len() {
      return Err(CoreError::UnknownState(format!("cursor {} past the last step", self.current_step)));
    }
    if self.done != (self.current_step == steps.len()) {
      return Err(CoreError::UnknownState(format!(
        "done is {} with cursor {} of {} steps",
        self.done,
        self.current_step,
        steps.len()
      )));
    }
    if let Some((state, spec)) = self.steps.iter().zip(steps).find(|(state, spec)| state.key != spec.key) {
      return Err(CoreError::UnknownState(format!("step '{}' recorded where '{}' is compiled", state.key, spec.key)));
    }
    Ok(())
  }

  /// Check `value` against the current step and move the cursor on success.
  ///
  /// `key`, when given, must name the current step. A wrong answer is stored
  /// and overwritten by the next submission for the same step.
  pub fn advance(&mut self, steps: &[StepSpec], key: Option<&str>, value: &str) -> Result<Submission, CoreError> {
    self.ensure_consistent(steps)?;
    let idx = self.current_step;
    let Some(spec) = steps.get(idx) else {
      return Err(CoreError::NoMoreSteps);
    };
    if let Some(got) = key {
      if got != spec.key {
        return Err(CoreError::WrongStep { expected: spec.key.clone(), got: got.to_string() });
      }
    }

    let result = check(spec, value);
    let record = &mut self.steps[idx];
    record.value = Some(value.to_string());
    record.ok = result.ok;
    record.score = result.score;
    if result.ok {
      self.current_step = idx + 1;
      self.done = self.current_step == steps.len();
    }
    debug!(
      target: "series",
      step = %spec.key,
      ok = result.ok,
      cursor = self.current_step,
      done = self.done,
      "Submission recorded"
    );
    Ok(Submission {
      ok: result.ok,
      score: result.score,
      correct: result.correct,
      next_step: self.current_step,
      question_done: self.done,
    })
  }

  /// What the learner sees now. A finished question keeps showing its last step.
  pub fn view(&self, order: u32, steps: &[StepSpec]) -> Result<QuestionView, CoreError> {
    self.ensure_consistent(steps)?;
    let idx = self.current_step.min(steps.len().saturating_sub(1));
    let step = steps.get(idx).map(|s| StepPrompt {
      key: s.key.clone(),
      kind: s.kind,
      label: s.label.clone(),
      hint: s.hint.clone(),
      points: s.points,
      options: match s.kind {
        StepKind::Select => s.options.clone(),
        StepKind::Input => None,
      },
    });
    Ok(QuestionView {
      order,
      step_index: idx,
      total_steps: steps.len(),
      step,
      question_done: self.done,
      prev_allowed: idx > 0,
      next_allowed: self.steps.get(idx).is_some_and(|s| s.ok),
    })
  }

  pub fn score(&self) -> f64 {
    self.steps.iter().map(|s| s.score).sum()
  }
}

/// All question states of one attempt, keyed by question order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptState {
  #[serde(with = "order_keys")]
  pub questions: BTreeMap<u32, QuestionState>,
}

/// Question orders travel as JSON object keys. They are parsed by hand because
/// buffered (internally tagged) deserialization will not read "1" as a `u32`.
mod order_keys {
  use std::collections::BTreeMap;

  use serde::de::Error;
  use serde::{Deserialize, Deserializer, Serializer};

  use super::QuestionState;

  pub fn serialize<S: Serializer>(map: &BTreeMap<u32, QuestionState>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(map.iter().map(|(order, q)| (order.to_string(), q)))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<u32, QuestionState>, D::Error> {
    BTreeMap::<String, QuestionState>::deserialize(d)?
      .into_iter()
      .map(|(order, q)| {
        order
          .parse::<u32>()
          .map(|n| (n, q))
          .map_err(|_| D::Error::custom(format!("question order '{order}' is not a number")))
      })
      .collect()
  }
}

impl AttemptState {
  pub fn start(slots: &[QuestionSlot]) -> Self {
    let questions = slots.iter().map(|s| (s.order, QuestionState::new(&s.steps))).collect();
    info!(target: "series", questions = slots.len(), "Attempt started");
    Self { questions }
  }

  fn question(&self, order: u32) -> Result<&QuestionState, CoreError> {
    self.questions.get(&order).ok_or_else(|| CoreError::UnknownState(format!("no state for question {order}")))
  }

  pub fn advance(&mut self, slot: &QuestionSlot, key: Option<&str>, value: &str) -> Result<Submission, CoreError> {
    self
      .questions
      .get_mut(&slot.order)
      .ok_or_else(|| CoreError::UnknownState(format!("no state for question {}", slot.order)))?
      .advance(&slot.steps, key, value)
  }

  pub fn view(&self, slot: &QuestionSlot) -> Result<QuestionView, CoreError> {
    self.question(slot.order)?.view(slot.order, &slot.steps)
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuestionReport {
  pub order: u32,
  pub score: f64,
  pub max: f64,
  pub steps: Vec<StepState>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttemptReport {
  pub total_points: f64,
  pub max_points: f64,
  pub percent: f64,
  pub report: Vec<QuestionReport>,
}

/// Total the attempt question by question. Questions never started count as
/// zero out of their configured weights.
pub fn finish_attempt(slots: &[QuestionSlot], attempt: &AttemptState) -> AttemptReport {
  let mut ordered: Vec<&QuestionSlot> = slots.iter().collect();
  ordered.sort_by_key(|s| s.order);

  let mut total_points = 0.0;
  let mut max_points = 0.0;
  let mut report = Vec::with_capacity(ordered.len());
  for slot in ordered {
    let state = attempt.questions.get(&slot.order);
    let score = state.map(QuestionState::score).unwrap_or(0.0);
    let max = state
      .and_then(|q| q.max_points)
      .unwrap_or_else(|| slot.steps.iter().map(|s| s.points).sum());
    total_points += score;
    max_points += max;
    report.push(QuestionReport {
      order: slot.order,
      score,
      max,
      steps: state.map(|q| q.steps.clone()).unwrap_or_default(),
    });
  }

  let percent = if max_points == 0.0 { 0.0 } else { round2(100.0 * total_points / max_points) };
  info!(target: "series", total_points, max_points, percent, "Attempt finished");
  AttemptReport { total_points, max_points, percent, report }
}
