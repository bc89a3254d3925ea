//! Error kinds surfaced by generation, compilation and attempt tracking.
//!
//! Malformed learner input is not an error at this level: the verifier turns
//! a [`crate::symbolic::ParseError`] into a failed check with zero score.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
  /// No generator is registered under the requested topic id.
  #[error("unknown topic '{0}'")]
  UnknownTopic(String),

  /// Rejection sampling ran out of tries without a valid instance.
  #[error("generator '{topic}' found no valid parameters in {tries} tries")]
  GenerationConstraintExhausted { topic: String, tries: usize },

  /// A problem instance supplied from outside violates its family invariants.
  #[error("invalid problem instance: {0}")]
  InvalidProblem(String),

  /// A classification step would have no determinable canonical answer.
  #[error("convergence of '{0}' cannot be classified")]
  AmbiguousClassification(String),

  /// The submission names a step other than the current one.
  #[error("wrong step: expected '{expected}', got '{got}'")]
  WrongStep { expected: String, got: String },

  /// Every step of the question has already been passed.
  #[error("no more steps")]
  NoMoreSteps,

  /// The stored state does not match the compiled steps (or is missing).
  #[error("unknown or inconsistent state: {0}")]
  UnknownState(String),
}

impl CoreError {
  /// Stable machine-readable code used in API error bodies.
  pub fn code(&self) -> &'static str {
    match self {
      CoreError::UnknownTopic(_) => "unknown_topic",
      CoreError::GenerationConstraintExhausted { .. } => "generation_exhausted",
      CoreError::InvalidProblem(_) => "invalid_problem",
      CoreError::AmbiguousClassification(_) => "ambiguous_classification",
      CoreError::WrongStep { .. } => "wrong_step",
      CoreError::NoMoreSteps => "no_more_steps",
      CoreError::UnknownState(_) => "bad_state",
    }
  }
}
