//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Every function here is a thin, instrumented wrapper over the synchronous
//! engine: it resolves defaults from `AppState` and logs one line per outcome.

use tracing::{info, instrument, warn};

use crate::compiler::{compile, compile_with};
use crate::config::ScoringConfig;
use crate::domain::{ProblemInstance, StepSpec};
use crate::error::CoreError;
use crate::progress::{build_test, finish_attempt, AttemptReport, AttemptState, QuestionSlot, Submission};
use crate::protocol::{to_out, ProblemOut, ViewOut};
use crate::registry::Topic;
use crate::state::AppState;
use crate::verifier::{check, VerificationResult};

pub fn list_topics(state: &AppState) -> Vec<Topic> {
  state.registry.topics()
}

#[instrument(level = "info", skip(state), fields(%topic_id))]
pub fn create_problem(state: &AppState, topic_id: &str, complexity: Option<u32>) -> Result<ProblemOut, CoreError> {
  let complexity = state.complexity(complexity);
  let problem = state.registry.create(topic_id, complexity)?;
  info!(target: "series", %topic_id, complexity, statement = %problem.statement(), "Problem created");
  Ok(to_out(problem))
}

#[instrument(level = "info", skip(state, problem), fields(topic = problem.topic_id()))]
pub fn compile_problem(state: &AppState, problem: &ProblemInstance) -> Result<Vec<StepSpec>, CoreError> {
  let compiled = if state.config.scoring == ScoringConfig::default() {
    compile(problem)
  } else {
    compile_with(problem, &state.config.scoring)
  };
  compiled.map_err(|e| {
    warn!(target: "series", topic = problem.topic_id(), error = %e, "Compilation refused");
    e
  })
}

#[instrument(level = "info", skip(step, value), fields(step = %step.key, value_len = value.len()))]
pub fn check_step(step: &StepSpec, value: &str) -> VerificationResult {
  check(step, value)
}

#[instrument(level = "info", skip(state, topic_ids), fields(questions = topic_ids.len()))]
pub fn create_test(state: &AppState, topic_ids: &[String], complexity: Option<u32>) -> Result<Vec<QuestionSlot>, CoreError> {
  build_test(&state.registry, topic_ids, state.complexity(complexity), &state.config.scoring)
}

#[instrument(level = "info", skip(questions), fields(questions = questions.len()))]
pub fn start_attempt(questions: &[QuestionSlot]) -> AttemptState {
  AttemptState::start(questions)
}

/// Apply one submission; on error the returned attempt is not produced, so
/// the caller keeps the state it already has.
#[instrument(level = "info", skip(question, attempt, value), fields(order = question.order, value_len = value.len()))]
pub fn advance_attempt(
  question: &QuestionSlot,
  mut attempt: AttemptState,
  key: Option<&str>,
  value: &str,
) -> Result<(Submission, AttemptState), CoreError> {
  match attempt.advance(question, key, value) {
    Ok(submission) => {
      info!(
        target: "series",
        order = question.order,
        ok = submission.ok,
        next_step = submission.next_step,
        done = submission.question_done,
        "Submission evaluated"
      );
      Ok((submission, attempt))
    }
    Err(e) => {
      warn!(target: "series", order = question.order, error = %e, "Submission rejected");
      Err(e)
    }
  }
}

#[instrument(level = "info", skip(question, attempt), fields(order = question.order))]
pub fn view_question(question: &QuestionSlot, attempt: &AttemptState) -> Result<ViewOut, CoreError> {
  let view = attempt.view(question)?;
  Ok(ViewOut { statement: question.problem.statement(), view })
}

#[instrument(level = "info", skip(questions, attempt), fields(questions = questions.len()))]
pub fn finish(questions: &[QuestionSlot], attempt: &AttemptState) -> AttemptReport {
  finish_attempt(questions, attempt)
}
