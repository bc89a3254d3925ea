//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::{error, info, instrument};

use crate::error::CoreError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// `CoreError` as an HTTP response with a `{error, message}` body.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self { ApiError(e) }
}

pub fn status_for(e: &CoreError) -> StatusCode {
  match e {
    CoreError::UnknownTopic(_) => StatusCode::NOT_FOUND,
    CoreError::WrongStep { .. } | CoreError::NoMoreSteps | CoreError::UnknownState(_) => StatusCode::CONFLICT,
    CoreError::InvalidProblem(_) => StatusCode::UNPROCESSABLE_ENTITY,
    CoreError::GenerationConstraintExhausted { .. } | CoreError::AmbiguousClassification(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = status_for(&self.0);
    if status.is_server_error() {
      error!(target: "series_backend", code = self.0.code(), error = %self.0, "Request failed");
    }
    let body = ErrorOut { error: self.0.code().to_string(), message: self.0.to_string() };
    (status, Json(body)).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_topics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(TopicsOut { topics: list_topics(&state) })
}

#[instrument(level = "info", skip(state, body), fields(%body.topic_id))]
pub async fn http_post_problem(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ProblemIn>,
) -> ApiResult<ProblemOut> {
  let out = create_problem(&state, &body.topic_id, body.complexity)?;
  info!(target: "series_backend", topic = %body.topic_id, "HTTP problem served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(topic = body.problem.topic_id()))]
pub async fn http_post_steps(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StepsIn>,
) -> ApiResult<StepsOut> {
  let steps = compile_problem(&state, &body.problem)?;
  Ok(Json(StepsOut { steps }))
}

#[instrument(level = "info", skip(body), fields(step = %body.step.key, value_len = body.value.len()))]
pub async fn http_post_check(Json(body): Json<CheckIn>) -> impl IntoResponse {
  let result = check_step(&body.step, &body.value);
  info!(target: "series_backend", step = %body.step.key, ok = result.ok, "HTTP check evaluated");
  Json(result)
}

#[instrument(level = "info", skip(state, body), fields(questions = body.topic_ids.len()))]
pub async fn http_post_test(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TestIn>,
) -> ApiResult<TestOut> {
  let questions = create_test(&state, &body.topic_ids, body.complexity)?;
  Ok(Json(TestOut { questions }))
}

#[instrument(level = "info", skip(body), fields(questions = body.questions.len()))]
pub async fn http_post_attempt_start(Json(body): Json<StartIn>) -> impl IntoResponse {
  Json(StartOut { attempt: start_attempt(&body.questions) })
}

#[instrument(level = "info", skip(body), fields(order = body.question.order, key = ?body.key))]
pub async fn http_post_attempt_advance(Json(body): Json<AdvanceIn>) -> ApiResult<AdvanceOut> {
  let (submission, attempt) = advance_attempt(&body.question, body.attempt, body.key.as_deref(), &body.value)?;
  info!(target: "series_backend", order = body.question.order, ok = submission.ok, "HTTP submission evaluated");
  Ok(Json(AdvanceOut { submission, attempt }))
}

#[instrument(level = "info", skip(body), fields(order = body.question.order))]
pub async fn http_post_attempt_view(Json(body): Json<ViewIn>) -> ApiResult<ViewOut> {
  Ok(Json(view_question(&body.question, &body.attempt)?))
}

#[instrument(level = "info", skip(body), fields(questions = body.questions.len()))]
pub async fn http_post_attempt_finish(Json(body): Json<FinishIn>) -> impl IntoResponse {
  let report = finish(&body.questions, &body.attempt);
  info!(target: "series_backend", percent = report.percent, "HTTP attempt finished");
  Json(report)
}
