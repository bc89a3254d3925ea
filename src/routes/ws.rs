//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::error::CoreError;
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "series_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "series_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = reply_for_text(&txt, &state);
        if let Err(e) = socket.send(Message::Text(reply)).await {
          error!(target: "series_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "series_backend", "WebSocket disconnected");
}

/// Parse, dispatch, serialize.
fn reply_for_text(txt: &str, state: &AppState) -> String {
  let reply_msg = match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "series_backend", "WS received: {:?}", &incoming);
      handle_client_ws(incoming, state)
    }
    Err(e) => ServerWsMessage::Error { error: "invalid_json".into(), message: format!("Invalid JSON: {}", e) },
  };
  serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "error": "internal", "message": format!("Serialization error: {}", e) })
      .to_string()
  })
}

fn error_msg(e: CoreError) -> ServerWsMessage {
  ServerWsMessage::Error { error: e.code().into(), message: e.to_string() }
}

#[instrument(level = "info", skip_all)]
fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Topics => ServerWsMessage::Topics { topics: list_topics(state) },

    ClientWsMessage::CreateProblem { topic_id, complexity } => match create_problem(state, &topic_id, complexity) {
      Ok(problem) => {
        info!(target: "series_backend", %topic_id, "WS problem served");
        ServerWsMessage::Problem { problem }
      }
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Compile { problem } => match compile_problem(state, &problem) {
      Ok(steps) => ServerWsMessage::Steps { steps },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Check { step, value } => ServerWsMessage::CheckResult { result: check_step(&step, &value) },

    ClientWsMessage::BuildTest { topic_ids, complexity } => match create_test(state, &topic_ids, complexity) {
      Ok(questions) => ServerWsMessage::Test { questions },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::StartAttempt { questions } => ServerWsMessage::Attempt { attempt: start_attempt(&questions) },

    ClientWsMessage::Advance { question, attempt, key, value } => {
      match advance_attempt(&question, attempt, key.as_deref(), &value) {
        Ok((submission, attempt)) => {
          info!(target: "series_backend", order = question.order, ok = submission.ok, "WS submission evaluated");
          ServerWsMessage::Advanced { submission, attempt }
        }
        Err(e) => error_msg(e),
      }
    }

    ClientWsMessage::View { question, attempt } => match view_question(&question, &attempt) {
      Ok(view) => ServerWsMessage::View { view },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Finish { questions, attempt } => ServerWsMessage::Report { report: finish(&questions, &attempt) },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use serde_json::{json, Value};

  fn send(state: &AppState, msg: Value) -> Value {
    serde_json::from_str(&reply_for_text(&msg.to_string(), state)).unwrap()
  }

  #[test]
  fn ping_and_catalog() {
    let state = AppState::with_config(AppConfig::default());
    assert_eq!(send(&state, json!({"type": "ping"}))["type"], "pong");
    let topics = send(&state, json!({"type": "topics"}));
    assert_eq!(topics["topics"].as_array().unwrap().len(), 4);
  }

  #[test]
  fn errors_carry_stable_codes() {
    let state = AppState::with_config(AppConfig::default());
    let reply = send(&state, json!({"type": "create_problem", "topic_id": "nope"}));
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["error"], "unknown_topic");

    let reply: Value = serde_json::from_str(&reply_for_text("{not json", &state)).unwrap();
    assert_eq!(reply["error"], "invalid_json");
  }

  #[test]
  fn full_attempt_over_messages() {
    let state = AppState::with_config(AppConfig::default());
    let test = send(&state, json!({"type": "build_test", "topic_ids": ["geometric_reciprocal"], "complexity": 5}));
    let questions = test["questions"].clone();
    let question = questions[0].clone();

    let mut attempt = send(&state, json!({"type": "start_attempt", "questions": questions}))["attempt"].clone();
    let steps = question["steps"].as_array().unwrap().clone();
    for step in &steps {
      let reply = send(&state, json!({
        "type": "advance",
        "question": question,
        "attempt": attempt,
        "key": step["key"],
        "value": step["canonical_answer"],
      }));
      assert_eq!(reply["type"], "advanced", "{reply}");
      assert_eq!(reply["submission"]["ok"], true);
      attempt = reply["attempt"].clone();
    }

    let view = send(&state, json!({"type": "view", "question": question, "attempt": attempt}));
    assert_eq!(view["view"]["question_done"], true);
    assert!(view["view"]["statement"].as_str().unwrap().starts_with("sum_{k=0}^{oo}"));

    let report = send(&state, json!({"type": "finish", "questions": questions, "attempt": attempt}));
    assert_eq!(report["report"]["percent"], 100.0);

    let replay = send(&state, json!({"type": "advance", "question": question, "attempt": attempt, "value": "1"}));
    assert_eq!(replay["error"], "no_more_steps");
  }
}
