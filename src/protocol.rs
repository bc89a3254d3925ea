//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ProblemInstance, StepSpec};
use crate::progress::{AttemptReport, AttemptState, QuestionSlot, QuestionView, Submission};
use crate::registry::Topic;
use crate::verifier::VerificationResult;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Topics,
    CreateProblem {
        topic_id: String,
        #[serde(default)]
        complexity: Option<u32>,
    },
    Compile {
        problem: ProblemInstance,
    },
    Check {
        step: StepSpec,
        value: String,
    },
    BuildTest {
        topic_ids: Vec<String>,
        #[serde(default)]
        complexity: Option<u32>,
    },
    StartAttempt {
        questions: Vec<QuestionSlot>,
    },
    Advance {
        question: QuestionSlot,
        attempt: AttemptState,
        #[serde(default)]
        key: Option<String>,
        value: String,
    },
    View {
        question: QuestionSlot,
        attempt: AttemptState,
    },
    Finish {
        questions: Vec<QuestionSlot>,
        attempt: AttemptState,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Topics {
        topics: Vec<Topic>,
    },
    Problem {
        problem: ProblemOut,
    },
    Steps {
        steps: Vec<StepSpec>,
    },
    CheckResult {
        result: VerificationResult,
    },
    Test {
        questions: Vec<QuestionSlot>,
    },
    Attempt {
        attempt: AttemptState,
    },
    Advanced {
        submission: Submission,
        attempt: AttemptState,
    },
    View {
        view: ViewOut,
    },
    Report {
        report: AttemptReport,
    },
    Error {
        error: String,
        message: String,
    },
}

/// DTO used by both WS and HTTP for problem delivery.
#[derive(Debug, Serialize)]
pub struct ProblemOut {
    pub problem: ProblemInstance,
    pub statement: String,
    pub general_term: String,
}

pub fn to_out(problem: ProblemInstance) -> ProblemOut {
    ProblemOut {
        statement: problem.statement(),
        general_term: problem.general_term(),
        problem,
    }
}

#[derive(Debug, Serialize)]
pub struct ViewOut {
    pub statement: String,
    #[serde(flatten)]
    pub view: QuestionView,
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct TopicsOut {
    pub topics: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
pub struct ProblemIn {
    pub topic_id: String,
    #[serde(default)]
    pub complexity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StepsIn {
    pub problem: ProblemInstance,
}
#[derive(Serialize)]
pub struct StepsOut {
    pub steps: Vec<StepSpec>,
}

#[derive(Deserialize)]
pub struct CheckIn {
    pub step: StepSpec,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct TestIn {
    pub topic_ids: Vec<String>,
    #[serde(default)]
    pub complexity: Option<u32>,
}
#[derive(Serialize)]
pub struct TestOut {
    pub questions: Vec<QuestionSlot>,
}

#[derive(Deserialize)]
pub struct StartIn {
    pub questions: Vec<QuestionSlot>,
}
#[derive(Serialize)]
pub struct StartOut {
    pub attempt: AttemptState,
}

#[derive(Deserialize)]
pub struct AdvanceIn {
    pub question: QuestionSlot,
    pub attempt: AttemptState,
    #[serde(default)]
    pub key: Option<String>,
    pub value: String,
}
#[derive(Serialize)]
pub struct AdvanceOut {
    #[serde(flatten)]
    pub submission: Submission,
    pub attempt: AttemptState,
}

#[derive(Deserialize)]
pub struct ViewIn {
    pub question: QuestionSlot,
    pub attempt: AttemptState,
}

#[derive(Deserialize)]
pub struct FinishIn {
    pub questions: Vec<QuestionSlot>,
    pub attempt: AttemptState,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
    pub message: String,
}
