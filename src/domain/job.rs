use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Payment status recorded once a job has been finalized with the provider.
pub const PAYMENT_STATUS_COMPLETED: &str = "completed";
/// Payment status recorded when a job is created.
pub const PAYMENT_STATUS_PENDING: &str = "pending";

/// Opaque, unique job identifier generated at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    AwaitingPayment,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::AwaitingPayment => "awaiting_payment",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The input payload captured at job creation.
///
/// The orchestrator treats it as opaque; only the task executor interprets
/// its fields. It is always a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobInput(Map<String, Value>);

impl JobInput {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Hex encoded SHA-256 of the payload's JSON form.
    ///
    /// `serde_json::Map` keeps keys sorted, so equal payloads hash equally.
    pub fn hash(&self) -> String {
        let bytes = serde_json::to_vec(&self.0).unwrap_or_default();
        hex::encode(Sha256::digest(bytes))
    }
}

impl TryFrom<Value> for JobInput {
    type Error = GateError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            Value::Null => Err(GateError::ValidationError(
                "input_data is required".to_string(),
            )),
            _ => Err(GateError::ValidationError(
                "input_data must be an object".to_string(),
            )),
        }
    }
}

/// A partial state transition applied atomically by the job store.
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    /// Payment settled, the task is about to run.
    Start,
    Complete { result: String },
    Fail { error: String },
    /// Overwrites the advisory payment status. Ignored once the job is
    /// terminal, so the status recorded at finalization sticks.
    RefreshPaymentStatus(String),
}

impl JobTransition {
    fn name(&self) -> &'static str {
        match self {
            JobTransition::Start => "start",
            JobTransition::Complete { .. } => "complete",
            JobTransition::Fail { .. } => "fail",
            JobTransition::RefreshPaymentStatus(_) => "refresh payment status",
        }
    }
}

/// Lifecycle state of one job.
///
/// At most one of `result` and `error` is ever present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    /// Last payment status observed from the provider. Advisory only.
    pub payment_status: String,
    pub payment_identifier: String,
    pub input: JobInput,
    pub result: Option<String>,
    pub error: Option<String>,
    pub requester_identifier: String,
}

impl JobRecord {
    pub fn new(
        id: JobId,
        input: JobInput,
        requester_identifier: String,
        payment_identifier: String,
    ) -> Self {
        Self {
            id,
            status: JobStatus::AwaitingPayment,
            payment_status: PAYMENT_STATUS_PENDING.to_string(),
            payment_identifier,
            input,
            result: None,
            error: None,
            requester_identifier,
        }
    }

    /// Applies a transition, refusing any edge the lifecycle does not allow.
    ///
    /// On error the record is left untouched.
    pub fn apply(&mut self, transition: JobTransition) -> Result<()> {
        match (self.status, transition) {
            (status, JobTransition::RefreshPaymentStatus(payment_status)) => {
                if !status.is_terminal() {
                    self.payment_status = payment_status;
                }
            }
            (JobStatus::AwaitingPayment, JobTransition::Start) => {
                self.status = JobStatus::Running;
            }
            (JobStatus::Running, JobTransition::Complete { result }) => {
                self.status = JobStatus::Completed;
                self.payment_status = PAYMENT_STATUS_COMPLETED.to_string();
                self.result = Some(result);
                self.error = None;
            }
            (status, JobTransition::Fail { error }) if !status.is_terminal() => {
                self.status = JobStatus::Failed;
                self.error = Some(error);
                self.result = None;
            }
            (status, transition) => {
                return Err(GateError::InvalidTransition {
                    job_id: self.id,
                    from: status.to_string(),
                    transition: transition.name(),
                });
            }
        }
        Ok(())
    }
}
