use crate::domain::job::JobId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Payment request failed: {0}")]
    PaymentRequestError(String),
    #[error("Job not found: {0}")]
    NotFound(JobId),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Finalization error: {0}")]
    FinalizationError(String),
    #[error("Payment provider error: {0}")]
    ProviderError(String),
    #[error("Job {job_id} cannot {transition} while {from}")]
    InvalidTransition {
        job_id: JobId,
        from: String,
        transition: &'static str,
    },
    #[error("A payment session is already active for job {0}")]
    SessionActive(JobId),
}

impl GateError {
    /// Errors reported to the caller with their message rather than as an
    /// internal failure.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            GateError::ValidationError(_) | GateError::PaymentRequestError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
