use super::job::{JobId, JobInput, JobRecord, JobTransition};
use super::payment::{IssuedPayment, PaymentRequest, PaymentState};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Authoritative table of job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Stores a new record in `AwaitingPayment` and returns its identifier.
    async fn create(
        &self,
        input: JobInput,
        requester_identifier: String,
        payment_identifier: String,
    ) -> Result<JobId>;

    /// Returns a snapshot of the record, or `NotFound`.
    async fn get(&self, job_id: JobId) -> Result<JobRecord>;

    /// Applies `transition` atomically and returns the updated snapshot.
    ///
    /// Updates to the same record never interleave.
    async fn update(&self, job_id: JobId, transition: JobTransition) -> Result<JobRecord>;
}

/// The external service that issues and tracks payments.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment_request(&self, request: PaymentRequest) -> Result<IssuedPayment>;
    async fn check_status(&self, payment_identifier: &str) -> Result<PaymentState>;
    /// Reports the job outcome so the provider can release the funds.
    async fn complete_payment(&self, payment_identifier: &str, result: &str) -> Result<()>;
}

/// The unit of work gated behind payment.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, input: &JobInput) -> Result<String>;
}

pub type JobStoreBox = Box<dyn JobStore>;
pub type PaymentProviderRef = Arc<dyn PaymentProvider>;
pub type TaskExecutorBox = Box<dyn TaskExecutor>;
