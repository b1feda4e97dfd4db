use super::lanes::JobLanes;
use super::sessions::PaymentSessionRegistry;
use crate::domain::job::{JobId, JobInput, JobRecord, JobStatus, JobTransition};
use crate::domain::payment::{IssuedPayment, PaymentAmount, PaymentRequest, SettlementEvent};
use crate::domain::ports::{JobStoreBox, PaymentProviderRef, TaskExecutorBox};
use crate::error::{GateError, Result};
use serde_json::Value;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

/// Who is asking to be paid, how much, and on which network.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentTerms {
    pub agent_identifier: String,
    pub network: String,
    pub amounts: Vec<PaymentAmount>,
}

/// What the purchaser needs to pay for a freshly created job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTicket {
    pub job_id: JobId,
    pub payment: IssuedPayment,
    pub amounts: Vec<PaymentAmount>,
    pub agent_identifier: String,
    pub requester_identifier: String,
    pub input_hash: String,
}

/// The job/payment state machine.
///
/// Jobs start in `AwaitingPayment` with a monitoring session watching their
/// payment. When the session reports settlement, [`on_settled`] runs the
/// task executor exactly once, reports the result to the provider and tears
/// the session down, whatever the outcome.
///
/// [`on_settled`]: Orchestrator::on_settled
pub struct Orchestrator {
    store: JobStoreBox,
    provider: PaymentProviderRef,
    executor: TaskExecutorBox,
    sessions: PaymentSessionRegistry,
    lanes: JobLanes,
    terms: PaymentTerms,
}

impl Orchestrator {
    /// Creates an orchestrator and the channel its monitoring sessions
    /// publish settlements on.
    ///
    /// Nothing consumes the receiver until it is handed to [`dispatch`];
    /// [`Orchestrator::spawn`] does both.
    pub fn new(
        store: JobStoreBox,
        provider: PaymentProviderRef,
        executor: TaskExecutorBox,
        terms: PaymentTerms,
        poll_interval: Duration,
    ) -> (Self, UnboundedReceiver<SettlementEvent>) {
        let (settlements, receiver) = mpsc::unbounded_channel();
        let sessions = PaymentSessionRegistry::new(provider.clone(), settlements, poll_interval);
        let orchestrator = Self {
            store,
            provider,
            executor,
            sessions,
            lanes: JobLanes::new(),
            terms,
        };
        (orchestrator, receiver)
    }

    /// Creates an orchestrator and starts delivering settlements to it.
    pub fn spawn(
        store: JobStoreBox,
        provider: PaymentProviderRef,
        executor: TaskExecutorBox,
        terms: PaymentTerms,
        poll_interval: Duration,
    ) -> Arc<Self> {
        let (orchestrator, settlements) = Self::new(store, provider, executor, terms, poll_interval);
        let orchestrator = Arc::new(orchestrator);
        tokio::spawn(dispatch(Arc::downgrade(&orchestrator), settlements));
        orchestrator
    }

    /// Requests a payment for `input` and registers a job awaiting it.
    ///
    /// Nothing is stored unless the provider issues a payment identifier.
    pub async fn create_job(&self, requester_identifier: String, input: Value) -> Result<JobTicket> {
        if requester_identifier.trim().is_empty() {
            return Err(GateError::ValidationError(
                "identifier_from_purchaser is required".to_string(),
            ));
        }
        let input = JobInput::try_from(input)?;
        let input_hash = input.hash();

        let request = PaymentRequest {
            agent_identifier: self.terms.agent_identifier.clone(),
            network: self.terms.network.clone(),
            amounts: self.terms.amounts.clone(),
            purchaser_identifier: requester_identifier.clone(),
            input: input.clone(),
            input_hash: input_hash.clone(),
        };
        let payment = self
            .provider
            .create_payment_request(request)
            .await
            .map_err(|e| match e {
                GateError::PaymentRequestError(_) => e,
                other => GateError::PaymentRequestError(other.to_string()),
            })?;
        if payment.payment_identifier.is_empty() {
            return Err(GateError::PaymentRequestError(
                "provider issued an empty payment identifier".to_string(),
            ));
        }

        let job_id = self
            .store
            .create(
                input,
                requester_identifier.clone(),
                payment.payment_identifier.clone(),
            )
            .await?;

        if let Err(e) = self
            .sessions
            .start(job_id, payment.payment_identifier.clone())
        {
            error!(%job_id, error = %e, "could not start payment monitoring");
            self.store
                .update(
                    job_id,
                    JobTransition::Fail {
                        error: e.to_string(),
                    },
                )
                .await?;
            return Err(e);
        }

        info!(
            %job_id,
            payment_identifier = %payment.payment_identifier,
            "job created, awaiting payment"
        );

        Ok(JobTicket {
            job_id,
            payment,
            amounts: self.terms.amounts.clone(),
            agent_identifier: self.terms.agent_identifier.clone(),
            requester_identifier,
            input_hash,
        })
    }

    /// Runs the gated task for a job whose payment has settled.
    ///
    /// Tolerates duplicate and late delivery: unknown and terminal jobs are
    /// left alone and `Ok(None)` is returned. Otherwise returns the job's
    /// final record.
    pub async fn on_settled(&self, job_id: JobId) -> Result<Option<JobRecord>> {
        let _lane = self.lanes.acquire(job_id).await;

        let record = match self.store.get(job_id).await {
            Ok(record) => record,
            Err(GateError::NotFound(_)) => {
                warn!(%job_id, "settlement for unknown job ignored");
                self.lanes.retire(job_id);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let transition = match record.status {
            JobStatus::Completed | JobStatus::Failed => {
                debug!(%job_id, status = %record.status, "duplicate settlement ignored");
                self.lanes.retire(job_id);
                return Ok(None);
            }
            // A previous attempt died mid-task. Running it again could
            // execute the work twice, so the job fails instead.
            JobStatus::Running => {
                error!(%job_id, "task execution was interrupted");
                JobTransition::Fail {
                    error: "task execution was interrupted".to_string(),
                }
            }
            JobStatus::AwaitingPayment => {
                info!(
                    %job_id,
                    payment_identifier = %record.payment_identifier,
                    "payment settled, executing task"
                );
                match self.store.update(job_id, JobTransition::Start).await {
                    Ok(_) => match self.execute_and_finalize(&record).await {
                        Ok(result) => JobTransition::Complete { result },
                        Err(e) => {
                            error!(%job_id, error = %e, "job failed");
                            JobTransition::Fail {
                                error: e.to_string(),
                            }
                        }
                    },
                    Err(e) => {
                        self.sessions.stop(job_id);
                        return Err(e);
                    }
                }
            }
        };

        // The monitor has done its job; readers must not observe a terminal
        // record with a session still attached.
        self.sessions.stop(job_id);
        let finished = self.store.update(job_id, transition).await?;
        if finished.status == JobStatus::Completed {
            info!(%job_id, "job completed");
        }
        self.lanes.retire(job_id);
        Ok(Some(finished))
    }

    async fn execute_and_finalize(&self, record: &JobRecord) -> Result<String> {
        let result = self
            .executor
            .execute(&record.input)
            .await
            .map_err(|e| match e {
                GateError::ExecutionError(_) => e,
                other => GateError::ExecutionError(other.to_string()),
            })?;
        debug!(job_id = %record.id, %result, "task finished");

        self.provider
            .complete_payment(&record.payment_identifier, &result)
            .await
            .map_err(|e| GateError::FinalizationError(e.to_string()))?;
        info!(job_id = %record.id, "payment completed");

        Ok(result)
    }

    /// Returns the job, refreshing its payment status on a best-effort basis.
    ///
    /// Provider failures during the refresh are logged and the last known
    /// payment status is served instead.
    pub async fn get_status(&self, job_id: JobId) -> Result<JobRecord> {
        let record = self.store.get(job_id).await?;

        if self.sessions.has_active(job_id) {
            match self.provider.check_status(&record.payment_identifier).await {
                Ok(state) => {
                    match self
                        .store
                        .update(job_id, JobTransition::RefreshPaymentStatus(state.to_string()))
                        .await
                    {
                        Ok(refreshed) => return Ok(refreshed),
                        Err(e) => warn!(%job_id, error = %e, "could not record payment status"),
                    }
                }
                Err(e) => {
                    warn!(%job_id, error = %e, "payment status refresh failed, serving cached status")
                }
            }
        } else if record.status == JobStatus::AwaitingPayment {
            error!(%job_id, "job awaits payment but has no monitoring session");
        }

        self.store.get(job_id).await
    }

    pub fn has_active_session(&self, job_id: JobId) -> bool {
        self.sessions.has_active(job_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.active_count()
    }
}

/// Delivers settlements to the orchestrator until it is dropped.
///
/// Each settlement is handled on its own task so unrelated jobs never wait on
/// each other. If handling panics, the job is settled again, which fails it
/// rather than leaving it running with a live session.
pub async fn dispatch(
    orchestrator: Weak<Orchestrator>,
    mut settlements: UnboundedReceiver<SettlementEvent>,
) {
    while let Some(event) = settlements.recv().await {
        let Some(orchestrator) = orchestrator.upgrade() else {
            break;
        };
        let job_id = event.job_id;

        tokio::spawn(async move {
            let attempt = {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.on_settled(job_id).await })
            };
            match attempt.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(%job_id, error = %e, "settlement handling failed"),
                Err(join_error) if join_error.is_panic() => {
                    error!(%job_id, "settlement handling panicked");
                    if let Err(e) = orchestrator.on_settled(job_id).await {
                        error!(%job_id, error = %e, "could not fail interrupted job");
                    }
                }
                Err(_) => {}
            }
        });
    }
    debug!("settlement dispatcher stopped");
}
