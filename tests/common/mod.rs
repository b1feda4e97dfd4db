#![allow(dead_code)]

use adgate::application::gatekeeper::Gatekeeper;
use adgate::application::orchestrator::{Orchestrator, PaymentTerms};
use adgate::domain::job::{JobId, JobInput, JobRecord};
use adgate::domain::payment::{IssuedPayment, PaymentAmount, PaymentRequest, PaymentState};
use adgate::domain::ports::{JobStore, PaymentProvider, TaskExecutor};
use adgate::error::{GateError, Result};
use adgate::infrastructure::in_memory::InMemoryJobStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn terms() -> PaymentTerms {
    PaymentTerms {
        agent_identifier: "agent-1".to_string(),
        network: "Preprod".to_string(),
        amounts: vec![PaymentAmount::new("5000000", "lovelace")],
    }
}

/// A payment provider whose answers are set by the test.
#[derive(Default)]
pub struct ScriptedProvider {
    pub fail_create: AtomicBool,
    pub fail_check: AtomicBool,
    pub fail_complete: AtomicBool,
    pub empty_identifier: AtomicBool,
    issued: AtomicUsize,
    states: Mutex<HashMap<String, PaymentState>>,
    completed: Mutex<Vec<(String, String)>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_state(&self, payment_identifier: &str, state: PaymentState) {
        self.states
            .lock()
            .unwrap()
            .insert(payment_identifier.to_string(), state);
    }

    pub fn settle(&self, payment_identifier: &str) {
        self.set_state(payment_identifier, PaymentState::FundsLocked);
    }

    pub fn completed(&self) -> Vec<(String, String)> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn create_payment_request(&self, _request: PaymentRequest) -> Result<IssuedPayment> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GateError::ProviderError("payment service unavailable".into()));
        }
        if self.empty_identifier.load(Ordering::SeqCst) {
            return Ok(IssuedPayment::default());
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let payment_identifier = format!("pay-{n}");
        self.set_state(&payment_identifier, PaymentState::Pending);
        Ok(IssuedPayment {
            payment_identifier,
            pay_by_time: Some("1700000000000".into()),
            ..IssuedPayment::default()
        })
    }

    async fn check_status(&self, payment_identifier: &str) -> Result<PaymentState> {
        if self.fail_check.load(Ordering::SeqCst) {
            return Err(GateError::ProviderError("status lookup timed out".into()));
        }
        Ok(self
            .states
            .lock()
            .unwrap()
            .get(payment_identifier)
            .cloned()
            .unwrap_or(PaymentState::Pending))
    }

    async fn complete_payment(&self, payment_identifier: &str, result: &str) -> Result<()> {
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(GateError::ProviderError("submit-result rejected".into()));
        }
        self.completed
            .lock()
            .unwrap()
            .push((payment_identifier.to_string(), result.to_string()));
        self.set_state(payment_identifier, PaymentState::ResultSubmitted);
        Ok(())
    }
}

/// Runs the default gatekeeper, counting calls. Can be slowed down or made
/// to fail.
#[derive(Default)]
pub struct CountingExecutor {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
    fail: bool,
    inner: Gatekeeper,
}

impl CountingExecutor {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_gatekeeper(mut self, gatekeeper: Gatekeeper) -> Self {
        self.inner = gatekeeper;
        self
    }
}

#[async_trait]
impl TaskExecutor for CountingExecutor {
    async fn execute(&self, input: &JobInput) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(GateError::ExecutionError("executor crashed".into()));
        }
        Ok(self.inner.decide(input)?.to_string())
    }
}

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub provider: Arc<ScriptedProvider>,
    pub store: InMemoryJobStore,
}

impl Harness {
    /// The stored record, bypassing the payment status refresh.
    pub async fn store_record(&self, job_id: JobId) -> JobRecord {
        self.store.get(job_id).await.unwrap()
    }
}

/// An orchestrator with settlement dispatch running.
pub fn spawn(provider: Arc<ScriptedProvider>, executor: CountingExecutor) -> Harness {
    let store = InMemoryJobStore::new();
    let orchestrator = Orchestrator::spawn(
        Box::new(store.clone()),
        provider.clone(),
        Box::new(executor),
        terms(),
        POLL_INTERVAL,
    );
    Harness {
        orchestrator,
        provider,
        store,
    }
}

/// An orchestrator nobody delivers settlements to, so tests drive
/// `on_settled` themselves.
pub fn manual(provider: Arc<ScriptedProvider>, executor: CountingExecutor) -> Harness {
    let store = InMemoryJobStore::new();
    let (orchestrator, settlements) = Orchestrator::new(
        Box::new(store.clone()),
        provider.clone(),
        Box::new(executor),
        terms(),
        POLL_INTERVAL,
    );
    // Keep the channel open so monitors can still publish.
    std::mem::forget(settlements);
    Harness {
        orchestrator: Arc::new(orchestrator),
        provider,
        store,
    }
}

/// Polls the job until it reaches a terminal state.
pub async fn wait_for_terminal(orchestrator: &Orchestrator, job_id: JobId) -> JobRecord {
    for _ in 0..500 {
        let record = orchestrator.get_status(job_id).await.unwrap();
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never finished");
}
