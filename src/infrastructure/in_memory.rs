use crate::domain::job::{JobId, JobInput, JobRecord, JobTransition};
use crate::domain::ports::JobStore;
use crate::error::{GateError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A thread-safe in-memory store for job records.
///
/// The outer `RwLock` guards only the key set and is held just long enough to
/// clone a record handle. Each record sits behind its own `Mutex`, so updates
/// to one job never wait on updates to another. Records live for the lifetime
/// of the process.
#[derive(Default, Clone)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<JobId, Arc<Mutex<JobRecord>>>>>,
}

impl InMemoryJobStore {
    /// Creates a new, empty in-memory job store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs ever created.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn record(&self, job_id: JobId) -> Result<Arc<Mutex<JobRecord>>> {
        let jobs = self.jobs.read().await;
        jobs.get(&job_id)
            .cloned()
            .ok_or(GateError::NotFound(job_id))
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(
        &self,
        input: JobInput,
        requester_identifier: String,
        payment_identifier: String,
    ) -> Result<JobId> {
        let job_id = JobId::new();
        let record = JobRecord::new(job_id, input, requester_identifier, payment_identifier);
        let mut jobs = self.jobs.write().await;
        jobs.insert(job_id, Arc::new(Mutex::new(record)));
        Ok(job_id)
    }

    async fn get(&self, job_id: JobId) -> Result<JobRecord> {
        let record = self.record(job_id).await?;
        let record = record.lock().await;
        Ok(record.clone())
    }

    async fn update(&self, job_id: JobId, transition: JobTransition) -> Result<JobRecord> {
        let record = self.record(job_id).await?;
        let mut record = record.lock().await;
        record.apply(transition)?;
        Ok(record.clone())
    }
}
