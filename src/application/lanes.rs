use crate::domain::job::JobId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-job mutual exclusion for multi-step transitions.
///
/// Holding a lane serializes the settlement sequence of one job while leaving
/// every other job free to progress. The map lock itself is only held to look
/// up or insert a lane, never across an await.
#[derive(Default)]
pub struct JobLanes {
    lanes: Mutex<HashMap<JobId, Arc<AsyncMutex<()>>>>,
}

impl JobLanes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds the lane for `job_id`.
    pub async fn acquire(&self, job_id: JobId) -> OwnedMutexGuard<()> {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
            lanes.entry(job_id).or_default().clone()
        };
        lane.lock_owned().await
    }

    /// Drops the lane of a job that reached a terminal state.
    ///
    /// Only call this for terminal jobs: a task racing in on a fresh lane must
    /// find nothing left to do.
    pub fn retire(&self, job_id: JobId) {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        lanes.remove(&job_id);
    }

    pub fn len(&self) -> usize {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_job_is_serialized() {
        let lanes = JobLanes::new();
        let job_id = JobId::new();

        let _held = lanes.acquire(job_id).await;
        let second = tokio::time::timeout(Duration::from_millis(50), lanes.acquire(job_id)).await;
        assert!(second.is_err(), "second acquire should wait");
    }

    #[tokio::test]
    async fn test_different_jobs_do_not_block() {
        let lanes = JobLanes::new();

        let _first = lanes.acquire(JobId::new()).await;
        let second =
            tokio::time::timeout(Duration::from_millis(50), lanes.acquire(JobId::new())).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_retire_removes_lane() {
        let lanes = JobLanes::new();
        let job_id = JobId::new();

        drop(lanes.acquire(job_id).await);
        assert_eq!(lanes.len(), 1);

        lanes.retire(job_id);
        assert!(lanes.is_empty());
        lanes.retire(job_id);
    }
}
