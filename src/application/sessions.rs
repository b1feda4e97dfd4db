use crate::domain::job::JobId;
use crate::domain::payment::SettlementEvent;
use crate::domain::ports::PaymentProviderRef;
use crate::error::{GateError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// An active monitoring subscription for one job's payment.
struct PaymentSession {
    payment_identifier: String,
    monitor: JoinHandle<()>,
}

/// Maps job identifiers to their active payment monitors.
///
/// A monitor polls the provider until the payment settles, publishes a single
/// [`SettlementEvent`] and exits. The entry stays registered until [`stop`]
/// removes it, so `has_active` reflects the job's lifecycle rather than the
/// monitor task's.
///
/// [`stop`]: PaymentSessionRegistry::stop
pub struct PaymentSessionRegistry {
    provider: PaymentProviderRef,
    settlements: UnboundedSender<SettlementEvent>,
    poll_interval: Duration,
    sessions: Mutex<HashMap<JobId, PaymentSession>>,
}

impl PaymentSessionRegistry {
    pub fn new(
        provider: PaymentProviderRef,
        settlements: UnboundedSender<SettlementEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            settlements,
            poll_interval,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Starts monitoring `payment_identifier` on behalf of `job_id`.
    ///
    /// Fails with `SessionActive` if the job is already being monitored.
    pub fn start(&self, job_id: JobId, payment_identifier: String) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&job_id) {
            return Err(GateError::SessionActive(job_id));
        }

        let monitor = tokio::spawn(monitor(
            self.provider.clone(),
            job_id,
            payment_identifier.clone(),
            self.poll_interval,
            self.settlements.clone(),
        ));
        sessions.insert(
            job_id,
            PaymentSession {
                payment_identifier,
                monitor,
            },
        );
        debug!(%job_id, "payment monitoring started");
        Ok(())
    }

    /// Cancels monitoring and removes the entry. A no-op when absent.
    ///
    /// Returns whether a session was removed.
    pub fn stop(&self, job_id: JobId) -> bool {
        let session = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);

        match session {
            Some(session) => {
                session.monitor.abort();
                debug!(
                    %job_id,
                    payment_identifier = %session.payment_identifier,
                    "payment monitoring stopped"
                );
                true
            }
            None => false,
        }
    }

    pub fn has_active(&self, job_id: JobId) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&job_id)
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for PaymentSessionRegistry {
    fn drop(&mut self) {
        let sessions = self.sessions.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, session) in sessions.drain() {
            session.monitor.abort();
        }
    }
}

async fn monitor(
    provider: PaymentProviderRef,
    job_id: JobId,
    payment_identifier: String,
    poll_interval: Duration,
    settlements: UnboundedSender<SettlementEvent>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match provider.check_status(&payment_identifier).await {
            Ok(state) if state.is_settled() => {
                info!(%job_id, %payment_identifier, "payment settled");
                let event = SettlementEvent {
                    job_id,
                    payment_identifier,
                };
                if settlements.send(event).is_err() {
                    warn!(%job_id, "settlement dropped: orchestrator is gone");
                }
                return;
            }
            Ok(state) => debug!(%job_id, %state, "payment not settled yet"),
            Err(error) => warn!(%job_id, %error, "payment status poll failed"),
        }
    }
}
