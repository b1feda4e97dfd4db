use crate::domain::payment::{IssuedPayment, PaymentRequest, PaymentState};
use crate::domain::ports::PaymentProvider;
use crate::error::{GateError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::info;
use uuid::Uuid;

const PAY_BY_WINDOW: Duration = Duration::from_secs(60 * 60);
const SUBMIT_RESULT_WINDOW: Duration = Duration::from_secs(2 * 60 * 60);
const UNLOCK_WINDOW: Duration = Duration::from_secs(4 * 60 * 60);
const DISPUTE_UNLOCK_WINDOW: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug)]
struct SimulatedPayment {
    created_at: Instant,
    state: PaymentState,
    result: Option<String>,
}

/// An in-process payment provider.
///
/// Payments settle on their own once `settle_after` has elapsed, or when
/// [`settle`] is called. Intended for local runs and tests; no funds move.
///
/// [`settle`]: SimulatedPaymentProvider::settle
#[derive(Debug)]
pub struct SimulatedPaymentProvider {
    settle_after: Option<Duration>,
    payments: Mutex<HashMap<String, SimulatedPayment>>,
}

impl SimulatedPaymentProvider {
    pub fn new(settle_after: Option<Duration>) -> Self {
        Self {
            settle_after,
            payments: Mutex::new(HashMap::new()),
        }
    }

    /// Marks a payment as funded. Returns `false` for unknown identifiers.
    pub fn settle(&self, payment_identifier: &str) -> bool {
        let mut payments = self.payments.lock().unwrap_or_else(PoisonError::into_inner);
        match payments.get_mut(payment_identifier) {
            Some(payment) => {
                if payment.state == PaymentState::Pending {
                    payment.state = PaymentState::FundsLocked;
                }
                true
            }
            None => false,
        }
    }

    /// The result reported for a payment, if it has been completed.
    pub fn submitted_result(&self, payment_identifier: &str) -> Option<String> {
        let payments = self.payments.lock().unwrap_or_else(PoisonError::into_inner);
        payments
            .get(payment_identifier)
            .and_then(|payment| payment.result.clone())
    }
}

fn timestamp_after(window: Duration) -> String {
    let at = SystemTime::now() + window;
    at.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .to_string()
}

#[async_trait]
impl PaymentProvider for SimulatedPaymentProvider {
    async fn create_payment_request(&self, request: PaymentRequest) -> Result<IssuedPayment> {
        let payment_identifier = format!("sim_{}", Uuid::new_v4().simple());
        let mut payments = self.payments.lock().unwrap_or_else(PoisonError::into_inner);
        payments.insert(
            payment_identifier.clone(),
            SimulatedPayment {
                created_at: Instant::now(),
                state: PaymentState::Pending,
                result: None,
            },
        );
        info!(%payment_identifier, purchaser = %request.purchaser_identifier, "simulated payment requested");

        Ok(IssuedPayment {
            payment_identifier,
            pay_by_time: Some(timestamp_after(PAY_BY_WINDOW)),
            submit_result_time: Some(timestamp_after(SUBMIT_RESULT_WINDOW)),
            unlock_time: Some(timestamp_after(UNLOCK_WINDOW)),
            external_dispute_unlock_time: Some(timestamp_after(DISPUTE_UNLOCK_WINDOW)),
            input_hash: Some(request.input_hash),
            seller_vkey: Some(format!("sim_seller_{}", request.agent_identifier)),
        })
    }

    async fn check_status(&self, payment_identifier: &str) -> Result<PaymentState> {
        let mut payments = self.payments.lock().unwrap_or_else(PoisonError::into_inner);
        let payment = payments.get_mut(payment_identifier).ok_or_else(|| {
            GateError::ProviderError(format!("unknown payment {payment_identifier}"))
        })?;

        if payment.state == PaymentState::Pending
            && let Some(settle_after) = self.settle_after
            && payment.created_at.elapsed() >= settle_after
        {
            payment.state = PaymentState::FundsLocked;
        }
        Ok(payment.state.clone())
    }

    async fn complete_payment(&self, payment_identifier: &str, result: &str) -> Result<()> {
        let mut payments = self.payments.lock().unwrap_or_else(PoisonError::into_inner);
        let payment = payments.get_mut(payment_identifier).ok_or_else(|| {
            GateError::ProviderError(format!("unknown payment {payment_identifier}"))
        })?;
        if payment.state != PaymentState::FundsLocked {
            return Err(GateError::ProviderError(format!(
                "payment {payment_identifier} is {}, not FundsLocked",
                payment.state
            )));
        }
        payment.state = PaymentState::ResultSubmitted;
        payment.result = Some(result.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobInput;
    use serde_json::json;

    fn request() -> PaymentRequest {
        let input = JobInput::try_from(json!({"ad_category": "Technology"})).unwrap();
        PaymentRequest {
            agent_identifier: "agent".into(),
            network: "Preprod".into(),
            amounts: vec![],
            purchaser_identifier: "buyer".into(),
            input_hash: input.hash(),
            input,
        }
    }

    #[tokio::test]
    async fn test_manual_settlement() {
        let provider = SimulatedPaymentProvider::new(None);
        let issued = provider.create_payment_request(request()).await.unwrap();
        let id = issued.payment_identifier.as_str();

        assert_eq!(provider.check_status(id).await.unwrap(), PaymentState::Pending);
        assert!(provider.settle(id));
        assert_eq!(
            provider.check_status(id).await.unwrap(),
            PaymentState::FundsLocked
        );

        provider.complete_payment(id, "ACCEPTED").await.unwrap();
        assert_eq!(
            provider.check_status(id).await.unwrap(),
            PaymentState::ResultSubmitted
        );
        assert_eq!(provider.submitted_result(id).as_deref(), Some("ACCEPTED"));
    }

    #[tokio::test]
    async fn test_settles_after_delay() {
        let provider = SimulatedPaymentProvider::new(Some(Duration::ZERO));
        let issued = provider.create_payment_request(request()).await.unwrap();
        assert_eq!(
            provider
                .check_status(&issued.payment_identifier)
                .await
                .unwrap(),
            PaymentState::FundsLocked
        );
    }

    #[tokio::test]
    async fn test_completion_requires_funds() {
        let provider = SimulatedPaymentProvider::new(None);
        let issued = provider.create_payment_request(request()).await.unwrap();
        let result = provider
            .complete_payment(&issued.payment_identifier, "x")
            .await;
        assert!(matches!(result, Err(GateError::ProviderError(_))));
    }

    #[tokio::test]
    async fn test_unknown_payment() {
        let provider = SimulatedPaymentProvider::new(None);
        assert!(provider.check_status("nope").await.is_err());
        assert!(!provider.settle("nope"));
    }
}
