use super::job::{JobId, JobInput};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount requested from the purchaser, in the provider's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAmount {
    pub amount: String,
    pub unit: String,
}

impl PaymentAmount {
    pub fn new(amount: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            unit: unit.into(),
        }
    }
}

/// Everything the provider needs to issue a payment identifier for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub agent_identifier: String,
    pub network: String,
    pub amounts: Vec<PaymentAmount>,
    pub purchaser_identifier: String,
    pub input: JobInput,
    pub input_hash: String,
}

/// The provider's answer to a payment request.
///
/// Only `payment_identifier` and `pay_by_time` are guaranteed; the remaining
/// fields are echoed to the purchaser when the provider supplies them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IssuedPayment {
    pub payment_identifier: String,
    pub pay_by_time: Option<String>,
    pub submit_result_time: Option<String>,
    pub unlock_time: Option<String>,
    pub external_dispute_unlock_time: Option<String>,
    pub input_hash: Option<String>,
    pub seller_vkey: Option<String>,
}

/// Provider-reported state of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    /// No on-chain activity observed yet.
    Pending,
    FundsLocked,
    ResultSubmitted,
    RefundRequested,
    Disputed,
    Withdrawn,
    RefundWithdrawn,
    DisputedWithdrawn,
    FundsOrDatumInvalid,
    Other(String),
}

impl PaymentState {
    /// Funds are confirmed and the job may run.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentState::FundsLocked)
    }

    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => PaymentState::Pending,
            Some("FundsLocked") => PaymentState::FundsLocked,
            Some("ResultSubmitted") => PaymentState::ResultSubmitted,
            Some("RefundRequested") => PaymentState::RefundRequested,
            Some("Disputed") => PaymentState::Disputed,
            Some("Withdrawn") => PaymentState::Withdrawn,
            Some("RefundWithdrawn") => PaymentState::RefundWithdrawn,
            Some("DisputedWithdrawn") => PaymentState::DisputedWithdrawn,
            Some("FundsOrDatumInvalid") => PaymentState::FundsOrDatumInvalid,
            Some(other) => PaymentState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentState::Pending => "pending",
            PaymentState::FundsLocked => "FundsLocked",
            PaymentState::ResultSubmitted => "ResultSubmitted",
            PaymentState::RefundRequested => "RefundRequested",
            PaymentState::Disputed => "Disputed",
            PaymentState::Withdrawn => "Withdrawn",
            PaymentState::RefundWithdrawn => "RefundWithdrawn",
            PaymentState::DisputedWithdrawn => "DisputedWithdrawn",
            PaymentState::FundsOrDatumInvalid => "FundsOrDatumInvalid",
            PaymentState::Other(other) => other,
        };
        f.write_str(name)
    }
}

/// Published by a monitoring session when its payment settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEvent {
    pub job_id: JobId,
    pub payment_identifier: String,
}
