use crate::application::orchestrator::JobTicket;
use crate::domain::job::{JobRecord, JobStatus};
use crate::domain::payment::PaymentAmount;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /start_job`.
///
/// Missing fields deserialize to empty values so that validation, not the
/// JSON extractor, decides what is wrong with the request.
#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    #[serde(default)]
    pub identifier_from_purchaser: String,
    #[serde(default)]
    pub input_data: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StartJobResponse {
    pub status: &'static str,
    pub job_id: String,
    #[serde(rename = "blockchainIdentifier")]
    pub blockchain_identifier: String,
    pub amounts: Vec<PaymentAmount>,
    #[serde(rename = "payByTime")]
    pub pay_by_time: Option<String>,
    #[serde(rename = "submitResultTime", skip_serializing_if = "Option::is_none")]
    pub submit_result_time: Option<String>,
    #[serde(rename = "unlockTime", skip_serializing_if = "Option::is_none")]
    pub unlock_time: Option<String>,
    #[serde(
        rename = "externalDisputeUnlockTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_dispute_unlock_time: Option<String>,
    #[serde(rename = "agentIdentifier")]
    pub agent_identifier: String,
    #[serde(rename = "sellerVkey", skip_serializing_if = "Option::is_none")]
    pub seller_vkey: Option<String>,
    #[serde(rename = "identifierFromPurchaser")]
    pub identifier_from_purchaser: String,
    pub input_hash: String,
}

impl From<JobTicket> for StartJobResponse {
    fn from(ticket: JobTicket) -> Self {
        let payment = ticket.payment;
        Self {
            status: "success",
            job_id: ticket.job_id.to_string(),
            blockchain_identifier: payment.payment_identifier,
            amounts: ticket.amounts,
            pay_by_time: payment.pay_by_time,
            submit_result_time: payment.submit_result_time,
            unlock_time: payment.unlock_time,
            external_dispute_unlock_time: payment.external_dispute_unlock_time,
            agent_identifier: ticket.agent_identifier,
            seller_vkey: payment.seller_vkey,
            identifier_from_purchaser: ticket.requester_identifier,
            input_hash: payment.input_hash.unwrap_or(ticket.input_hash),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub job_id: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub payment_status: String,
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<JobRecord> for StatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.id.to_string(),
            status: record.status,
            payment_status: record.payment_status,
            result: record.result,
            error: record.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{JobId, JobInput};
    use crate::domain::payment::IssuedPayment;
    use serde_json::json;

    #[test]
    fn test_start_job_response_omits_missing_provider_fields() {
        let ticket = JobTicket {
            job_id: JobId::new(),
            payment: IssuedPayment {
                payment_identifier: "block_1".into(),
                pay_by_time: Some("1700000000000".into()),
                ..Default::default()
            },
            amounts: vec![PaymentAmount::new("5000000", "lovelace")],
            agent_identifier: "agent".into(),
            requester_identifier: "buyer".into(),
            input_hash: "abc".into(),
        };

        let json = serde_json::to_value(StartJobResponse::from(ticket)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["blockchainIdentifier"], "block_1");
        assert_eq!(json["amounts"][0]["amount"], "5000000");
        assert_eq!(json["input_hash"], "abc");
        assert!(json.get("unlockTime").is_none());
        assert!(json.get("sellerVkey").is_none());
    }

    #[test]
    fn test_status_response_shape() {
        let input = JobInput::try_from(json!({"ad_category": "DeFi"})).unwrap();
        let record = JobRecord::new(JobId::new(), input, "buyer".into(), "block_1".into());

        let json = serde_json::to_value(StatusResponse::from(record)).unwrap();
        assert_eq!(json["status"], "awaiting_payment");
        assert_eq!(json["payment_status"], "pending");
        assert!(json["result"].is_null());
        assert!(json.get("error").is_none());
    }
}
