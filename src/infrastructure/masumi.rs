use crate::domain::payment::{IssuedPayment, PaymentAmount, PaymentRequest, PaymentState};
use crate::domain::ports::PaymentProvider;
use crate::error::{GateError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Masumi payment service.
#[derive(Debug, Clone)]
pub struct MasumiPaymentClient {
    http: Client,
    base_url: String,
    api_key: String,
    network: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody<'a> {
    agent_identifier: &'a str,
    network: &'a str,
    input_hash: &'a str,
    identifier_from_purchaser: &'a str,
    #[serde(rename = "RequestedFunds")]
    requested_funds: &'a [PaymentAmount],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPayment {
    blockchain_identifier: String,
    pay_by_time: Option<String>,
    submit_result_time: Option<String>,
    unlock_time: Option<String>,
    external_dispute_unlock_time: Option<String>,
    input_hash: Option<String>,
    #[serde(rename = "SmartContractWallet")]
    seller_wallet: Option<SellerWallet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SellerWallet {
    wallet_vkey: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolvePaymentBody<'a> {
    blockchain_identifier: &'a str,
    network: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedPayment {
    on_chain_state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResultBody<'a> {
    network: &'a str,
    blockchain_identifier: &'a str,
    submit_result_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
}

impl MasumiPaymentClient {
    pub fn new(base_url: &str, api_key: &str, network: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GateError::ProviderError(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            network: network.to_string(),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}/{}", self.base_url, path))
            .header("token", &self.api_key)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| GateError::ProviderError(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GateError::ProviderError(format!(
                "payment service returned {status}: {body}"
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| GateError::ProviderError(format!("malformed response: {e}")))?;
        match envelope.data {
            Some(data) if envelope.status == "success" => Ok(data),
            _ => Err(GateError::ProviderError(format!(
                "payment service answered with status '{}'",
                envelope.status
            ))),
        }
    }
}

#[async_trait]
impl PaymentProvider for MasumiPaymentClient {
    async fn create_payment_request(&self, request: PaymentRequest) -> Result<IssuedPayment> {
        let body = CreatePaymentBody {
            agent_identifier: &request.agent_identifier,
            network: &request.network,
            input_hash: &request.input_hash,
            identifier_from_purchaser: &request.purchaser_identifier,
            requested_funds: &request.amounts,
        };
        let created: CreatedPayment = self
            .send(self.post("payment/").json(&body))
            .await
            .map_err(|e| GateError::PaymentRequestError(e.to_string()))?;
        debug!(payment_identifier = %created.blockchain_identifier, "payment request created");

        Ok(IssuedPayment {
            payment_identifier: created.blockchain_identifier,
            pay_by_time: created.pay_by_time,
            submit_result_time: created.submit_result_time,
            unlock_time: created.unlock_time,
            external_dispute_unlock_time: created.external_dispute_unlock_time,
            input_hash: created.input_hash,
            seller_vkey: created.seller_wallet.and_then(|wallet| wallet.wallet_vkey),
        })
    }

    async fn check_status(&self, payment_identifier: &str) -> Result<PaymentState> {
        let body = ResolvePaymentBody {
            blockchain_identifier: payment_identifier,
            network: &self.network,
        };
        let resolved: ResolvedPayment = self
            .send(self.post("payment/resolve-blockchain-identifier").json(&body))
            .await?;
        Ok(PaymentState::parse(resolved.on_chain_state.as_deref()))
    }

    async fn complete_payment(&self, payment_identifier: &str, result: &str) -> Result<()> {
        let result_hash = hex::encode(Sha256::digest(result.as_bytes()));
        let body = SubmitResultBody {
            network: &self.network,
            blockchain_identifier: payment_identifier,
            submit_result_hash: &result_hash,
        };
        let _: serde_json::Value = self
            .send(self.post("payment/submit-result").json(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = MasumiPaymentClient::new("http://localhost:3001/api/v1/", "key", "Preprod")
            .unwrap();
        assert_eq!(client.base_url, "http://localhost:3001/api/v1");
    }

    #[test]
    fn test_create_body_uses_service_field_names() {
        let amounts = vec![PaymentAmount::new("5000000", "lovelace")];
        let body = CreatePaymentBody {
            agent_identifier: "agent",
            network: "Preprod",
            input_hash: "abc",
            identifier_from_purchaser: "buyer",
            requested_funds: &amounts,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["agentIdentifier"], "agent");
        assert_eq!(json["identifierFromPurchaser"], "buyer");
        assert_eq!(json["RequestedFunds"][0]["unit"], "lovelace");
    }

    #[test]
    fn test_created_payment_parsing() {
        let raw = serde_json::json!({
            "status": "success",
            "data": {
                "blockchainIdentifier": "block_1",
                "payByTime": "1700000000000",
                "inputHash": "abc",
                "SmartContractWallet": {"walletVkey": "vkey_1"}
            }
        });
        let envelope: Envelope<CreatedPayment> = serde_json::from_value(raw).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.blockchain_identifier, "block_1");
        assert_eq!(data.unlock_time, None);
        assert_eq!(
            data.seller_wallet.and_then(|w| w.wallet_vkey).as_deref(),
            Some("vkey_1")
        );
    }
}
