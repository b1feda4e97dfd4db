use crate::application::gatekeeper::Preferences;
use crate::application::orchestrator::PaymentTerms;
use crate::domain::payment::PaymentAmount;
use crate::error::{GateError, Result};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::time::Duration;

const LOCAL_AGENT_IDENTIFIER: &str = "local-agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// In-process provider that settles payments on its own.
    Simulated,
    /// The Masumi payment service.
    Masumi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Ad gatekeeper agent: runs paid ad-offer checks once payment settles.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1:8001")]
    pub bind: SocketAddr,

    /// Payment provider backing the agent
    #[arg(long, env = "PAYMENT_PROVIDER", value_enum, default_value_t = ProviderKind::Simulated)]
    pub provider: ProviderKind,

    /// Base URL of the payment service, e.g. http://localhost:3001/api/v1
    #[arg(long, env = "PAYMENT_SERVICE_URL")]
    pub payment_service_url: Option<String>,

    /// API key for the payment service
    #[arg(long, env = "PAYMENT_API_KEY", hide_env_values = true)]
    pub payment_api_key: Option<String>,

    /// Network payments are made on
    #[arg(long, env = "NETWORK", default_value = "Preprod")]
    pub network: String,

    /// Identifier of this agent in the payment registry
    #[arg(long, env = "AGENT_IDENTIFIER")]
    pub agent_identifier: Option<String>,

    /// Price of one job, in `payment_unit`
    #[arg(long, env = "PAYMENT_AMOUNT", default_value = "5000000")]
    pub payment_amount: String,

    #[arg(long, env = "PAYMENT_UNIT", default_value = "lovelace")]
    pub payment_unit: String,

    /// How often pending payments are polled
    #[arg(long, env = "PAYMENT_POLL_INTERVAL_MS", default_value_t = 10_000)]
    pub poll_interval_ms: u64,

    /// Delay after which the simulated provider settles a payment
    #[arg(long, env = "SIMULATED_SETTLE_AFTER_MS", default_value_t = 2_000)]
    pub simulated_settle_after_ms: u64,

    /// Ad categories the user wants to see
    #[arg(
        long,
        env = "INTERESTED_CATEGORIES",
        value_delimiter = ',',
        default_value = "Technology,Gaming,DeFi"
    )]
    pub interested_categories: Vec<String>,

    /// Reject offers bidding below this amount; unset or 0 disables the check
    #[arg(long, env = "MIN_BID")]
    pub min_bid: Option<Decimal>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.provider == ProviderKind::Masumi {
            for (name, value) in [
                ("payment-service-url", &self.payment_service_url),
                ("payment-api-key", &self.payment_api_key),
                ("agent-identifier", &self.agent_identifier),
            ] {
                if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                    return Err(GateError::ValidationError(format!(
                        "--{name} is required with the masumi provider"
                    )));
                }
            }
        }

        match self.payment_amount.parse::<u64>() {
            Ok(amount) if amount > 0 => {}
            _ => {
                return Err(GateError::ValidationError(format!(
                    "payment amount must be a positive integer, got '{}'",
                    self.payment_amount
                )));
            }
        }

        if self.poll_interval_ms == 0 {
            return Err(GateError::ValidationError(
                "poll interval must be positive".to_string(),
            ));
        }

        if self.min_bid.is_some_and(|min_bid| min_bid.is_sign_negative()) {
            return Err(GateError::ValidationError(
                "min bid cannot be negative".to_string(),
            ));
        }

        Ok(())
    }

    pub fn payment_terms(&self) -> PaymentTerms {
        PaymentTerms {
            agent_identifier: self
                .agent_identifier
                .clone()
                .unwrap_or_else(|| LOCAL_AGENT_IDENTIFIER.to_string()),
            network: self.network.clone(),
            amounts: vec![PaymentAmount::new(
                self.payment_amount.clone(),
                self.payment_unit.clone(),
            )],
        }
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            interested_categories: self
                .interested_categories
                .iter()
                .map(|category| category.trim().to_string())
                .filter(|category| !category.is_empty())
                .collect(),
            min_bid: self.min_bid.filter(|min_bid| !min_bid.is_zero()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn simulated_settle_after(&self) -> Duration {
        Duration::from_millis(self.simulated_settle_after_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["adgate"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = parse(&[]);
        config.validate().unwrap();
        assert_eq!(config.provider, ProviderKind::Simulated);
        assert_eq!(
            config.payment_terms().amounts,
            vec![PaymentAmount::new("5000000", "lovelace")]
        );
    }

    #[test]
    fn test_masumi_requires_credentials() {
        let config = parse(&["--provider", "masumi"]);
        assert!(matches!(
            config.validate(),
            Err(GateError::ValidationError(_))
        ));

        let config = parse(&[
            "--provider",
            "masumi",
            "--payment-service-url",
            "http://localhost:3001/api/v1",
            "--payment-api-key",
            "secret",
            "--agent-identifier",
            "agent-1",
        ]);
        config.validate().unwrap();
        assert_eq!(config.payment_terms().agent_identifier, "agent-1");
    }

    #[test]
    fn test_payment_amount_must_be_positive_integer() {
        for amount in ["0", "-5", "5.5", "five"] {
            let flag = format!("--payment-amount={amount}");
            let config = parse(&[flag.as_str()]);
            assert!(config.validate().is_err(), "{amount} should be rejected");
        }
    }

    #[test]
    fn test_preferences_from_flags() {
        let config = parse(&["--interested-categories", "Sports, Music,", "--min-bid", "0"]);
        let preferences = config.preferences();
        assert_eq!(preferences.interested_categories, vec!["Sports", "Music"]);
        assert_eq!(preferences.min_bid, None);

        assert_eq!(parse(&[]).preferences().min_bid, None);

        let config = parse(&["--min-bid", "1.25"]);
        assert_eq!(config.preferences().min_bid, Some(dec!(1.25)));
    }
}
