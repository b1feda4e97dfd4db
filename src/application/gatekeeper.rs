use crate::domain::job::JobInput;
use crate::domain::ports::TaskExecutor;
use crate::error::{GateError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub const FIELD_AD_CATEGORY: &str = "ad_category";
pub const FIELD_BID_AMOUNT: &str = "bid_amount";
pub const FIELD_AD_CONTENT_URL: &str = "ad_content_url";

/// What the user is willing to be shown.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub interested_categories: Vec<String>,
    /// Opt-in bid floor. When unset, `bid_amount` is never read.
    pub min_bid: Option<Decimal>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            interested_categories: vec![
                "Technology".to_string(),
                "Gaming".to_string(),
                "DeFi".to_string(),
            ],
            min_bid: None,
        }
    }
}

/// The gatekeeper's decision on one ad offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    MissingCategory,
    CategoryRejected(String),
    BidTooLow { bid: Decimal, min_bid: Decimal },
    Accepted(String),
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::MissingCategory => write!(f, "ERROR: No category provided."),
            Verdict::CategoryRejected(category) => {
                write!(f, "REJECTED: User is not interested in {category}.")
            }
            Verdict::BidTooLow { bid, min_bid } => {
                write!(f, "REJECTED: Bid {bid} is below the minimum of {min_bid}.")
            }
            Verdict::Accepted(category) => {
                write!(f, "ACCEPTED: Ad for {category} displayed. User credited.")
            }
        }
    }
}

/// Matches ad offers against the user's preferences.
///
/// A pure decision: it reads the input and never touches job state.
#[derive(Debug, Clone, Default)]
pub struct Gatekeeper {
    preferences: Preferences,
}

impl Gatekeeper {
    pub fn new(preferences: Preferences) -> Self {
        Self { preferences }
    }

    pub fn decide(&self, input: &JobInput) -> Result<Verdict> {
        let category = match input.field(FIELD_AD_CATEGORY).and_then(Value::as_str) {
            Some(category) if !category.trim().is_empty() => category,
            _ => return Ok(Verdict::MissingCategory),
        };

        if !self
            .preferences
            .interested_categories
            .iter()
            .any(|interested| interested == category)
        {
            return Ok(Verdict::CategoryRejected(category.to_string()));
        }

        if let Some(min_bid) = self.preferences.min_bid
            && let Some(bid) = parse_bid(input)?
            && bid < min_bid
        {
            return Ok(Verdict::BidTooLow { bid, min_bid });
        }

        Ok(Verdict::Accepted(category.to_string()))
    }
}

fn parse_bid(input: &JobInput) -> Result<Option<Decimal>> {
    let raw = match input.field(FIELD_BID_AMOUNT) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(raw)) => raw.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(other) => {
            return Err(GateError::ExecutionError(format!(
                "bid_amount must be a number, got {other}"
            )));
        }
    };
    Decimal::from_str(&raw)
        .map(Some)
        .map_err(|e| GateError::ExecutionError(format!("invalid bid_amount '{raw}': {e}")))
}

#[async_trait]
impl TaskExecutor for Gatekeeper {
    async fn execute(&self, input: &JobInput) -> Result<String> {
        let verdict = self.decide(input)?;
        info!(%verdict, "ad offer evaluated");
        Ok(verdict.to_string())
    }
}
