//! SimpleFIN payload types
//!
//! Typed view of the `/accounts` response (https://www.simplefin.org/protocol.html).
//! Every struct keeps unrecognised fields in `extra` so that stored snapshots
//! carry the provider's full data, not only what we read.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Response of `GET /accounts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountsPayload {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<AccountPayload>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AccountsPayload {
    /// True when the provider reported at least one error
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// One account entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountPayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Decimal string, e.g. "1523.40"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(
        rename = "available-balance",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub available_balance: Option<String>,
    /// UNIX timestamp of the balance
    #[serde(rename = "balance-date", default, skip_serializing_if = "Option::is_none")]
    pub balance_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<OrgPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TransactionPayload>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AccountPayload {
    /// Create a bare account entry with only an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            currency: None,
            balance: None,
            available_balance: None,
            balance_date: None,
            org: None,
            transactions: None,
            extra: Map::new(),
        }
    }

    /// Take the transactions out, leaving a snapshot-only payload behind
    pub fn split_transactions(mut self) -> (Self, Option<Vec<TransactionPayload>>) {
        let transactions = self.transactions.take();
        (self, transactions)
    }

    /// Parsed balance, if present and numeric
    pub fn balance_decimal(&self) -> Option<Decimal> {
        self.balance.as_deref().and_then(|b| b.trim().parse().ok())
    }

    /// Parsed available balance, if present and numeric
    pub fn available_balance_decimal(&self) -> Option<Decimal> {
        self.available_balance
            .as_deref()
            .and_then(|b| b.trim().parse().ok())
    }

    /// Balance timestamp as a UTC datetime
    pub fn balance_datetime(&self) -> Option<DateTime<Utc>> {
        self.balance_date
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }
}

/// Organization (institution) block attached to an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// SimpleFIN-specific institution URL, used when no domain is given
    #[serde(rename = "sfin-url", default, skip_serializing_if = "Option::is_none")]
    pub sfin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// One transaction entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transacted_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl TransactionPayload {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            posted: None,
            amount: None,
            description: None,
            payee: None,
            memo: None,
            transacted_at: None,
            pending: None,
            extra: Map::new(),
        }
    }

    /// Parsed amount, if present and numeric
    pub fn amount_decimal(&self) -> Option<Decimal> {
        self.amount.as_deref().and_then(|a| a.trim().parse().ok())
    }
}
