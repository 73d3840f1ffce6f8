//! Account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::payload::AccountPayload;

/// A financial account under an item
///
/// Identified within its item by the SimpleFIN account id. The raw snapshot
/// and the raw transactions are stored separately: a later snapshot that
/// omits transactions never erases the ones already stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplefinAccount {
    pub id: Uuid,
    pub item_id: Uuid,
    /// SimpleFIN account ID (natural key within the item)
    pub account_id: String,

    // =========================================================================
    // Columns lifted from the snapshot for querying
    // =========================================================================
    pub name: Option<String>,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency: Option<String>,
    pub balance: Option<Decimal>,
    pub available_balance: Option<Decimal>,
    pub balance_date: Option<DateTime<Utc>>,

    // =========================================================================
    // Raw provider data
    // =========================================================================
    /// Account payload without its transactions
    pub raw_payload: Option<JsonValue>,
    /// Transactions as last returned by the provider
    pub raw_transactions_payload: Option<JsonValue>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SimplefinAccount {
    /// Create an empty record for a newly seen account
    pub fn new(item_id: Uuid, account_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            item_id,
            account_id: account_id.into(),
            name: None,
            currency: None,
            balance: None,
            available_balance: None,
            balance_date: None,
            raw_payload: None,
            raw_transactions_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of stored transactions
    pub fn transaction_count(&self) -> usize {
        self.raw_transactions_payload
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|a| a.len())
            .unwrap_or(0)
    }

    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }
}

/// Fields written by an account snapshot upsert
///
/// Never carries transactions; those go through a separate update.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub name: Option<String>,
    pub currency: Option<String>,
    pub balance: Option<Decimal>,
    pub available_balance: Option<Decimal>,
    pub balance_date: Option<DateTime<Utc>>,
    pub raw_payload: JsonValue,
}

impl AccountSnapshot {
    /// Build a snapshot from an account payload that no longer carries transactions
    pub fn from_payload(payload: &AccountPayload) -> crate::domain::result::Result<Self> {
        Ok(Self {
            name: payload.name.clone(),
            currency: payload
                .currency
                .as_deref()
                .map(SimplefinAccount::normalize_currency),
            balance: payload.balance_decimal(),
            available_balance: payload.available_balance_decimal(),
            balance_date: payload.balance_datetime(),
            raw_payload: serde_json::to_value(payload)?,
        })
    }
}
