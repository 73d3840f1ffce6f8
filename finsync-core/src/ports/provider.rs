//! Data provider port
//!
//! Defines the interface for fetching account data from SimpleFIN (or the
//! demo stand-in) and for turning a setup token into an access URL.

use chrono::{DateTime, Utc};

use crate::domain::result::Result;
use crate::domain::AccountsPayload;

/// Source of SimpleFIN account payloads
///
/// Implementations return the provider's `errors` array inside the payload;
/// only failures to obtain a payload at all are returned as `Err`.
pub trait SimplefinProvider: Send + Sync {
    /// Provider name (e.g., "simplefin", "demo")
    fn name(&self) -> &str;

    /// Fetch accounts, with transactions posted on or after `start_date`
    ///
    /// # Arguments
    /// * `access_url` - The item's access URL (credentials embedded)
    /// * `start_date` - Lower bound of the transaction window
    fn get_accounts(&self, access_url: &str, start_date: DateTime<Utc>) -> Result<AccountsPayload>;
}

/// Integration setup
///
/// Implementations exchange a one-time setup token for a durable access URL.
pub trait IntegrationProvider: Send + Sync {
    /// Claim a setup token and return the access URL to store on the item
    fn claim_access_url(&self, setup_token: &str) -> Result<String>;
}
