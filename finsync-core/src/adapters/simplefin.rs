//! SimpleFIN API client
//!
//! Handles communication with the SimpleFIN Bridge API: claiming setup tokens
//! and fetching the accounts payload for an item.

use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use url::Url;

use crate::config::SimplefinSettings;
use crate::domain::result::{Error, ProviderErrorKind, Result};
use crate::domain::AccountsPayload;
use crate::ports::{IntegrationProvider, SimplefinProvider};

/// SimpleFIN API client bound to one access URL
#[derive(Debug)]
pub struct SimpleFINClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    timeout_secs: u64,
}

impl SimpleFINClient {
    /// Create a new SimpleFIN client from an access URL
    pub fn new(access_url: &str, settings: &SimplefinSettings) -> Result<Self> {
        let parsed = Url::parse(access_url.trim())
            .map_err(|e| Error::validation(format!("Invalid URL format: {}", e)))?;

        if parsed.scheme() != "https" {
            return Err(Error::validation("SimpleFIN access URL must use HTTPS"));
        }

        let host = parsed.host_str().unwrap_or("");
        if !host_matches_suffix(host, &settings.allowed_host_suffix) {
            return Err(Error::validation(format!(
                "SimpleFIN access URL must be from {} domain",
                settings.allowed_host_suffix
            )));
        }

        let username = parsed.username().to_string();
        let password = parsed.password().unwrap_or("").to_string();

        if username.is_empty() || password.is_empty() {
            return Err(Error::validation(
                "SimpleFIN access URL must include credentials",
            ));
        }

        // Credentials go through basic auth, not the URL
        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let base_url = format!(
            "{}://{}{}",
            parsed.scheme(),
            authority,
            parsed.path().trim_end_matches('/')
        );

        let client = build_http_client(settings.timeout_secs)?;

        Ok(Self {
            client,
            base_url,
            username,
            password,
            timeout_secs: settings.timeout_secs,
        })
    }

    /// URL for the accounts endpoint, transactions from `start_date` on
    pub fn accounts_url(&self, start_date: DateTime<Utc>) -> String {
        format!(
            "{}/accounts?start-date={}",
            self.base_url,
            start_date.timestamp()
        )
    }

    /// Get accounts (with transactions) from SimpleFIN
    pub fn get_accounts(&self, start_date: DateTime<Utc>) -> Result<AccountsPayload> {
        let response = self
            .client
            .get(self.accounts_url(start_date))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .map_err(|e| self.map_request_error(e))?;

        check_response_status(response.status().as_u16())?;

        let body = response
            .text()
            .map_err(|e| Error::Transport(format!("Failed to read SimpleFIN response: {}", e)))?;

        parse_accounts_payload(&body)
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Transport(format!(
                "Connection timed out after {} seconds",
                self.timeout_secs
            ))
        } else if error.is_connect() {
            Error::Transport("Unable to connect to SimpleFIN servers".to_string())
        } else {
            Error::Transport(format!("SimpleFIN request failed: {}", error))
        }
    }
}

/// Whether `host` is `suffix` itself or a subdomain of it
fn host_matches_suffix(host: &str, suffix: &str) -> bool {
    let suffix = suffix.trim_start_matches('.');
    if suffix.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    let suffix = suffix.to_ascii_lowercase();
    host == suffix || host.ends_with(&format!(".{}", suffix))
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// Check response status and return appropriate errors
fn check_response_status(status: u16) -> Result<()> {
    match status {
        200 => Ok(()),
        403 => Err(Error::provider(
            ProviderErrorKind::AccessForbidden,
            "SimpleFIN authentication failed. Your access token may be invalid or revoked. \
             Please reset your SimpleFIN credentials at https://beta-bridge.simplefin.org/",
        )),
        402 => Err(Error::provider(
            ProviderErrorKind::PaymentRequired,
            "SimpleFIN subscription payment required. \
             Please check your SimpleFIN account at https://beta-bridge.simplefin.org/",
        )),
        status => Err(Error::Transport(format!(
            "SimpleFIN API error: HTTP {}",
            status
        ))),
    }
}

/// Parse an accounts response body
///
/// Missing `accounts` or `errors` arrays are treated as empty.
pub fn parse_accounts_payload(body: &str) -> Result<AccountsPayload> {
    serde_json::from_str(body).map_err(|e| {
        Error::provider(
            ProviderErrorKind::InvalidResponse,
            format!("Failed to parse SimpleFIN response: {}", e),
        )
    })
}

/// Decode a setup token into the claim URL it wraps
pub fn decode_setup_token(setup_token: &str) -> Result<String> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(setup_token.trim())
        .map_err(|_| {
            Error::provider(ProviderErrorKind::TokenInvalid, "Invalid setup token format")
        })?;

    let claim_url = String::from_utf8(decoded).map_err(|_| {
        Error::provider(
            ProviderErrorKind::TokenInvalid,
            "Invalid setup token encoding",
        )
    })?;

    if Url::parse(&claim_url).is_err() {
        return Err(Error::provider(
            ProviderErrorKind::TokenInvalid,
            "Setup token does not contain a claim URL",
        ));
    }

    Ok(claim_url)
}

/// SimpleFIN data provider
///
/// Implements SimplefinProvider and IntegrationProvider for syncing real
/// financial data via SimpleFIN Bridge.
pub struct SimpleFINProvider {
    settings: SimplefinSettings,
}

impl SimpleFINProvider {
    pub fn new(settings: SimplefinSettings) -> Self {
        Self { settings }
    }
}

impl Default for SimpleFINProvider {
    fn default() -> Self {
        Self::new(SimplefinSettings::default())
    }
}

impl SimplefinProvider for SimpleFINProvider {
    fn name(&self) -> &str {
        "simplefin"
    }

    fn get_accounts(&self, access_url: &str, start_date: DateTime<Utc>) -> Result<AccountsPayload> {
        SimpleFINClient::new(access_url, &self.settings)?.get_accounts(start_date)
    }
}

impl IntegrationProvider for SimpleFINProvider {
    fn claim_access_url(&self, setup_token: &str) -> Result<String> {
        let claim_url = decode_setup_token(setup_token)?;
        let client = build_http_client(self.settings.timeout_secs)?;

        let response = client.post(&claim_url).send().map_err(|e| {
            Error::provider(
                ProviderErrorKind::TokenClaimFailed,
                format!("Failed to claim SimpleFIN token: {}", e),
            )
        })?;

        if !response.status().is_success() {
            return Err(Error::provider(
                ProviderErrorKind::TokenClaimFailed,
                format!(
                    "Failed to verify SimpleFIN token: HTTP {}",
                    response.status().as_u16()
                ),
            ));
        }

        let access_url = response.text().map_err(|e| {
            Error::provider(
                ProviderErrorKind::TokenClaimFailed,
                format!("Failed to read SimpleFIN response: {}", e),
            )
        })?;
        let access_url = access_url.trim().to_string();

        if access_url.is_empty() {
            return Err(Error::provider(
                ProviderErrorKind::TokenClaimFailed,
                "No access URL received from SimpleFIN",
            ));
        }

        // Reject anything we could not sync with later
        SimpleFINClient::new(&access_url, &self.settings)?;

        Ok(access_url)
    }
}
