//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "demoMode": false },
//!   "simplefin": { "timeoutSecs": 30, "allowedHostSuffix": "simplefin.org" }
//! }
//! ```
//! Keys this crate does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Environment variable forcing demo mode on or off (for CI/testing)
pub const DEMO_MODE_ENV: &str = "FINSYNC_DEMO_MODE";

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    simplefin: SimplefinSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// SimpleFIN connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplefinSettings {
    /// HTTP timeout for bridge requests
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Access URLs must point at this domain or one of its subdomains
    #[serde(default = "default_allowed_host_suffix")]
    pub allowed_host_suffix: String,
    /// Keys under `simplefin` this crate does not manage
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_allowed_host_suffix() -> String {
    "simplefin.org".to_string()
}

impl Default for SimplefinSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            allowed_host_suffix: default_allowed_host_suffix(),
            other: HashMap::new(),
        }
    }
}

/// finsync configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub demo_mode: bool,
    pub simplefin: SimplefinSettings,
}

impl Config {
    /// Load config from the data directory
    ///
    /// Demo mode can be enabled via:
    /// 1. Settings file (`finsync demo on`)
    /// 2. Environment variable FINSYNC_DEMO_MODE
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let demo_mode = match std::env::var(DEMO_MODE_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        Ok(Self {
            demo_mode,
            simplefin: raw.simplefin,
        })
    }

    /// Save config to the data directory, keeping unmanaged keys
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.app.demo_mode = self.demo_mode;
        settings.simplefin = self.simplefin.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }

    /// Database file name for the current mode
    pub fn db_filename(&self) -> &'static str {
        if self.demo_mode {
            "demo.duckdb"
        } else {
            "finsync.duckdb"
        }
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid {}: {}", settings_path.display(), e)))
}
