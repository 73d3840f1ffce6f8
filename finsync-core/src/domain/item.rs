//! Item domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::institution::Institution;

/// Connection state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Active,
    /// The provider asked the user to re-link the connection
    RequiresUpdate,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::RequiresUpdate => "requires_update",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ItemStatus::Active),
            "requires_update" => Ok(ItemStatus::RequiresUpdate),
            other => Err(format!("unknown item status: {}", other)),
        }
    }
}

/// A linked SimpleFIN connection
///
/// One item covers every account the user exposed through a single
/// SimpleFIN access URL, possibly across several institutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    /// Access URL with embedded credentials - never log this
    #[serde(skip_serializing, default)]
    pub access_url: String,
    pub status: ItemStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub institution: Option<Institution>,
    /// Last full accounts payload
    pub raw_payload: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(name: impl Into<String>, access_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            access_url: access_url.into(),
            status: ItemStatus::Active,
            last_synced_at: None,
            institution: None,
            raw_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Identifier of the linked institution, if one has been imported
    pub fn institution_id(&self) -> Option<&str> {
        self.institution.as_ref().and_then(|i| i.id.as_deref())
    }

    pub fn has_institution(&self) -> bool {
        self.institution_id().is_some()
    }

    /// Validate item data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("item name cannot be empty");
        }
        if self.access_url.trim().is_empty() {
            return Err("access URL cannot be empty");
        }
        Ok(())
    }
}
