//! Institution domain model

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::payload::OrgPayload;

/// Label used when neither a name nor a domain is available
pub const UNKNOWN_INSTITUTION: &str = "Unknown Institution";

/// The bank or organization behind an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    /// Domain, or SimpleFIN URL when no domain is given
    pub id: Option<String>,
    pub name: String,
    pub url: Option<String>,
    /// Complete org block as the provider sent it
    pub raw_org_data: JsonValue,
}

impl Institution {
    /// Normalize a SimpleFIN org block
    pub fn from_org(org: &OrgPayload) -> Self {
        let identifier = non_blank(org.domain.as_deref())
            .or_else(|| non_blank(org.sfin_url.as_deref()))
            .map(str::to_string);

        let name = match non_blank(org.name.as_deref()) {
            Some(name) => name.to_string(),
            None => institution_name_from_domain(org.domain.as_deref()),
        };

        Self {
            id: identifier.clone(),
            name,
            url: identifier,
            // OrgPayload only holds strings and JSON values, so this cannot fail
            raw_org_data: serde_json::to_value(org).unwrap_or(JsonValue::Null),
        }
    }
}

/// Readable name from a domain: "mybank.com" -> "Mybank"
pub fn institution_name_from_domain(domain: Option<&str>) -> String {
    let Some(domain) = non_blank(domain) else {
        return UNKNOWN_INSTITUTION.to_string();
    };

    let label = domain.split('.').next().unwrap_or(domain);
    capitalize(label)
}

/// First character upper-cased, the rest lower-cased
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn org(name: Option<&str>, domain: Option<&str>, sfin_url: Option<&str>) -> OrgPayload {
        OrgPayload {
            name: name.map(str::to_string),
            domain: domain.map(str::to_string),
            sfin_url: sfin_url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_from_domain() {
        assert_eq!(institution_name_from_domain(Some("mybank.com")), "Mybank");
        assert_eq!(institution_name_from_domain(Some("MyBank.co.uk")), "Mybank");
        assert_eq!(institution_name_from_domain(Some("localhost")), "Localhost");
    }

    #[test]
    fn test_name_from_missing_domain() {
        assert_eq!(institution_name_from_domain(None), UNKNOWN_INSTITUTION);
        assert_eq!(institution_name_from_domain(Some("  ")), UNKNOWN_INSTITUTION);
    }

    #[test]
    fn test_domain_preferred_for_id_and_url() {
        let inst = Institution::from_org(&org(
            Some("My Bank"),
            Some("mybank.com"),
            Some("https://sfin.mybank.com"),
        ));
        assert_eq!(inst.id.as_deref(), Some("mybank.com"));
        assert_eq!(inst.url.as_deref(), Some("mybank.com"));
        assert_eq!(inst.name, "My Bank");
    }

    #[test]
    fn test_sfin_url_fallback() {
        let inst = Institution::from_org(&org(None, None, Some("https://sfin.mybank.com")));
        assert_eq!(inst.id.as_deref(), Some("https://sfin.mybank.com"));
        assert_eq!(inst.url.as_deref(), Some("https://sfin.mybank.com"));
        assert_eq!(inst.name, UNKNOWN_INSTITUTION);
    }

    #[test]
    fn test_name_derived_when_missing() {
        let inst = Institution::from_org(&org(None, Some("mybank.com"), None));
        assert_eq!(inst.name, "Mybank");
    }

    #[test]
    fn test_raw_org_data_kept() {
        let mut payload = org(None, Some("mybank.com"), None);
        payload.extra.insert("logo".to_string(), json!("x.png"));

        let inst = Institution::from_org(&payload);
        assert_eq!(inst.raw_org_data, json!({ "domain": "mybank.com", "logo": "x.png" }));
    }

    #[test]
    fn test_no_identifier_available() {
        let inst = Institution::from_org(&org(Some("Credit Union"), None, None));
        assert!(inst.id.is_none());
        assert_eq!(inst.name, "Credit Union");
    }
}
