use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_enabled() -> bool {
    true
}

/// A monitored URL and its monitoring configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MonitoredTarget {
    pub url: String,
    pub interval: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SiteStatus::Up => "UP",
            SiteStatus::Down => "DOWN",
            SiteStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// One row of the site listing as served by `GET /sites`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SiteDetails {
    pub url: String,
    pub interval: u32,
    pub enabled: bool,
    #[serde(default)]
    pub status: SiteStatus,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

// Body of POST /update. Omitted fields are left unchanged on the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToggleRequest {
    pub url: String,
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddSiteRequest {
    pub url: String,
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Envelope returned by every mutating endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_omits_missing_fields() {
        let req = UpdateRequest {
            url: "https://example.com".to_string(),
            interval: Some(45),
            enabled: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "url": "https://example.com", "interval": 45 })
        );
    }

    #[test]
    fn test_api_response_message_is_optional() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(parsed, ApiResponse::ok());

        let parsed: ApiResponse =
            serde_json::from_str(r#"{"success": false, "message": "bad url"}"#).unwrap();
        assert_eq!(parsed, ApiResponse::failure("bad url"));
    }

    #[test]
    fn test_site_status_wire_format() {
        assert_eq!(serde_json::to_string(&SiteStatus::Up).unwrap(), "\"UP\"");
        let parsed: SiteStatus = serde_json::from_str("\"UNKNOWN\"").unwrap();
        assert_eq!(parsed, SiteStatus::Unknown);
        assert_eq!(SiteStatus::Down.to_string(), "DOWN");
    }

    #[test]
    fn test_target_defaults_to_enabled() {
        let target: MonitoredTarget =
            serde_json::from_str(r#"{"url": "https://example.com", "interval": 30}"#).unwrap();
        assert!(target.enabled);
    }
}
