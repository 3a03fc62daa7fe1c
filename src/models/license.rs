use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, EnumString};

/// Open key-value bag attached to a license. Stored as JSON text; replaced
/// whole on write, never merged.
pub type Metadata = Map<String, Value>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum LicenseType {
    Free,
    Pro,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Active,
    Inactive,
    Suspended,
    Expired,
}

/// Which channel created a license.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum LicenseSource {
    Manual,
    Webhook,
    Api,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    /// Internal identifier, never exposed on the wire
    #[serde(skip_serializing)]
    pub id: String,
    pub key: String,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub email: String,
    /// Always stored normalized
    pub domain: String,
    pub status: LicenseStatus,
    pub purchased_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub usage_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
    pub source: LicenseSource,
    pub metadata: Metadata,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Validated input handed to the store by the lifecycle manager.
/// `domain` is already normalized and `key` already chosen at this point.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub key: String,
    pub license_type: LicenseType,
    pub email: String,
    pub domain: String,
    pub expires_at: Option<i64>,
    pub metadata: Metadata,
    pub source: LicenseSource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicenseBody {
    pub email: String,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub domain: String,
    #[serde(default)]
    pub custom_key: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLicenseBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// External sale notification mapped into a license creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub email: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(rename = "type", default)]
    pub license_type: Option<LicenseType>,
    #[serde(default)]
    pub sale_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStats {
    pub total: i64,
    pub active: i64,
    /// Licenses that have been verified at least once
    pub used: i64,
    pub by_type: LicenseTypeCounts,
    pub by_status: LicenseStatusCounts,
}

#[derive(Debug, Serialize)]
pub struct LicenseTypeCounts {
    #[serde(rename = "FREE")]
    pub free: i64,
    #[serde(rename = "PRO")]
    pub pro: i64,
}

#[derive(Debug, Serialize)]
pub struct LicenseStatusCounts {
    pub active: i64,
    pub inactive: i64,
    pub suspended: i64,
    pub expired: i64,
}
