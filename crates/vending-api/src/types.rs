//! Wire types for the catalog and directory JSON APIs.
//!
//! Field names follow the remote PascalCase convention. Optional members the
//! services omit are defaulted so partial payloads still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Catalog ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductViewSummary {
    pub product_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningArtifactDetail {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(
        default,
        with = "epoch_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<DateTime<Utc>>,
}

/// A key/value pair handed to the provisioning template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningParameter {
    pub key: String,
    pub value: String,
}

impl ProvisioningParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionProductRequest {
    pub product_id: String,
    pub provisioning_artifact_id: String,
    pub provisioned_product_name: String,
    pub provisioning_parameters: Vec<ProvisioningParameter>,
    pub provision_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateProvisionedProductRequest {
    pub provisioned_product_id: String,
    pub provisioning_parameters: Vec<ProvisioningParameter>,
    pub update_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerminateProvisionedProductRequest {
    pub provisioned_product_id: String,
    pub terminate_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordDetail {
    pub record_id: String,
    #[serde(default)]
    pub provisioned_product_id: Option<String>,
    #[serde(default)]
    pub provisioned_product_name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub record_type: Option<String>,
    #[serde(default)]
    pub record_errors: Vec<RecordError>,
    #[serde(
        default,
        with = "epoch_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordOutput {
    #[serde(default)]
    pub output_key: Option<String>,
    #[serde(default)]
    pub output_value: Option<String>,
}

impl RecordOutput {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            output_key: Some(key.into()),
            output_value: Some(value.into()),
        }
    }
}

/// `DescribeRecord` response: the record plus whatever outputs the template
/// has published so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordDescription {
    pub record_detail: RecordDetail,
    #[serde(default)]
    pub record_outputs: Vec<RecordOutput>,
}

impl RecordDescription {
    /// Value of the first output named `key`.
    pub fn output(&self, key: &str) -> Option<&str> {
        self.record_outputs
            .iter()
            .find(|o| o.output_key.as_deref() == Some(key))
            .and_then(|o| o.output_value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionedProductDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_record_id: Option<String>,
}

// ─── Directory ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Root {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub arn: Option<String>,
    pub status: String,
    #[serde(
        default,
        with = "epoch_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub joined_timestamp: Option<DateTime<Utc>>,
}

/// Account status strings reported by the directory.
pub mod account_status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const SUSPENDED: &str = "SUSPENDED";
    pub const PENDING_CLOSURE: &str = "PENDING_CLOSURE";
}

/// Record status strings reported by the catalog.
pub mod record_status {
    pub const CREATED: &str = "CREATED";
    pub const IN_PROGRESS: &str = "IN_PROGRESS";
    pub const IN_PROGRESS_IN_ERROR: &str = "IN_PROGRESS_IN_ERROR";
    pub const SUCCEEDED: &str = "SUCCEEDED";
    pub const FAILED: &str = "FAILED";
}

/// Timestamps arrive as fractional epoch seconds.
mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_f64(ts.timestamp_millis() as f64 / 1000.0),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.and_then(|s| DateTime::from_timestamp_millis((s * 1000.0).round() as i64)))
    }
}
