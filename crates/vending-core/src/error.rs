use std::time::Duration;

use thiserror::Error;
use vending_api::ApiError;

use crate::provider::{Capability, Operation};

#[derive(Debug, Error)]
pub enum VendingError {
    // -- catalog configuration ------------------------------------------------
    #[error(
        "no product matching '{query}' found; check permissions and region settings"
    )]
    ProductNotFound { query: String },

    #[error("{count} products match '{query}'; expected exactly one")]
    AmbiguousProduct { query: String, count: usize },

    #[error("product {product_id} has no active provisioning artifact")]
    NoActiveArtifact { product_id: String },

    // -- organization tree ----------------------------------------------------
    #[error("organization has no root")]
    NoOrganizationRoot,

    #[error("organizational unit '{segment}' not found in parent {parent_id}")]
    OrgUnitNotFound { segment: String, parent_id: String },

    #[error("failed listing organizational units under {parent_path} ({parent_id}): {source}")]
    TreeWalk {
        parent_path: String,
        parent_id: String,
        #[source]
        source: ApiError,
    },

    // -- provisioning jobs ----------------------------------------------------
    #[error("failed reading provisioning status of {name} (record {record_id}): {source}")]
    ProvisioningRead {
        name: String,
        record_id: String,
        #[source]
        source: ApiError,
    },

    #[error("provisioning {name} failed (record {record_id}): {}", first_reason(.reasons))]
    ProvisioningFailed {
        name: String,
        record_id: String,
        reasons: Vec<String>,
    },

    #[error("record {record_id} did not name a provisioned product")]
    MissingProvisionedProduct { record_id: String },

    #[error("record {record_id} reported no AccountId output")]
    MissingAccountId { record_id: String },

    // -- account closure ------------------------------------------------------
    #[error(
        "account {account_id} did not reach {target} within {timeout:?} (last status {last_status})"
    )]
    CloseTimeout {
        account_id: String,
        target: String,
        last_status: String,
        timeout: Duration,
    },

    #[error("account {account_id} entered unexpected status {status}; expected one of {expected:?}")]
    UnexpectedStatus {
        account_id: String,
        status: String,
        expected: Vec<String>,
    },

    // -- input / wiring -------------------------------------------------------
    #[error("one of organizational_unit or organizational_unit_path must be configured")]
    MissingOrgUnit,

    #[error("invalid account spec: {0}")]
    InvalidSpec(String),

    #[error("{operation} requires the {capability} API, which is not configured")]
    MissingCollaborator {
        operation: Operation,
        capability: Capability,
    },

    #[error("{action} {target}: {source}")]
    Remote {
        action: &'static str,
        target: String,
        #[source]
        source: ApiError,
    },

    // -- configuration --------------------------------------------------------
    #[error("config not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

fn first_reason(reasons: &[String]) -> &str {
    reasons
        .first()
        .map(String::as_str)
        .unwrap_or("no failure reason reported")
}

impl VendingError {
    pub(crate) fn remote(action: &'static str, target: impl Into<String>) -> impl FnOnce(ApiError) -> Self {
        let target = target.into();
        move |source| VendingError::Remote {
            action,
            target,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, VendingError>;
