use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use vending_api::{CatalogApi, DirectoryApi, ProvisioningParameter};

use crate::close::{CloseSettings, CloseWaiter};
use crate::error::{Result, VendingError};
use crate::provisioning::{
    ProvisioningAction, ProvisioningController, ProvisioningSettings, SubmissionGate,
};
use crate::tree::{OrgNode, TreeResolver};

/// Record output and template parameter keys.
pub mod keys {
    pub const ACCOUNT_NAME: &str = "AccountName";
    pub const ACCOUNT_EMAIL: &str = "AccountEmail";
    pub const ACCOUNT_ID: &str = "AccountId";
    pub const SSO_FIRST_NAME: &str = "SSOUserFirstName";
    pub const SSO_LAST_NAME: &str = "SSOUserLastName";
    pub const SSO_EMAIL: &str = "SSOUserEmail";
    pub const MANAGED_OU: &str = "ManagedOrganizationalUnit";
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static ACCOUNT_ID_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

fn account_id_re() -> &'static Regex {
    ACCOUNT_ID_RE.get_or_init(|| Regex::new(r"^\d{12}$").unwrap())
}

/// Directory account ids are exactly twelve digits.
pub fn is_account_id(value: &str) -> bool {
    account_id_re().is_match(value)
}

fn require_email(field: &str, value: &str) -> Result<()> {
    if !email_re().is_match(value) {
        return Err(VendingError::InvalidSpec(format!(
            "{field} '{value}' is not an e-mail address"
        )));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VendingError::InvalidSpec(format!("{field} must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// AccountSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Desired account, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSpec {
    pub name: String,
    pub email: String,
    /// Deprecated flat OU name. Takes precedence over `organizational_unit_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_product_name: Option<String>,
    pub sso: SsoUser,
    /// Close the directory account when the provisioned product is deleted.
    #[serde(default)]
    pub close_on_deletion: bool,
}

impl AccountSpec {
    /// Check the spec and return the OU path to place the account under.
    pub fn validate(&self) -> Result<&str> {
        require_text("name", &self.name)?;
        require_email("email", &self.email)?;
        require_text("sso.first_name", &self.sso.first_name)?;
        require_text("sso.last_name", &self.sso.last_name)?;
        require_email("sso.email", &self.sso.email)?;
        self.org_unit_path()
    }

    fn org_unit_path(&self) -> Result<&str> {
        let non_empty: for<'a> fn(&'a Option<String>) -> Option<&'a str> =
            |v| v.as_deref().filter(|s| !s.trim().is_empty());
        match (
            non_empty(&self.organizational_unit),
            non_empty(&self.organizational_unit_path),
        ) {
            (Some(name), Some(_)) => {
                tracing::warn!(
                    organizational_unit = name,
                    "both organizational_unit and organizational_unit_path set; using organizational_unit"
                );
                Ok(name)
            }
            (Some(name), None) => Ok(name),
            (None, Some(path)) => Ok(path),
            (None, None) => Err(VendingError::MissingOrgUnit),
        }
    }

    /// Falls back to the account name.
    pub fn product_name(&self) -> &str {
        self.provisioned_product_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn parameters(&self, org_unit: &OrgNode) -> Vec<ProvisioningParameter> {
        vec![
            ProvisioningParameter::new(keys::ACCOUNT_NAME, &self.name),
            ProvisioningParameter::new(keys::ACCOUNT_EMAIL, &self.email),
            ProvisioningParameter::new(keys::SSO_FIRST_NAME, &self.sso.first_name),
            ProvisioningParameter::new(keys::SSO_LAST_NAME, &self.sso.last_name),
            ProvisioningParameter::new(keys::SSO_EMAIL, &self.sso.email),
            ProvisioningParameter::new(keys::MANAGED_OU, org_unit.display_with_id()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Observed state of a provisioned account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AccountRecord {
    pub provisioned_product_id: String,
    pub provisioned_product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_status: Option<String>,
}

/// Result of [`AccountLifecycle::create`].
///
/// `identity` is set as soon as the catalog accepts the submission, so a
/// failed job still names the provisioned product it left behind. Retrying
/// should read or delete that product rather than provision another.
#[derive(Debug)]
pub struct CreateOutcome {
    pub identity: Option<String>,
    pub result: Result<AccountRecord>,
}

impl CreateOutcome {
    pub fn into_result(self) -> Result<AccountRecord> {
        self.result
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub provisioned_product_id: String,
    pub record_id: String,
    /// Directory account that was closed, if closure was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_status: Option<String>,
}

// ---------------------------------------------------------------------------
// AccountLifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct LifecycleSettings {
    pub provisioning: ProvisioningSettings,
    pub close: CloseSettings,
}

/// Create, read, update and delete accounts through the catalog.
///
/// All submissions go through one [`SubmissionGate`]. Closing an account
/// after termination happens outside the gate.
pub struct AccountLifecycle {
    catalog: Arc<dyn CatalogApi>,
    directory: Arc<dyn DirectoryApi>,
    resolver: TreeResolver,
    provisioning: ProvisioningController,
    close: CloseSettings,
}

impl AccountLifecycle {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        directory: Arc<dyn DirectoryApi>,
        gate: Arc<SubmissionGate>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            resolver: TreeResolver::new(directory.clone()),
            provisioning: ProvisioningController::new(catalog.clone(), gate, settings.provisioning),
            catalog,
            directory,
            close: settings.close,
        }
    }

    pub fn gate(&self) -> &SubmissionGate {
        self.provisioning.gate()
    }

    pub async fn create(&self, spec: &AccountSpec) -> CreateOutcome {
        let mut identity = None;
        let result = self.try_create(spec, &mut identity).await;
        if let (Err(e), Some(id)) = (&result, &identity) {
            tracing::warn!(provisioned_product_id = %id, error = %e, "create failed after submission");
        }
        CreateOutcome { identity, result }
    }

    async fn try_create(
        &self,
        spec: &AccountSpec,
        identity: &mut Option<String>,
    ) -> Result<AccountRecord> {
        let path = spec.validate()?;
        let org_unit = self.org_unit(path).await?;
        let action = ProvisioningAction::Create {
            provisioned_product_name: spec.product_name().to_string(),
            parameters: spec.parameters(&org_unit),
        };

        let job = self
            .provisioning
            .execute(action, |job| {
                *identity = job.provisioned_product_id.clone();
            })
            .await?;

        let id = job
            .provisioned_product_id
            .or_else(|| identity.clone())
            .ok_or_else(|| VendingError::MissingProvisionedProduct {
                record_id: job.record_id.clone(),
            })?;
        self.read(&id).await
    }

    pub async fn read(&self, provisioned_product_id: &str) -> Result<AccountRecord> {
        tracing::debug!(provisioned_product_id, "reading provisioned account");
        let product = self
            .catalog
            .describe_provisioned_product(provisioned_product_id)
            .await
            .map_err(VendingError::remote("describing provisioned account", provisioned_product_id))?;

        let mut record = AccountRecord {
            provisioned_product_id: product.id,
            provisioned_product_name: product.name,
            last_record_id: product.last_record_id,
            ..Default::default()
        };

        if let Some(record_id) = record.last_record_id.as_deref() {
            let description = self
                .catalog
                .describe_record(record_id)
                .await
                .map_err(VendingError::remote("describing record", record_id))?;
            let output = |key: &str| description.output(key).map(str::to_string);
            record.account_name = output(keys::ACCOUNT_NAME);
            record.account_email = output(keys::ACCOUNT_EMAIL);
            record.account_id = output(keys::ACCOUNT_ID);
        }

        if let Some(account_id) = record.account_id.as_deref() {
            let account = self
                .directory
                .describe_account(account_id)
                .await
                .map_err(VendingError::remote("describing account", account_id))?;
            record.account_status = Some(account.status);
        }
        Ok(record)
    }

    pub async fn update(&self, provisioned_product_id: &str, spec: &AccountSpec) -> Result<AccountRecord> {
        let path = spec.validate()?;
        let org_unit = self.org_unit(path).await?;
        let action = ProvisioningAction::Update {
            provisioned_product_id: provisioned_product_id.to_string(),
            parameters: spec.parameters(&org_unit),
        };
        self.provisioning.execute(action, |_| {}).await?;
        self.read(provisioned_product_id).await
    }

    /// Terminate the provisioned product, then optionally close its
    /// directory account and wait for it to be suspended.
    pub async fn delete(&self, provisioned_product_id: &str, close_on_deletion: bool) -> Result<DeleteOutcome> {
        let action = ProvisioningAction::Terminate {
            provisioned_product_id: provisioned_product_id.to_string(),
        };
        let job = self.provisioning.execute(action, |_| {}).await?;

        let mut outcome = DeleteOutcome {
            provisioned_product_id: provisioned_product_id.to_string(),
            record_id: job.record_id.clone(),
            closed_account_id: None,
            final_status: None,
        };
        if !close_on_deletion {
            return Ok(outcome);
        }

        let account_id = match job.output(keys::ACCOUNT_ID) {
            Some(id) if is_account_id(id) => id.to_string(),
            Some(id) => {
                tracing::warn!(record_id = %job.record_id, value = id, "malformed AccountId output");
                return Err(VendingError::MissingAccountId {
                    record_id: job.record_id.clone(),
                });
            }
            None => {
                return Err(VendingError::MissingAccountId {
                    record_id: job.record_id.clone(),
                })
            }
        };

        let waiter = CloseWaiter::new(self.directory.clone(), self.close);
        waiter.request_close(&account_id).await?;
        let status = waiter.wait_for_target_status(&account_id).await?;

        outcome.closed_account_id = Some(account_id);
        outcome.final_status = Some(status);
        Ok(outcome)
    }

    async fn org_unit(&self, path: &str) -> Result<OrgNode> {
        let root = self.resolver.root().await?;
        self.resolver.resolve_path(&root, path).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
