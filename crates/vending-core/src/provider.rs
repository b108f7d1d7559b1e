use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use vending_api::{CatalogApi, DirectoryApi, HttpCatalog, HttpDirectory};

use crate::account::{AccountLifecycle, AccountRecord, AccountSpec, CreateOutcome, DeleteOutcome, LifecycleSettings};
use crate::config::Config;
use crate::error::{Result, VendingError};
use crate::provisioning::SubmissionGate;
use crate::tree::{OrgNode, OrgTree, TreeResolver};

// ---------------------------------------------------------------------------
// Capability / Operation
// ---------------------------------------------------------------------------

/// A remote API the provider may or may not have been configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Catalog,
    Directory,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Catalog => f.write_str("catalog"),
            Capability::Directory => f.write_str("directory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateAccount,
    ReadAccount,
    UpdateAccount,
    DeleteAccount,
    ResolveOrgUnit,
    ListOrgUnits,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::CreateAccount,
        Operation::ReadAccount,
        Operation::UpdateAccount,
        Operation::DeleteAccount,
        Operation::ResolveOrgUnit,
        Operation::ListOrgUnits,
    ];

    /// Collaborators the operation cannot run without.
    pub fn requires(self) -> &'static [Capability] {
        match self {
            Operation::CreateAccount
            | Operation::ReadAccount
            | Operation::UpdateAccount
            | Operation::DeleteAccount => &[Capability::Catalog, Capability::Directory],
            Operation::ResolveOrgUnit | Operation::ListOrgUnits => &[Capability::Directory],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::CreateAccount => "create account",
            Operation::ReadAccount => "read account",
            Operation::UpdateAccount => "update account",
            Operation::DeleteAccount => "delete account",
            Operation::ResolveOrgUnit => "resolve organizational unit",
            Operation::ListOrgUnits => "list organizational units",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Entry point owning the configured collaborators.
///
/// Every operation is checked against the collaborators it needs before any
/// remote call is made. All account operations share one submission gate.
pub struct Provider {
    catalog: Option<Arc<dyn CatalogApi>>,
    directory: Option<Arc<dyn DirectoryApi>>,
    gate: Arc<SubmissionGate>,
    settings: LifecycleSettings,
}

impl Provider {
    pub fn new(
        catalog: Option<Arc<dyn CatalogApi>>,
        directory: Option<Arc<dyn DirectoryApi>>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            catalog,
            directory,
            gate: Arc::new(SubmissionGate::new()),
            settings,
        }
    }

    /// Build HTTP clients for every endpoint the config names.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.ensure_valid()?;
        let client = config.client_settings();

        let catalog = match &config.catalog {
            Some(section) => {
                let api = HttpCatalog::new(section.endpoint.clone(), &client)
                    .map_err(VendingError::remote("building catalog client for", section.endpoint.clone()))?;
                Some(Arc::new(api) as Arc<dyn CatalogApi>)
            }
            None => None,
        };
        let directory = match &config.directory {
            Some(section) => {
                let api = HttpDirectory::new(section.endpoint.clone(), &client)
                    .map_err(VendingError::remote("building directory client for", section.endpoint.clone()))?;
                Some(Arc::new(api) as Arc<dyn DirectoryApi>)
            }
            None => None,
        };

        tracing::debug!(
            catalog = catalog.is_some(),
            directory = directory.is_some(),
            "provider configured"
        );
        Ok(Self::new(catalog, directory, config.lifecycle_settings()))
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Catalog => self.catalog.is_some(),
            Capability::Directory => self.directory.is_some(),
        }
    }

    pub fn check(&self, operation: Operation) -> Result<()> {
        match operation.requires().iter().find(|c| !self.has(**c)) {
            Some(&capability) => Err(VendingError::MissingCollaborator {
                operation,
                capability,
            }),
            None => Ok(()),
        }
    }

    /// Operations runnable with the configured collaborators.
    pub fn available(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.check(*op).is_ok())
            .collect()
    }

    fn catalog(&self, operation: Operation) -> Result<Arc<dyn CatalogApi>> {
        self.catalog.clone().ok_or(VendingError::MissingCollaborator {
            operation,
            capability: Capability::Catalog,
        })
    }

    fn directory(&self, operation: Operation) -> Result<Arc<dyn DirectoryApi>> {
        self.directory.clone().ok_or(VendingError::MissingCollaborator {
            operation,
            capability: Capability::Directory,
        })
    }

    pub fn accounts(&self, operation: Operation) -> Result<AccountLifecycle> {
        self.check(operation)?;
        Ok(AccountLifecycle::new(
            self.catalog(operation)?,
            self.directory(operation)?,
            self.gate.clone(),
            self.settings.clone(),
        ))
    }

    pub fn resolver(&self, operation: Operation) -> Result<TreeResolver> {
        self.check(operation)?;
        Ok(TreeResolver::new(self.directory(operation)?))
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub async fn create(&self, spec: &AccountSpec) -> CreateOutcome {
        match self.accounts(Operation::CreateAccount) {
            Ok(accounts) => accounts.create(spec).await,
            Err(e) => CreateOutcome {
                identity: None,
                result: Err(e),
            },
        }
    }

    pub async fn read(&self, provisioned_product_id: &str) -> Result<AccountRecord> {
        self.accounts(Operation::ReadAccount)?
            .read(provisioned_product_id)
            .await
    }

    pub async fn update(&self, provisioned_product_id: &str, spec: &AccountSpec) -> Result<AccountRecord> {
        self.accounts(Operation::UpdateAccount)?
            .update(provisioned_product_id, spec)
            .await
    }

    pub async fn delete(&self, provisioned_product_id: &str, close_on_deletion: bool) -> Result<DeleteOutcome> {
        self.accounts(Operation::DeleteAccount)?
            .delete(provisioned_product_id, close_on_deletion)
            .await
    }

    pub async fn resolve_org_unit(&self, path: &str) -> Result<OrgNode> {
        let resolver = self.resolver(Operation::ResolveOrgUnit)?;
        let root = resolver.root().await?;
        resolver.resolve_path(&root, path).await
    }

    pub async fn list_org_units(&self) -> Result<OrgTree> {
        let resolver = self.resolver(Operation::ListOrgUnits)?;
        let root = resolver.root().await?;
        resolver.enumerate_tree(&root.id, &root.name).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
