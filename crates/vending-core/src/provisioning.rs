use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use vending_api::types::record_status;
use vending_api::{
    CatalogApi, ProvisionProductRequest, ProvisioningParameter, RecordDescription, RecordDetail,
    RecordOutput, TerminateProvisionedProductRequest, UpdateProvisionedProductRequest,
};

use crate::error::{Result, VendingError};

pub const DEFAULT_PRODUCT: &str = "AWS Control Tower Account Factory";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// SubmissionGate
// ---------------------------------------------------------------------------

/// Serializes provisioning submissions.
///
/// Product search, artifact selection and submission are separate remote
/// calls, so only one submit-through-terminal sequence may run per gate.
/// Controllers that must exclude each other share one gate through `Arc`.
#[derive(Debug, Default)]
pub struct SubmissionGate {
    lock: Mutex<()>,
}

/// Proof that the holder owns the gate. Dropping it releases the gate.
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a SubmissionGate,
    _guard: MutexGuard<'a, ()>,
}

impl GatePermit<'_> {
    /// Whether this permit was issued by `gate`.
    pub fn is_from(&self, gate: &SubmissionGate) -> bool {
        std::ptr::eq(self.gate, gate)
    }
}

impl SubmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> GatePermit<'_> {
        GatePermit {
            gate: self,
            _guard: self.lock.lock().await,
        }
    }
}

// ---------------------------------------------------------------------------
// ProvisioningAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningAction {
    /// Provision a new instance of the configured product. The artifact is
    /// picked at submission time.
    Create {
        provisioned_product_name: String,
        parameters: Vec<ProvisioningParameter>,
    },
    Update {
        provisioned_product_id: String,
        parameters: Vec<ProvisioningParameter>,
    },
    Terminate {
        provisioned_product_id: String,
    },
}

impl ProvisioningAction {
    /// Human-readable subject used in logs and errors.
    pub fn subject(&self) -> &str {
        match self {
            ProvisioningAction::Create {
                provisioned_product_name,
                ..
            } => provisioned_product_name,
            ProvisioningAction::Update {
                provisioned_product_id,
                ..
            }
            | ProvisioningAction::Terminate {
                provisioned_product_id,
            } => provisioned_product_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProvisioningAction::Create { .. } => "create",
            ProvisioningAction::Update { .. } => "update",
            ProvisioningAction::Terminate { .. } => "terminate",
        }
    }
}

// ---------------------------------------------------------------------------
// ProvisioningJob
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Anything that is not explicitly terminal counts as still running.
    pub fn from_remote(status: &str) -> Self {
        match status {
            record_status::SUCCEEDED => JobStatus::Succeeded,
            record_status::FAILED => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisioningJob {
    /// The action's subject, for messages.
    pub name: String,
    pub record_id: String,
    pub provisioned_product_id: Option<String>,
    /// Artifact chosen for a create; `None` otherwise.
    pub artifact_id: Option<String>,
    pub status: JobStatus,
    pub failures: Vec<String>,
    pub outputs: Vec<RecordOutput>,
}

impl ProvisioningJob {
    fn submitted(name: &str, artifact_id: Option<String>, detail: RecordDetail) -> Self {
        let mut job = Self {
            name: name.to_string(),
            record_id: detail.record_id.clone(),
            provisioned_product_id: detail.provisioned_product_id.clone(),
            artifact_id,
            status: JobStatus::Pending,
            failures: Vec::new(),
            outputs: Vec::new(),
        };
        job.refresh(RecordDescription {
            record_detail: detail,
            record_outputs: Vec::new(),
        });
        job
    }

    fn refresh(&mut self, description: RecordDescription) {
        let detail = description.record_detail;
        self.status = JobStatus::from_remote(&detail.status);
        self.failures = detail
            .record_errors
            .into_iter()
            .filter_map(|e| e.description)
            .collect();
        if detail.provisioned_product_id.is_some() {
            self.provisioned_product_id = detail.provisioned_product_id;
        }
        if !description.record_outputs.is_empty() {
            self.outputs = description.record_outputs;
        }
    }

    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.output_key.as_deref() == Some(key))
            .and_then(|o| o.output_value.as_deref())
    }
}

// ---------------------------------------------------------------------------
// ProvisioningController
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProvisioningSettings {
    /// Full-text query that must match exactly one catalog product.
    pub product_query: String,
    pub poll_interval: Duration,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            product_query: DEFAULT_PRODUCT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct ProvisioningController {
    catalog: Arc<dyn CatalogApi>,
    gate: Arc<SubmissionGate>,
    settings: ProvisioningSettings,
}

impl ProvisioningController {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        gate: Arc<SubmissionGate>,
        settings: ProvisioningSettings,
    ) -> Self {
        Self {
            catalog,
            gate,
            settings,
        }
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    /// Run `action` to a terminal state under the gate.
    ///
    /// `on_submitted` sees the job as soon as the catalog accepts it, before
    /// any polling, so callers can record the new identity even if the job
    /// later fails.
    pub async fn execute<F>(&self, action: ProvisioningAction, on_submitted: F) -> Result<ProvisioningJob>
    where
        F: FnOnce(&ProvisioningJob),
    {
        let permit = self.gate.acquire().await;
        let job = self.submit(&permit, &action).await?;
        on_submitted(&job);
        let job = self.await_terminal(job).await?;
        drop(permit);
        Ok(job)
    }

    /// Submit `action`. For a create, first locate the single matching
    /// product and its active artifact.
    ///
    /// `permit` must come from this controller's own gate.
    pub async fn submit(
        &self,
        permit: &GatePermit<'_>,
        action: &ProvisioningAction,
    ) -> Result<ProvisioningJob> {
        debug_assert!(
            permit.is_from(&self.gate),
            "submission permit was issued by a different gate"
        );
        let name = action.subject();
        let token = uuid::Uuid::new_v4().to_string();

        let job = match action {
            ProvisioningAction::Create {
                provisioned_product_name,
                parameters,
            } => {
                let product_id = self.find_product().await?;
                let artifact_id = self.active_artifact(&product_id).await?;
                tracing::info!(
                    name,
                    product_id = %product_id,
                    artifact_id = %artifact_id,
                    "provisioning account"
                );
                let detail = self
                    .catalog
                    .provision_product(&ProvisionProductRequest {
                        product_id,
                        provisioning_artifact_id: artifact_id.clone(),
                        provisioned_product_name: provisioned_product_name.clone(),
                        provisioning_parameters: parameters.clone(),
                        provision_token: token,
                    })
                    .await
                    .map_err(VendingError::remote("provisioning account", name))?;
                ProvisioningJob::submitted(name, Some(artifact_id), detail)
            }
            ProvisioningAction::Update {
                provisioned_product_id,
                parameters,
            } => {
                tracing::info!(name, "updating provisioned account");
                let detail = self
                    .catalog
                    .update_provisioned_product(&UpdateProvisionedProductRequest {
                        provisioned_product_id: provisioned_product_id.clone(),
                        provisioning_parameters: parameters.clone(),
                        update_token: token,
                    })
                    .await
                    .map_err(VendingError::remote("updating provisioned account", name))?;
                ProvisioningJob::submitted(name, None, detail)
            }
            ProvisioningAction::Terminate {
                provisioned_product_id,
            } => {
                tracing::info!(name, "terminating provisioned account");
                let detail = self
                    .catalog
                    .terminate_provisioned_product(&TerminateProvisionedProductRequest {
                        provisioned_product_id: provisioned_product_id.clone(),
                        terminate_token: token,
                    })
                    .await
                    .map_err(VendingError::remote("terminating provisioned account", name))?;
                ProvisioningJob::submitted(name, None, detail)
            }
        };

        tracing::debug!(
            name,
            record_id = %job.record_id,
            kind = action.kind(),
            "provisioning job submitted"
        );
        Ok(job)
    }

    /// Poll the job's record until it succeeds or fails.
    ///
    /// The first fetch happens immediately. There is no deadline: a record
    /// that never leaves a pending state keeps this waiting.
    pub async fn await_terminal(&self, mut job: ProvisioningJob) -> Result<ProvisioningJob> {
        loop {
            let description = self
                .catalog
                .describe_record(&job.record_id)
                .await
                .map_err(|source| VendingError::ProvisioningRead {
                    name: job.name.clone(),
                    record_id: job.record_id.clone(),
                    source,
                })?;
            job.refresh(description);

            match job.status {
                JobStatus::Succeeded => {
                    tracing::info!(name = %job.name, record_id = %job.record_id, "provisioning succeeded");
                    return Ok(job);
                }
                JobStatus::Failed => {
                    tracing::warn!(name = %job.name, record_id = %job.record_id, "provisioning failed");
                    return Err(VendingError::ProvisioningFailed {
                        name: job.name,
                        record_id: job.record_id,
                        reasons: job.failures,
                    });
                }
                JobStatus::Pending => {
                    tracing::debug!(name = %job.name, record_id = %job.record_id, "provisioning still in progress");
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
            }
        }
    }

    async fn find_product(&self) -> Result<String> {
        let query = &self.settings.product_query;
        tracing::debug!(query = %query, "searching catalog product");
        let products = self
            .catalog
            .search_products(query)
            .await
            .map_err(VendingError::remote("searching catalog for", query.clone()))?;

        match products.as_slice() {
            [only] => Ok(only.product_id.clone()),
            [] => Err(VendingError::ProductNotFound {
                query: query.clone(),
            }),
            many => Err(VendingError::AmbiguousProduct {
                query: query.clone(),
                count: many.len(),
            }),
        }
    }

    async fn active_artifact(&self, product_id: &str) -> Result<String> {
        let artifacts = self
            .catalog
            .list_provisioning_artifacts(product_id)
            .await
            .map_err(VendingError::remote("listing provisioning artifacts of", product_id))?;

        artifacts
            .into_iter()
            .find(|a| a.active)
            .map(|a| a.id)
            .ok_or_else(|| VendingError::NoActiveArtifact {
                product_id: product_id.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
