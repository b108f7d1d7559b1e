//! In-memory stand-ins for the remote APIs, shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vending_api::types::record_status;
use vending_api::{
    Account, ApiError, CatalogApi, DirectoryApi, OrganizationalUnit, Page, ProductViewSummary,
    ProvisionProductRequest, ProvisionedProductDetail, ProvisioningArtifactDetail,
    RecordDescription, RecordDetail, RecordError, RecordOutput, Root,
    TerminateProvisionedProductRequest, UpdateProvisionedProductRequest,
};

pub(crate) fn service_error(operation: &'static str, message: &str) -> ApiError {
    ApiError::Service {
        operation,
        status: 500,
        code: "InternalFailure".into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// FakeDirectory
// ---------------------------------------------------------------------------

pub(crate) struct FakeDirectory {
    root: Root,
    page_size: usize,
    children: Mutex<HashMap<String, Vec<OrganizationalUnit>>>,
    failing: Mutex<HashSet<String>>,
    listed: Mutex<Vec<String>>,
    page_requests: Mutex<usize>,
    statuses: Mutex<VecDeque<String>>,
    closed: Mutex<Vec<String>>,
}

impl FakeDirectory {
    pub(crate) fn new(root_id: &str, root_name: &str) -> Self {
        Self {
            root: Root {
                id: root_id.into(),
                name: root_name.into(),
                arn: None,
            },
            page_size: usize::MAX,
            children: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            listed: Mutex::new(Vec::new()),
            page_requests: Mutex::new(0),
            statuses: Mutex::new(VecDeque::new()),
            closed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub(crate) fn add_unit(&self, parent_id: &str, id: &str, name: &str) {
        self.children
            .lock()
            .unwrap()
            .entry(parent_id.to_string())
            .or_default()
            .push(OrganizationalUnit {
                id: id.into(),
                name: name.into(),
                arn: None,
            });
    }

    pub(crate) fn fail_listing(&self, parent_id: &str) {
        self.failing.lock().unwrap().insert(parent_id.to_string());
    }

    /// Account statuses returned by successive `describe_account` calls; the
    /// last one repeats.
    pub(crate) fn push_statuses(&self, statuses: &[&str]) {
        let mut queue = self.statuses.lock().unwrap();
        queue.extend(statuses.iter().map(|s| s.to_string()));
    }

    /// Parents whose listing was started, in order.
    pub(crate) fn listed_parents(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }

    pub(crate) fn page_requests(&self) -> usize {
        *self.page_requests.lock().unwrap()
    }

    pub(crate) fn closed_accounts(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub(crate) fn status_requests_left(&self) -> usize {
        self.statuses.lock().unwrap().len()
    }
}

#[async_trait]
impl DirectoryApi for FakeDirectory {
    async fn list_roots(&self, _next_token: Option<&str>) -> vending_api::Result<Page<Root>> {
        Ok(Page::last(vec![self.root.clone()]))
    }

    async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<&str>,
    ) -> vending_api::Result<Page<OrganizationalUnit>> {
        *self.page_requests.lock().unwrap() += 1;
        if next_token.is_none() {
            self.listed.lock().unwrap().push(parent_id.to_string());
        }
        if self.failing.lock().unwrap().contains(parent_id) {
            return Err(service_error(
                "ListOrganizationalUnitsForParent",
                "throttled",
            ));
        }

        let all = self
            .children
            .lock()
            .unwrap()
            .get(parent_id)
            .cloned()
            .unwrap_or_default();
        let start: usize = next_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = start.saturating_add(self.page_size).min(all.len());
        Ok(Page {
            items: all[start..end].to_vec(),
            next_token: (end < all.len()).then(|| end.to_string()),
        })
    }

    async fn describe_account(&self, account_id: &str) -> vending_api::Result<Account> {
        let mut queue = self.statuses.lock().unwrap();
        let status = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        let status = status.ok_or_else(|| service_error("DescribeAccount", "no status queued"))?;
        Ok(Account {
            id: account_id.into(),
            name: None,
            email: None,
            arn: None,
            status,
            joined_timestamp: None,
        })
    }

    async fn close_account(&self, account_id: &str) -> vending_api::Result<()> {
        self.closed.lock().unwrap().push(account_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeCatalog
// ---------------------------------------------------------------------------

/// Catalog fake. Each submission creates record `rec-N` whose successive
/// `describe_record` calls walk through the queued statuses.
pub(crate) struct FakeCatalog {
    products: Mutex<Vec<ProductViewSummary>>,
    artifacts: Mutex<Vec<ProvisioningArtifactDetail>>,
    script: Mutex<VecDeque<RecordDescription>>,
    records: Mutex<HashMap<String, VecDeque<RecordDescription>>>,
    failing_reads: Mutex<HashSet<String>>,
    submissions: Mutex<Vec<Submission>>,
    products_by_id: Mutex<HashMap<String, ProvisionedProductDetail>>,
    latency: Duration,
    in_flight: Mutex<usize>,
    max_in_flight: Mutex<usize>,
    describe_calls: Mutex<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Submission {
    Provision(ProvisionProductRequest),
    Update(UpdateProvisionedProductRequest),
    Terminate(TerminateProvisionedProductRequest),
}

pub(crate) fn record(status: &str, outputs: &[(&str, &str)]) -> RecordDescription {
    RecordDescription {
        record_detail: RecordDetail {
            record_id: String::new(),
            provisioned_product_id: None,
            provisioned_product_name: None,
            status: status.into(),
            record_type: None,
            record_errors: vec![],
            updated_time: None,
        },
        record_outputs: outputs
            .iter()
            .map(|(k, v)| RecordOutput::new(*k, *v))
            .collect(),
    }
}

pub(crate) fn failed_record(reasons: &[&str]) -> RecordDescription {
    let mut rec = record(record_status::FAILED, &[]);
    rec.record_detail.record_errors = reasons
        .iter()
        .map(|r| RecordError {
            code: None,
            description: Some(r.to_string()),
        })
        .collect();
    rec
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self {
            products: Mutex::new(vec![ProductViewSummary {
                product_id: "prod-1".into(),
                name: "AWS Control Tower Account Factory".into(),
                owner: None,
            }]),
            artifacts: Mutex::new(vec![
                ProvisioningArtifactDetail {
                    id: "art-0".into(),
                    name: Some("v0".into()),
                    active: false,
                    created_time: None,
                },
                ProvisioningArtifactDetail {
                    id: "art-1".into(),
                    name: Some("v1".into()),
                    active: true,
                    created_time: None,
                },
            ]),
            script: Mutex::new(VecDeque::new()),
            records: Mutex::new(HashMap::new()),
            failing_reads: Mutex::new(HashSet::new()),
            submissions: Mutex::new(Vec::new()),
            products_by_id: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            in_flight: Mutex::new(0),
            max_in_flight: Mutex::new(0),
            describe_calls: Mutex::new(0),
        }
    }

    /// Sleep this long inside search and submit, to widen race windows.
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn set_products(&self, products: Vec<ProductViewSummary>) {
        *self.products.lock().unwrap() = products;
    }

    pub(crate) fn set_artifacts(&self, artifacts: Vec<ProvisioningArtifactDetail>) {
        *self.artifacts.lock().unwrap() = artifacts;
    }

    /// Status sequence handed to the next submitted record.
    pub(crate) fn script(&self, sequence: Vec<RecordDescription>) {
        self.script.lock().unwrap().extend(sequence);
    }

    /// Install a record directly, as if submitted earlier.
    pub(crate) fn put_record(&self, record_id: &str, sequence: Vec<RecordDescription>) {
        self.records
            .lock()
            .unwrap()
            .insert(record_id.to_string(), sequence.into());
    }

    pub(crate) fn put_provisioned_product(&self, detail: ProvisionedProductDetail) {
        self.products_by_id
            .lock()
            .unwrap()
            .insert(detail.id.clone(), detail);
    }

    pub(crate) fn fail_reads_of(&self, record_id: &str) {
        self.failing_reads
            .lock()
            .unwrap()
            .insert(record_id.to_string());
    }

    pub(crate) fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        *self.max_in_flight.lock().unwrap()
    }

    pub(crate) fn describe_calls(&self) -> usize {
        *self.describe_calls.lock().unwrap()
    }

    fn enter(&self) {
        let mut in_flight = self.in_flight.lock().unwrap();
        *in_flight += 1;
        let mut max = self.max_in_flight.lock().unwrap();
        *max = (*max).max(*in_flight);
    }

    fn leave(&self) {
        *self.in_flight.lock().unwrap() -= 1;
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn submit(&self, provisioned_product_id: &str, submission: Submission) -> RecordDetail {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(submission);
        let record_id = format!("rec-{}", submissions.len());

        let mut sequence: VecDeque<RecordDescription> =
            self.script.lock().unwrap().drain(..).collect();
        if sequence.is_empty() {
            sequence.push_back(record(record_status::SUCCEEDED, &[]));
        }
        for rec in sequence.iter_mut() {
            rec.record_detail.record_id = record_id.clone();
            rec.record_detail.provisioned_product_id = Some(provisioned_product_id.to_string());
        }
        self.records
            .lock()
            .unwrap()
            .insert(record_id.clone(), sequence);

        self.products_by_id
            .lock()
            .unwrap()
            .entry(provisioned_product_id.to_string())
            .or_insert_with(|| ProvisionedProductDetail {
                id: provisioned_product_id.to_string(),
                name: provisioned_product_id.to_string(),
                status: None,
                last_record_id: None,
            })
            .last_record_id = Some(record_id.clone());

        RecordDetail {
            record_id,
            provisioned_product_id: Some(provisioned_product_id.to_string()),
            provisioned_product_name: None,
            status: record_status::CREATED.into(),
            record_type: None,
            record_errors: vec![],
            updated_time: None,
        }
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn search_products(&self, _full_text: &str) -> vending_api::Result<Vec<ProductViewSummary>> {
        self.enter();
        self.pause().await;
        Ok(self.products.lock().unwrap().clone())
    }

    async fn list_provisioning_artifacts(
        &self,
        _product_id: &str,
    ) -> vending_api::Result<Vec<ProvisioningArtifactDetail>> {
        Ok(self.artifacts.lock().unwrap().clone())
    }

    async fn provision_product(
        &self,
        request: &ProvisionProductRequest,
    ) -> vending_api::Result<RecordDetail> {
        self.pause().await;
        let pp_id = format!("pp-{}", request.provisioned_product_name);
        let detail = self.submit(&pp_id, Submission::Provision(request.clone()));
        if let Some(pp) = self.products_by_id.lock().unwrap().get_mut(&pp_id) {
            pp.name = request.provisioned_product_name.clone();
        }
        self.leave();
        Ok(detail)
    }

    async fn update_provisioned_product(
        &self,
        request: &UpdateProvisionedProductRequest,
    ) -> vending_api::Result<RecordDetail> {
        Ok(self.submit(
            &request.provisioned_product_id,
            Submission::Update(request.clone()),
        ))
    }

    async fn terminate_provisioned_product(
        &self,
        request: &TerminateProvisionedProductRequest,
    ) -> vending_api::Result<RecordDetail> {
        Ok(self.submit(
            &request.provisioned_product_id,
            Submission::Terminate(request.clone()),
        ))
    }

    async fn describe_record(&self, record_id: &str) -> vending_api::Result<RecordDescription> {
        *self.describe_calls.lock().unwrap() += 1;
        if self.failing_reads.lock().unwrap().contains(record_id) {
            return Err(service_error("DescribeRecord", "connection reset"));
        }
        let mut records = self.records.lock().unwrap();
        let sequence = records
            .get_mut(record_id)
            .ok_or_else(|| service_error("DescribeRecord", "unknown record"))?;
        let rec = if sequence.len() > 1 {
            sequence.pop_front()
        } else {
            sequence.front().cloned()
        };
        rec.ok_or_else(|| service_error("DescribeRecord", "empty record"))
    }

    async fn describe_provisioned_product(
        &self,
        id: &str,
    ) -> vending_api::Result<ProvisionedProductDetail> {
        self.products_by_id
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::Service {
                operation: "DescribeProvisionedProduct",
                status: 400,
                code: "ResourceNotFoundException".into(),
                message: format!("{id} not found"),
            })
    }
}
