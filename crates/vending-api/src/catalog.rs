use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::transport::{ClientSettings, JsonTransport};
use crate::types::{
    ProductViewSummary, ProvisionProductRequest, ProvisionedProductDetail,
    ProvisioningArtifactDetail, RecordDescription, RecordDetail,
    TerminateProvisionedProductRequest, UpdateProvisionedProductRequest,
};
use crate::Result;

const TARGET_PREFIX: &str = "AWS242ServiceCatalogService";

// ─── CatalogApi ───────────────────────────────────────────────────────────

/// The provisioning catalog operations the account lifecycle consumes.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Products whose text matches `full_text`.
    async fn search_products(&self, full_text: &str) -> Result<Vec<ProductViewSummary>>;

    async fn list_provisioning_artifacts(
        &self,
        product_id: &str,
    ) -> Result<Vec<ProvisioningArtifactDetail>>;

    async fn provision_product(&self, request: &ProvisionProductRequest) -> Result<RecordDetail>;

    async fn update_provisioned_product(
        &self,
        request: &UpdateProvisionedProductRequest,
    ) -> Result<RecordDetail>;

    async fn terminate_provisioned_product(
        &self,
        request: &TerminateProvisionedProductRequest,
    ) -> Result<RecordDetail>;

    async fn describe_record(&self, record_id: &str) -> Result<RecordDescription>;

    async fn describe_provisioned_product(&self, id: &str) -> Result<ProvisionedProductDetail>;
}

// ─── HttpCatalog ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpCatalog {
    transport: JsonTransport,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchProductsOutput {
    #[serde(default)]
    product_view_summaries: Vec<ProductViewSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListProvisioningArtifactsOutput {
    #[serde(default)]
    provisioning_artifact_details: Vec<ProvisioningArtifactDetail>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordDetailOutput {
    record_detail: RecordDetail,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeProvisionedProductOutput {
    provisioned_product_detail: ProvisionedProductDetail,
}

impl HttpCatalog {
    pub fn new(endpoint: impl Into<String>, settings: &ClientSettings) -> Result<Self> {
        Ok(Self {
            transport: JsonTransport::new(endpoint, TARGET_PREFIX, settings)?,
        })
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn search_products(&self, full_text: &str) -> Result<Vec<ProductViewSummary>> {
        let out: SearchProductsOutput = self
            .transport
            .call(
                "SearchProducts",
                &json!({ "Filters": { "FullTextSearch": [full_text] } }),
            )
            .await?;
        Ok(out.product_view_summaries)
    }

    async fn list_provisioning_artifacts(
        &self,
        product_id: &str,
    ) -> Result<Vec<ProvisioningArtifactDetail>> {
        let out: ListProvisioningArtifactsOutput = self
            .transport
            .call(
                "ListProvisioningArtifacts",
                &json!({ "ProductId": product_id }),
            )
            .await?;
        Ok(out.provisioning_artifact_details)
    }

    async fn provision_product(&self, request: &ProvisionProductRequest) -> Result<RecordDetail> {
        let out: RecordDetailOutput = self.transport.call("ProvisionProduct", request).await?;
        Ok(out.record_detail)
    }

    async fn update_provisioned_product(
        &self,
        request: &UpdateProvisionedProductRequest,
    ) -> Result<RecordDetail> {
        let out: RecordDetailOutput = self
            .transport
            .call("UpdateProvisionedProduct", request)
            .await?;
        Ok(out.record_detail)
    }

    async fn terminate_provisioned_product(
        &self,
        request: &TerminateProvisionedProductRequest,
    ) -> Result<RecordDetail> {
        let out: RecordDetailOutput = self
            .transport
            .call("TerminateProvisionedProduct", request)
            .await?;
        Ok(out.record_detail)
    }

    async fn describe_record(&self, record_id: &str) -> Result<RecordDescription> {
        self.transport
            .call("DescribeRecord", &json!({ "Id": record_id }))
            .await
    }

    async fn describe_provisioned_product(&self, id: &str) -> Result<ProvisionedProductDetail> {
        let out: DescribeProvisionedProductOutput = self
            .transport
            .call("DescribeProvisionedProduct", &json!({ "Id": id }))
            .await?;
        Ok(out.provisioned_product_detail)
    }
}
