use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::json;

use crate::paging::{pages, Page};
use crate::transport::{ClientSettings, JsonTransport};
use crate::types::{Account, OrganizationalUnit, Root};
use crate::Result;

const TARGET_PREFIX: &str = "AWSOrganizationsV20161128";

// ─── DirectoryApi ─────────────────────────────────────────────────────────

/// The organization directory operations the resolver and close waiter use.
///
/// Listing operations return one page per call; wrap them with
/// [`root_pages`] or [`child_pages`] to iterate.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn list_roots(&self, next_token: Option<&str>) -> Result<Page<Root>>;

    async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<&str>,
    ) -> Result<Page<OrganizationalUnit>>;

    async fn describe_account(&self, account_id: &str) -> Result<Account>;

    async fn close_account(&self, account_id: &str) -> Result<()>;
}

/// Lazy page stream over the organization roots.
pub fn root_pages(api: &dyn DirectoryApi) -> BoxStream<'_, Result<Vec<Root>>> {
    pages(move |token| async move { api.list_roots(token.as_deref()).await })
}

/// Lazy page stream over the organizational units directly under `parent_id`.
pub fn child_pages<'a>(
    api: &'a dyn DirectoryApi,
    parent_id: &'a str,
) -> BoxStream<'a, Result<Vec<OrganizationalUnit>>> {
    pages(move |token| async move {
        api.list_organizational_units_for_parent(parent_id, token.as_deref())
            .await
    })
}

// ─── HttpDirectory ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpDirectory {
    transport: JsonTransport,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListRootsOutput {
    #[serde(default)]
    roots: Vec<Root>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListOrganizationalUnitsOutput {
    #[serde(default)]
    organizational_units: Vec<OrganizationalUnit>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeAccountOutput {
    account: Account,
}

impl HttpDirectory {
    pub fn new(endpoint: impl Into<String>, settings: &ClientSettings) -> Result<Self> {
        Ok(Self {
            transport: JsonTransport::new(endpoint, TARGET_PREFIX, settings)?,
        })
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectory {
    async fn list_roots(&self, next_token: Option<&str>) -> Result<Page<Root>> {
        let out: ListRootsOutput = self
            .transport
            .call("ListRoots", &json!({ "NextToken": next_token }))
            .await?;
        Ok(Page {
            items: out.roots,
            next_token: out.next_token,
        })
    }

    async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<&str>,
    ) -> Result<Page<OrganizationalUnit>> {
        let out: ListOrganizationalUnitsOutput = self
            .transport
            .call(
                "ListOrganizationalUnitsForParent",
                &json!({ "ParentId": parent_id, "NextToken": next_token }),
            )
            .await?;
        Ok(Page {
            items: out.organizational_units,
            next_token: out.next_token,
        })
    }

    async fn describe_account(&self, account_id: &str) -> Result<Account> {
        let out: DescribeAccountOutput = self
            .transport
            .call("DescribeAccount", &json!({ "AccountId": account_id }))
            .await?;
        Ok(out.account)
    }

    async fn close_account(&self, account_id: &str) -> Result<()> {
        let _: IgnoredAny = self
            .transport
            .call("CloseAccount", &json!({ "AccountId": account_id }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use mockito::Matcher;

    const LIST_OUS: &str = "AWSOrganizationsV20161128.ListOrganizationalUnitsForParent";

    fn client(server: &mockito::ServerGuard) -> HttpDirectory {
        HttpDirectory::new(server.url(), &ClientSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn child_pages_follows_next_token() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/")
            .match_header("x-amz-target", LIST_OUS)
            .match_body(Matcher::Json(json!({"ParentId": "r-1", "NextToken": null})))
            .with_body(
                r#"{"OrganizationalUnits":[{"Id":"ou-a","Name":"Engineering"}],"NextToken":"t2"}"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("POST", "/")
            .match_header("x-amz-target", LIST_OUS)
            .match_body(Matcher::Json(json!({"ParentId": "r-1", "NextToken": "t2"})))
            .with_body(r#"{"OrganizationalUnits":[{"Id":"ou-b","Name":"Security"}]}"#)
            .create_async()
            .await;

        let directory = client(&server);
        let pages: Vec<Vec<OrganizationalUnit>> = child_pages(&directory, "r-1")
            .try_collect()
            .await
            .unwrap();
        first.assert_async().await;
        second.assert_async().await;

        let names: Vec<&str> = pages.iter().flatten().map(|ou| ou.name.as_str()).collect();
        assert_eq!(names, vec!["Engineering", "Security"]);
    }

    #[tokio::test]
    async fn root_pages_single_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_header("x-amz-target", "AWSOrganizationsV20161128.ListRoots")
            .with_body(r#"{"Roots":[{"Id":"r-1","Name":"Root","Arn":"arn:root"}]}"#)
            .create_async()
            .await;

        let directory = client(&server);
        let roots: Vec<Vec<Root>> = root_pages(&directory).try_collect().await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0][0].id, "r-1");
    }

    #[tokio::test]
    async fn describe_account_reads_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_header("x-amz-target", "AWSOrganizationsV20161128.DescribeAccount")
            .match_body(Matcher::Json(json!({"AccountId": "111122223333"})))
            .with_body(
                r#"{"Account":{"Id":"111122223333","Name":"sandbox","Status":"PENDING_CLOSURE","JoinedTimestamp":1700000000}}"#,
            )
            .create_async()
            .await;

        let account = client(&server)
            .describe_account("111122223333")
            .await
            .unwrap();
        assert_eq!(account.status, "PENDING_CLOSURE");
        assert!(account.joined_timestamp.is_some());
    }

    #[tokio::test]
    async fn close_account_accepts_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-amz-target", "AWSOrganizationsV20161128.CloseAccount")
            .with_body("")
            .create_async()
            .await;

        client(&server).close_account("111122223333").await.unwrap();
        mock.assert_async().await;
    }
}
