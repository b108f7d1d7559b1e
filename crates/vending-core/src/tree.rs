use std::sync::Arc;

use futures::TryStreamExt;
use serde::Serialize;
use vending_api::{child_pages, root_pages, DirectoryApi, OrganizationalUnit};

use crate::error::{Result, VendingError};

/// Deepest materialized path, counted in segments including the root.
pub const MAX_PATH_SEGMENTS: usize = 5;

/// Path segment that stands for the organization root.
pub const ROOT_SEGMENT: &str = "Root";

// ---------------------------------------------------------------------------
// OrgNode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgNode {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    /// `None` for the organization root.
    pub parent_id: Option<String>,
    /// Names from the root down to this node, root name first.
    pub path: Vec<String>,
}

impl OrgNode {
    pub fn root(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            path: vec![name.clone()],
            name,
            arn: None,
            parent_id: None,
        }
    }

    fn child(&self, ou: OrganizationalUnit) -> Self {
        let mut path = self.path.clone();
        path.push(ou.name.clone());
        Self {
            id: ou.id,
            name: ou.name,
            arn: ou.arn,
            parent_id: Some(self.id.clone()),
            path,
        }
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// `Root/Engineering/Platform`
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }

    /// `Platform (ou-p1)`, the form the provisioning template expects.
    pub fn display_with_id(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

// ---------------------------------------------------------------------------
// OrgTree
// ---------------------------------------------------------------------------

/// A subtree whose children were not listed because its root sits at
/// [`MAX_PATH_SEGMENTS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncatedSubtree {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrgTree {
    /// Every descendant of the root in depth-first pre-order.
    pub nodes: Vec<OrgNode>,
    pub truncated: Vec<TruncatedSubtree>,
}

// ---------------------------------------------------------------------------
// TreeResolver
// ---------------------------------------------------------------------------

pub struct TreeResolver {
    directory: Arc<dyn DirectoryApi>,
}

impl TreeResolver {
    pub fn new(directory: Arc<dyn DirectoryApi>) -> Self {
        Self { directory }
    }

    /// The first organization root.
    pub async fn root(&self) -> Result<OrgNode> {
        let mut pages = root_pages(self.directory.as_ref());
        while let Some(page) = pages
            .try_next()
            .await
            .map_err(VendingError::remote("list roots of", "organization"))?
        {
            if let Some(root) = page.into_iter().next() {
                return Ok(OrgNode {
                    arn: root.arn,
                    ..OrgNode::root(root.id, root.name)
                });
            }
        }
        Err(VendingError::NoOrganizationRoot)
    }

    /// Walk `path` down from `root`, one child listing per segment.
    ///
    /// `Root` segments (any case) and empty segments are skipped, so
    /// `Root/Engineering`, `/Engineering` and `Engineering` all resolve to the
    /// same unit. A path made only of skipped segments resolves to `root`.
    pub async fn resolve_path(&self, root: &OrgNode, path: &str) -> Result<OrgNode> {
        let mut current = root.clone();
        for segment in path.split('/') {
            if segment.is_empty() || segment.eq_ignore_ascii_case(ROOT_SEGMENT) {
                continue;
            }
            current = self.find_child(&current, segment).await?;
        }
        tracing::debug!(path, id = %current.id, "resolved organizational unit");
        Ok(current)
    }

    async fn find_child(&self, parent: &OrgNode, segment: &str) -> Result<OrgNode> {
        tracing::debug!(parent = %parent.name, parent_id = %parent.id, "listing child units");
        let mut pages = child_pages(self.directory.as_ref(), &parent.id);
        while let Some(page) = pages
            .try_next()
            .await
            .map_err(|source| tree_walk(parent, source))?
        {
            if let Some(ou) = page.into_iter().find(|ou| ou.name == segment) {
                return Ok(parent.child(ou));
            }
        }
        Err(VendingError::OrgUnitNotFound {
            segment: segment.to_string(),
            parent_id: parent.id.clone(),
        })
    }

    /// Depth-first, pre-order listing of every unit below the root, each with
    /// its materialized path. Units at [`MAX_PATH_SEGMENTS`] are returned but
    /// not descended into; they are reported in [`OrgTree::truncated`].
    ///
    /// Any listing failure aborts the walk and names the subtree that failed.
    pub async fn enumerate_tree(&self, root_id: &str, root_name: &str) -> Result<OrgTree> {
        let mut tree = OrgTree::default();
        let mut stack = vec![OrgNode::root(root_id, root_name)];

        while let Some(node) = stack.pop() {
            if node.parent_id.is_some() {
                tree.nodes.push(node.clone());
            }

            if node.depth() >= MAX_PATH_SEGMENTS {
                tracing::info!(
                    path = %node.path_string(),
                    id = %node.id,
                    "maximum OU nesting reached, skipping subtree"
                );
                tree.truncated.push(TruncatedSubtree {
                    id: node.id.clone(),
                    path: node.path_string(),
                });
                continue;
            }

            let children = self.list_children(&node).await?;
            stack.extend(children.into_iter().rev().map(|ou| node.child(ou)));
        }

        Ok(tree)
    }

    async fn list_children(&self, parent: &OrgNode) -> Result<Vec<OrganizationalUnit>> {
        tracing::debug!(path = %parent.path_string(), parent_id = %parent.id, "listing child units");
        let pages: Vec<Vec<OrganizationalUnit>> = child_pages(self.directory.as_ref(), &parent.id)
            .try_collect()
            .await
            .map_err(|source| tree_walk(parent, source))?;
        Ok(pages.into_iter().flatten().collect())
    }
}

fn tree_walk(parent: &OrgNode, source: vending_api::ApiError) -> VendingError {
    VendingError::TreeWalk {
        parent_path: parent.path_string(),
        parent_id: parent.id.clone(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
