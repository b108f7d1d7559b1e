//! `vending-api`: async clients for the two remote services the account
//! vending workflow drives.
//!
//! # Architecture
//!
//! ```text
//! CatalogApi (trait)      ← search products, list artifacts, provision /
//!     │                     update / terminate, describe record / product
//!     ▼
//! HttpCatalog             ← JSON 1.1 POST, X-Amz-Target dispatch
//!
//! DirectoryApi (trait)    ← list roots / child units (one page per call),
//!     │                     describe / close account
//!     ├── root_pages / child_pages  ← lazy BoxStream of pages
//!     ▼
//! HttpDirectory
//! ```
//!
//! The traits are the seam the domain crate is written against; tests
//! substitute in-memory fakes. Request signing is not done here: point the
//! endpoints at a signing proxy or pass a bearer token.

pub mod catalog;
pub mod directory;
pub mod error;
pub mod paging;
pub(crate) mod transport;
pub mod types;

pub use catalog::{CatalogApi, HttpCatalog};
pub use directory::{child_pages, root_pages, DirectoryApi, HttpDirectory};
pub use error::ApiError;
pub use paging::{pages, Page};
pub use transport::ClientSettings;
pub use types::{
    Account, OrganizationalUnit, ProductViewSummary, ProvisionProductRequest,
    ProvisionedProductDetail, ProvisioningArtifactDetail, ProvisioningParameter, RecordDescription,
    RecordDetail, RecordError, RecordOutput, Root, TerminateProvisionedProductRequest,
    UpdateProvisionedProductRequest,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ApiError>;
