pub mod account;
pub mod close;
pub mod config;
pub mod error;
pub mod io;
pub mod provider;
pub mod provisioning;
pub mod tree;

#[cfg(test)]
mod fakes;

pub use account::{AccountLifecycle, AccountRecord, AccountSpec, CreateOutcome, DeleteOutcome, SsoUser};
pub use config::Config;
pub use error::{Result, VendingError};
pub use provider::{Capability, Operation, Provider};
pub use tree::{OrgNode, OrgTree};
