use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use vending_api::types::account_status;
use vending_api::DirectoryApi;

use crate::error::{Result, VendingError};

pub const DEFAULT_CLOSE_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(300);

/// Timing for [`CloseWaiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for CloseSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_CLOSE_POLL_INTERVAL,
            timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

/// Polls a directory account until it settles in a target status.
pub struct CloseWaiter {
    directory: Arc<dyn DirectoryApi>,
    pending: Vec<String>,
    target: String,
    settings: CloseSettings,
}

impl CloseWaiter {
    /// Waiter for account closure: `PENDING_CLOSURE` until `SUSPENDED`.
    pub fn new(directory: Arc<dyn DirectoryApi>, settings: CloseSettings) -> Self {
        Self {
            directory,
            pending: vec![account_status::PENDING_CLOSURE.to_string()],
            target: account_status::SUSPENDED.to_string(),
            settings,
        }
    }

    pub fn with_statuses(mut self, pending: &[&str], target: &str) -> Self {
        self.pending = pending.iter().map(|s| s.to_string()).collect();
        self.target = target.to_string();
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Ask the directory to close the account. Does not wait.
    pub async fn request_close(&self, account_id: &str) -> Result<()> {
        tracing::info!(account_id, "requesting account closure");
        self.directory
            .close_account(account_id)
            .await
            .map_err(VendingError::remote("closing account", account_id))
    }

    /// Fetch the account status now and then every poll interval until it
    /// equals the target.
    ///
    /// Statuses outside the pending set fail immediately. Once the timeout
    /// has elapsed the last observed status is reported.
    pub async fn wait_for_target_status(&self, account_id: &str) -> Result<String> {
        let deadline = Instant::now() + self.settings.timeout;
        loop {
            let account = self
                .directory
                .describe_account(account_id)
                .await
                .map_err(VendingError::remote("describing account", account_id))?;
            let status = account.status;

            if status == self.target {
                tracing::info!(account_id, status = %status, "account reached target status");
                return Ok(status);
            }
            if !self.pending.iter().any(|p| *p == status) {
                return Err(VendingError::UnexpectedStatus {
                    account_id: account_id.to_string(),
                    status,
                    expected: self.expected(),
                });
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(VendingError::CloseTimeout {
                    account_id: account_id.to_string(),
                    target: self.target.clone(),
                    last_status: status,
                    timeout: self.settings.timeout,
                });
            }

            // The last sleep is cut short so one more poll lands on the deadline.
            let pause = self.settings.poll_interval.min(deadline - now);
            tracing::debug!(account_id, status = %status, ?pause, "waiting for account status");
            tokio::time::sleep(pause).await;
        }
    }

    fn expected(&self) -> Vec<String> {
        let mut expected = self.pending.clone();
        expected.push(self.target.clone());
        expected
    }
}
