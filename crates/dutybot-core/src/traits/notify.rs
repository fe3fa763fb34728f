//! Notify channel trait — where rotation announcements go.

use async_trait::async_trait;

use crate::error::Result;

/// Delivery sink for rotation announcements.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Channel name for logs (e.g. "stdout", "myteam").
    fn name(&self) -> &str;

    /// Deliver one announcement.
    async fn send(&self, text: &str) -> Result<()>;

    /// Release transport resources. Called once, after the last `send`.
    async fn shutdown(&self) -> Result<()>;
}
