//! Channels without a transport.

use async_trait::async_trait;

use dutybot_core::NotifyChannel;
use dutybot_core::error::Result;

// ═══════════════════════════════════════════════════════
// Empty
// ═══════════════════════════════════════════════════════

/// Discards every announcement.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyChannel;

#[async_trait]
impl NotifyChannel for EmptyChannel {
    fn name(&self) -> &str {
        "empty"
    }

    async fn send(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════
// StdOut — mostly for debugging
// ═══════════════════════════════════════════════════════

/// Prints every announcement as a line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdOutChannel;

#[async_trait]
impl NotifyChannel for StdOutChannel {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, text: &str) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{text}\n").as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
