//! In-process pipe channel.
//!
//! Every announcement becomes one line on the reading end. Shutting the
//! channel down closes the pipe, so the reader sees end of stream.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::sync::Mutex;

use dutybot_core::NotifyChannel;
use dutybot_core::error::{DutyBotError, Result};

/// Bytes buffered before `send` waits for the reader.
const PIPE_BUFFER: usize = 64 * 1024;

pub struct PipeChannel {
    writer: Mutex<Option<DuplexStream>>,
}

pub struct PipeReader {
    lines: Lines<BufReader<DuplexStream>>,
}

impl PipeChannel {
    pub fn new() -> (Self, PipeReader) {
        let (writer, reader) = tokio::io::duplex(PIPE_BUFFER);
        let channel = Self {
            writer: Mutex::new(Some(writer)),
        };
        let reader = PipeReader {
            lines: BufReader::new(reader).lines(),
        };
        (channel, reader)
    }
}

#[async_trait]
impl NotifyChannel for PipeChannel {
    fn name(&self) -> &str {
        "pipe"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(DutyBotError::channel("pipe is closed"));
        };

        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer.shutdown().await?;
        }
        Ok(())
    }
}

impl PipeReader {
    /// Next announcement, `None` once the channel has been shut down.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }
}
