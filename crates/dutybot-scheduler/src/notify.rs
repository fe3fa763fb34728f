//! Notifier pump — turns rotation events into announcements.
//!
//! Runs as its own task so a slow or failing send never delays the next
//! scheduling decision. Delivery is at most once: a failed send is logged
//! and dropped.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

use dutybot_core::{NotifyChannel, RotationEvent};

/// Placeholder replaced by the new holder in message patterns.
pub const HOLDER_PLACEHOLDER: &str = "%s";

/// Notify channel that can be swapped while the pump is running.
#[derive(Clone)]
pub struct SharedChannel(Arc<RwLock<Arc<dyn NotifyChannel>>>);

impl SharedChannel {
    pub fn new(channel: Arc<dyn NotifyChannel>) -> Self {
        Self(Arc::new(RwLock::new(channel)))
    }

    pub fn get(&self) -> Arc<dyn NotifyChannel> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn replace(&self, channel: Arc<dyn NotifyChannel>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = channel;
    }
}

/// Substitute the holder into a message pattern.
///
/// Every `%s` is replaced; a pattern without a placeholder gets the
/// holder appended after a space.
pub fn render_message(pattern: &str, holder: &str) -> String {
    if pattern.contains(HOLDER_PLACEHOLDER) {
        pattern.replace(HOLDER_PLACEHOLDER, holder)
    } else if pattern.is_empty() {
        holder.to_string()
    } else {
        format!("{pattern} {holder}")
    }
}

/// Deliver every queued event until the queue is closed and drained.
pub async fn run_pump(
    pattern: String,
    mut events: mpsc::Receiver<RotationEvent>,
    channel: SharedChannel,
) {
    while let Some(event) = events.recv().await {
        tracing::info!("🔔 [{}] new person on duty: {}", event.roster_id, event.holder);

        let text = render_message(&pattern, &event.holder);
        let channel = channel.get();

        if let Err(e) = channel.send(&text).await {
            tracing::error!(
                "[{}] could not send update via {}: {e}",
                event.roster_id,
                channel.name()
            );
        }
    }

    tracing::debug!("notifier pump finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dutybot_core::error::{DutyBotError, Result};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        fail_first: bool,
    }

    #[async_trait]
    impl NotifyChannel for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn send(&self, text: &str) -> Result<()> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(text.to_string());
            if self.fail_first && sent.len() == 1 {
                return Err(DutyBotError::channel("boom"));
            }
            Ok(())
        }

        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    fn event(holder: &str, index: u64) -> RotationEvent {
        RotationEvent {
            roster_id: "p".into(),
            holder: holder.into(),
            index,
        }
    }

    #[test]
    fn test_render_message() {
        assert_eq!(render_message("%s", "alice"), "alice");
        assert_eq!(render_message("@%s is on duty", "alice"), "@alice is on duty");
        assert_eq!(render_message("%s, %s!", "bob"), "bob, bob!");
        assert_eq!(render_message("On duty:", "bob"), "On duty: bob");
        assert_eq!(render_message("", "bob"), "bob");
    }

    #[tokio::test]
    async fn test_pump_drains_queue_before_exit() {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::channel(4);
        for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
            tx.send(event(name, i as u64)).await.unwrap();
        }
        drop(tx);

        run_pump("%s".into(), rx, SharedChannel::new(recorder.clone())).await;
        assert_eq!(*recorder.sent.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failed_send_does_not_stop_pump() {
        let recorder = Arc::new(Recorder {
            fail_first: true,
            ..Recorder::default()
        });
        let (tx, rx) = mpsc::channel(4);
        tx.send(event("a", 0)).await.unwrap();
        tx.send(event("b", 1)).await.unwrap();
        drop(tx);

        run_pump("%s".into(), rx, SharedChannel::new(recorder.clone())).await;
        assert_eq!(*recorder.sent.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_swapped_channel_receives_later_events() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let shared = SharedChannel::new(first.clone());

        let (tx, rx) = mpsc::channel(1);
        let pump = tokio::spawn(run_pump("%s".into(), rx, shared.clone()));

        tx.send(event("a", 0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shared.replace(second.clone());
        tx.send(event("b", 1)).await.unwrap();
        drop(tx);
        pump.await.unwrap();

        assert_eq!(*first.sent.lock().unwrap(), vec!["a"]);
        assert_eq!(*second.sent.lock().unwrap(), vec!["b"]);
    }
}
