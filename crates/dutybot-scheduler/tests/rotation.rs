//! End-to-end rotation through a pipe channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};

use dutybot_channels::{EmptyChannel, PipeChannel};
use dutybot_core::error::Result;
use dutybot_core::{Cadence, Checkpoint, HolderIndex, VacationPolicy};
use dutybot_scheduler::{MemoryStateStore, RotationPolicy, Scheduler, SchedulerState, StateStore};

const SLACK: Duration = Duration::from_millis(10);

fn roster() -> Vec<String> {
    vec!["alice".to_string(), "bob".to_string()]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rotates_every_second() {
    let (pipe, mut reader) = PipeChannel::new();
    let policy = RotationPolicy::new("e2e", roster(), Cadence::EverySecond).unwrap();
    let scheduler = Scheduler::new(policy, "%s", Arc::new(EmptyChannel), None);
    scheduler.set_notify_channel(Arc::new(pipe));

    scheduler.start().await;

    let first = tokio::time::timeout(Duration::from_secs(1), reader.next_line())
        .await
        .expect("first announcement in time")
        .unwrap();
    assert_eq!(first.as_deref(), Some("alice"));
    let mut last = Instant::now();

    for expected in ["bob", "alice"] {
        let line = reader.next_line().await.unwrap();
        let elapsed = last.elapsed();
        assert_eq!(line.as_deref(), Some(expected));
        assert!(
            elapsed.saturating_sub(Duration::from_secs(1)) <= SLACK,
            "'{expected}' arrived after {elapsed:?}"
        );
        last = Instant::now();
    }

    scheduler.shutdown().await.unwrap();
    // Shutting the pipe down closes the reading end.
    assert_eq!(reader.next_line().await.unwrap(), None);
}

#[tokio::test]
async fn test_nothing_is_sent_after_shutdown() {
    let (pipe, mut reader) = PipeChannel::new();
    let policy = RotationPolicy::new("quiet", roster(), Cadence::EverySecond).unwrap();
    let scheduler = Arc::new(Scheduler::new(policy, "%s", Arc::new(pipe), None));

    scheduler.start().await;
    assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("alice"));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.shutdown().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(reader.next_line().await.unwrap(), None);
    assert_eq!(scheduler.current_holder().as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_restart_continues_rotation() {
    let store = Arc::new(MemoryStateStore::new());

    // A previous run announced bob more than a day ago.
    let two_days_ago = Utc::now() - chrono::Duration::days(2);
    store
        .put(&Checkpoint::new("restart", HolderIndex::At(1), two_days_ago))
        .unwrap();

    let (pipe, mut reader) = PipeChannel::new();
    let policy = RotationPolicy::new("restart", roster(), Cadence::EveryDay).unwrap();
    let scheduler = Scheduler::new(policy, "on duty: %s", Arc::new(pipe), Some(store.clone()));
    assert_eq!(scheduler.current_holder().as_deref(), Some("bob"));

    scheduler.start().await;
    assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("on duty: alice"));
    scheduler.shutdown().await.unwrap();

    let saved = store.get("restart").unwrap();
    assert_eq!(saved.index, HolderIndex::At(2));
    assert!(saved.last_change > two_days_ago);
}

struct OnVacation(&'static str);

impl VacationPolicy for OnVacation {
    fn name(&self) -> &str {
        "on-vacation"
    }

    fn is_unavailable(&self, person: &str, _date: NaiveDate) -> Result<bool> {
        Ok(person == self.0)
    }
}

#[tokio::test]
async fn test_person_on_vacation_is_skipped() {
    let (pipe, mut reader) = PipeChannel::new();
    let policy = RotationPolicy::new(
        "vacation",
        vec!["alice".into(), "bob".into(), "carol".into()],
        Cadence::EverySecond,
    )
    .unwrap()
    .with_vacations(Arc::new(OnVacation("bob")));
    let scheduler = Scheduler::new(policy, "%s", Arc::new(pipe), None);

    scheduler.start().await;
    assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("alice"));
    assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("carol"));
    scheduler.shutdown().await.unwrap();
}
