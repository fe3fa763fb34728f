//! DutyBot supervisor — one scheduler per project, shared store and calendar.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;

use dutybot_calendar::{ProductionCalendar, VacationSchedule, WeekendFallback};
use dutybot_core::error::Result;
use dutybot_core::{DayOffPolicy, DutyBotConfig, ProjectConfig};
use dutybot_scheduler::{FileStateStore, NullStateStore, RotationPolicy, Scheduler, StateStore};

pub struct DutyBot {
    schedulers: Vec<Arc<Scheduler>>,
    calendar: Option<Arc<ProductionCalendar>>,
    store: Arc<dyn StateStore>,
    stopped: Mutex<bool>,
}

impl DutyBot {
    /// Build every project from a validated configuration. Nothing is scheduled yet.
    pub async fn new(config: &DutyBotConfig) -> Result<Self> {
        let store: Arc<dyn StateStore> = if config.persistence_enabled() {
            let dir = config.state_dir();
            tracing::info!("💾 state directory: {}", dir.display());
            Arc::new(FileStateStore::open(&dir)?)
        } else {
            Arc::new(NullStateStore)
        };

        let calendar = if config.production_cal.enabled {
            let calendar = Arc::new(ProductionCalendar::new(config.production_cal.clone())?);
            if let Err(e) = calendar.init().await {
                tracing::error!("{e}");
                tracing::warn!("⚠️ day offs will be weekends until the next refetch");
            }
            Some(calendar)
        } else {
            None
        };

        let day_offs: Arc<dyn DayOffPolicy> = match &calendar {
            Some(calendar) => calendar.clone(),
            None => Arc::new(WeekendFallback),
        };

        let mut schedulers = Vec::with_capacity(config.projects.len());
        for project in &config.projects {
            match build_scheduler(project, day_offs.clone(), store.clone()).await {
                Ok(scheduler) => schedulers.push(Arc::new(scheduler)),
                Err(e) => {
                    // Release what was already set up before giving up.
                    store.shutdown().await;
                    return Err(e);
                }
            }
        }

        Ok(Self {
            schedulers,
            calendar,
            store,
            stopped: Mutex::new(false),
        })
    }

    pub async fn start(&self) {
        if let Some(calendar) = &self.calendar {
            calendar.start_refetching().await;
        }
        for scheduler in &self.schedulers {
            scheduler.start().await;
        }
        tracing::info!("🚀 dutybot started with {} project(s)", self.schedulers.len());
    }

    pub fn schedulers(&self) -> &[Arc<Scheduler>] {
        &self.schedulers
    }

    /// Stop every scheduler, then the calendar refetch, then the state store.
    ///
    /// Idempotent; concurrent callers return once everything has stopped.
    pub async fn shutdown(&self) {
        let mut stopped = self.stopped.lock().await;
        if *stopped {
            return;
        }
        tracing::info!("🛑 dutybot: shutting down");

        let results = join_all(self.schedulers.iter().map(|s| s.shutdown())).await;
        for (scheduler, result) in self.schedulers.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!("[{}] shutdown failed: {e}", scheduler.roster_id());
            }
        }

        if let Some(calendar) = &self.calendar {
            calendar.shutdown().await;
        }
        self.store.shutdown().await;

        *stopped = true;
        tracing::info!("🛑 dutybot: shutdown finished");
    }
}

async fn build_scheduler(
    project: &ProjectConfig,
    day_offs: Arc<dyn DayOffPolicy>,
    store: Arc<dyn StateStore>,
) -> Result<Scheduler> {
    let channel = dutybot_channels::from_config(project).await?;

    let mut policy = RotationPolicy::from_config(project)?.with_day_offs(day_offs);
    if project.vacation.enabled {
        policy = policy.with_vacations(Arc::new(VacationSchedule::from_config(&project.vacation)));
    }

    Ok(Scheduler::from_config(project, policy, channel, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutybot_core::HolderIndex;
    use dutybot_scheduler::SchedulerState;
    use std::time::Duration;

    fn config(state_dir: &std::path::Path) -> DutyBotConfig {
        DutyBotConfig::parse(&format!(
            r#"
state_dir = "{}"

[[projects]]
name = "mailx"
applicants = ["alice", "bob"]
persist = true

[[projects]]
name = "infra"
applicants = ["carol"]
period = "every week"

[projects.vacation]
enabled = true
[[projects.vacation.entries]]
person = "carol"
start = "2000-01-01"
end = "2000-01-02"
"#,
            state_dir.display()
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_runs_every_project_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        config.validate().unwrap();

        let bot = DutyBot::new(&config).await.unwrap();
        assert_eq!(bot.schedulers().len(), 2);
        bot.start().await;

        for _ in 0..100 {
            if bot.schedulers().iter().all(|s| s.current_holder().is_some()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tokio::join!(bot.shutdown(), bot.shutdown());
        bot.shutdown().await;

        for scheduler in bot.schedulers() {
            assert_eq!(scheduler.state(), SchedulerState::Stopped);
        }
        assert_eq!(bot.schedulers()[0].current_holder().as_deref(), Some("alice"));
        assert_eq!(bot.schedulers()[1].current_holder().as_deref(), Some("carol"));

        // Only the persisting project is written.
        assert!(dir.path().join("mailx.state").exists());
        assert!(!dir.path().join("infra.state").exists());

        let reopened = FileStateStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("mailx").unwrap().index, HolderIndex::At(0));
        reopened.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_restores_holder() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let bot = DutyBot::new(&config).await.unwrap();
        bot.start().await;
        for _ in 0..100 {
            if bot.schedulers()[0].current_holder().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        bot.shutdown().await;

        let restarted = DutyBot::new(&config).await.unwrap();
        assert_eq!(restarted.schedulers()[0].current_holder().as_deref(), Some("alice"));
        assert_eq!(restarted.schedulers()[1].current_holder(), None);
        restarted.shutdown().await;
    }
}
