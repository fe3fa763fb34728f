//! Production calendar — holidays and moved working days from isdayoff.ru.
//!
//! Keeps a local cache of `cache_interval` days starting today. The cache is
//! filled once by [`ProductionCalendar::init`] and refetched every
//! `recache_period_secs` in the background; a failed refetch keeps the old
//! cache. Dates outside the cache are an error, so the rotation policy falls
//! back to weekends for them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use dutybot_core::error::{DutyBotError, Result};
use dutybot_core::{DayOffPolicy, ProductionCalConfig};

/// Cached day types, `true` for non-working days.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DayOffCache {
    days: BTreeMap<NaiveDate, bool>,
}

impl DayOffCache {
    pub fn get(&self, date: NaiveDate) -> Option<bool> {
        self.days.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl fmt::Display for DayOffCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (date, day_off) in &self.days {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{date}: {}", if *day_off { "day off" } else { "working" })?;
        }
        Ok(())
    }
}

struct Refetcher {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct ProductionCalendar {
    config: ProductionCalConfig,
    client: reqwest::Client,
    cache: RwLock<DayOffCache>,
    refetcher: Mutex<Option<Refetcher>>,
}

impl ProductionCalendar {
    pub fn new(config: ProductionCalConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DutyBotError::Http(format!("could not create calendar client: {e}")))?;

        Ok(Self {
            config,
            client,
            cache: RwLock::new(DayOffCache::default()),
            refetcher: Mutex::new(None),
        })
    }

    /// Fill the cache for the first time. Fails if any day cannot be fetched.
    pub async fn init(&self) -> Result<()> {
        self.refresh()
            .await
            .map_err(|e| DutyBotError::calendar(format!("could not initialise day offs cache: {e}")))
    }

    /// Refetch `cache_interval` days starting today and replace the cache.
    ///
    /// On failure the current cache is left untouched.
    pub async fn refresh(&self) -> Result<()> {
        let today = Local::now().date_naive();
        let days = self.fetch(today, self.config.cache_interval).await?;

        let cache = DayOffCache { days };
        tracing::info!("📆 day offs cache has been successfully fetched: [{cache}]");
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = cache;
        Ok(())
    }

    /// Fetch day types for `days` consecutive dates starting at `from`.
    pub async fn fetch(&self, from: NaiveDate, days: u32) -> Result<BTreeMap<NaiveDate, bool>> {
        let mut result = BTreeMap::new();
        for date in from.iter_days().take(days as usize) {
            result.insert(date, self.fetch_day(date).await?);
        }
        Ok(result)
    }

    async fn fetch_day(&self, date: NaiveDate) -> Result<bool> {
        let url = format!("{}/api/getdata", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("year", date.year().to_string()),
                ("month", format!("{:02}", date.month())),
                ("day", format!("{:02}", date.day())),
                ("cc", self.config.country.clone()),
            ])
            .send()
            .await
            .map_err(|e| DutyBotError::Http(format!("request for {date} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DutyBotError::Http(format!("request for {date} failed: {e}")))?;

        if !status.is_success() {
            return Err(DutyBotError::Http(format!(
                "request for {date} failed: HTTP {status}: {}",
                body.trim()
            )));
        }

        parse_day_type(body.trim())
            .map_err(|e| DutyBotError::calendar(format!("request for {date} failed: {e}")))
    }

    /// Current cache contents.
    pub fn cache(&self) -> DayOffCache {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Start refetching the cache every `recache_period_secs`.
    pub async fn start_refetching(self: &Arc<Self>) {
        let mut refetcher = self.refetcher.lock().await;
        if refetcher.is_some() {
            return;
        }

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(refetch_loop(self.clone(), stop_rx));
        *refetcher = Some(Refetcher { stop, task });
    }

    /// Stop the background refetch and wait for it.
    pub async fn shutdown(&self) {
        let Some(Refetcher { stop, task }) = self.refetcher.lock().await.take() else {
            return;
        };

        stop.send_replace(true);
        if let Err(e) = task.await {
            tracing::error!("day offs refetch task failed: {e}");
        }
        tracing::info!("📆 production calendar: shutdown finished");
    }
}

async fn refetch_loop(calendar: Arc<ProductionCalendar>, mut stop: watch::Receiver<bool>) {
    let period = Duration::from_secs(calendar.config.recache_period_secs);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = stop.changed() => return,
        }

        tracing::info!("📆 will refetch day offs cache");
        // A shutdown during a slow fetch does not wait for the request timeouts.
        tokio::select! {
            result = calendar.refresh() => {
                if let Err(e) = result {
                    tracing::error!("could not refetch day offs cache: {e}");
                    tracing::warn!("⚠️ will use the old cache until next refetch");
                }
            }
            _ = stop.changed() => return,
        }
    }
}

/// Interpret an isdayoff.ru day type code.
fn parse_day_type(code: &str) -> Result<bool> {
    match code {
        "1" => Ok(true),
        // working, shortened working, working by decree
        "0" | "2" | "4" => Ok(false),
        "100" => Err(DutyBotError::calendar("invalid date")),
        "101" => Err(DutyBotError::calendar("data not found")),
        "199" => Err(DutyBotError::calendar("service error")),
        other => Err(DutyBotError::calendar(format!("unexpected response '{other}'"))),
    }
}

impl DayOffPolicy for ProductionCalendar {
    fn name(&self) -> &str {
        "production calendar"
    }

    fn is_non_working(&self, date: NaiveDate) -> Result<bool> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(date)
            .ok_or_else(|| DutyBotError::calendar(format!("date {date} not found in day offs cache")))
    }
}
