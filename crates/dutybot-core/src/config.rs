//! DutyBot configuration system.
//!
//! The TOML file is deserialised once, validated, and then handed to every
//! component as an immutable value.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cadence::Cadence;
use crate::error::{DutyBotError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DutyBotConfig {
    /// Directory holding `<project>.state` files.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    #[serde(default)]
    pub production_cal: ProductionCalConfig,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

fn default_state_dir() -> String { ".".into() }

impl Default for DutyBotConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            production_cal: ProductionCalConfig::default(),
            projects: Vec::new(),
        }
    }
}

impl DutyBotConfig {
    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DutyBotError::config(format!("Failed to read config at '{}': {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DutyBotError::config(format!("Failed to parse config: {e}")))
    }

    /// Default config path (./dutybot.toml).
    pub fn default_path() -> PathBuf {
        PathBuf::from("dutybot.toml")
    }

    /// State directory with `~` expanded.
    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_dir).to_string())
    }

    /// Whether any project asks for state persistence.
    pub fn persistence_enabled(&self) -> bool {
        self.projects.iter().any(|p| p.persist)
    }

    /// Reject configurations that cannot be scheduled.
    pub fn validate(&self) -> Result<()> {
        if self.projects.is_empty() {
            return Err(DutyBotError::config("at least one [[projects]] entry is required"));
        }

        let mut seen = HashSet::new();
        for project in &self.projects {
            project
                .validate()
                .map_err(|e| DutyBotError::config(format!("project '{}': {e}", project.name)))?;
            if !seen.insert(project.name.as_str()) {
                return Err(DutyBotError::config(format!(
                    "duplicate project name '{}'",
                    project.name
                )));
            }
        }

        self.production_cal
            .validate()
            .map_err(|e| DutyBotError::config(format!("production_cal: {e}")))
    }

    /// Log the effective configuration. Secrets are masked.
    pub fn print(&self) {
        tracing::info!("📋 the following configuration parameters will be used:");
        tracing::info!("state_dir: {}", self.state_dir);
        for project in &self.projects {
            tracing::info!("*** {} ***", project.name);
            project.print();
        }
        self.production_cal.print();
    }
}

/// One roster and the way its rotations are announced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub applicants: Vec<String>,
    /// Message pattern; every `%s` is replaced by the new holder.
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default)]
    pub period: Cadence,
    #[serde(default)]
    pub skip_dayoffs: bool,
    #[serde(default)]
    pub channel: ChannelType,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub myteam: Option<MyTeamConfig>,
    #[serde(default)]
    pub vacation: VacationConfig,
}

fn default_message() -> String { "%s".into() }

impl ProjectConfig {
    /// Minimal project config, mostly for tests.
    pub fn new(name: &str, applicants: &[&str], period: Cadence) -> Self {
        Self {
            name: name.to_string(),
            applicants: applicants.iter().map(|a| a.to_string()).collect(),
            message: default_message(),
            period,
            skip_dayoffs: false,
            channel: ChannelType::default(),
            persist: false,
            myteam: None,
            vacation: VacationConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DutyBotError::config("name must not be empty"));
        }
        if name != self.name || self.name.contains(['/', '\\', '\n', '\r']) {
            return Err(DutyBotError::config(format!(
                "name '{}' must be usable as a file name",
                self.name.escape_debug()
            )));
        }

        if self.applicants.is_empty() {
            return Err(DutyBotError::EmptyRoster(self.name.clone()));
        }
        if let Some(blank) = self
            .applicants
            .iter()
            .find(|a| a.trim().is_empty() || a.contains('\n'))
        {
            return Err(DutyBotError::config(format!(
                "applicants: invalid name '{}'",
                blank.escape_debug()
            )));
        }

        if self.channel == ChannelType::MyTeam {
            match &self.myteam {
                Some(myteam) => myteam.validate()?,
                None => {
                    return Err(DutyBotError::config(
                        "channel 'myteam' requires a [projects.myteam] section",
                    ));
                }
            }
        }

        self.vacation.validate()
    }

    pub fn print(&self) {
        tracing::info!("{}.applicants: {}", self.name, self.applicants.join(","));
        tracing::info!("{}.message: {}", self.name, self.message);
        tracing::info!("{}.period: {}", self.name, self.period);
        tracing::info!("{}.skip_dayoffs: {}", self.name, self.skip_dayoffs);
        tracing::info!("{}.channel: {}", self.name, self.channel);
        tracing::info!("{}.persist: {}", self.name, self.persist);
        if let Some(myteam) = &self.myteam {
            myteam.print(&self.name);
        }
        self.vacation.print(&self.name);
    }
}

/// Notify channel variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChannelType {
    #[default]
    Empty,
    /// Mostly for debugging.
    StdOut,
    MyTeam,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Empty => "empty",
            ChannelType::StdOut => "stdout",
            ChannelType::MyTeam => "myteam",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ChannelType {
    type Error = DutyBotError;

    fn try_from(value: String) -> Result<Self> {
        match value.trim() {
            "" | "empty" => Ok(ChannelType::Empty),
            "stdout" => Ok(ChannelType::StdOut),
            "myteam" => Ok(ChannelType::MyTeam),
            _ => Err(DutyBotError::UnsupportedChannel(value)),
        }
    }
}

impl From<ChannelType> for String {
    fn from(value: ChannelType) -> Self {
        value.as_str().to_string()
    }
}

/// MyTeam bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MyTeamConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_myteam_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_myteam_api_url() -> String { "https://myteam.mail.ru/bot/v1/".into() }
fn default_timeout_secs() -> u64 { 5 }

impl MyTeamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(DutyBotError::config("myteam.token must not be empty"));
        }
        if self.chat_id.is_empty() {
            return Err(DutyBotError::config("myteam.chat_id must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(DutyBotError::config("myteam.timeout_secs must be positive"));
        }
        Ok(())
    }

    fn print(&self, prefix: &str) {
        // token is sensitive
        tracing::info!("{prefix}.myteam.api_url: {}", self.api_url);
        tracing::info!("{prefix}.myteam.chat_id: {}", self.chat_id);
        tracing::info!("{prefix}.myteam.timeout_secs: {}", self.timeout_secs);
    }
}

/// Vacation lookup settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VacationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type", default)]
    pub kind: VacationType,
    #[serde(default)]
    pub entries: Vec<VacationEntry>,
}

impl VacationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        for entry in &self.entries {
            if entry.person.trim().is_empty() {
                return Err(DutyBotError::config("vacation entry without a person"));
            }
            if entry.end < entry.start {
                return Err(DutyBotError::config(format!(
                    "vacation of '{}' ends ({}) before it starts ({})",
                    entry.person, entry.end, entry.start
                )));
            }
        }
        Ok(())
    }

    fn print(&self, prefix: &str) {
        if !self.enabled {
            return;
        }
        tracing::info!("{prefix}.vacation.type: {}", self.kind);
        tracing::info!("{prefix}.vacation.entries: {}", self.entries.len());
    }
}

/// Vacation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VacationType {
    /// Ranges listed in the config file.
    #[default]
    Schedule,
}

impl fmt::Display for VacationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VacationType::Schedule => f.write_str("schedule"),
        }
    }
}

impl TryFrom<String> for VacationType {
    type Error = DutyBotError;

    fn try_from(value: String) -> Result<Self> {
        match value.trim() {
            "schedule" => Ok(VacationType::Schedule),
            _ => Err(DutyBotError::UnsupportedVacationType(value)),
        }
    }
}

impl From<VacationType> for String {
    fn from(value: VacationType) -> Self {
        value.to_string()
    }
}

/// One person away for an inclusive range of dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VacationEntry {
    pub person: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Production calendar (isdayoff.ru) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductionCalConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Days cached starting today.
    #[serde(default = "default_cache_interval")]
    pub cache_interval: u32,
    #[serde(default = "default_recache_period_secs")]
    pub recache_period_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_isdayoff_url")]
    pub api_url: String,
}

fn default_cache_interval() -> u32 { 7 }
fn default_recache_period_secs() -> u64 { 24 * 60 * 60 }
fn default_country() -> String { "ru".into() }
fn default_isdayoff_url() -> String { "https://isdayoff.ru".into() }

impl Default for ProductionCalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cache_interval: default_cache_interval(),
            recache_period_secs: default_recache_period_secs(),
            timeout_secs: default_timeout_secs(),
            country: default_country(),
            api_url: default_isdayoff_url(),
        }
    }
}

impl ProductionCalConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.cache_interval == 0 {
            return Err(DutyBotError::config("cache_interval must be positive"));
        }
        if self.recache_period_secs == 0 {
            return Err(DutyBotError::config("recache_period_secs must be positive"));
        }
        if self.timeout_secs == 0 {
            return Err(DutyBotError::config("timeout_secs must be positive"));
        }
        Ok(())
    }

    fn print(&self) {
        tracing::info!("production_cal.enabled: {}", self.enabled);
        if !self.enabled {
            return;
        }
        tracing::info!("production_cal.cache_interval: {}", self.cache_interval);
        tracing::info!("production_cal.recache_period_secs: {}", self.recache_period_secs);
        tracing::info!("production_cal.timeout_secs: {}", self.timeout_secs);
        tracing::info!("production_cal.country: {}", self.country);
        tracing::info!("production_cal.api_url: {}", self.api_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        state_dir = "/tmp/dutybot"

        [production_cal]
        enabled = true
        cache_interval = 14

        [[projects]]
        name = "mailx"
        applicants = ["alice", "bob"]
        message = "%s is on duty"
        period = "every week"
        skip_dayoffs = true
        channel = "myteam"
        persist = true

        [projects.myteam]
        token = "secret"
        chat_id = "team@chat.agent"

        [projects.vacation]
        enabled = true
        type = "schedule"

        [[projects.vacation.entries]]
        person = "bob"
        start = "2024-07-01"
        end = "2024-07-14"
    "#;

    #[test]
    fn test_config_from_toml() {
        let config = DutyBotConfig::parse(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.state_dir(), PathBuf::from("/tmp/dutybot"));
        assert!(config.persistence_enabled());
        assert_eq!(config.production_cal.cache_interval, 14);
        assert_eq!(config.production_cal.timeout_secs, 5);

        let project = &config.projects[0];
        assert_eq!(project.applicants, vec!["alice", "bob"]);
        assert_eq!(project.period, Cadence::EveryWeek);
        assert_eq!(project.channel, ChannelType::MyTeam);
        let myteam = project.myteam.as_ref().unwrap();
        assert_eq!(myteam.api_url, "https://myteam.mail.ru/bot/v1/");
        assert_eq!(project.vacation.entries.len(), 1);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config = DutyBotConfig::parse(
            r#"
            [[projects]]
            name = "p"
            applicants = ["a"]
        "#,
        )
        .unwrap();
        config.validate().unwrap();

        let project = &config.projects[0];
        assert_eq!(project.period, Cadence::EveryDay);
        assert_eq!(project.channel, ChannelType::Empty);
        assert_eq!(project.message, "%s");
        assert!(!project.persist);
        assert_eq!(config.state_dir, ".");
    }

    #[test]
    fn test_unknown_period_is_config_error() {
        let err = DutyBotConfig::parse(
            r#"
            [[projects]]
            name = "p"
            applicants = ["a"]
            period = "every year"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("every year"));
    }

    #[test]
    fn test_unknown_channel_is_config_error() {
        let err = DutyBotConfig::parse(
            r#"
            [[projects]]
            name = "p"
            applicants = ["a"]
            channel = "carrier-pigeon"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(DutyBotConfig::parse("bogus = 1").is_err());
    }

    #[test]
    fn test_empty_roster_rejected() {
        let project = ProjectConfig::new("p", &[], Cadence::EveryDay);
        assert!(matches!(project.validate(), Err(DutyBotError::EmptyRoster(_))));
    }

    #[test]
    fn test_blank_applicant_rejected() {
        let project = ProjectConfig::new("p", &["a", " "], Cadence::EveryDay);
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_bad_project_name_rejected() {
        let project = ProjectConfig::new("a/b", &["a"], Cadence::EveryDay);
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_myteam_requires_section() {
        let mut project = ProjectConfig::new("p", &["a"], Cadence::EveryDay);
        project.channel = ChannelType::MyTeam;
        assert!(project.validate().is_err());

        project.myteam = Some(MyTeamConfig {
            token: "t".into(),
            chat_id: String::new(),
            api_url: default_myteam_api_url(),
            timeout_secs: 5,
        });
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_duplicate_projects_rejected() {
        let config = DutyBotConfig {
            projects: vec![
                ProjectConfig::new("p", &["a"], Cadence::EveryDay),
                ProjectConfig::new("p", &["b"], Cadence::EveryDay),
            ],
            ..DutyBotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_projects_rejected() {
        assert!(DutyBotConfig::default().validate().is_err());
    }

    #[test]
    fn test_inverted_vacation_rejected() {
        let mut project = ProjectConfig::new("p", &["a"], Cadence::EveryDay);
        project.vacation = VacationConfig {
            enabled: true,
            kind: VacationType::Schedule,
            entries: vec![VacationEntry {
                person: "a".into(),
                start: NaiveDate::from_ymd_opt(2024, 7, 10).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            }],
        };
        assert!(project.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dutybot.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = DutyBotConfig::load_from(&path).unwrap();
        assert_eq!(config.projects[0].name, "mailx");

        assert!(DutyBotConfig::load_from(&dir.path().join("missing.toml")).is_err());
    }
}
