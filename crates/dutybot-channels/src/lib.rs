//! # DutyBot Channels
//! Where duty announcements are delivered.
//!
//! The channel of a project is chosen once, from its `channel` setting,
//! when the project is set up.

pub mod basic;
pub mod myteam;
pub mod pipe;

use std::sync::Arc;

use dutybot_core::error::{DutyBotError, Result};
use dutybot_core::{ChannelType, NotifyChannel, ProjectConfig};

pub use basic::{EmptyChannel, StdOutChannel};
pub use myteam::MyTeamChannel;
pub use pipe::{PipeChannel, PipeReader};

/// Build the notify channel configured for a project.
///
/// For MyTeam this connects to the bot API, so a bad token fails here.
pub async fn from_config(project: &ProjectConfig) -> Result<Arc<dyn NotifyChannel>> {
    let channel: Arc<dyn NotifyChannel> = match project.channel {
        ChannelType::Empty => Arc::new(EmptyChannel),
        ChannelType::StdOut => Arc::new(StdOutChannel),
        ChannelType::MyTeam => {
            let config = project.myteam.as_ref().ok_or_else(|| {
                DutyBotError::config(format!("{}: myteam section is required", project.name))
            })?;
            Arc::new(MyTeamChannel::connect(config).await?)
        }
    };

    tracing::info!("🔔 [{}] notify channel: {}", project.name, channel.name());
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutybot_core::Cadence;

    #[tokio::test]
    async fn test_from_config_selects_variant() {
        let mut project = ProjectConfig::new("p", &["alice"], Cadence::EveryDay);
        assert_eq!(from_config(&project).await.unwrap().name(), "empty");

        project.channel = ChannelType::StdOut;
        assert_eq!(from_config(&project).await.unwrap().name(), "stdout");
    }

    #[tokio::test]
    async fn test_myteam_requires_section() {
        let mut project = ProjectConfig::new("p", &["alice"], Cadence::EveryDay);
        project.channel = ChannelType::MyTeam;
        let err = from_config(&project).await.err().unwrap();
        assert!(matches!(err, DutyBotError::Config(_)));
    }
}
