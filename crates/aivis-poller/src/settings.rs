use std::time::Duration;

use aivis_core::PollConfig;

/// Pacing of a poll session.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    /// Delay before the first completion check.
    pub initial_delay: Duration,
    /// Wait between the end of one check and the start of the next.
    pub check_interval: Duration,
    /// Checks allowed before the session times out.
    pub max_attempts: u32,
    /// Wait after completion so downstream aggregation can finish.
    pub settle_delay: Duration,
    pub animation_tick: Duration,
    pub animation_step: f64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            check_interval: Duration::from_secs(5),
            max_attempts: 240,
            settle_delay: Duration::from_secs(15),
            animation_tick: Duration::from_secs(1),
            animation_step: 0.5,
        }
    }
}

impl PollSettings {
    #[must_use]
    pub fn from_poll_config(config: &PollConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            check_interval: Duration::from_secs(config.interval_secs),
            max_attempts: config.max_attempts.max(1),
            settle_delay: Duration::from_secs(config.settle_delay_secs),
            animation_tick: Duration::from_millis(config.animation_tick_ms.max(1)),
            ..Self::default()
        }
    }
}
