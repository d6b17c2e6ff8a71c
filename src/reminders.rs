use crate::config::ReminderConfig;
use chrono::{DateTime, Duration, Local};
use rand::Rng;

/// Computes randomized posture-break reminder delays.
///
/// Delays are uniform over the configured inclusive minute range; actually
/// posting the notification is the platform's job, not ours.
pub struct ReminderPlanner {
    config: ReminderConfig,
}

impl ReminderPlanner {
    pub fn new(config: ReminderConfig) -> Self {
        Self { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn next_delay_minutes(&self, rng: &mut impl Rng) -> u32 {
        let lo = self.config.min_delay_minutes.min(self.config.max_delay_minutes);
        let hi = self.config.min_delay_minutes.max(self.config.max_delay_minutes);
        rng.gen_range(lo..=hi)
    }

    pub fn next_at(&self, now: DateTime<Local>, rng: &mut impl Rng) -> DateTime<Local> {
        now + Duration::minutes(i64::from(self.next_delay_minutes(rng)))
    }
}
