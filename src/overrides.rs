use crate::stats::{DayCell, StatsSnapshot};
use crate::storage::Storage;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Well-known storage key holding the developer-override JSON object.
pub const OVERRIDES_KEY: &str = "stat_overrides";

/// Manual stat overrides for testing and demos. Absent fields fall back to
/// computed values; overrides never touch the stored history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideSet {
    pub streak_days: Option<u32>,
    pub total_time: Option<f64>,
    pub avg_daily_time: Option<f64>,
}

impl OverrideSet {
    pub fn is_empty(&self) -> bool {
        self.streak_days.is_none() && self.total_time.is_none() && self.avg_daily_time.is_none()
    }
}

/// Sanitizes raw override values at the setting boundary: non-finite inputs
/// are dropped, negatives are clamped, and the streak is floored to a whole
/// number of days.
pub fn sanitize(
    streak_days: Option<f64>,
    total_time: Option<f64>,
    avg_daily_time: Option<f64>,
) -> OverrideSet {
    OverrideSet {
        streak_days: streak_days
            .filter(|value| value.is_finite())
            .map(|value| value.max(0.0).floor() as u32),
        total_time: total_time
            .filter(|value| value.is_finite())
            .map(|value| value.max(0.0)),
        avg_daily_time: avg_daily_time
            .filter(|value| value.is_finite())
            .map(|value| value.max(0.0)),
    }
}

/// Display-ready statistics: computed values with overrides merged on top,
/// carrying the override set through for debug surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayStats {
    pub total_minutes: f64,
    pub total_exercises: u64,
    pub current_streak: u32,
    pub avg_daily_time: f64,
    pub last_14_days: Vec<DayCell>,
    pub overrides: OverrideSet,
}

pub fn apply_overrides(stats: &StatsSnapshot, overrides: &OverrideSet) -> DisplayStats {
    let current_streak = overrides.streak_days.unwrap_or(stats.current_streak);
    let total_minutes = overrides
        .total_time
        .map(|value| value.max(0.0))
        .unwrap_or(stats.total_minutes);

    let avg_daily_time = if let Some(avg) = overrides.avg_daily_time {
        avg.max(0.0)
    } else if let Some(total) = overrides.total_time {
        // An overridden total doubles as the average when no average is set.
        total.max(0.0)
    } else if stats.active_days > 0 {
        (stats.total_minutes / f64::from(stats.active_days)).round()
    } else {
        0.0
    };

    DisplayStats {
        total_minutes,
        total_exercises: stats.total_exercises,
        current_streak,
        avg_daily_time,
        last_14_days: stats.last_14_days.clone(),
        overrides: overrides.clone(),
    }
}

/// Owns the override object under [`OVERRIDES_KEY`], with the same
/// degrade-to-default error posture as the history store.
#[derive(Clone)]
pub struct OverrideStore {
    storage: Storage,
}

impl OverrideStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn load(&self) -> OverrideSet {
        match self.try_load().await {
            Ok(set) => set,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load stat overrides; treating as unset");
                OverrideSet::default()
            }
        }
    }

    async fn try_load(&self) -> Result<OverrideSet> {
        let Some(raw) = self.storage.get(OVERRIDES_KEY).await? else {
            return Ok(OverrideSet::default());
        };
        serde_json::from_str(&raw).with_context(|| "failed to parse stat overrides JSON")
    }

    /// Merges the present fields of `patch` over the stored set and persists
    /// the result, returning it.
    pub async fn update(&self, patch: OverrideSet) -> OverrideSet {
        let mut set = self.load().await;
        if patch.streak_days.is_some() {
            set.streak_days = patch.streak_days;
        }
        if patch.total_time.is_some() {
            set.total_time = patch.total_time;
        }
        if patch.avg_daily_time.is_some() {
            set.avg_daily_time = patch.avg_daily_time;
        }

        if let Err(err) = self.try_save(&set).await {
            tracing::warn!(error = %err, "failed to persist stat overrides; keeping in-memory state");
        }
        set
    }

    async fn try_save(&self, set: &OverrideSet) -> Result<()> {
        let json =
            serde_json::to_string(set).with_context(|| "failed to serialize stat overrides")?;
        self.storage.set(OVERRIDES_KEY, &json).await
    }

    pub async fn clear(&self) {
        if let Err(err) = self.storage.delete(OVERRIDES_KEY).await {
            tracing::warn!(error = %err, "failed to clear stat overrides");
        }
    }
}
