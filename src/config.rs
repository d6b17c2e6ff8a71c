use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else {
            let default_path = PathBuf::from("posture-coach.toml");
            if default_path.exists() {
                Self::from_file(&default_path)?
            } else {
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| "failed to parse configuration TOML")?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(db_path) = env::var("POSTURE_DB_PATH") {
            self.storage.database_path = PathBuf::from(db_path);
        }
        if let Ok(minutes) = env::var("POSTURE_REMINDER_MIN_MINUTES") {
            if let Ok(minutes) = minutes.parse() {
                self.reminders.min_delay_minutes = minutes;
            }
        }
        if let Ok(minutes) = env::var("POSTURE_REMINDER_MAX_MINUTES") {
            if let Ok(minutes) = minutes.parse() {
                self.reminders.max_delay_minutes = minutes;
            }
        }
    }

    fn normalize(&mut self) {
        let reminders = &mut self.reminders;
        if reminders.min_delay_minutes > reminders.max_delay_minutes {
            tracing::warn!(
                min = reminders.min_delay_minutes,
                max = reminders.max_delay_minutes,
                "reminder delay bounds are inverted; swapping them"
            );
            std::mem::swap(
                &mut reminders.min_delay_minutes,
                &mut reminders.max_delay_minutes,
            );
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_reminders_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_delay")]
    pub min_delay_minutes: u32,
    #[serde(default = "default_max_delay")]
    pub max_delay_minutes: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: default_reminders_enabled(),
            min_delay_minutes: default_min_delay(),
            max_delay_minutes: default_max_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_points_per_minute")]
    pub points_per_minute: f64,
    #[serde(default = "default_points_per_exercise")]
    pub points_per_exercise: u32,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            points_per_minute: default_points_per_minute(),
            points_per_exercise: default_points_per_exercise(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("posture.db")
}

fn default_reminders_enabled() -> bool {
    true
}

fn default_min_delay() -> u32 {
    30
}

fn default_max_delay() -> u32 {
    90
}

fn default_points_per_minute() -> f64 {
    1.0
}

fn default_points_per_exercise() -> u32 {
    5
}
