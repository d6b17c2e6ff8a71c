use crate::config::RewardsConfig;
use crate::storage::Storage;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Well-known storage key holding the points balance JSON object.
pub const POINTS_KEY: &str = "reward_points";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewardsError {
    #[error("insufficient points: have {balance}, need {cost}")]
    InsufficientPoints { balance: u64, cost: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PointsBalance {
    points: u64,
}

/// Points earned for completed sessions, spendable on in-app rewards.
///
/// Accrual rates come from configuration. Like the history store, the
/// read-modify-write sequences here run behind a mutex and storage failures
/// degrade with a warning rather than surfacing.
#[derive(Clone)]
pub struct RewardsLedger {
    storage: Storage,
    config: RewardsConfig,
    mutate: Arc<Mutex<()>>,
}

impl RewardsLedger {
    pub fn new(storage: Storage, config: RewardsConfig) -> Self {
        Self {
            storage,
            config,
            mutate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn balance(&self) -> u64 {
        self.load().await.points
    }

    /// Points a session is worth at the configured rates.
    pub fn points_for(&self, minutes: f64, exercises: u32) -> u64 {
        let minute_points = (minutes.max(0.0) * self.config.points_per_minute).round() as u64;
        let exercise_points = u64::from(exercises) * u64::from(self.config.points_per_exercise);
        minute_points + exercise_points
    }

    /// Accrues points for a recorded session and returns the new balance.
    pub async fn award_for(&self, minutes: f64, exercises: u32) -> u64 {
        let earned = self.points_for(minutes, exercises);
        let _guard = self.mutate.lock().await;

        let mut balance = self.load().await;
        balance.points = balance.points.saturating_add(earned);
        self.save(&balance).await;
        balance.points
    }

    /// Spends `cost` points, failing without touching the balance when it
    /// does not cover the cost.
    pub async fn redeem(&self, cost: u64) -> Result<u64, RewardsError> {
        let _guard = self.mutate.lock().await;

        let mut balance = self.load().await;
        if balance.points < cost {
            return Err(RewardsError::InsufficientPoints {
                balance: balance.points,
                cost,
            });
        }
        balance.points -= cost;
        self.save(&balance).await;
        Ok(balance.points)
    }

    pub async fn reset(&self) {
        let _guard = self.mutate.lock().await;
        if let Err(err) = self.storage.delete(POINTS_KEY).await {
            tracing::warn!(error = %err, "failed to clear reward points");
        }
    }

    async fn load(&self) -> PointsBalance {
        match self.try_load().await {
            Ok(balance) => balance,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load reward points; treating as zero");
                PointsBalance::default()
            }
        }
    }

    async fn try_load(&self) -> Result<PointsBalance> {
        let Some(raw) = self.storage.get(POINTS_KEY).await? else {
            return Ok(PointsBalance::default());
        };
        serde_json::from_str(&raw).with_context(|| "failed to parse reward points JSON")
    }

    async fn save(&self, balance: &PointsBalance) {
        let result: Result<()> = async {
            let json = serde_json::to_string(balance)
                .with_context(|| "failed to serialize reward points")?;
            self.storage.set(POINTS_KEY, &json).await
        }
        .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to persist reward points; keeping in-memory state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_config() -> RewardsConfig {
        RewardsConfig {
            points_per_minute: 1.0,
            points_per_exercise: 5,
        }
    }

    async fn open_ledger() -> (RewardsLedger, NamedTempFile) {
        let db_file = NamedTempFile::new().unwrap();
        let storage = Storage::connect(db_file.path()).await.unwrap();
        storage.ensure_schema().await.unwrap();
        (RewardsLedger::new(storage, test_config()), db_file)
    }

    #[tokio::test]
    async fn award_accrues_at_configured_rates() {
        let (ledger, _db_file) = open_ledger().await;

        assert_eq!(ledger.balance().await, 0);
        let balance = ledger.award_for(10.0, 2).await;
        // 10 minutes + 2 exercises at 5 points each.
        assert_eq!(balance, 20);
        assert_eq!(ledger.balance().await, 20);
    }

    #[tokio::test]
    async fn redeem_spends_down_the_balance() {
        let (ledger, _db_file) = open_ledger().await;
        ledger.award_for(30.0, 0).await;

        assert_eq!(ledger.redeem(12).await, Ok(18));
        assert_eq!(ledger.balance().await, 18);
    }

    #[tokio::test]
    async fn redeem_beyond_balance_fails_without_spending() {
        let (ledger, _db_file) = open_ledger().await;
        ledger.award_for(5.0, 0).await;

        assert_eq!(
            ledger.redeem(100).await,
            Err(RewardsError::InsufficientPoints {
                balance: 5,
                cost: 100
            })
        );
        assert_eq!(ledger.balance().await, 5);
    }

    #[tokio::test]
    async fn reset_zeroes_the_balance() {
        let (ledger, _db_file) = open_ledger().await;
        ledger.award_for(10.0, 1).await;

        ledger.reset().await;
        assert_eq!(ledger.balance().await, 0);
    }

    #[tokio::test]
    async fn corrupt_balance_degrades_to_zero() {
        let db_file = NamedTempFile::new().unwrap();
        let storage = Storage::connect(db_file.path()).await.unwrap();
        storage.ensure_schema().await.unwrap();
        storage.set(POINTS_KEY, "oops").await.unwrap();

        let ledger = RewardsLedger::new(storage, test_config());
        assert_eq!(ledger.balance().await, 0);
    }

    #[tokio::test]
    async fn negative_minutes_earn_nothing() {
        let (ledger, _db_file) = open_ledger().await;
        assert_eq!(ledger.points_for(-3.0, 0), 0);
        assert_eq!(ledger.points_for(f64::NAN, 1), 5);
    }
}
