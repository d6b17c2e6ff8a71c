use crate::storage::Storage;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Well-known storage key holding the profile JSON object.
pub const PROFILE_KEY: &str = "user_profile";

const DEFAULT_DAILY_GOAL_MINUTES: u32 = 10;

/// Local user profile. Identity only; activity data lives in the history
/// store and survives a profile rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub display_name: String,
    pub avatar_path: Option<String>,
    pub daily_goal_minutes: u32,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            avatar_path: None,
            daily_goal_minutes: DEFAULT_DAILY_GOAL_MINUTES,
        }
    }
}

/// Fields to change; absent fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub avatar_path: Option<String>,
    pub daily_goal_minutes: Option<u32>,
}

#[derive(Clone)]
pub struct ProfileStore {
    storage: Storage,
}

impl ProfileStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn load(&self) -> Profile {
        match self.try_load().await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load profile; using defaults");
                Profile::default()
            }
        }
    }

    async fn try_load(&self) -> Result<Profile> {
        let Some(raw) = self.storage.get(PROFILE_KEY).await? else {
            return Ok(Profile::default());
        };
        serde_json::from_str(&raw).with_context(|| "failed to parse profile JSON")
    }

    /// Merges the patch over the stored profile, persists, and returns the
    /// updated profile.
    pub async fn update(&self, patch: ProfilePatch) -> Profile {
        let mut profile = self.load().await;
        if let Some(name) = patch.display_name {
            profile.display_name = name;
        }
        if let Some(path) = patch.avatar_path {
            profile.avatar_path = Some(path);
        }
        if let Some(goal) = patch.daily_goal_minutes {
            profile.daily_goal_minutes = goal;
        }

        if let Err(err) = self.try_save(&profile).await {
            tracing::warn!(error = %err, "failed to persist profile; keeping in-memory state");
        }
        profile
    }

    async fn try_save(&self, profile: &Profile) -> Result<()> {
        let json = serde_json::to_string(profile).with_context(|| "failed to serialize profile")?;
        self.storage.set(PROFILE_KEY, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn open_profiles() -> (ProfileStore, NamedTempFile) {
        let db_file = NamedTempFile::new().unwrap();
        let storage = Storage::connect(db_file.path()).await.unwrap();
        storage.ensure_schema().await.unwrap();
        (ProfileStore::new(storage), db_file)
    }

    #[tokio::test]
    async fn missing_profile_loads_defaults() {
        let (profiles, _db_file) = open_profiles().await;
        let profile = profiles.load().await;

        assert_eq!(profile.display_name, "");
        assert_eq!(profile.avatar_path, None);
        assert_eq!(profile.daily_goal_minutes, DEFAULT_DAILY_GOAL_MINUTES);
    }

    #[tokio::test]
    async fn update_merges_only_present_fields() {
        let (profiles, _db_file) = open_profiles().await;

        profiles
            .update(ProfilePatch {
                display_name: Some("Sam".to_string()),
                avatar_path: Some("avatars/sam.png".to_string()),
                daily_goal_minutes: None,
            })
            .await;
        let profile = profiles
            .update(ProfilePatch {
                daily_goal_minutes: Some(25),
                ..ProfilePatch::default()
            })
            .await;

        assert_eq!(profile.display_name, "Sam");
        assert_eq!(profile.avatar_path.as_deref(), Some("avatars/sam.png"));
        assert_eq!(profile.daily_goal_minutes, 25);

        let reloaded = profiles.load().await;
        assert_eq!(reloaded, profile);
    }

    #[tokio::test]
    async fn corrupt_profile_degrades_to_defaults() {
        let db_file = NamedTempFile::new().unwrap();
        let storage = Storage::connect(db_file.path()).await.unwrap();
        storage.ensure_schema().await.unwrap();
        storage.set(PROFILE_KEY, "[5,6]").await.unwrap();

        let profiles = ProfileStore::new(storage);
        assert_eq!(profiles.load().await, Profile::default());
    }
}
