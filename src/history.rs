use crate::storage::Storage;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Well-known storage key holding the JSON array of session entries.
pub const HISTORY_KEY: &str = "session_history";

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// One calendar day of recorded activity. At most one entry exists per
/// distinct `date`; the recorder merges instead of duplicating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub date: String,
    pub minutes: f64,
    pub exercises: u32,
}

/// A completed exercise session as reported by the caller.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    /// Calendar day the session belongs to; today when absent.
    pub date: Option<NaiveDate>,
    pub minutes: f64,
    pub exercises: u32,
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn today_key() -> String {
    date_key(Local::now().date_naive())
}

/// Coerces loosely-typed stored records into canonical entries.
///
/// Order-preserving and length-preserving: every input record yields exactly
/// one entry, with unusable numerics coerced to zero and unusable dates
/// falling back to today's key.
pub fn normalize(values: &[Value]) -> Vec<SessionEntry> {
    values.iter().map(normalize_record).collect()
}

fn normalize_record(value: &Value) -> SessionEntry {
    let minutes = coerce_non_negative(value.get("minutes"));
    let exercises = coerce_non_negative(value.get("exercises")).floor() as u32;
    let date = match coerce_date_key(value.get("date")) {
        Some(date) => date,
        None => {
            tracing::warn!(record = %value, "session record has no usable date; dating it today");
            today_key()
        }
    };

    SessionEntry {
        date,
        minutes,
        exercises,
    }
}

/// Reduces a date-bearing JSON value to a `YYYY-MM-DD` key.
///
/// Canonical strings pass through verbatim; datetime strings keep the
/// calendar date as written (no UTC shift); numbers are epoch milliseconds
/// interpreted in local time.
fn coerce_date_key(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(raw) => {
            let raw = raw.trim();
            if NaiveDate::parse_from_str(raw, DATE_KEY_FORMAT).is_ok() {
                return Some(raw.to_string());
            }
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| date_key(dt.naive_local().date()))
        }
        Value::Number(number) => {
            let millis = number.as_i64().or_else(|| number.as_f64().map(|f| f as i64))?;
            Local
                .timestamp_millis_opt(millis)
                .single()
                .map(|dt| date_key(dt.date_naive()))
        }
        _ => None,
    }
}

fn coerce_non_negative(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    if number.is_finite() && number > 0.0 {
        number
    } else {
        0.0
    }
}

/// Owns the canonical session-entry list under [`HISTORY_KEY`].
///
/// Read/parse failures degrade to an empty history and write failures keep
/// the in-memory result, both with a logged warning; no error from this store
/// reaches the caller. The read-merge-write sequence in
/// [`HistoryStore::record_session`] is serialized behind a mutex so
/// concurrent recordings merge instead of overwriting each other.
#[derive(Clone)]
pub struct HistoryStore {
    storage: Storage,
    mutate: Arc<Mutex<()>>,
}

impl HistoryStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            mutate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn load(&self) -> Vec<SessionEntry> {
        match self.try_load().await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load session history; treating as empty");
                Vec::new()
            }
        }
    }

    async fn try_load(&self) -> Result<Vec<SessionEntry>> {
        let Some(raw) = self.storage.get(HISTORY_KEY).await? else {
            return Ok(Vec::new());
        };
        let values: Vec<Value> =
            serde_json::from_str(&raw).with_context(|| "failed to parse session history JSON")?;
        Ok(normalize(&values))
    }

    pub async fn save(&self, entries: &[SessionEntry]) {
        if let Err(err) = self.try_save(entries).await {
            tracing::warn!(error = %err, "failed to persist session history; keeping in-memory state");
        }
    }

    async fn try_save(&self, entries: &[SessionEntry]) -> Result<()> {
        let json =
            serde_json::to_string(entries).with_context(|| "failed to serialize session history")?;
        self.storage.set(HISTORY_KEY, &json).await
    }

    /// Merges a completed session into the entry for its calendar day and
    /// persists the updated list, returning it.
    pub async fn record_session(&self, session: NewSession) -> Vec<SessionEntry> {
        let _guard = self.mutate.lock().await;

        let key = session.date.map(date_key).unwrap_or_else(today_key);
        let minutes = if session.minutes.is_finite() {
            session.minutes.max(0.0)
        } else {
            0.0
        };

        let mut entries = self.load().await;
        if let Some(existing) = entries.iter_mut().find(|entry| entry.date == key) {
            existing.minutes += minutes;
            existing.exercises = existing.exercises.saturating_add(session.exercises);
        } else {
            entries.push(SessionEntry {
                date: key,
                minutes,
                exercises: session.exercises,
            });
        }

        self.save(&entries).await;
        entries
    }

    /// Clears the entire history list.
    pub async fn reset(&self) {
        let _guard = self.mutate.lock().await;
        if let Err(err) = self.storage.delete(HISTORY_KEY).await {
            tracing::warn!(error = %err, "failed to clear session history");
        }
    }
}
