use crate::history::{SessionEntry, date_key};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::HashMap;

/// Lookback horizon for the activity window. The streak walk is bounded by
/// this window, so a streak can never exceed 14 days.
pub const WINDOW_DAYS: u32 = 14;

/// One day of the activity window: date key, minutes logged, weekday initial.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub date: String,
    pub minutes: f64,
    pub label: char,
}

/// Derived statistics over a normalized history. Never stored; recomputed on
/// demand and fully deterministic for a fixed history and `today`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub total_minutes: f64,
    pub total_exercises: u64,
    pub current_streak: u32,
    /// Entries with any activity, over the full history. Feeds the daily
    /// average in the override layer.
    pub active_days: u32,
    /// Today and the 13 preceding days, oldest first.
    pub last_14_days: Vec<DayCell>,
}

pub fn compute_stats(history: &[SessionEntry], today: NaiveDate) -> StatsSnapshot {
    let mut total_minutes = 0.0;
    let mut total_exercises: u64 = 0;
    let mut active_days: u32 = 0;
    let mut by_date: HashMap<&str, &SessionEntry> = HashMap::new();

    for entry in history {
        total_minutes += entry.minutes;
        total_exercises += u64::from(entry.exercises);
        if entry.minutes > 0.0 {
            active_days += 1;
        }
        // Later entries win if the one-per-date invariant was ever violated.
        by_date.insert(entry.date.as_str(), entry);
    }

    let mut window = Vec::with_capacity(WINDOW_DAYS as usize);
    let mut current_streak: u32 = 0;

    for i in 0..WINDOW_DAYS {
        let day = today - Days::new(u64::from(i));
        let key = date_key(day);
        let minutes = by_date
            .get(key.as_str())
            .map(|entry| entry.minutes)
            .unwrap_or(0.0);

        // The streak only grows while no gap has appeared yet: day i extends
        // it exactly when the previous i days were all active.
        if current_streak == i && minutes > 0.0 {
            current_streak += 1;
        }

        window.push(DayCell {
            date: key,
            minutes,
            label: weekday_initial(day.weekday()),
        });
    }

    // Assembled newest-first, consumed oldest-first.
    window.reverse();

    StatsSnapshot {
        total_minutes,
        total_exercises,
        current_streak,
        active_days,
        last_14_days: window,
    }
}

pub fn weekday_initial(weekday: Weekday) -> char {
    match weekday {
        Weekday::Mon => 'M',
        Weekday::Tue => 'T',
        Weekday::Wed => 'W',
        Weekday::Thu => 'T',
        Weekday::Fri => 'F',
        Weekday::Sat => 'S',
        Weekday::Sun => 'S',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, minutes: f64, exercises: u32) -> SessionEntry {
        SessionEntry {
            date: date.to_string(),
            minutes,
            exercises,
        }
    }

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn empty_history_yields_zeroed_snapshot_with_full_window() {
        let stats = compute_stats(&[], fixed_today());

        assert_eq!(stats.total_minutes, 0.0);
        assert_eq!(stats.total_exercises, 0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.active_days, 0);
        assert_eq!(stats.last_14_days.len(), 14);
        assert!(stats.last_14_days.iter().all(|cell| cell.minutes == 0.0));
    }

    #[test]
    fn compute_stats_is_deterministic() {
        let history = vec![
            entry("2025-06-15", 10.0, 2),
            entry("2025-06-14", 5.0, 1),
        ];

        let first = compute_stats(&history, fixed_today());
        let second = compute_stats(&history, fixed_today());
        assert_eq!(first, second);
    }

    #[test]
    fn streak_counts_consecutive_active_days_from_today() {
        let history = vec![
            entry("2025-06-15", 10.0, 2),
            entry("2025-06-14", 5.0, 1),
            entry("2025-06-13", 0.0, 0),
        ];

        let stats = compute_stats(&history, fixed_today());
        assert_eq!(stats.current_streak, 2);
    }

    #[test]
    fn zero_minutes_today_caps_streak_at_zero() {
        let history = vec![
            entry("2025-06-15", 0.0, 2),
            entry("2025-06-14", 5.0, 1),
            entry("2025-06-13", 5.0, 1),
        ];

        let stats = compute_stats(&history, fixed_today());
        assert_eq!(stats.current_streak, 0);
    }

    #[test]
    fn missing_day_breaks_the_streak() {
        let history = vec![
            entry("2025-06-15", 10.0, 1),
            // 2025-06-14 missing entirely.
            entry("2025-06-13", 5.0, 1),
        ];

        let stats = compute_stats(&history, fixed_today());
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn streak_is_capped_by_the_window() {
        let today = fixed_today();
        let history: Vec<SessionEntry> = (0..20)
            .map(|i| entry(&date_key(today - Days::new(i)), 5.0, 1))
            .collect();

        let stats = compute_stats(&history, today);
        assert_eq!(stats.current_streak, 14);
    }

    #[test]
    fn totals_cover_the_full_history_not_just_the_window() {
        let history = vec![
            entry("2025-06-15", 10.0, 2),
            entry("2024-01-01", 30.0, 6),
        ];

        let stats = compute_stats(&history, fixed_today());
        assert_eq!(stats.total_minutes, 40.0);
        assert_eq!(stats.total_exercises, 8);
        assert_eq!(stats.active_days, 2);

        // The old entry stays outside the window.
        assert!(
            stats
                .last_14_days
                .iter()
                .all(|cell| cell.date != "2024-01-01")
        );
    }

    #[test]
    fn window_runs_oldest_to_newest_with_weekday_labels() {
        let stats = compute_stats(&[entry("2025-06-15", 10.0, 1)], fixed_today());

        let window = &stats.last_14_days;
        assert_eq!(window[0].date, "2025-06-02");
        assert_eq!(window[13].date, "2025-06-15");
        assert_eq!(window[13].minutes, 10.0);
        // 2025-06-15 is a Sunday.
        assert_eq!(window[13].label, 'S');
        assert_eq!(window[12].label, 'S');
        assert_eq!(window[11].label, 'F');
    }

    #[test]
    fn later_duplicate_dates_win_in_the_window() {
        let history = vec![
            entry("2025-06-15", 3.0, 1),
            entry("2025-06-15", 8.0, 1),
        ];

        let stats = compute_stats(&history, fixed_today());
        assert_eq!(stats.last_14_days[13].minutes, 8.0);
        // Totals still sum every entry.
        assert_eq!(stats.total_minutes, 11.0);
    }
}
