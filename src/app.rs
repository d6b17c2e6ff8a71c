use crate::{
    cli::{Command, OverrideCommand, ProfileCommand, RewardsCommand},
    config::AppConfig,
    history::{HistoryStore, NewSession, date_key, today_key},
    overrides::{OverrideStore, apply_overrides, sanitize},
    profile::{ProfilePatch, ProfileStore},
    reminders::ReminderPlanner,
    rewards::RewardsLedger,
    stats::compute_stats,
    storage::Storage,
};
use anyhow::{Result, bail};
use chrono::Local;
use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

/// High-level application orchestrator: wires config to storage and runs one
/// command per invocation.
pub struct App {
    config: Arc<AppConfig>,
}

impl App {
    pub async fn new(config: AppConfig) -> Result<Self> {
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub async fn run(self, command: Command) -> Result<()> {
        let storage = Storage::connect(&self.config.storage.database_path).await?;
        storage.ensure_schema().await?;

        let history = HistoryStore::new(storage.clone());
        let overrides = OverrideStore::new(storage.clone());
        let profiles = ProfileStore::new(storage.clone());
        let rewards = RewardsLedger::new(storage.clone(), self.config.rewards.clone());

        match command {
            Command::Record {
                date,
                minutes,
                exercises,
            } => {
                let entries = history
                    .record_session(NewSession {
                        date,
                        minutes,
                        exercises,
                    })
                    .await;
                let earned = rewards.points_for(minutes, exercises);
                let balance = rewards.award_for(minutes, exercises).await;

                let key = date.map(date_key).unwrap_or_else(today_key);
                if let Some(entry) = entries.iter().find(|entry| entry.date == key) {
                    println!(
                        "Recorded: {} now at {} min, {} exercises",
                        entry.date, entry.minutes, entry.exercises
                    );
                }
                println!("Earned {earned} points ({balance} total)");
            }
            Command::Stats => {
                let entries = history.load().await;
                let stats = compute_stats(&entries, Local::now().date_naive());
                let set = overrides.load().await;
                let display = apply_overrides(&stats, &set);

                println!("Current streak : {} days", display.current_streak);
                println!("Total time     : {} min", display.total_minutes);
                println!("Avg daily time : {} min", display.avg_daily_time);
                println!("Exercises done : {}", display.total_exercises);
                println!("Points balance : {}", rewards.balance().await);

                let labels: Vec<String> = display
                    .last_14_days
                    .iter()
                    .map(|cell| cell.label.to_string())
                    .collect();
                let marks: Vec<&str> = display
                    .last_14_days
                    .iter()
                    .map(|cell| if cell.minutes > 0.0 { "#" } else { "." })
                    .collect();
                println!("Last 14 days   : {}", labels.join(" "));
                println!("                 {}", marks.join(" "));

                if !display.overrides.is_empty() {
                    println!("(stat overrides active)");
                }
            }
            Command::History => {
                let entries = history.load().await;
                if entries.is_empty() {
                    println!("No sessions recorded yet.");
                }
                for entry in entries {
                    println!(
                        "{}  {:>6.1} min  {:>3} exercises",
                        entry.date, entry.minutes, entry.exercises
                    );
                }
            }
            Command::Override(command) => match command {
                OverrideCommand::Set {
                    streak_days,
                    total_time,
                    avg_daily_time,
                } => {
                    let patch = sanitize(streak_days, total_time, avg_daily_time);
                    if patch.is_empty() {
                        bail!("no override values given; see `override set --help`");
                    }
                    let set = overrides.update(patch).await;
                    println!("Overrides now: {}", serde_json::to_string(&set)?);
                }
                OverrideCommand::Show => {
                    let set = overrides.load().await;
                    if set.is_empty() {
                        println!("No overrides set.");
                    } else {
                        println!("{}", serde_json::to_string(&set)?);
                    }
                }
                OverrideCommand::Clear => {
                    overrides.clear().await;
                    println!("Overrides cleared.");
                }
            },
            Command::Profile(command) => match command {
                ProfileCommand::Show => {
                    let profile = profiles.load().await;
                    let name = if profile.display_name.is_empty() {
                        "(unset)"
                    } else {
                        profile.display_name.as_str()
                    };
                    println!("Name       : {name}");
                    println!(
                        "Avatar     : {}",
                        profile.avatar_path.as_deref().unwrap_or("(none)")
                    );
                    println!("Daily goal : {} min", profile.daily_goal_minutes);
                }
                ProfileCommand::Set {
                    name,
                    avatar,
                    daily_goal,
                } => {
                    if let Some(name) = &name {
                        if name.trim().is_empty() {
                            bail!("display name cannot be empty");
                        }
                    }
                    let profile = profiles
                        .update(ProfilePatch {
                            display_name: name,
                            avatar_path: avatar,
                            daily_goal_minutes: daily_goal,
                        })
                        .await;
                    println!(
                        "Profile updated: {} (goal {} min/day)",
                        profile.display_name, profile.daily_goal_minutes
                    );
                }
            },
            Command::Rewards(command) => match command {
                RewardsCommand::Show => {
                    println!("Points balance: {}", rewards.balance().await);
                }
                RewardsCommand::Redeem { cost } => {
                    let balance = rewards.redeem(cost).await?;
                    println!("Redeemed {cost} points; {balance} remaining");
                }
            },
            Command::Remind => {
                let planner = ReminderPlanner::new(self.config.reminders.clone());
                if !planner.enabled() {
                    println!("Reminders are disabled in the configuration.");
                    return Ok(());
                }
                let mut rng = rand::thread_rng();
                let now = Local::now();
                let at = planner.next_at(now, &mut rng);
                println!(
                    "Next posture break in {} min (at {})",
                    (at - now).num_minutes(),
                    at.format("%H:%M")
                );
            }
            Command::Reset { yes } => {
                if !yes && !confirm_reset()? {
                    println!("Reset cancelled.");
                    return Ok(());
                }
                history.reset().await;
                overrides.clear().await;
                rewards.reset().await;
                println!("Activity history, overrides, and points cleared.");
            }
        }

        Ok(())
    }
}

fn confirm_reset() -> Result<bool> {
    print!("This clears all recorded activity. Continue? [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
