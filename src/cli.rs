use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface for the posture tracker.
#[derive(Debug, Parser)]
#[command(author, version, about = "Local posture-break tracker", long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file (defaults to ./posture-coach.toml if present).
    #[arg(long, value_name = "FILE")]
    pub config_path: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a completed exercise session.
    Record {
        /// Calendar day the session belongs to (YYYY-MM-DD, defaults to today).
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// Active minutes in the session.
        #[arg(long, default_value_t = 0.0)]
        minutes: f64,
        /// Exercises completed in the session.
        #[arg(long, default_value_t = 0)]
        exercises: u32,
    },
    /// Show the stats dashboard.
    Stats,
    /// List the stored session history.
    History,
    /// Manage developer stat overrides.
    #[command(subcommand)]
    Override(OverrideCommand),
    /// Show or edit the local profile.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Show or spend reward points.
    #[command(subcommand)]
    Rewards(RewardsCommand),
    /// Draw the next randomized reminder delay.
    Remind,
    /// Clear recorded activity, overrides, and points.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum OverrideCommand {
    /// Set one or more override values.
    Set {
        #[arg(long, value_name = "DAYS")]
        streak_days: Option<f64>,
        #[arg(long, value_name = "MINUTES")]
        total_time: Option<f64>,
        #[arg(long, value_name = "MINUTES")]
        avg_daily_time: Option<f64>,
    },
    /// Show the saved overrides.
    Show,
    /// Remove all overrides.
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Print the current profile.
    Show,
    /// Change profile fields.
    Set {
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
        /// Path to an avatar image on this device.
        #[arg(long, value_name = "PATH")]
        avatar: Option<String>,
        #[arg(long, value_name = "MINUTES")]
        daily_goal: Option<u32>,
    },
}

#[derive(Debug, Subcommand)]
pub enum RewardsCommand {
    /// Print the current points balance.
    Show,
    /// Spend points.
    Redeem {
        #[arg(value_name = "POINTS")]
        cost: u64,
    },
}
