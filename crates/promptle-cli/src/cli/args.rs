use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "promptle",
    version,
    about = "Daily photo challenge: describe the image, get a similarity score"
)]
pub struct Cli {
    /// Config file (defaults to ./promptle.yaml when present)
    #[arg(long, global = true, env = "PROMPTLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fail on unknown config keys instead of warning
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config (if missing) and create the database schema
    Init,
    Challenge(ChallengeArgs),
    /// Submit a prompt for a challenge
    Submit(SubmitArgs),
    /// List your recorded guesses for a challenge
    Attempts(HistoryArgs),
    /// Show your best score for a challenge
    Best(HistoryArgs),
    Version,
}

#[derive(clap::Args, Clone)]
pub struct ChallengeArgs {
    #[command(subcommand)]
    pub cmd: ChallengeSub,
}

#[derive(Subcommand, Clone)]
pub enum ChallengeSub {
    /// Schedule a challenge image for a date
    Add(ChallengeAddArgs),
    /// Show today's (UTC) challenge
    Today(TodayArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChallengeAddArgs {
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub image_url: String,

    /// YYYY-MM-DD; defaults to today (UTC)
    #[arg(long)]
    pub date: Option<chrono::NaiveDate>,

    #[arg(long)]
    pub photographer_name: Option<String>,

    #[arg(long)]
    pub photographer_url: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct TodayArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SubmitArgs {
    #[arg(long)]
    pub challenge: String,

    #[arg(long)]
    pub prompt: String,

    /// Player id; submissions without one are rejected
    #[arg(long, env = "PROMPTLE_USER")]
    pub user: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct HistoryArgs {
    #[arg(long)]
    pub challenge: String,

    #[arg(long, env = "PROMPTLE_USER")]
    pub user: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
