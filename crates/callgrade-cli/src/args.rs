use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use callgrade_core::Schedule;

#[derive(Parser)]
#[command(name = "callgrade")]
#[command(version)]
#[command(about = "Score recorded customer-service calls with Gemini")]
#[command(after_help = "Run 'callgrade setup' to configure API keys.")]
pub struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a call on attitude, opening, quality, and closing
    Analyze(AnalyzeArgs),

    /// Transcribe, translate, and summarize a call
    Transcribe(InputArgs),

    /// Probe every configured API key and show its health
    CheckKeys,

    /// Build a report from raw scores without calling the service
    Score(ScoreArgs),

    /// Configure API keys, models, and call language
    Setup,
}

/// A call recording or transcript.
#[derive(Args, Clone)]
pub struct InputArgs {
    /// Audio file (wav, mp3, m4a, ogg, flac) or transcript (.txt)
    pub file: PathBuf,

    /// Language the call is held in (overrides settings)
    #[arg(short, long)]
    pub language: Option<String>,
}

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// How to schedule the four aspect requests
    #[arg(long, default_value_t = Schedule::Sequential)]
    pub schedule: Schedule,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ScoreArgs {
    /// Raw attitude score in [-1.0, 1.0]
    #[arg(long, allow_hyphen_values = true)]
    pub positive: f64,

    /// Raw call-opening score in [-1.0, 1.0]
    #[arg(long, allow_hyphen_values = true)]
    pub opening: f64,

    /// Raw call-quality score in [-1.0, 1.0]
    #[arg(long, allow_hyphen_values = true)]
    pub quality: f64,

    /// Raw call-closing score in [-1.0, 1.0]
    #[arg(long, allow_hyphen_values = true)]
    pub closing: f64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
