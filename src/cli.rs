// src/cli.rs

use crate::models::{TaskMode, TaskType};
use clap::{Parser, ValueEnum, command, crate_version};
use std::path::PathBuf;

/// Log file verbosity
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("entry")
        .required(true)
        .args(&["source", "analyse"]),
))]
pub struct Cli {
    // --- Entry ---
    /// Source to leech (repeatable). `[name]`, `{zip pw}` and `(unzip pw)` entries are directives
    #[arg(short, long, value_name = "SOURCE", num_args = 1.., action = clap::ArgAction::Append, help_heading = "Entry")]
    pub source: Vec<String>,
    /// Probe a media URL and list its selectable tracks
    #[arg(long, value_name = "URL", help_heading = "Entry")]
    pub analyse: Option<String>,

    // --- Task options ---
    /// Delivery mode
    #[arg(short, long, value_enum, default_value_t = TaskMode::Leech, help_heading = "Task")]
    pub mode: TaskMode,
    /// Post-processing applied before delivery
    #[arg(short = 't', long = "type", value_enum, default_value_t = TaskType::Normal, help_heading = "Task")]
    pub task_type: TaskType,
    /// Route every source through the streaming-site extractor
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Task")]
    pub ytdl: bool,
    /// Format preset for streaming sources: best, worst, 720p, 480p, 360p, 240p, audio_only, video_only
    #[arg(short = 'q', long, default_value = "best", help_heading = "Task")]
    pub quality: String,
    /// Remux videos to mp4 before upload
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Task")]
    pub convert: bool,
    /// Do not split archives or oversized files into parts
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Task")]
    pub no_split: bool,
    /// [analyse] Download one track, e.g. 'video:0', 'audio:2', 'sub:1'
    #[arg(long, value_name = "KIND:INDEX", requires = "analyse", help_heading = "Task")]
    pub pick: Option<String>,

    // --- Environment ---
    /// Working directory root (wiped at the start of every task)
    #[arg(long, value_name = "DIR", help_heading = "Environment")]
    pub work_dir: Option<PathBuf>,
    /// Directory receiving uploaded files
    #[arg(short, long, value_name = "DIR", help_heading = "Environment")]
    pub outbox: Option<PathBuf>,
    /// Owner user id, highest priority over OWNER_ID and the config file
    #[arg(long, help_heading = "Environment")]
    pub owner: Option<i64>,

    // --- General ---
    /// Print help and exit
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// Print version and exit
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (hidden) log file verbosity
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
