// src/lib.rs

pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod models;
pub mod processing;
pub mod symbols;
pub mod task;
pub mod tool;
pub mod transfer;
pub mod ui;
pub mod utils;

use crate::{
    chat::{ChatSurface, ConsoleChat},
    cli::Cli,
    client::RobustClient,
    config::{AppConfig, WorkPaths},
    downloader::{DefaultDownloadManager, DownloadManager},
    error::{AppError, AppResult},
    extractor::StreamExtractor,
    models::{Task, TaskOptions, track::TrackKind},
    processing::{PostProcessor, ToolProcessor},
    task::{Services, TaskCoordinator, TaskOutcome, TaskSlot},
    transfer::{ProgressSender, TransferState},
};
use anyhow::anyhow;
use colored::*;
use log::{debug, info};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;

/// Chat id used for the terminal session.
const CLI_CHAT_ID: i64 = 0;

/// Everything one running task needs, cheap to clone into each phase.
#[derive(Clone)]
pub struct TaskContext {
    pub task: Arc<Task>,
    pub config: Arc<AppConfig>,
    pub paths: WorkPaths,
    pub transfer: TransferState,
    pub progress: ProgressSender,
    pub chat: Arc<dyn ChatSurface>,
    pub downloader: Arc<dyn DownloadManager>,
    pub processor: Arc<dyn PostProcessor>,
    pub slot: Arc<TaskSlot>,
    pub cancellation_token: CancellationToken,
    started_at: Instant,
    download_name: Arc<Mutex<String>>,
}

impl TaskContext {
    pub fn new(
        task: Arc<Task>,
        services: &Services,
        transfer: TransferState,
        progress: ProgressSender,
        slot: Arc<TaskSlot>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            task,
            config: services.config.clone(),
            paths: services.config.work_paths(),
            transfer,
            progress,
            chat: services.chat.clone(),
            downloader: services.downloader.clone(),
            processor: services.processor.clone(),
            slot,
            cancellation_token,
            started_at: Instant::now(),
            download_name: Arc::new(Mutex::new(String::new())),
        }
    }

    pub fn download_name(&self) -> String {
        self.download_name.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_download_name(&self, name: String) {
        *self.download_name.lock().unwrap_or_else(PoisonError::into_inner) = name;
    }

    pub fn ensure_not_cancelled(&self) -> AppResult<()> {
        if self.cancellation_token.is_cancelled() {
            Err(AppError::UserCancelled)
        } else {
            Ok(())
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Library entry point, called by `main.rs`.
pub async fn run_from_cli(args: Arc<Cli>, shutdown: CancellationToken) -> AppResult<()> {
    debug!("CLI args: {:?}", args);
    let config = Arc::new(AppConfig::new(&args)?);
    debug!("Loaded config: {:?}", config);
    let client = RobustClient::new(&config)?;

    if let Some(url) = &args.analyse {
        return analyse_source(url, args.pick.as_deref(), &config, client, &shutdown).await;
    }
    run_task(&args, config, client, shutdown).await
}

async fn analyse_source(
    url: &str,
    pick: Option<&str>,
    config: &AppConfig,
    client: RobustClient,
    shutdown: &CancellationToken,
) -> AppResult<()> {
    let extractor = StreamExtractor::new(config, client);
    println!("{} Analysing {}", *symbols::INFO, url);
    let Some(session) = extractor.analyse(CLI_CHAT_ID, url).await else {
        ui::box_message(
            "Unsupported source",
            &["No downloadable tracks were found.", url],
            |s| s.yellow(),
        );
        return Ok(());
    };
    ui::print_session(&session);

    let Some(pick) = pick else {
        return Ok(());
    };
    let (kind, index) = parse_pick(pick)?;
    let path = extractor
        .download_track(CLI_CHAT_ID, kind, index, &config.outbox, shutdown)
        .await?;
    println!("{} Saved {}", *symbols::OK, path.display());
    Ok(())
}

/// `video:0`, `audio:2`, `sub:1`
fn parse_pick(pick: &str) -> AppResult<(TrackKind, usize)> {
    let (kind, index) = pick.split_once(':').ok_or_else(|| {
        AppError::PreconditionUnmet(format!("Invalid --pick '{}', expected KIND:INDEX.", pick))
    })?;
    let index = index.trim().parse::<usize>().map_err(|_| {
        AppError::PreconditionUnmet(format!("Invalid track index '{}' in --pick.", index))
    })?;
    Ok((kind.parse()?, index))
}

async fn run_task(
    args: &Cli,
    config: Arc<AppConfig>,
    client: RobustClient,
    shutdown: CancellationToken,
) -> AppResult<()> {
    let services = Services {
        chat: Arc::new(ConsoleChat::new(config.outbox.clone())),
        downloader: Arc::new(DefaultDownloadManager::new(&config, client)),
        processor: Arc::new(ToolProcessor::new(config.tools.clone())),
        config: config.clone(),
    };
    let coordinator = Arc::new(TaskCoordinator::new(services));

    let watcher = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            if coordinator.cancel("Cancelled by user.") {
                info!("Shutdown requested, cancelling the running task");
            }
        })
    };

    let options = TaskOptions {
        split: !args.no_split,
        convert_video: args.convert,
        ytdl: args.ytdl,
        ytdl_quality: args.quality.clone(),
        ..TaskOptions::default()
    };
    let result = async {
        coordinator.submit(config.owner_id.unwrap_or(CLI_CHAT_ID), &args.source)?;
        ui::print_header(&format!("{} / {}", args.mode, args.task_type));
        coordinator.start(args.mode, args.task_type, options).await
    }
    .await;
    watcher.abort();

    match result? {
        TaskOutcome::Done => {
            println!("{} Files delivered to {}", *symbols::OK, config.outbox.display());
            Ok(())
        }
        TaskOutcome::Cancelled(reason) => Err(AppError::Other(anyhow!("Task stopped: {}", reason))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pick() {
        assert_eq!(parse_pick("video:0").unwrap(), (TrackKind::Video, 0));
        assert_eq!(parse_pick("sub:3").unwrap(), (TrackKind::Subtitle, 3));
        assert!(parse_pick("audio").is_err());
        assert!(parse_pick("audio:x").is_err());
        assert!(parse_pick("chapter:1").is_err());
    }
}
