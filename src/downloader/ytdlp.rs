// src/downloader/ytdlp.rs

use crate::{
    TaskContext,
    constants::ytdl,
    error::AppResult,
    models::media::PlatformInfo,
    tool::ToolCommand,
    transfer::{Phase, ProgressUpdate},
};
use log::{info, warn};
use regex::Regex;
use std::{path::Path, sync::LazyLock, time::Duration};

/// Matches the line printed by our `--progress-template`.
static PROGRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[dl\]\s+(\d+|NA)\s+(\d+(?:\.\d+)?|NA)\s+(.*)$").unwrap());

const PROGRESS_TEMPLATE: &str =
    "download:[dl] %(progress.downloaded_bytes)s %(progress.total_bytes,progress.total_bytes_estimate)s %(info.title)s";

/// yt-dlp format selector for a quality preset name. Unknown names are passed through.
pub fn format_preset(quality: &str) -> &str {
    ytdl::FORMAT_PRESETS
        .iter()
        .find(|(name, _)| *name == quality)
        .map(|(_, selector)| *selector)
        .unwrap_or(quality)
}

pub(super) struct YtDlpBackend {
    program: String,
    probe_timeout: Duration,
}

impl YtDlpBackend {
    pub(super) fn new(program: String, probe_timeout: Duration) -> Self {
        Self {
            program,
            probe_timeout,
        }
    }

    /// Title of a video, or `title (N videos)` for playlists.
    pub(super) async fn title(&self, url: &str) -> AppResult<String> {
        let json = ToolCommand::new(&self.program)
            .args(["-J", "--flat-playlist", "--no-warnings"])
            .arg(url)
            .output(Some(self.probe_timeout))
            .await?;
        let info: PlatformInfo = serde_json::from_str(&json)?;
        let title = info.title.unwrap_or_default();
        Ok(match (info.kind.as_deref(), info.entries) {
            (Some("playlist"), Some(entries)) => format!("{} ({} videos)", title, entries.len()),
            _ => title,
        })
    }

    pub(super) async fn download(&self, url: &str, dest_dir: &Path, ctx: &TaskContext) -> AppResult<()> {
        let quality = ctx.task.options.ytdl_quality.as_str();
        let output = dest_dir.join(ytdl::OUTPUT_TEMPLATE);
        // same stem as the media file so the uploader can pair them
        let thumbs = ctx.paths.thumbnails.join(ytdl::OUTPUT_TEMPLATE);

        let mut cmd = ToolCommand::new(&self.program)
            .args(["--newline", "--no-warnings", "--progress-template", PROGRESS_TEMPLATE])
            .args(["-f", format_preset(quality)])
            .arg("--write-thumbnail")
            .arg("-o")
            .arg(format!("thumbnail:{}", thumbs.display()))
            .arg("-o")
            .arg(&output);
        if quality == "audio_only" {
            cmd = cmd.args(["-x", "--audio-format", "mp3"]);
        } else {
            cmd = cmd.args([
                "--write-subs",
                "--write-auto-subs",
                "--sub-langs",
                "en.*",
                "--convert-subs",
                "srt",
                "--remux-video",
                "mp4",
            ]);
        }
        let cmd = cmd.arg(url);

        info!("yt-dlp download {} (quality {})", url, quality);
        cmd.run_streaming(&ctx.cancellation_token, |line| match parse_progress(line) {
            Some(update) => ctx.progress.push(update),
            None if line.starts_with("ERROR") => warn!("yt-dlp: {}", line),
            None => {}
        })
        .await
    }
}

fn parse_progress(line: &str) -> Option<ProgressUpdate> {
    let caps = PROGRESS_RE.captures(line)?;
    let done = caps[1].parse::<u64>().unwrap_or(0);
    let total = caps[2].parse::<f64>().map(|t| t as u64).unwrap_or(0);
    Some(ProgressUpdate::new(Phase::Downloading, caps[3].trim(), done, total))
}
