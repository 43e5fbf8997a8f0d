// src/downloader/aria2.rs

use crate::{
    TaskContext,
    error::AppResult,
    tool::ToolCommand,
    transfer::{Phase, ProgressUpdate},
};
use log::info;
use regex::Regex;
use std::{path::Path, sync::LazyLock};
use url::Url;

/// `[#2089b0 400.0KiB/33.2MiB(1%) CN:1 DL:115.7KiB ETA:4m51s]`
static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[#\w+\s+([\d.]+)([KMGT]?i?B)/([\d.]+)([KMGT]?i?B)\((\d+)%\)").unwrap()
});

pub(super) struct Aria2Backend {
    program: String,
}

impl Aria2Backend {
    pub(super) fn new(program: String) -> Self {
        Self { program }
    }

    pub(super) async fn download(&self, source: &str, dest_dir: &Path, ctx: &TaskContext) -> AppResult<()> {
        let name = torrent_display_name(source).unwrap_or_else(|| "torrent".to_string());
        info!("aria2c download {}", source);
        ToolCommand::new(&self.program)
            .args([
                "--seed-time=0",
                "--summary-interval=1",
                "--console-log-level=warn",
                "--follow-torrent=mem",
                "--bt-save-metadata=false",
                "--file-allocation=none",
            ])
            .arg("--dir")
            .arg(dest_dir)
            .arg(source)
            .run_streaming(&ctx.cancellation_token, |line| {
                if let Some((done, total)) = parse_summary(line) {
                    ctx.progress
                        .push(ProgressUpdate::new(Phase::Downloading, name.clone(), done, total));
                }
            })
            .await
    }
}

/// `dn=` of a magnet link, or the file stem of a `.torrent` URL.
pub(super) fn torrent_display_name(source: &str) -> Option<String> {
    let url = Url::parse(source).ok()?;
    if url.scheme() == "magnet" {
        return url
            .query_pairs()
            .find(|(k, _)| k == "dn")
            .map(|(_, v)| v.into_owned());
    }
    let last = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_encoding::percent_decode_str(last).decode_utf8_lossy();
    Some(decoded.trim_end_matches(".torrent").to_string())
}

fn to_bytes(value: &str, unit: &str) -> u64 {
    let v: f64 = value.parse().unwrap_or(0.0);
    let mult = match unit.chars().next() {
        Some('K') => 1024f64,
        Some('M') => 1024f64.powi(2),
        Some('G') => 1024f64.powi(3),
        Some('T') => 1024f64.powi(4),
        _ => 1.0,
    };
    (v * mult) as u64
}

fn parse_summary(line: &str) -> Option<(u64, u64)> {
    let caps = SUMMARY_RE.captures(line)?;
    Some((to_bytes(&caps[1], &caps[2]), to_bytes(&caps[3], &caps[4])))
}
