// src/processing/mod.rs

pub mod split;

use crate::{
    TaskContext,
    config::ToolPaths,
    error::{AppError, AppResult},
    tool::ToolCommand,
    transfer::{Phase, ProgressUpdate},
    utils,
};
use async_trait::async_trait;
use log::{info, warn};
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,3})%").unwrap());

pub struct ArchiveRequest<'a> {
    pub source: &'a Path,
    pub dest_dir: &'a Path,
    /// Archive base name, without extension
    pub name: &'a str,
    /// Split into volumes of this many bytes when the source is larger
    pub volume_size: Option<u64>,
    pub password: Option<&'a str>,
}

/// Archive, extract, convert and split operations used between download and delivery.
#[async_trait]
pub trait PostProcessor: Send + Sync {
    async fn archive(&self, req: &ArchiveRequest<'_>, ctx: &TaskContext) -> AppResult<()>;

    async fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
        password: Option<&str>,
        ctx: &TaskContext,
    ) -> AppResult<()>;

    /// Converts `file` to mp4 in place, returning the resulting path.
    async fn convert_video(&self, file: &Path, ctx: &TaskContext) -> AppResult<PathBuf>;

    /// Size check: files above `part_size` are split into parts under `dest_dir`.
    async fn split_file(
        &self,
        file: &Path,
        dest_dir: &Path,
        part_size: u64,
        ctx: &TaskContext,
    ) -> AppResult<Option<Vec<PathBuf>>> {
        split::split_file(file, dest_dir, part_size, &ctx.progress).await
    }
}

/// Default implementation backed by `7z` and `ffmpeg`.
pub struct ToolProcessor {
    tools: ToolPaths,
}

impl ToolProcessor {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl PostProcessor for ToolProcessor {
    async fn archive(&self, req: &ArchiveRequest<'_>, ctx: &TaskContext) -> AppResult<()> {
        tokio::fs::create_dir_all(req.dest_dir).await?;
        let archive_path = dunce::canonicalize(req.dest_dir)?.join(format!("{}.zip", req.name));
        let (cwd, target) = if req.source.is_dir() {
            (req.source.to_path_buf(), "*".to_string())
        } else {
            let parent = req.source.parent().unwrap_or_else(|| Path::new("."));
            let name = req
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| AppError::SourceNotFound(req.source.display().to_string()))?;
            (parent.to_path_buf(), name)
        };

        let mut cmd = ToolCommand::new(&self.tools.sevenzip).args(["a", "-tzip", "-y", "-bsp1"]);
        if let Some(volume) = req.volume_size
            && utils::get_size(req.source) > volume
        {
            cmd = cmd.arg(format!("-v{}b", volume));
        }
        if let Some(pw) = req.password {
            cmd = cmd.arg(format!("-p{}", pw)).arg("-mem=AES256");
        }
        let cmd = cmd.arg(&archive_path).arg(target).current_dir(&cwd);

        info!("Archiving {} -> {}", req.source.display(), archive_path.display());
        let name = req.name.to_string();
        cmd.run_streaming(&ctx.cancellation_token, |line| {
            if let Some(pct) = parse_percent(line) {
                ctx.progress.push(ProgressUpdate::new(Phase::Compressing, name.clone(), pct, 100));
            }
        })
        .await
    }

    async fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
        password: Option<&str>,
        ctx: &TaskContext,
    ) -> AppResult<()> {
        tokio::fs::create_dir_all(dest_dir).await?;
        let mut cmd = ToolCommand::new(&self.tools.sevenzip)
            .args(["x", "-y", "-bsp1"])
            .arg(format!("-o{}", dest_dir.display()));
        if let Some(pw) = password {
            cmd = cmd.arg(format!("-p{}", pw));
        }
        let cmd = cmd.arg(archive);

        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Extracting {} -> {}", archive.display(), dest_dir.display());
        cmd.run_streaming(&ctx.cancellation_token, |line| {
            if let Some(pct) = parse_percent(line) {
                ctx.progress.push(ProgressUpdate::new(Phase::Extracting, name.clone(), pct, 100));
            }
        })
        .await
        .map_err(|e| classify_extract_error(&name, e))
    }

    async fn convert_video(&self, file: &Path, ctx: &TaskContext) -> AppResult<PathBuf> {
        if utils::lowercase_extension(file) == "mp4" {
            return Ok(file.to_path_buf());
        }
        let out = file.with_extension("mp4");
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ctx.progress.push(ProgressUpdate::new(Phase::Converting, name, 0, 0));

        ToolCommand::new(&self.tools.ffmpeg)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(file)
            .args(["-map", "0:v?", "-map", "0:a?", "-c", "copy", "-movflags", "+faststart"])
            .arg(&out)
            .run_streaming(&ctx.cancellation_token, |_| {})
            .await?;

        if let Err(e) = tokio::fs::remove_file(file).await {
            warn!("Converted {} but could not remove the original: {}", file.display(), e);
        }
        Ok(out)
    }
}

fn parse_percent(line: &str) -> Option<u64> {
    PERCENT_RE
        .captures_iter(line)
        .last()
        .and_then(|c| c[1].parse::<u64>().ok())
        .filter(|p| *p <= 100)
}

fn classify_extract_error(name: &str, err: AppError) -> AppError {
    match err {
        AppError::ToolFailed { stderr, .. }
            if ["Wrong password", "Can not open the file as archive", "CRC Failed", "Data Error", "Unexpected end of archive"]
                .iter()
                .any(|needle| stderr.contains(needle)) =>
        {
            AppError::ArchiveCorrupt(name.to_string())
        }
        AppError::ToolFailed { stderr, status, .. } => {
            AppError::ExtractFailed(format!("{} ({}): {}", name, status, stderr))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent_takes_last_value() {
        assert_eq!(parse_percent("  5% 12 + file"), Some(5));
        assert_eq!(parse_percent(" 10% 34% - a.mkv"), Some(34));
        assert_eq!(parse_percent("Everything is Ok"), None);
    }

    #[test]
    fn test_extract_error_classification() {
        let corrupt = AppError::ToolFailed {
            tool: "7z".into(),
            status: "exit status: 2".into(),
            stderr: "ERROR: Wrong password : a.txt".into(),
        };
        assert!(matches!(classify_extract_error("a.zip", corrupt), AppError::ArchiveCorrupt(_)));

        let other = AppError::ToolFailed {
            tool: "7z".into(),
            status: "exit status: 7".into(),
            stderr: "Command line error".into(),
        };
        assert!(matches!(classify_extract_error("a.zip", other), AppError::ExtractFailed(_)));
        assert!(matches!(
            classify_extract_error("a.zip", AppError::UserCancelled),
            AppError::UserCancelled
        ));
    }
}
