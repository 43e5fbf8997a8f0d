// src/task/handler.rs

use super::progress;
use crate::{
    TaskContext, constants,
    error::{AppError, AppResult},
    models::TaskMode,
    processing::ArchiveRequest,
    transfer::{Phase, ProgressUpdate},
    utils,
};
use log::{debug, error, info, warn};
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// `name.NNN` or `name.zNN`, captured as stem plus volume number.
static VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+)\.(?:(\d{3})|z(\d{2}))$").unwrap());

/// One leeched file after the size check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueuedFile {
    Single(PathBuf),
    /// Parts produced by the splitter, in order
    Split(Vec<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub path: PathBuf,
    /// 0-based position in the flattened queue
    pub index: usize,
    pub total: usize,
    pub is_last: bool,
    pub is_part: bool,
}

/// Flattens split files into individual uploads so `is_last` marks the true final chunk.
pub fn build_upload_queue(files: &[QueuedFile]) -> Vec<UploadItem> {
    let flat: Vec<(PathBuf, bool)> = files
        .iter()
        .flat_map(|f| match f {
            QueuedFile::Single(p) => vec![(p.clone(), false)],
            QueuedFile::Split(parts) => parts.iter().map(|p| (p.clone(), true)).collect(),
        })
        .collect();
    let total = flat.len();
    flat.into_iter()
        .enumerate()
        .map(|(index, (path, is_part))| UploadItem {
            path,
            index,
            total,
            is_last: index + 1 == total,
            is_part,
        })
        .collect()
}

/// Pipeline phases of the running task.
pub struct Handler {
    ctx: TaskContext,
}

impl Handler {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }

    /// Uploads every file under `path` in natural order.
    pub async fn leech(&self, path: &Path, remove_source: bool) -> AppResult<()> {
        let ctx = &self.ctx;
        let mut files = utils::list_files_natural(path)?;
        // conversion replaces the original, so only on files we own
        if ctx.task.options.convert_video && remove_source {
            for file in files.iter_mut().filter(|f| utils::is_video(f)) {
                ctx.ensure_not_cancelled()?;
                *file = ctx.processor.convert_video(file, ctx).await?;
            }
            files.sort_by(|a, b| utils::natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
        }
        ctx.transfer.set_total_size(files.iter().map(|f| utils::get_size(f)).sum());

        let split = ctx.task.options.split && ctx.task.mode != TaskMode::Mirror;
        let mut queued = Vec::with_capacity(files.len());
        for file in files {
            ctx.ensure_not_cancelled()?;
            let parts = if split {
                ctx.processor
                    .split_file(&file, &ctx.paths.split, ctx.config.split_size, ctx)
                    .await?
            } else {
                None
            };
            queued.push(match parts {
                Some(parts) => {
                    if remove_source {
                        utils::remove_path(&file)?;
                    }
                    QueuedFile::Split(parts)
                }
                None => QueuedFile::Single(file),
            });
        }

        let queue = build_upload_queue(&queued);
        info!("Uploading {} item(s) from {}", queue.len(), path.display());
        for item in &queue {
            ctx.ensure_not_cancelled()?;
            self.upload(item, remove_source).await?;
        }

        if remove_source && let Err(e) = utils::remove_path(path) {
            warn!("Could not remove {}: {}", path.display(), e);
        }
        for staging in [&ctx.paths.thumbnails, &ctx.paths.split] {
            if let Err(e) = utils::remove_path(staging) {
                debug!("Staging cleanup of {} failed: {}", staging.display(), e);
            }
        }
        Ok(())
    }

    async fn upload(&self, item: &UploadItem, remove_source: bool) -> AppResult<()> {
        let ctx = &self.ctx;
        let owned = remove_source || item.is_part;
        // renaming in place is only safe on files we own
        let path = if owned {
            utils::short_file_name(&item.path)?
        } else {
            item.path.clone()
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = utils::get_size(&path);
        let thumbnail = self.thumbnail_for(&item.path, item.is_part);
        let caption = ctx.task.options.caption_style.render(&utils::truncate_text(
            &name,
            constants::FILENAME_TRUNCATE_LENGTH,
        ));

        ctx.progress.push(ProgressUpdate::new(
            Phase::Uploading {
                index: item.index + 1,
                total: item.total,
            },
            name.clone(),
            0,
            size,
        ));
        ctx.chat
            .upload_file(&path, &caption, thumbnail.as_deref(), item.is_last)
            .await
            .map_err(|e| match e {
                AppError::UploadFailed(_) | AppError::UserCancelled => e,
                other => AppError::UploadFailed(format!("{}: {}", name, other)),
            })?;
        ctx.transfer.record_upload(size, &name);

        if owned {
            utils::remove_path(&path)?;
        }
        Ok(())
    }

    /// The user's cover if it exists, else a staged one sharing the file's stem.
    fn thumbnail_for(&self, file: &Path, is_part: bool) -> Option<PathBuf> {
        let ctx = &self.ctx;
        if let Some(custom) = &ctx.task.options.thumbnail {
            if custom.is_file() {
                return Some(custom.clone());
            }
            warn!("Thumbnail {} not found, ignoring it", custom.display());
        }
        staged_thumbnail(&ctx.paths.thumbnails, file, is_part)
    }

    /// Archives `path` into the compression staging dir and returns that dir.
    pub async fn zip(&self, path: &Path, split: bool, remove_source: bool) -> AppResult<PathBuf> {
        let ctx = &self.ctx;
        let name = archive_name(&ctx.download_name());
        ctx.progress
            .push(ProgressUpdate::new(Phase::Compressing, name.clone(), 0, 100));
        let request = ArchiveRequest {
            source: path,
            dest_dir: &ctx.paths.zip,
            name: &name,
            volume_size: split.then_some(ctx.config.split_size),
            password: ctx.task.options.zip_password.as_deref(),
        };
        ctx.processor.archive(&request, ctx).await?;
        ctx.transfer.set_total_size(utils::get_size(&ctx.paths.zip));

        if remove_source {
            utils::remove_path(path)?;
        }
        Ok(ctx.paths.zip.clone())
    }

    /// Extracts every archive under `path` into the extraction staging dir and
    /// copies everything else through unchanged. Returns the staging dir.
    pub async fn unzip(&self, path: &Path, remove_source: bool) -> AppResult<PathBuf> {
        let ctx = &self.ctx;
        let out_root = ctx.paths.unzip.clone();
        tokio::fs::create_dir_all(&out_root).await?;

        for file in utils::list_files_natural(path)? {
            ctx.ensure_not_cancelled()?;
            let relative = file.strip_prefix(path).ok().filter(|r| !r.as_os_str().is_empty());
            let dest_dir = relative
                .and_then(Path::parent)
                .map(|parent| out_root.join(parent))
                .unwrap_or_else(|| out_root.clone());

            if is_continuation_volume(&file) {
                debug!("Skipping continuation volume {}", file.display());
                continue;
            }
            if utils::is_archive(&file) {
                ctx.processor
                    .extract(&file, &dest_dir, ctx.task.options.unzip_password.as_deref(), ctx)
                    .await?;
            } else {
                tokio::fs::create_dir_all(&dest_dir).await?;
                let name = file.file_name().ok_or_else(|| {
                    AppError::ExtractFailed(format!("'{}' has no file name", file.display()))
                })?;
                tokio::fs::copy(&file, dest_dir.join(name)).await?;
            }
        }

        if remove_source {
            utils::remove_path(path)?;
        }
        ctx.transfer.set_total_size(utils::get_size(&out_root));
        Ok(out_root)
    }

    /// Stops the running task, wipes the work tree and tells the user why.
    /// Never fails: cleanup and notification problems are only logged.
    pub async fn cancel(&self, reason: &str) {
        let ctx = &self.ctx;
        ctx.cancellation_token.cancel();
        if let Err(e) = utils::remove_path(&ctx.paths.root) {
            error!("Could not remove work dir {}: {}", ctx.paths.root.display(), e);
        }
        if !ctx.slot.mark_cancelled() {
            debug!("Cancel requested with no running task");
        }

        let text = progress::render_cancelled(reason, ctx.elapsed());
        if let Err(e) = ctx.chat.edit_status(&text).await {
            warn!("Status edit failed ({}), sending a new message", e);
            if let Err(e) = ctx.chat.send_message(&text).await {
                error!("Could not report cancellation: {}", e);
            }
        }
    }

    /// Ends a successful task: clears the running flag, reports totals, removes the work tree.
    pub async fn send_logs(&self) -> AppResult<()> {
        let ctx = &self.ctx;
        ctx.slot.finish();
        let snapshot = ctx.transfer.snapshot();
        let text = progress::render_completed(
            &ctx.download_name(),
            snapshot.sent_file_names.len(),
            snapshot.uploaded(),
            ctx.elapsed(),
        );
        if let Err(e) = ctx.chat.send_message(&text).await {
            warn!("Completion message failed: {}", e);
        }
        if let Err(e) = utils::remove_path(&ctx.paths.root) {
            warn!("Could not remove work dir {}: {}", ctx.paths.root.display(), e);
        }
        info!(
            "Task finished: {} file(s), {} bytes",
            snapshot.sent_file_names.len(),
            snapshot.uploaded()
        );
        Ok(())
    }
}

/// A later volume whose first volume sits beside it and pulls it in on extraction.
fn is_continuation_volume(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return false;
    };
    let Some(caps) = VOLUME_RE.captures(&name) else {
        return false;
    };
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = &caps[1];
    match caps.get(2) {
        Some(number) => number.as_str() != "001" && dir.join(format!("{}.001", stem)).is_file(),
        None => dir.join(format!("{}.zip", stem)).is_file(),
    }
}

/// Image in `dir` whose stem matches the media file. Split parts match their source file.
fn staged_thumbnail(dir: &Path, file: &Path, is_part: bool) -> Option<PathBuf> {
    let source = if is_part { Path::new(file.file_stem()?) } else { file };
    let stem = source.file_stem()?;
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .find(|p| {
            p.file_stem() == Some(stem)
                && constants::THUMBNAIL_EXTENSIONS.contains(&utils::lowercase_extension(p).as_str())
        })
}

/// Archive base name: the task name without a trailing `.zip`.
fn archive_name(download_name: &str) -> String {
    let trimmed = download_name.trim();
    let base = if trimmed.to_ascii_lowercase().ends_with(".zip") {
        &trimmed[..trimmed.len() - 4]
    } else {
        trimmed
    };
    if base.is_empty() {
        "archive".to_string()
    } else {
        utils::sanitize_filename(base)
    }
}
