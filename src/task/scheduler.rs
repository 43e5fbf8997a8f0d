// src/task/scheduler.rs

use super::handler::Handler;
use crate::{
    TaskContext, constants,
    error::{AppError, AppResult},
    models::{TaskMode, TaskType},
    transfer::{Phase, ProgressUpdate},
    utils,
};
use anyhow::anyhow;
use chrono::Local;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Runs one task: prepare, download, process, deliver.
pub struct TaskScheduler {
    ctx: TaskContext,
    handler: Handler,
}

impl TaskScheduler {
    pub fn new(ctx: TaskContext) -> Self {
        Self {
            handler: Handler::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn run_task(&self) -> AppResult<()> {
        let ctx = &self.ctx;
        let task = &ctx.task;
        ctx.transfer.reset();
        ctx.set_download_name(String::new());

        if task.mode == TaskMode::DirLeech {
            for source in &task.sources {
                if !Path::new(source).exists() {
                    return Err(AppError::SourceNotFound(source.clone()));
                }
            }
        }
        if task.mode == TaskMode::Mirror && !ctx.config.mounted_drive.exists() {
            return Err(AppError::PreconditionUnmet(constants::MIRROR_NOT_MOUNTED.to_string()));
        }

        self.prepare_work_dir().await?;

        let first = task
            .sources
            .first()
            .ok_or_else(|| AppError::Other(anyhow!("task has no sources")))?;
        let name = match &task.options.custom_name {
            Some(custom) => custom.clone(),
            None if task.mode == TaskMode::DirLeech => Path::new(first)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| constants::UNKNOWN_DOWNLOAD_NAME.to_string()),
            None => ctx.downloader.display_name(first, ctx).await,
        };
        info!("Task name: {}", name);
        ctx.set_download_name(name.clone());

        if task.mode == TaskMode::DirLeech {
            ctx.transfer
                .set_total_size(task.sources.iter().map(|s| utils::get_size(Path::new(s))).sum());
            self.dir_leech().await?;
        } else {
            ctx.downloader.cal_down_size(&task.sources, ctx).await?;
            let download_dir = match task.task_type {
                TaskType::Zip => ctx.paths.downloads.join(utils::sanitize_filename(&name)),
                _ => ctx.paths.downloads.clone(),
            };
            self.download(&download_dir).await?;
            match task.mode {
                TaskMode::Mirror => self.mirror(&download_dir).await?,
                _ => self.leech(&download_dir, true).await?,
            }
        }

        self.handler.send_logs().await
    }

    /// Wipes and recreates the work tree so nothing leaks between tasks.
    async fn prepare_work_dir(&self) -> AppResult<()> {
        let paths = &self.ctx.paths;
        utils::remove_path(&paths.root)?;
        for dir in [&paths.root, &paths.downloads, &paths.thumbnails] {
            tokio::fs::create_dir_all(dir).await?;
        }
        debug!("Work dir ready at {}", paths.root.display());
        Ok(())
    }

    async fn download(&self, dest: &Path) -> AppResult<()> {
        let ctx = &self.ctx;
        ctx.progress.push(ProgressUpdate::new(
            Phase::Downloading,
            ctx.download_name(),
            0,
            ctx.transfer.total_size(),
        ));
        ctx.downloader
            .download_all(&ctx.task.sources, ctx.task.options.ytdl, dest, ctx)
            .await?;
        if ctx.task.task_type == TaskType::Normal {
            self.apply_custom_name(dest).await?;
        }
        Ok(())
    }

    /// Renames the only downloaded entry to the user's custom name.
    async fn apply_custom_name(&self, dir: &Path) -> AppResult<()> {
        let Some(custom) = self.ctx.task.options.custom_name.as_deref() else {
            return Ok(());
        };
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            found.push(entry.path());
        }
        match found.as_slice() {
            [only] => {
                let target = dir.join(utils::sanitize_filename(custom));
                if *only != target {
                    tokio::fs::rename(only, &target).await?;
                    info!("Renamed {} -> {}", only.display(), target.display());
                }
            }
            _ => debug!("Custom name ignored: {} entries downloaded", found.len()),
        }
        Ok(())
    }

    /// Applies the task type to `src`, then uploads. `remove_source` is false
    /// only for the user's own directories.
    async fn leech(&self, src: &Path, remove_source: bool) -> AppResult<()> {
        let split = self.ctx.task.options.split;
        let ready = self.process(src, split, remove_source).await?;
        let owned = ready != src || remove_source;
        self.handler.leech(&ready, owned).await
    }

    /// The type-specific step shared by leech and mirror. Returns the directory
    /// holding the deliverable files.
    async fn process(&self, src: &Path, split: bool, remove_source: bool) -> AppResult<PathBuf> {
        let handler = &self.handler;
        match self.ctx.task.task_type {
            TaskType::Normal => Ok(src.to_path_buf()),
            TaskType::Zip => handler.zip(src, split, remove_source).await,
            TaskType::Unzip => handler.unzip(src, remove_source).await,
            TaskType::Undzip => {
                let extracted = handler.unzip(src, false).await?;
                let zipped = handler.zip(&extracted, split, true).await?;
                // the original goes only once the new archive exists
                if remove_source {
                    utils::remove_path(src)?;
                }
                Ok(zipped)
            }
        }
    }

    async fn mirror(&self, src: &Path) -> AppResult<()> {
        let ctx = &self.ctx;
        let ready = self.process(src, false, true).await?;
        let folder = Local::now().format(constants::MIRROR_FOLDER_FORMAT).to_string();
        let dest = ctx.config.mirror_dir.join(folder);
        info!("Mirroring {} -> {}", ready.display(), dest.display());

        let files = utils::list_files_natural(&ready)?;
        let (from, to) = (ready.clone(), dest.clone());
        tokio::task::spawn_blocking(move || utils::copy_tree(&from, &to))
            .await
            .map_err(|e| AppError::Other(anyhow!("mirror copy task failed: {}", e)))??;
        for file in &files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ctx.transfer.record_upload(utils::get_size(file), &name);
        }
        Ok(())
    }

    /// Local sources: plain files are copied into staging and processed from
    /// there, directories are processed in place and kept.
    async fn dir_leech(&self) -> AppResult<()> {
        let ctx = &self.ctx;
        for source in &ctx.task.sources {
            ctx.ensure_not_cancelled()?;
            let path = Path::new(source);
            if path.is_file() {
                let staging = &ctx.paths.dir_leech;
                utils::remove_path(staging)?;
                utils::copy_tree(path, staging)?;
                self.leech(staging, true).await?;
            } else {
                self.leech(path, false).await?;
            }
        }
        Ok(())
    }
}
