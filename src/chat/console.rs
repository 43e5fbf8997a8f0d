// src/chat/console.rs

use super::ChatSurface;
use crate::{
    error::{AppError, AppResult},
    symbols, ui,
};
use async_trait::async_trait;
use colored::*;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Terminal stand-in for the chat: status edits are printed, uploads land in `outbox`.
pub struct ConsoleChat {
    outbox: PathBuf,
}

impl ConsoleChat {
    pub fn new(outbox: PathBuf) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl ChatSurface for ConsoleChat {
    async fn edit_status(&self, text: &str) -> AppResult<()> {
        ui::print_status(&ui::strip_markup(text));
        Ok(())
    }

    async fn send_message(&self, text: &str) -> AppResult<()> {
        let lines: Vec<String> = ui::strip_markup(text).lines().map(str::to_string).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        ui::box_message("Message", &refs, |s| s.cyan());
        Ok(())
    }

    async fn upload_file(
        &self,
        path: &Path,
        caption: &str,
        thumbnail: Option<&Path>,
        is_last: bool,
    ) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.outbox).await?;
        let name = path
            .file_name()
            .ok_or_else(|| AppError::UploadFailed(format!("'{}' has no file name", path.display())))?;
        let dest = self.outbox.join(name);
        tokio::fs::copy(path, &dest)
            .await
            .map_err(|e| AppError::UploadFailed(format!("{}: {}", path.display(), e)))?;
        info!("Delivered {} -> {}", path.display(), dest.display());
        if let Some(thumb) = thumbnail {
            debug!("Cover for {}: {}", path.display(), thumb.display());
        }
        println!(
            "{} {} {}",
            *symbols::OK,
            ui::strip_markup(caption).green(),
            if is_last { "(last)".dimmed() } else { "".normal() }
        );
        Ok(())
    }
}
