// src/chat/mod.rs

mod console;

pub use console::ConsoleChat;

use crate::error::AppResult;
use async_trait::async_trait;
use std::path::Path;

/// Where status edits, notices and uploads go.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Replaces the text of the task's status message.
    async fn edit_status(&self, text: &str) -> AppResult<()>;

    /// Sends a new message to the owner.
    async fn send_message(&self, text: &str) -> AppResult<()>;

    /// Delivers one file, with an optional cover image.
    /// `is_last` is set only for the final item of the upload queue.
    async fn upload_file(
        &self,
        path: &Path,
        caption: &str,
        thumbnail: Option<&Path>,
        is_last: bool,
    ) -> AppResult<()>;
}
