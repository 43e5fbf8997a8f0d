// src/models/mod.rs

pub mod media;
pub mod track;

use crate::utils;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// Where the processed result ends up.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskMode {
    /// Download then upload to the chat
    Leech,
    /// Download then copy to the mounted mirror destination
    Mirror,
    /// Upload local paths that already exist on disk
    #[value(name = "dir-leech")]
    DirLeech,
}

/// Post-processing applied between download and delivery.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Normal,
    Zip,
    Unzip,
    /// Extract, then re-archive the extracted content
    Undzip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    /// Sources accepted, waiting for a mode/type choice
    Started,
    Running,
    Cancelled,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStyle {
    Plain,
    Bold,
    Italic,
    #[default]
    Mono,
}

impl CaptionStyle {
    /// Wraps a file name in the chat's HTML markup for this style.
    pub fn render(&self, name: &str) -> String {
        match self {
            CaptionStyle::Plain => name.to_string(),
            CaptionStyle::Bold => format!("<b>{}</b>", name),
            CaptionStyle::Italic => format!("<i>{}</i>", name),
            CaptionStyle::Mono => format!("<code>{}</code>", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskOptions {
    pub custom_name: Option<String>,
    pub zip_password: Option<String>,
    pub unzip_password: Option<String>,
    pub thumbnail: Option<PathBuf>,
    pub caption_style: CaptionStyle,
    pub split: bool,
    pub convert_video: bool,
    /// Send every source through the streaming-site extractor
    pub ytdl: bool,
    pub ytdl_quality: String,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            custom_name: None,
            zip_password: None,
            unzip_password: None,
            thumbnail: None,
            caption_style: CaptionStyle::default(),
            split: true,
            convert_video: false,
            ytdl: false,
            ytdl_quality: "best".to_string(),
        }
    }
}

/// One download → process → deliver request.
#[derive(Debug, Clone)]
pub struct Task {
    pub sources: Vec<String>,
    pub mode: TaskMode,
    pub task_type: TaskType,
    pub options: TaskOptions,
}

impl Task {
    /// Builds a task from the raw lines a user sent, pulling `[name]`, `{zip pw}`
    /// and `(unzip pw)` directives out of the source list.
    pub fn from_raw_sources(
        raw: &[String],
        mode: TaskMode,
        task_type: TaskType,
        mut options: TaskOptions,
    ) -> Self {
        let parsed = utils::parse_source_directives(raw);
        if parsed.custom_name.is_some() {
            options.custom_name = parsed.custom_name;
        }
        if parsed.zip_password.is_some() {
            options.zip_password = parsed.zip_password;
        }
        if parsed.unzip_password.is_some() {
            options.unzip_password = parsed.unzip_password;
        }
        Self {
            sources: parsed.sources,
            mode,
            task_type,
            options,
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskMode::Leech => "Leech",
            TaskMode::Mirror => "Mirror",
            TaskMode::DirLeech => "Dir-Leech",
        };
        f.write_str(s)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Normal => "Normal",
            TaskType::Zip => "Zip",
            TaskType::Unzip => "Unzip",
            TaskType::Undzip => "Undzip",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_are_stripped_from_sources() {
        let raw = vec![
            "magnet:?xt=urn:btih:abc".to_string(),
            "[My Show.mkv]".to_string(),
            "{zippw}".to_string(),
            "(unzippw)".to_string(),
        ];
        let task = Task::from_raw_sources(&raw, TaskMode::Leech, TaskType::Normal, TaskOptions::default());
        assert_eq!(task.sources, vec!["magnet:?xt=urn:btih:abc".to_string()]);
        assert_eq!(task.options.custom_name.as_deref(), Some("My Show.mkv"));
        assert_eq!(task.options.zip_password.as_deref(), Some("zippw"));
        assert_eq!(task.options.unzip_password.as_deref(), Some("unzippw"));
    }

    #[test]
    fn test_caption_style_render() {
        assert_eq!(CaptionStyle::Mono.render("a.mkv"), "<code>a.mkv</code>");
        assert_eq!(CaptionStyle::Plain.render("a.mkv"), "a.mkv");
    }
}
