// src/config.rs

pub mod file;

use self::file::load_or_create_external_config;
use crate::{cli::Cli, constants, error::AppResult};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    pub work_dir: Option<PathBuf>,
    pub outbox: Option<PathBuf>,
    pub mounted_drive: Option<PathBuf>,
    pub mirror_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransferConfig {
    pub split_size_mb: Option<u64>,
    pub progress_interval_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
}

/// External binaries. Each one can be overridden by an environment variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub ytdlp: String,
    pub aria2c: String,
    pub sevenzip: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
            ytdlp: "yt-dlp".into(),
            aria2c: "aria2c".into(),
            sevenzip: "7z".into(),
        }
    }
}

impl ToolPaths {
    fn with_env_overrides(mut self) -> Self {
        let overrides: [(&str, &mut String); 5] = [
            ("FFMPEG_PATH", &mut self.ffmpeg),
            ("FFPROBE_PATH", &mut self.ffprobe),
            ("YTDLP_PATH", &mut self.ytdlp),
            ("ARIA2C_PATH", &mut self.aria2c),
            ("SEVENZIP_PATH", &mut self.sevenzip),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) && !value.is_empty() {
                *slot = value;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub tools: ToolPaths,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        Self {
            owner_id: None,
            network: NetworkConfig {
                connect_timeout_secs: Some(10),
                timeout_secs: Some(300),
                max_retries: Some(3),
            },
            paths: PathsConfig {
                work_dir: Some(PathBuf::from(constants::DEFAULT_WORK_DIR)),
                outbox: Some(PathBuf::from(constants::DEFAULT_OUTBOX_DIR)),
                mounted_drive: Some(PathBuf::from(constants::DEFAULT_MOUNTED_DRIVE)),
                mirror_dir: Some(PathBuf::from(constants::DEFAULT_MIRROR_DIR)),
            },
            transfer: TransferConfig {
                split_size_mb: Some(constants::DEFAULT_SPLIT_SIZE / (1024 * 1024)),
                progress_interval_secs: Some(constants::DEFAULT_PROGRESS_INTERVAL_SECS),
                probe_timeout_secs: Some(constants::DEFAULT_PROBE_TIMEOUT_SECS),
            },
            tools: ToolPaths::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub work_root: PathBuf,
    pub outbox: PathBuf,
    pub mounted_drive: PathBuf,
    pub mirror_dir: PathBuf,
    pub split_size: u64,
    pub progress_interval: Duration,
    pub probe_timeout: Duration,
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Idle limit between body reads. Metadata requests use it as a whole-request limit.
    pub timeout: Duration,
    pub max_retries: u32,
    pub owner_id: Option<i64>,
    pub tools: ToolPaths,
}

impl AppConfig {
    pub fn new(args: &Cli) -> AppResult<Self> {
        let external = load_or_create_external_config()?;
        let (owner_id, owner_source) = file::resolve_owner(args.owner, &external);
        log::info!("Owner id resolved from {}", owner_source);

        Ok(Self {
            work_root: args
                .work_dir
                .clone()
                .or(external.paths.work_dir)
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_WORK_DIR)),
            outbox: args
                .outbox
                .clone()
                .or(external.paths.outbox)
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_OUTBOX_DIR)),
            mounted_drive: external
                .paths
                .mounted_drive
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_MOUNTED_DRIVE)),
            mirror_dir: external
                .paths
                .mirror_dir
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_MIRROR_DIR)),
            split_size: external
                .transfer
                .split_size_mb
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(constants::DEFAULT_SPLIT_SIZE),
            progress_interval: Duration::from_secs(
                external
                    .transfer
                    .progress_interval_secs
                    .unwrap_or(constants::DEFAULT_PROGRESS_INTERVAL_SECS),
            ),
            probe_timeout: Duration::from_secs(
                external
                    .transfer
                    .probe_timeout_secs
                    .unwrap_or(constants::DEFAULT_PROBE_TIMEOUT_SECS),
            ),
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(external.network.connect_timeout_secs.unwrap_or(10)),
            timeout: Duration::from_secs(external.network.timeout_secs.unwrap_or(300)),
            max_retries: external.network.max_retries.unwrap_or(3),
            owner_id,
            tools: external.tools.with_env_overrides(),
        })
    }

    pub fn work_paths(&self) -> WorkPaths {
        WorkPaths::new(&self.work_root)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for AppConfig {
    fn default() -> Self {
        let root = std::env::temp_dir().join("tg-leech-test");
        Self {
            work_root: root.join("work"),
            outbox: root.join("outbox"),
            mounted_drive: root.join("drive"),
            mirror_dir: root.join("drive").join("mirror"),
            split_size: constants::DEFAULT_SPLIT_SIZE,
            progress_interval: Duration::from_millis(50),
            probe_timeout: Duration::from_secs(5),
            user_agent: "test-agent/1.0".to_string(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(15),
            max_retries: 1,
            owner_id: Some(1),
            tools: ToolPaths::default(),
        }
    }
}

/// Per-task directory layout under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPaths {
    pub root: PathBuf,
    pub downloads: PathBuf,
    pub zip: PathBuf,
    pub unzip: PathBuf,
    pub split: PathBuf,
    pub thumbnails: PathBuf,
    pub files: PathBuf,
    pub dir_leech: PathBuf,
}

impl WorkPaths {
    pub fn new(root: &Path) -> Self {
        use constants::dirs;
        Self {
            root: root.to_path_buf(),
            downloads: root.join(dirs::DOWNLOADS),
            zip: root.join(dirs::ZIP),
            unzip: root.join(dirs::UNZIP),
            split: root.join(dirs::SPLIT),
            thumbnails: root.join(dirs::THUMBNAILS),
            files: root.join(dirs::FILES),
            dir_leech: root.join(dirs::DIR_LEECH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_paths_layout() {
        let paths = WorkPaths::new(Path::new("/tmp/w"));
        assert_eq!(paths.downloads, PathBuf::from("/tmp/w/Downloads"));
        assert_eq!(paths.zip, PathBuf::from("/tmp/w/zip"));
        assert!(paths.split.starts_with(&paths.root));
    }

    #[test]
    fn test_external_config_roundtrip_with_missing_sections() {
        let cfg: ExternalConfig = serde_json::from_str(r#"{"owner_id": 42}"#).unwrap();
        assert_eq!(cfg.owner_id, Some(42));
        assert_eq!(cfg.tools, ToolPaths::default());
        assert!(cfg.paths.work_dir.is_none());
    }
}
