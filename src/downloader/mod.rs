// src/downloader/mod.rs

mod aria2;
mod http;
mod ytdlp;

pub use http::file_name_from_url;
pub use ytdlp::format_preset;

use self::{aria2::Aria2Backend, http::HttpBackend, ytdlp::YtDlpBackend};
use crate::{
    TaskContext,
    client::RobustClient,
    config::AppConfig,
    constants,
    error::{AppError, AppResult},
    utils,
};
use async_trait::async_trait;
use log::{info, warn};
use std::path::Path;
use url::Url;

/// Resolves task sources to local files.
#[async_trait]
pub trait DownloadManager: Send + Sync {
    /// Populates the transfer state's total size estimate.
    async fn cal_down_size(&self, sources: &[String], ctx: &TaskContext) -> AppResult<()>;

    /// Human name for the task, derived from its first source.
    async fn display_name(&self, first_source: &str, ctx: &TaskContext) -> String;

    /// Downloads every source into `dest`. Any failure aborts the whole batch.
    async fn download_all(
        &self,
        sources: &[String],
        use_streaming_extractor: bool,
        dest: &Path,
        ctx: &TaskContext,
    ) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    Torrent,
    GoogleDrive,
    Telegram,
    Mega,
    Terabox,
    Streaming,
    LocalPath,
    Unknown,
}

impl SourceKind {
    pub fn classify(source: &str) -> Self {
        let source = source.trim();
        if source.starts_with("magnet:") {
            return SourceKind::Torrent;
        }
        let Ok(url) = Url::parse(source) else {
            return if Path::new(source).exists() {
                SourceKind::LocalPath
            } else {
                SourceKind::Unknown
            };
        };
        if !matches!(url.scheme(), "http" | "https") {
            return SourceKind::Unknown;
        }
        if url.path().to_ascii_lowercase().ends_with(".torrent") {
            return SourceKind::Torrent;
        }
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let host_is = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if host_is("drive.google.com") || host_is("docs.google.com") {
            SourceKind::GoogleDrive
        } else if host_is("t.me") || host_is("telegram.me") {
            SourceKind::Telegram
        } else if host_is("mega.nz") || host_is("mega.co.nz") {
            SourceKind::Mega
        } else if ["terabox.com", "teraboxapp.com", "1024tera.com", "terabox.app"]
            .iter()
            .any(|d| host_is(d))
        {
            SourceKind::Terabox
        } else if constants::ytdl::STREAMING_HOSTS.iter().any(|d| host_is(d)) {
            SourceKind::Streaming
        } else {
            SourceKind::Http
        }
    }
}

/// Dispatches each source to HTTP, yt-dlp or aria2c by its kind.
pub struct DefaultDownloadManager {
    http: HttpBackend,
    ytdlp: YtDlpBackend,
    aria2: Aria2Backend,
}

impl DefaultDownloadManager {
    pub fn new(config: &AppConfig, client: RobustClient) -> Self {
        Self {
            http: HttpBackend::new(client),
            ytdlp: YtDlpBackend::new(config.tools.ytdlp.clone(), config.probe_timeout),
            aria2: Aria2Backend::new(config.tools.aria2c.clone()),
        }
    }

    async fn download_one(
        &self,
        source: &str,
        force_ytdl: bool,
        dest: &Path,
        ctx: &TaskContext,
    ) -> AppResult<()> {
        let kind = SourceKind::classify(source);
        let before = utils::get_size(dest);
        match kind {
            SourceKind::Http | SourceKind::Streaming if force_ytdl => {
                self.ytdlp.download(source, dest, ctx).await?
            }
            SourceKind::Streaming => self.ytdlp.download(source, dest, ctx).await?,
            SourceKind::Http => self.http.download(source, dest, ctx).await?,
            SourceKind::Torrent => self.aria2.download(source, dest, ctx).await?,
            other => {
                return Err(AppError::DownloadFailed(format!(
                    "unsupported source kind {:?}: {}",
                    other, source
                )));
            }
        }
        ctx.transfer
            .record_download(utils::get_size(dest).saturating_sub(before));
        Ok(())
    }
}

#[async_trait]
impl DownloadManager for DefaultDownloadManager {
    async fn cal_down_size(&self, sources: &[String], ctx: &TaskContext) -> AppResult<()> {
        let mut total = 0u64;
        for source in sources {
            if SourceKind::classify(source) != SourceKind::Http {
                continue;
            }
            match self.http.content_length(source).await {
                Ok(Some(len)) => total += len,
                Ok(None) => {}
                Err(e) => warn!("Could not size {}: {}", source, e),
            }
        }
        ctx.transfer.set_total_size(total);
        Ok(())
    }

    async fn display_name(&self, first_source: &str, ctx: &TaskContext) -> String {
        let name = match SourceKind::classify(first_source) {
            SourceKind::Streaming => self.ytdlp.title(first_source).await.ok(),
            SourceKind::Http if ctx.task.options.ytdl => self.ytdlp.title(first_source).await.ok(),
            SourceKind::Http => self.http.remote_file_name(first_source).await,
            SourceKind::Torrent => aria2::torrent_display_name(first_source),
            SourceKind::LocalPath => Path::new(first_source)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            _ => None,
        };
        name.filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| constants::UNKNOWN_DOWNLOAD_NAME.to_string())
    }

    async fn download_all(
        &self,
        sources: &[String],
        use_streaming_extractor: bool,
        dest: &Path,
        ctx: &TaskContext,
    ) -> AppResult<()> {
        tokio::fs::create_dir_all(dest).await?;
        for (i, source) in sources.iter().enumerate() {
            if ctx.cancellation_token.is_cancelled() {
                return Err(AppError::UserCancelled);
            }
            info!("Downloading source {}/{}: {}", i + 1, sources.len(), source);
            self.download_one(source, use_streaming_extractor, dest, ctx)
                .await
                .map_err(|e| match e {
                    AppError::UserCancelled | AppError::DownloadFailed(_) => e,
                    other => AppError::DownloadFailed(format!("{}: {}", source, other)),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sources() {
        assert_eq!(SourceKind::classify("magnet:?xt=urn:btih:abc"), SourceKind::Torrent);
        assert_eq!(SourceKind::classify("https://x.org/a.torrent"), SourceKind::Torrent);
        assert_eq!(SourceKind::classify("https://drive.google.com/file/d/1/view"), SourceKind::GoogleDrive);
        assert_eq!(SourceKind::classify("https://t.me/c/1/2"), SourceKind::Telegram);
        assert_eq!(SourceKind::classify("https://mega.nz/file/x"), SourceKind::Mega);
        assert_eq!(SourceKind::classify("https://www.terabox.com/s/1"), SourceKind::Terabox);
        assert_eq!(SourceKind::classify("https://www.youtube.com/watch?v=x"), SourceKind::Streaming);
        assert_eq!(SourceKind::classify("https://notyoutube.com/v"), SourceKind::Http);
        assert_eq!(SourceKind::classify("https://cdn.example.org/file.bin"), SourceKind::Http);
        assert_eq!(SourceKind::classify("ftp://x.org/a"), SourceKind::Unknown);
    }
}
