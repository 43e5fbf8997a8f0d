// src/downloader/http.rs

use crate::{
    TaskContext,
    client::RobustClient,
    constants,
    error::{AppError, AppResult},
    transfer::{Phase, ProgressUpdate},
    utils,
};
use log::{debug, info};
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::{Response, header};
use std::{path::Path, sync::LazyLock};
use url::Url;

static DISPOSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*?\s*=\s*(?:UTF-8'')?"?([^";]+)"?"#).unwrap()
});

pub(super) struct HttpBackend {
    client: RobustClient,
}

impl HttpBackend {
    pub(super) fn new(client: RobustClient) -> Self {
        Self { client }
    }

    pub(super) async fn content_length(&self, url: &str) -> AppResult<Option<u64>> {
        self.client.content_length(url).await
    }

    /// Name advertised by the server, falling back to the last URL segment.
    pub(super) async fn remote_file_name(&self, url: &str) -> Option<String> {
        let from_header = match self.client.head(url).await {
            Ok(res) => disposition_name(&res),
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                None
            }
        };
        from_header.or_else(|| file_name_from_url(url))
    }

    pub(super) async fn download(&self, url: &str, dest_dir: &Path, ctx: &TaskContext) -> AppResult<()> {
        let res = self.client.get(url).await?;
        let name = disposition_name(&res)
            .or_else(|| file_name_from_url(url))
            .unwrap_or_else(|| constants::UNKNOWN_DOWNLOAD_NAME.to_string());
        let name = utils::sanitize_filename(&name);
        let total = res.content_length().unwrap_or(0);
        let path = utils::unique_path(dest_dir, &name);
        info!("HTTP download {} -> {}", url, path.display());

        let write = RobustClient::write_body(res, &path, |done| {
            ctx.progress
                .push(ProgressUpdate::new(Phase::Downloading, name.clone(), done, total));
        });
        tokio::select! {
            written = write => {
                let written = written?;
                debug!("{} finished after {} bytes", name, written);
                Ok(())
            }
            _ = ctx.cancellation_token.cancelled() => Err(AppError::UserCancelled),
        }
    }
}

fn disposition_name(res: &Response) -> Option<String> {
    let value = res.headers().get(header::CONTENT_DISPOSITION)?.to_str().ok()?;
    let raw = DISPOSITION_RE.captures(value)?.get(1)?.as_str().trim();
    let decoded = percent_decode_str(raw).decode_utf8_lossy().into_owned();
    (!decoded.is_empty()).then_some(decoded)
}

/// Percent-decoded last path segment of `url`.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    (!decoded.trim().is_empty()).then_some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url_decodes() {
        assert_eq!(
            file_name_from_url("https://cdn.example.org/dl/My%20Show%20S01.mkv?token=1").as_deref(),
            Some("My Show S01.mkv")
        );
        assert_eq!(file_name_from_url("https://cdn.example.org/"), None);
    }

    #[test]
    fn test_disposition_regex_variants() {
        let caps = DISPOSITION_RE
            .captures(r#"attachment; filename="report final.pdf""#)
            .unwrap();
        assert_eq!(&caps[1], "report final.pdf");
        let caps = DISPOSITION_RE
            .captures("attachment; filename*=UTF-8''caf%C3%A9.zip")
            .unwrap();
        assert_eq!(percent_decode_str(&caps[1]).decode_utf8_lossy(), "café.zip");
    }
}
