// src/extractor/mod.rs

pub mod labels;
pub mod platform;
pub mod probe;
pub mod selection;

pub use platform::PlatformExtractor;
pub use probe::DirectProber;

use crate::{
    client::RobustClient,
    config::AppConfig,
    error::{AppError, AppResult},
    models::track::{Locator, ProbeKind, StreamSession, TrackDescriptor, TrackKind},
    utils,
};
use async_trait::async_trait;
use dashmap::DashMap;
use log::{info, warn};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_util::sync::CancellationToken;

/// One probing backend. `probe` returns `None` on timeout, failed exit or an
/// empty stream list; that is never an error for the caller.
#[async_trait]
pub trait TrackSource: Send + Sync {
    fn kind(&self) -> ProbeKind;

    async fn probe(&self, url: &str) -> Option<StreamSession>;

    async fn fetch(
        &self,
        session: &StreamSession,
        track: &TrackDescriptor,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> AppResult<PathBuf>;
}

/// Per-chat track analysis and single-track download.
pub struct StreamExtractor {
    sessions: DashMap<i64, StreamSession>,
    direct: Arc<dyn TrackSource>,
    platform: Arc<dyn TrackSource>,
    client: RobustClient,
}

impl StreamExtractor {
    pub fn new(config: &AppConfig, client: RobustClient) -> Self {
        let tools = &config.tools;
        Self::with_sources(
            Arc::new(DirectProber::new(
                tools.ffprobe.clone(),
                tools.ffmpeg.clone(),
                config.probe_timeout,
            )),
            Arc::new(PlatformExtractor::new(tools.ytdlp.clone(), config.probe_timeout)),
            client,
        )
    }

    pub fn with_sources(
        direct: Arc<dyn TrackSource>,
        platform: Arc<dyn TrackSource>,
        client: RobustClient,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            direct,
            platform,
            client,
        }
    }

    /// Probes `url`, universal prober first, and stores the result as the chat's
    /// session, replacing any previous one. `None` means neither backend could
    /// read the source.
    pub async fn analyse(&self, chat_id: i64, url: &str) -> Option<StreamSession> {
        let session = match self.direct.probe(url).await {
            Some(session) => Some(session),
            None => {
                info!(
                    "{:?} probe found no streams in {}, trying {:?}",
                    self.direct.kind(),
                    url,
                    self.platform.kind()
                );
                self.platform.probe(url).await
            }
        };
        match session {
            Some(session) => {
                info!(
                    "Analysed {} ({:?}): {} video, {} audio, {} subtitle tracks",
                    url,
                    session.kind,
                    session.video.len(),
                    session.audio.len(),
                    session.subtitles.len()
                );
                self.sessions.insert(chat_id, session.clone());
                Some(session)
            }
            None => {
                warn!("{}", AppError::ProbeUnsupported(url.to_string()));
                None
            }
        }
    }

    pub fn session(&self, chat_id: i64) -> Option<StreamSession> {
        self.sessions.get(&chat_id).map(|s| s.clone())
    }

    pub fn clear_session(&self, chat_id: i64) {
        self.sessions.remove(&chat_id);
    }

    pub fn list_tracks(&self, chat_id: i64, kind: TrackKind) -> Vec<TrackDescriptor> {
        self.sessions
            .get(&chat_id)
            .map(|s| s.tracks(kind).to_vec())
            .unwrap_or_default()
    }

    /// Downloads one track of the chat's session into `dest_dir`. The session is
    /// dropped on success and kept on failure so another track can be picked.
    pub async fn download_track(
        &self,
        chat_id: i64,
        kind: TrackKind,
        index: usize,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> AppResult<PathBuf> {
        let session = self.session(chat_id).ok_or_else(|| {
            AppError::PreconditionUnmet("No analysed source for this chat.".to_string())
        })?;
        let track = session
            .track(kind, index)
            .cloned()
            .ok_or_else(|| AppError::TrackNotFound {
                kind: kind.to_string(),
                index,
            })?;
        tokio::fs::create_dir_all(dest_dir).await?;

        let result = match (&track, track.locator()) {
            (TrackDescriptor::Subtitle(sub), Locator::Url(url)) => {
                let name = format!("subtitle_{}.{}", sub.language, sub.format);
                let dest = dest_dir.join(utils::sanitize_filename(&name));
                self.client
                    .download_to(url.as_str(), &dest, |_| {})
                    .await
                    .map(|_| dest)
            }
            _ => {
                let source = match session.kind {
                    ProbeKind::Direct => &self.direct,
                    ProbeKind::Platform => &self.platform,
                };
                source.fetch(&session, &track, dest_dir, cancel).await
            }
        };

        match &result {
            Ok(path) => {
                info!("Track '{}' saved to {}", track.label(), path.display());
                self.clear_session(chat_id);
            }
            Err(e) => warn!("Track '{}' failed, session kept: {}", track.label(), e),
        }
        result
    }
}
