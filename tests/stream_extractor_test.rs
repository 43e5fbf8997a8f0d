// tests/stream_extractor_test.rs

use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tempfile::tempdir;
use tg_leech::{
    client::RobustClient,
    config::AppConfig,
    error::{AppError, AppResult},
    extractor::{StreamExtractor, TrackSource},
    models::track::{
        Locator, ProbeKind, StreamSession, SubtitleTrack, TrackDescriptor, TrackKind, VideoTrack,
    },
};
use tokio_util::sync::CancellationToken;

const CHAT: i64 = 7;

/// Returns a canned session and records every fetch.
struct FakeSource {
    kind: ProbeKind,
    session: Option<StreamSession>,
    fail_fetch: bool,
    fetched: Mutex<Vec<String>>,
}

impl FakeSource {
    fn new(kind: ProbeKind, session: Option<StreamSession>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            session,
            fail_fetch: false,
            fetched: Mutex::new(Vec::new()),
        })
    }

    fn failing(kind: ProbeKind, session: Option<StreamSession>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            session,
            fail_fetch: true,
            fetched: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TrackSource for FakeSource {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    async fn probe(&self, _url: &str) -> Option<StreamSession> {
        self.session.clone()
    }

    async fn fetch(
        &self,
        _session: &StreamSession,
        track: &TrackDescriptor,
        dest_dir: &Path,
        _cancel: &CancellationToken,
    ) -> AppResult<PathBuf> {
        self.fetched.lock().unwrap().push(track.label().to_string());
        if self.fail_fetch {
            return Err(AppError::DownloadFailed("stream went away".to_string()));
        }
        let path = dest_dir.join("track.bin");
        tokio::fs::write(&path, b"track").await?;
        Ok(path)
    }
}

fn video(label: &str) -> TrackDescriptor {
    TrackDescriptor::Video(VideoTrack {
        label: label.to_string(),
        size: 1024,
        language: "und".to_string(),
        height: 720,
        fps: 30,
        codec: "h264".to_string(),
        has_audio: true,
        ext: "mp4".to_string(),
        locator: Locator::FormatId("22".to_string()),
    })
}

fn session(kind: ProbeKind, title: &str, subtitles: Vec<TrackDescriptor>) -> StreamSession {
    StreamSession {
        url: "https://media.example/watch".to_string(),
        title: title.to_string(),
        kind,
        video: vec![video("720p"), video("360p")],
        audio: Vec::new(),
        subtitles,
    }
}

fn extractor(direct: Arc<FakeSource>, platform: Arc<FakeSource>) -> StreamExtractor {
    let client = RobustClient::new(&AppConfig::default()).expect("client");
    StreamExtractor::with_sources(direct, platform, client)
}

#[tokio::test]
async fn test_unprobeable_source_yields_no_session() {
    let ex = extractor(
        FakeSource::new(ProbeKind::Direct, None),
        FakeSource::new(ProbeKind::Platform, None),
    );
    assert!(ex.analyse(CHAT, "https://nowhere.example/x").await.is_none());
    assert!(ex.session(CHAT).is_none());
    assert!(ex.list_tracks(CHAT, TrackKind::Video).is_empty());
}

#[tokio::test]
async fn test_platform_backend_is_the_fallback() {
    let ex = extractor(
        FakeSource::new(ProbeKind::Direct, None),
        FakeSource::new(ProbeKind::Platform, Some(session(ProbeKind::Platform, "Clip", vec![]))),
    );
    let found = ex.analyse(CHAT, "https://media.example/watch").await.unwrap();
    assert_eq!(found.kind, ProbeKind::Platform);
    let labels: Vec<String> = ex
        .list_tracks(CHAT, TrackKind::Video)
        .iter()
        .map(|t| t.label().to_string())
        .collect();
    assert_eq!(labels, vec!["720p", "360p"]);
}

#[tokio::test]
async fn test_direct_probe_wins_over_platform() {
    let platform = FakeSource::new(ProbeKind::Platform, Some(session(ProbeKind::Platform, "P", vec![])));
    let ex = extractor(
        FakeSource::new(ProbeKind::Direct, Some(session(ProbeKind::Direct, "D", vec![]))),
        platform,
    );
    assert_eq!(ex.analyse(CHAT, "https://x").await.unwrap().title, "D");
}

#[tokio::test]
async fn test_download_without_session_fails() {
    let tmp = tempdir().unwrap();
    let ex = extractor(
        FakeSource::new(ProbeKind::Direct, None),
        FakeSource::new(ProbeKind::Platform, None),
    );
    let err = ex
        .download_track(CHAT, TrackKind::Video, 0, tmp.path(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PreconditionUnmet(_)));
}

#[tokio::test]
async fn test_bad_index_keeps_session_and_success_clears_it() {
    let tmp = tempdir().unwrap();
    let direct = FakeSource::new(ProbeKind::Direct, Some(session(ProbeKind::Direct, "Movie", vec![])));
    let ex = extractor(direct.clone(), FakeSource::new(ProbeKind::Platform, None));
    ex.analyse(CHAT, "https://x/movie.mp4").await.unwrap();
    let token = CancellationToken::new();

    let err = ex
        .download_track(CHAT, TrackKind::Video, 5, tmp.path(), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TrackNotFound { index: 5, .. }));
    assert!(ex.session(CHAT).is_some());

    let path = ex
        .download_track(CHAT, TrackKind::Video, 1, tmp.path(), &token)
        .await
        .unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"track");
    assert_eq!(*direct.fetched.lock().unwrap(), vec!["360p".to_string()]);
    assert!(ex.session(CHAT).is_none());
}

#[tokio::test]
async fn test_failed_fetch_keeps_session() {
    let tmp = tempdir().unwrap();
    let ex = extractor(
        FakeSource::failing(ProbeKind::Direct, Some(session(ProbeKind::Direct, "Movie", vec![]))),
        FakeSource::new(ProbeKind::Platform, None),
    );
    ex.analyse(CHAT, "https://x/movie.mp4").await.unwrap();
    let err = ex
        .download_track(CHAT, TrackKind::Video, 0, tmp.path(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DownloadFailed(_)));
    assert!(ex.session(CHAT).is_some());
}

#[tokio::test]
async fn test_url_subtitle_is_fetched_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/subs/en.srt")
        .with_status(200)
        .with_body("1\n00:00:01,000 --> 00:00:02,000\nHello\n")
        .create_async()
        .await;

    let sub = TrackDescriptor::Subtitle(SubtitleTrack {
        label: "🇬🇧 EN [srt]".to_string(),
        language: "en".to_string(),
        format: "srt".to_string(),
        locator: Locator::Url(format!("{}/subs/en.srt", server.url())),
    });
    let platform = FakeSource::new(ProbeKind::Platform, Some(session(ProbeKind::Platform, "Clip", vec![sub])));
    let ex = extractor(FakeSource::new(ProbeKind::Direct, None), platform.clone());
    ex.analyse(CHAT, "https://media.example/watch").await.unwrap();

    let tmp = tempdir().unwrap();
    let path = ex
        .download_track(CHAT, TrackKind::Subtitle, 0, tmp.path(), &CancellationToken::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(path.file_name().unwrap(), "subtitle_en.srt");
    assert!(std::fs::read_to_string(&path).unwrap().contains("Hello"));
    assert!(platform.fetched.lock().unwrap().is_empty());
}
