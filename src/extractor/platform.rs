// src/extractor/platform.rs

use super::{TrackSource, labels, selection};
use crate::{
    constants::ytdl,
    error::{AppError, AppResult},
    models::{
        media::PlatformInfo,
        track::{
            AudioTrack, Locator, ProbeKind, StreamSession, SubtitleTrack, TrackDescriptor,
            VideoTrack,
        },
    },
    tool::ToolCommand,
};
use async_trait::async_trait;
use log::{debug, info};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Site-aware backend for streaming platforms, driven through yt-dlp.
pub struct PlatformExtractor {
    ytdlp: String,
    timeout: Duration,
}

impl PlatformExtractor {
    pub fn new(ytdlp: String, timeout: Duration) -> Self {
        Self { ytdlp, timeout }
    }
}

#[async_trait]
impl TrackSource for PlatformExtractor {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Platform
    }

    async fn probe(&self, url: &str) -> Option<StreamSession> {
        let json = ToolCommand::new(&self.ytdlp)
            .args(["-J", "--no-playlist", "--skip-download", "--no-warnings"])
            .arg(url)
            .output(Some(self.timeout))
            .await;
        let json = match json {
            Ok(json) => json,
            Err(e) => {
                info!("yt-dlp gave nothing for {}: {}", url, e);
                return None;
            }
        };
        match serde_json::from_str::<PlatformInfo>(&json) {
            Ok(info) => parse_platform(url, &info),
            Err(e) => {
                debug!("Unreadable yt-dlp output for {}: {}", url, e);
                None
            }
        }
    }

    async fn fetch(
        &self,
        session: &StreamSession,
        track: &TrackDescriptor,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> AppResult<PathBuf> {
        let Locator::FormatId(format_id) = track.locator() else {
            return Err(AppError::Other(anyhow::anyhow!(
                "track '{}' has no format id",
                track.label()
            )));
        };
        let mut final_path: Option<PathBuf> = None;
        info!("yt-dlp format {} of {}", format_id, session.url);
        ToolCommand::new(&self.ytdlp)
            .args(["--no-playlist", "--no-warnings", "--newline", "-f", format_id.as_str()])
            .args(["--print", "after_move:filepath"])
            .arg("-o")
            .arg(dest_dir.join(ytdl::OUTPUT_TEMPLATE))
            .arg(&session.url)
            .run_streaming(cancel, |line| {
                let candidate = Path::new(line);
                if candidate.is_absolute() || candidate.starts_with(dest_dir) {
                    final_path = Some(candidate.to_path_buf());
                }
            })
            .await?;

        final_path
            .filter(|p| p.exists())
            .ok_or_else(|| AppError::DownloadFailed(format!("yt-dlp reported no file for {}", session.url)))
    }
}

/// Builds a session from yt-dlp's `-J` document.
pub fn parse_platform(url: &str, info: &PlatformInfo) -> Option<StreamSession> {
    let mut videos = Vec::new();
    let mut audios = Vec::new();

    for f in &info.formats {
        let Some(id) = f.format_id.clone() else { continue };
        let ext = f.ext.clone().unwrap_or_else(|| "bin".to_string());
        let size = f.size();
        if f.has_video() {
            let height = f.height.unwrap_or(0);
            let fps = f.fps.map(|v| v.round() as u32).unwrap_or(0);
            let vcodec = labels::short_codec(f.vcodec.as_deref());
            let acodec = f.has_audio().then(|| labels::short_codec(f.acodec.as_deref()));
            let language = labels::normalize_language(f.language.as_deref());
            videos.push(VideoTrack {
                label: labels::video_label(&language, height, fps, &vcodec, acodec.as_deref(), size),
                size,
                language,
                height,
                fps,
                codec: vcodec,
                has_audio: f.has_audio(),
                ext,
                locator: Locator::FormatId(id),
            });
        } else if f.has_audio() {
            let codec = labels::short_codec(f.acodec.as_deref());
            let bitrate = f.abr.or(f.tbr).map(|v| v.round() as u32).unwrap_or(0);
            let language = labels::normalize_language(f.language.as_deref());
            audios.push(AudioTrack {
                label: labels::audio_label(&language, &codec, bitrate, size),
                size,
                language,
                bitrate,
                codec,
                ext,
                locator: Locator::FormatId(id),
            });
        }
    }

    let subtitles: Vec<SubtitleTrack> = info
        .subtitles
        .iter()
        .flat_map(|(lang, entries)| {
            entries.iter().filter_map(move |entry| {
                let url = entry.url.clone()?;
                let format = entry.ext.clone().unwrap_or_else(|| "vtt".to_string());
                Some(SubtitleTrack {
                    label: labels::subtitle_label(lang, &format),
                    language: lang.clone(),
                    format,
                    locator: Locator::Url(url),
                })
            })
        })
        .collect();

    let session = StreamSession {
        url: url.to_string(),
        title: labels::session_title(info.title.as_deref()),
        kind: ProbeKind::Platform,
        video: selection::select_video(videos).into_iter().map(TrackDescriptor::Video).collect(),
        audio: selection::select_audio(audios).into_iter().map(TrackDescriptor::Audio).collect(),
        subtitles: selection::select_subtitles(subtitles)
            .into_iter()
            .map(TrackDescriptor::Subtitle)
            .collect(),
    };
    (!session.is_empty()).then_some(session)
}
