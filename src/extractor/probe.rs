// src/extractor/probe.rs

use super::{TrackSource, labels, selection};
use crate::{
    downloader,
    error::{AppError, AppResult},
    models::{
        media::{FfprobeOutput, FfprobeStream},
        track::{
            AudioTrack, Locator, ProbeKind, StreamSession, SubtitleTrack, TrackDescriptor,
            VideoTrack,
        },
    },
    tool::ToolCommand,
    utils,
};
use async_trait::async_trait;
use log::{debug, info};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Cover art shows up as a video stream.
const ATTACHED_PICTURE_CODECS: &[&str] = &["mjpeg", "png", "bmp", "gif"];

/// Universal prober: anything ffprobe can open, local or over HTTP.
pub struct DirectProber {
    ffprobe: String,
    ffmpeg: String,
    timeout: Duration,
}

impl DirectProber {
    pub fn new(ffprobe: String, ffmpeg: String, timeout: Duration) -> Self {
        Self {
            ffprobe,
            ffmpeg,
            timeout,
        }
    }
}

#[async_trait]
impl TrackSource for DirectProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Direct
    }

    async fn probe(&self, url: &str) -> Option<StreamSession> {
        let json = ToolCommand::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(url)
            .output(Some(self.timeout))
            .await;
        let json = match json {
            Ok(json) => json,
            Err(e) => {
                info!("ffprobe gave nothing for {}: {}", url, e);
                return None;
            }
        };
        match serde_json::from_str::<FfprobeOutput>(&json) {
            Ok(output) => parse_ffprobe(url, &output),
            Err(e) => {
                debug!("Unreadable ffprobe output for {}: {}", url, e);
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
        let Locator::StreamMap(maps) = track.locator() else {
            return Err(AppError::Other(anyhow::anyhow!(
                "track '{}' has no stream map",
                track.label()
            )));
        };
        let (file_name, codec_args): (String, Vec<&str>) = match track {
            TrackDescriptor::Video(v) => (format!("{}.{}", session.title, v.ext), vec!["-c", "copy"]),
            TrackDescriptor::Audio(a) => (
                format!("{} [{}].{}", session.title, a.language, a.ext),
                vec!["-c", "copy"],
            ),
            TrackDescriptor::Subtitle(s) => (
                format!("subtitle_{}.{}", s.language, s.format),
                vec!["-c:s", subtitle_encoder(&s.format)],
            ),
        };
        let out = dest_dir.join(utils::sanitize_filename(&file_name));

        let mut cmd = ToolCommand::new(&self.ffmpeg)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(&session.url);
        for map in maps {
            cmd = cmd.arg("-map").arg(map);
        }
        info!("Stream copy {:?} of {} -> {}", maps, session.url, out.display());
        cmd.args(codec_args).arg(&out).run_streaming(cancel, |_| {}).await?;
        Ok(out)
    }
}

/// Text subtitles are rewritten into the target container; everything else is copied.
fn subtitle_encoder(format: &str) -> &'static str {
    match format {
        "srt" => "srt",
        "vtt" => "webvtt",
        "ass" => "ass",
        _ => "copy",
    }
}

fn subtitle_format(codec: &str) -> &'static str {
    match codec {
        "subrip" | "mov_text" => "srt",
        "webvtt" => "vtt",
        "ass" | "ssa" => "ass",
        _ => "mks",
    }
}

fn audio_ext(codec: &str) -> &'static str {
    match codec {
        "aac" | "alac" => "m4a",
        "mp3" => "mp3",
        "opus" => "opus",
        "vorbis" => "ogg",
        "flac" => "flac",
        "ac3" => "ac3",
        "eac3" => "eac3",
        _ => "mka",
    }
}

fn parse_f64(s: Option<&str>) -> Option<f64> {
    s.and_then(|v| v.parse::<f64>().ok()).filter(|v| v.is_finite() && *v > 0.0)
}

fn streams_of<'a>(output: &'a FfprobeOutput, codec_type: &str) -> Vec<&'a FfprobeStream> {
    output
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some(codec_type))
        .collect()
}

/// Builds a session from ffprobe's stream list.
///
/// With at least one video stream and exactly one audio stream, that audio is
/// treated as muxed into the video: the video tracks carry it and the audio
/// list stays empty. Several audio streams are listed on their own.
pub fn parse_ffprobe(url: &str, output: &FfprobeOutput) -> Option<StreamSession> {
    if output.streams.is_empty() {
        return None;
    }
    let format = output.format.as_ref();
    let duration = parse_f64(format.and_then(|f| f.duration.as_deref()));
    let videos: Vec<&FfprobeStream> = streams_of(output, "video")
        .into_iter()
        .filter(|s| !ATTACHED_PICTURE_CODECS.contains(&s.codec_name.as_deref().unwrap_or_default()))
        .collect();
    let audios = streams_of(output, "audio");
    let subtitles = streams_of(output, "subtitle");
    let muxed = !videos.is_empty() && audios.len() == 1;

    let stream_size = |s: &FfprobeStream| -> u64 {
        let secs = parse_f64(s.duration.as_deref()).or(duration);
        match (parse_f64(s.bit_rate.as_deref()), secs) {
            (Some(rate), Some(secs)) => (rate * secs / 8.0) as u64,
            _ => 0,
        }
    };
    let container_size = parse_f64(format.and_then(|f| f.size.as_deref()))
        .or_else(|| {
            let rate = parse_f64(format.and_then(|f| f.bit_rate.as_deref()))?;
            Some(rate * duration? / 8.0)
        })
        .unwrap_or(0.0) as u64;

    let muxed_audio = muxed.then(|| audios[0]);
    let video_tracks: Vec<VideoTrack> = videos
        .iter()
        .copied()
        .map(|s| {
            let codec = s.codec_name.clone().unwrap_or_else(|| "unknown".into());
            let language = labels::normalize_language(s.language());
            let mut size = stream_size(s) + muxed_audio.map(stream_size).unwrap_or(0);
            if size == 0 && videos.len() == 1 {
                size = container_size;
            }
            let mut maps = vec![format!("0:{}", s.index)];
            if let Some(audio) = muxed_audio {
                maps.push(format!("0:{}", audio.index));
            }
            let acodec = muxed_audio.and_then(|a| a.codec_name.as_deref());
            VideoTrack {
                label: labels::video_label(&language, s.height.unwrap_or(0), s.fps(), &codec, acodec, size),
                size,
                language,
                height: s.height.unwrap_or(0),
                fps: s.fps(),
                codec,
                has_audio: muxed,
                ext: "mkv".to_string(),
                locator: Locator::StreamMap(maps),
            }
        })
        .collect();

    let audio_tracks: Vec<AudioTrack> = if muxed {
        Vec::new()
    } else {
        audios
            .iter()
            .copied()
            .map(|s| {
                let codec = s.codec_name.clone().unwrap_or_else(|| "unknown".into());
                let language = labels::normalize_language(s.language());
                let bitrate = parse_f64(s.bit_rate.as_deref()).map(|b| (b / 1000.0).round() as u32).unwrap_or(0);
                let size = stream_size(s);
                AudioTrack {
                    label: labels::audio_label(&language, &codec, bitrate, size),
                    size,
                    ext: audio_ext(&codec).to_string(),
                    language,
                    bitrate,
                    codec,
                    locator: Locator::StreamMap(vec![format!("0:{}", s.index)]),
                }
            })
            .collect()
    };

    let subtitle_tracks: Vec<SubtitleTrack> = subtitles
        .iter()
        .copied()
        .map(|s| {
            let language = labels::normalize_language(s.language());
            let format = subtitle_format(s.codec_name.as_deref().unwrap_or_default()).to_string();
            SubtitleTrack {
                label: labels::subtitle_label(&language, &format),
                language,
                format,
                locator: Locator::StreamMap(vec![format!("0:{}", s.index)]),
            }
        })
        .collect();

    let session = StreamSession {
        url: url.to_string(),
        title: labels::session_title(
            format
                .and_then(|f| f.tags.as_ref())
                .and_then(|t| t.title.clone())
                .or_else(|| downloader::file_name_from_url(url))
                .as_deref(),
        ),
        kind: ProbeKind::Direct,
        video: selection::select_video(video_tracks).into_iter().map(TrackDescriptor::Video).collect(),
        audio: selection::select_audio(audio_tracks).into_iter().map(TrackDescriptor::Audio).collect(),
        subtitles: selection::select_subtitles(subtitle_tracks)
            .into_iter()
            .map(TrackDescriptor::Subtitle)
            .collect(),
    };
    (!session.is_empty()).then_some(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MP4_WITH_SUBS: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "avg_frame_rate": "24000/1001", "bit_rate": "4000000"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "channels": 2, "bit_rate": "128000",
             "tags": {"language": "eng"}},
            {"index": 2, "codec_type": "subtitle", "codec_name": "mov_text", "tags": {"language": "fre"}},
            {"index": 3, "codec_type": "subtitle", "codec_name": "mov_text", "tags": {"language": "eng"}}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "100.0", "size": "51600000"}
    }"#;

    #[test]
    fn test_single_audio_is_muxed_into_video() {
        let output: FfprobeOutput = serde_json::from_str(MP4_WITH_SUBS).unwrap();
        let session = parse_ffprobe("https://cdn.example.org/movie.mp4", &output).unwrap();
        assert_eq!(session.kind, ProbeKind::Direct);
        assert_eq!(session.title, "movie.mp4");
        assert_eq!(session.video.len(), 1);
        assert!(session.audio.is_empty());
        let langs: Vec<&str> = session.subtitles.iter().map(|s| s.language()).collect();
        assert_eq!(langs, vec!["en", "fr"]);

        let TrackDescriptor::Video(v) = &session.video[0] else { panic!("expected video") };
        assert_eq!((v.height, v.fps, v.has_audio), (1080, 24, true));
        assert_eq!(v.size, 51_600_000);
        assert_eq!(v.locator, Locator::StreamMap(vec!["0:0".into(), "0:1".into()]));
        assert_eq!(session.subtitles[0].locator(), &Locator::StreamMap(vec!["0:3".into()]));
    }

    #[test]
    fn test_multiple_audio_streams_are_listed() {
        let json = r#"{"streams": [
            {"index": 0, "codec_type": "video", "codec_name": "hevc", "height": 2160, "avg_frame_rate": "25/1"},
            {"index": 1, "codec_type": "audio", "codec_name": "eac3", "bit_rate": "640000", "tags": {"language": "eng"}},
            {"index": 2, "codec_type": "audio", "codec_name": "aac", "bit_rate": "128000", "tags": {"language": "jpn"}},
            {"index": 3, "codec_type": "video", "codec_name": "mjpeg", "height": 600}
        ], "format": {"duration": "10"}}"#;
        let output: FfprobeOutput = serde_json::from_str(json).unwrap();
        let session = parse_ffprobe("/media/show.mkv", &output).unwrap();
        assert_eq!(session.video.len(), 1);
        assert_eq!(session.audio.len(), 2);
        assert_eq!(session.audio[0].language(), "en");
        assert_eq!(session.audio[0].size(), 800_000);
        let TrackDescriptor::Audio(ja) = &session.audio[1] else { panic!("expected audio") };
        assert_eq!((ja.ext.as_str(), ja.bitrate), ("m4a", 128));
        assert_eq!(ja.locator, Locator::StreamMap(vec!["0:2".into()]));
    }

    #[test]
    fn test_no_streams_is_none() {
        assert!(parse_ffprobe("x", &FfprobeOutput::default()).is_none());
    }
}
