// src/models/track.rs

use crate::error::AppError;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
            TrackKind::Subtitle => "subtitle",
        })
    }
}

impl FromStr for TrackKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "v" => Ok(TrackKind::Video),
            "audio" | "a" => Ok(TrackKind::Audio),
            "sub" | "subs" | "subtitle" | "s" => Ok(TrackKind::Subtitle),
            other => Err(AppError::Other(anyhow::anyhow!(
                "unknown track kind '{}', expected video, audio or sub",
                other
            ))),
        }
    }
}

/// Which backend produced a session; downloads go back through the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Direct,
    Platform,
}

/// How to fetch a track at download time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// ffmpeg `-map` specifiers, stream-copied into a new container
    StreamMap(Vec<String>),
    /// Site backend format id
    FormatId(String),
    /// Plain HTTP fetch
    Url(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoTrack {
    pub label: String,
    pub size: u64,
    pub language: String,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub has_audio: bool,
    pub ext: String,
    pub locator: Locator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub label: String,
    pub size: u64,
    pub language: String,
    /// kbit/s
    pub bitrate: u32,
    pub codec: String,
    pub ext: String,
    pub locator: Locator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTrack {
    pub label: String,
    pub language: String,
    pub format: String,
    pub locator: Locator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackDescriptor {
    Video(VideoTrack),
    Audio(AudioTrack),
    Subtitle(SubtitleTrack),
}

impl TrackDescriptor {
    pub fn kind(&self) -> TrackKind {
        match self {
            TrackDescriptor::Video(_) => TrackKind::Video,
            TrackDescriptor::Audio(_) => TrackKind::Audio,
            TrackDescriptor::Subtitle(_) => TrackKind::Subtitle,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TrackDescriptor::Video(v) => &v.label,
            TrackDescriptor::Audio(a) => &a.label,
            TrackDescriptor::Subtitle(s) => &s.label,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            TrackDescriptor::Video(v) => v.size,
            TrackDescriptor::Audio(a) => a.size,
            TrackDescriptor::Subtitle(_) => 0,
        }
    }

    pub fn language(&self) -> &str {
        match self {
            TrackDescriptor::Video(v) => &v.language,
            TrackDescriptor::Audio(a) => &a.language,
            TrackDescriptor::Subtitle(s) => &s.language,
        }
    }

    pub fn locator(&self) -> &Locator {
        match self {
            TrackDescriptor::Video(v) => &v.locator,
            TrackDescriptor::Audio(a) => &a.locator,
            TrackDescriptor::Subtitle(s) => &s.locator,
        }
    }
}

/// Per-chat result of probing one URL. Indices into the three lists stay
/// valid until the session is cleared or replaced.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub url: String,
    pub title: String,
    pub kind: ProbeKind,
    pub video: Vec<TrackDescriptor>,
    pub audio: Vec<TrackDescriptor>,
    pub subtitles: Vec<TrackDescriptor>,
}

impl StreamSession {
    pub fn tracks(&self, kind: TrackKind) -> &[TrackDescriptor] {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
            TrackKind::Subtitle => &self.subtitles,
        }
    }

    pub fn track(&self, kind: TrackKind, index: usize) -> Option<&TrackDescriptor> {
        self.tracks(kind).get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty() && self.subtitles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_kind_from_str() {
        assert_eq!("video".parse::<TrackKind>().unwrap(), TrackKind::Video);
        assert_eq!("SUB".parse::<TrackKind>().unwrap(), TrackKind::Subtitle);
        assert!("thumbnail".parse::<TrackKind>().is_err());
    }
}
