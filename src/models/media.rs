// src/models/media.rs

use serde::Deserialize;
use std::collections::BTreeMap;

// --- ffprobe -print_format json -show_streams -show_format ---

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    pub format: Option<FfprobeFormat>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FfprobeStream {
    pub index: u32,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub avg_frame_rate: Option<String>,
    pub r_frame_rate: Option<String>,
    pub bit_rate: Option<String>,
    pub channels: Option<u32>,
    pub channel_layout: Option<String>,
    pub duration: Option<String>,
    pub tags: Option<StreamTags>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct StreamTags {
    pub language: Option<String>,
    pub title: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FfprobeFormat {
    pub format_name: Option<String>,
    pub duration: Option<String>,
    pub bit_rate: Option<String>,
    pub size: Option<String>,
    pub tags: Option<FormatTags>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FormatTags {
    pub title: Option<String>,
}

// --- yt-dlp -J ---

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PlatformInfo {
    pub title: Option<String>,
    #[serde(rename = "_type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub formats: Vec<PlatformFormat>,
    #[serde(default)]
    pub subtitles: BTreeMap<String, Vec<PlatformSubtitle>>,
    pub entries: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PlatformFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
    pub abr: Option<f64>,
    pub tbr: Option<f64>,
    pub language: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PlatformSubtitle {
    pub ext: Option<String>,
    pub url: Option<String>,
}

impl FfprobeStream {
    pub fn language(&self) -> Option<&str> {
        self.tags
            .as_ref()
            .and_then(|t| t.language.as_deref())
            .filter(|l| !l.is_empty() && *l != "und")
    }

    /// Frame rate parsed from ffprobe's `num/den` notation.
    pub fn fps(&self) -> u32 {
        self.avg_frame_rate
            .as_deref()
            .and_then(parse_ratio)
            .filter(|f| *f > 0.0)
            .or_else(|| self.r_frame_rate.as_deref().and_then(parse_ratio))
            .map(|f| f.round() as u32)
            .unwrap_or(0)
    }
}

impl PlatformFormat {
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref().is_some_and(|c| c != "none")
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref().is_some_and(|c| c != "none")
    }

    pub fn size(&self) -> u64 {
        self.filesize.or(self.filesize_approx).unwrap_or(0.0).max(0.0) as u64
    }
}

fn parse_ratio(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((n, d)) => {
            let (n, d) = (n.parse::<f64>().ok()?, d.parse::<f64>().ok()?);
            (d != 0.0).then(|| n / d)
        }
        None => s.parse().ok(),
    }
}
