// src/extractor/labels.rs

use crate::{constants::tracks, utils};

/// Two-letter code for an ISO 639-2 tag; other tags pass through lowercased.
pub fn normalize_language(lang: Option<&str>) -> String {
    let Some(lang) = lang.map(str::trim).filter(|l| !l.is_empty() && *l != "und") else {
        return "und".to_string();
    };
    let lower = lang.to_ascii_lowercase();
    tracks::ISO639_2_TO_1
        .iter()
        .find(|(three, _)| *three == lower)
        .map(|(_, two)| two.to_string())
        .unwrap_or(lower)
}

pub fn flag(lang: &str) -> &'static str {
    let primary = lang.split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase();
    tracks::LANGUAGE_FLAGS
        .iter()
        .find(|(code, _)| *code == primary)
        .map(|(_, f)| *f)
        .unwrap_or(tracks::GLOBE)
}

fn lang_tag(lang: &str) -> String {
    if lang == "und" { "UNKNOWN".to_string() } else { lang.to_uppercase() }
}

pub fn video_label(lang: &str, height: u32, fps: u32, vcodec: &str, acodec: Option<&str>, size: u64) -> String {
    let res = if height > 0 { format!("{}p", height) } else { "?p".to_string() };
    let fps = if fps > 0 { format!(" {}fps", fps) } else { String::new() };
    let codecs = match acodec {
        Some(a) => format!("{}+{}", vcodec, a),
        None => format!("{} (no audio)", vcodec),
    };
    format!("{} {}{}  [{}]  {}", flag(lang), res, fps, codecs, utils::format_size(size))
}

pub fn audio_label(lang: &str, codec: &str, bitrate: u32, size: u64) -> String {
    format!(
        "{} {} [{}] {}kbps {}",
        flag(lang),
        lang_tag(lang),
        codec,
        bitrate,
        utils::format_size(size)
    )
}

pub fn subtitle_label(lang: &str, format: &str) -> String {
    format!("{} {} [{}]", flag(lang), lang_tag(lang), format)
}

/// Session title, truncated for display.
pub fn session_title(title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => utils::truncate_text(t, tracks::TITLE_MAX_CHARS),
        None => tracks::UNKNOWN_TITLE.to_string(),
    }
}

/// Leading part of a codec string such as `avc1.640028`.
pub fn short_codec(codec: Option<&str>) -> String {
    codec
        .and_then(|c| c.split('.').next())
        .filter(|c| !c.is_empty() && *c != "none")
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_normalization_and_flags() {
        assert_eq!(normalize_language(Some("eng")), "en");
        assert_eq!(normalize_language(Some("und")), "und");
        assert_eq!(normalize_language(None), "und");
        assert_eq!(normalize_language(Some("pt-BR")), "pt-br");
        assert_eq!(flag("pt-br"), "🇵🇹");
        assert_eq!(flag("und"), "🌐");
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            video_label("en", 1080, 30, "h264", Some("aac"), 0),
            "🇬🇧 1080p 30fps  [h264+aac]  ?"
        );
        assert_eq!(video_label("und", 720, 0, "vp9", None, 0), "🌐 720p  [vp9 (no audio)]  ?");
        assert_eq!(subtitle_label("fr", "vtt"), "🇫🇷 FR [vtt]");
        assert!(audio_label("de", "opus", 160, 2048).starts_with("🇩🇪 DE [opus] 160kbps"));
    }

    #[test]
    fn test_session_title_defaults_and_truncates() {
        assert_eq!(session_title(None), "Unknown");
        assert_eq!(session_title(Some("  ")), "Unknown");
        assert_eq!(session_title(Some(&"x".repeat(200))).chars().count(), 80);
        assert_eq!(short_codec(Some("avc1.640028")), "avc1");
        assert_eq!(short_codec(Some("none")), "unknown");
    }
}
