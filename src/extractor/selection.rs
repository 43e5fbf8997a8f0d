// src/extractor/selection.rs

//! Ordering and deduplication applied to every probe result before it is shown.

use crate::{
    constants::tracks,
    models::track::{AudioTrack, SubtitleTrack, VideoTrack},
};
use itertools::Itertools;
use std::cmp::Reverse;

/// Highest (height, fps) first, one rendition per (height, has_audio).
pub fn select_video(videos: Vec<VideoTrack>) -> Vec<VideoTrack> {
    videos
        .into_iter()
        .sorted_by_key(|v| Reverse((v.height, v.fps)))
        .unique_by(|v| (v.height, v.has_audio))
        .take(tracks::MAX_VIDEO_TRACKS)
        .collect()
}

/// Grouped by language with the best bitrate first, one per (language, ext).
pub fn select_audio(audios: Vec<AudioTrack>) -> Vec<AudioTrack> {
    audios
        .into_iter()
        .sorted_by(|a, b| a.language.cmp(&b.language).then(b.bitrate.cmp(&a.bitrate)))
        .unique_by(|a| (a.language.clone(), a.ext.clone()))
        .take(tracks::MAX_AUDIO_TRACKS)
        .collect()
}

/// One subtitle per language, sorted by language code, preferring vtt then srt.
pub fn select_subtitles(subs: Vec<SubtitleTrack>) -> Vec<SubtitleTrack> {
    let rank = |s: &SubtitleTrack| {
        tracks::PREFERRED_SUBTITLE_EXTS
            .iter()
            .position(|ext| s.format.eq_ignore_ascii_case(ext))
            .unwrap_or(tracks::PREFERRED_SUBTITLE_EXTS.len())
    };
    subs.into_iter()
        .sorted_by(|a, b| a.language.cmp(&b.language))
        .chunk_by(|s| s.language.clone())
        .into_iter()
        .filter_map(|(_, group)| group.min_by_key(rank))
        .collect()
}
