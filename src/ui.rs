// src/ui.rs

use crate::{constants, models::track::StreamSession, models::track::TrackKind, symbols};
use colored::*;
use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[a-z]+>").unwrap());

pub fn print_header(title: &str) {
    println!("\n{}", "═".repeat(constants::UI_WIDTH));
    println!(" {}", title.cyan().bold());
    println!("{}", "═".repeat(constants::UI_WIDTH));
}

pub fn print_sub_header(title: &str) {
    println!("\n--- {} ---", title.bold());
}

pub fn box_message(title: &str, content: &[&str], color_func: fn(ColoredString) -> ColoredString) {
    println!("\n┌{}┐", "─".repeat(constants::UI_WIDTH - 2));
    println!("  {}", color_func(title.bold()));
    println!("├{}┤", "─".repeat(constants::UI_WIDTH - 2));
    for line in content {
        println!("  {}", line);
    }
    println!("└{}┘", "─".repeat(constants::UI_WIDTH - 2));
}

pub fn print_status(text: &str) {
    let mut lines = text.lines();
    if let Some(head) = lines.next() {
        println!("{} {}", *symbols::INFO, head.bold());
    }
    for line in lines.filter(|l| !l.trim().is_empty()) {
        println!("    {}", line);
    }
}

/// Drops the chat's HTML tags for terminal output.
pub fn strip_markup(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

pub fn print_session(session: &StreamSession) {
    print_header(&session.title);
    println!("{}", session.url.dimmed());
    for kind in [TrackKind::Video, TrackKind::Audio, TrackKind::Subtitle] {
        let tracks = session.tracks(kind);
        print_sub_header(&format!("{} ({})", kind, tracks.len()));
        if tracks.is_empty() {
            println!("  {}", "none".dimmed());
        }
        for (i, track) in tracks.iter().enumerate() {
            println!("  [{}] {}", i.to_string().yellow(), track.label());
        }
    }
}
