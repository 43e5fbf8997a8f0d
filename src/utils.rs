// src/utils.rs

use crate::{constants, error::*};
use anyhow::Context;
use regex::Regex;
use std::{
    cmp::Ordering,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

static ILLEGAL_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static CUSTOM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[(.+)\]$").unwrap());
static ZIP_PW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{(.+)\}$").unwrap());
static UNZIP_PW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\((.+)\)$").unwrap());

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SourceDirectives {
    pub sources: Vec<String>,
    pub custom_name: Option<String>,
    pub zip_password: Option<String>,
    pub unzip_password: Option<String>,
}

/// Splits raw message lines into real sources and the `[name]`, `{zip pw}`,
/// `(unzip pw)` directives. Blank lines are dropped.
pub fn parse_source_directives(raw: &[String]) -> SourceDirectives {
    let mut out = SourceDirectives::default();
    for line in raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if let Some(c) = CUSTOM_NAME_RE.captures(line) {
            out.custom_name = Some(c[1].trim().to_string());
        } else if let Some(c) = ZIP_PW_RE.captures(line) {
            out.zip_password = Some(c[1].to_string());
        } else if let Some(c) = UNZIP_PW_RE.captures(line) {
            out.unzip_password = Some(c[1].to_string());
        } else {
            out.sources.push(line.to_string());
        }
    }
    out
}

pub fn sanitize_filename(name: &str) -> String {
    let original_name = name.trim();
    if original_name.is_empty() { return "unknown".to_string(); }

    let mut name = ILLEGAL_CHARS_RE.replace_all(original_name, " ").into_owned();
    name = WHITESPACE_RE.replace_all(&name, " ").trim().to_string();
    name = name.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string();
    if name.is_empty() { return "unnamed".to_string(); }

    if name.len() > constants::MAX_FILENAME_BYTES {
        name = truncate_keep_extension(&name, constants::MAX_FILENAME_BYTES);
    }
    name
}

fn truncate_keep_extension(name: &str, max_bytes: usize) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            let ext_str = format!(".{}", ext.to_string_lossy());
            let stem = stem.to_string_lossy();
            let max_stem = max_bytes.saturating_sub(ext_str.len());
            format!("{}{}", safe_truncate_utf8(&stem, max_stem), ext_str)
        }
        _ => safe_truncate_utf8(name, max_bytes).to_string(),
    }
}

fn safe_truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes { return s; }
    let mut i = max_bytes;
    while i > 0 && !s.is_char_boundary(i) { i -= 1; }
    &s[..i]
}

pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// Renames `path` in place so its file name fits the upload limit. Returns the new path.
pub fn short_file_name(path: &Path) -> AppResult<PathBuf> {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(path.to_path_buf());
    };
    if name.chars().count() <= constants::FILENAME_TRUNCATE_LENGTH {
        return Ok(path.to_path_buf());
    }
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stem_budget = constants::FILENAME_TRUNCATE_LENGTH.saturating_sub(ext.chars().count());
    let stem = path.file_stem().unwrap_or_else(|| OsStr::new(&name)).to_string_lossy();
    let short = format!("{}{}", stem.chars().take(stem_budget).collect::<String>(), ext);
    let new_path = path.with_file_name(short);
    fs::rename(path, &new_path)?;
    Ok(new_path)
}

/// Compares two strings treating digit runs as numbers, so `ep2` sorts before `ep10`.
/// Letters compare case-insensitively; exact byte order only breaks ties.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_cmp_folded(a, b).then_with(|| a.cmp(b))
}

fn natural_cmp_folded(a: &str, b: &str) -> Ordering {
    let (mut ai, mut bi) = (a.chars().peekable(), b.chars().peekable());
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let na: String = std::iter::from_fn(|| ai.next_if(|c| c.is_ascii_digit())).collect();
                let nb: String = std::iter::from_fn(|| bi.next_if(|c| c.is_ascii_digit())).collect();
                let (ta, tb) = (na.trim_start_matches('0'), nb.trim_start_matches('0'));
                let ord = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
}

/// All regular files below `root`, in natural path order.
pub fn list_files_natural(root: &Path) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.is_file() {
        files.push(root.to_path_buf());
        return Ok(files);
    }
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to list '{}'", dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(files)
}

/// Total size in bytes of a file or directory tree. Missing paths count as zero.
pub fn get_size(path: &Path) -> u64 {
    if path.is_file() {
        return path.metadata().map(|m| m.len()).unwrap_or(0);
    }
    list_files_natural(path)
        .map(|files| {
            files
                .iter()
                .filter_map(|f| f.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

/// Copies a directory tree (or a single file) into `dest`, creating it.
pub fn copy_tree(src: &Path, dest: &Path) -> AppResult<()> {
    if src.is_file() {
        fs::create_dir_all(dest)?;
        let name = src.file_name().unwrap_or_else(|| OsStr::new("file"));
        fs::copy(src, dest.join(name))?;
        return Ok(());
    }
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// `dir/name`, or `dir/stem (N).ext` with the first free `N` when the name is taken.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1u32..)
        .map(|n| dir.join(format!("{} ({}){}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Removes a file or directory tree if present.
pub fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    }
}

pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

pub fn is_video(path: &Path) -> bool {
    constants::VIDEO_EXTENSIONS.contains(&lowercase_extension(path).as_str())
}

pub fn is_archive(path: &Path) -> bool {
    let ext = format!(".{}", lowercase_extension(path));
    constants::ARCHIVE_EXTENSIONS.contains(&ext.as_str())
}

/// Byte count as B/KB/MB/GB, `?` when unknown.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "?".to_string();
    }
    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{:.0} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} TB", value)
}

/// Seconds as `1h 2m 3s`, dropping leading zero units.
pub fn format_elapsed(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{}s", s),
        (0, _) => format!("{}m {}s", m, s),
        _ => format!("{}h {}m {}s", h, m, s),
    }
}
