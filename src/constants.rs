// src/constants.rs

pub const UI_WIDTH: usize = 72;
pub const FILENAME_TRUNCATE_LENGTH: usize = 60;
pub const MAX_FILENAME_BYTES: usize = 200;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_DIR_NAME: &str = "logs";
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub const DEFAULT_WORK_DIR: &str = "leech-work";
pub const DEFAULT_OUTBOX_DIR: &str = "outbox";
pub const DEFAULT_MOUNTED_DRIVE: &str = "/content/drive";
pub const DEFAULT_MIRROR_DIR: &str = "/content/drive/MyDrive/Colab Leecher Uploads";
/// Largest single upload accepted by the chat backend.
pub const DEFAULT_SPLIT_SIZE: u64 = 2_000 * 1024 * 1024;
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 60;

pub const UNKNOWN_DOWNLOAD_NAME: &str = "UNKNOWN DOWNLOAD NAME";
pub const MIRROR_FOLDER_FORMAT: &str = "Uploaded » %Y-%m-%d %H:%M:%S";
pub const MIRROR_NOT_MOUNTED: &str = "Mirror destination not mounted.";

pub const ARCHIVE_EXTENSIONS: &[&str] = &[".7z", ".gz", ".zip", ".rar", ".001", ".tar", ".z01"];
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "webm", "avi", "mov", "flv", "wmv", "m4v", "ts", "3gp", "mpg", "mpeg",
];
pub const THUMBNAIL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

pub mod dirs {
    pub const DOWNLOADS: &str = "Downloads";
    pub const ZIP: &str = "zip";
    pub const UNZIP: &str = "unzip";
    pub const SPLIT: &str = "split";
    pub const THUMBNAILS: &str = "thumbnails";
    pub const FILES: &str = "files";
    pub const DIR_LEECH: &str = "dir_leech";
}

pub mod tracks {
    pub const MAX_VIDEO_TRACKS: usize = 12;
    pub const MAX_AUDIO_TRACKS: usize = 12;
    pub const TITLE_MAX_CHARS: usize = 80;
    pub const UNKNOWN_TITLE: &str = "Unknown";
    pub const PREFERRED_SUBTITLE_EXTS: &[&str] = &["vtt", "srt"];
    pub const GLOBE: &str = "🌐";
    pub const LANGUAGE_FLAGS: &[(&str, &str)] = &[
        ("en", "🇬🇧"), ("fr", "🇫🇷"), ("de", "🇩🇪"), ("es", "🇪🇸"), ("pt", "🇵🇹"),
        ("it", "🇮🇹"), ("ru", "🇷🇺"), ("ja", "🇯🇵"), ("ko", "🇰🇷"), ("zh", "🇨🇳"),
        ("ar", "🇸🇦"), ("hi", "🇮🇳"), ("tr", "🇹🇷"), ("nl", "🇳🇱"), ("pl", "🇵🇱"),
        ("sv", "🇸🇪"), ("da", "🇩🇰"), ("fi", "🇫🇮"), ("cs", "🇨🇿"), ("uk", "🇺🇦"),
        ("ro", "🇷🇴"), ("hu", "🇭🇺"), ("el", "🇬🇷"), ("he", "🇮🇱"), ("th", "🇹🇭"),
        ("vi", "🇻🇳"), ("id", "🇮🇩"), ("ms", "🇲🇾"), ("no", "🇳🇴"),
    ];
    /// ffprobe reports ISO 639-2 codes; map the common ones back to two letters.
    pub const ISO639_2_TO_1: &[(&str, &str)] = &[
        ("eng", "en"), ("fre", "fr"), ("fra", "fr"), ("ger", "de"), ("deu", "de"),
        ("spa", "es"), ("por", "pt"), ("ita", "it"), ("rus", "ru"), ("jpn", "ja"),
        ("kor", "ko"), ("chi", "zh"), ("zho", "zh"), ("ara", "ar"), ("hin", "hi"),
        ("tur", "tr"), ("dut", "nl"), ("nld", "nl"), ("pol", "pl"), ("swe", "sv"),
        ("dan", "da"), ("fin", "fi"), ("cze", "cs"), ("ces", "cs"), ("ukr", "uk"),
        ("rum", "ro"), ("ron", "ro"), ("hun", "hu"), ("gre", "el"), ("ell", "el"),
        ("heb", "he"), ("tha", "th"), ("vie", "vi"), ("ind", "id"), ("may", "ms"),
        ("msa", "ms"), ("nor", "no"),
    ];
}

pub mod ytdl {
    pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
    pub const FORMAT_PRESETS: &[(&str, &str)] = &[
        ("best", "best[ext=mp4]/best"),
        ("worst", "worst[ext=mp4]/worst"),
        ("720p", "best[height<=720][ext=mp4]/best[height<=720]"),
        ("480p", "best[height<=480][ext=mp4]/best[height<=480]"),
        ("360p", "best[height<=360][ext=mp4]/best[height<=360]"),
        ("240p", "best[height<=240][ext=mp4]/best[height<=240]"),
        ("audio_only", "bestaudio[ext=m4a]/bestaudio"),
        ("video_only", "bestvideo[ext=mp4]/bestvideo"),
    ];
    pub const STREAMING_HOSTS: &[&str] = &[
        "youtube.com", "youtu.be", "vimeo.com", "dailymotion.com", "twitch.tv",
        "twitter.com", "x.com", "instagram.com", "tiktok.com", "facebook.com",
        "fb.watch", "reddit.com", "soundcloud.com", "bilibili.com", "streamable.com",
    ];
}
