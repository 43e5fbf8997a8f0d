// src/logging.rs

use crate::{cli::LogLevel, config::file::config_dir, constants};
use log::warn;
use std::path::PathBuf;

fn level_filter(level: LogLevel) -> log::LevelFilter {
    match level {
        LogLevel::Off => log::LevelFilter::Off,
        LogLevel::Error => log::LevelFilter::Error,
        LogLevel::Warn => log::LevelFilter::Warn,
        LogLevel::Info => log::LevelFilter::Info,
        LogLevel::Debug => log::LevelFilter::Debug,
        LogLevel::Trace => log::LevelFilter::Trace,
    }
}

fn log_file_path(app_name: &str) -> PathBuf {
    match config_dir() {
        Ok(dir) => dir.join(constants::LOG_DIR_NAME).join(format!("{}.log", app_name)),
        Err(_) => {
            eprintln!("Warning: home directory not found, logging to the temp directory.");
            std::env::temp_dir().join(app_name).join(format!("{}.log", app_name))
        }
    }
}

/// File logging only; the terminal belongs to the status output.
pub fn init_logging(level: LogLevel, app_name: &str) {
    let filter = level_filter(level);
    if filter == log::LevelFilter::Off {
        return;
    }

    let log_path = log_file_path(app_name);
    if let Some(dir) = log_path.parent()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("Warning: could not create log directory {:?}: {}", dir, e);
    }

    let file = match fern::log_file(&log_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}. Trying the fallback.", log_path, e);
            let fallback =
                std::env::temp_dir().join(format!("{}-{}", app_name, constants::LOG_FALLBACK_FILE_NAME));
            match fern::log_file(&fallback) {
                Ok(file) => {
                    warn!("Logging to fallback file {:?}", fallback);
                    file
                }
                Err(e) => {
                    eprintln!("Error: no usable log file ({:?}: {}). File logging disabled.", fallback, e);
                    return;
                }
            }
        }
    };

    let result = fern::Dispatch::new()
        .level(filter)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{:<5}] [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .chain(file)
        .apply();

    if let Err(e) = result {
        eprintln!("Warning: logger initialisation failed: {}", e);
    }
}
