// src/processing/split.rs

use crate::{
    error::AppResult,
    transfer::{Phase, ProgressSender, ProgressUpdate},
};
use log::info;
use std::path::{Path, PathBuf};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};

const COPY_BUFFER: usize = 1024 * 1024;

/// Cuts `file` into `name.001`, `name.002`, ... parts of at most `part_size` bytes
/// inside `dest_dir`. Files that already fit return `None` and are left alone.
pub async fn split_file(
    file: &Path,
    dest_dir: &Path,
    part_size: u64,
    progress: &ProgressSender,
) -> AppResult<Option<Vec<PathBuf>>> {
    let total = tokio::fs::metadata(file).await?.len();
    if part_size == 0 || total <= part_size {
        return Ok(None);
    }
    tokio::fs::create_dir_all(dest_dir).await?;

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "part".to_string());
    let mut reader = File::open(file).await?;
    let mut buf = vec![0u8; COPY_BUFFER];
    let mut parts = Vec::new();
    let mut done = 0u64;

    while done < total {
        let part_path = dest_dir.join(format!("{}.{:03}", name, parts.len() + 1));
        let mut writer = File::create(&part_path).await?;
        let mut written = 0u64;
        while written < part_size {
            let want = (part_size - written).min(buf.len() as u64) as usize;
            let n = reader.read(&mut buf[..want]).await?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).await?;
            written += n as u64;
            done += n as u64;
            progress.push(ProgressUpdate::new(Phase::Splitting, name.clone(), done, total));
        }
        writer.flush().await?;
        if written == 0 {
            // source shrank while splitting
            drop(writer);
            tokio::fs::remove_file(&part_path).await?;
            break;
        }
        parts.push(part_path);
    }
    info!("Split {} into {} parts", file.display(), parts.len());
    Ok(Some(parts))
}
