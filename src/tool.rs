// src/tool.rs

//! Thin wrapper over external command-line tools (ffmpeg, ffprobe, yt-dlp, aria2c, 7z).

use crate::error::{AppError, AppResult};
use log::{debug, warn};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};
use tokio_util::sync::CancellationToken;

const STDERR_TAIL_LINES: usize = 6;

#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> AppError {
        AppError::ToolFailed {
            tool: self.program.clone(),
            status: "failed to start".into(),
            stderr: e.to_string(),
        }
    }

    /// Runs to completion and returns stdout. A non-zero exit or a timeout is an error.
    pub async fn output(&self, timeout: Option<Duration>) -> AppResult<String> {
        debug!("Running {} {:?}", self.program, self.args);
        let child = self.build().spawn().map_err(|e| self.spawn_error(e))?;
        let waited = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| AppError::ToolFailed {
                    tool: self.program.clone(),
                    status: format!("timeout after {}s", limit.as_secs()),
                    stderr: String::new(),
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited?;
        if !output.status.success() {
            return Err(AppError::ToolFailed {
                tool: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Runs the tool, feeding every stdout line (split on `\n`, `\r` or backspace) to
    /// `on_line`. Cancelling the token kills the child.
    pub async fn run_streaming<F>(&self, cancel: &CancellationToken, mut on_line: F) -> AppResult<()>
    where
        F: FnMut(&str),
    {
        debug!("Running {} {:?}", self.program, self.args);
        let mut child = self.build().spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut buf).await;
            }
            buf
        });

        let pump = async {
            if let Some(pipe) = stdout {
                read_lines(pipe, &mut on_line).await;
            }
            child.wait().await
        };

        let status = tokio::select! {
            status = pump => status?,
            _ = cancel.cancelled() => {
                warn!("{} cancelled, killing child process", self.program);
                return Err(AppError::UserCancelled);
            }
        };

        let stderr = stderr_reader.await.unwrap_or_default();
        if !status.success() {
            return Err(AppError::ToolFailed {
                tool: self.program.clone(),
                status: status.to_string(),
                stderr: stderr_tail(&stderr),
            });
        }
        Ok(())
    }
}

async fn read_lines<R, F>(mut pipe: R, on_line: &mut F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut buf = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let n = match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        for &byte in &buf[..n] {
            if matches!(byte, b'\n' | b'\r' | 0x08) {
                if !pending.is_empty() {
                    on_line(String::from_utf8_lossy(&pending).trim());
                    pending.clear();
                }
            } else {
                pending.push(byte);
            }
        }
    }
    if !pending.is_empty() {
        on_line(String::from_utf8_lossy(&pending).trim());
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
