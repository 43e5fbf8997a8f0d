// src/transfer.rs

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::watch;

/// Aggregate byte counters for the running task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSnapshot {
    pub total_download_size: u64,
    pub downloaded_bytes: Vec<u64>,
    pub uploaded_bytes: Vec<u64>,
    pub sent_file_names: Vec<String>,
}

impl TransferSnapshot {
    pub fn downloaded(&self) -> u64 {
        self.downloaded_bytes.iter().sum()
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded_bytes.iter().sum()
    }
}

/// Shared handle; clones point at the same counters.
#[derive(Clone, Default)]
pub struct TransferState {
    inner: Arc<Mutex<TransferSnapshot>>,
}

impl TransferState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TransferSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self) {
        *self.lock() = TransferSnapshot::default();
    }

    pub fn set_total_size(&self, bytes: u64) {
        self.lock().total_download_size = bytes;
    }

    pub fn total_size(&self) -> u64 {
        self.lock().total_download_size
    }

    pub fn record_download(&self, bytes: u64) {
        self.lock().downloaded_bytes.push(bytes);
    }

    pub fn record_upload(&self, bytes: u64, name: &str) {
        let mut state = self.lock();
        state.uploaded_bytes.push(bytes);
        state.sent_file_names.push(name.to_string());
    }

    pub fn snapshot(&self) -> TransferSnapshot {
        self.lock().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Downloading,
    Converting,
    Compressing,
    Extracting,
    Splitting,
    /// 1-based position in the flattened upload queue
    Uploading { index: usize, total: usize },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Downloading => f.write_str("📥 DOWNLOADING"),
            Phase::Converting => f.write_str("🔄 CONVERTING"),
            Phase::Compressing => f.write_str("🗜️ COMPRESSING"),
            Phase::Extracting => f.write_str("📂 EXTRACTING"),
            Phase::Splitting => f.write_str("✂️ SPLITTING"),
            Phase::Uploading { index, total } if *total > 1 => {
                write!(f, "📤 UPLOADING  {}/{}", index, total)
            }
            Phase::Uploading { .. } => f.write_str("📤 UPLOADING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub name: String,
    pub done: u64,
    /// Zero when the backend does not know the size
    pub total: u64,
}

impl ProgressUpdate {
    pub fn new(phase: Phase, name: impl Into<String>, done: u64, total: u64) -> Self {
        Self {
            phase,
            name: name.into(),
            done,
            total,
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.done as f64 * 100.0 / self.total as f64).min(100.0)
        }
    }
}

/// Producer side of the progress channel. Pushing never blocks and replaces
/// whatever the reporter has not seen yet, so the newest update always wins.
#[derive(Clone, Debug)]
pub struct ProgressSender {
    tx: Arc<watch::Sender<Option<ProgressUpdate>>>,
}

impl ProgressSender {
    pub fn push(&self, update: ProgressUpdate) {
        self.tx.send_replace(Some(update));
    }

    /// A sender whose updates go nowhere.
    pub fn detached() -> Self {
        progress_channel().0
    }
}

pub fn progress_channel() -> (ProgressSender, watch::Receiver<Option<ProgressUpdate>>) {
    let (tx, rx) = watch::channel(None);
    (ProgressSender { tx: Arc::new(tx) }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_everything() {
        let state = TransferState::new();
        state.set_total_size(100);
        state.record_download(40);
        state.record_upload(30, "a.mkv");
        let snap = state.snapshot();
        assert_eq!(snap.downloaded(), 40);
        assert_eq!(snap.uploaded(), 30);
        assert_eq!(snap.sent_file_names, vec!["a.mkv".to_string()]);

        state.reset();
        assert_eq!(state.snapshot(), TransferSnapshot::default());
    }

    #[test]
    fn test_newest_update_wins_between_drains() {
        let (tx, mut rx) = progress_channel();
        for i in 0..=100 {
            tx.push(ProgressUpdate::new(Phase::Downloading, "f", i, 100));
        }
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone().unwrap();
        assert_eq!(seen.done, 100);
        assert!(!rx.has_changed().unwrap());

        tx.push(ProgressUpdate::new(Phase::Uploading { index: 1, total: 1 }, "f", 5, 10));
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().done, 5);
    }

    #[test]
    fn test_detached_sender_accepts_updates() {
        ProgressSender::detached().push(ProgressUpdate::new(Phase::Splitting, "x", 1, 2));
    }

    #[test]
    fn test_percent_caps_at_hundred() {
        assert_eq!(ProgressUpdate::new(Phase::Extracting, "x", 5, 0).percent(), 0.0);
        assert_eq!(ProgressUpdate::new(Phase::Extracting, "x", 15, 10).percent(), 100.0);
    }
}
