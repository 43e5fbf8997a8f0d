// src/task/progress.rs

//! Status message rendering and the fixed-cadence refresh loop.

use super::coordinator::TaskSlot;
use crate::{
    chat::ChatSurface,
    transfer::{Phase, ProgressUpdate},
    utils,
};
use indicatif::{HumanBytes, HumanDuration};
use log::debug;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

const BAR_WIDTH: usize = 12;

/// Bytes per second between two renders of the same item.
#[derive(Default)]
struct SpeedMeter {
    last: Option<(Phase, String, u64, Instant)>,
}

impl SpeedMeter {
    fn sample(&mut self, update: &ProgressUpdate) -> f64 {
        let now = Instant::now();
        let speed = match &self.last {
            Some((phase, name, done, at))
                if *phase == update.phase && *name == update.name && update.done >= *done =>
            {
                let secs = now.duration_since(*at).as_secs_f64();
                if secs > 0.0 { (update.done - done) as f64 / secs } else { 0.0 }
            }
            _ => 0.0,
        };
        self.last = Some((update.phase, update.name.clone(), update.done, now));
        speed
    }
}

fn bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn render_progress(update: &ProgressUpdate, speed: f64) -> String {
    let head = format!(
        "<b>{}</b>\n\n<code>{}</code>\n\n",
        update.phase,
        utils::truncate_text(&update.name, 60)
    );
    if update.total == 0 {
        return format!("{}{} done", head, HumanBytes(update.done));
    }
    let eta = if speed > 0.0 {
        let left = update.total.saturating_sub(update.done) as f64 / speed;
        HumanDuration(Duration::from_secs_f64(left)).to_string()
    } else {
        "-".to_string()
    };
    format!(
        "{}[{}] {:.1}%\n{} of {} | {}/s | ETA {}",
        head,
        bar(update.percent()),
        update.percent(),
        HumanBytes(update.done),
        HumanBytes(update.total),
        HumanBytes(speed as u64),
        eta
    )
}

pub fn render_cancelled(reason: &str, spent: Duration) -> String {
    format!(
        "<b>TASK STOPPED ❌</b>\n\n<b>Reason:</b> {}\n<b>Spent:</b> {}",
        reason,
        utils::format_elapsed(spent.as_secs())
    )
}

pub fn render_completed(name: &str, files: usize, bytes: u64, spent: Duration) -> String {
    format!(
        "<b>TASK COMPLETED ✅</b>\n\n<code>{}</code>\n\n<b>Files:</b> {}\n<b>Size:</b> {}\n<b>Spent:</b> {}",
        name,
        files,
        utils::format_size(bytes),
        utils::format_elapsed(spent.as_secs())
    )
}

/// Every `cadence`, renders the newest unseen update and edits the status
/// message while the slot is running. Stops when `stop` fires.
pub fn spawn_reporter(
    mut rx: watch::Receiver<Option<ProgressUpdate>>,
    chat: Arc<dyn ChatSurface>,
    slot: Arc<TaskSlot>,
    cadence: Duration,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut meter = SpeedMeter::default();
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    if !rx.has_changed().unwrap_or(false) {
                        continue;
                    }
                    let Some(update) = rx.borrow_and_update().clone() else { continue };
                    if !slot.is_running() {
                        continue;
                    }
                    let text = render_progress(&update, meter.sample(&update));
                    if let Err(e) = chat.edit_status(&text).await {
                        debug!("Progress edit skipped: {}", e);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppResult, transfer::progress_channel};
    use async_trait::async_trait;
    use std::{path::Path, sync::Mutex};

    #[derive(Default)]
    struct EditLog(Mutex<Vec<String>>);

    #[async_trait]
    impl ChatSurface for EditLog {
        async fn edit_status(&self, text: &str) -> AppResult<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_message(&self, _text: &str) -> AppResult<()> {
            Ok(())
        }

        async fn upload_file(&self, _: &Path, _: &str, _: Option<&Path>, _: bool) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reporter_shows_newest_update_after_a_burst() {
        let slot = Arc::new(TaskSlot::default());
        slot.accept(vec!["https://host/f.bin".to_string()]).unwrap();
        slot.begin(CancellationToken::new()).unwrap();

        let (tx, rx) = progress_channel();
        for done in 0..=100 {
            tx.push(ProgressUpdate::new(Phase::Downloading, "f.bin", done, 100));
        }
        let chat = Arc::new(EditLog::default());
        let stop = CancellationToken::new();
        let reporter = spawn_reporter(rx, chat.clone(), slot, Duration::from_millis(10), stop.clone());
        time::sleep(Duration::from_millis(60)).await;
        stop.cancel();
        reporter.await.unwrap();

        // one edit for the whole burst, showing where the transfer ended
        let edits = chat.0.lock().unwrap().clone();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].contains("100.0%"));
    }

    #[test]
    fn test_render_progress_with_known_total() {
        let update = ProgressUpdate::new(Phase::Uploading { index: 2, total: 3 }, "a.mkv", 512, 1024);
        let text = render_progress(&update, 0.0);
        assert!(text.starts_with("<b>📤 UPLOADING  2/3</b>"));
        assert!(text.contains("[██████░░░░░░] 50.0%"));
        assert!(text.contains("ETA -"));
    }

    #[test]
    fn test_render_progress_unknown_total() {
        let update = ProgressUpdate::new(Phase::Downloading, "clip", 2048, 0);
        assert!(render_progress(&update, 0.0).ends_with("2.00 KiB done"));
    }

    #[test]
    fn test_render_cancelled() {
        let text = render_cancelled("Directory not found.", Duration::from_secs(65));
        assert_eq!(
            text,
            "<b>TASK STOPPED ❌</b>\n\n<b>Reason:</b> Directory not found.\n<b>Spent:</b> 1m 5s"
        );
    }

    #[test]
    fn test_speed_meter_resets_on_new_item() {
        let mut meter = SpeedMeter::default();
        let first = ProgressUpdate::new(Phase::Downloading, "a", 0, 100);
        assert_eq!(meter.sample(&first), 0.0);
        let other = ProgressUpdate::new(Phase::Downloading, "b", 50, 100);
        assert_eq!(meter.sample(&other), 0.0);
    }
}
