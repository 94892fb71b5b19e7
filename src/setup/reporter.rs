/**
 * Terminal Progress Reporter
 *
 * Consumes `Progress` events from the fetch pipeline and draws one
 * indicatif bar per resource. With bars disabled the events are only
 * folded into the overall progress and logged at debug level.
 */

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::pipeline::PHASE_EXTRACT;
use super::progress::{OverallProgress, Progress, ProgressStatus};

const DOWNLOAD_TEMPLATE: &str = concat!(
    "{spinner:.green} {prefix:>14} [{bar:40.cyan/blue}] ",
    "{bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}"
);
const EXTRACT_TEMPLATE: &str =
    "{spinner:.green} {prefix:>14} [{elapsed_precise}] {pos} entries {msg}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

struct Bars {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl Bars {
    fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
        }
    }

    fn bar(&mut self, progress: &Progress) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(progress.task_id.clone()).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new(0));
            bar.set_style(style(DOWNLOAD_TEMPLATE));
            bar.set_prefix(progress.task_name.clone());
            bar
        })
    }

    fn render(&mut self, progress: &Progress) {
        let bar = self.bar(progress);
        match &progress.status {
            ProgressStatus::Pending => bar.set_message("pending"),
            ProgressStatus::InProgress => {
                if progress.message.as_deref() == Some(PHASE_EXTRACT) {
                    bar.set_style(style(EXTRACT_TEMPLATE));
                    bar.set_message(PHASE_EXTRACT);
                } else {
                    bar.set_message("");
                }
                if progress.total > 0 {
                    bar.set_length(progress.total);
                }
                bar.set_position(progress.current);
            }
            ProgressStatus::Completed => {
                let message = progress.message.clone().unwrap_or_else(|| "done".to_string());
                bar.finish_with_message(message)
            }
            ProgressStatus::Failed(e) => bar.abandon_with_message(format!("failed: {}", e)),
            ProgressStatus::Cancelled => bar.abandon_with_message("cancelled"),
        }
    }
}

/// Spawn the reporter task. It finishes once every sender is dropped and
/// returns the final overall progress.
pub fn spawn_reporter(
    mut rx: mpsc::Receiver<Progress>,
    tasks: Vec<Progress>,
    draw_bars: bool,
) -> JoinHandle<OverallProgress> {
    tokio::spawn(async move {
        let mut overall = OverallProgress::new(tasks);
        let mut bars = draw_bars.then(Bars::new);

        while let Some(progress) = rx.recv().await {
            tracing::debug!(
                "[Progress] {} {:?} {}/{} ({:.1}% overall)",
                progress.task_id,
                progress.status,
                progress.current,
                progress.total,
                overall.overall_percentage()
            );
            if let Some(bars) = bars.as_mut() {
                bars.render(&progress);
            }
            overall.update(progress);
        }

        overall
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reporter_folds_events() {
        let (tx, rx) = mpsc::channel(16);
        let tasks = vec![Progress::pending("a", "a"), Progress::pending("b", "b")];
        let handle = spawn_reporter(rx, tasks, false);

        tx.send(Progress::in_progress("a", "a", 5, 10)).await.unwrap();
        tx.send(Progress::completed("a", "a")).await.unwrap();
        tx.send(Progress::completed("b", "b")).await.unwrap();
        drop(tx);

        let overall = handle.await.unwrap();
        assert!(overall.is_complete);
        assert_eq!(overall.overall_percentage(), 100.0);
    }
}
