/**
 * Progress Reporting Module
 *
 * Handles progress tracking and reporting for downloads and extraction.
 */
use serde::{Deserialize, Serialize};

/// Progress status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProgressStatus {
    /// Waiting to start
    Pending,
    /// Currently in progress
    InProgress,
    /// Successfully completed
    Completed,
    /// Failed with error
    Failed(String),
    /// Cancelled by user
    Cancelled,
}

/// Progress of one resource through download and extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Resource name
    pub task_id: String,
    /// Label shown next to the bar
    pub task_name: String,
    /// Current status
    pub status: ProgressStatus,
    /// Current progress value (bytes downloaded, entries extracted, etc.)
    pub current: u64,
    /// Total expected value (0 when unknown)
    pub total: u64,
    /// Bytes per second, download phase only
    pub speed_bps: Option<u64>,
    /// Estimated time remaining in seconds
    pub eta_seconds: Option<u64>,
    /// Phase (`downloading`/`extracting`) or error text
    pub message: Option<String>,
}

impl Progress {
    fn new(task_id: &str, task_name: &str, status: ProgressStatus) -> Self {
        Self {
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
            status,
            current: 0,
            total: 0,
            speed_bps: None,
            eta_seconds: None,
            message: None,
        }
    }

    /// Create a new pending progress
    pub fn pending(task_id: &str, task_name: &str) -> Self {
        Self::new(task_id, task_name, ProgressStatus::Pending)
    }

    /// Create a new in-progress progress
    pub fn in_progress(task_id: &str, task_name: &str, current: u64, total: u64) -> Self {
        Self {
            current,
            total,
            ..Self::new(task_id, task_name, ProgressStatus::InProgress)
        }
    }

    /// Create a completed progress
    pub fn completed(task_id: &str, task_name: &str) -> Self {
        Self::new(task_id, task_name, ProgressStatus::Completed)
    }

    /// Create a failed progress
    pub fn failed(task_id: &str, task_name: &str, error: &str) -> Self {
        Self {
            message: Some(error.to_string()),
            ..Self::new(task_id, task_name, ProgressStatus::Failed(error.to_string()))
        }
    }

    /// Create a cancelled progress
    pub fn cancelled(task_id: &str, task_name: &str) -> Self {
        Self::new(task_id, task_name, ProgressStatus::Cancelled)
    }

    /// Progress percentage (0-100); completed tasks are always at 100
    pub fn percentage(&self) -> f32 {
        match self.status {
            ProgressStatus::Completed => 100.0,
            _ if self.total == 0 => 0.0,
            _ => (self.current as f32 / self.total as f32 * 100.0).min(100.0),
        }
    }

    /// Update with speed and ETA calculation
    pub fn with_speed(mut self, speed_bps: u64) -> Self {
        self.speed_bps = Some(speed_bps);
        if speed_bps > 0 && self.total > self.current {
            self.eta_seconds = Some((self.total - self.current) / speed_bps);
        }
        self
    }

    /// Add a message
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            ProgressStatus::Completed | ProgressStatus::Failed(_) | ProgressStatus::Cancelled
        )
    }
}

/// Overall fetch progress (one task per resource)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallProgress {
    /// All tasks and their progress
    pub tasks: Vec<Progress>,
    /// Last task that reported
    pub current_task_index: usize,
    /// Whether the overall fetch is complete
    pub is_complete: bool,
    /// Whether the fetch was cancelled
    pub is_cancelled: bool,
    /// Error of the failed task, if any
    pub error: Option<String>,
}

impl OverallProgress {
    pub fn new(tasks: Vec<Progress>) -> Self {
        Self {
            tasks,
            current_task_index: 0,
            is_complete: false,
            is_cancelled: false,
            error: None,
        }
    }

    /// Replace the task with the same id and track it as current
    pub fn update(&mut self, progress: Progress) {
        let Some(index) = self.tasks.iter().position(|t| t.task_id == progress.task_id) else {
            return;
        };
        // Late in-progress events must not reopen a finished task
        if self.tasks[index].is_finished() && !progress.is_finished() {
            return;
        }
        match &progress.status {
            ProgressStatus::Failed(e) => self.error = Some(e.clone()),
            ProgressStatus::Cancelled => self.is_cancelled = true,
            _ => {}
        }
        self.current_task_index = index;
        self.tasks[index] = progress;
        self.is_complete = self
            .tasks
            .iter()
            .all(|t| matches!(t.status, ProgressStatus::Completed));
    }

    /// Get overall percentage
    pub fn overall_percentage(&self) -> f32 {
        if self.tasks.is_empty() {
            return 0.0;
        }

        let total_tasks = self.tasks.len() as f32;
        let completed_tasks = self
            .tasks
            .iter()
            .filter(|t| matches!(t.status, ProgressStatus::Completed))
            .count() as f32;

        let current_task_progress = self
            .tasks
            .get(self.current_task_index)
            .filter(|t| !matches!(t.status, ProgressStatus::Completed))
            .map(|t| t.percentage() / 100.0)
            .unwrap_or(0.0);

        ((completed_tasks + current_task_progress) / total_tasks) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_and_eta() {
        let p = Progress::in_progress("lra_release", "download", 250, 1000).with_speed(50);
        assert_eq!(p.percentage(), 25.0);
        assert_eq!(p.eta_seconds, Some(15));
        assert!(!p.is_finished());

        let unknown = Progress::in_progress("aux", "download", 10, 0);
        assert_eq!(unknown.percentage(), 0.0);
    }

    #[test]
    fn test_overall_progress() {
        let mut overall = OverallProgress::new(vec![
            Progress::pending("a", "A"),
            Progress::pending("b", "B"),
        ]);
        assert_eq!(overall.overall_percentage(), 0.0);

        overall.update(Progress::completed("a", "A"));
        overall.update(Progress::in_progress("b", "B", 50, 100));
        assert_eq!(overall.overall_percentage(), 75.0);
        assert!(!overall.is_complete);

        overall.update(Progress::completed("b", "B"));
        assert!(overall.is_complete);
        assert_eq!(overall.overall_percentage(), 100.0);

        overall.update(Progress::failed("b", "B", "boom"));
        assert_eq!(overall.error.as_deref(), Some("boom"));
        assert!(!overall.is_complete);

        // unknown ids are ignored
        overall.update(Progress::cancelled("zzz", "Z"));
        assert!(!overall.is_cancelled);
    }

    #[test]
    fn test_finished_task_ignores_late_updates() {
        let mut overall = OverallProgress::new(vec![Progress::pending("a", "A")]);
        overall.update(Progress::completed("a", "A"));
        overall.update(Progress::in_progress("a", "A", 1, 10));
        assert_eq!(overall.tasks[0].status, ProgressStatus::Completed);
        assert!(overall.is_complete);
    }
}
