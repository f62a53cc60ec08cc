use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{CoordinatorError, ValidationError};

pub type UploadId = u64;

/// Local file handed to the upload transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    pub path: PathBuf,
    pub byte_len: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Complete,
    Error,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Complete => "complete",
            UploadStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub id: UploadId,
    pub display_name: String,
    pub source: UploadSource,
    pub folder: Option<String>,
    pub status: UploadStatus,
    pub progress_percent: u8,
    pub last_error: Option<String>,
    /// Bumped on every (re)start; callbacks carrying an older attempt are dropped.
    pub attempt: u32,
}

/// What the transport needs to start (or restart) one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStart {
    pub task_id: UploadId,
    pub attempt: u32,
    pub display_name: String,
    pub source: UploadSource,
    pub folder: Option<String>,
}

/// Tracks concurrent uploads and aggregates their progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadQueue {
    next_id: UploadId,
    tasks: BTreeMap<UploadId, UploadTask>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(
        &mut self,
        display_name: &str,
        source: UploadSource,
        folder: Option<String>,
    ) -> Result<UploadStart, ValidationError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::EmptyFileName);
        }
        if source.byte_len == 0 {
            return Err(ValidationError::EmptyFile(display_name.to_string()));
        }

        self.next_id += 1;
        let task = UploadTask {
            id: self.next_id,
            display_name: display_name.to_string(),
            source,
            folder,
            status: UploadStatus::Pending,
            progress_percent: 0,
            last_error: None,
            attempt: 1,
        };
        let start = start_of(&task);
        self.tasks.insert(task.id, task);
        Ok(start)
    }

    /// Applies a progress callback. Returns false when the callback is stale.
    pub fn update_progress(&mut self, id: UploadId, attempt: u32, percent: u8) -> bool {
        let Some(task) = self.live_task_mut(id, attempt) else {
            return false;
        };
        if matches!(task.status, UploadStatus::Complete | UploadStatus::Error) {
            return false;
        }
        task.status = UploadStatus::Uploading;
        task.progress_percent = task.progress_percent.max(percent.min(100));
        true
    }

    pub fn mark_complete(&mut self, id: UploadId, attempt: u32) -> Option<&UploadTask> {
        let task = self.live_task_mut(id, attempt)?;
        task.status = UploadStatus::Complete;
        task.progress_percent = 100;
        task.last_error = None;
        Some(task)
    }

    pub fn mark_error(
        &mut self,
        id: UploadId,
        attempt: u32,
        message: impl Into<String>,
    ) -> Option<&UploadTask> {
        let task = self.live_task_mut(id, attempt)?;
        task.status = UploadStatus::Error;
        task.last_error = Some(message.into());
        Some(task)
    }

    /// Re-issues a failed upload under the same id.
    pub fn retry(&mut self, id: UploadId) -> Result<UploadStart, CoordinatorError> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(CoordinatorError::UnknownTask(id))?;
        if task.status != UploadStatus::Error {
            return Err(CoordinatorError::NotRetryable {
                id,
                status: task.status.as_str(),
            });
        }
        task.status = UploadStatus::Pending;
        task.progress_percent = 0;
        task.last_error = None;
        task.attempt += 1;
        Ok(start_of(task))
    }

    /// Removes the task; any later callback for it is discarded.
    pub fn cancel(&mut self, id: UploadId) -> Result<UploadTask, CoordinatorError> {
        self.tasks
            .remove(&id)
            .ok_or(CoordinatorError::UnknownTask(id))
    }

    pub fn remove(&mut self, id: UploadId) -> Option<UploadTask> {
        self.tasks.remove(&id)
    }

    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks
            .retain(|_, task| task.status != UploadStatus::Complete);
        before - self.tasks.len()
    }

    /// Unweighted mean of the tracked tasks' progress, 0 when none are tracked.
    pub fn overall_progress(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        let sum: u64 = self
            .tasks
            .values()
            .map(|task| u64::from(task.progress_percent))
            .sum();
        sum as f64 / self.tasks.len() as f64
    }

    pub fn get(&self, id: UploadId) -> Option<&UploadTask> {
        self.tasks.get(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &UploadTask> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True while any task is pending or uploading.
    pub fn has_active(&self) -> bool {
        self.tasks.values().any(|task| {
            matches!(task.status, UploadStatus::Pending | UploadStatus::Uploading)
        })
    }

    fn live_task_mut(&mut self, id: UploadId, attempt: u32) -> Option<&mut UploadTask> {
        self.tasks
            .get_mut(&id)
            .filter(|task| task.attempt == attempt)
    }
}

fn start_of(task: &UploadTask) -> UploadStart {
    UploadStart {
        task_id: task.id,
        attempt: task.attempt,
        display_name: task.display_name.clone(),
        source: task.source.clone(),
        folder: task.folder.clone(),
    }
}
