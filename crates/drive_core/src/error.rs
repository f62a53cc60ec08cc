use thiserror::Error;

use crate::UploadId;

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("file name must not be empty")]
    EmptyFileName,
    #[error("file \"{0}\" is empty")]
    EmptyFile(String),
    #[error("folder name must not be empty")]
    EmptyFolderName,
    #[error("name must not be empty")]
    EmptyName,
}

/// Coordinator invariant violations. These are programmer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("no upload task with id {0}")]
    UnknownTask(UploadId),
    #[error("upload task {id} cannot be retried while {status}")]
    NotRetryable { id: UploadId, status: &'static str },
}
