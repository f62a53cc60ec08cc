//! Drive engine: REST gateway, upload transport, timers and effect execution.
mod engine;
mod gateway;
mod persist;
mod timer;
mod types;
mod upload;

pub use engine::{EngineCommand, EngineHandle, MutationRequest};
pub use gateway::{DriveGateway, GatewaySettings, ReqwestGateway};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use timer::{Debouncer, TimerHandle};
pub use types::{
    AiAnswer, AiSource, AutoTags, BulkAction, DriveContents, EngineEvent, FailureKind,
    FilePreview, FileVersion, GatewayError, GeneratedDocument, LargestFile, RemoteFile,
    RemoteFolder, RemoteTarget, SearchResults, ShareStatus, SharedFile, StorageAnalytics,
    TagCount, TypeUsage,
};
pub use tokio_util::sync::CancellationToken;
pub use upload::{ChannelProgressSink, ProgressSink, UploadRequest};
