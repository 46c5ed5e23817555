// Watermarks, resume progress and the execution log

pub mod execution;
pub mod manager;
pub mod progress;
pub mod watermark;

pub use execution::{ExecutionLogEntry, RunStatus};
pub use manager::StateManager;
pub use progress::{ResumeProgress, SYNC_JOB_TYPE};
pub use watermark::{Watermark, WatermarkBuilder};
