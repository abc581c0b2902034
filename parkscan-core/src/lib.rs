pub mod config;
pub mod dispatch;
pub mod report;

pub use config::{MIN_THREADING_INPUT_SIZE, OutputFormat, RunConfig, WorkerPolicy};
pub use dispatch::{ScanSummary, check_target, execute_scan, normalize_target, partition, worker_count};
pub use report::{Reporter, TargetStatus};
