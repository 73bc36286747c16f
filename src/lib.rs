pub mod batch;
pub mod engine;
pub mod runtime;

pub use batch::item::{ItemStatus, ResultRecord, WorkItem};
pub use batch::queue::ItemQueue;
pub use engine::report::{BatchReport, ReportItem};
pub use engine::run::{BatchEngine, BatchHandle, SubmitError};
pub use runtime::config::{EngineConfig, EngineConfigBuilder, EngineConfigParams};
pub use runtime::operation::{BatchOperation, FnOperation, OperationError, OperationFuture};
pub use runtime::progress::{ProgressBoard, ProgressSnapshot, StatusCounts};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
