pub mod job;
pub mod log;
pub mod naming;

pub use job::{ExportJob, ExportPlan, ExportResult, PlannedJob};
pub use log::{ConsoleEcho, JobLog, LogTarget};
pub use naming::{sanitize_name, CollisionPolicy, DatePattern, OutputFolderNamer};
