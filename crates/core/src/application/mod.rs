// Application Layer - Use Cases and Business Logic

pub mod aggregator;
pub mod orchestrator;
pub mod planner;
pub mod settings;
pub mod worker;

// Re-exports
pub use aggregator::{Aggregator, ErrorReport, ProgressReport};
pub use orchestrator::{DispatchRun, Orchestrator, Snapshot};
pub use planner::{plan, AccountQueue, DistributionPlan};
pub use settings::DispatchSettings;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
