pub mod aggregation;
pub mod guard;
pub mod orchestrator;
pub mod scheduler;

pub use guard::{BatchState, RunGuard};
pub use orchestrator::{BatchOrchestrator, BatchOutcome, BatchReport};
pub use scheduler::BatchScheduler;
