//! Generic polling workflow engine.
//!
//! One component drives every pipeline: for each stage in order it starts
//! the remote work, waits, checks, and either retries, advances or aborts
//! to the notifier.
//!
//! ```text
//! Start(i) -> Wait(i) -> Check(i) -> Branch(i)
//!                ^                     |  failure      -> Notify -> Done
//!                +---- not complete ---+  complete     -> Start(i+1) | Notify
//! ```

mod builder;
mod instance;
mod machine;
mod run;

mod integration_tests;

pub use builder::{WorkflowBuilder, DEFAULT_WORKFLOW_TIMEOUT};
pub use instance::{WorkflowInstance, WorkflowState};
pub use machine::PollingWorkflow;
pub use run::{RunStats, WorkflowOutcome, WorkflowRun};
