//! Core domain model types for cdrflow.
//!
//! This module contains the status contract shared by the workflow engine
//! and its collaborators:
//! - Stage status and kind enums
//! - Stage result type with factory methods
//! - The accumulated workflow payload

mod payload;
mod result;
mod status;

pub use payload::WorkflowPayload;
pub use result::StageResult;
pub use status::{StageKind, StageStatus};
