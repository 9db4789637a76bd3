//! Crawl engine services.
//!
//! This module contains the building blocks the orchestrator composes:
//! - Window planning (`WindowPlanner`)
//! - Pagination (`PageWalker`)
//! - Record classification (`classify`, `classify_participant`)
//! - Bot exclusion (`ExclusionFilter`)

mod classifier;
mod exclusion;
mod planner;
mod walker;

pub use classifier::{SkipReason, Verdict, classify, classify_participant};
pub use exclusion::{ExclusionFilter, ExclusionSet, ExclusionSource};
pub use planner::{WindowPlan, WindowPlanner, Windows};
pub use walker::{
    MessagePages, Page, PageFetch, PageWalker, ParticipantPages, Progress, ProgressFn, Step,
    StopReason, WalkOutcome,
};
