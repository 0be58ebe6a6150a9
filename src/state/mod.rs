//! State module for tracking scrape progress
//!
//! # Components
//!
//! - `PaginationState`: where the search-page walk currently is
//! - `ExhaustReason`: why the walk stopped
//! - `RunContext`: per-run cancellation signal and progress counters

mod context;
mod pagination;

// Re-export main types
pub use context::{CounterSnapshot, RunContext, RunCounters};
pub use pagination::{ExhaustReason, PaginationState};
