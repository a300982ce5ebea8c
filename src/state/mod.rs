//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PipelineState`: the orchestrator's shutdown state machine
//! - `WalkOutcome`: why the listing walker stopped
//! - `ItemBudget`: the walker's remaining item cap

mod item_budget;
mod pipeline_state;
mod walk_outcome;

// Re-export main types
pub use item_budget::ItemBudget;
pub use pipeline_state::PipelineState;
pub use walk_outcome::WalkOutcome;
