//! State module for tracking crawl progress
//!
//! Holds the per-worker state machine the scheduler uses to tell a paused
//! crawl from a finished one.

mod worker_state;

pub use worker_state::WorkerState;
