//! Scheduler for managing the crawl frontier
//!
//! This module handles:
//! - The FIFO queue of listings waiting to be fetched
//! - The per-worker state board used to detect the end of a crawl
//! - Loop protection (a URL is enqueued at most once per run)
//! - Depth limiting
//!
//! The queue, the board and the visited set share one lock. A worker claims a
//! job and becomes busy in the same critical section, and only goes idle after
//! enqueueing the children of that job, so "queue empty and every worker
//! idle" seen under the lock means the crawl is finished.

use crate::state::WorkerState;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// A listing waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    /// Absolute URL of the listing
    pub url: String,

    /// Number of links followed from a seed (seeds are 0)
    pub depth: u32,
}

impl CrawlJob {
    /// Creates a job for a seed URL
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
        }
    }

    /// Creates a job for a listing linked from this one
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: self.depth + 1,
        }
    }
}

/// Why a job was not added to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// The job was queued
    Queued,
    /// The URL was already queued earlier in this run
    AlreadySeen,
    /// The job is deeper than the depth limit
    TooDeep,
}

struct Board {
    frontier: VecDeque<CrawlJob>,
    workers: Vec<WorkerState>,
    seen: HashSet<String>,
}

/// Scheduler shared by the controller and every fetch worker
pub struct Scheduler {
    board: Mutex<Board>,
    notify: Notify,
    max_depth: Option<u32>,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `worker_count` - Number of fetch workers that will claim jobs
    /// * `max_depth` - Deepest job accepted, or None for no limit
    pub fn new(worker_count: usize, max_depth: Option<u32>) -> Self {
        Self {
            board: Mutex::new(Board {
                frontier: VecDeque::new(),
                workers: vec![WorkerState::Idle; worker_count],
                seen: HashSet::new(),
            }),
            notify: Notify::new(),
            max_depth,
        }
    }

    fn board(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a job to the back of the frontier
    pub fn enqueue(&self, job: CrawlJob) -> EnqueueResult {
        if let Some(max_depth) = self.max_depth {
            if job.depth > max_depth {
                debug!(url = %job.url, depth = job.depth, max_depth, "Skipping listing beyond depth limit");
                return EnqueueResult::TooDeep;
            }
        }

        {
            let mut board = self.board();
            if !board.seen.insert(job.url.clone()) {
                return EnqueueResult::AlreadySeen;
            }
            board.frontier.push_back(job);
        }

        self.notify.notify_one();
        EnqueueResult::Queued
    }

    /// Returns true if the URL was enqueued earlier in this run
    pub fn has_seen(&self, url: &str) -> bool {
        self.board().seen.contains(url)
    }

    /// Takes the next job and marks the worker as fetching
    pub fn claim(&self, worker: usize) -> Option<CrawlJob> {
        let mut board = self.board();
        let job = board.frontier.pop_front()?;
        if let Some(state) = board.workers.get_mut(worker) {
            *state = WorkerState::Fetching;
        }
        Some(job)
    }

    /// Takes the next job, waiting up to `timeout` for one to arrive
    pub async fn claim_timeout(&self, worker: usize, timeout: Duration) -> Option<CrawlJob> {
        if let Some(job) = self.claim(worker) {
            return Some(job);
        }

        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
        self.claim(worker)
    }

    /// Publishes what a worker is doing
    pub fn set_state(&self, worker: usize, state: WorkerState) {
        if let Some(slot) = self.board().workers.get_mut(worker) {
            *slot = state;
        }
    }

    /// Marks a worker as done with its job
    ///
    /// Must only be called after the job's children have been enqueued.
    pub fn release(&self, worker: usize) {
        self.set_state(worker, WorkerState::Idle);
    }

    /// Returns true if no job is queued and every worker is idle
    pub fn is_drained(&self) -> bool {
        let board = self.board();
        board.frontier.is_empty() && board.workers.iter().all(WorkerState::is_idle)
    }

    /// Gets the number of queued jobs
    pub fn frontier_size(&self) -> usize {
        self.board().frontier.len()
    }

    /// Gets the number of busy workers
    pub fn busy_workers(&self) -> usize {
        self.board().workers.iter().filter(|s| s.is_busy()).count()
    }

    /// Gets the number of distinct URLs enqueued so far
    pub fn seen_count(&self) -> usize {
        self.board().seen.len()
    }

    /// Wakes every worker waiting for a job
    pub fn wake_all(&self) {
        self.notify.notify_waiters();
    }
}
