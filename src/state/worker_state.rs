/// Worker state definitions for tracking crawl progress
///
/// Every fetch worker publishes its current state on the scheduler's board.
/// The crawl is finished once the frontier is empty and every worker is idle.
use std::fmt;

/// Represents what a crawl worker is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkerState {
    /// Waiting for a job from the frontier
    #[default]
    Idle,

    /// Downloading a directory listing
    Fetching,

    /// Pulling anchors out of a fetched listing
    ExtractingLinks,

    /// Deciding whether each link is a listing or a file
    Classifying,
}

impl WorkerState {
    /// Returns true if the worker holds no job
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if the worker holds a job that may still produce children
    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }

    /// Short lowercase label used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::ExtractingLinks => "extracting_links",
            Self::Classifying => "classifying",
        }
    }

    /// Returns the state that follows this one in the worker loop
    pub fn next(&self) -> Self {
        match self {
            Self::Idle => Self::Fetching,
            Self::Fetching => Self::ExtractingLinks,
            Self::ExtractingLinks => Self::Classifying,
            Self::Classifying => Self::Idle,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
