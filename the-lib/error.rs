use std::fmt;

use thiserror::Error;

/// Result type for region history operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The external query an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
  /// Whole-file diff of the working copy against the last commit.
  WorkingDiff,
  /// Line-range log over every commit that touched the region.
  LineLog,
}

impl fmt::Display for Query {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::WorkingDiff => f.write_str("working copy diff"),
      Self::LineLog => f.write_str("line range log"),
    }
  }
}

/// Errors that can occur while walking the history of a region.
///
/// None of them are fatal for the host: the walk that produced the error is
/// abandoned (or, for [`Error::HistoryExhausted`], simply cannot continue) and
/// the next non-repeat invocation starts over.
#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid line range {start}-{end}")]
  InvalidRange { start: usize, end: usize },
  #[error("selection not found in history (lines {start}-{end})")]
  NoMapping { start: usize, end: usize },
  #[error("no more history for this region")]
  HistoryExhausted,
  #[error("{query} failed: {reason}")]
  QueryFailed { query: Query, reason: String },
}

impl Error {
  pub fn query_failed(query: Query, reason: impl Into<String>) -> Self {
    Self::QueryFailed {
      query,
      reason: reason.into(),
    }
  }
}
