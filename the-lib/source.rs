use std::path::Path;

use crate::{
  error::Result,
  range::LineRange,
};

/// The two read-only queries a region walk needs from version control.
///
/// Both return the raw text the tool printed. Implementations report a tool
/// that failed to run, or exited abnormally, as
/// [`Error::QueryFailed`](crate::error::Error::QueryFailed).
pub trait HistorySource {
  /// Unified diff of the working copy of `file` against the last commit, with
  /// at least `context` lines of context around each change. Empty when there
  /// are no uncommitted edits.
  fn working_diff(&self, file: &Path, context: usize) -> Result<String>;

  /// Patch trace of every commit that touched `range` (in last-commit line
  /// numbers) of `file`, newest first. Empty when no commit touched it.
  fn line_log(&self, file: &Path, range: LineRange) -> Result<String>;
}

impl<T: HistorySource + ?Sized> HistorySource for &T {
  fn working_diff(&self, file: &Path, context: usize) -> Result<String> {
    (**self).working_diff(file, context)
  }

  fn line_log(&self, file: &Path, range: LineRange) -> Result<String> {
    (**self).line_log(file, range)
  }
}
