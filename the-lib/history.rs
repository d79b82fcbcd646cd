//! Commit-by-commit history of a line range.
//!
//! The line-range log prints one block per commit, newest first. Each block
//! starts with a `commit <id>` marker line, carries some metadata and then the
//! patch that commit applied to the range. [`split_log`] turns that output
//! into one [`PatchUnit`] per commit without reordering anything: the order
//! is whatever the version control tool printed.

use std::{
  fmt,
  path::Path,
};

use crate::{
  error::{
    Error,
    Query,
    Result,
  },
  hunk::{
    self,
    EditHunk,
    LineKind,
  },
  range::LineRange,
  source::HistorySource,
};

/// Marker token that opens every commit block of the log output.
pub const COMMIT_MARKER: &str = "commit ";

/// Where the change described by a [`PatchUnit`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
  /// Edits in the working copy that were never committed.
  Uncommitted,
  Commit {
    id:      String,
    /// First line of the commit message, if the log printed one.
    summary: Option<String>,
  },
}

impl fmt::Display for Origin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Uncommitted => f.write_str("uncommitted changes"),
      Self::Commit { id, summary } => {
        let short = id.get(..12).unwrap_or(id);
        match summary {
          Some(summary) => write!(f, "{short} {summary}"),
          None => f.write_str(short),
        }
      },
    }
  }
}

/// The change between one state of a region and the next newer one.
///
/// Units are immutable once built and can be inspected freely while a walk
/// consumes its own copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchUnit {
  /// Position in the walk, 0 being the most recent change.
  pub rank:   usize,
  pub origin: Origin,
  pub hunks:  Vec<EditHunk>,
}

impl PatchUnit {
  pub fn new(rank: usize, origin: Origin, hunks: Vec<EditHunk>) -> Self {
    Self {
      rank,
      origin,
      hunks,
    }
  }

  /// Number of (added, removed) lines.
  pub fn stats(&self) -> (usize, usize) {
    self
      .hunks
      .iter()
      .fold((0, 0), |(added, removed), hunk| {
        match hunk.kind {
          LineKind::Added => (added + hunk.lines.len(), removed),
          LineKind::Removed => (added, removed + hunk.lines.len()),
          LineKind::Context => (added, removed),
        }
      })
  }
}

/// Queries the line-range log for `range` (in HEAD coordinates) and splits it
/// into patch units, newest first.
///
/// An empty result is not an error: the range has no committed history.
pub fn build_history<S>(source: &S, file: &Path, range: LineRange) -> Result<Vec<PatchUnit>>
where
  S: HistorySource + ?Sized,
{
  let raw = source.line_log(file, range)?;
  let units = split_log(&raw)?;
  log::debug!(
    "{} commits touched lines {range} of {}",
    units.len(),
    file.display()
  );
  Ok(units)
}

/// Splits raw line-range log output into one [`PatchUnit`] per commit block.
///
/// Units are ranked from 0 in output order. Commit blocks without any hunk
/// are skipped.
pub fn split_log(raw: &str) -> Result<Vec<PatchUnit>> {
  let mut units = Vec::new();
  let mut blocks = CommitBlocks::new(raw);

  for block in &mut blocks {
    let mut hunks: Vec<EditHunk> = Vec::new();
    for diff in hunk::parse_blocks(block.body, Query::LineLog)? {
      for run in diff.hunks {
        for line in run.lines {
          hunk::push_line(&mut hunks, run.kind, line);
        }
      }
    }

    if hunks.is_empty() {
      log::debug!("commit {} carries no hunk for the range", block.id);
      continue;
    }

    let origin = Origin::Commit {
      id:      block.id.to_owned(),
      summary: summary(block.body),
    };
    units.push(PatchUnit::new(units.len(), origin, hunks));
  }

  if blocks.saw_marker || raw.trim().is_empty() {
    Ok(units)
  } else {
    Err(Error::query_failed(
      Query::LineLog,
      "no commit marker in log output",
    ))
  }
}

/// First indented line after the commit header, which is where the log puts
/// the message subject.
fn summary(body: &str) -> Option<String> {
  body
    .lines()
    .take_while(|line| !line.starts_with("diff ") && !line.starts_with("@@"))
    .find_map(|line| line.strip_prefix("    "))
    .map(|line| line.trim().to_owned())
    .filter(|line| !line.is_empty())
}

struct CommitBlock<'a> {
  id:   &'a str,
  /// Everything after the marker line up to the next marker.
  body: &'a str,
}

/// Iterator over the commit blocks of log output.
struct CommitBlocks<'a> {
  rest:       &'a str,
  saw_marker: bool,
}

impl<'a> CommitBlocks<'a> {
  fn new(raw: &'a str) -> Self {
    Self {
      rest:       raw,
      saw_marker: false,
    }
  }
}

impl<'a> Iterator for CommitBlocks<'a> {
  type Item = CommitBlock<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    let start = find_marker(self.rest)?;
    self.saw_marker = true;

    let after_marker = &self.rest[start + COMMIT_MARKER.len()..];
    let (header, body_and_rest) = after_marker.split_once('\n').unwrap_or((after_marker, ""));
    // decorations such as `(HEAD -> main)` may follow the id
    let id = header.split_whitespace().next().unwrap_or_default();

    let end = find_marker(body_and_rest).unwrap_or(body_and_rest.len());
    let body = &body_and_rest[..end];
    self.rest = &body_and_rest[end..];
    Some(CommitBlock { id, body })
  }
}

/// Byte offset of the first line that starts with the commit marker. Message
/// text and hunk content are always indented or prefixed, so they never match.
fn find_marker(text: &str) -> Option<usize> {
  let mut offset = 0;
  for line in text.split_inclusive('\n') {
    if line.starts_with(COMMIT_MARKER) {
      return Some(offset);
    }
    offset += line.len();
  }
  None
}

/// Every older state of a region, newest first, without consuming anything.
///
/// Each unit's older side is independent of the others, so browsing never
/// needs an active walk.
pub fn states<'a>(
  units: impl IntoIterator<Item = &'a PatchUnit>,
) -> impl Iterator<Item = (&'a PatchUnit, String)> {
  units
    .into_iter()
    .map(|unit| (unit, crate::patch::apply(unit)))
}
