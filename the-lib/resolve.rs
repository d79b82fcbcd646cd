//! Mapping a live selection onto the last committed snapshot.
//!
//! Uncommitted insertions and deletions shift line numbers, so the range a
//! user selects in the working copy is generally not the range the history
//! query has to be asked about. The mapping walks a whole-file diff of the
//! working copy against the last commit and keeps a running *surplus*: the
//! number of live lines added minus the number removed so far. A HEAD line
//! `h` corresponds to live line `t` when `t - surplus == h`.
//!
//! The start boundary is located through its anchor, the line *before* the
//! region (line 0 being the virtual line above the first one), and the mapped
//! start is `anchor + 1`. The end boundary is mapped directly. History queries
//! and hunk parsing are calibrated to this convention.

use crate::{
  error::{
    Error,
    Query,
    Result,
  },
  hunk::{
    self,
    DiffBlock,
    LineKind,
  },
  range::LineRange,
};

/// Maps `live` onto the line numbering of the last commit, given the working
/// copy diff for the whole file.
///
/// Empty diff output means there are no uncommitted edits and the mapping is
/// the identity. Fails with [`Error::NoMapping`] when a boundary only exists in
/// uncommitted content.
pub fn resolve(live: LineRange, working_diff: &str) -> Result<LineRange> {
  let blocks = parse_working_diff(working_diff)?;
  if blocks.is_empty() {
    return Ok(live);
  }

  let mut mapper = BoundaryMapper::new(live);
  for block in &blocks {
    mapper.feed(block);
    if mapper.end.is_some() {
      break;
    }
  }
  mapper.finish()
}

/// The text of `head` in the last committed snapshot, recovered from the old
/// side of the working copy diff.
///
/// Returns `None` when the diff is empty, in which case the committed text is
/// the live text.
pub fn head_text(head: LineRange, working_diff: &str) -> Result<Option<String>> {
  let blocks = parse_working_diff(working_diff)?;
  if blocks.is_empty() {
    return Ok(None);
  }

  let mut text = String::new();
  let mut found = 0;
  for block in &blocks {
    let mut line = block.header.old_lines_before();
    for run in &block.hunks {
      if run.kind == LineKind::Added {
        continue;
      }
      for content in &run.lines {
        line += 1;
        if head.contains(line) {
          text.push_str(content);
          found += 1;
        }
      }
    }
  }

  if found != head.len() {
    return Err(Error::query_failed(
      Query::WorkingDiff,
      format!("diff does not cover lines {}-{}", head.start(), head.end()),
    ));
  }
  Ok(Some(text))
}

fn parse_working_diff(working_diff: &str) -> Result<Vec<DiffBlock>> {
  let blocks = hunk::parse_blocks(working_diff, Query::WorkingDiff)?;
  if blocks.is_empty() && !working_diff.trim().is_empty() {
    return Err(Error::query_failed(
      Query::WorkingDiff,
      "no hunk header in diff output",
    ));
  }
  Ok(blocks)
}

struct BoundaryMapper {
  live:    LineRange,
  anchor:  usize,
  head:    usize,
  surplus: isize,
  start:   Option<usize>,
  end:     Option<usize>,
}

impl BoundaryMapper {
  fn new(live: LineRange) -> Self {
    let anchor = live.start() - 1;
    Self {
      live,
      anchor,
      head: 0,
      surplus: 0,
      start: (anchor == 0).then_some(0),
      end: None,
    }
  }

  /// The HEAD line that live line `target` lands on at the current surplus.
  fn head_of(&self, target: usize) -> isize {
    target as isize - self.surplus
  }

  fn feed(&mut self, block: &DiffBlock) {
    // lines between two blocks are unchanged
    self.skip_unchanged(block.header.old_lines_before());

    for run in &block.hunks {
      for _ in &run.lines {
        if self.end.is_some() {
          return;
        }
        self.step(run.kind);
      }
    }
  }

  fn step(&mut self, kind: LineKind) {
    match kind {
      LineKind::Added => {
        self.surplus += 1;
        // the anchor may be an added line; the region then starts at the next
        // HEAD line
        if self.start.is_none() && self.head_of(self.anchor) == self.head as isize {
          self.start = Some(self.head);
        }
      },
      // a removed line has no live counterpart, so neither boundary can land
      // on it
      LineKind::Removed => {
        self.head += 1;
        self.surplus -= 1;
      },
      LineKind::Context => {
        self.head += 1;
        if self.start.is_none() && self.head_of(self.anchor) == self.head as isize {
          self.start = Some(self.head);
        }
        if self.end.is_none() && self.head_of(self.live.end()) == self.head as isize {
          self.end = Some(self.head);
        }
      },
    }
  }

  fn skip_unchanged(&mut self, upto: usize) {
    if upto <= self.head {
      return;
    }
    let gap = self.head as isize + 1..=upto as isize;
    if self.start.is_none() && gap.contains(&self.head_of(self.anchor)) {
      self.start = Some(self.head_of(self.anchor) as usize);
    }
    if self.end.is_none() && gap.contains(&self.head_of(self.live.end())) {
      self.end = Some(self.head_of(self.live.end()) as usize);
    }
    self.head = upto;
  }

  fn finish(mut self) -> Result<LineRange> {
    // everything after the last block is unchanged as well
    if self.end.is_none() {
      let tail = self.head_of(self.live.end());
      if tail > self.head as isize {
        self.skip_unchanged(tail as usize);
      }
    }
    if self.start.is_none() {
      let tail = self.head_of(self.anchor);
      if tail > self.head as isize {
        self.start = Some(tail as usize);
      }
    }

    let no_mapping = Error::NoMapping {
      start: self.live.start(),
      end:   self.live.end(),
    };
    match (self.start, self.end) {
      (Some(anchor), Some(end)) if anchor < end => LineRange::new(anchor + 1, end),
      _ => Err(no_mapping),
    }
  }
}
