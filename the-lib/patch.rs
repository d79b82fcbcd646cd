//! Replaying a [`PatchUnit`] backwards.

use imara_diff::{
  Algorithm,
  Diff,
  InternedInput,
};
use ropey::{
  Rope,
  RopeSlice,
};

use crate::{
  history::PatchUnit,
  hunk::{
    self,
    EditHunk,
    LineKind,
  },
};

/// The region text one step further back in history.
///
/// This is the older side of the unit: context and removed lines in order,
/// added lines dropped. A unit without context or removed lines yields the
/// empty string, the region did not exist before that change.
pub fn apply(unit: &PatchUnit) -> String {
  let mut text = String::new();
  for hunk in &unit.hunks {
    if hunk.kind == LineKind::Added {
      continue;
    }
    for line in &hunk.lines {
      text.push_str(line);
    }
  }
  text
}

struct RopeLines<'a>(RopeSlice<'a>);

impl<'a> imara_diff::TokenSource for RopeLines<'a> {
  type Token = RopeSlice<'a>;
  type Tokenizer = ropey::iter::Lines<'a>;

  fn tokenize(&self) -> Self::Tokenizer {
    self.0.lines()
  }

  fn estimate_tokens(&self) -> u32 {
    u32::try_from(self.0.len_lines()).unwrap_or(u32::MAX)
  }
}

/// Line diff from `older` to `newer` as runs of [`EditHunk`]s, with every
/// unchanged line kept as context.
pub fn compare(older: &str, newer: &str) -> Vec<EditHunk> {
  let before = Rope::from(older);
  let after = Rope::from(newer);
  let input = InternedInput::new(RopeLines(before.slice(..)), RopeLines(after.slice(..)));
  let diff = Diff::compute(Algorithm::Histogram, &input);

  let mut hunks = Vec::new();
  let mut push = |kind, tokens: &[imara_diff::Token]| {
    for &token in tokens {
      let line = input.interner[token];
      // ropey reports an empty last line after a trailing line ending
      if line.len_chars() > 0 {
        hunk::push_line(&mut hunks, kind, line.to_string());
      }
    }
  };

  let mut pos = 0;
  for change in diff.hunks() {
    let (start, end) = (change.before.start as usize, change.before.end as usize);
    push(LineKind::Context, &input.before[pos..start]);
    push(LineKind::Removed, &input.before[start..end]);
    push(
      LineKind::Added,
      &input.after[change.after.start as usize..change.after.end as usize],
    );
    pos = end;
  }
  push(LineKind::Context, &input.before[pos..]);

  hunks
}
