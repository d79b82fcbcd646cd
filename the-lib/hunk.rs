//! Classification of unified diff output into typed runs of lines.
//!
//! Both external queries print hunk bodies in the unified convention: a
//! `@@ -a,b +c,d @@` header followed by lines prefixed with `+`, `-` or a
//! space. Every raw line is classified into a [`DiffLine`] first, so anything
//! that does not fit the convention becomes a terminator or a parse failure
//! rather than being guessed at.

use crate::error::{
  Error,
  Query,
  Result,
};

/// Which side(s) of a diff a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
  /// Present in both the older and the newer snapshot.
  Context,
  /// Present only in the newer snapshot.
  Added,
  /// Present only in the older snapshot.
  Removed,
}

/// One contiguous run of diff lines of the same kind.
///
/// Lines keep their line ending so that concatenating them reproduces the
/// original text exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditHunk {
  pub kind:  LineKind,
  pub lines: Vec<String>,
}

impl EditHunk {
  pub fn new(kind: LineKind, lines: Vec<String>) -> Self {
    Self { kind, lines }
  }
}

/// Appends `line` to the run at the end of `hunks`, starting a new run when
/// the kind changes.
pub fn push_line(hunks: &mut Vec<EditHunk>, kind: LineKind, line: impl Into<String>) {
  match hunks.last_mut() {
    Some(last) if last.kind == kind => last.lines.push(line.into()),
    _ => hunks.push(EditHunk::new(kind, vec![line.into()])),
  }
}

/// The ranges announced by a `@@ -old_start,old_len +new_start,new_len @@`
/// line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HunkHeader {
  pub old_start: usize,
  pub old_len:   usize,
  pub new_start: usize,
  pub new_len:   usize,
}

impl HunkHeader {
  /// Parses a hunk header line. A missing length means one line, as in
  /// `@@ -3 +3 @@`.
  pub fn parse(line: &str) -> Option<Self> {
    let rest = line.strip_prefix("@@ ")?;
    let (ranges, _) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(' ')?;
    let (old_start, old_len) = parse_side(old.strip_prefix('-')?)?;
    let (new_start, new_len) = parse_side(new.strip_prefix('+')?)?;
    Some(Self {
      old_start,
      old_len,
      new_start,
      new_len,
    })
  }

  /// Number of old-side lines that precede the hunk body.
  ///
  /// An empty old side names the line *after which* the hunk applies, a
  /// non-empty one names its own first line.
  pub fn old_lines_before(&self) -> usize {
    if self.old_len == 0 {
      self.old_start
    } else {
      self.old_start.saturating_sub(1)
    }
  }
}

fn parse_side(side: &str) -> Option<(usize, usize)> {
  match side.split_once(',') {
    Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
    None => Some((side.parse().ok()?, 1)),
  }
}

/// A raw line of diff output after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLine<'a> {
  /// A hunk body line; the text excludes the prefix but keeps the line
  /// ending.
  Body(LineKind, &'a str),
  /// `\ No newline at end of file`, qualifying the previous body line.
  NoNewline,
  /// A `@@` hunk header.
  Header(HunkHeader),
  /// Anything else. Ends the current hunk body.
  Terminator,
}

pub fn classify(line: &str) -> DiffLine<'_> {
  if let Some(header) = HunkHeader::parse(line) {
    return DiffLine::Header(header);
  }
  match line.as_bytes().first() {
    Some(b'+') => DiffLine::Body(LineKind::Added, &line[1..]),
    Some(b'-') => DiffLine::Body(LineKind::Removed, &line[1..]),
    Some(b' ') => DiffLine::Body(LineKind::Context, &line[1..]),
    Some(b'\\') => DiffLine::NoNewline,
    _ => DiffLine::Terminator,
  }
}

/// One `@@` block: its header and the runs of its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffBlock {
  pub header: HunkHeader,
  pub hunks:  Vec<EditHunk>,
}

/// Parses every `@@` block of `text`. Lines outside of a block (file headers,
/// commit metadata, blank separators) are skipped.
///
/// A block ends once the line counts announced by its header are consumed.
/// A terminator or a new header arriving before that is reported as
/// [`Error::QueryFailed`] for `query`: a truncated hunk is never applied.
pub fn parse_blocks(text: &str, query: Query) -> Result<Vec<DiffBlock>> {
  let mut blocks = Vec::new();
  let mut lines = text.split_inclusive('\n').peekable();

  while let Some(line) = lines.next() {
    let DiffLine::Header(header) = classify(line) else {
      continue;
    };

    let mut hunks = Vec::new();
    let mut old_left = header.old_len;
    let mut new_left = header.new_len;

    while old_left > 0 || new_left > 0 {
      let Some(&line) = lines.peek() else {
        break;
      };
      let kind = match classify(line) {
        DiffLine::Body(kind, text) => {
          lines.next();
          push_line(&mut hunks, kind, text);
          kind
        },
        DiffLine::NoNewline => {
          lines.next();
          strip_line_ending(&mut hunks);
          continue;
        },
        // diff.suppressBlankEmpty prints empty context lines without the space
        DiffLine::Terminator if old_left > 0 && new_left > 0 && is_blank(line) => {
          lines.next();
          push_line(&mut hunks, LineKind::Context, line);
          LineKind::Context
        },
        DiffLine::Header(_) | DiffLine::Terminator => break,
      };

      let (old, new) = match kind {
        LineKind::Context => (1, 1),
        LineKind::Added => (0, 1),
        LineKind::Removed => (1, 0),
      };
      match (old_left.checked_sub(old), new_left.checked_sub(new)) {
        (Some(old), Some(new)) => {
          old_left = old;
          new_left = new;
        },
        _ => {
          return Err(Error::query_failed(
            query,
            format!("hunk at -{} has more lines than its header announces", header.old_start),
          ));
        },
      }
    }

    if old_left > 0 || new_left > 0 {
      return Err(Error::query_failed(
        query,
        format!(
          "hunk at -{} ended early: {old_left} old and {new_left} new lines missing",
          header.old_start
        ),
      ));
    }

    if lines.peek().is_some_and(|line| classify(line) == DiffLine::NoNewline) {
      lines.next();
      strip_line_ending(&mut hunks);
    }

    blocks.push(DiffBlock { header, hunks });
  }

  Ok(blocks)
}

fn is_blank(line: &str) -> bool {
  line.trim_end_matches(['\r', '\n']).is_empty()
}

fn strip_line_ending(hunks: &mut [EditHunk]) {
  if let Some(line) = hunks.last_mut().and_then(|hunk| hunk.lines.last_mut())
    && line.ends_with('\n')
  {
    line.pop();
  }
}
