use std::{
  fmt,
  ops::Range,
};

use ropey::Rope;

use crate::error::{
  Error,
  Result,
};

/// A 1-based, inclusive range of lines.
///
/// A range always refers to one snapshot's numbering: the live document, the
/// last commit, or some older commit. Callers are responsible for never
/// mixing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
  start: usize,
  end:   usize,
}

impl LineRange {
  pub fn new(start: usize, end: usize) -> Result<Self> {
    if start == 0 || start > end {
      return Err(Error::InvalidRange { start, end });
    }
    Ok(Self { start, end })
  }

  #[inline]
  pub fn start(&self) -> usize {
    self.start
  }

  #[inline]
  pub fn end(&self) -> usize {
    self.end
  }

  /// Number of lines covered, always at least one.
  #[inline]
  pub fn len(&self) -> usize {
    self.end - self.start + 1
  }

  #[inline]
  pub fn contains(&self, line: usize) -> bool {
    (self.start..=self.end).contains(&line)
  }

  /// Converts the range to a char range of `doc`.
  ///
  /// The returned range includes the line ending of the last line, if any.
  /// Fails with [`Error::InvalidRange`] when the range extends past the last
  /// line of the document.
  pub fn to_char_range(&self, doc: &Rope) -> Result<Range<usize>> {
    if self.end > content_lines(doc) {
      return Err(Error::InvalidRange {
        start: self.start,
        end:   self.end,
      });
    }
    let start = doc.line_to_char(self.start - 1);
    let end = if self.end < doc.len_lines() {
      doc.line_to_char(self.end)
    } else {
      doc.len_chars()
    };
    Ok(start..end)
  }

  /// The line range spanned by `chars` in `doc`, `None` for an empty span.
  pub fn from_char_range(doc: &Rope, chars: Range<usize>) -> Option<Self> {
    if chars.is_empty() {
      return None;
    }
    let start = doc.char_to_line(chars.start) + 1;
    // the last char is usually the line ending, which belongs to its own line
    let end = doc.char_to_line(chars.end - 1) + 1;
    Some(Self { start, end })
  }
}

impl fmt::Display for LineRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{},{}", self.start, self.end)
  }
}

/// Number of lines with content, not counting the empty line ropey reports
/// after a trailing line ending.
pub fn content_lines(doc: &Rope) -> usize {
  let len = doc.len_chars();
  if len == 0 {
    return 0;
  }
  if doc.char(len - 1) == '\n' {
    doc.len_lines() - 1
  } else {
    doc.len_lines()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn rejects_inverted_and_zero_ranges() {
    assert!(matches!(
      LineRange::new(0, 3),
      Err(Error::InvalidRange { start: 0, end: 3 })
    ));
    assert!(LineRange::new(4, 3).is_err());
    assert_eq!(LineRange::new(3, 3).unwrap().len(), 1);
  }

  #[test]
  fn char_range_covers_whole_lines() {
    let doc = Rope::from("one\ntwo\nthree\n");
    let range = LineRange::new(2, 3).unwrap().to_char_range(&doc).unwrap();
    assert_eq!(doc.slice(range.clone()).to_string(), "two\nthree\n");
    assert_eq!(
      LineRange::from_char_range(&doc, range),
      Some(LineRange::new(2, 3).unwrap())
    );
  }

  #[test]
  fn char_range_without_final_newline() {
    let doc = Rope::from("one\ntwo");
    let range = LineRange::new(2, 2).unwrap().to_char_range(&doc).unwrap();
    assert_eq!(doc.slice(range).to_string(), "two");
  }

  #[test]
  fn char_range_past_end_is_invalid() {
    let doc = Rope::from("one\ntwo\n");
    assert!(LineRange::new(2, 3).unwrap().to_char_range(&doc).is_err());
    assert_eq!(content_lines(&doc), 2);
    assert_eq!(content_lines(&Rope::new()), 0);
  }
}
