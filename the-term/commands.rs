use std::{
  io::{
    BufRead,
    Write,
  },
  path::{
    Path,
    PathBuf,
  },
};

use eyre::{
  Result,
  WrapErr,
};
use ropey::Rope;
use the_rewind_lib::{
  Error,
  HistorySource,
  LineRange,
  history,
  session::{
    Step,
    UndoSession,
    WalkState,
  },
};

/// A range of lines of a file, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
  pub file:  PathBuf,
  pub start: usize,
  pub end:   usize,
}

impl Region {
  fn lines(&self) -> Result<LineRange> {
    Ok(LineRange::new(self.start, self.end)?)
  }
}

fn read_document(path: &Path) -> Result<Rope> {
  let content = std::fs::read_to_string(path)
    .wrap_err_with(|| format!("failed to read {}", path.display()))?;
  Ok(Rope::from(content))
}

fn write_document(path: &Path, doc: &Rope) -> Result<()> {
  std::fs::write(path, doc.to_string())
    .wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn banner(out: &mut impl Write, step: &Step) -> Result<()> {
  writeln!(out, "==> {} {}", step.rank, step.origin)?;
  Ok(())
}

/// Prints every earlier state of the region without modifying anything.
pub fn show(region: &Region, source: &impl HistorySource, out: &mut impl Write) -> Result<()> {
  let doc = read_document(&region.file)?;
  let walk = WalkState::plan(&doc, &region.file, region.lines()?, source)?;
  if walk.remaining() == 0 {
    eprintln!("no history for lines {}", region.lines()?);
    return Ok(());
  }

  for (unit, text) in history::states(walk.units()) {
    writeln!(out, "==> {} {}", unit.rank, unit.origin)?;
    out.write_all(text.as_bytes())?;
  }
  Ok(())
}

/// Takes up to `count` steps back and prints the region, or writes the whole
/// document back when `write` is set.
pub fn step(
  region: &Region,
  count: usize,
  write: bool,
  source: &impl HistorySource,
  out: &mut impl Write,
) -> Result<()> {
  let mut doc = read_document(&region.file)?;
  let mut session = UndoSession::new();

  let Some(mut last) = session.start(&mut doc, &region.file, region.lines()?, source)? else {
    eprintln!("no history for lines {}", region.lines()?);
    return Ok(());
  };
  for _ in 1..count {
    match session.repeat(&mut doc) {
      Ok(step) => last = step,
      Err(Error::HistoryExhausted) => {
        eprintln!("{}", Error::HistoryExhausted);
        break;
      },
      Err(err) => return Err(err.into()),
    }
  }

  if write {
    write_document(&region.file, &doc)?;
    log::info!("wrote {}", region.file.display());
  } else {
    banner(out, &last)?;
    out.write_all(doc.slice(last.region.clone()).to_string().as_bytes())?;
  }
  Ok(())
}

const WALK_HELP: &str = "enter/n: step back, r: restart from disk, w: write, q: quit";

/// Interactive host loop: every line read from `input` is one command.
///
/// Stepping continues the walk as long as nothing else happened in between;
/// restarting and writing both end it, so the next step starts a new walk.
pub fn walk(
  region: &Region,
  source: &impl HistorySource,
  input: impl BufRead,
  out: &mut impl Write,
) -> Result<()> {
  let file = region.file.as_path();
  let mut doc = read_document(file)?;
  let mut selection = region.lines()?;
  let mut session = UndoSession::new();
  let mut repeat = false;

  eprintln!("{WALK_HELP}");
  for line in input.lines() {
    let line = line?;
    match line.trim() {
      "" | "n" => {
        match session.invoke(&mut doc, file, selection, source, repeat) {
          Ok(Some(step)) => {
            banner(out, &step)?;
            out.write_all(doc.slice(step.region.clone()).to_string().as_bytes())?;
            out.flush()?;
            if let Some(lines) = step.region_lines(&doc) {
              selection = lines;
            }
            repeat = true;
          },
          Ok(None) => {
            eprintln!("no history for lines {selection}");
            repeat = true;
          },
          Err(err @ Error::HistoryExhausted) => eprintln!("{err}"),
          // recoverable: the next step starts over
          Err(err) => {
            eprintln!("{err}");
            repeat = false;
          },
        }
      },
      "r" => {
        doc = read_document(file)?;
        selection = region.lines()?;
        session.reset();
        repeat = false;
        eprintln!("reloaded {}", file.display());
      },
      "w" => {
        write_document(file, &doc)?;
        session.reset();
        repeat = false;
        eprintln!("wrote {}", file.display());
      },
      "q" => break,
      other => eprintln!("unknown command {other:?} ({WALK_HELP})"),
    }
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;

  const LOG: &str = concat!(
    "commit 2222\n\n    second\n\n@@ -1,2 +1,2 @@\n foo\n-baz\n+bar\n",
    "commit 1111\n\n    first\n\n@@ -0,0 +1,2 @@\n+foo\n+baz\n",
  );

  struct FakeSource;

  impl HistorySource for FakeSource {
    fn working_diff(&self, _file: &Path, _context: usize) -> the_rewind_lib::Result<String> {
      Ok(String::new())
    }

    fn line_log(&self, _file: &Path, _range: LineRange) -> the_rewind_lib::Result<String> {
      Ok(LOG.to_owned())
    }
  }

  fn region(dir: &tempfile::TempDir) -> Region {
    let file = dir.path().join("file.txt");
    std::fs::write(&file, "foo\nbar\ntail\n").unwrap();
    Region {
      file,
      start: 1,
      end: 2,
    }
  }

  #[test]
  fn show_prints_every_state() {
    let dir = tempfile::tempdir().unwrap();
    let region = region(&dir);
    let mut out = Vec::new();
    show(&region, &FakeSource, &mut out).unwrap();
    assert_eq!(
      String::from_utf8(out).unwrap(),
      "==> 0 2222 second\nfoo\nbaz\n==> 1 1111 first\n"
    );
    assert_eq!(std::fs::read_to_string(&region.file).unwrap(), "foo\nbar\ntail\n");
  }

  #[test]
  fn step_writes_the_file_back() {
    let dir = tempfile::tempdir().unwrap();
    let region = region(&dir);
    let mut out = Vec::new();
    step(&region, 5, true, &FakeSource, &mut out).unwrap();
    assert!(out.is_empty());
    assert_eq!(std::fs::read_to_string(&region.file).unwrap(), "tail\n");
  }

  #[test]
  fn step_prints_the_region() {
    let dir = tempfile::tempdir().unwrap();
    let region = region(&dir);
    let mut out = Vec::new();
    step(&region, 1, false, &FakeSource, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "==> 0 2222 second\nfoo\nbaz\n");
  }

  #[test]
  fn walk_restarts_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let region = region(&dir);
    let mut out = Vec::new();
    walk(&region, &FakeSource, "n\nr\n\nq\nn\n".as_bytes(), &mut out).unwrap();
    assert_eq!(
      String::from_utf8(out).unwrap(),
      "==> 0 2222 second\nfoo\nbaz\n==> 0 2222 second\nfoo\nbaz\n"
    );
  }

  #[test]
  fn walk_writes_the_current_state() {
    let dir = tempfile::tempdir().unwrap();
    let region = region(&dir);
    let mut out = Vec::new();
    walk(&region, &FakeSource, "\n\nw\nq\n".as_bytes(), &mut out).unwrap();
    assert_eq!(std::fs::read_to_string(&region.file).unwrap(), "tail\n");
  }

  #[test]
  fn inverted_region_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let region = Region {
      start: 3,
      end: 2,
      ..region(&dir)
    };
    assert!(show(&region, &FakeSource, &mut Vec::new()).is_err());
  }
}
