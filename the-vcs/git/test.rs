use std::{
  fs::File,
  io::Write,
  path::Path,
  process::Command,
};

use ropey::Rope;
use tempfile::TempDir;
use the_rewind_lib::{
  Error,
  HistorySource,
  LineRange,
  history::{
    self,
    Origin,
  },
  resolve,
  session::UndoSession,
};

use crate::{
  HistoryProviderRegistry,
  ProviderOptions,
  git,
};

fn exec_git_cmd(args: &str, git_dir: &Path) {
  let res = Command::new("git")
        .arg("-C")
        .arg(git_dir) // execute the git command in this directory
        .args(args.split_whitespace())
        .env_remove("GIT_DIR")
        .env_remove("GIT_ASKPASS")
        .env_remove("SSH_ASKPASS")
        .env("GIT_TERMINAL_PROMPT", "false")
        .env("GIT_AUTHOR_DATE", "2000-01-01 00:00:00 +0000")
        .env("GIT_AUTHOR_EMAIL", "author@example.com")
        .env("GIT_AUTHOR_NAME", "author")
        .env("GIT_COMMITTER_DATE", "2000-01-02 00:00:00 +0000")
        .env("GIT_COMMITTER_EMAIL", "committer@example.com")
        .env("GIT_COMMITTER_NAME", "committer")
        .env("GIT_CONFIG_COUNT", "2")
        .env("GIT_CONFIG_KEY_0", "commit.gpgsign")
        .env("GIT_CONFIG_VALUE_0", "false")
        .env("GIT_CONFIG_KEY_1", "init.defaultBranch")
        .env("GIT_CONFIG_VALUE_1", "main")
        .output()
        .unwrap_or_else(|_| panic!("`git {args}` failed"));
  if !res.status.success() {
    println!("{}", String::from_utf8_lossy(&res.stdout));
    eprintln!("{}", String::from_utf8_lossy(&res.stderr));
    panic!("`git {args}` failed (see output above)")
  }
}

/// Commits every change in `repo`. `message` must be a single word.
fn create_commit(repo: &Path, message: &str) {
  exec_git_cmd("add -A", repo);
  exec_git_cmd(&format!("commit -m {message}"), repo);
}

fn empty_git_repo() -> TempDir {
  let tmp = tempfile::tempdir().expect("create temp dir for git testing");
  exec_git_cmd("init", tmp.path());
  exec_git_cmd("config user.email test@the-rewind.org", tmp.path());
  exec_git_cmd("config user.name the-rewind-test", tmp.path());
  tmp
}

fn write(file: &Path, contents: &str) {
  File::create(file)
    .unwrap()
    .write_all(contents.as_bytes())
    .unwrap();
}

fn range(start: usize, end: usize) -> LineRange {
  LineRange::new(start, end).unwrap()
}

fn options() -> ProviderOptions {
  ProviderOptions::default()
}

#[test]
fn missing_file() {
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  assert!(git::working_diff(&options(), &file, 3).is_err());
}

#[test]
fn untracked_file_has_no_history() {
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  write(&file, "foo\n");

  assert_eq!(git::working_diff(&options(), &file, 3).unwrap(), "");
  assert_eq!(git::line_log(&options(), &file, range(1, 1)).unwrap(), "");
}

#[test]
fn unmodified_file_has_empty_diff() {
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  write(&file, "foo\nbar\n");
  create_commit(temp_git.path(), "initial");

  assert_eq!(git::working_diff(&options(), &file, 2).unwrap(), "");
}

#[test]
fn modified_file_diff_covers_the_whole_file() {
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  write(&file, "a\nb\nc\nd\ne\nf\ng\n");
  create_commit(temp_git.path(), "initial");
  write(&file, "new\na\nb\nc\nd\ne\nf\ng\n");

  let diff = git::working_diff(&options(), &file, 8).unwrap();
  assert_eq!(diff.matches("\n@@").count(), 1, "{diff}");
  assert_eq!(resolve::resolve(range(6, 8), &diff).unwrap(), range(5, 7));
  assert_eq!(
    resolve::head_text(range(5, 7), &diff).unwrap().as_deref(),
    Some("e\nf\ng\n")
  );
}

#[test]
fn directory_has_no_history() {
  let temp_git = empty_git_repo();
  let dir = temp_git.path().join("file.txt");
  std::fs::create_dir(&dir).expect("");
  write(&dir.join("file.txt"), "foo\n");
  create_commit(temp_git.path(), "directory");

  std::fs::remove_dir_all(&dir).unwrap();
  write(&dir, "bar\n");
  assert_eq!(git::line_log(&options(), &dir, range(1, 1)).unwrap(), "");
}

#[test]
fn line_log_is_newest_first() {
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  write(&file, "foo\nbaz\n");
  create_commit(temp_git.path(), "add");
  write(&file, "foo\nbar\n");
  create_commit(temp_git.path(), "rename");

  let log = git::line_log(&options(), &file, range(1, 2)).unwrap();
  let units = history::split_log(&log).unwrap();
  assert_eq!(units.len(), 2);
  assert!(matches!(
    &units[0].origin,
    Origin::Commit { summary: Some(summary), .. } if summary == "rename"
  ));
  assert_eq!(units[0].stats(), (1, 1));
  assert_eq!(units[1].stats(), (2, 0));
}

#[test]
fn line_log_respects_max_commits() {
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  for (i, message) in ["one", "two", "three"].iter().enumerate() {
    write(&file, &format!("line {i}\n"));
    create_commit(temp_git.path(), message);
  }

  let options = ProviderOptions {
    max_commits: Some(2),
    ..options()
  };
  let log = git::line_log(&options, &file, range(1, 1)).unwrap();
  assert_eq!(history::split_log(&log).unwrap().len(), 2);
}

#[test]
fn registry_walks_a_committed_region() {
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  write(&file, "foo\nbaz\n");
  create_commit(temp_git.path(), "add");
  write(&file, "foo\nbar\n");
  create_commit(temp_git.path(), "rename");

  let registry = HistoryProviderRegistry::default();
  let mut doc = Rope::from("foo\nbar\n");
  let mut session = UndoSession::new();

  session
    .start(&mut doc, &file, range(1, 2), &registry)
    .unwrap()
    .unwrap();
  assert_eq!(doc.to_string(), "foo\nbaz\n");
  session.repeat(&mut doc).unwrap();
  assert_eq!(doc.to_string(), "");
  assert!(matches!(
    session.repeat(&mut doc),
    Err(Error::HistoryExhausted)
  ));
}

#[test]
fn registry_walk_starts_with_uncommitted_edits() {
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  write(&file, "top\na\nb\nc\n");
  create_commit(temp_git.path(), "add");
  write(&file, "top\na\nB\nc\n");
  create_commit(temp_git.path(), "capitalize");
  write(&file, "inserted\ntop\na\nB2\nc\n");

  let registry = HistoryProviderRegistry::default();
  let mut doc = Rope::from("inserted\ntop\na\nB2\nc\n");
  let mut session = UndoSession::new();

  let step = session
    .start(&mut doc, &file, range(3, 5), &registry)
    .unwrap()
    .unwrap();
  assert_eq!(step.origin, Origin::Uncommitted);
  assert_eq!(doc.to_string(), "inserted\ntop\na\nB\nc\n");

  let step = session.repeat(&mut doc).unwrap();
  assert_eq!(step.rank, 1);
  assert_eq!(doc.to_string(), "inserted\ntop\na\nb\nc\n");

  session.repeat(&mut doc).unwrap();
  assert_eq!(doc.to_string(), "inserted\ntop\n");
  assert!(session.repeat(&mut doc).is_err());
}

#[test]
fn untracked_file_next_to_commits_has_no_history() {
  let temp_git = empty_git_repo();
  write(&temp_git.path().join("other.txt"), "other\n");
  create_commit(temp_git.path(), "other");
  let file = temp_git.path().join("file.txt");
  write(&file, "foo\n");

  assert_eq!(git::working_diff(&options(), &file, 3).unwrap(), "");
  assert_eq!(git::line_log(&options(), &file, range(1, 1)).unwrap(), "");
}

#[test]
fn file_outside_a_repository() {
  let tmp = tempfile::tempdir().unwrap();
  let file = tmp.path().join("file.txt");
  write(&file, "foo\n");

  assert!(git::working_diff(&options(), &file, 3).is_err());
  assert!(git::line_log(&options(), &file, range(1, 1)).is_err());

  let registry = HistoryProviderRegistry::default();
  let mut doc = Rope::from("foo\n");
  let mut session = UndoSession::new();
  assert!(matches!(
    session.start(&mut doc, &file, range(1, 1), &registry),
    Err(Error::QueryFailed { .. })
  ));
  assert_eq!(doc.to_string(), "foo\n");
}

#[test]
fn registry_reports_failures_as_failed_queries() {
  let options = ProviderOptions {
    program: "the-rewind-no-such-program".to_owned(),
    ..options()
  };
  let temp_git = empty_git_repo();
  let file = temp_git.path().join("file.txt");
  write(&file, "foo\n");
  create_commit(temp_git.path(), "add");

  let registry = HistoryProviderRegistry::new(options);
  assert!(matches!(
    registry.working_diff(&file, 1),
    Err(Error::QueryFailed { .. })
  ));
  assert!(matches!(
    registry.line_log(&file, range(1, 1)),
    Err(Error::QueryFailed { .. })
  ));

  let mut doc = Rope::from("foo\n");
  let mut session = UndoSession::new();
  assert!(matches!(
    session.start(&mut doc, &file, range(1, 1), &registry),
    Err(Error::QueryFailed { .. })
  ));
  let missing = temp_git.path().join("missing.txt");
  assert!(matches!(
    registry.working_diff(&missing, 1),
    Err(Error::QueryFailed { .. })
  ));
}
