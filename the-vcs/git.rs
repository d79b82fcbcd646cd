use std::{
  path::{
    Path,
    PathBuf,
  },
  process::{
    Command,
    Output,
  },
};

use eyre::{
  Result,
  WrapErr,
  eyre,
};
use the_rewind_lib::LineRange;

use crate::ProviderOptions;

#[cfg(test)]
mod test;

fn run_git(program: &str, cwd: &Path, args: &[&str]) -> Result<Output> {
  log::debug!("running {program} {} in {}", args.join(" "), cwd.display());
  let output = Command::new(program)
    .arg("-C")
    .arg(cwd)
    .args(args)
    .env_remove("GIT_DIR")
    .env_remove("GIT_WORK_TREE")
    .output()
    .wrap_err_with(|| format!("failed to run {program} in {}", cwd.display()))?;

  log::debug!("{program} {} exited with {}", args[0], output.status);
  if output.status.success() {
    Ok(output)
  } else {
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(eyre!("{program} {:?} failed: {}", args, stderr.trim()))
  }
}

fn stdout(output: Output, what: &str) -> Result<String> {
  String::from_utf8(output.stdout).wrap_err_with(|| format!("invalid {what} output"))
}

fn canonical_file_path(path: &Path) -> Result<PathBuf> {
  if path.exists() {
    std::fs::canonicalize(path)
      .wrap_err_with(|| format!("failed to canonicalize {}", path.display()))
  } else {
    Err(eyre!("path does not exist: {}", path.display()))
  }
}

/// Splits `file` into the directory the queries run in and the bare file
/// name they are given.
fn query_location(file: &Path) -> Result<(PathBuf, String)> {
  let file = canonical_file_path(file)?;
  let dir = file
    .parent()
    .ok_or_else(|| eyre!("file has no parent directory"))?;
  let name = file
    .file_name()
    .ok_or_else(|| eyre!("{} has no file name", file.display()))?;
  Ok((dir.to_path_buf(), name.to_string_lossy().into_owned()))
}

fn git_repo_root(program: &str, dir: &Path) -> Result<PathBuf> {
  let output = run_git(program, dir, &["rev-parse", "--show-toplevel"])?;
  let root = stdout(output, "git root")?;
  let root = root.trim();
  if root.is_empty() {
    return Err(eyre!("git repo root is empty"));
  }
  Ok(PathBuf::from(root))
}

/// Whether the last commit has `name` as a file. A repository without commits
/// and a path the last commit does not have as a file both have no history to
/// walk. Failing to find the repository at all is an error.
fn committed(program: &str, dir: &Path, name: &str) -> Result<bool> {
  let root = git_repo_root(program, dir)?;
  log::debug!("{} belongs to {}", dir.display(), root.display());

  if let Err(err) = run_git(program, dir, &["rev-parse", "--verify", "-q", "HEAD"]) {
    log::debug!("no commits yet: {err:#}");
    return Ok(false);
  }

  let spec = format!("HEAD:./{name}");
  match run_git(program, dir, &["cat-file", "-t", &spec]) {
    Ok(output) => Ok(stdout(output, "git cat-file")?.trim() == "blob"),
    Err(err) => {
      log::debug!("{err:#}");
      Ok(false)
    },
  }
}

pub fn working_diff(options: &ProviderOptions, file: &Path, context: usize) -> Result<String> {
  let (dir, name) = query_location(file)?;
  if !committed(&options.program, &dir, &name)? {
    log::debug!("{name} is not committed, treating it as unchanged");
    return Ok(String::new());
  }

  let context = format!("-U{context}");
  let output = run_git(&options.program, &dir, &[
    "diff",
    "--no-color",
    "--no-ext-diff",
    "--no-textconv",
    &context,
    "HEAD",
    "--",
    &name,
  ])?;
  stdout(output, "git diff")
}

pub fn line_log(options: &ProviderOptions, file: &Path, range: LineRange) -> Result<String> {
  let (dir, name) = query_location(file)?;
  if !committed(&options.program, &dir, &name)? {
    log::debug!("{name} is not committed, it has no history");
    return Ok(String::new());
  }

  let trace = format!("-L{range}:{name}");
  let limit = options.max_commits.map(|max| max.to_string());
  let mut args = vec![
    "log",
    "--no-color",
    "--no-decorate",
    "--no-notes",
    "--pretty=medium",
    trace.as_str(),
  ];
  if let Some(limit) = &limit {
    args.extend(["-n", limit.as_str()]);
  }
  let output = run_git(&options.program, &dir, &args)?;
  stdout(output, "git log")
}
