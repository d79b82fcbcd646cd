use std::{
  io::ErrorKind,
  path::{
    Path,
    PathBuf,
  },
};

use eyre::{
  Context,
  Result,
};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
  pub vcs:     VcsConfig,
  pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct VcsConfig {
  /// Executable answering the diff and log queries.
  pub program: String,
}

impl Default for VcsConfig {
  fn default() -> Self {
    Self {
      program: "git".to_owned(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct HistoryConfig {
  /// Most commits a walk goes back, unlimited when unset.
  pub max_commits: Option<usize>,
}

impl Config {
  /// User config merged with the config of the workspace containing `dir`.
  pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
    Self::load_files([crate::config_file(), crate::workspace_config_file(dir)])
  }

  /// Merges `files` in order, later ones taking precedence. Missing files are
  /// skipped.
  pub fn load_files(files: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
    let mut merged = toml::Value::Table(toml::Table::new());
    for file in files {
      let text = match std::fs::read_to_string(&file) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => continue,
        Err(err) => {
          return Err(err).wrap_err_with(|| format!("failed to read {}", file.display()));
        },
      };
      let value: toml::Value =
        toml::from_str(&text).wrap_err_with(|| format!("failed to parse {}", file.display()))?;
      log::debug!("loaded config from {}", file.display());
      merged = crate::merge_toml_values(merged, value, 3);
    }
    merged.try_into().context("invalid configuration")
  }
}
