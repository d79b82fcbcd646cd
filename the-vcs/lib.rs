//! `the_rewind_vcs` answers the two history queries of a region walk by
//! shelling out to a version control system. Currently only `git` is
//! supported.

use std::path::Path;

use eyre::{
  Result,
  bail,
};
use the_rewind_lib::{
  HistorySource,
  LineRange,
  error::{
    Error,
    Query,
  },
};

#[cfg(feature = "git")] mod git;

/// Settings shared by every provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOptions {
  /// Executable used for the queries.
  pub program:     String,
  /// Limit on the number of commits the line-range log reports.
  pub max_commits: Option<usize>,
}

impl Default for ProviderOptions {
  fn default() -> Self {
    Self {
      program:     "git".to_owned(),
      max_commits: None,
    }
  }
}

/// Contains all active history providers. Providers are compiled in via
/// features and asked in order until one of them succeeds.
#[derive(Debug, Clone)]
pub struct HistoryProviderRegistry {
  providers: Vec<HistoryProvider>,
  options:   ProviderOptions,
}

impl HistoryProviderRegistry {
  pub fn new(options: ProviderOptions) -> Self {
    let mut providers = Vec::new();
    #[cfg(feature = "git")]
    providers.push(HistoryProvider::Git);
    providers.push(HistoryProvider::None);
    Self { providers, options }
  }

  pub fn options(&self) -> &ProviderOptions {
    &self.options
  }

  /// Runs `query` against each provider in turn. When all of them fail the
  /// error of the first one is reported, later ones only explain that they
  /// are unavailable.
  fn first_success<T>(
    &self,
    kind: Query,
    file: &Path,
    query: impl Fn(&HistoryProvider) -> Result<T>,
  ) -> the_rewind_lib::Result<T> {
    let mut first_err = None;
    for provider in &self.providers {
      match query(provider) {
        Ok(res) => return Ok(res),
        Err(err) => {
          log::debug!("{err:#?}");
          log::warn!("{provider:?} failed to run {kind} for {}", file.display());
          first_err.get_or_insert(err);
        },
      }
    }
    let reason = first_err.map_or_else(
      || "no history provider available".to_owned(),
      |err| format!("{err:#}"),
    );
    Err(Error::query_failed(kind, reason))
  }
}

impl Default for HistoryProviderRegistry {
  fn default() -> Self {
    Self::new(ProviderOptions::default())
  }
}

impl HistorySource for HistoryProviderRegistry {
  fn working_diff(&self, file: &Path, context: usize) -> the_rewind_lib::Result<String> {
    self.first_success(Query::WorkingDiff, file, |provider| {
      provider.working_diff(&self.options, file, context)
    })
  }

  fn line_log(&self, file: &Path, range: LineRange) -> the_rewind_lib::Result<String> {
    self.first_success(Query::LineLog, file, |provider| {
      provider.line_log(&self.options, file, range)
    })
  }
}

/// A union type that includes all types that can answer history queries.
///
/// `Copy` is simply to ensure the `clone()` call is the simplest it can be.
#[derive(Debug, Copy, Clone)]
enum HistoryProvider {
  #[cfg(feature = "git")]
  Git,
  None,
}

impl HistoryProvider {
  fn working_diff(
    &self,
    _options: &ProviderOptions,
    _file: &Path,
    _context: usize,
  ) -> Result<String> {
    match self {
      #[cfg(feature = "git")]
      Self::Git => git::working_diff(_options, _file, _context),
      Self::None => bail!("No history support compiled in"),
    }
  }

  fn line_log(&self, _options: &ProviderOptions, _file: &Path, _range: LineRange) -> Result<String> {
    match self {
      #[cfg(feature = "git")]
      Self::Git => git::line_log(_options, _file, _range),
      Self::None => bail!("No history support compiled in"),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn without_providers_every_query_fails() {
    let registry = HistoryProviderRegistry {
      providers: vec![HistoryProvider::None],
      options:   ProviderOptions::default(),
    };
    let err = registry
      .line_log(Path::new("file.txt"), LineRange::new(1, 2).unwrap())
      .unwrap_err();
    assert!(matches!(
      err,
      Error::QueryFailed {
        query: Query::LineLog,
        ..
      }
    ));
    assert!(err.to_string().contains("No history support compiled in"));
  }
}
