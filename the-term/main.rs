//! Command line host for walking a region of a file back through its git
//! history.

mod commands;

use std::{
  io,
  path::PathBuf,
};

use clap::{
  ArgAction,
  Args,
  Parser,
  Subcommand,
};
use eyre::{
  Result,
  WrapErr,
};
use the_rewind_loader::config::Config;
use the_rewind_vcs::{
  HistoryProviderRegistry,
  ProviderOptions,
};

use crate::commands::Region;

#[derive(Debug, Parser)]
#[command(name = "the-rewind", version)]
#[command(about = "Step a range of lines back through its version control history")]
struct Cli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count, global = true)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", global = true)]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
  config_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Print every earlier state of the region, newest first
  Show(RegionArgs),
  /// Take COUNT steps back and print the region
  Step {
    #[command(flatten)]
    region: RegionArgs,

    /// Number of steps to take
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Write the result back to the file instead of printing the region
    #[arg(long)]
    write: bool,
  },
  /// Step back interactively, one step per line read from stdin
  Walk(RegionArgs),
}

#[derive(Debug, Args)]
struct RegionArgs {
  /// File the region belongs to
  file:  PathBuf,
  /// First line of the region (1-based)
  start: usize,
  /// Last line of the region (inclusive)
  end:   usize,
}

impl From<RegionArgs> for Region {
  fn from(args: RegionArgs) -> Self {
    Region {
      file:  args.file,
      start: args.start,
      end:   args.end,
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  the_rewind_loader::initialize_config_file(cli.config_file);
  the_rewind_loader::initialize_log_file(cli.log_file);
  setup_logging(cli.verbosity).wrap_err("failed to initialize logging")?;

  let (Command::Show(region) | Command::Walk(region) | Command::Step { region, .. }) =
    &cli.command;
  // settings of the workspace the file lives in
  let dir = region
    .file
    .parent()
    .filter(|dir| !dir.as_os_str().is_empty())
    .map_or_else(|| PathBuf::from("."), PathBuf::from);
  let config = Config::load(&dir)?;
  let registry = HistoryProviderRegistry::new(ProviderOptions {
    program:     config.vcs.program,
    max_commits: config.history.max_commits,
  });

  let mut stdout = io::stdout().lock();
  match cli.command {
    Command::Show(args) => commands::show(&args.into(), &registry, &mut stdout),
    Command::Step {
      region,
      count,
      write,
    } => commands::step(&region.into(), count, write, &registry, &mut stdout),
    Command::Walk(args) => {
      commands::walk(&args.into(), &registry, io::stdin().lock(), &mut stdout)
    },
  }
}

fn setup_logging(verbosity: u8) -> Result<()> {
  let mut base_config = fern::Dispatch::new();

  base_config = match verbosity {
    0 => base_config.level(log::LevelFilter::Warn),
    1 => base_config.level(log::LevelFilter::Info),
    2 => base_config.level(log::LevelFilter::Debug),
    _ => base_config.level(log::LevelFilter::Trace),
  };

  // Separate file config so we can include year, month and day in file logs
  let file_config = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .chain(fern::log_file(the_rewind_loader::log_file())?);

  base_config.chain(file_config).apply()?;

  Ok(())
}
