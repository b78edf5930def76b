mod cmd;
mod output;
mod prompts;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pkgctl_lib::build::SkipExisting;
use pkgctl_lib::platform::Platform;
use pkgctl_lib::publish::PublishMethod;

use crate::output::{OutputFormat, print_error};

/// Build, publish and retract conda packages from a recipe tree
#[derive(Parser)]
#[command(name = "pkgctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output (debug logs, verbose builder)
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build one package unless it already exists
  Build {
    /// Package name (directory under the recipes dir)
    package: String,

    #[command(flatten)]
    build: BuildArgs,
  },

  /// Build every package in the recipes dir
  BuildAll {
    #[command(flatten)]
    build: BuildArgs,

    /// Keep going after a failed package
    #[arg(long)]
    continue_on_error: bool,
  },

  /// Upload a built package
  Publish {
    /// Package name
    package: String,

    #[command(flatten)]
    publish: PublishArgs,
  },

  /// Upload every package recorded in the manifest for a platform
  PublishAll {
    #[command(flatten)]
    publish: PublishArgs,

    /// Keep going after a failed upload
    #[arg(long)]
    continue_on_error: bool,
  },

  /// Delete published versions from a channel
  Retract {
    /// Package name
    package: String,

    /// Channel to delete from
    #[arg(long)]
    channel: String,

    /// Versions: 1.0.0, 1.0.0,1.1.0 or 1.0.0-1.2.0 (endpoints only)
    #[arg(long)]
    versions: String,

    /// Deletion backend
    #[arg(long, default_value = "token")]
    method: PublishMethod,

    /// Target platform (defaults to the host)
    #[arg(long)]
    platform: Option<Platform>,

    /// Archive extension
    #[arg(long, default_value = "conda")]
    ext: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    force: bool,

    /// Show what would be deleted without deleting
    #[arg(long)]
    dry_run: bool,
  },

  /// List packages that have a recipe
  List,

  /// Show manifest records
  Status {
    /// Only show this platform
    #[arg(long)]
    platform: Option<Platform>,
  },

  /// Drop manifest entries whose artifact no longer exists
  Clean {
    /// Only clean this platform
    #[arg(long)]
    platform: Option<Platform>,

    /// Show what would be removed without changing the manifest
    #[arg(long)]
    dry_run: bool,
  },

  /// Show host platform and resolved configuration
  Info,
}

#[derive(clap::Args)]
struct BuildArgs {
  /// Target platform (defaults to the host)
  #[arg(long)]
  platform: Option<Platform>,

  /// Which indices count as "already built": none, local or all
  #[arg(long, default_value = "all")]
  skip_existing: SkipExisting,

  /// Build even if the package already exists
  #[arg(short, long)]
  force: bool,

  /// Skip the recipe's tests
  #[arg(long)]
  no_test: bool,

  /// Check availability without building or touching the manifest
  #[arg(long)]
  dry_run: bool,
}

#[derive(clap::Args)]
struct PublishArgs {
  /// Upload backend: token or object-storage
  #[arg(long, default_value = "token")]
  method: PublishMethod,

  /// Destination channel (object storage: full s3:// URL)
  #[arg(long)]
  channel: Option<String>,

  /// Target platform (defaults to the host)
  #[arg(long)]
  platform: Option<Platform>,

  /// Show the upload command without running it
  #[arg(long)]
  dry_run: bool,
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_env("PKGCTL_LOG")
      .or_else(|_| EnvFilter::try_from_default_env())
      .unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let verbose = cli.verbose;
  let output = cli.output;

  match cli.command {
    Commands::Build { package, build } => cmd::cmd_build(&package, build.into(), verbose, output),
    Commands::BuildAll {
      build,
      continue_on_error,
    } => cmd::cmd_build_all(build.into(), continue_on_error, verbose, output),
    Commands::Publish { package, publish } => cmd::cmd_publish(&package, publish.into(), output),
    Commands::PublishAll {
      publish,
      continue_on_error,
    } => cmd::cmd_publish_all(publish.into(), continue_on_error, output),
    Commands::Retract {
      package,
      channel,
      versions,
      method,
      platform,
      ext,
      force,
      dry_run,
    } => cmd::cmd_retract(
      cmd::RetractArgs {
        package,
        channel,
        versions,
        method,
        platform,
        ext,
        force,
        dry_run,
      },
      output,
    ),
    Commands::List => cmd::cmd_list(output),
    Commands::Status { platform } => cmd::cmd_status(platform, verbose, output),
    Commands::Clean { platform, dry_run } => cmd::cmd_clean(platform, dry_run, output),
    Commands::Info => cmd::cmd_info(output),
  }
}

impl From<BuildArgs> for cmd::BuildArgs {
  fn from(args: BuildArgs) -> Self {
    Self {
      platform: args.platform,
      skip_existing: args.skip_existing,
      force: args.force,
      no_test: args.no_test,
      dry_run: args.dry_run,
    }
  }
}

impl From<PublishArgs> for cmd::PublishArgs {
  fn from(args: PublishArgs) -> Self {
    Self {
      method: args.method,
      channel: args.channel,
      platform: args.platform,
      dry_run: args.dry_run,
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
