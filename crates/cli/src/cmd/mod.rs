mod build;
mod clean;
mod info;
mod list;
mod publish;
mod retract;
mod status;

pub use build::{BuildArgs, cmd_build, cmd_build_all};
pub use clean::cmd_clean;
pub use info::cmd_info;
pub use list::cmd_list;
pub use publish::{PublishArgs, cmd_publish, cmd_publish_all};
pub use retract::{RetractArgs, cmd_retract};
pub use status::cmd_status;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use pkgctl_lib::config::Config;
use pkgctl_lib::manifest::ManifestStore;
use pkgctl_lib::platform::Platform;

/// Everything runs on one thread; operations are awaited in order.
fn runtime() -> Result<Runtime> {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")
}

fn load_config() -> Result<Config> {
  Config::from_env().context("Invalid configuration")
}

fn resolve_platform(platform: Option<Platform>) -> Result<Platform> {
  match platform {
    Some(p) => Ok(p),
    None => Platform::current().context("Could not detect the host platform; pass --platform"),
  }
}

/// Manifest handle whose lock metadata names this invocation.
fn manifest_store(config: &Config) -> ManifestStore {
  let command = std::env::args().collect::<Vec<_>>().join(" ");
  ManifestStore::new(&config.manifest_path).with_command(command)
}
