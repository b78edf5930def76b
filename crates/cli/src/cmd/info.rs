use anyhow::Result;

use pkgctl_lib::credentials::CredentialResolver;
use pkgctl_lib::platform::Platform;

use super::load_config;
use crate::output::{OutputFormat, print_json, print_stat};

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let platform = Platform::current();
  let credentials = CredentialResolver::from_env();
  let sources: Vec<String> = credentials.sources().collect();

  if output.is_json() {
    return print_json(&serde_json::json!({
      "platform": platform,
      "config": config,
      "credentialSources": sources,
    }));
  }

  println!("System:");
  match platform {
    Some(p) => print_stat("Platform", p.as_str()),
    None => print_stat("Platform", "unsupported (pass --platform explicitly)"),
  }

  println!();
  println!("Configuration:");
  print_stat("Recipes", &config.recipes_dir.display().to_string());
  print_stat("Output", &config.output_dir.display().to_string());
  print_stat("Manifest", &config.manifest_path.display().to_string());
  print_stat("Channels", &config.channels.join(", "));
  print_stat("Public channel", &config.public_channel);
  if let Some(channel) = &config.private_channel {
    print_stat("Private channel", channel);
  }
  if let Some(url) = &config.s3_channel {
    print_stat("Object storage", url);
  }
  print_stat("Token server", &config.prefix_url);
  if let Some(channel) = &config.publish_channel {
    print_stat("Publish channel", channel);
  }
  print_stat(
    "Tools",
    &format!("{}, {}, {}", config.build_tool, config.search_tool, config.s3_tool),
  );
  print_stat("Query timeout", &format!("{}s", config.query_timeout.as_secs()));

  println!();
  println!("Credential sources:");
  for source in &sources {
    print_stat("Source", source);
  }
  Ok(())
}
