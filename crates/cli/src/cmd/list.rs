use anyhow::Result;

use pkgctl_lib::build::invocation::discover_recipes;

use super::load_config;
use crate::output::{OutputFormat, print_info, print_json, symbols};

pub fn cmd_list(output: OutputFormat) -> Result<()> {
  let config = load_config()?;
  let names = discover_recipes(&config.recipes_dir)?;

  if output.is_json() {
    return print_json(&names);
  }

  if names.is_empty() {
    print_info(&format!("No recipes found in {}", config.recipes_dir.display()));
    return Ok(());
  }
  for name in &names {
    println!("  {} {}", symbols::INFO, name);
  }
  Ok(())
}
