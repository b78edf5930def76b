//! Builder command line and recipe discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::types::{BuildError, BuildOptions};
use crate::config::Config;
use crate::consts::RECIPE_FILENAME;
use crate::process::CommandSpec;

/// `<recipes_dir>/<name>`, checked for a recipe file.
pub fn recipe_dir(config: &Config, name: &str) -> Result<PathBuf, BuildError> {
  if !config.recipes_dir.is_dir() {
    return Err(BuildError::RecipesDirMissing {
      path: config.recipes_dir.clone(),
    });
  }
  let dir = config.recipes_dir.join(name);
  if !dir.join(RECIPE_FILENAME).is_file() {
    return Err(BuildError::RecipeNotFound {
      package: name.to_string(),
      path: dir.join(RECIPE_FILENAME),
    });
  }
  Ok(dir)
}

/// Names of every package with a recipe, sorted.
pub fn discover_recipes(recipes_dir: &Path) -> Result<Vec<String>, BuildError> {
  if !recipes_dir.is_dir() {
    return Err(BuildError::RecipesDirMissing {
      path: recipes_dir.to_path_buf(),
    });
  }

  let mut names = Vec::new();
  for entry in WalkDir::new(recipes_dir).min_depth(1).max_depth(1) {
    let entry = entry.map_err(|source| BuildError::Discover {
      path: recipes_dir.to_path_buf(),
      source,
    })?;
    if !entry.file_type().is_dir() || !entry.path().join(RECIPE_FILENAME).is_file() {
      continue;
    }
    if let Some(name) = entry.file_name().to_str() {
      names.push(name.to_string());
    }
  }
  names.sort();
  Ok(names)
}

/// The builder invocation for one recipe.
pub fn build_command(config: &Config, recipe_dir: &Path, options: &BuildOptions) -> CommandSpec {
  let mut command = CommandSpec::new(&config.build_tool)
    .arg("build")
    .arg("--recipe-dir")
    .arg(recipe_dir.to_string_lossy())
    .arg("--output-dir")
    .arg(config.output_dir.to_string_lossy())
    .arg(format!("--skip-existing={}", options.skip_existing))
    .arg(format!("--target-platform={}", options.platform));
  for channel in &config.channels {
    command = command.args(["-c", channel.as_str()]);
  }
  if options.no_test {
    command = command.arg("--no-test");
  }
  if options.verbose {
    command = command.arg("-v");
  }
  command
}
