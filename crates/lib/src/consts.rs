//! Names shared across the crate: application name and environment variables.

pub const APP_NAME: &str = "pkgctl";

pub const ENV_RECIPES_DIR: &str = "PKGCTL_RECIPES_DIR";
pub const ENV_OUTPUT_DIR: &str = "PKGCTL_OUTPUT_DIR";
pub const ENV_ARTIFACT_ROOT: &str = "PKGCTL_ARTIFACT_ROOT";
pub const ENV_MANIFEST: &str = "PKGCTL_MANIFEST";
pub const ENV_CHANNELS: &str = "PKGCTL_CHANNELS";
pub const ENV_PUBLIC_CHANNEL: &str = "PKGCTL_PUBLIC_CHANNEL";
pub const ENV_PRIVATE_CHANNEL: &str = "PKGCTL_PRIVATE_CHANNEL";
pub const ENV_S3_CHANNEL: &str = "PKGCTL_S3_CHANNEL";
pub const ENV_S3_ENDPOINT: &str = "PKGCTL_S3_ENDPOINT";
pub const ENV_S3_REGION: &str = "PKGCTL_S3_REGION";
pub const ENV_PREFIX_URL: &str = "PKGCTL_PREFIX_URL";
pub const ENV_PUBLISH_CHANNEL: &str = "PKGCTL_PUBLISH_CHANNEL";
pub const ENV_BUILD_TOOL: &str = "PKGCTL_BUILD_TOOL";
pub const ENV_SEARCH_TOOL: &str = "PKGCTL_SEARCH_TOOL";
pub const ENV_S3_TOOL: &str = "PKGCTL_S3_TOOL";
pub const ENV_QUERY_TIMEOUT: &str = "PKGCTL_QUERY_TIMEOUT";

/// Path of the primary auth file, shared with rattler-based tools.
pub const ENV_AUTH_FILE: &str = "RATTLER_AUTH_FILE";

pub const ENV_PREFIX_TOKEN: &str = "PREFIX_API_KEY";
pub const ENV_ANACONDA_TOKEN: &str = "ANACONDA_API_KEY";
pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// File every recipe directory must contain.
pub const RECIPE_FILENAME: &str = "recipe.yaml";

/// Archive extensions produced by the builder.
pub const ARCHIVE_EXTENSIONS: [&str; 2] = [".conda", ".tar.bz2"];
