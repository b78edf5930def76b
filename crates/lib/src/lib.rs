//! pkgctl-lib: build, publish and retract conda packages from a recipe tree.
//!
//! The crate is organised around the life of one package:
//! - `query`: asks the local output directory and remote channels whether a
//!   package version already exists
//! - `build`: decides between skipping and building, drives the external
//!   builder and records the result
//! - `manifest`: the locked JSON record of the latest outcome per platform
//!   and package
//! - `publish` / `retract`: upload a recorded artifact or delete published
//!   versions from a remote channel

pub mod batch;
pub mod build;
pub mod config;
pub mod consts;
pub mod credentials;
pub mod lock;
pub mod manifest;
pub mod platform;
pub mod process;
pub mod publish;
pub mod query;
pub mod retract;
pub mod util;
