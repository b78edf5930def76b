//! End-to-end tests driving the pkgctl binary against fake builder, search
//! and object-storage tools written as shell scripts.

#![cfg(unix)]

mod common;

mod build_tests;
mod manifest_tests;
mod publish_tests;
mod retract_tests;
