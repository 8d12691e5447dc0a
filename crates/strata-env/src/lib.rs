//! # strata-env
//!
//! Builds the process environment each module phase runs in.
//!
//! Handles:
//! - **Vars**: ordered variables with host-dependent name matching.
//! - **Env**: allow-listed ambient inheritance and the root-dir map.
//! - **Action**: per-variable operation files (`override`, `default`,
//!   `prepend`, `append`) with optional custom delimiters.
//! - **Compose**: the left-to-right fold over ordered layer directories.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod action;
pub mod compose;
pub mod env;
pub mod vars;

pub use action::Action;
pub use compose::{Composition, compose_layers, module_layer_dirs};
pub use env::{AssetPackages, Env, RootDirMap};
pub use vars::Vars;
