//! # strata-common
//!
//! Shared identity types, error definitions, configuration models, and
//! constants used across the entire strata workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives that the descriptor store,
//! the environment composer, and the detection runner build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
