//! # strata-detect
//!
//! Resolves an order into one concrete group and its build plan.
//!
//! Handles:
//! - **Expand**: lazy depth-first flattening of meta-buildpack orders.
//! - **Executor**: running a module's detect step under a timeout.
//! - **Resolver**: matching requires against provides across a group.
//! - **Detector**: trying candidate groups in precedence order.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod detector;
pub mod executor;
pub mod expand;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use detector::{DetectResult, Detector};
pub use executor::{DetectExecutor, DetectInputs, DetectOutputs, DetectStatus, ProcessExecutor};
pub use expand::{OrderExpander, with_extensions};
pub use resolver::{Contribution, Resolution, resolve};
