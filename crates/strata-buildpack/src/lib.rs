//! # strata-buildpack
//!
//! Module metadata for the strata lifecycle.
//!
//! Handles:
//! - **API**: module and platform API versions and the compatibility gate.
//! - **Descriptor**: `buildpack.toml` / `extension.toml` loading and validation.
//! - **Order**: order, group, and group element documents.
//! - **Plan**: detect plan output and the persisted build plan.
//! - **Store**: the frozen descriptor arena behind module lookup.
//! - **Graph**: meta-buildpack reference graph for static cycle checks.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod api;
pub mod descriptor;
pub mod document;
pub mod graph;
pub mod order;
pub mod plan;
pub mod store;

pub use api::{ApiGate, ApiSet, ApiVerifier, ApiVersion};
pub use descriptor::{Descriptor, ModuleInfo};
pub use graph::{MissingReference, ReferenceGraph};
pub use order::{Group, GroupDocument, GroupElement, Order, OrderDocument};
pub use plan::{BuildPlan, BuildPlanEntry, DetectPlan, PlanSections, Provide, Require};
pub use store::{DescriptorStore, ModuleLookup};
