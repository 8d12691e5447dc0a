//! Trying candidate groups in precedence order.
//!
//! Groups are evaluated strictly one after the other so the earliest
//! satisfiable group wins. Members of one group are detected concurrently
//! and reduced in member order afterwards.

use std::collections::HashMap;

use futures_util::future::join_all;
use strata_buildpack::{ApiVerifier, BuildPlan, Descriptor, Group, GroupDocument, GroupElement, ModuleLookup, OrderDocument};
use strata_common::error::{Result, StrataError};
use strata_common::types::ModuleKey;
use strata_env::Env;

use crate::executor::{DetectExecutor, DetectInputs, DetectOutputs, DetectStatus};
use crate::expand::OrderExpander;
use crate::resolver::{self, Contribution};

/// The accepted group and its build plan.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectResult {
    /// Resolved members, extensions and buildpacks, in execution order.
    pub group: Group,
    /// Merged build plan.
    pub plan: BuildPlan,
}

impl DetectResult {
    /// The group as persisted to `group.toml`.
    #[must_use]
    pub fn group_document(&self) -> GroupDocument {
        GroupDocument::from_group(&self.group)
    }
}

enum Verdict {
    Accepted(DetectResult),
    Rejected,
}

/// Runs detection over an order.
///
/// Detect outcomes are cached per module for the life of the detector, so
/// a module that appears in several candidate groups runs once.
#[derive(Debug)]
pub struct Detector<'a, L, V, E> {
    lookup: &'a L,
    verifier: &'a V,
    executor: E,
    inputs: DetectInputs,
    ambient: Vec<(String, String)>,
    cache: HashMap<ModuleKey, DetectOutputs>,
    api_error: Option<StrataError>,
    module_errored: bool,
}

impl<'a, L, V, E> Detector<'a, L, V, E>
where
    L: ModuleLookup,
    V: ApiVerifier,
    E: DetectExecutor,
{
    /// Creates a detector with an empty ambient environment.
    pub fn new(lookup: &'a L, verifier: &'a V, executor: E, inputs: DetectInputs) -> Self {
        Self {
            lookup,
            verifier,
            executor,
            inputs,
            ambient: Vec::new(),
            cache: HashMap::new(),
            api_error: None,
            module_errored: false,
        }
    }

    /// Sets the ambient variables detect environments are filtered from.
    #[must_use]
    pub fn with_ambient(mut self, environ: impl IntoIterator<Item = (String, String)>) -> Self {
        self.ambient = environ.into_iter().collect();
        self
    }

    /// Resolves `order` to the first group whose members pass detection and
    /// whose plan is satisfiable.
    ///
    /// # Errors
    ///
    /// Fails immediately on an incompatible platform API, an unresolvable
    /// reference or a cyclic order. Once every candidate is rejected, fails
    /// with [`StrataError::IncompatibleApi`] if a module API was rejected,
    /// [`StrataError::BuildModuleFailed`] if a module errored, and
    /// [`StrataError::UnsatisfiablePlan`] otherwise.
    pub async fn detect(&mut self, order: &OrderDocument) -> Result<DetectResult> {
        self.verifier.verify_platform_api(&self.inputs.platform_api)?;

        let mut attempts = 0;
        for group in OrderExpander::for_document(self.lookup, order) {
            let group = group?;
            attempts += 1;
            tracing::debug!(group = %group, attempt = attempts, "trying group");
            if let Verdict::Accepted(result) = self.evaluate(&group).await? {
                tracing::info!(group = %result.group, "group passed detection");
                return Ok(result);
            }
        }

        tracing::error!(attempts, "no group passed detection");
        if let Some(err) = self.api_error.take() {
            return Err(err);
        }
        if self.module_errored {
            return Err(StrataError::BuildModuleFailed { attempts });
        }
        Err(StrataError::UnsatisfiablePlan { attempts })
    }

    async fn evaluate(&mut self, group: &Group) -> Result<Verdict> {
        let lookup = self.lookup;
        let mut members: Vec<(&GroupElement, &Descriptor)> = Vec::with_capacity(group.len());
        for element in &group.members {
            let descriptor = lookup.lookup(element.kind, &element.id, &element.version)?;
            if let Err(err) = self
                .verifier
                .verify_module_api(descriptor.kind, &element.to_string(), &descriptor.api)
            {
                tracing::warn!(module = %element, error = %err, "rejecting group");
                let _ = self.api_error.get_or_insert(err);
                return Ok(Verdict::Rejected);
            }
            members.push((element, descriptor));
        }

        self.run_uncached(&members).await?;

        let mut contributions = Vec::with_capacity(members.len());
        for (element, descriptor) in &members {
            let Some(outputs) = self.cache.get(&descriptor.key()) else {
                continue;
            };
            match &outputs.status {
                DetectStatus::Pass => contributions.push(Contribution {
                    element: GroupElement {
                        optional: element.optional,
                        ..descriptor.resolved_element()
                    },
                    alternatives: outputs.plan.alternatives(),
                }),
                DetectStatus::Fail if element.optional => {
                    tracing::debug!(module = %element, "optional module opted out");
                }
                DetectStatus::Fail => {
                    tracing::debug!(module = %element, "required module opted out");
                    return Ok(Verdict::Rejected);
                }
                DetectStatus::Error(message) => {
                    self.module_errored = true;
                    tracing::warn!(module = %element, error = %message, "detect errored");
                    if !element.optional {
                        return Ok(Verdict::Rejected);
                    }
                }
            }
        }

        Ok(match resolver::resolve(&contributions) {
            Some(resolution) => Verdict::Accepted(DetectResult {
                group: resolution.group,
                plan: resolution.plan,
            }),
            None => {
                tracing::debug!(group = %group, "plan unsatisfiable");
                Verdict::Rejected
            }
        })
    }

    async fn run_uncached(&mut self, members: &[(&GroupElement, &Descriptor)]) -> Result<()> {
        let mut pending = Vec::new();
        for (_, descriptor) in members {
            if !self.cache.contains_key(&descriptor.key()) {
                pending.push((*descriptor, self.detect_env(descriptor)?));
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let executor = &self.executor;
        let inputs = &self.inputs;
        let outputs = join_all(
            pending
                .iter()
                .map(|(descriptor, env)| executor.detect(descriptor, inputs, env)),
        )
        .await;

        for ((descriptor, _), output) in pending.iter().zip(outputs) {
            tracing::debug!(module = %descriptor.key(), status = ?output.status, "detect finished");
            let _ = self.cache.insert(descriptor.key(), output);
        }
        Ok(())
    }

    fn detect_env(&self, descriptor: &Descriptor) -> Result<Env> {
        let mut env = Env::for_detect(self.ambient.iter().cloned());
        if !descriptor.info.clear_env {
            let _skipped = env.add_platform_env(&self.inputs.platform_dir)?;
        }
        Ok(env)
    }
}
