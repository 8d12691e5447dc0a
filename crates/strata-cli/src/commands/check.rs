//! `strata check`: Validate installed modules against the order.

use anyhow::Context;
use clap::Args;
use strata_buildpack::{ApiGate, ApiVerifier, DescriptorStore, OrderDocument, ReferenceGraph};
use strata_common::config::StrataConfig;
use strata_common::error::StrataError;

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Skip verifying the API of each installed module.
    #[arg(long)]
    pub skip_module_apis: bool,
}

/// Executes the `check` command.
///
/// Reports every problem found, then fails with the first one.
///
/// # Errors
///
/// Returns an error if loading fails or any cycle, dangling reference or
/// incompatible API is found.
pub fn execute(args: &CheckArgs, config: &StrataConfig) -> anyhow::Result<()> {
    let store = DescriptorStore::load(&config.buildpacks_dir, Some(&config.extensions_dir))
        .context("failed to load installed modules")?;
    let order = OrderDocument::read(&config.order_path).context("failed to read order")?;
    let gate = ApiGate::new(config.api_policy);

    let mut problems: Vec<StrataError> = Vec::new();
    if let Err(err) = gate.verify_platform_api(&config.platform_api) {
        problems.push(err);
    }

    let graph = ReferenceGraph::build(&store, &[&order.order, &order.order_ext]);
    problems.extend(graph.cycles());
    for missing in graph.missing() {
        let referrer = missing
            .referrer
            .as_ref()
            .map_or_else(|| "order".to_string(), ToString::to_string);
        tracing::warn!(referrer = %referrer, module = %missing.reference, "dangling reference");
        problems.push(StrataError::NotFound {
            kind: missing.reference.kind.as_str(),
            id: missing.reference.to_string(),
        });
    }

    if !args.skip_module_apis {
        problems.extend(store.iter().filter_map(|d| {
            gate.verify_module_api(d.kind, &d.key().to_string(), &d.api).err()
        }));
    }

    for problem in &problems {
        println!("error: {problem}");
    }
    match problems.into_iter().next() {
        Some(first) => Err(first.into()),
        None => {
            println!("ok: {} module(s), {} group(s)", store.len(), order.order.len());
            Ok(())
        }
    }
}
