//! `strata detect`: Resolve the order into a group and build plan.

use anyhow::Context;
use clap::Args;
use strata_buildpack::{ApiGate, DescriptorStore, OrderDocument};
use strata_common::config::StrataConfig;
use strata_detect::{DetectInputs, Detector, ProcessExecutor};

use crate::output;

/// Arguments for the `detect` command.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Resolve without writing the group and plan documents.
    #[arg(long)]
    pub dry_run: bool,
}

/// Executes the `detect` command.
///
/// Loads installed modules and the order, runs detection, and writes the
/// resolved group and build plan.
///
/// # Errors
///
/// Returns an error if loading fails, no group passes detection, or the
/// output documents cannot be written.
pub async fn execute(args: DetectArgs, config: &StrataConfig) -> anyhow::Result<()> {
    let store = DescriptorStore::load(&config.buildpacks_dir, Some(&config.extensions_dir))
        .context("failed to load installed modules")?;
    let order = OrderDocument::read(&config.order_path).context("failed to read order")?;
    let gate = ApiGate::new(config.api_policy);

    tracing::info!(
        order = %config.order_path.display(),
        groups = order.order.len(),
        platform_api = %config.platform_api,
        "starting detection"
    );
    let result = Detector::new(&store, &gate, ProcessExecutor, DetectInputs::from_config(config))
        .with_ambient(super::ambient_env())
        .detect(&order)
        .await?;

    println!("{}", output::format_group(&result.group));
    if args.dry_run {
        return Ok(());
    }
    result
        .group_document()
        .write(&config.group_path)
        .context("failed to write group")?;
    result.plan.write(&config.plan_path).context("failed to write plan")?;
    tracing::info!(
        group = %config.group_path.display(),
        plan = %config.plan_path.display(),
        "wrote detection results"
    );
    Ok(())
}
