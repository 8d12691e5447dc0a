//! `strata env`: Compose the build environment over layer directories.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use strata_buildpack::ApiVersion;
use strata_common::config::StrataConfig;
use strata_env::{Env, compose_layers, module_layer_dirs};

use crate::output::{self, EnvFormat};

/// Arguments for the `env` command.
#[derive(Args, Debug)]
pub struct EnvArgs {
    /// Layer directory to apply; repeat in group order.
    #[arg(long = "layer", value_name = "DIR")]
    pub layers: Vec<PathBuf>,

    /// A module's layers directory; its layer subdirectories are applied
    /// after any `--layer`, in name order.
    #[arg(long, value_name = "DIR")]
    pub from: Option<PathBuf>,

    /// Module id whose layers under `--layers-dir` are applied after
    /// `--from`; repeat in group order.
    #[arg(long = "module", value_name = "ID")]
    pub modules: Vec<String>,

    /// Module API of the module the environment is built for.
    #[arg(long, default_value = strata_common::constants::DEFAULT_MODULE_API)]
    pub module_api: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = EnvFormat::Text)]
    pub format: EnvFormat,
}

/// Executes the `env` command.
///
/// # Errors
///
/// Returns an error if an API version does not parse, no layer is given,
/// or a layer directory cannot be read.
pub fn execute(args: &EnvArgs, config: &StrataConfig) -> anyhow::Result<()> {
    let platform_api: ApiVersion = config.platform_api.parse().context("invalid platform API")?;
    let module_api: ApiVersion = args.module_api.parse().context("invalid module API")?;

    let mut layers = args.layers.clone();
    if let Some(dir) = &args.from {
        layers.extend(module_layer_dirs(dir)?);
    }
    for id in &args.modules {
        layers.extend(module_layer_dirs(&config.module_layers_dir(id))?);
    }
    if layers.is_empty() {
        anyhow::bail!("no layer directories given; use --layer, --from or --module");
    }

    let base = Env::for_build(super::ambient_env(), &platform_api, &module_api);
    let composition = compose_layers(base, &layers)?;
    if !composition.skipped.is_empty() {
        tracing::warn!(skipped = composition.skipped.len(), "some environment files were not applied");
    }
    println!("{}", output::render_env(&composition.env, args.format)?);
    Ok(())
}
