//! CLI command definitions and dispatch.

pub mod check;
pub mod detect;
pub mod env;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use strata_common::config::{ApiMode, ApiPolicy, StrataConfig};
use strata_common::constants;

/// strata: buildpack group resolution for container image builds.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Platform layout and API policy.
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Log filter; overrides `RUST_LOG`, which defaults to `info`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the order into a group and build plan.
    Detect(detect::DetectArgs),
    /// Compose the build environment over ordered layer directories.
    Env(env::EnvArgs),
    /// Report cyclic and dangling order references and incompatible APIs.
    Check(check::CheckArgs),
}

/// Platform layout and policy shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Directory of installed buildpacks.
    #[arg(long, global = true, env = "CNB_BUILDPACKS_DIR", default_value = constants::DEFAULT_BUILDPACKS_DIR)]
    pub buildpacks_dir: PathBuf,

    /// Directory of installed extensions.
    #[arg(long, global = true, env = "CNB_EXTENSIONS_DIR", default_value = constants::DEFAULT_EXTENSIONS_DIR)]
    pub extensions_dir: PathBuf,

    /// Order document to resolve.
    #[arg(long, global = true, env = "CNB_ORDER_PATH", default_value = constants::DEFAULT_ORDER_PATH)]
    pub order: PathBuf,

    /// Layers directory.
    #[arg(long, global = true, env = "CNB_LAYERS_DIR", default_value = constants::DEFAULT_LAYERS_DIR)]
    pub layers_dir: PathBuf,

    /// Output group document. Defaults to `<layers-dir>/group.toml`.
    #[arg(long, global = true, env = "CNB_GROUP_PATH")]
    pub group: Option<PathBuf>,

    /// Output plan document. Defaults to `<layers-dir>/plan.toml`.
    #[arg(long, global = true, env = "CNB_PLAN_PATH")]
    pub plan: Option<PathBuf>,

    /// Application directory.
    #[arg(long, global = true, env = "CNB_APP_DIR", default_value = constants::DEFAULT_APP_DIR)]
    pub app_dir: PathBuf,

    /// Platform directory.
    #[arg(long, global = true, env = constants::ENV_PLATFORM_DIR, default_value = constants::DEFAULT_PLATFORM_DIR)]
    pub platform_dir: PathBuf,

    /// Platform API requested by the platform.
    #[arg(long, global = true, env = constants::ENV_PLATFORM_API, default_value = constants::DEFAULT_PLATFORM_API)]
    pub platform_api: String,

    /// Handling of deprecated APIs: quiet, warn or error.
    #[arg(long, global = true, env = constants::ENV_DEPRECATION_MODE, default_value_t = ApiMode::Warn)]
    pub deprecation_mode: ApiMode,

    /// Handling of experimental APIs: quiet, warn or error.
    #[arg(long, global = true, env = constants::ENV_EXPERIMENTAL_MODE, default_value_t = ApiMode::Error)]
    pub experimental_mode: ApiMode,

    /// Upper bound on one detect run, in seconds.
    #[arg(long, global = true, env = "CNB_DETECT_TIMEOUT", default_value_t = constants::DEFAULT_DETECT_TIMEOUT_SECS)]
    pub detect_timeout: u64,
}

impl ConfigArgs {
    /// Resolves the arguments into a run configuration.
    #[must_use]
    pub fn into_config(self) -> StrataConfig {
        let group_path = self.group.unwrap_or_else(|| self.layers_dir.join("group.toml"));
        let plan_path = self.plan.unwrap_or_else(|| self.layers_dir.join("plan.toml"));
        StrataConfig {
            buildpacks_dir: self.buildpacks_dir,
            extensions_dir: self.extensions_dir,
            order_path: self.order,
            group_path,
            plan_path,
            app_dir: self.app_dir,
            platform_dir: self.platform_dir,
            layers_dir: self.layers_dir,
            platform_api: self.platform_api,
            api_policy: ApiPolicy {
                deprecation: self.deprecation_mode,
                experimental: self.experimental_mode,
            },
            detect_timeout_secs: self.detect_timeout,
        }
    }
}

/// Ambient process environment, skipping variables that are not UTF-8.
pub fn ambient_env() -> Vec<(String, String)> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.into_config();
    match cli.command {
        Command::Detect(args) => detect::execute(args, &config).await,
        Command::Env(args) => env::execute(&args, &config),
        Command::Check(args) => check::execute(&args, &config),
    }
}
