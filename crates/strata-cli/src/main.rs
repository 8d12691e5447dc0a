//! # strata
//!
//! Resolves a buildpack order into one group and build plan, and composes
//! the environments resolved modules run in.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use strata_common::constants;
use strata_common::error::StrataError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::{Cli, LogFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.log_level.as_deref(), cli.log_format) {
        eprintln!("error: {err:#}");
        return ExitCode::from(exit_status(constants::CODE_INVALID_ARGS));
    }

    match commands::execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_status(exit_code(&err)))
        }
    }
}

fn init_tracing(level: Option<&str>, format: LogFormat) -> anyhow::Result<()> {
    let filter = log_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

/// `--log-level` wins over `RUST_LOG`; `info` applies when neither is set.
fn log_filter(level: Option<&str>) -> anyhow::Result<EnvFilter> {
    match level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level"),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

/// Status code for a failed command: the dedicated code of the underlying
/// [`StrataError`], or the generic failure code.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StrataError>())
        .map_or(constants::CODE_FAILED, StrataError::exit_code)
}

fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
