//! Configuration model for a strata run.
//!
//! Everything here is supplied once at process start and passed down
//! explicitly. No component reads process-wide policy on its own.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::StrataError;

/// How a deprecated or experimental API request is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    /// Proceed silently.
    Quiet,
    /// Log a warning and proceed.
    #[default]
    Warn,
    /// Reject the request as incompatible.
    Error,
}

impl FromStr for ApiMode {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(StrataError::Config {
                message: format!("unknown API mode '{other}' (expected quiet, warn or error)"),
            }),
        }
    }
}

impl fmt::Display for ApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quiet => write!(f, "quiet"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Policy applied by the API compatibility gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPolicy {
    /// Handling of deprecated APIs.
    pub deprecation: ApiMode,
    /// Handling of experimental APIs.
    pub experimental: ApiMode,
}

impl Default for ApiPolicy {
    fn default() -> Self {
        Self {
            deprecation: ApiMode::Warn,
            experimental: ApiMode::Error,
        }
    }
}

/// Root configuration for a detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrataConfig {
    /// Directory of installed buildpacks.
    pub buildpacks_dir: PathBuf,
    /// Directory of installed extensions.
    pub extensions_dir: PathBuf,
    /// Order document to resolve.
    pub order_path: PathBuf,
    /// Where the resolved group is written.
    pub group_path: PathBuf,
    /// Where the build plan is written.
    pub plan_path: PathBuf,
    /// Application source directory, the working directory of detect.
    pub app_dir: PathBuf,
    /// Platform directory handed to modules.
    pub platform_dir: PathBuf,
    /// Layers directory.
    pub layers_dir: PathBuf,
    /// Platform API requested by the platform.
    pub platform_api: String,
    /// Compatibility gate policy.
    pub api_policy: ApiPolicy,
    /// Upper bound on one detect invocation, in seconds.
    pub detect_timeout_secs: u64,
}

impl StrataConfig {
    /// Detect timeout as a [`Duration`].
    #[must_use]
    pub const fn detect_timeout(&self) -> Duration {
        Duration::from_secs(self.detect_timeout_secs)
    }

    /// Layers directory of module `id`, with `/` in the id escaped as `_`.
    #[must_use]
    pub fn module_layers_dir(&self, id: &str) -> PathBuf {
        self.layers_dir.join(id.replace('/', "_"))
    }
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            buildpacks_dir: PathBuf::from(constants::DEFAULT_BUILDPACKS_DIR),
            extensions_dir: PathBuf::from(constants::DEFAULT_EXTENSIONS_DIR),
            order_path: PathBuf::from(constants::DEFAULT_ORDER_PATH),
            group_path: PathBuf::from(constants::DEFAULT_GROUP_PATH),
            plan_path: PathBuf::from(constants::DEFAULT_PLAN_PATH),
            app_dir: PathBuf::from(constants::DEFAULT_APP_DIR),
            platform_dir: PathBuf::from(constants::DEFAULT_PLATFORM_DIR),
            layers_dir: PathBuf::from(constants::DEFAULT_LAYERS_DIR),
            platform_api: constants::DEFAULT_PLATFORM_API.to_string(),
            api_policy: ApiPolicy::default(),
            detect_timeout_secs: constants::DEFAULT_DETECT_TIMEOUT_SECS,
        }
    }
}
