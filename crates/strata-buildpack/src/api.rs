//! API versions and the compatibility gate.
//!
//! Versions are `major.minor`. Within major version 0 every minor is its
//! own incompatible API; from 1 onwards a newer minor supersedes older ones.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use strata_common::config::{ApiMode, ApiPolicy};
use strata_common::constants;
use strata_common::error::{Result, StrataError};
use strata_common::types::ModuleKind;
use strata_env::AssetPackages;

/// A `major.minor` API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
}

/// First module and platform API supporting asset packages.
const ASSET_PACKAGES_SINCE: ApiVersion = ApiVersion::new(0, 7);

impl ApiVersion {
    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// Whether an implementation of `other` also satisfies `self`.
    #[must_use]
    pub fn is_superseded_by(&self, other: &Self) -> bool {
        if self.major == 0 {
            return self == other;
        }
        self.major == other.major && self.minor <= other.minor
    }

    /// Whether `self` is at least `other`.
    #[must_use]
    pub fn at_least(&self, other: &Self) -> bool {
        self >= other
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor).cmp(&(other.major, other.minor))
    }
}

impl FromStr for ApiVersion {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix('v').unwrap_or(s);
        let (major, minor) = trimmed.split_once('.').unwrap_or((trimmed, "0"));
        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| StrataError::InvalidApiVersion { value: s.to_string() })
        };
        Ok(Self::new(parse(major)?, parse(minor)?))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl AssetPackages for ApiVersion {
    fn supports_asset_packages(&self) -> bool {
        self.at_least(&ASSET_PACKAGES_SINCE)
    }
}

/// Supported, deprecated and experimental APIs of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSet {
    /// APIs this lifecycle implements.
    pub supported: Vec<ApiVersion>,
    /// Supported APIs scheduled for removal.
    pub deprecated: Vec<ApiVersion>,
    /// Supported APIs not yet stable.
    pub experimental: Vec<ApiVersion>,
}

impl ApiSet {
    /// Module APIs: 0.2 through 0.10, with 0.2 to 0.5 deprecated.
    #[must_use]
    pub fn modules() -> Self {
        Self {
            supported: (2..=10).map(|minor| ApiVersion::new(0, minor)).collect(),
            deprecated: (2..=5).map(|minor| ApiVersion::new(0, minor)).collect(),
            experimental: Vec::new(),
        }
    }

    /// Platform APIs: 0.7 through 0.13, with 0.7 and 0.8 deprecated and
    /// 0.13 experimental.
    #[must_use]
    pub fn platform() -> Self {
        Self {
            supported: (7..=13).map(|minor| ApiVersion::new(0, minor)).collect(),
            deprecated: vec![ApiVersion::new(0, 7), ApiVersion::new(0, 8)],
            experimental: vec![ApiVersion::new(0, 13)],
        }
    }

    /// Whether `target` is implemented.
    #[must_use]
    pub fn is_supported(&self, target: &ApiVersion) -> bool {
        self.supported.iter().any(|s| target.is_superseded_by(s))
    }

    /// Whether `target` is deprecated.
    #[must_use]
    pub fn is_deprecated(&self, target: &ApiVersion) -> bool {
        self.deprecated.iter().any(|d| target.is_superseded_by(d))
    }

    /// Whether `target` is experimental.
    #[must_use]
    pub fn is_experimental(&self, target: &ApiVersion) -> bool {
        self.experimental.iter().any(|e| target.is_superseded_by(e))
    }
}

/// Compatibility gate consulted before a module or platform participates.
pub trait ApiVerifier {
    /// Checks a module's requested API.
    ///
    /// An empty `requested` API is treated as the oldest module API.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::IncompatibleApi`] if the API is unsupported or
    /// its deprecated or experimental status is escalated by policy.
    fn verify_module_api(&self, kind: ModuleKind, name: &str, requested: &str) -> Result<()>;

    /// Checks the platform's requested API.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::IncompatibleApi`] on rejection.
    fn verify_platform_api(&self, requested: &str) -> Result<()>;
}

/// Default gate over the built-in API sets and an explicit policy.
#[derive(Debug, Clone)]
pub struct ApiGate {
    modules: ApiSet,
    platform: ApiSet,
    policy: ApiPolicy,
}

impl ApiGate {
    /// Gate over the built-in API sets.
    #[must_use]
    pub fn new(policy: ApiPolicy) -> Self {
        Self::with_sets(ApiSet::modules(), ApiSet::platform(), policy)
    }

    /// Gate over custom API sets.
    #[must_use]
    pub const fn with_sets(modules: ApiSet, platform: ApiSet, policy: ApiPolicy) -> Self {
        Self {
            modules,
            platform,
            policy,
        }
    }

    fn check(&self, target: &'static str, name: &str, requested: &str, set: &ApiSet) -> Result<()> {
        let reject = |reason: String| StrataError::IncompatibleApi {
            target,
            name: name.to_string(),
            requested: requested.to_string(),
            reason,
        };
        let version: ApiVersion = requested.parse().map_err(|e: StrataError| reject(e.to_string()))?;
        if !set.is_supported(&version) {
            return Err(reject(format!("API {version} is incompatible with this lifecycle")));
        }
        if set.is_deprecated(&version) {
            self.escalate(self.policy.deprecation, "deprecated", target, name, requested)
                .map_err(|()| {
                    reject(format!(
                        "deprecated APIs are disabled by {}=error",
                        constants::ENV_DEPRECATION_MODE
                    ))
                })?;
        }
        if set.is_experimental(&version) {
            self.escalate(self.policy.experimental, "experimental", target, name, requested)
                .map_err(|()| {
                    reject(format!(
                        "experimental APIs are disabled by {}=error",
                        constants::ENV_EXPERIMENTAL_MODE
                    ))
                })?;
        }
        Ok(())
    }

    #[allow(clippy::unused_self)]
    fn escalate(
        &self,
        mode: ApiMode,
        status: &str,
        target: &str,
        name: &str,
        requested: &str,
    ) -> std::result::Result<(), ()> {
        match mode {
            ApiMode::Quiet => Ok(()),
            ApiMode::Warn => {
                tracing::warn!(module = name, requested, "{target} requests {status} API");
                Ok(())
            }
            ApiMode::Error => {
                tracing::error!(module = name, requested, "{target} requests {status} API");
                Err(())
            }
        }
    }
}

impl ApiVerifier for ApiGate {
    fn verify_module_api(&self, kind: ModuleKind, name: &str, requested: &str) -> Result<()> {
        let requested = if requested.is_empty() {
            constants::DEFAULT_MODULE_API
        } else {
            requested
        };
        self.check(kind.as_str(), name, requested, &self.modules)
    }

    fn verify_platform_api(&self, requested: &str) -> Result<()> {
        self.check("platform", "platform", requested, &self.platform)
    }
}
