//! Unified error types for the strata workspace.
//!
//! Every crate returns [`StrataError`]. Group-level detection failures never
//! surface here while alternatives remain; only exhaustion of the order does.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StrataError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A persisted document could not be decoded.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Document that failed to parse.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A string is not a `major.minor` API version.
    #[error("could not parse '{value}' as an API version")]
    InvalidApiVersion {
        /// Text as written.
        value: String,
    },

    /// A descriptor parsed but violates a structural invariant.
    #[error("invalid descriptor {path}: {message}")]
    InvalidDescriptor {
        /// Descriptor file.
        path: PathBuf,
        /// Violated invariant.
        message: String,
    },

    /// A module or platform API is outside the supported range, or its use
    /// was escalated by the configured policy.
    #[error("{target} '{name}' requests API '{requested}': {reason}")]
    IncompatibleApi {
        /// `platform`, `buildpack` or `extension`.
        target: &'static str,
        /// Display name of the requester.
        name: String,
        /// Requested API version as written.
        requested: String,
        /// Why the API was rejected.
        reason: String,
    },

    /// A meta-buildpack references itself through its nested orders.
    #[error("cyclic order: {module} reappears in expansion path [{}]", .path.join(" -> "))]
    CyclicOrder {
        /// Module that closed the cycle.
        module: String,
        /// Active expansion path when the cycle was found.
        path: Vec<String>,
    },

    /// Every candidate group was rejected.
    #[error("no buildpack group passed detection ({attempts} group(s) tried)")]
    UnsatisfiablePlan {
        /// Number of concrete groups evaluated.
        attempts: usize,
    },

    /// Every candidate group was rejected and at least one module errored.
    #[error("no buildpack group passed detection and modules reported errors ({attempts} group(s) tried)")]
    BuildModuleFailed {
        /// Number of concrete groups evaluated.
        attempts: usize,
    },

    /// A layer environment file could not be applied.
    #[error("cannot apply {variable} from {path}: {message}")]
    EnvComposition {
        /// Offending file.
        path: PathBuf,
        /// Variable the file targets.
        variable: String,
        /// What was malformed.
        message: String,
    },

    /// JSON serialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// A document could not be encoded.
    #[error("failed to encode {document}: {message}")]
    Encode {
        /// Name of the document being written.
        document: &'static str,
        /// Encoder message.
        message: String,
    },
}

impl StrataError {
    /// Builds an [`StrataError::Io`] bound to `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status reported for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::IncompatibleApi { target, .. } if *target == "platform" => {
                constants::CODE_INCOMPATIBLE_PLATFORM_API
            }
            Self::IncompatibleApi { .. } => constants::CODE_INCOMPATIBLE_MODULE_API,
            Self::UnsatisfiablePlan { .. } => constants::CODE_FAILED_DETECT,
            Self::BuildModuleFailed { .. } => constants::CODE_FAILED_DETECT_WITH_ERRORS,
            Self::Config { .. } | Self::InvalidApiVersion { .. } => constants::CODE_INVALID_ARGS,
            _ => constants::CODE_FAILED,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StrataError>;
