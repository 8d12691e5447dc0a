//! Platform layout defaults, exit codes, and environment variable names.

/// Default directory holding installed buildpacks.
pub const DEFAULT_BUILDPACKS_DIR: &str = "/cnb/buildpacks";
/// Default directory holding installed extensions.
pub const DEFAULT_EXTENSIONS_DIR: &str = "/cnb/extensions";
/// Default order document.
pub const DEFAULT_ORDER_PATH: &str = "/cnb/order.toml";
/// Default output path for the resolved group document.
pub const DEFAULT_GROUP_PATH: &str = "/layers/group.toml";
/// Default output path for the build plan document.
pub const DEFAULT_PLAN_PATH: &str = "/layers/plan.toml";
/// Default application source directory.
pub const DEFAULT_APP_DIR: &str = "/workspace";
/// Default platform directory.
pub const DEFAULT_PLATFORM_DIR: &str = "/platform";
/// Default layers directory.
pub const DEFAULT_LAYERS_DIR: &str = "/layers";
/// Platform API assumed when none is requested.
pub const DEFAULT_PLATFORM_API: &str = "0.12";
/// Module API assumed for group elements that do not record one.
pub const DEFAULT_MODULE_API: &str = "0.2";
/// Upper bound on a single detect invocation, in seconds.
pub const DEFAULT_DETECT_TIMEOUT_SECS: u64 = 300;

/// Descriptor file name inside a buildpack directory.
pub const BUILDPACK_DESCRIPTOR: &str = "buildpack.toml";
/// Descriptor file name inside an extension directory.
pub const EXTENSION_DESCRIPTOR: &str = "extension.toml";

/// Detect exit status: the module participates.
pub const DETECT_PASS: i32 = 0;
/// Detect exit status: the module explicitly opts out.
pub const DETECT_FAIL: i32 = 100;

/// Generic failure.
pub const CODE_FAILED: i32 = 1;
/// Invalid arguments or configuration.
pub const CODE_INVALID_ARGS: i32 = 3;
/// Platform API outside the supported range.
pub const CODE_INCOMPATIBLE_PLATFORM_API: i32 = 11;
/// Buildpack or extension API outside the supported range.
pub const CODE_INCOMPATIBLE_MODULE_API: i32 = 12;
/// No group passed detection.
pub const CODE_FAILED_DETECT: i32 = 20;
/// No group passed detection and at least one module errored.
pub const CODE_FAILED_DETECT_WITH_ERRORS: i32 = 21;

/// Policy for deprecated API usage.
pub const ENV_DEPRECATION_MODE: &str = "CNB_DEPRECATION_MODE";
/// Policy for experimental API usage.
pub const ENV_EXPERIMENTAL_MODE: &str = "CNB_EXPERIMENTAL_MODE";
/// Platform API requested by the platform.
pub const ENV_PLATFORM_API: &str = "CNB_PLATFORM_API";
/// Buildpack directory handed to a buildpack's detect.
pub const ENV_BUILDPACK_DIR: &str = "CNB_BUILDPACK_DIR";
/// Extension directory handed to an extension's detect.
pub const ENV_EXTENSION_DIR: &str = "CNB_EXTENSION_DIR";
/// Platform directory handed to detect.
pub const ENV_PLATFORM_DIR: &str = "CNB_PLATFORM_DIR";
/// Scratch plan output path handed to detect.
pub const ENV_BUILD_PLAN_PATH: &str = "CNB_BUILD_PLAN_PATH";

/// Separator between entries of a path list on this host.
#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: &str = ";";
/// Separator between entries of a path list on this host.
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: &str = ":";

/// Application name used in CLI output.
pub const APP_NAME: &str = "strata";
