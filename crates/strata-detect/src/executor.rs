//! Running a module's detect step.
//!
//! The [`DetectExecutor`] trait is the seam between resolution and child
//! processes; [`ProcessExecutor`] spawns `bin/detect`, tests substitute an
//! in-memory fake.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use strata_buildpack::{Descriptor, DetectPlan};
use strata_common::config::StrataConfig;
use strata_common::constants;
use strata_common::types::ModuleKind;
use strata_env::Env;
use tokio::process::Command;
use tokio::time::timeout;

/// Run-wide inputs shared by every detect invocation.
#[derive(Debug, Clone)]
pub struct DetectInputs {
    /// Application source directory; the working directory of detect.
    pub app_dir: PathBuf,
    /// Platform directory passed as the first argument.
    pub platform_dir: PathBuf,
    /// Platform API exported to modules.
    pub platform_api: String,
    /// Upper bound on a single detect run.
    pub timeout: Duration,
}

impl DetectInputs {
    /// Inputs taken from the run configuration.
    #[must_use]
    pub fn from_config(config: &StrataConfig) -> Self {
        Self {
            app_dir: config.app_dir.clone(),
            platform_dir: config.platform_dir.clone(),
            platform_api: config.platform_api.clone(),
            timeout: config.detect_timeout(),
        }
    }
}

/// Outcome class of a detect run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectStatus {
    /// Exit code 0: the module participates.
    Pass,
    /// Exit code 100: the module opts out.
    Fail,
    /// Any other outcome, including timeouts and unreadable plans.
    Error(String),
}

/// What a detect run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectOutputs {
    /// Pass, fail or error.
    pub status: DetectStatus,
    /// Plan written by a passing module; empty otherwise.
    pub plan: DetectPlan,
}

impl DetectOutputs {
    /// A passing run with its plan.
    #[must_use]
    pub const fn pass(plan: DetectPlan) -> Self {
        Self {
            status: DetectStatus::Pass,
            plan,
        }
    }

    /// An opt-out.
    #[must_use]
    pub fn fail() -> Self {
        Self {
            status: DetectStatus::Fail,
            plan: DetectPlan::default(),
        }
    }

    /// An errored run.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DetectStatus::Error(message.into()),
            plan: DetectPlan::default(),
        }
    }
}

/// Executes one module's detect step.
///
/// Implementations never fail: every problem is folded into
/// [`DetectStatus::Error`] so a single module cannot abort the search.
pub trait DetectExecutor: Sync {
    /// Runs detect for `module` with `env` as its complete environment.
    fn detect(
        &self,
        module: &Descriptor,
        inputs: &DetectInputs,
        env: &Env,
    ) -> impl Future<Output = DetectOutputs> + Send;
}

/// Spawns `<module dir>/bin/detect <platform dir> <plan path>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl DetectExecutor for ProcessExecutor {
    async fn detect(&self, module: &Descriptor, inputs: &DetectInputs, env: &Env) -> DetectOutputs {
        let scratch = match tempfile::Builder::new().prefix("strata-detect-").tempdir() {
            Ok(dir) => dir,
            Err(e) => return DetectOutputs::error(format!("cannot create plan directory: {e}")),
        };
        let plan_path = scratch.path().join("plan.toml");
        let program = module.dir.join("bin").join("detect");
        let dir_var = match module.kind {
            ModuleKind::Buildpack => constants::ENV_BUILDPACK_DIR,
            ModuleKind::Extension => constants::ENV_EXTENSION_DIR,
        };

        let mut command = Command::new(&program);
        let _ = command
            .arg(&inputs.platform_dir)
            .arg(&plan_path)
            .current_dir(&inputs.app_dir)
            .env_clear()
            .envs(env.vars.iter())
            .env(dir_var, &module.dir)
            .env(constants::ENV_PLATFORM_DIR, &inputs.platform_dir)
            .env(constants::ENV_BUILD_PLAN_PATH, &plan_path)
            .env(constants::ENV_PLATFORM_API, &inputs.platform_api)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(module = %module.key(), program = %program.display(), "running detect");
        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return DetectOutputs::error(format!("cannot run {}: {e}", program.display())),
        };

        // Dropping the future on timeout drops the child, which kills it.
        let output = match timeout(inputs.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return DetectOutputs::error(format!("waiting for detect failed: {e}")),
            Err(_) => {
                tracing::warn!(module = %module.key(), timeout = ?inputs.timeout, "detect timed out");
                return DetectOutputs::error(format!("detect timed out after {:?}", inputs.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            tracing::debug!(module = %module.key(), stdout = %stdout.trim_end(), "detect output");
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(module = %module.key(), stderr = %stderr.trim_end(), "detect output");
        }

        match output.status.code() {
            Some(constants::DETECT_PASS) => match DetectPlan::read(&plan_path) {
                Ok(plan) => DetectOutputs::pass(plan),
                Err(e) => DetectOutputs::error(e.to_string()),
            },
            Some(constants::DETECT_FAIL) => DetectOutputs::fail(),
            Some(code) => DetectOutputs::error(format!("detect exited with code {code}")),
            None => DetectOutputs::error("detect was terminated by a signal"),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use super::*;
    use crate::testing::bp;

    fn install_detect(dir: &Path, script: &str) -> Descriptor {
        let bin = dir.join("bin");
        std::fs::create_dir_all(&bin).expect("mkdir");
        let path = bin.join("detect");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        Descriptor {
            dir: dir.to_path_buf(),
            ..bp("example/test")
        }
    }

    fn inputs(root: &Path, timeout: Duration) -> DetectInputs {
        let app_dir = root.join("app");
        let platform_dir = root.join("platform");
        std::fs::create_dir_all(&app_dir).expect("mkdir");
        std::fs::create_dir_all(&platform_dir).expect("mkdir");
        DetectInputs {
            app_dir,
            platform_dir,
            platform_api: "0.12".into(),
            timeout,
        }
    }

    fn env() -> Env {
        Env::filtered(vec![("PATH", "/usr/bin:/bin")], false, &[])
    }

    #[tokio::test]
    async fn passing_detect_returns_its_plan() {
        let dir = tempfile::tempdir().expect("tempdir");
        let module = install_detect(
            &dir.path().join("bp"),
            r#"printf '[[provides]]\nname = "web"\n' > "$2""#,
        );
        let out = ProcessExecutor
            .detect(&module, &inputs(dir.path(), Duration::from_secs(10)), &env())
            .await;
        assert_eq!(out.status, DetectStatus::Pass);
        assert_eq!(out.plan.provides[0].name, "web");
    }

    #[tokio::test]
    async fn exit_100_is_an_opt_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let module = install_detect(&dir.path().join("bp"), "exit 100");
        let out = ProcessExecutor
            .detect(&module, &inputs(dir.path(), Duration::from_secs(10)), &env())
            .await;
        assert_eq!(out.status, DetectStatus::Fail);
    }

    #[tokio::test]
    async fn other_exit_codes_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let module = install_detect(&dir.path().join("bp"), "exit 3");
        let out = ProcessExecutor
            .detect(&module, &inputs(dir.path(), Duration::from_secs(10)), &env())
            .await;
        assert!(matches!(out.status, DetectStatus::Error(msg) if msg.contains("code 3")));
    }

    #[tokio::test]
    async fn environment_is_exactly_the_composed_env_plus_cnb_vars() {
        let dir = tempfile::tempdir().expect("tempdir");
        let module = install_detect(
            &dir.path().join("bp"),
            r#"[ -z "$HOME" ] || exit 1
[ "$CNB_PLATFORM_API" = "0.12" ] || exit 2
[ "$CNB_BUILD_PLAN_PATH" = "$2" ] || exit 3
[ "$(cd "$CNB_BUILDPACK_DIR" && pwd -P)" = "$(cd "$(dirname "$0")/.." && pwd -P)" ] || exit 4
[ "$(pwd -P)" = "$(cd "$CNB_PLATFORM_DIR/../app" && pwd -P)" ] || exit 5
exit 0"#,
        );
        let out = ProcessExecutor
            .detect(&module, &inputs(dir.path(), Duration::from_secs(10)), &env())
            .await;
        assert_eq!(out.status, DetectStatus::Pass);
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let module = install_detect(&dir.path().join("bp"), "sleep 5");
        let out = ProcessExecutor
            .detect(&module, &inputs(dir.path(), Duration::from_millis(100)), &env())
            .await;
        assert!(matches!(out.status, DetectStatus::Error(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn missing_executable_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let module = Descriptor {
            dir: dir.path().join("absent"),
            ..bp("example/absent")
        };
        let out = ProcessExecutor
            .detect(&module, &inputs(dir.path(), Duration::from_secs(1)), &env())
            .await;
        assert!(matches!(out.status, DetectStatus::Error(_)));
    }

    #[tokio::test]
    async fn malformed_plan_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let module = install_detect(&dir.path().join("bp"), r#"echo 'requires = 3' > "$2""#);
        let out = ProcessExecutor
            .detect(&module, &inputs(dir.path(), Duration::from_secs(10)), &env())
            .await;
        assert!(matches!(out.status, DetectStatus::Error(_)));
    }
}
