//! Environments handed to module phases.
//!
//! Ambient variables are inherited only through an allow-list so that
//! unrelated host state never reaches a module. Layers then contribute
//! through their root directories and environment directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_common::constants::PATH_LIST_SEPARATOR;
use strata_common::error::{Result, StrataError};

use crate::action::Action;
use crate::vars::{HOST_IGNORES_CASE, Vars, names_match};

/// Ambient variables every detect and build environment inherits.
pub const BUILD_ENV_INCLUDELIST: &[&str] = &[
    "CNB_STACK_ID",
    "HOSTNAME",
    "HOME",
    "HTTPS_PROXY",
    "https_proxy",
    "HTTP_PROXY",
    "http_proxy",
    "NO_PROXY",
    "no_proxy",
];

/// Variables inherited only when platform and module support asset packages.
pub const ASSETS_ENV_VARS: &[&str] = &["CNB_ASSETS"];

/// Suffix of the file holding a custom delimiter for a variable.
const DELIM_SUFFIX: &str = "delim";

/// Layer subdirectory role to the variables it extends.
pub type RootDirMap = BTreeMap<String, Vec<String>>;

/// The POSIX root-dir map: `bin`, `lib`, `include`, `pkgconfig`.
#[must_use]
pub fn posix_root_dirs() -> RootDirMap {
    [
        ("bin", &["PATH"][..]),
        ("lib", &["LD_LIBRARY_PATH", "LIBRARY_PATH"][..]),
        ("include", &["CPATH"][..]),
        ("pkgconfig", &["PKG_CONFIG_PATH"][..]),
    ]
    .into_iter()
    .map(|(role, names)| {
        (
            role.to_string(),
            names.iter().map(|n| (*n).to_string()).collect(),
        )
    })
    .collect()
}

/// Optional capability shared by platforms and modules.
pub trait AssetPackages {
    /// Whether asset packages are supported.
    fn supports_asset_packages(&self) -> bool;
}

impl AssetPackages for bool {
    fn supports_asset_packages(&self) -> bool {
        *self
    }
}

/// A process environment under construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    /// Layer subdirectory role to candidate variable names.
    pub root_dir_map: RootDirMap,
    /// Accumulated variables.
    pub vars: Vars,
}

impl Env {
    /// Detect-time environment filtered from `environ`.
    ///
    /// Keeps the include-list and the root-dir map variables.
    pub fn for_detect<I, K, V>(environ: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::filtered(environ, HOST_IGNORES_CASE, &[])
    }

    /// Build-time environment filtered from `environ`.
    ///
    /// Additionally keeps [`ASSETS_ENV_VARS`] when both `platform` and
    /// `module` support asset packages.
    pub fn for_build<I, K, V>(
        environ: I,
        platform: &impl AssetPackages,
        module: &impl AssetPackages,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let extra: &[&str] = if platform.supports_asset_packages() && module.supports_asset_packages() {
            ASSETS_ENV_VARS
        } else {
            &[]
        };
        Self::filtered(environ, HOST_IGNORES_CASE, extra)
    }

    /// Filters `environ` through the include-lists with an explicit
    /// name-matching rule.
    pub fn filtered<I, K, V>(environ: I, ignore_case: bool, extra: &[&str]) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let root_dir_map = posix_root_dirs();
        let root_vars: Vec<&str> = root_dir_map
            .values()
            .flat_map(|names| names.iter().map(String::as_str))
            .collect();
        let keep = |name: &str| {
            BUILD_ENV_INCLUDELIST
                .iter()
                .chain(root_vars.iter())
                .chain(extra.iter())
                .any(|allowed| names_match(allowed, name, ignore_case))
        };
        let vars = Vars::from_environ(environ, ignore_case, keep);
        Self { root_dir_map, vars }
    }

    /// Returns the value of `name`, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name)
    }

    /// Renders the environment as `NAME=value` strings.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.vars.list()
    }

    /// Prepends each existing role directory of `layer_dir` to its variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `layer_dir` cannot be made absolute.
    pub fn add_root_dir(&mut self, layer_dir: &Path) -> Result<()> {
        let base = std::path::absolute(layer_dir).map_err(|e| StrataError::io(layer_dir, e))?;
        for (role, names) in &self.root_dir_map {
            let child = base.join(role);
            if !child.is_dir() {
                continue;
            }
            let child = child.to_string_lossy();
            for name in names {
                Action::Prepend.apply(&mut self.vars, name, &child, PATH_LIST_SEPARATOR);
            }
        }
        Ok(())
    }

    /// Applies every operation file in `env_dir` in file-name order.
    ///
    /// A bare `NAME` file uses `default_action`. A missing directory
    /// contributes nothing. A malformed file only affects its own variable:
    /// it is skipped and returned in the list of skipped contributions.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn add_env_dir(&mut self, env_dir: &Path, default_action: Action) -> Result<Vec<StrataError>> {
        let mut skipped = Vec::new();
        for file in env_files(env_dir)? {
            let (name, suffix) = split_file_name(&file.name);
            if suffix == Some(DELIM_SUFFIX) {
                continue;
            }
            if let Err(err) = self.apply_env_file(env_dir, &file.path, name, suffix, default_action) {
                tracing::warn!(path = %file.path.display(), error = %err, "skipping environment file");
                skipped.push(err);
            }
        }
        Ok(skipped)
    }

    /// Applies the platform's `env/` directory as overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn add_platform_env(&mut self, platform_dir: &Path) -> Result<Vec<StrataError>> {
        self.add_env_dir(&platform_dir.join("env"), Action::Override)
    }

    fn apply_env_file(
        &mut self,
        env_dir: &Path,
        path: &Path,
        name: &str,
        suffix: Option<&str>,
        default_action: Action,
    ) -> Result<()> {
        let action = match suffix {
            None => default_action,
            Some(s) => s.parse::<Action>().map_err(|e| env_error(path, name, e.to_string()))?,
        };
        let value = read_utf8(path, name)?;
        let delim = if action.uses_delimiter() {
            read_delim(env_dir, name)?
        } else {
            String::new()
        };
        action.apply(&mut self.vars, name, &value, &delim);
        Ok(())
    }
}

struct EnvFile {
    name: String,
    path: PathBuf,
}

fn env_files(dir: &Path) -> Result<Vec<EnvFile>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StrataError::io(dir, e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StrataError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        files.push(EnvFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn split_file_name(file_name: &str) -> (&str, Option<&str>) {
    match file_name.split_once('.') {
        Some((name, suffix)) => (name, Some(suffix)),
        None => (file_name, None),
    }
}

fn read_utf8(path: &Path, name: &str) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| StrataError::io(path, e))?;
    String::from_utf8(bytes).map_err(|_| env_error(path, name, "value is not valid UTF-8".into()))
}

fn read_delim(env_dir: &Path, name: &str) -> Result<String> {
    let path = env_dir.join(format!("{name}.{DELIM_SUFFIX}"));
    if !path.is_file() {
        return Ok(PATH_LIST_SEPARATOR.to_string());
    }
    read_utf8(&path, name)
}

fn env_error(path: &Path, variable: &str, message: String) -> StrataError {
    StrataError::EnvComposition {
        path: path.to_path_buf(),
        variable: variable.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::create_dir_all(dir).expect("mkdir");
        std::fs::write(dir.join(name), content).expect("write");
    }

    #[test]
    fn detect_env_keeps_only_allowed_variables() {
        let environ = vec![
            ("HOME", "/home/cnb"),
            ("PATH", "/usr/bin"),
            ("AWS_SECRET_ACCESS_KEY", "nope"),
            ("CNB_ASSETS", "/assets"),
        ];
        let env = Env::filtered(environ, false, &[]);
        assert_eq!(env.get("HOME"), Some("/home/cnb"));
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert_eq!(env.get("AWS_SECRET_ACCESS_KEY"), None);
        assert_eq!(env.get("CNB_ASSETS"), None);
    }

    #[test]
    fn build_env_includes_assets_only_when_both_support_them() {
        let environ = vec![("CNB_ASSETS", "/assets")];
        let both = Env::for_build(environ.clone(), &true, &true);
        let platform_only = Env::for_build(environ, &true, &false);
        assert_eq!(both.get("CNB_ASSETS"), Some("/assets"));
        assert_eq!(platform_only.get("CNB_ASSETS"), None);
    }

    #[test]
    fn case_insensitive_filter_accepts_any_case() {
        let env = Env::filtered(vec![("Path", "C:\\bin")], true, &[]);
        assert_eq!(env.get("PATH"), Some("C:\\bin"));
    }

    #[test]
    fn root_dir_prepends_existing_roles_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("bin")).expect("mkdir");
        let mut env = Env::filtered(vec![("PATH", "/usr/bin")], false, &[]);

        env.add_root_dir(dir.path()).expect("root dir");

        let expected = format!("{}{PATH_LIST_SEPARATOR}/usr/bin", dir.path().join("bin").display());
        assert_eq!(env.get("PATH"), Some(expected.as_str()));
        assert_eq!(env.get("LD_LIBRARY_PATH"), None);
    }

    #[test]
    fn env_dir_applies_suffixes_and_custom_delimiter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env_dir = dir.path().join("env");
        write(&env_dir, "JAVA_OPTS.append", "-Xmx1g");
        write(&env_dir, "JAVA_OPTS.delim", " ");
        write(&env_dir, "LANG.default", "C.UTF-8");
        write(&env_dir, "MODE", "release");

        let mut env = Env::filtered(Vec::<(String, String)>::new(), false, &[]);
        env.vars.set("JAVA_OPTS", "-Dfoo=bar");
        let skipped = env.add_env_dir(&env_dir, Action::Override).expect("env dir");

        assert!(skipped.is_empty());
        assert_eq!(env.get("JAVA_OPTS"), Some("-Dfoo=bar -Xmx1g"));
        assert_eq!(env.get("LANG"), Some("C.UTF-8"));
        assert_eq!(env.get("MODE"), Some("release"));
    }

    #[test]
    fn malformed_file_skips_only_its_variable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env_dir = dir.path().join("env");
        write(&env_dir, "BROKEN.sideways", "x");
        write(&env_dir, "GOOD.override", "yes");
        std::fs::write(env_dir.join("BINARY.override"), [0xff_u8, 0xfe]).expect("write");

        let mut env = Env::filtered(Vec::<(String, String)>::new(), false, &[]);
        let skipped = env.add_env_dir(&env_dir, Action::Override).expect("env dir");

        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().all(|e| matches!(e, StrataError::EnvComposition { .. })));
        assert_eq!(env.get("GOOD"), Some("yes"));
        assert_eq!(env.get("BROKEN"), None);
        assert_eq!(env.get("BINARY"), None);
    }

    #[test]
    fn missing_env_dir_contributes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut env = Env::filtered(Vec::<(String, String)>::new(), false, &[]);
        let skipped = env
            .add_env_dir(&dir.path().join("absent"), Action::Override)
            .expect("env dir");
        assert!(skipped.is_empty());
        assert!(env.vars.is_empty());
    }

    #[test]
    fn platform_env_overrides_ambient() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("env"), "HOME", "/platform-home");
        let mut env = Env::filtered(vec![("HOME", "/root")], false, &[]);
        let _ = env.add_platform_env(dir.path()).expect("platform env");
        assert_eq!(env.get("HOME"), Some("/platform-home"));
    }
}
