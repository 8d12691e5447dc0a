//! Detect plan output and the persisted build plan.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::error::{Result, StrataError};

use crate::document;
use crate::order::GroupElement;

/// A dependency a module needs from itself or an earlier module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Require {
    /// Dependency name, matched exactly against provides.
    pub name: String,
    /// Free-form metadata passed through to the build plan.
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub metadata: toml::Table,
}

impl Require {
    /// Require without metadata.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: toml::Table::new(),
        }
    }
}

/// A dependency a module offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provide {
    /// Dependency name.
    pub name: String,
}

impl Provide {
    /// Provide with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One requires/provides alternative of a detect plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSections {
    /// Needed dependencies.
    #[serde(default)]
    pub requires: Vec<Require>,
    /// Offered dependencies.
    #[serde(default)]
    pub provides: Vec<Provide>,
}

impl PlanSections {
    /// Sections over the given names, without metadata.
    #[must_use]
    pub fn new(requires: &[&str], provides: &[&str]) -> Self {
        Self {
            requires: requires.iter().copied().map(Require::named).collect(),
            provides: provides.iter().copied().map(Provide::named).collect(),
        }
    }
}

/// Plan a module writes from its detect step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectPlan {
    /// Primary requires.
    #[serde(default)]
    pub requires: Vec<Require>,
    /// Primary provides.
    #[serde(default)]
    pub provides: Vec<Provide>,
    /// Further alternatives, tried after the primary one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<PlanSections>,
}

impl DetectPlan {
    /// Reads the plan a detect step wrote. A missing file is an empty plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn read(path: &Path) -> Result<Self> {
        match document::read(path) {
            Err(StrataError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Primary sections followed by each `[[or]]` alternative.
    #[must_use]
    pub fn alternatives(&self) -> Vec<PlanSections> {
        std::iter::once(PlanSections {
            requires: self.requires.clone(),
            provides: self.provides.clone(),
        })
        .chain(self.or.iter().cloned())
        .collect()
    }
}

/// One dependency of the build plan with everything that provides and
/// requires it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildPlanEntry {
    /// Dependency name.
    pub name: String,
    /// Modules providing the dependency, in group order.
    #[serde(default)]
    pub providers: Vec<GroupElement>,
    /// Requirement on the dependency, as first stated in group order.
    #[serde(default)]
    pub requires: Vec<Require>,
}

/// The persisted `plan.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Entries in order of first mention.
    #[serde(default)]
    pub entries: Vec<BuildPlanEntry>,
}

impl BuildPlan {
    /// Entry for `name`, if present.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&BuildPlanEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Names of all entries in plan order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Reads a build plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn read(path: &Path) -> Result<Self> {
        document::read(path)
    }

    /// Writes the plan to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan cannot be encoded or written.
    pub fn write(&self, path: &Path) -> Result<()> {
        document::write(path, "plan", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_plan_lists_primary_then_or_sections() {
        let plan: DetectPlan = document::parse(
            Path::new("plan.toml"),
            r#"
[[provides]]
name = "node"

[[requires]]
name = "node"
[requires.metadata]
version = "20"

[[or]]
[[or.provides]]
name = "yarn"
"#,
        )
        .expect("parse");

        let alternatives = plan.alternatives();
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0].requires[0].name, "node");
        assert_eq!(
            alternatives[0].requires[0].metadata.get("version").and_then(toml::Value::as_str),
            Some("20")
        );
        assert_eq!(alternatives[1].provides, vec![Provide::named("yarn")]);
        assert!(alternatives[1].requires.is_empty());
    }

    #[test]
    fn missing_detect_plan_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = DetectPlan::read(&dir.path().join("plan.toml")).expect("read");
        assert_eq!(plan, DetectPlan::default());
        assert_eq!(plan.alternatives(), vec![PlanSections::default()]);
    }

    #[test]
    fn malformed_detect_plan_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plan.toml");
        std::fs::write(&path, "[[requires]]\nname = 3\n").expect("write");
        assert!(matches!(DetectPlan::read(&path), Err(StrataError::Parse { .. })));
    }

    #[test]
    fn build_plan_persists_provide_only_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plan.toml");
        let plan = BuildPlan {
            entries: vec![BuildPlanEntry {
                name: "web".into(),
                providers: vec![GroupElement::buildpack("bp-b", "1.0.0")],
                requires: Vec::new(),
            }],
        };
        plan.write(&path).expect("write");
        let reloaded = BuildPlan::read(&path).expect("read");
        assert_eq!(reloaded.names(), vec!["web"]);
        assert_eq!(reloaded, plan);
    }
}
