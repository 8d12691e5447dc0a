//! Module identity primitives used across the strata workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Which kind of module a reference or descriptor denotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// A regular or meta buildpack.
    #[default]
    Buildpack,
    /// An image extension.
    Extension,
}

impl ModuleKind {
    /// Lowercase name used in messages and error targets.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buildpack => "buildpack",
            Self::Extension => "extension",
        }
    }

    /// Descriptor file name for modules of this kind.
    #[must_use]
    pub const fn descriptor_file(self) -> &'static str {
        match self {
            Self::Buildpack => constants::BUILDPACK_DESCRIPTOR,
            Self::Extension => constants::EXTENSION_DESCRIPTOR,
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arena key of a module: its kind tag plus `id@version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleKey {
    /// Kind tag.
    pub kind: ModuleKind,
    /// Module identifier, e.g. `example/node`.
    pub id: String,
    /// Module version.
    pub version: String,
}

impl ModuleKey {
    /// Creates a key from its parts.
    #[must_use]
    pub fn new(kind: ModuleKind, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            version: version.into(),
        }
    }

    /// Shorthand for a buildpack key.
    #[must_use]
    pub fn buildpack(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(ModuleKind::Buildpack, id, version)
    }

    /// Shorthand for an extension key.
    #[must_use]
    pub fn extension(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(ModuleKind::Extension, id, version)
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
