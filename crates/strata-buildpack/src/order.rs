//! Order, group and group element documents.
//!
//! An [`Order`] lists group alternatives in precedence order. A [`Group`] is
//! an ordered list of [`GroupElement`] references that are only resolved to
//! descriptors when detection reaches them.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::error::Result;
use strata_common::types::{ModuleKey, ModuleKind};

use crate::document;

/// Reference to a buildpack or extension inside a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupElement {
    /// Module API, filled in from the descriptor once resolved.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api: String,
    /// Module homepage, filled in from the descriptor once resolved.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage: String,
    /// Module identifier.
    pub id: String,
    /// Whether the group may pass without this module.
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    /// Module version. Empty selects the only installed version.
    #[serde(default)]
    pub version: String,
    /// Kind tag; carried by the document section, not by the element.
    #[serde(skip)]
    pub kind: ModuleKind,
}

impl GroupElement {
    /// Buildpack reference with the given identity.
    #[must_use]
    pub fn buildpack(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Extension reference with the given identity.
    #[must_use]
    pub fn extension(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: ModuleKind::Extension,
            ..Self::buildpack(id, version)
        }
    }

    /// Same reference marked optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Same reference marked required.
    #[must_use]
    pub const fn no_opt(mut self) -> Self {
        self.optional = false;
        self
    }

    /// Arena key this reference resolves through.
    #[must_use]
    pub fn key(&self) -> ModuleKey {
        ModuleKey::new(self.kind, self.id.clone(), self.version.clone())
    }
}

impl fmt::Display for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// Ordered composition of module references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Members in execution order.
    #[serde(rename = "group", default)]
    pub members: Vec<GroupElement>,
}

impl Group {
    /// Group over `members`.
    #[must_use]
    pub const fn new(members: Vec<GroupElement>) -> Self {
        Self { members }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// This group's members followed by those of `other`.
    #[must_use]
    pub fn append(mut self, other: &Self) -> Self {
        self.members.extend(other.members.iter().cloned());
        self
    }

    /// Same members with every kind tag set to `kind`.
    #[must_use]
    pub fn with_kind(mut self, kind: ModuleKind) -> Self {
        for member in &mut self.members {
            member.kind = kind;
        }
        self
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.members.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Group alternatives in precedence order.
pub type Order = Vec<Group>;

/// The platform's `order.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDocument {
    /// Buildpack group alternatives.
    #[serde(default)]
    pub order: Order,
    /// Extension group alternatives, tried ahead of each buildpack group.
    #[serde(
        default,
        rename = "order-ext",
        alias = "order-extensions",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub order_ext: Order,
}

impl OrderDocument {
    /// Reads an order document and tags `order-ext` members as extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn read(path: &Path) -> Result<Self> {
        let doc: Self = document::read(path)?;
        tracing::debug!(
            path = %path.display(),
            groups = doc.order.len(),
            extension_groups = doc.order_ext.len(),
            "loaded order"
        );
        Ok(doc.tagged())
    }

    fn tagged(mut self) -> Self {
        self.order_ext = self
            .order_ext
            .into_iter()
            .map(|g| g.with_kind(ModuleKind::Extension))
            .collect();
        self
    }
}

/// The resolved `group.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDocument {
    /// Resolved buildpacks in execution order.
    #[serde(default)]
    pub group: Vec<GroupElement>,
    /// Resolved extensions in execution order.
    #[serde(default, rename = "group-extensions", skip_serializing_if = "Vec::is_empty")]
    pub group_extensions: Vec<GroupElement>,
}

impl GroupDocument {
    /// Splits a resolved group by kind tag, keeping relative order.
    #[must_use]
    pub fn from_group(group: &Group) -> Self {
        let (group_extensions, group) = group
            .members
            .iter()
            .cloned()
            .partition(|m| m.kind == ModuleKind::Extension);
        Self {
            group,
            group_extensions,
        }
    }

    /// Reads a group document, tagging `group-extensions` members.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn read(path: &Path) -> Result<Self> {
        let mut doc: Self = document::read(path)?;
        for member in &mut doc.group_extensions {
            member.kind = ModuleKind::Extension;
        }
        Ok(doc)
    }

    /// Writes the document to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        document::write(path, "group", self)
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) const fn is_false(value: &bool) -> bool {
    !*value
}
