//! `buildpack.toml` and `extension.toml` descriptors.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_common::constants;
use strata_common::error::{Result, StrataError};
use strata_common::types::{ModuleKey, ModuleKind};
use strata_env::AssetPackages;

use crate::api::ApiVersion;
use crate::document;
use crate::order::{GroupElement, Order, is_false};

/// Identity and options of a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Run detect and build with an environment free of platform variables.
    #[serde(default, rename = "clear-env", skip_serializing_if = "is_false")]
    pub clear_env: bool,
    /// Project homepage.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage: String,
    /// Identifier, e.g. `example/node`.
    #[serde(default)]
    pub id: String,
    /// Human readable name.
    #[serde(default)]
    pub name: String,
    /// Version.
    #[serde(default)]
    pub version: String,
    /// SBOM media types the module can emit.
    #[serde(default, rename = "sbom-formats", skip_serializing_if = "Vec::is_empty")]
    pub sbom_formats: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DescriptorDoc {
    #[serde(default)]
    api: String,
    buildpack: Option<ModuleInfo>,
    extension: Option<ModuleInfo>,
    #[serde(default)]
    order: Order,
}

/// A loaded and validated module descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Module API the module was written against.
    pub api: String,
    /// Buildpack or extension.
    pub kind: ModuleKind,
    /// Identity block.
    pub info: ModuleInfo,
    /// Nested order; non-empty only for meta-buildpacks.
    pub order: Order,
    /// Directory the descriptor was loaded from.
    pub dir: PathBuf,
}

impl Descriptor {
    /// Reads and validates the descriptor at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or does
    /// not declare exactly one well-formed module.
    pub fn read(path: &Path) -> Result<Self> {
        let doc: DescriptorDoc = document::read(path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_doc(path, doc, dir)
    }

    /// Parses and validates descriptor text as if loaded from `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or fails validation.
    pub fn from_toml(dir: &Path, content: &str) -> Result<Self> {
        let path = dir.join(constants::BUILDPACK_DESCRIPTOR);
        let doc: DescriptorDoc = document::parse(&path, content)?;
        Self::from_doc(&path, doc, dir.to_path_buf())
    }

    fn from_doc(path: &Path, doc: DescriptorDoc, dir: PathBuf) -> Result<Self> {
        let invalid = |message: &str| StrataError::InvalidDescriptor {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        let (kind, info) = match (doc.buildpack, doc.extension) {
            (Some(info), None) => (ModuleKind::Buildpack, info),
            (None, Some(info)) => (ModuleKind::Extension, info),
            (Some(_), Some(_)) => return Err(invalid("declares both [buildpack] and [extension]")),
            (None, None) => return Err(invalid("declares neither [buildpack] nor [extension]")),
        };
        if info.id.is_empty() {
            return Err(invalid("module id is empty"));
        }
        if kind == ModuleKind::Extension && !doc.order.is_empty() {
            return Err(invalid("extensions cannot declare an order"));
        }
        Ok(Self {
            api: doc.api,
            kind,
            info,
            order: doc.order,
            dir,
        })
    }

    /// Arena key of this module.
    #[must_use]
    pub fn key(&self) -> ModuleKey {
        ModuleKey::new(self.kind, self.info.id.clone(), self.info.version.clone())
    }

    /// Whether this is a buildpack defined by a nested order.
    #[must_use]
    pub fn is_meta(&self) -> bool {
        !self.order.is_empty()
    }

    /// Declared API, or the oldest module API when none is declared.
    #[must_use]
    pub fn api_or_default(&self) -> &str {
        if self.api.is_empty() {
            constants::DEFAULT_MODULE_API
        } else {
            &self.api
        }
    }

    /// Parsed module API, if valid.
    #[must_use]
    pub fn api_version(&self) -> Option<ApiVersion> {
        self.api_or_default().parse().ok()
    }

    /// Group reference to this module as it appears in a resolved group:
    /// required, with API and homepage copied from the descriptor.
    #[must_use]
    pub fn resolved_element(&self) -> GroupElement {
        GroupElement {
            api: self.api_or_default().to_string(),
            homepage: self.info.homepage.clone(),
            id: self.info.id.clone(),
            optional: false,
            version: self.info.version.clone(),
            kind: self.kind,
        }
    }
}

impl AssetPackages for Descriptor {
    fn supports_asset_packages(&self) -> bool {
        self.api_version().is_some_and(|v| v.supports_asset_packages())
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.info.name.is_empty() {
            write!(f, "{}", self.key())
        } else {
            write!(f, "{} {}", self.info.name, self.info.version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Descriptor> {
        Descriptor::from_toml(Path::new("/cnb/buildpacks/example_node/1.0.0"), content)
    }

    #[test]
    fn buildpack_descriptor_loads() {
        let d = parse(
            r#"
api = "0.10"
[buildpack]
id = "example/node"
version = "1.0.0"
name = "Node"
clear-env = true
sbom-formats = ["application/vnd.cyclonedx+json"]
"#,
        )
        .expect("parse");
        assert_eq!(d.kind, ModuleKind::Buildpack);
        assert_eq!(d.key(), ModuleKey::buildpack("example/node", "1.0.0"));
        assert!(d.info.clear_env);
        assert!(!d.is_meta());
        assert!(d.supports_asset_packages());
        assert_eq!(d.to_string(), "Node 1.0.0");
    }

    #[test]
    fn meta_buildpack_carries_order() {
        let d = parse(
            r#"
api = "0.9"
[buildpack]
id = "example/meta"
version = "1"

[[order]]
[[order.group]]
id = "example/p"
version = "1"

[[order]]
[[order.group]]
id = "example/q"
version = "1"
"#,
        )
        .expect("parse");
        assert!(d.is_meta());
        assert_eq!(d.order.len(), 2);
    }

    #[test]
    fn empty_order_alternative_is_kept() {
        let d = parse(
            r#"
[buildpack]
id = "example/meta"
version = "1"

[[order]]
group = []

[[order]]
[[order.group]]
id = "example/p"
version = "1"
"#,
        )
        .expect("parse");
        assert!(d.is_meta());
        assert!(d.order[0].is_empty());
        assert_eq!(d.order[1].len(), 1);
    }

    #[test]
    fn extension_descriptor_loads() {
        let d = parse("api = \"0.10\"\n[extension]\nid = \"example/curl\"\nversion = \"0.1\"\n").expect("parse");
        assert_eq!(d.kind, ModuleKind::Extension);
        assert_eq!(d.resolved_element().kind, ModuleKind::Extension);
    }

    #[test]
    fn exactly_one_module_kind_is_required() {
        let both = "[buildpack]\nid = \"a\"\n[extension]\nid = \"b\"\n";
        assert!(matches!(parse(both), Err(StrataError::InvalidDescriptor { .. })));
        assert!(matches!(parse("api = \"0.9\"\n"), Err(StrataError::InvalidDescriptor { .. })));
    }

    #[test]
    fn extension_with_order_is_invalid() {
        let content = r#"
[extension]
id = "example/curl"
version = "1"
[[order]]
[[order.group]]
id = "example/p"
version = "1"
"#;
        assert!(parse(content).is_err());
    }

    #[test]
    fn missing_api_defaults_to_oldest() {
        let d = parse("[buildpack]\nid = \"a\"\nversion = \"1\"\n").expect("parse");
        assert_eq!(d.resolved_element().api, "0.2");
        assert!(!d.supports_asset_packages());
    }

    #[test]
    fn read_records_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("buildpack.toml");
        std::fs::write(&path, "[buildpack]\nid = \"a\"\nversion = \"1\"\n").expect("write");
        let d = Descriptor::read(&path).expect("read");
        assert_eq!(d.dir, dir.path());
    }
}
