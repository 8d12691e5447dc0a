//! Frozen arena of descriptors behind module lookup.
//!
//! The store is populated once, before resolution starts, and is read-only
//! afterwards. Every key is inserted exactly once.

use std::collections::BTreeMap;
use std::path::Path;

use strata_common::error::{Result, StrataError};
use strata_common::types::{ModuleKey, ModuleKind};

use crate::descriptor::Descriptor;

/// Resolves module references to loaded descriptors.
pub trait ModuleLookup {
    /// Finds the descriptor for `id@version` of the given kind. An empty
    /// `version` matches when exactly one version is installed.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::NotFound`] if no such module is installed, or
    /// if `version` is empty and several versions are.
    fn lookup(&self, kind: ModuleKind, id: &str, version: &str) -> Result<&Descriptor>;
}

/// Descriptors keyed by kind, id and version.
#[derive(Debug, Clone, Default)]
pub struct DescriptorStore {
    modules: BTreeMap<ModuleKey, Descriptor>,
}

impl DescriptorStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from in-memory descriptors.
    ///
    /// # Errors
    ///
    /// Returns an error if two descriptors share a key.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = Descriptor>) -> Result<Self> {
        let mut store = Self::new();
        for descriptor in descriptors {
            store.insert(descriptor)?;
        }
        Ok(store)
    }

    /// Loads every installed buildpack and extension.
    ///
    /// Modules live at `<dir>/<escaped id>/<version>/<descriptor file>`,
    /// where the id's `/` is escaped as `_`. Missing roots are empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be listed, a descriptor is
    /// invalid, or a module is installed twice.
    pub fn load(buildpacks_dir: &Path, extensions_dir: Option<&Path>) -> Result<Self> {
        let mut store = Self::new();
        store.scan(buildpacks_dir, ModuleKind::Buildpack)?;
        if let Some(dir) = extensions_dir {
            store.scan(dir, ModuleKind::Extension)?;
        }
        tracing::info!(
            buildpacks_dir = %buildpacks_dir.display(),
            modules = store.len(),
            "loaded module descriptors"
        );
        Ok(store)
    }

    /// Adds a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::InvalidDescriptor`] if the key is taken.
    pub fn insert(&mut self, descriptor: Descriptor) -> Result<()> {
        let key = descriptor.key();
        if let Some(existing) = self.modules.get(&key) {
            return Err(StrataError::InvalidDescriptor {
                path: descriptor.dir,
                message: format!("{key} is already installed at {}", existing.dir.display()),
            });
        }
        let _ = self.modules.insert(key, descriptor);
        Ok(())
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterates descriptors in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.modules.values()
    }

    fn scan(&mut self, root: &Path, kind: ModuleKind) -> Result<()> {
        for id_dir in sorted_subdirs(root)? {
            for version_dir in sorted_subdirs(&id_dir)? {
                let path = version_dir.join(kind.descriptor_file());
                if !path.is_file() {
                    tracing::debug!(path = %path.display(), "no descriptor, skipping");
                    continue;
                }
                let descriptor = Descriptor::read(&path)?;
                if descriptor.kind != kind {
                    return Err(StrataError::InvalidDescriptor {
                        path,
                        message: format!("expected a {kind} descriptor"),
                    });
                }
                tracing::debug!(module = %descriptor.key(), kind = %kind, "found module");
                self.insert(descriptor)?;
            }
        }
        Ok(())
    }
}

impl ModuleLookup for DescriptorStore {
    fn lookup(&self, kind: ModuleKind, id: &str, version: &str) -> Result<&Descriptor> {
        let not_found = || StrataError::NotFound {
            kind: kind.as_str(),
            id: format!("{id}@{version}"),
        };
        if !version.is_empty() {
            return self
                .modules
                .get(&ModuleKey::new(kind, id, version))
                .ok_or_else(not_found);
        }
        let mut candidates = self
            .modules
            .iter()
            .filter(|(key, _)| key.kind == kind && key.id == id)
            .map(|(_, d)| d);
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Ok(only),
            _ => Err(not_found()),
        }
    }
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StrataError::io(dir, e)),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StrataError::io(dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install(root: &Path, kind: ModuleKind, id: &str, version: &str) {
        let dir = root.join(id.replace('/', "_")).join(version);
        std::fs::create_dir_all(&dir).expect("mkdir");
        let content = format!("api = \"0.10\"\n[{kind}]\nid = \"{id}\"\nversion = \"{version}\"\n");
        std::fs::write(dir.join(kind.descriptor_file()), content).expect("write");
    }

    #[test]
    fn load_scans_escaped_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bps = dir.path().join("buildpacks");
        let exts = dir.path().join("extensions");
        install(&bps, ModuleKind::Buildpack, "example/node", "1.0.0");
        install(&bps, ModuleKind::Buildpack, "example/node", "2.0.0");
        install(&exts, ModuleKind::Extension, "example/curl", "0.1.0");

        let store = DescriptorStore::load(&bps, Some(&exts)).expect("load");
        assert_eq!(store.len(), 3);

        let node = store
            .lookup(ModuleKind::Buildpack, "example/node", "2.0.0")
            .expect("lookup");
        assert_eq!(node.dir, bps.join("example_node").join("2.0.0"));
        assert!(store.lookup(ModuleKind::Extension, "example/curl", "0.1.0").is_ok());
    }

    #[test]
    fn meta_with_empty_alternative_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let module = dir.path().join("meta").join("1");
        std::fs::create_dir_all(&module).expect("mkdir");
        std::fs::write(
            module.join("buildpack.toml"),
            "[buildpack]\nid = \"meta\"\nversion = \"1\"\n\n[[order]]\ngroup = []\n\n[[order]]\n[[order.group]]\nid = \"p\"\nversion = \"1\"\n",
        )
        .expect("write");
        install(dir.path(), ModuleKind::Buildpack, "p", "1");

        let store = DescriptorStore::load(dir.path(), None).expect("load");
        let meta = store.lookup(ModuleKind::Buildpack, "meta", "1").expect("meta");
        assert_eq!(meta.order.len(), 2);
        assert!(meta.order[0].is_empty());
    }

    #[test]
    fn missing_roots_are_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DescriptorStore::load(&dir.path().join("absent"), None).expect("load");
        assert!(store.is_empty());
    }

    #[test]
    fn lookup_dispatches_on_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        install(dir.path(), ModuleKind::Buildpack, "x", "1");
        let store = DescriptorStore::load(dir.path(), None).expect("load");
        let err = store.lookup(ModuleKind::Extension, "x", "1").unwrap_err();
        assert!(matches!(err, StrataError::NotFound { kind: "extension", .. }));
    }

    #[test]
    fn empty_version_needs_a_single_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        install(dir.path(), ModuleKind::Buildpack, "one", "1");
        install(dir.path(), ModuleKind::Buildpack, "two", "1");
        install(dir.path(), ModuleKind::Buildpack, "two", "2");
        let store = DescriptorStore::load(dir.path(), None).expect("load");

        assert_eq!(store.lookup(ModuleKind::Buildpack, "one", "").expect("one").info.version, "1");
        assert!(store.lookup(ModuleKind::Buildpack, "two", "").is_err());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let d = Descriptor::from_toml(Path::new("/a"), "[buildpack]\nid = \"x\"\nversion = \"1\"\n")
            .expect("parse");
        let err = DescriptorStore::from_descriptors([d.clone(), d]).unwrap_err();
        assert!(err.to_string().contains("already installed"), "got: {err}");
    }

    #[test]
    fn wrong_kind_in_extensions_dir_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exts = dir.path().join("extensions");
        let module = exts.join("x").join("1");
        std::fs::create_dir_all(&module).expect("mkdir");
        std::fs::write(module.join("extension.toml"), "[buildpack]\nid = \"x\"\nversion = \"1\"\n")
            .expect("write");
        assert!(DescriptorStore::load(&dir.path().join("bps"), Some(&exts)).is_err());
    }
}
