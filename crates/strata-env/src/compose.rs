//! Left-to-right fold of ordered layer directories into an environment.
//!
//! Layers are applied in group order. Each layer contributes its root
//! directories first, then `env/`, then `env.build/`.

use std::path::{Path, PathBuf};

use strata_common::error::{Result, StrataError};

use crate::action::Action;
use crate::env::Env;

/// Result of folding layers: the environment plus every contribution that
/// had to be skipped.
#[derive(Debug)]
pub struct Composition {
    /// Composed environment.
    pub env: Env,
    /// Malformed environment files that were not applied.
    pub skipped: Vec<StrataError>,
}

impl Env {
    /// Applies a single layer directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer's environment directories cannot be listed.
    pub fn apply_layer(&mut self, layer_dir: &Path) -> Result<Vec<StrataError>> {
        tracing::debug!(layer = %layer_dir.display(), "applying layer environment");
        self.add_root_dir(layer_dir)?;
        let mut skipped = self.add_env_dir(&layer_dir.join("env"), Action::Override)?;
        skipped.extend(self.add_env_dir(&layer_dir.join("env.build"), Action::Override)?);
        Ok(skipped)
    }
}

/// Folds `layers` into `base` in the given order.
///
/// # Errors
///
/// Returns an error if a layer directory cannot be read.
pub fn compose_layers<P: AsRef<Path>>(base: Env, layers: &[P]) -> Result<Composition> {
    layers.iter().try_fold(
        Composition {
            env: base,
            skipped: Vec::new(),
        },
        |mut acc, layer| {
            let skipped = acc.env.apply_layer(layer.as_ref())?;
            acc.skipped.extend(skipped);
            Ok(acc)
        },
    )
}

/// Lists the layer directories a module created under its layers
/// directory, in file-name order.
///
/// # Errors
///
/// Returns an error if `module_layers_dir` exists but cannot be listed.
pub fn module_layer_dirs(module_layers_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(module_layers_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StrataError::io(module_layers_dir, e)),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StrataError::io(module_layers_dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
