//! Configuration for a point store

use crate::kdsort::DEFAULT_NODE_SIZE;
use crate::record::PackedKind;
use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extension of the fixed-width key records file.
pub const KEYS_EXTENSION: &str = ".keys";

/// Extension of the serialized values file.
pub const VALUES_EXTENSION: &str = ".values";

/// Configuration for a point store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Leaf-bucket threshold for the k-d sort
    pub node_size: usize,

    /// Base path shared by the `.keys` and `.values` files.
    /// A random path is generated when unset.
    pub file_name: Option<PathBuf>,

    /// Pack numeric values into the key record instead of a values file
    pub values_are_index: bool,

    /// Directory for generated base paths (OS temp dir when unset)
    pub tmp_dir: Option<PathBuf>,

    /// How packed values are read back by `get` and default iteration
    pub packed_kind: PackedKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            node_size: DEFAULT_NODE_SIZE,
            file_name: None,
            values_are_index: false,
            tmp_dir: None,
            packed_kind: PackedKind::default(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration for the store at `base_path`
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            file_name: Some(base_path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Set the base path
    #[must_use]
    pub fn with_file_name<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file_name = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the leaf-bucket threshold
    #[must_use]
    pub const fn with_node_size(mut self, node_size: usize) -> Self {
        self.node_size = node_size;
        self
    }

    /// Enable or disable values-as-index mode
    #[must_use]
    pub const fn with_values_are_index(mut self, enable: bool) -> Self {
        self.values_are_index = enable;
        self
    }

    /// Set the directory used for generated base paths
    #[must_use]
    pub fn with_tmp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.tmp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set how packed values are read back
    #[must_use]
    pub const fn with_packed_kind(mut self, kind: PackedKind) -> Self {
        self.packed_kind = kind;
        self
    }

    /// Base path to open, generating a temporary one if none was set.
    pub fn resolve_base_path(&self) -> PathBuf {
        self.file_name
            .clone()
            .unwrap_or_else(|| temp_base_path(self.tmp_dir.as_deref()))
    }
}

/// Random base path inside `tmp_dir`, or the OS temp dir.
pub fn temp_base_path(tmp_dir: Option<&Path>) -> PathBuf {
    let dir = tmp_dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
    dir.join(format!("{:016x}", rng().random::<u64>()))
}

/// Path of the keys file for a base path.
pub fn keys_path(base: &Path) -> PathBuf {
    with_suffix(base, KEYS_EXTENSION)
}

/// Path of the values file for a base path.
pub fn values_path(base: &Path) -> PathBuf {
    with_suffix(base, VALUES_EXTENSION)
}

// Appends rather than replaces, so `points.v2` becomes `points.v2.keys`.
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.node_size, 64);
        assert!(!config.values_are_index);
        assert!(config.file_name.is_none());
        assert_eq!(config.packed_kind, PackedKind::Integer);
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::new("/data/points")
            .with_node_size(8)
            .with_values_are_index(true)
            .with_packed_kind(PackedKind::Float);
        assert_eq!(config.file_name, Some(PathBuf::from("/data/points")));
        assert_eq!(config.node_size, 8);
        assert!(config.values_are_index);
        assert_eq!(config.resolve_base_path(), PathBuf::from("/data/points"));
    }

    #[test]
    fn test_file_paths_append_suffix() {
        let base = Path::new("/tmp/store.v2");
        assert_eq!(keys_path(base), PathBuf::from("/tmp/store.v2.keys"));
        assert_eq!(values_path(base), PathBuf::from("/tmp/store.v2.values"));
    }

    #[test]
    fn test_temp_base_path_in_dir() {
        let path = temp_base_path(Some(Path::new("/scratch")));
        assert_eq!(path.parent(), Some(Path::new("/scratch")));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert_eq!(name.len(), 16);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));

        let config = StoreConfig::default().with_tmp_dir("/scratch");
        assert_ne!(config.resolve_base_path(), config.resolve_base_path());
    }
}
