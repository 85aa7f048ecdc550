//! Root-prefix path resolution.
//!
//! All filesystem access in this crate goes through a [`PathResolver`],
//! which rewrites logical paths under a configurable root prefix. The
//! default root is `/`, so resolution is the identity in normal
//! operation; installers that operate on a mounted system image point
//! the root at the mount point instead and every directory in the
//! store follows it.
//!
//! Resolution happens exactly once per path, at [`Directory`]
//! construction. Subdirectory handles discovered during listing carry
//! already-resolved paths and are never re-resolved.
//!
//! [`Directory`]: crate::directory::Directory

use std::path::{Path, PathBuf};

/// Rewrites logical paths under a configured root prefix.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

impl PathResolver {
    /// Creates a resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root prefix.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a logical path under the root prefix.
    ///
    /// An absolute path has its leading separator stripped before the
    /// join, so `/etc/pki/product` under root `/mnt/sysimage` becomes
    /// `/mnt/sysimage/etc/pki/product`. A relative path joins under
    /// the root directly.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match path.strip_prefix("/") {
            Ok(stripped) => self.root.join(stripped),
            Err(_) => self.root.join(path),
        }
    }

    /// Whether the resolved path exists and is a directory.
    ///
    /// A plain stat, no caching.
    #[must_use]
    pub fn is_directory(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path).is_dir()
    }
}
