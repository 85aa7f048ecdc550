//! Generic filesystem directory handle.
//!
//! A [`Directory`] wraps one resolved path and manages the lifecycle
//! of that directory: enumeration, creation, recursive cleanup and
//! deletion. It carries no in-memory state beyond the path; every
//! operation hits the filesystem.
//!
//! A missing directory is a valid empty state: listing it yields an
//! empty sequence, never an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::paths::PathResolver;

/// Errors from directory lifecycle operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DirectoryError {
    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path the operation touched.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

impl DirectoryError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// One entry discovered in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// The resolved directory the entry lives in.
    pub parent: PathBuf,
    /// The entry's file name.
    pub name: String,
}

/// A single filesystem directory, with all paths pre-resolved through
/// a [`PathResolver`].
#[derive(Debug, Clone)]
pub struct Directory {
    path: PathBuf,
}

impl Directory {
    /// Creates a handle for `path`, resolved under the resolver's
    /// root. The directory itself is not created; see
    /// [`ensure_exists`](Self::ensure_exists).
    pub fn new(resolver: &PathResolver, path: impl AsRef<Path>) -> Self {
        Self {
            path: resolver.resolve(path),
        }
    }

    /// Wraps an already-resolved path. Used for subdirectories found
    /// during listing, which must not be resolved a second time.
    pub(crate) fn from_resolved(path: PathBuf) -> Self {
        Self { path }
    }

    /// The resolved directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The resolved path of an entry inside this directory.
    #[must_use]
    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Lists every entry in the directory, sorted by name.
    ///
    /// A nonexistent directory yields an empty listing.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Io`] if the directory exists but
    /// cannot be read.
    pub fn list_all(&self) -> Result<Vec<DirEntry>, DirectoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        let read_dir =
            fs::read_dir(&self.path).map_err(|e| DirectoryError::io(&self.path, e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| DirectoryError::io(&self.path, e))?;
            entries.push(DirEntry {
                parent: self.path.clone(),
                name: entry.file_name().to_string_lossy().into_owned(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Lists regular entries only, excluding subdirectories.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Io`] if the directory cannot be read.
    pub fn list_files(&self) -> Result<Vec<DirEntry>, DirectoryError> {
        let mut files = self.list_all()?;
        files.retain(|entry| !self.entry_path(&entry.name).is_dir());
        Ok(files)
    }

    /// Lists immediate subdirectories as new `Directory` handles.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Io`] if the directory cannot be read.
    pub fn list_subdirectories(&self) -> Result<Vec<Directory>, DirectoryError> {
        let mut dirs = Vec::new();
        for entry in self.list_all()? {
            let path = self.entry_path(&entry.name);
            if path.is_dir() {
                dirs.push(Directory::from_resolved(path));
            }
        }
        Ok(dirs)
    }

    /// Creates the directory and any missing parents. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Io`] on filesystem failure.
    pub fn ensure_exists(&self) -> Result<(), DirectoryError> {
        fs::create_dir_all(&self.path).map_err(|e| DirectoryError::io(&self.path, e))
    }

    /// Removes every file in the directory and recursively deletes
    /// contained subdirectories. No-op if the directory is absent.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Io`] on filesystem failure.
    pub fn clean(&self) -> Result<(), DirectoryError> {
        for entry in self.list_all()? {
            let path = self.entry_path(&entry.name);
            if path.is_dir() {
                Directory::from_resolved(path).delete()?;
            } else {
                fs::remove_file(&path).map_err(|e| DirectoryError::io(&path, e))?;
            }
        }
        Ok(())
    }

    /// Cleans the directory, then removes the directory itself.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Io`] on filesystem failure.
    pub fn delete(&self) -> Result<(), DirectoryError> {
        self.clean()?;
        fs::remove_dir(&self.path).map_err(|e| DirectoryError::io(&self.path, e))
    }
}

impl std::fmt::Display for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
