//! Cached, parsed view over a directory of certificate files.
//!
//! A [`CertificateStore`] lazily loads every certificate file in its
//! directory, parses each into a [`Certificate`], and serves all
//! queries from the in-memory listing until the cache is invalidated.
//! The cache is an explicit two-state value: either `Unloaded` (the
//! next `list` reloads from disk) or `Loaded` with the full parsed
//! sequence. A parse failure aborts the reload and leaves the cache
//! `Unloaded` — a partial listing is never stored, so the caller sees
//! the same failure on every call until the bad file is removed.
//!
//! The store is not thread-safe. One instance serves one logical
//! reader/writer pipeline; callers sharing an instance across threads
//! must serialize access externally.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::certificate::{Certificate, CertificateError, CertificateParse};
use crate::directory::{Directory, DirectoryError};

/// File name of the legacy directory-wide private key.
pub const LEGACY_KEY_FILE: &str = "key.pem";

/// Suffix of certificate files.
const CERT_SUFFIX: &str = ".pem";

/// Errors from certificate store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The underlying directory operation failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// A certificate or key file could not be read or parsed.
    #[error(transparent)]
    Certificate(#[from] CertificateError),
}

/// Cache state for the parsed listing.
///
/// `Unloaded` means the next [`CertificateStore::list`] must reload
/// from disk; `Loaded` is fully populated and consistent with disk as
/// of the last reload.
#[derive(Debug)]
enum Listing {
    Unloaded,
    Loaded(Vec<Arc<Certificate>>),
}

/// A lazily-loaded, cached directory of parsed certificates.
pub struct CertificateStore {
    dir: Directory,
    parser: Box<dyn CertificateParse>,
    listing: Listing,
}

impl std::fmt::Debug for CertificateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateStore")
            .field("dir", &self.dir)
            .field("listing", &self.listing)
            .finish_non_exhaustive()
    }
}

impl CertificateStore {
    /// Opens a store over `dir`, creating the directory if absent.
    /// The cache starts unloaded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Directory`] if the directory cannot be
    /// created.
    pub fn new(dir: Directory, parser: Box<dyn CertificateParse>) -> Result<Self, StoreError> {
        dir.ensure_exists()?;
        Ok(Self {
            dir,
            parser,
            listing: Listing::Unloaded,
        })
    }

    /// The directory backing this store.
    #[must_use]
    pub fn dir(&self) -> &Directory {
        &self.dir
    }

    /// Clears the cached listing; the next [`list`](Self::list)
    /// reloads from disk. Any mutation of the directory must be
    /// followed by this before further reads.
    pub fn invalidate_cache(&mut self) {
        self.listing = Listing::Unloaded;
    }

    /// Whether `name` is a certificate file. Key files in either
    /// layout (the legacy `key.pem` and the per-serial
    /// `<serial>-key.pem`) share the `key.pem` suffix and are skipped
    /// by the same test.
    fn is_certificate_name(name: &str) -> bool {
        name.ends_with(CERT_SUFFIX) && !name.ends_with(LEGACY_KEY_FILE)
    }

    fn reload(&mut self) -> Result<(), StoreError> {
        let mut certs = Vec::new();
        for entry in self.dir.list_files()? {
            if !Self::is_certificate_name(&entry.name) {
                continue;
            }
            let path = self.dir.entry_path(&entry.name);
            certs.push(Arc::new(self.parser.parse_certificate_file(&path)?));
        }
        tracing::debug!(dir = %self.dir, count = certs.len(), "reloaded certificate listing");
        self.listing = Listing::Loaded(certs);
        Ok(())
    }

    /// The parsed certificates, in listing order.
    ///
    /// Served verbatim from the cache when loaded; otherwise the
    /// directory is enumerated, non-certificate names are skipped,
    /// and every remaining file is parsed before the cache is
    /// populated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Certificate`] if any file fails to
    /// parse (the cache is left unloaded) and
    /// [`StoreError::Directory`] if the directory cannot be read.
    pub fn list(&mut self) -> Result<&[Arc<Certificate>], StoreError> {
        if matches!(self.listing, Listing::Unloaded) {
            self.reload()?;
        }
        match &self.listing {
            Listing::Loaded(certs) => Ok(certs),
            // reload either populated the cache or returned the error
            Listing::Unloaded => unreachable!(),
        }
    }

    /// Certificates whose validity window contains `now`.
    ///
    /// # Errors
    ///
    /// Propagates [`list`](Self::list) failures.
    pub fn list_valid_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Arc<Certificate>>, StoreError> {
        Ok(self
            .list()?
            .iter()
            .filter(|c| c.is_valid_at(now))
            .cloned()
            .collect())
    }

    /// Certificates valid right now.
    ///
    /// # Errors
    ///
    /// Propagates [`list`](Self::list) failures.
    pub fn list_valid(&mut self) -> Result<Vec<Arc<Certificate>>, StoreError> {
        self.list_valid_at(Utc::now())
    }

    /// Certificates past their validity window at `now`.
    ///
    /// # Errors
    ///
    /// Propagates [`list`](Self::list) failures.
    pub fn list_expired_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Arc<Certificate>>, StoreError> {
        Ok(self
            .list()?
            .iter()
            .filter(|c| c.is_expired_at(now))
            .cloned()
            .collect())
    }

    /// Certificates expired right now.
    ///
    /// # Errors
    ///
    /// Propagates [`list`](Self::list) failures.
    pub fn list_expired(&mut self) -> Result<Vec<Arc<Certificate>>, StoreError> {
        self.list_expired_at(Utc::now())
    }

    /// The certificate with the given serial, if present.
    ///
    /// # Errors
    ///
    /// Propagates [`list`](Self::list) failures.
    pub fn find_by_serial(&mut self, serial: u64) -> Result<Option<Arc<Certificate>>, StoreError> {
        Ok(self
            .list()?
            .iter()
            .find(|c| c.serial() == serial)
            .cloned())
    }

    /// The first certificate, in listing order, carrying a product
    /// with the given id.
    ///
    /// # Errors
    ///
    /// Propagates [`list`](Self::list) failures.
    pub fn find_by_product_id(
        &mut self,
        product_id: &str,
    ) -> Result<Option<Arc<Certificate>>, StoreError> {
        Ok(self
            .list()?
            .iter()
            .find(|c| c.provides_product(product_id))
            .cloned())
    }

    /// Every certificate providing the product, plus every certificate
    /// sharing a stacking id with one that provides it.
    ///
    /// Subscriptions can be split across multiple stacked
    /// certificates; if any member of a stack provides the product,
    /// the whole stack counts as providing it. One pass over the
    /// listing builds the stack map and the directly-providing set,
    /// then the stacks satisfied by a direct provider are unioned in.
    /// Results are deduplicated and returned in listing order.
    ///
    /// # Errors
    ///
    /// Propagates [`list`](Self::list) failures.
    pub fn find_all_by_product_id(
        &mut self,
        product_id: &str,
    ) -> Result<Vec<Arc<Certificate>>, StoreError> {
        let certs = self.list()?;

        let mut stacks: HashMap<&str, Vec<u64>> = HashMap::new();
        let mut satisfied_stacks: HashSet<&str> = HashSet::new();
        let mut selected: HashSet<u64> = HashSet::new();

        for cert in certs {
            if cert.provides_product(product_id) {
                selected.insert(cert.serial());
                if let Some(stack_id) = cert.stacking_id() {
                    satisfied_stacks.insert(stack_id);
                }
            }
            if let Some(stack_id) = cert.stacking_id() {
                stacks.entry(stack_id).or_default().push(cert.serial());
            }
        }

        for stack_id in &satisfied_stacks {
            if let Some(serials) = stacks.get(stack_id) {
                selected.extend(serials.iter().copied());
            }
        }

        Ok(certs
            .iter()
            .filter(|c| selected.contains(&c.serial()))
            .cloned()
            .collect())
    }
}
