//! Entitlement certificate directory.
//!
//! An [`EntitlementDirectory`] wraps a [`CertificateStore`] rooted at
//! the configured entitlement directory and layers on the private-key
//! reconciliation the entitlement layout needs: every certificate must
//! have a resolvable key for its serial before it counts as valid.
//!
//! Two key layouts coexist on disk. The modern layout stores one
//! `<serial>-key.pem` per certificate; the legacy layout stores a
//! single directory-wide `key.pem`. When only the legacy key is
//! present, [`ensure_key_migrated`](EntitlementDirectory::ensure_key_migrated)
//! materializes the per-serial key from it on first use.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::certificate::{Certificate, CertificateParse, Key};
use crate::config::StoreConfig;
use crate::directory::Directory;
use crate::paths::PathResolver;
use crate::store::{CertificateStore, LEGACY_KEY_FILE, StoreError};
use crate::writer::{CertificateWriter, key_file_name};

fn is_readable(path: &Path) -> bool {
    fs::File::open(path).is_ok()
}

/// The entitlement certificate directory.
#[derive(Debug)]
pub struct EntitlementDirectory {
    store: CertificateStore,
}

impl EntitlementDirectory {
    /// Opens the directory configured as `entitlement_cert_dir`,
    /// creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Directory`] if the directory cannot be
    /// created.
    pub fn open(
        config: &StoreConfig,
        resolver: &PathResolver,
        parser: Box<dyn CertificateParse>,
    ) -> Result<Self, StoreError> {
        let dir = Directory::new(resolver, &config.entitlement_cert_dir);
        Ok(Self {
            store: CertificateStore::new(dir, parser)?,
        })
    }

    /// The underlying store, for the generic listing and lookup
    /// queries and for cache invalidation after writes.
    pub fn store(&mut self) -> &mut CertificateStore {
        &mut self.store
    }

    /// A writer targeting this directory's resolved path.
    #[must_use]
    pub fn writer(&self) -> CertificateWriter {
        CertificateWriter::new(self.store.dir().path())
    }

    /// Ensures a per-serial key is resolvable for the certificate.
    ///
    /// Returns `true` if `<serial>-key.pem` is readable. If it is not
    /// but the legacy `key.pem` is, the legacy key is read and the
    /// key/certificate pair is written back out in the per-serial
    /// layout, then `true` is returned. Returns `false` only when
    /// neither key file is accessible; such a certificate has no
    /// usable key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Certificate`] if the migration read or
    /// write fails.
    pub fn ensure_key_migrated(&self, cert: &Certificate) -> Result<bool, StoreError> {
        let dir = self.store.dir().path();
        if is_readable(&dir.join(key_file_name(cert.serial()))) {
            return Ok(true);
        }

        let legacy_path = dir.join(LEGACY_KEY_FILE);
        if !is_readable(&legacy_path) {
            return Ok(false);
        }

        let key = Key::read(&legacy_path)?;
        tracing::info!(
            serial = cert.serial(),
            dir = %dir.display(),
            "migrating legacy entitlement key to per-serial layout"
        );
        self.writer().write(&key, cert)?;
        Ok(true)
    }

    /// Certificates valid at `now` that also have a usable key.
    ///
    /// The key check runs first and silently drops keyless
    /// certificates; the validity-window filter applies to the rest.
    ///
    /// # Errors
    ///
    /// Propagates listing and migration failures.
    pub fn list_valid_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Arc<Certificate>>, StoreError> {
        let certs = self.store.list()?.to_vec();
        let mut valid = Vec::new();
        for cert in certs {
            if !self.ensure_key_migrated(&cert)? {
                continue;
            }
            if cert.is_valid_at(now) {
                valid.push(cert);
            }
        }
        Ok(valid)
    }

    /// Certificates valid right now, key check included.
    ///
    /// # Errors
    ///
    /// Propagates listing and migration failures.
    pub fn list_valid(&mut self) -> Result<Vec<Arc<Certificate>>, StoreError> {
        self.list_valid_at(Utc::now())
    }

    /// Every certificate carrying a product with the given id, in
    /// listing order, unfiltered by validity.
    ///
    /// Unlike [`CertificateStore::find_all_by_product_id`], this does
    /// not apply stacking closure: only certificates that directly
    /// carry the product are returned.
    ///
    /// # Errors
    ///
    /// Propagates listing failures.
    pub fn list_for_product_id(
        &mut self,
        product_id: &str,
    ) -> Result<Vec<Arc<Certificate>>, StoreError> {
        Ok(self
            .store
            .list()?
            .iter()
            .filter(|c| c.provides_product(product_id))
            .cloned()
            .collect())
    }
}
