//! Cached filesystem store for subscription certificates.
//!
//! This crate manages the on-disk directories that hold a system's
//! product and entitlement certificates. A [`CertificateStore`] is a
//! lazily-loaded, cached view over one directory of PEM certificate
//! files; product-specific queries (provided tags, installed-product
//! mapping) and the entitlement-specific behavior (per-serial key
//! reconciliation, stacked-subscription closure) are layered on top
//! by composition.
//!
//! # Layout
//!
//! Certificate files are named `<serial>.pem`. Private keys use the
//! per-serial `<serial>-key.pem` convention; a legacy directory-wide
//! `key.pem` is still recognized and migrated to the per-serial form
//! on first use. All paths are resolved under a configurable root
//! prefix so the store can operate on an alternate install root.
//!
//! # Caching
//!
//! Each store caches its parsed listing until
//! [`invalidate_cache`](store::CertificateStore::invalidate_cache) is
//! called; writes through [`CertificateWriter`] do not invalidate the
//! cache themselves. Instances are not thread-safe; callers sharing
//! one across threads serialize access externally.

pub mod certificate;
pub mod config;
pub mod directory;
pub mod entitlement;
pub mod paths;
pub mod product;
pub mod store;
pub mod writer;

#[cfg(test)]
pub(crate) mod testutil;

pub use certificate::{
    Certificate, CertificateError, CertificateParse, Key, Order, PemCertificateParser, Product,
};
pub use config::{ConfigError, StoreConfig};
pub use directory::{DirEntry, Directory, DirectoryError};
pub use entitlement::EntitlementDirectory;
pub use paths::PathResolver;
pub use store::{CertificateStore, LEGACY_KEY_FILE, StoreError};
pub use writer::CertificateWriter;
