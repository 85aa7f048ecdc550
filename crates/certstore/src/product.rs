//! Product certificate queries.
//!
//! Product-specific lookups are free functions over a generic
//! [`CertificateStore`] rooted at the configured product directory;
//! there is no separate product store type.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::certificate::{Certificate, CertificateParse};
use crate::config::StoreConfig;
use crate::directory::Directory;
use crate::paths::PathResolver;
use crate::store::{CertificateStore, StoreError};

/// Opens the store over the configured product certificate directory.
///
/// # Errors
///
/// Returns [`StoreError::Directory`] if the directory cannot be
/// created.
pub fn open_product_dir(
    config: &StoreConfig,
    resolver: &PathResolver,
    parser: Box<dyn CertificateParse>,
) -> Result<CertificateStore, StoreError> {
    let dir = Directory::new(resolver, &config.product_cert_dir);
    CertificateStore::new(dir, parser)
}

/// The union of provided capability tags over every product of every
/// certificate valid at `now`.
///
/// # Errors
///
/// Propagates listing failures from the store.
pub fn provided_tags_at(
    store: &mut CertificateStore,
    now: DateTime<Utc>,
) -> Result<BTreeSet<String>, StoreError> {
    let mut tags = BTreeSet::new();
    for cert in store.list_valid_at(now)? {
        for prod in cert.products() {
            tags.extend(prod.provided_tags.iter().cloned());
        }
    }
    Ok(tags)
}

/// [`provided_tags_at`] evaluated right now.
///
/// # Errors
///
/// Propagates listing failures from the store.
pub fn provided_tags(store: &mut CertificateStore) -> Result<BTreeSet<String>, StoreError> {
    provided_tags_at(store, Utc::now())
}

/// Maps each installed product id to its certificate.
///
/// Only the first product of each certificate counts; product
/// certificates carry exactly one primary product by construction.
/// If two certificates carry the same product id, the later one in
/// listing order overwrites the earlier — which one wins is not part
/// of the contract.
///
/// # Errors
///
/// Propagates listing failures from the store.
pub fn installed_products(
    store: &mut CertificateStore,
) -> Result<HashMap<String, Arc<Certificate>>, StoreError> {
    let mut installed = HashMap::new();
    for cert in store.list()? {
        if let Some(prod) = cert.first_product() {
            installed.insert(prod.id.clone(), Arc::clone(cert));
        }
    }
    tracing::debug!(
        product_ids = ?installed.keys().collect::<Vec<_>>(),
        "enumerated installed products"
    );
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Duration;

    use super::*;
    use crate::certificate::PemCertificateParser;
    use crate::testutil::{cert_file_text, product};

    fn open_store_at(root: &std::path::Path) -> CertificateStore {
        let config = StoreConfig::default();
        let resolver = PathResolver::new(root);
        open_product_dir(&config, &resolver, Box::new(PemCertificateParser)).expect("open")
    }

    fn write_cert(
        dir: &std::path::Path,
        serial: u64,
        products: &[crate::certificate::Product],
        valid: bool,
    ) {
        let now = Utc::now();
        let (not_before, not_after) = if valid {
            (now - Duration::days(1), now + Duration::days(365))
        } else {
            (now - Duration::days(30), now - Duration::days(10))
        };
        let text = cert_file_text(serial, products, not_before, not_after);
        fs::write(dir.join(format!("{serial}.pem")), text).expect("write cert");
    }

    #[test]
    fn provided_tags_unions_valid_certificates_only() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut store = open_store_at(tmp.path());
        let dir = store.dir().path().to_owned();
        write_cert(&dir, 1, &[product("a", &["web", "ha"])], true);
        write_cert(&dir, 2, &[product("b", &["storage"])], true);
        write_cert(&dir, 3, &[product("c", &["expired-tag"])], false);

        let tags = provided_tags(&mut store).expect("tags");
        let want: BTreeSet<String> = ["web", "ha", "storage"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(tags, want);
    }

    #[test]
    fn installed_products_maps_the_first_product_of_each_certificate() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut store = open_store_at(tmp.path());
        let dir = store.dir().path().to_owned();
        write_cert(&dir, 1, &[product("primary", &[]), product("secondary", &[])], true);
        write_cert(&dir, 2, &[product("other", &[])], true);

        let installed = installed_products(&mut store).expect("installed");
        assert_eq!(installed.len(), 2);
        assert_eq!(installed["primary"].serial(), 1);
        assert_eq!(installed["other"].serial(), 2);
        assert!(!installed.contains_key("secondary"));
    }

    #[test]
    fn duplicate_product_ids_overwrite_in_listing_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut store = open_store_at(tmp.path());
        let dir = store.dir().path().to_owned();
        write_cert(&dir, 1, &[product("dup", &[])], true);
        write_cert(&dir, 2, &[product("dup", &[])], true);

        let installed = installed_products(&mut store).expect("installed");
        assert_eq!(installed.len(), 1);
        // Listing is sorted by file name, so 2.pem wins.
        assert_eq!(installed["dup"].serial(), 2);
    }

    #[test]
    fn certificates_without_products_are_skipped() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut store = open_store_at(tmp.path());
        let dir = store.dir().path().to_owned();
        write_cert(&dir, 1, &[], true);

        let installed = installed_products(&mut store).expect("installed");
        assert!(installed.is_empty());
    }
}
