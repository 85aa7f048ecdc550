//! Certificate data model and file parsing.
//!
//! A [`Certificate`] is the parsed, immutable representation of one
//! certificate file. The store does not interpret the X.509 body; all
//! domain attributes (serial, products, order, validity window) come
//! from a JSON metadata block carried alongside it in the file,
//! delimited by `-----BEGIN CERTIFICATE DATA-----` /
//! `-----END CERTIFICATE DATA-----`. Parsing is abstracted behind the
//! [`CertificateParse`] trait so a different on-disk encoding can be
//! substituted without touching the store.
//!
//! The verbatim file text is retained so that writing a certificate
//! back out (per-serial key migration, attach flows) round-trips the
//! original bytes.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delimiters of the JSON metadata block inside a certificate file.
pub(crate) const DATA_BEGIN: &str = "-----BEGIN CERTIFICATE DATA-----";
pub(crate) const DATA_END: &str = "-----END CERTIFICATE DATA-----";

/// Errors from reading or parsing certificate and key files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertificateError {
    /// The file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file the operation touched.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The file content does not parse as a certificate.
    #[error("malformed certificate file {path}: {reason}")]
    FileFormat {
        /// The offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

impl CertificateError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A product carried by a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// The product identifier.
    pub id: String,
    /// Capability tags the product provides.
    #[serde(default)]
    pub provided_tags: BTreeSet<String>,
}

/// Subscription order details carried by an entitlement certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Identifier shared by certificates that jointly satisfy one
    /// stacked subscription, if any.
    #[serde(default)]
    pub stacking_id: Option<String>,
}

/// The JSON metadata block of a certificate file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CertificateData {
    serial: u64,
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    order: Option<Order>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

/// A parsed certificate file. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct Certificate {
    data: CertificateData,
    text: String,
}

impl Certificate {
    /// The certificate serial, unique within a directory.
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.data.serial
    }

    /// The products the certificate carries, in file order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.data.products
    }

    /// The first product, if any. Product certificates carry exactly
    /// one primary product by construction.
    #[must_use]
    pub fn first_product(&self) -> Option<&Product> {
        self.data.products.first()
    }

    /// The subscription order, if the certificate carries one.
    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        self.data.order.as_ref()
    }

    /// The stacking id from the order, if both are present.
    #[must_use]
    pub fn stacking_id(&self) -> Option<&str> {
        self.data
            .order
            .as_ref()
            .and_then(|o| o.stacking_id.as_deref())
    }

    /// Start of the validity window.
    #[must_use]
    pub fn not_before(&self) -> DateTime<Utc> {
        self.data.not_before
    }

    /// End of the validity window.
    #[must_use]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.data.not_after
    }

    /// Whether the validity window contains `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.data.not_before <= now && now <= self.data.not_after
    }

    /// Whether `now` is past the validity window.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.data.not_after
    }

    /// Whether any product on the certificate has the given id.
    #[must_use]
    pub fn provides_product(&self, product_id: &str) -> bool {
        self.data.products.iter().any(|p| p.id == product_id)
    }

    /// The verbatim file text the certificate was parsed from.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Writes the certificate back out verbatim, overwriting `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::Io`] on filesystem failure.
    pub fn write(&self, path: &Path) -> Result<(), CertificateError> {
        fs::write(path, &self.text).map_err(|e| CertificateError::io(path, e))
    }
}

/// A private key file, held as raw PEM text.
#[derive(Debug, Clone)]
pub struct Key {
    pem: String,
}

impl Key {
    /// Reads a key file.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::Io`] if the file cannot be read.
    pub fn read(path: &Path) -> Result<Self, CertificateError> {
        let pem = fs::read_to_string(path).map_err(|e| CertificateError::io(path, e))?;
        Ok(Self { pem })
    }

    /// The raw PEM text.
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Writes the key, overwriting `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::Io`] on filesystem failure.
    pub fn write(&self, path: &Path) -> Result<(), CertificateError> {
        fs::write(path, &self.pem).map_err(|e| CertificateError::io(path, e))
    }
}

/// Parses certificate files into [`Certificate`] values.
pub trait CertificateParse {
    /// Parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::FileFormat`] for malformed content
    /// and [`CertificateError::Io`] if the file cannot be read.
    fn parse_certificate_file(&self, path: &Path) -> Result<Certificate, CertificateError>;
}

/// The bundled parser: extracts the JSON metadata block from a PEM
/// file. The X.509 body, if present, is carried along unvalidated.
#[derive(Debug, Clone, Default)]
pub struct PemCertificateParser;

impl PemCertificateParser {
    fn extract_data_block<'a>(text: &'a str, path: &Path) -> Result<&'a str, CertificateError> {
        let begin = text
            .find(DATA_BEGIN)
            .ok_or_else(|| CertificateError::format(path, "missing certificate data block"))?;
        let body_start = begin + DATA_BEGIN.len();
        let end = text[body_start..]
            .find(DATA_END)
            .ok_or_else(|| CertificateError::format(path, "unterminated certificate data block"))?;
        Ok(&text[body_start..body_start + end])
    }
}

impl CertificateParse for PemCertificateParser {
    fn parse_certificate_file(&self, path: &Path) -> Result<Certificate, CertificateError> {
        let text = fs::read_to_string(path).map_err(|e| CertificateError::io(path, e))?;
        let block = Self::extract_data_block(&text, path)?;
        let data: CertificateData = serde_json::from_str(block)
            .map_err(|e| CertificateError::format(path, e.to_string()))?;
        Ok(Certificate { data, text })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn write_cert(path: &Path, json: &str) {
        let text = format!("{DATA_BEGIN}\n{json}\n{DATA_END}\n");
        fs::write(path, text).expect("failed to write cert file");
    }

    fn parse(path: &Path) -> Result<Certificate, CertificateError> {
        PemCertificateParser.parse_certificate_file(path)
    }

    #[test]
    fn parses_metadata_block() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("4242.pem");
        write_cert(
            &path,
            r#"{
                "serial": 4242,
                "products": [{"id": "69", "provided_tags": ["srv", "srv-ha"]}],
                "order": {"stacking_id": "stack-1"},
                "not_before": "2024-01-01T00:00:00Z",
                "not_after": "2030-01-01T00:00:00Z"
            }"#,
        );
        let cert = parse(&path).expect("parse");
        assert_eq!(cert.serial(), 4242);
        assert_eq!(cert.products().len(), 1);
        assert_eq!(cert.products()[0].id, "69");
        assert!(cert.products()[0].provided_tags.contains("srv-ha"));
        assert_eq!(cert.stacking_id(), Some("stack-1"));
        assert!(cert.provides_product("69"));
        assert!(!cert.provides_product("70"));
    }

    #[test]
    fn missing_data_block_is_a_format_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("bad.pem");
        fs::write(&path, "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n")
            .expect("write");
        let err = parse(&path).expect_err("must fail");
        assert!(matches!(err, CertificateError::FileFormat { .. }));
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("bad.pem");
        write_cert(&path, "{ not json");
        let err = parse(&path).expect_err("must fail");
        assert!(matches!(err, CertificateError::FileFormat { .. }));
    }

    #[test]
    fn validity_window_semantics() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("1.pem");
        write_cert(
            &path,
            r#"{
                "serial": 1,
                "not_before": "2024-01-01T00:00:00Z",
                "not_after": "2024-12-31T00:00:00Z"
            }"#,
        );
        let cert = parse(&path).expect("parse");
        let inside = cert.not_before() + Duration::days(30);
        let before = cert.not_before() - Duration::days(1);
        let after = cert.not_after() + Duration::days(1);

        assert!(cert.is_valid_at(inside));
        assert!(!cert.is_expired_at(inside));

        // Not yet valid: in neither set.
        assert!(!cert.is_valid_at(before));
        assert!(!cert.is_expired_at(before));

        assert!(!cert.is_valid_at(after));
        assert!(cert.is_expired_at(after));
    }

    #[test]
    fn write_round_trips_the_original_text() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("7.pem");
        write_cert(
            &path,
            r#"{"serial": 7, "not_before": "2024-01-01T00:00:00Z", "not_after": "2030-01-01T00:00:00Z"}"#,
        );
        let original = fs::read_to_string(&path).expect("read");
        let cert = parse(&path).expect("parse");

        let copy = tmp.path().join("copy.pem");
        cert.write(&copy).expect("write");
        assert_eq!(fs::read_to_string(&copy).expect("read copy"), original);
    }
}
