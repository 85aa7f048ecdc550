//! Persisting key and certificate pairs.

use std::path::{Path, PathBuf};

use crate::certificate::{Certificate, CertificateError, Key};

/// File name of a per-serial private key.
#[must_use]
pub fn key_file_name(serial: u64) -> String {
    format!("{serial}-key.pem")
}

/// File name of a certificate.
#[must_use]
pub fn cert_file_name(serial: u64) -> String {
    format!("{serial}.pem")
}

/// Writes key and certificate pairs into an entitlement directory
/// using the per-serial naming convention.
///
/// The writer never touches any listing cache; after a write the
/// caller invalidates the owning store's cache itself.
#[derive(Debug, Clone)]
pub struct CertificateWriter {
    dir: PathBuf,
}

impl CertificateWriter {
    /// Creates a writer targeting the given resolved directory path.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `<serial>-key.pem` and `<serial>.pem`, overwriting
    /// existing files of the same names.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::Io`] on filesystem failure.
    pub fn write(&self, key: &Key, cert: &Certificate) -> Result<(), CertificateError> {
        let serial = cert.serial();
        key.write(&self.dir.join(key_file_name(serial)))?;
        cert.write(&self.dir.join(cert_file_name(serial)))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::certificate::{CertificateParse, PemCertificateParser};
    use crate::testutil::{cert_file_text, product};

    #[test]
    fn write_creates_the_per_serial_pair() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let now = Utc::now();
        let source = tmp.path().join("source.pem");
        fs::write(
            &source,
            cert_file_text(
                555,
                &[product("p", &[])],
                now - Duration::days(1),
                now + Duration::days(1),
            ),
        )
        .expect("write source");
        let cert = PemCertificateParser
            .parse_certificate_file(&source)
            .expect("parse");

        let key_source = tmp.path().join("source-key.pem");
        fs::write(&key_source, "PRIVATE KEY BYTES").expect("write key");
        let key = Key::read(&key_source).expect("read key");

        let target = tmp.path().join("entitlement");
        fs::create_dir(&target).expect("mkdir");
        CertificateWriter::new(&target)
            .write(&key, &cert)
            .expect("write pair");

        assert_eq!(
            fs::read_to_string(target.join("555-key.pem")).expect("key"),
            "PRIVATE KEY BYTES"
        );
        assert_eq!(
            fs::read_to_string(target.join("555.pem")).expect("cert"),
            cert.text()
        );
    }
}
