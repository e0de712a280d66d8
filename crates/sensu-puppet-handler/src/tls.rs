//! Loading of TLS material from PEM files on disk.
//!
//! Certificate and key problems are configuration faults: they surface as
//! errors straight away and are never retried.

use std::path::Path;

use reqwest::{Certificate, Identity};

use crate::error::{HandlerError, Result};

/// Load a client identity from a certificate PEM and its private key PEM.
///
/// The key may be PKCS#8, PKCS#1 (RSA) or SEC1 (EC).
pub fn load_identity(cert_path: &str, key_path: &str) -> Result<Identity> {
    let mut pem = read_file(cert_path)?;
    let key = read_file(key_path)?;
    pem.push(b'\n');
    pem.extend_from_slice(&key);

    Identity::from_pem(&pem).map_err(|e| HandlerError::Tls(e.to_string()))
}

fn read_file(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| HandlerError::Tls(format!("{path}: {e}")))
}

/// Read every certificate in a CA PEM file.
///
/// A file that cannot be read and a file that holds no decodable
/// certificate are reported as different errors.
pub fn load_ca_certificates(path: impl AsRef<Path>) -> Result<Vec<Certificate>> {
    let path = path.as_ref();
    let pem = std::fs::read(path).map_err(|source| HandlerError::CaCertRead {
        path: path.display().to_string(),
        source,
    })?;

    let certs = Certificate::from_pem_bundle(&pem)
        .map_err(|e| HandlerError::InvalidCaCert(format!("failed to decode PEM: {e}")))?;
    if certs.is_empty() {
        return Err(HandlerError::InvalidCaCert(
            "failed to decode PEM: no certificate found".to_string(),
        ));
    }

    tracing::debug!(path = %path.display(), count = certs.len(), "Loaded CA certificates");
    Ok(certs)
}
