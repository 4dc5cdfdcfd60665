// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TLS termination from PEM files.
//!
//! When `TLS_CERT_PATH` and `TLS_KEY_PATH` are both set the server speaks
//! HTTPS directly; otherwise it expects a terminating proxy in front.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("TLS file {path} is not readable: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TLS certificate or key: {0}")]
    Invalid(std::io::Error),
}

/// Build the rustls server config from a certificate chain and private key.
///
/// The rustls crypto provider must already be installed.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    for path in [cert_path, key_path] {
        if let Err(source) = std::fs::metadata(path) {
            return Err(TlsError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(TlsError::Invalid)?;
    tracing::info!(cert = %cert_path.display(), "Loaded TLS certificate");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_are_reported_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");

        let err = load_tls_config(&cert, &key).await.unwrap_err();
        match err {
            TlsError::Unreadable { path, .. } => assert_eq!(path, cert),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn garbage_pem_is_invalid() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "not a certificate").unwrap();
        std::fs::write(&key, "not a key").unwrap();

        let err = load_tls_config(&cert, &key).await.unwrap_err();
        assert!(matches!(err, TlsError::Invalid(_)));
    }
}
