//! Looking for and loading previously stored PKI material.
//!
//! A missing file is reported as [`PkiError::NotFound`], a file that does not parse as
//! [`PkiError::DecodingError`]. Callers generate fresh material on the former and abort
//! on the latter.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::cert::Certificate;
use crate::error::{PkiError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::paths;

/// Returns true if either the certificate or the private key for `name` exists in `dir`.
pub fn cert_or_key_exist(dir: impl AsRef<Path>, name: &str) -> bool {
    let (cert_path, key_path) = paths::paths_for_cert_and_key(dir, name);
    cert_path.exists() || key_path.exists()
}

/// Loads both the certificate and the private key stored under `name`.
pub fn try_load_cert_and_key_from_disk(
    dir: impl AsRef<Path>,
    name: &str,
) -> Result<(Certificate, KeyPair)> {
    let dir = dir.as_ref();
    let cert = try_load_cert_from_disk(dir, name)?;
    let key = try_load_key_from_disk(dir, name)?;
    Ok((cert, key))
}

/// Loads the certificate stored at `dir/name.crt`.
pub fn try_load_cert_from_disk(dir: impl AsRef<Path>, name: &str) -> Result<Certificate> {
    let path = paths::path_for_cert(dir, name);
    let contents = read_artifact(&path)?;
    Certificate::from_pem(&contents).map_err(|e| with_path(&path, e))
}

/// Loads the private key stored at `dir/name.key`.
pub fn try_load_key_from_disk(dir: impl AsRef<Path>, name: &str) -> Result<KeyPair> {
    let path = paths::path_for_key(dir, name);
    let contents = read_artifact(&path)?;
    let pem = std::str::from_utf8(&contents)
        .map_err(|e| with_path(&path, PkiError::DecodingError(e.to_string())))?;
    KeyPair::from_pem(pem).map_err(|e| with_path(&path, e))
}

/// Loads the public key stored at `dir/name.pub`.
pub fn try_load_public_key_from_disk(dir: impl AsRef<Path>, name: &str) -> Result<PublicKey> {
    let path = paths::path_for_public_key(dir, name);
    let contents = read_artifact(&path)?;
    let pem = std::str::from_utf8(&contents)
        .map_err(|e| with_path(&path, PkiError::DecodingError(e.to_string())))?;
    PublicKey::from_pem(pem).map_err(|e| with_path(&path, e))
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(contents) => {
            debug!(path = %path.display(), "read PKI file");
            Ok(contents)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(PkiError::NotFound(path.display().to_string()))
        }
        Err(err) => Err(PkiError::IoError {
            path: path.display().to_string(),
            message: err.to_string(),
        }),
    }
}

// Decoding errors name the file they came from.
fn with_path(path: &Path, err: PkiError) -> PkiError {
    match err {
        PkiError::DecodingError(message) => {
            PkiError::DecodingError(format!("{}: {message}", path.display()))
        }
        other => other,
    }
}
