//! Writing certificates and keys to disk with the permissions each artifact needs.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::cert::Certificate;
use crate::error::{PkiError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::paths;

/// Mode of directories created to hold PKI material.
pub const DIR_MODE: u32 = 0o700;
/// Mode of certificate files.
pub const CERT_FILE_MODE: u32 = 0o644;
/// Mode of private key files.
pub const KEY_FILE_MODE: u32 = 0o600;
/// Mode of public key files.
pub const PUBLIC_KEY_FILE_MODE: u32 = 0o644;

/// Writes `key` and then `cert` under `name` in `dir`.
pub fn write_cert_and_key(
    dir: impl AsRef<Path>,
    name: &str,
    cert: &Certificate,
    key: &KeyPair,
) -> Result<()> {
    let dir = dir.as_ref();
    write_key(dir, name, key)?;
    write_cert(dir, name, cert)
}

/// Writes `cert` as PEM to `dir/name.crt`.
pub fn write_cert(dir: impl AsRef<Path>, name: &str, cert: &Certificate) -> Result<()> {
    let path = paths::path_for_cert(dir, name);
    let pem = cert.to_pem().map_err(|e| unwritable(&path, e))?;
    write_file(&path, pem.as_bytes(), CERT_FILE_MODE)
}

/// Writes `key` as PKCS#8 PEM to `dir/name.key`, readable by the owner only.
pub fn write_key(dir: impl AsRef<Path>, name: &str, key: &KeyPair) -> Result<()> {
    let path = paths::path_for_key(dir, name);
    let pem = key.to_pem().map_err(|e| unwritable(&path, e))?;
    write_file(&path, pem.as_bytes(), KEY_FILE_MODE)
}

/// Writes `public_key` as SPKI PEM to `dir/name.pub`.
pub fn write_public_key(dir: impl AsRef<Path>, name: &str, public_key: &PublicKey) -> Result<()> {
    let path = paths::path_for_public_key(dir, name);
    let pem = public_key.to_pem().map_err(|e| unwritable(&path, e))?;
    write_file(&path, pem.as_bytes(), PUBLIC_KEY_FILE_MODE)
}

// Material that cannot be serialized fails the write like any other I/O problem.
fn unwritable(path: &Path, err: PkiError) -> PkiError {
    match err {
        PkiError::EncodingError(message) => PkiError::IoError {
            path: path.display().to_string(),
            message: format!("cannot serialize: {message}"),
        },
        other => other,
    }
}

fn io_error(path: &Path, err: std::io::Error) -> PkiError {
    PkiError::IoError {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }

    let mut file = open_with_mode(path, mode)?;
    file.write_all(contents).map_err(|e| io_error(path, e))?;
    file.sync_all().map_err(|e| io_error(path, e))?;

    debug!(path = %path.display(), mode = %format!("{mode:o}"), "wrote PKI file");
    Ok(())
}

/// Creates `dir` and any missing parents. Directories that already exist keep their mode.
fn create_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(dir).map_err(|e| io_error(dir, e))
}

/// Opens `path` for writing, truncating it, and forces `mode` on it.
///
/// The mode is set explicitly after opening: the mode given at creation is filtered
/// by the umask, and a file that already exists keeps whatever mode it had.
fn open_with_mode(path: &Path, mode: u32) -> Result<fs::File> {
    let mut opts = fs::OpenOptions::new();
    opts.create(true).write(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        opts.mode(mode);
        let file = opts.open(path).map_err(|e| io_error(path, e))?;
        file.set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|e| io_error(path, e))?;
        Ok(file)
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        opts.open(path).map_err(|e| io_error(path, e))
    }
}
