//! File naming for stored PKI material.
//!
//! A directory `D` and a logical name `N` map to `D/N.crt`, `D/N.key` and `D/N.pub`.

use std::path::{Path, PathBuf};

pub const CERT_EXTENSION: &str = "crt";
pub const KEY_EXTENSION: &str = "key";
pub const PUBLIC_KEY_EXTENSION: &str = "pub";

/// The three files that may be stored for one logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub public_key: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            cert: path_for_cert(dir, name),
            key: path_for_key(dir, name),
            public_key: path_for_public_key(dir, name),
        }
    }
}

/// Returns the certificate and private key paths, in that order.
pub fn paths_for_cert_and_key(dir: impl AsRef<Path>, name: &str) -> (PathBuf, PathBuf) {
    let dir = dir.as_ref();
    (path_for_cert(dir, name), path_for_key(dir, name))
}

pub fn path_for_cert(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    with_extension(dir.as_ref(), name, CERT_EXTENSION)
}

pub fn path_for_key(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    with_extension(dir.as_ref(), name, KEY_EXTENSION)
}

pub fn path_for_public_key(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    with_extension(dir.as_ref(), name, PUBLIC_KEY_EXTENSION)
}

// `Path::with_extension` would replace a dot already present in `name`.
fn with_extension(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{name}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_for_cert_and_key() {
        let (crt_path, key_path) = paths_for_cert_and_key("/foo", "bar");
        assert_eq!(crt_path, PathBuf::from("/foo/bar.crt"));
        assert_eq!(key_path, PathBuf::from("/foo/bar.key"));
    }

    #[test]
    fn test_path_for_public_key() {
        assert_eq!(
            path_for_public_key("/foo", "bar"),
            PathBuf::from("/foo/bar.pub")
        );
    }

    #[test]
    fn test_dotted_names_keep_every_component() {
        assert_eq!(
            path_for_cert("/etc/pki", "etcd.peer"),
            PathBuf::from("/etc/pki/etcd.peer.crt")
        );
    }

    #[test]
    fn test_empty_inputs_are_accepted() {
        let paths = ArtifactPaths::new("", "");
        assert_eq!(paths.cert, PathBuf::from(".crt"));
        assert_eq!(paths.key, PathBuf::from(".key"));
        assert_eq!(paths.public_key, PathBuf::from(".pub"));
    }
}
