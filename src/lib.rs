//! # pkiutil - PKI helpers for bootstrapping a cluster trust chain
//!
//! pkiutil generates a self-signed root certificate authority, issues leaf certificates
//! signed by it, stores certificates and keys on disk as PEM files, and loads them back
//! on later runs. It is built entirely on RustCrypto crates.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 bits and up (the default)
//! - **ECDSA**: P-256 and P-384 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! Anything weaker than 2048-bit RSA is refused with [`error::PkiError::WeakKey`].
//!
//! ## On-disk Layout
//!
//! For a directory `D` and a name `N`:
//! - `D/N.crt`: the certificate (`CERTIFICATE` PEM, mode 0644)
//! - `D/N.key`: the private key (PKCS#8 `PRIVATE KEY` PEM, mode 0600)
//! - `D/N.pub`: the public key (SPKI `PUBLIC KEY` PEM, mode 0644)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pkiutil::cert::extensions::ExtendedKeyUsageOption;
//! use pkiutil::cert::params::CertConfig;
//! use pkiutil::{disk, issuer, probe, usage};
//!
//! # fn main() -> Result<(), pkiutil::error::PkiError> {
//! let dir = "/etc/etcd/pki";
//!
//! let ca = match probe::try_load_cert_and_key_from_disk(dir, "ca") {
//!     Ok((cert, key)) => issuer::CertificateAuthority { cert, key },
//!     Err(err) if err.is_not_found() => {
//!         let ca = issuer::new_certificate_authority()?;
//!         disk::write_cert_and_key(dir, "ca", &ca.cert, &ca.key)?;
//!         ca
//!     }
//!     Err(err) => return Err(err),
//! };
//!
//! let config = CertConfig::builder()
//!     .common_name("etcd-server")
//!     .usages(vec![ExtendedKeyUsageOption::ServerAuth])
//!     .build();
//! let (cert, key) = issuer::new_cert_and_key(&ca.cert, &ca.key, &config, 1)?;
//! assert!(usage::has_server_auth(&cert));
//! disk::write_cert_and_key(dir, "server", &cert, &key)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::Result`]. A missing file is
//! [`error::PkiError::NotFound`], which callers treat as "generate it"; a file that
//! exists but does not parse is [`error::PkiError::DecodingError`].
//!
//! ```rust
//! use pkiutil::{error::PkiError, probe};
//!
//! match probe::try_load_cert_from_disk("/nonexistent", "ca") {
//!     Ok(cert) => println!("loaded {}", cert.common_name()),
//!     Err(PkiError::NotFound(path)) => println!("{path} needs to be generated"),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`paths`]: file names for stored material
//! - [`key`]: key generation, PEM import/export, signing and verification
//! - [`cert`]: certificate encoding/decoding, extensions and request parameters
//! - [`tbs_certificate`]: low-level certificate structure assembly
//! - [`issuer`]: CA generation and leaf certificate issuance
//! - [`disk`]: writing material with the right permissions
//! - [`probe`]: existence checks and loading from disk
//! - [`usage`]: extended key usage checks
//! - [`pem_utils`]: PEM framing helpers
//! - [`error`]: error types

pub mod cert;
pub mod disk;
pub mod error;
pub mod issuer;
pub mod key;
pub mod paths;
pub mod pem_utils;
pub mod probe;
pub mod tbs_certificate;
pub mod usage;
