//! Certificate authority generation and leaf issuance.
//!
//! [`new_cert_and_key`] (or [`CertificateAuthority::issue_leaf`]) is the only way to get a
//! CA-signed certificate out of this crate, so its strength, CA and lifetime checks cannot
//! be skipped. The signing machinery itself is not exported:
//!
//! ```compile_fail
//! use pkiutil::issuer::Issuer;
//! ```

use std::path::Path;

use der::Encode;
use der::flagset::FlagSet;
use sha1::Sha1;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::extensions::AuthorityKeyIdentifier;
use crate::cert::extensions::BasicConstraints;
use crate::cert::extensions::ExtendedKeyUsage;
use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::extensions::KeyUsage;
use crate::cert::extensions::KeyUsages;
use crate::cert::extensions::SubjectAltName;
use crate::cert::extensions::SubjectKeyIdentifier;
use crate::cert::params::Validity;
use crate::cert::params::{CertConfig, CertificationRequestInfo, DistinguishedName, ExtensionParam};
use crate::error::{PkiError, Result};
use crate::key::{KeyAlgorithm, KeyPair, PublicKey};
use crate::tbs_certificate::{TbsCertificate, random_serial_number};
use crate::{disk, probe};

/// Common name of the root generated by [`new_certificate_authority`].
pub const DEFAULT_CA_COMMON_NAME: &str = "etcd-ca";

/// Lifetime of a generated CA certificate.
pub const CA_VALIDITY_YEARS: u32 = 10;

const DAYS_PER_YEAR: i64 = 365;

/// Represents an entity capable of issuing certificates.
///
/// Implementations do no policy checking of their own; callers run those first.
pub(crate) trait Issuer {
    /// Returns the name written into the issuer field of issued certificates.
    fn issuer_name(&self) -> Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Returns the key identifier placed in the authority key identifier extension.
    fn key_identifier(&self) -> Result<Vec<u8>> {
        key_identifier(&self.signing_key().public_key())
    }

    /// Issues a certificate based on the provided certification request information.
    ///
    /// # Arguments
    /// * `cert_request` - Subject, public key and usages of the certificate to issue.
    /// * `validity` - The validity window of the new certificate.
    ///
    /// # Returns
    /// The signed `Certificate`.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        validity: Validity,
    ) -> Result<Certificate> {
        let signing_key = self.signing_key();
        let signature_algo = signing_key.signature_algorithm();
        let subject_public_key_info = cert_request.subject_public_key.to_spki()?;

        let basic_constraints = BasicConstraints {
            is_ca: cert_request.is_ca,
            max_path_length: cert_request.is_ca.then_some(0),
        };

        let mut extensions: Vec<ExtensionParam> = vec![
            ExtensionParam::from_extension(basic_constraints, true)?,
            ExtensionParam::from_extension(KeyUsage(key_usage_flags(cert_request)), true)?,
            ExtensionParam::from_extension(
                SubjectKeyIdentifier(key_identifier(&cert_request.subject_public_key)?),
                false,
            )?,
            ExtensionParam::from_extension(
                AuthorityKeyIdentifier {
                    key_identifier: self.key_identifier()?,
                },
                false,
            )?,
        ];

        if !cert_request.usages.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: cert_request.usages.clone(),
            };
            extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
        }

        if !cert_request.alt_names.is_empty() {
            let san = SubjectAltName {
                names: cert_request.alt_names.clone(),
            };
            extensions.push(ExtensionParam::from_extension(san, false)?);
        }

        let tbs_cert = TbsCertificate {
            serial_number: random_serial_number()?,
            signature_algorithm: signature_algo,
            issuer: self.issuer_name(),
            not_before: validity.not_before,
            not_after: validity.not_after,
            subject: cert_request.subject.as_x509_name()?,
            subject_public_key_info,
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let tbs_der = tbs_cert_inner
            .to_der()
            .map_err(|e| PkiError::EncodingError(e.to_string()))?;

        let signature = signing_key.sign_data(&tbs_der)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algo.into(),
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| PkiError::SigningError(e.to_string()))?,
        };

        debug!(
            subject = %cert_request.subject.common_name,
            is_ca = cert_request.is_ca,
            "issued certificate"
        );

        Ok(Certificate { inner: cert_inner })
    }
}

/// Key usage bits for a request: signing authority for CAs, and for leaves
/// digitalSignature plus keyEncipherment when the leaf key is RSA and used for TLS.
fn key_usage_flags(cert_request: &CertificationRequestInfo) -> FlagSet<KeyUsages> {
    if cert_request.is_ca {
        return KeyUsages::KeyCertSign | KeyUsages::CRLSign;
    }

    let mut key_usage_flags: FlagSet<KeyUsages> = KeyUsages::DigitalSignature.into();
    let rsa_key = matches!(cert_request.subject_public_key, PublicKey::Rsa(_));
    let key_exchange = cert_request.usages.iter().any(|usage| {
        matches!(
            usage,
            ExtendedKeyUsageOption::ServerAuth
                | ExtendedKeyUsageOption::ClientAuth
                | ExtendedKeyUsageOption::EmailProtection
        )
    });
    if rsa_key && key_exchange {
        key_usage_flags |= KeyUsages::KeyEncipherment;
    }
    key_usage_flags
}

/// SHA-1 over the subject public key bits (RFC 5280 4.2.1.2, method 1).
fn key_identifier(public_key: &PublicKey) -> Result<Vec<u8>> {
    let spki = public_key.to_spki()?;
    let key_id = <Sha1 as sha1::Digest>::digest(spki.subject_public_key.raw_bytes());
    Ok(key_id.to_vec())
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }
}

// Borrowed CA certificate and key, as handed to `new_cert_and_key`.
struct CaIssuer<'a> {
    cert: &'a Certificate,
    key: &'a KeyPair,
}

impl Issuer for CaIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.cert.subject().clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn key_identifier(&self) -> Result<Vec<u8>> {
        match self.cert.subject_key_identifier()? {
            Some(ski) => Ok(ski),
            None => key_identifier(&self.key.public_key()),
        }
    }
}

/// A root certificate authority: the self-signed certificate and its private key.
#[derive(Debug)]
pub struct CertificateAuthority {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl CertificateAuthority {
    /// Generates a self-signed root CA named `common_name`.
    ///
    /// Fails with [`PkiError::WeakKey`] for algorithms below the accepted floor and with
    /// [`PkiError::KeyGenerationError`] when key generation or randomness fails.
    pub fn generate(common_name: &str, key_algorithm: KeyAlgorithm) -> Result<Self> {
        let key = KeyPair::generate(key_algorithm)?;

        let subject = DistinguishedName::builder().common_name(common_name).build();
        let ca_cert_info = CertificationRequestInfo::builder()
            .subject(subject.clone())
            .subject_public_key(key.public_key())
            .is_ca(true)
            .build();

        let self_issuer = SelfIssuer {
            name: subject.as_x509_name()?,
            key: &key,
        };
        let cert = self_issuer.issue(&ca_cert_info, Validity::for_years(CA_VALIDITY_YEARS))?;

        info!(common_name, algorithm = ?key_algorithm, "generated certificate authority");
        Ok(Self { cert, key })
    }

    /// Loads the CA stored under `name` in `dir`, generating and persisting a new
    /// one when nothing is there yet.
    ///
    /// Only a missing certificate or key triggers generation; corrupt material is an error.
    pub fn load_or_generate(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        match probe::try_load_cert_and_key_from_disk(dir, name) {
            Ok((cert, key)) => {
                debug!(dir = %dir.display(), name, "reusing certificate authority from disk");
                Ok(Self { cert, key })
            }
            Err(err) if err.is_not_found() => {
                let ca = new_certificate_authority()?;
                disk::write_cert_and_key(dir, name, &ca.cert, &ca.key)?;
                Ok(ca)
            }
            Err(err) => Err(err),
        }
    }

    /// Issues a leaf certificate signed by this CA. See [`new_cert_and_key`].
    pub fn issue_leaf(
        &self,
        config: &CertConfig,
        validity_years: u32,
    ) -> Result<(Certificate, KeyPair)> {
        new_cert_and_key(&self.cert, &self.key, config, validity_years)
    }
}

/// Creates a new self-signed root CA with an RSA-2048 key, named [`DEFAULT_CA_COMMON_NAME`].
pub fn new_certificate_authority() -> Result<CertificateAuthority> {
    CertificateAuthority::generate(DEFAULT_CA_COMMON_NAME, KeyAlgorithm::default())
}

/// Generates a key pair and a certificate for it signed by `ca_cert`/`ca_key`.
///
/// The CA key and the requested leaf key must both meet the minimum strength; this is
/// checked before any key generation. The certificate is valid from now for
/// `validity_years` years of 365 days and may not outlive the CA.
pub fn new_cert_and_key(
    ca_cert: &Certificate,
    ca_key: &KeyPair,
    config: &CertConfig,
    validity_years: u32,
) -> Result<(Certificate, KeyPair)> {
    ca_key.algorithm().ensure_minimum_strength()?;
    config.key_algorithm.ensure_minimum_strength()?;
    if validity_years == 0 {
        return Err(PkiError::InvalidInput(
            "certificate validity must be at least one year".to_string(),
        ));
    }

    ensure_can_sign(ca_cert, ca_key)?;

    let not_before = OffsetDateTime::now_utc();
    let validity = Validity {
        not_before,
        not_after: not_before + Duration::days(i64::from(validity_years) * DAYS_PER_YEAR),
    };
    let ca_not_after = ca_cert.validity()?.not_after;
    if validity.not_after > ca_not_after {
        return Err(PkiError::InvalidInput(format!(
            "a {validity_years}-year certificate would outlive its CA (expires {ca_not_after})"
        )));
    }

    let key = KeyPair::generate(config.key_algorithm)?;

    let cert_request = CertificationRequestInfo::builder()
        .subject(config.subject())
        .subject_public_key(key.public_key())
        .usages(config.usages.clone())
        .alt_names(config.alt_names.clone())
        .build();

    let cert = CaIssuer {
        cert: ca_cert,
        key: ca_key,
    }
    .issue(&cert_request, validity)?;

    Ok((cert, key))
}

/// A certificate may only be signed by a CA certificate allowed to sign certificates,
/// using the private key that belongs to it.
fn ensure_can_sign(ca_cert: &Certificate, ca_key: &KeyPair) -> Result<()> {
    if !ca_cert.is_ca() {
        return Err(PkiError::CertificateError(format!(
            "`{}` is not a certificate authority",
            ca_cert.common_name()
        )));
    }
    if let Some(key_usage) = ca_cert.key_usage()? {
        if !key_usage.contains(KeyUsages::KeyCertSign) {
            return Err(PkiError::CertificateError(format!(
                "`{}` is not allowed to sign certificates",
                ca_cert.common_name()
            )));
        }
    }
    if ca_cert.public_key()?.to_der()? != ca_key.public_key().to_der()? {
        return Err(PkiError::SigningError(format!(
            "private key does not match the certificate of `{}`",
            ca_cert.common_name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::AltNames;

    fn ecdsa_ca() -> CertificateAuthority {
        CertificateAuthority::generate("test-ca", KeyAlgorithm::EcdsaP256).unwrap()
    }

    #[test]
    fn test_ca_is_self_signed_with_signing_authority() {
        let ca = ecdsa_ca();
        assert!(ca.cert.is_self_issued());
        assert!(ca.cert.is_ca());
        let key_usage = ca.cert.key_usage().unwrap().unwrap();
        assert!(key_usage.contains(KeyUsages::KeyCertSign));
        assert!(key_usage.contains(KeyUsages::CRLSign));
        assert!(ca.cert.verify_signed_by(&ca.cert).is_ok());
        assert_eq!(
            ca.cert.extension::<BasicConstraints>().unwrap(),
            Some(BasicConstraints {
                is_ca: true,
                max_path_length: Some(0)
            })
        );
    }

    #[test]
    fn test_ca_rejects_weak_algorithm() {
        let err =
            CertificateAuthority::generate("weak", KeyAlgorithm::Rsa { bits: 1024 }).unwrap_err();
        assert!(matches!(err, PkiError::WeakKey { bits: 1024, .. }));
    }

    #[test]
    fn test_leaf_authority_key_id_matches_ca_subject_key_id() {
        let ca = ecdsa_ca();
        let config = CertConfig::builder()
            .common_name("leaf")
            .key_algorithm(KeyAlgorithm::Ed25519)
            .build();
        let (leaf, _) = ca.issue_leaf(&config, 1).unwrap();
        let aki = leaf.extension::<AuthorityKeyIdentifier>().unwrap().unwrap();
        assert_eq!(
            Some(aki.key_identifier),
            ca.cert.subject_key_identifier().unwrap()
        );
    }

    #[test]
    fn test_rsa_tls_leaf_gets_key_encipherment() {
        let request = CertificationRequestInfo::builder()
            .subject(DistinguishedName::builder().common_name("rsa").build())
            .subject_public_key(
                KeyPair::from_rsa_private_key(
                    rsa::RsaPrivateKey::new(&mut rand_core::OsRng, 1024).unwrap(),
                )
                .public_key(),
            )
            .usages(vec![ExtendedKeyUsageOption::ServerAuth])
            .build();
        let flags = key_usage_flags(&request);
        assert!(flags.contains(KeyUsages::KeyEncipherment));
        assert!(flags.contains(KeyUsages::DigitalSignature));
        assert!(!flags.contains(KeyUsages::KeyCertSign));
    }

    #[test]
    fn test_each_extension_appears_once() {
        let ca = ecdsa_ca();
        let mut alt_names = AltNames::default();
        alt_names.dns_names.insert("etcd".to_string());
        let config = CertConfig::builder()
            .common_name("leaf")
            .alt_names(alt_names)
            .usages(vec![ExtendedKeyUsageOption::ServerAuth])
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .build();
        let (leaf, _) = ca.issue_leaf(&config, 1).unwrap();

        for cert in [&ca.cert, &leaf] {
            let extensions = cert.inner.tbs_certificate.extensions.as_ref().unwrap();
            let mut oids: Vec<_> = extensions.iter().map(|ext| ext.extn_id).collect();
            let count = oids.len();
            oids.sort();
            oids.dedup();
            assert_eq!(oids.len(), count);
        }
        assert_eq!(
            leaf.inner.tbs_certificate.extensions.as_ref().unwrap().len(),
            6
        );
    }

    #[test]
    fn test_zero_validity_is_rejected() {
        let ca = ecdsa_ca();
        let config = CertConfig::builder()
            .common_name("leaf")
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .build();
        let err = ca.issue_leaf(&config, 0).unwrap_err();
        assert!(matches!(err, PkiError::InvalidInput(_)));
    }

    #[test]
    fn test_leaf_cannot_outlive_ca() {
        let ca = ecdsa_ca();
        let config = CertConfig::builder()
            .common_name("leaf")
            .key_algorithm(KeyAlgorithm::EcdsaP256)
            .build();
        let err = ca.issue_leaf(&config, CA_VALIDITY_YEARS + 1).unwrap_err();
        assert!(matches!(err, PkiError::InvalidInput(_)));
    }
}
