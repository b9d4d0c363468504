pub mod extensions;
pub mod params;

use der::{Decode, Encode, EncodePem};
use extensions::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAltName, SubjectKeyIdentifier,
    ToAndFromX509Extension,
};
use params::{AltNames, DistinguishedName, Validity};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::error::{PkiError, Result};
use crate::key::PublicKey;
use crate::pem_utils;

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// Ed25519 (the hash is part of the algorithm).
    Ed25519,
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA identifiers carry an explicit NULL parameter (RFC 4055); ECDSA and
    /// Ed25519 identifiers carry none (RFC 5758, RFC 8410).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(der::asn1::AnyRef::NULL.into()),
            },
            SignatureAlgorithm::Sha256WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            SignatureAlgorithm::Sha384WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
            SignatureAlgorithm::Ed25519 => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc8410::ID_ED_25519,
                parameters: None,
            },
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM formats
/// and to read back the fields this crate populates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| PkiError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| PkiError::EncodingError(e.to_string()))
    }

    /// Decodes a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)?;
        Ok(Self { inner })
    }

    /// Decodes the first `CERTIFICATE` block of a PEM document or bundle.
    pub fn from_pem(input: &[u8]) -> Result<Self> {
        let der = pem_utils::first_block_der(input, CERTIFICATE_LABEL)?;
        Self::from_der(&der)
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    /// The subject common name and organizations.
    pub fn subject_dn(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.subject())
    }

    pub fn common_name(&self) -> String {
        self.subject_dn().common_name
    }

    pub fn organizations(&self) -> Vec<String> {
        self.subject_dn().organizations
    }

    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    /// True when issuer and subject are the same name.
    pub fn is_self_issued(&self) -> bool {
        self.issuer() == self.subject()
    }

    pub fn validity(&self) -> Result<Validity> {
        let validity = &self.inner.tbs_certificate.validity;
        Ok(Validity {
            not_before: to_offset_date_time(&validity.not_before)?,
            not_after: to_offset_date_time(&validity.not_after)?,
        })
    }

    /// Fails with [`PkiError::CertificateError`] when `now` is outside the validity window.
    pub fn check_validity_period(&self, now: OffsetDateTime) -> Result<()> {
        let validity = self.validity()?;
        if validity.contains(now) {
            return Ok(());
        }
        if now < validity.not_before {
            return Err(PkiError::CertificateError(format!(
                "certificate `{}` is not valid before {}",
                self.common_name(),
                validity.not_before
            )));
        }
        Err(PkiError::CertificateError(format!(
            "certificate `{}` expired at {}",
            self.common_name(),
            validity.not_after
        )))
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Decodes the extension of type `E`, or `None` when the certificate does not carry it.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        let Some(extensions) = &self.inner.tbs_certificate.extensions else {
            return Ok(None);
        };
        extensions
            .iter()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    /// Whether the basic constraints extension marks this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        matches!(
            self.extension::<BasicConstraints>(),
            Ok(Some(BasicConstraints { is_ca: true, .. }))
        )
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.extension::<KeyUsage>()
    }

    pub fn extended_key_usage(&self) -> Result<Option<ExtendedKeyUsage>> {
        self.extension::<ExtendedKeyUsage>()
    }

    pub fn alt_names(&self) -> Result<AltNames> {
        Ok(self
            .extension::<SubjectAltName>()?
            .map(|san| san.names)
            .unwrap_or_default())
    }

    pub fn subject_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.extension::<SubjectKeyIdentifier>()?.map(|ski| ski.0))
    }

    /// Checks that this certificate names `issuer` as its issuer and carries a
    /// signature made by the issuer's key.
    pub fn verify_signed_by(&self, issuer: &Certificate) -> Result<()> {
        if self.issuer() != issuer.subject() {
            return Err(PkiError::CertificateError(format!(
                "certificate `{}` was not issued by `{}`",
                self.common_name(),
                issuer.common_name()
            )));
        }
        if self.inner.signature_algorithm != self.inner.tbs_certificate.signature {
            return Err(PkiError::CertificateError(
                "outer and inner signature algorithms differ".to_string(),
            ));
        }
        let tbs = self.inner.tbs_certificate.to_der()?;
        issuer
            .public_key()?
            .verify(&tbs, self.inner.signature.raw_bytes())
    }
}

fn to_offset_date_time(time: &x509_cert::time::Time) -> Result<OffsetDateTime> {
    let unix = time.to_unix_duration();
    let seconds = i64::try_from(unix.as_secs())
        .map_err(|e| PkiError::DecodingError(e.to_string()))?;
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| PkiError::DecodingError(e.to_string()))
}
