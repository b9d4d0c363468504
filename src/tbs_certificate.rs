use std::time::Duration as StdDuration;

use der::DateTime;
use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use rand_core::{OsRng, RngCore};
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::ExtensionParam;
use crate::error::{PkiError, Result};

/// Length in bytes of generated serial numbers (RFC 5280 allows up to 20).
pub const SERIAL_NUMBER_LEN: usize = 16;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The name of the certificate issuer.
/// * `not_before` - The start of the certificate's validity period.
/// * `not_after` - The end of the certificate's validity period.
/// * `subject` - The name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub not_before: time::OffsetDateTime,
    pub not_after: time::OffsetDateTime,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let algorithm_id: x509_cert::spki::AlgorithmIdentifierOwned =
            self.signature_algorithm.into();

        let extensions = self
            .extensions
            .iter()
            .map(|ext| -> Result<x509_cert::ext::Extension> {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.not_before)?,
            not_after: to_x509_time(self.not_after)?,
        };

        let serial_number = SerialNumber::new(self.serial_number.as_slice())
            .map_err(|e| PkiError::EncodingError(e.to_string()))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: algorithm_id,
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }
}

/// Draws a positive, minimally encoded serial number from the OS RNG.
pub fn random_serial_number() -> Result<Vec<u8>> {
    let mut serial = vec![0u8; SERIAL_NUMBER_LEN];
    OsRng
        .try_fill_bytes(&mut serial)
        .map_err(|e| PkiError::KeyGenerationError(e.to_string()))?;
    // Clear the sign bit and keep the leading byte non-zero.
    serial[0] = (serial[0] & 0x7f) | 0x40;
    Ok(serial)
}

/// Encodes a timestamp as UTCTime through 2049 and GeneralizedTime afterwards (RFC 5280 4.1.2.5).
fn to_x509_time(instant: time::OffsetDateTime) -> Result<x509_cert::time::Time> {
    let seconds = u64::try_from(instant.unix_timestamp())
        .map_err(|_| PkiError::InvalidInput(format!("timestamp {instant} predates 1970")))?;
    let date_time = DateTime::from_unix_duration(StdDuration::from_secs(seconds))
        .map_err(|e| PkiError::InvalidInput(e.to_string()))?;

    if date_time.year() < 2050 {
        let utc = UtcTime::from_date_time(date_time)
            .map_err(|e| PkiError::InvalidInput(e.to_string()))?;
        Ok(x509_cert::time::Time::UtcTime(utc))
    } else {
        Ok(x509_cert::time::Time::GeneralTime(
            GeneralizedTime::from_date_time(date_time),
        ))
    }
}
