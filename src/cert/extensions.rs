use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

use super::params::AltNames;
use crate::error::{PkiError, Result};

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use pkiutil::cert::extensions::{BasicConstraints, ToAndFromX509Extension};
/// let bc = BasicConstraints { is_ca: true, max_path_length: Some(0) };
/// let encoded = bc.to_x509_extension_value().unwrap();
/// let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
/// assert!(decoded.is_ca);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// Only DNS names and IP addresses are produced; other general name forms found while
/// decoding are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub names: AltNames,
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let mut general_names = self
            .names
            .dns_names
            .iter()
            .map(|name| {
                Ia5String::try_from(name.clone())
                    .map(GeneralName::DnsName)
                    .map_err(|e| PkiError::InvalidInput(format!("DNS name `{name}`: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        for ip in &self.names.ips {
            let octets = match ip {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            general_names.push(GeneralName::IpAddress(OctetString::new(octets)?));
        }

        let san = x509_cert::ext::pkix::SubjectAltName(general_names);
        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let mut names = AltNames::default();
        for name in san.0.iter() {
            match name {
                GeneralName::DnsName(dns) => {
                    names.dns_names.insert(dns.to_string());
                }
                GeneralName::IpAddress(octets) => {
                    names.ips.insert(ip_from_octets(octets.as_bytes())?);
                }
                _ => {}
            }
        }
        Ok(Self { names })
    }
}

fn ip_from_octets(octets: &[u8]) -> Result<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(octets) {
        return Ok(IpAddr::V4(Ipv4Addr::from(v4)));
    }
    if let Ok(v6) = <[u8; 16]>::try_from(octets) {
        return Ok(IpAddr::V6(Ipv6Addr::from(v6)));
    }
    Err(PkiError::DecodingError(format!(
        "IP address SAN has invalid length {}",
        octets.len()
    )))
}

/// Represents the Basic Constraints extension.
///
/// This extension indicates whether the certificate is a CA certificate and its path length.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed below this one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

/// Represents the Key Usage extension.
///
/// This extension defines the purpose of the key contained in the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl KeyUsage {
    pub fn contains(&self, usage: KeyUsages) -> bool {
        self.0.contains(usage)
    }
}

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ku = X509KeyUsage(self.0);
        Ok(ku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
///
/// This extension indicates purposes for which the public key may be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        Ok(eku.to_der()?)
    }

    /// Purposes this crate does not model are dropped rather than rejected.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        let usage = eku
            .0
            .iter()
            .filter_map(ExtendedKeyUsageOption::from_oid)
            .collect();
        Ok(Self { usage })
    }
}

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl ExtendedKeyUsageOption {
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            const_oid::db::rfc5912::ID_KP_SERVER_AUTH => Some(ExtendedKeyUsageOption::ServerAuth),
            const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => Some(ExtendedKeyUsageOption::ClientAuth),
            const_oid::db::rfc5912::ID_KP_CODE_SIGNING => Some(ExtendedKeyUsageOption::CodeSigning),
            const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => {
                Some(ExtendedKeyUsageOption::EmailProtection)
            }
            const_oid::db::rfc5912::ID_KP_TIME_STAMPING => {
                Some(ExtendedKeyUsageOption::TimeStamping)
            }
            const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => Some(ExtendedKeyUsageOption::OcspSigning),
            _ => None,
        }
    }
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
        }
    }
}

/// Represents the Subject Key Identifier (SKI) extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.clone())?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// Only the key identifier form is used; it carries the issuer's subject key identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;
        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_basic_constraints_has_no_path_length() {
        let der = BasicConstraints::default().to_x509_extension_value().unwrap();
        let raw = x509_cert::ext::pkix::BasicConstraints::from_der(&der).unwrap();
        assert!(!raw.ca);
        assert_eq!(raw.path_len_constraint, None);
    }

    #[test]
    fn test_subject_alt_name_carries_dns_and_ip() {
        let mut names = AltNames::default();
        names.dns_names.insert("etcd.cluster.local".to_string());
        names.ips.insert("10.0.0.1".parse().unwrap());
        names.ips.insert("::1".parse().unwrap());
        let original = SubjectAltName { names };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_subject_alt_name_rejects_non_ascii_dns() {
        let mut names = AltNames::default();
        names.dns_names.insert("ünïcode.example".to_string());
        let err = SubjectAltName { names }
            .to_x509_extension_value()
            .unwrap_err();
        assert!(matches!(err, PkiError::InvalidInput(_)));
    }

    #[test]
    fn test_key_usage_encoding_decoding() {
        let original = KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign);
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = KeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
        assert!(decoded.contains(KeyUsages::KeyCertSign));
        assert!(!decoded.contains(KeyUsages::DigitalSignature));
    }

    #[test]
    fn test_extended_key_usage_skips_unknown_purposes() {
        let raw = x509_cert::ext::pkix::ExtendedKeyUsage(vec![
            const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.10.3.4"),
        ]);
        let decoded = ExtendedKeyUsage::from_x509_extension_value(&raw.to_der().unwrap()).unwrap();
        assert_eq!(decoded.usage, vec![ExtendedKeyUsageOption::ClientAuth]);
    }

    #[test]
    fn test_authority_key_identifier_without_key_id_decodes_empty() {
        let raw = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: None,
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };
        let decoded =
            AuthorityKeyIdentifier::from_x509_extension_value(&raw.to_der().unwrap()).unwrap();
        assert!(decoded.key_identifier.is_empty());
    }

    #[test]
    fn test_ip_address_of_odd_length_is_rejected() {
        assert!(matches!(
            ip_from_octets(&[10, 0, 0]),
            Err(PkiError::DecodingError(_))
        ));
    }
}
