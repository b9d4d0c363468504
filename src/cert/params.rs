use std::collections::BTreeSet;
use std::net::IpAddr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{AnyRef, SetOfVec, Utf8StringRef};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::{PkiError, Result};
use crate::key::{KeyAlgorithm, PublicKey};

const COMMON_NAME_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const ORGANIZATION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");

/// Description of a leaf certificate to issue, supplied by the configuration layer.
///
/// Field contents are taken as already validated: IP addresses arrive parsed and
/// DNS names are not re-checked beyond what IA5String encoding requires.
#[derive(Clone, Debug, Builder)]
pub struct CertConfig {
    #[builder(into)]
    pub common_name: String,
    #[builder(default)]
    pub organizations: Vec<String>,
    #[builder(default)]
    pub alt_names: AltNames,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    /// Algorithm of the leaf key generated for this certificate.
    #[builder(default)]
    pub key_algorithm: KeyAlgorithm,
}

impl CertConfig {
    /// The subject distinguished name described by this configuration.
    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName {
            common_name: self.common_name.clone(),
            organizations: self.organizations.clone(),
        }
    }
}

/// Subject alternative names: DNS names and IP addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AltNames {
    pub dns_names: BTreeSet<String>,
    pub ips: BTreeSet<IpAddr>,
}

impl AltNames {
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ips.is_empty()
    }
}

/// Parameters for building an X.509 certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `usages` - A list of extended key usage options.
/// * `alt_names` - DNS and IP subject alternative names.
/// * `is_ca` - Indicates if the certificate is a CA.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub alt_names: AltNames,
    #[builder(default)]
    pub is_ca: bool,
}

/// Distinguished name of a certificate subject: organizations followed by the common name.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(default)]
    pub organizations: Vec<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 `Name`.
    ///
    /// Each organization becomes its own RDN, in order, and the common name comes last.
    pub fn as_x509_name(&self) -> Result<Name> {
        let mut rdns = Vec::with_capacity(self.organizations.len() + 1);
        for organization in &self.organizations {
            rdns.push(single_attribute_rdn(ORGANIZATION_OID, organization)?);
        }
        rdns.push(single_attribute_rdn(COMMON_NAME_OID, &self.common_name)?);
        Ok(RdnSequence(rdns))
    }

    /// Reads the common name and organizations back out of an X.509 `Name`.
    ///
    /// Attributes other than CN and O are ignored. String values are read regardless of
    /// their ASN.1 string type, so names written by other tools round-trip too.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut common_name = String::new();
        let mut organizations = Vec::new();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Ok(value) = std::str::from_utf8(attr.value.value()) else {
                    continue;
                };
                if attr.oid == COMMON_NAME_OID {
                    common_name = value.to_string();
                } else if attr.oid == ORGANIZATION_OID {
                    organizations.push(value.to_string());
                }
            }
        }

        DistinguishedName {
            common_name,
            organizations,
        }
    }
}

fn single_attribute_rdn(oid: ObjectIdentifier, value: &str) -> Result<RelativeDistinguishedName> {
    let value = Utf8StringRef::new(value).map_err(|e| PkiError::InvalidInput(e.to_string()))?;
    let attribute = AttributeTypeAndValue {
        oid,
        value: AnyRef::from(value).into(),
    };
    let set = SetOfVec::try_from(vec![attribute])
        .map_err(|e| PkiError::EncodingError(e.to_string()))?;
    Ok(RelativeDistinguishedName(set))
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    /// Creates a validity period starting now for the given number of 365-day years.
    pub fn for_years(years: u32) -> Self {
        Self::for_days(i64::from(years) * 365)
    }

    /// Returns true when `instant` falls inside the window, bounds included.
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.not_before <= instant && instant <= self.not_after
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }
}
