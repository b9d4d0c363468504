use std::net::IpAddr;

use pkiutil::cert::extensions::ExtendedKeyUsageOption;
use pkiutil::cert::params::{AltNames, CertConfig};
use pkiutil::issuer::CertificateAuthority;
use pkiutil::key::KeyAlgorithm;

/// A CA on P-256, which is much quicker to generate than the default RSA one.
pub fn generate_ca() -> CertificateAuthority {
    CertificateAuthority::generate("myca.local", KeyAlgorithm::EcdsaP256).unwrap()
}

pub fn server_config(common_name: &str) -> CertConfig {
    let mut alt_names = AltNames::default();
    alt_names.dns_names.insert("localhost".to_string());
    alt_names.dns_names.insert(common_name.to_string());
    alt_names
        .ips
        .insert("127.0.0.1".parse::<IpAddr>().unwrap());

    CertConfig::builder()
        .common_name(common_name)
        .organizations(vec!["system:masters".to_string()])
        .alt_names(alt_names)
        .usages(vec![ExtendedKeyUsageOption::ServerAuth])
        .key_algorithm(KeyAlgorithm::EcdsaP256)
        .build()
}

pub fn client_config(common_name: &str) -> CertConfig {
    CertConfig::builder()
        .common_name(common_name)
        .usages(vec![ExtendedKeyUsageOption::ClientAuth])
        .key_algorithm(KeyAlgorithm::Ed25519)
        .build()
}
