//! Bootstraps an etcd-style PKI directory: a CA, a server certificate and a client
//! certificate. Running it again reuses whatever is already there.
//!
//! Usage: `cargo run --example bootstrap -- [DIR]`

use std::net::IpAddr;
use std::path::Path;

use pkiutil::cert::extensions::ExtendedKeyUsageOption;
use pkiutil::cert::params::{AltNames, CertConfig};
use pkiutil::error::Result;
use pkiutil::issuer::CertificateAuthority;
use pkiutil::{disk, probe, usage};

fn main() -> Result<()> {
    let dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "pki".to_string());
    let dir = Path::new(&dir);

    let ca = CertificateAuthority::load_or_generate(dir, "ca")?;
    println!("CA `{}` in {}", ca.cert.common_name(), dir.display());

    let mut alt_names = AltNames::default();
    alt_names.dns_names.insert("localhost".to_string());
    alt_names.ips.insert(IpAddr::from([127, 0, 0, 1]));

    let server = CertConfig::builder()
        .common_name("etcd-server")
        .alt_names(alt_names)
        .usages(vec![ExtendedKeyUsageOption::ServerAuth])
        .build();
    ensure_leaf(dir, "server", &ca, &server)?;

    let client = CertConfig::builder()
        .common_name("etcd-client")
        .organizations(vec!["system:masters".to_string()])
        .usages(vec![ExtendedKeyUsageOption::ClientAuth])
        .build();
    ensure_leaf(dir, "client", &ca, &client)?;

    Ok(())
}

fn ensure_leaf(
    dir: &Path,
    name: &str,
    ca: &CertificateAuthority,
    config: &CertConfig,
) -> Result<()> {
    if probe::cert_or_key_exist(dir, name) {
        let cert = probe::try_load_cert_from_disk(dir, name)?;
        cert.verify_signed_by(&ca.cert)?;
        println!(
            "{name}: reusing `{}` (server auth: {})",
            cert.common_name(),
            usage::has_server_auth(&cert)
        );
        return Ok(());
    }

    let (cert, key) = ca.issue_leaf(config, 1)?;
    disk::write_cert_and_key(dir, name, &cert, &key)?;
    disk::write_public_key(dir, name, &key.public_key())?;
    println!(
        "{name}: issued `{}` (server auth: {})",
        cert.common_name(),
        usage::has_server_auth(&cert)
    );
    Ok(())
}
