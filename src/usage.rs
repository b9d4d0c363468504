//! Extended key usage checks on issued or loaded certificates.

use crate::cert::Certificate;
use crate::cert::extensions::ExtendedKeyUsageOption;

/// Returns true if the certificate's extended key usage extension lists `usage`.
///
/// A certificate without the extension, or with one that does not decode, yields false.
pub fn has_usage(cert: &Certificate, usage: ExtendedKeyUsageOption) -> bool {
    cert.extended_key_usage()
        .ok()
        .flatten()
        .is_some_and(|eku| eku.usage.contains(&usage))
}

/// Returns true if the certificate may be used for TLS server authentication.
pub fn has_server_auth(cert: &Certificate) -> bool {
    has_usage(cert, ExtendedKeyUsageOption::ServerAuth)
}

/// Returns true if the certificate may be used for TLS client authentication.
pub fn has_client_auth(cert: &Certificate) -> bool {
    has_usage(cert, ExtendedKeyUsageOption::ClientAuth)
}
