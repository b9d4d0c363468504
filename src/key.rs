use der::{Decode, Encode};
use ed25519_dalek::{
    Signature as Ed25519Signature, SigningKey as Ed25519SigningKey,
    VerifyingKey as Ed25519VerifyingKey,
};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
    PrivateKeyInfo,
};
use rand_core::{OsRng, RngCore};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{
    Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey,
};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::SignatureAlgorithm;
use crate::error::{PkiError, Result};
use crate::pem_utils;

/// Smallest accepted key strength, expressed in RSA modulus bits.
pub const MIN_RSA_EQUIVALENT_BITS: usize = 2048;

/// PEM label of a PKCS#8 private key.
pub const PKCS8_PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
/// PEM label of a legacy PKCS#1 RSA private key.
pub const PKCS1_RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
/// PEM label of a SEC1 elliptic curve private key.
pub const SEC1_EC_PRIVATE_KEY_LABEL: &str = "EC PRIVATE KEY";
/// PEM label of an SPKI public key.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Key algorithms the crate can generate and sign with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa { bits: usize },
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        KeyAlgorithm::Rsa {
            bits: MIN_RSA_EQUIVALENT_BITS,
        }
    }
}

impl KeyAlgorithm {
    /// Approximate strength of the algorithm in RSA modulus bits (NIST SP 800-57).
    pub fn rsa_equivalent_bits(&self) -> usize {
        match self {
            KeyAlgorithm::Rsa { bits } => *bits,
            KeyAlgorithm::EcdsaP256 => 3072,
            KeyAlgorithm::EcdsaP384 => 7680,
            KeyAlgorithm::Ed25519 => 3072,
        }
    }

    /// Fails with [`PkiError::WeakKey`] when the algorithm is below the accepted floor.
    pub fn ensure_minimum_strength(&self) -> Result<()> {
        let bits = self.rsa_equivalent_bits();
        if bits < MIN_RSA_EQUIVALENT_BITS {
            return Err(PkiError::WeakKey {
                bits,
                minimum: MIN_RSA_EQUIVALENT_BITS,
            });
        }
        Ok(())
    }
}

/// A private key together with its public half.
///
/// Deliberately not `Clone`: whoever generated or loaded the key owns it.
#[derive(Debug)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generates a fresh key pair.
    ///
    /// The strength check runs before any generation work.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        algorithm.ensure_minimum_strength()?;

        let key_pair = match algorithm {
            KeyAlgorithm::Rsa { bits } => {
                let private = RsaPrivateKey::new(&mut OsRng, bits)
                    .map_err(|e| PkiError::KeyGenerationError(e.to_string()))?;
                Self::from_rsa_private_key(private)
            }
            KeyAlgorithm::EcdsaP256 => {
                let signing_key = ecdsa_signing_key::<_, 32>(P256SigningKey::from_slice)?;
                let verifying_key = *signing_key.verifying_key();
                KeyPair::EcdsaP256 {
                    signing_key,
                    verifying_key,
                }
            }
            KeyAlgorithm::EcdsaP384 => {
                let signing_key = ecdsa_signing_key::<_, 48>(P384SigningKey::from_slice)?;
                let verifying_key = *signing_key.verifying_key();
                KeyPair::EcdsaP384 {
                    signing_key,
                    verifying_key,
                }
            }
            KeyAlgorithm::Ed25519 => KeyPair::Ed25519 {
                signing_key: Ed25519SigningKey::from_bytes(&random_seed::<32>()?),
            },
        };
        Ok(key_pair)
    }

    /// Wraps an existing RSA private key. No strength check is applied here.
    pub fn from_rsa_private_key(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }

    /// The algorithm (and for RSA, the modulus size) of this key.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa { public, .. } => KeyAlgorithm::Rsa {
                bits: public.n().bits(),
            },
            KeyPair::EcdsaP256 { .. } => KeyAlgorithm::EcdsaP256,
            KeyPair::EcdsaP384 { .. } => KeyAlgorithm::EcdsaP384,
            KeyPair::Ed25519 { .. } => KeyAlgorithm::Ed25519,
        }
    }

    /// The signature algorithm this key produces.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    /// Signs `data`, returning the signature in the encoding X.509 expects
    /// (DER `Ecdsa-Sig-Value` for ECDSA, raw bytes otherwise).
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_error = |e: rsa::signature::Error| PkiError::SigningError(e.to_string());
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = RsaSigningKey::<Sha256>::new(private.as_ref().clone());
                let signature = signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature: Ed25519Signature =
                    signing_key.try_sign(data).map_err(signing_error)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    /// Encodes the private key as a PKCS#8 `PRIVATE KEY` PEM document.
    pub fn to_pem(&self) -> Result<String> {
        let pem = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP256 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP384 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::Ed25519 { signing_key } => signing_key.to_pkcs8_pem(LineEnding::LF),
        }
        .map_err(|e| PkiError::EncodingError(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Parses a PEM private key: PKCS#8 for every algorithm, or a legacy PKCS#1 RSA key,
    /// or a SEC1 EC key.
    pub fn from_pem(input: &str) -> Result<Self> {
        let block = pem_utils::parse_block(input.as_bytes())?;
        match block.tag() {
            PKCS8_PRIVATE_KEY_LABEL => Self::from_pkcs8_der(block.contents()),
            SEC1_EC_PRIVATE_KEY_LABEL => Self::from_sec1_der(block.contents()),
            PKCS1_RSA_PRIVATE_KEY_LABEL => {
                let private = RsaPrivateKey::from_pkcs1_der(block.contents())
                    .map_err(|e| PkiError::DecodingError(e.to_string()))?;
                Ok(Self::from_rsa_private_key(private))
            }
            other => Err(PkiError::DecodingError(format!(
                "expected a private key PEM block, found `{other}`"
            ))),
        }
    }

    /// Parses a DER-encoded SEC1 `ECPrivateKey` on P-256 or P-384.
    pub fn from_sec1_der(der: &[u8]) -> Result<Self> {
        if let Ok(secret_key) = p256::SecretKey::from_sec1_der(der) {
            let signing_key = P256SigningKey::from(secret_key);
            let verifying_key = *signing_key.verifying_key();
            return Ok(KeyPair::EcdsaP256 {
                signing_key,
                verifying_key,
            });
        }
        let secret_key = p384::SecretKey::from_sec1_der(der)
            .map_err(|e| PkiError::DecodingError(format!("SEC1 private key: {e}")))?;
        let signing_key = P384SigningKey::from(secret_key);
        let verifying_key = *signing_key.verifying_key();
        Ok(KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        })
    }

    /// Parses a DER-encoded PKCS#8 private key.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let decoding_error = |e: pkcs8::Error| PkiError::DecodingError(e.to_string());
        let info = PrivateKeyInfo::try_from(der).map_err(decoding_error)?;

        match info.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => {
                let private = RsaPrivateKey::from_pkcs8_der(der).map_err(decoding_error)?;
                Ok(Self::from_rsa_private_key(private))
            }
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                if let Ok(signing_key) = P256SigningKey::from_pkcs8_der(der) {
                    let verifying_key = *signing_key.verifying_key();
                    return Ok(KeyPair::EcdsaP256 {
                        signing_key,
                        verifying_key,
                    });
                }
                let signing_key = P384SigningKey::from_pkcs8_der(der).map_err(decoding_error)?;
                let verifying_key = *signing_key.verifying_key();
                Ok(KeyPair::EcdsaP384 {
                    signing_key,
                    verifying_key,
                })
            }
            const_oid::db::rfc8410::ID_ED_25519 => {
                let signing_key = Ed25519SigningKey::from_pkcs8_der(der).map_err(decoding_error)?;
                Ok(KeyPair::Ed25519 { signing_key })
            }
            oid => Err(PkiError::DecodingError(format!(
                "unsupported private key algorithm {oid}"
            ))),
        }
    }
}

/// Draws `N` bytes from the OS RNG.
fn random_seed<const N: usize>() -> Result<[u8; N]> {
    let mut seed = [0u8; N];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|e| PkiError::KeyGenerationError(e.to_string()))?;
    Ok(seed)
}

const MAX_SCALAR_DRAWS: usize = 8;

// A seed that is zero or not below the curve order is rejected; draw again.
fn ecdsa_signing_key<K, const N: usize>(
    from_slice: fn(&[u8]) -> std::result::Result<K, ecdsa::Error>,
) -> Result<K> {
    for _ in 0..MAX_SCALAR_DRAWS {
        if let Ok(signing_key) = from_slice(&random_seed::<N>()?) {
            return Ok(signing_key);
        }
    }
    Err(PkiError::KeyGenerationError(format!(
        "no valid scalar in {MAX_SCALAR_DRAWS} draws"
    )))
}

/// Public half of a [`KeyPair`].
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// Extracts the public key carried by a certificate.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        Self::from_public_key_der(&spki.to_der()?)
    }

    /// Parses a DER-encoded SPKI structure.
    pub fn from_public_key_der(der: &[u8]) -> Result<Self> {
        let decoding_error = |e: pkcs8::spki::Error| PkiError::DecodingError(e.to_string());
        let spki = SubjectPublicKeyInfoOwned::from_der(der)?;

        match spki.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => RsaPublicKey::from_public_key_der(der)
                .map(PublicKey::Rsa)
                .map_err(decoding_error),
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                if let Ok(verifying_key) = P256VerifyingKey::from_public_key_der(der) {
                    return Ok(PublicKey::EcdsaP256(verifying_key));
                }
                P384VerifyingKey::from_public_key_der(der)
                    .map(PublicKey::EcdsaP384)
                    .map_err(decoding_error)
            }
            const_oid::db::rfc8410::ID_ED_25519 => Ed25519VerifyingKey::from_public_key_der(der)
                .map(PublicKey::Ed25519)
                .map_err(decoding_error),
            oid => Err(PkiError::DecodingError(format!(
                "unsupported public key algorithm {oid}"
            ))),
        }
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone()),
            PublicKey::EcdsaP256(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            PublicKey::Ed25519(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
        }
        .map_err(|e| PkiError::EncodingError(e.to_string()))
    }

    /// DER encoding of the SPKI, handy for comparing keys.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_spki()?
            .to_der()
            .map_err(|e| PkiError::EncodingError(e.to_string()))
    }

    /// Encodes the key as an SPKI `PUBLIC KEY` PEM document.
    pub fn to_pem(&self) -> Result<String> {
        match self {
            PublicKey::Rsa(public) => public.to_public_key_pem(LineEnding::LF),
            PublicKey::EcdsaP256(verifying_key) => verifying_key.to_public_key_pem(LineEnding::LF),
            PublicKey::EcdsaP384(verifying_key) => verifying_key.to_public_key_pem(LineEnding::LF),
            PublicKey::Ed25519(verifying_key) => verifying_key.to_public_key_pem(LineEnding::LF),
        }
        .map_err(|e| PkiError::EncodingError(e.to_string()))
    }

    pub fn from_pem(input: &str) -> Result<Self> {
        let block = pem_utils::parse_block(input.as_bytes())?;
        if block.tag() != PUBLIC_KEY_LABEL {
            return Err(PkiError::DecodingError(format!(
                "expected a `{PUBLIC_KEY_LABEL}` PEM block, found `{}`",
                block.tag()
            )));
        }
        Self::from_public_key_der(block.contents())
    }

    /// Checks `signature` over `message` as produced by [`KeyPair::sign_data`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let invalid = |e: rsa::signature::Error| {
            PkiError::CertificateError(format!("signature verification failed: {e}"))
        };
        match self {
            PublicKey::Rsa(public) => {
                let verifying_key = RsaVerifyingKey::<Sha256>::new(public.clone());
                let signature = RsaSignature::try_from(signature).map_err(invalid)?;
                verifying_key.verify(message, &signature).map_err(invalid)
            }
            PublicKey::EcdsaP256(verifying_key) => {
                let signature = p256::ecdsa::Signature::from_der(signature).map_err(invalid)?;
                verifying_key.verify(message, &signature).map_err(invalid)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                let signature = p384::ecdsa::Signature::from_der(signature).map_err(invalid)?;
                verifying_key.verify(message, &signature).map_err(invalid)
            }
            PublicKey::Ed25519(verifying_key) => {
                let signature = Ed25519Signature::from_slice(signature).map_err(invalid)?;
                verifying_key.verify(message, &signature).map_err(invalid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_rejects_weak_rsa() {
        let err = KeyPair::generate(KeyAlgorithm::Rsa { bits: 1024 }).unwrap_err();
        assert_eq!(
            err,
            PkiError::WeakKey {
                bits: 1024,
                minimum: MIN_RSA_EQUIVALENT_BITS
            }
        );
    }

    #[test]
    fn test_ecdsa_key_pem_reload_keeps_public_key() {
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP384).unwrap();
        let reloaded = KeyPair::from_pem(&key.to_pem().unwrap()).unwrap();
        assert_eq!(reloaded.algorithm(), KeyAlgorithm::EcdsaP384);
        assert_eq!(
            key.public_key().to_der().unwrap(),
            reloaded.public_key().to_der().unwrap()
        );
    }

    #[test]
    fn test_legacy_pkcs1_rsa_key_is_accepted() {
        use rsa::pkcs1::EncodeRsaPrivateKey;

        let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let pem = private.to_pkcs1_pem(LineEnding::LF).unwrap();
        let key = KeyPair::from_pem(&pem).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::Rsa { bits: 1024 });
    }

    #[test]
    fn test_sec1_ec_private_key_is_accepted() {
        let secret_key = p256::SecretKey::random(&mut OsRng);
        let pem = secret_key.to_sec1_pem(LineEnding::LF).unwrap();
        let key = KeyPair::from_pem(&pem).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::EcdsaP256);
        assert_eq!(
            key.public_key().to_der().unwrap(),
            secret_key.public_key().to_public_key_der().unwrap().as_bytes()
        );

        let secret_key = p384::SecretKey::random(&mut OsRng);
        let pem = secret_key.to_sec1_pem(LineEnding::LF).unwrap();
        let key = KeyPair::from_pem(&pem).unwrap();
        assert_eq!(key.algorithm(), KeyAlgorithm::EcdsaP384);
    }

    #[test]
    fn test_generated_keys_are_fresh_and_usable() {
        for algorithm in [
            KeyAlgorithm::EcdsaP256,
            KeyAlgorithm::EcdsaP384,
            KeyAlgorithm::Ed25519,
        ] {
            let a = KeyPair::generate(algorithm).unwrap();
            let b = KeyPair::generate(algorithm).unwrap();
            assert_eq!(a.algorithm(), algorithm);
            assert_ne!(a.public_key().to_der().unwrap(), b.public_key().to_der().unwrap());

            let signature = a.sign_data(b"payload").unwrap();
            assert!(a.public_key().verify(b"payload", &signature).is_ok());
        }
    }

    #[test]
    fn test_rsa_strength_counts_modulus_bits() {
        let private = RsaPrivateKey::new(&mut OsRng, 2047).unwrap();
        let key = KeyPair::from_rsa_private_key(private);
        assert_eq!(key.algorithm(), KeyAlgorithm::Rsa { bits: 2047 });
        assert!(matches!(
            key.algorithm().ensure_minimum_strength(),
            Err(PkiError::WeakKey { bits: 2047, .. })
        ));
    }

    #[test]
    fn test_signature_verifies_only_for_signed_message() {
        let key = KeyPair::generate(KeyAlgorithm::Ed25519).unwrap();
        let signature = key.sign_data(b"to be signed").unwrap();
        let public = key.public_key();
        assert!(public.verify(b"to be signed", &signature).is_ok());
        assert!(public.verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn test_public_key_pem_rejects_private_key_block() {
        let key = KeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let err = PublicKey::from_pem(&key.to_pem().unwrap()).unwrap_err();
        assert!(matches!(err, PkiError::DecodingError(_)));
    }
}
