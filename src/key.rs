use rand_core::CryptoRngCore;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::pkcs8::EncodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use tracing::debug;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{CertError, Result};

/// RSA key pair backing a self-signed certificate.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: Box<RsaPrivateKey>,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits using the
    /// operating system's random source.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        Self::generate_rsa_with_rng(&mut rand_core::OsRng, bits)
    }

    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa_with_rng<R: CryptoRngCore + ?Sized>(
        rng: &mut R,
        bits: usize,
    ) -> Result<Self> {
        debug!(bits, "generating RSA key pair");
        let private = RsaPrivateKey::new(rng, bits)
            .map_err(|e| CertError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair {
            private: Box::new(private),
            public,
        })
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Returns the subject public key info for embedding in a certificate.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        Ok(SubjectPublicKeyInfoOwned::from_key(self.public.clone())?)
    }

    /// SHA-1 over the subject public key bits, as used for key identifiers.
    pub fn key_identifier(&self) -> Result<Vec<u8>> {
        let spki = self.as_spki()?;
        Ok(Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec())
    }

    /// PKCS#1 `RSAPrivateKey` DER encoding.
    pub fn to_pkcs1_der(&self) -> Result<Vec<u8>> {
        Ok(self.private.to_pkcs1_der()?.as_bytes().to_vec())
    }

    /// PKCS#8 `PrivateKeyInfo` DER encoding.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        Ok(self.private.to_pkcs8_der()?.as_bytes().to_vec())
    }

    /// Signs `data` with RSASSA-PKCS1-v1_5 over SHA-256.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_key: RsaSigningKey<Sha256> = RsaSigningKey::new((*self.private).clone());
        let signature = signing_key
            .try_sign(data)
            .map_err(|e| CertError::SigningError(e.to_string()))?;
        Ok(signature.to_vec())
    }
}
