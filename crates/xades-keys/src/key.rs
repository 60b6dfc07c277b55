#![forbid(unsafe_code)]

//! The signer's key material.

use rsa::traits::PublicKeyParts;
use xades_core::Error;

use crate::x509::CertInfo;

/// An RSA private key with its certificate and the rest of the bundle.
///
/// Lives for one signing call. The private key zeroizes itself on drop.
pub struct KeyMaterial {
    private: rsa::RsaPrivateKey,
    public: rsa::RsaPublicKey,
    signer: CertInfo,
    chain: Vec<CertInfo>,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RSA-{} private key, {} chain certificate(s)",
            self.public.size() * 8,
            self.chain.len()
        )
    }
}

impl KeyMaterial {
    pub fn new(private: rsa::RsaPrivateKey, signer: CertInfo, chain: Vec<CertInfo>) -> Self {
        let public = private.to_public_key();
        Self {
            private,
            public,
            signer,
            chain,
        }
    }

    /// Sign `data` with the RSA PKCS#1 v1.5 method named by `signature_uri`.
    pub fn sign(&self, signature_uri: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
        xades_crypto::sign::from_uri(signature_uri)?.sign(&self.private, data)
    }

    /// The certificate whose public key matches the private key.
    pub fn signer(&self) -> &CertInfo {
        &self.signer
    }

    /// The other certificates of the bundle, in file order.
    pub fn chain(&self) -> &[CertInfo] {
        &self.chain
    }

    /// RSA modulus, big-endian without leading zeros.
    pub fn modulus(&self) -> Vec<u8> {
        self.public.n().to_bytes_be()
    }

    /// RSA public exponent, big-endian without leading zeros.
    pub fn exponent(&self) -> Vec<u8> {
        self.public.e().to_bytes_be()
    }
}
