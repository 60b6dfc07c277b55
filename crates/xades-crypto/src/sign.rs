#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 signatures selected by signature-method URI.

use signature::SignatureEncoding;
use xades_core::{algorithm, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashType {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

/// An RSA PKCS#1 v1.5 signature method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaPkcs1v15 {
    uri: &'static str,
    hash: HashType,
}

/// Look up a signature method by URI.
pub fn from_uri(uri: &str) -> Result<RsaPkcs1v15, Error> {
    let (uri, hash) = match uri {
        algorithm::RSA_SHA1 => (algorithm::RSA_SHA1, HashType::Sha1),
        algorithm::RSA_SHA224 => (algorithm::RSA_SHA224, HashType::Sha224),
        algorithm::RSA_SHA256 => (algorithm::RSA_SHA256, HashType::Sha256),
        algorithm::RSA_SHA384 => (algorithm::RSA_SHA384, HashType::Sha384),
        algorithm::RSA_SHA512 => (algorithm::RSA_SHA512, HashType::Sha512),
        _ => {
            return Err(Error::UnsupportedAlgorithm(format!(
                "signature algorithm: {uri}"
            )))
        }
    };
    Ok(RsaPkcs1v15 { uri, hash })
}

impl RsaPkcs1v15 {
    pub fn uri(&self) -> &'static str {
        self.uri
    }

    /// The digest URI matching this method's hash.
    pub fn digest_uri(&self) -> &'static str {
        match self.hash {
            HashType::Sha1 => algorithm::SHA1,
            HashType::Sha224 => algorithm::SHA224,
            HashType::Sha256 => algorithm::SHA256,
            HashType::Sha384 => algorithm::SHA384,
            HashType::Sha512 => algorithm::SHA512,
        }
    }

    /// Hash `data` and sign it with `private_key`.
    pub fn sign(&self, private_key: &rsa::RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::Signer;
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(private_key.clone());
                let sig = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))?;
                Ok(sig.to_vec())
            }};
        }
        match self.hash {
            HashType::Sha1 => do_sign!(sha1::Sha1),
            HashType::Sha224 => do_sign!(sha2::Sha224),
            HashType::Sha256 => do_sign!(sha2::Sha256),
            HashType::Sha384 => do_sign!(sha2::Sha384),
            HashType::Sha512 => do_sign!(sha2::Sha512),
        }
    }

    /// Check `sig_bytes` over `data`. Returns `Ok(false)` on a mismatch.
    pub fn verify(
        &self,
        public_key: &rsa::RsaPublicKey,
        data: &[u8],
        sig_bytes: &[u8],
    ) -> Result<bool, Error> {
        use signature::Verifier;
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(public_key.clone());
                Ok(vk.verify(data, &sig).is_ok())
            }};
        }
        match self.hash {
            HashType::Sha1 => do_verify!(sha1::Sha1),
            HashType::Sha224 => do_verify!(sha2::Sha224),
            HashType::Sha256 => do_verify!(sha2::Sha256),
            HashType::Sha384 => do_verify!(sha2::Sha384),
            HashType::Sha512 => do_verify!(sha2::Sha512),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_key() -> rsa::RsaPrivateKey {
        let mut rng = StdRng::seed_from_u64(7);
        rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap()
    }

    #[test]
    fn test_sign_verify_every_method() {
        let key = test_key();
        let public = key.to_public_key();
        for uri in [
            algorithm::RSA_SHA1,
            algorithm::RSA_SHA224,
            algorithm::RSA_SHA256,
            algorithm::RSA_SHA384,
            algorithm::RSA_SHA512,
        ] {
            let method = from_uri(uri).unwrap();
            assert_eq!(method.uri(), uri);
            let sig = method.sign(&key, b"signed info").unwrap();
            assert_eq!(sig.len(), 128);
            assert!(method.verify(&public, b"signed info", &sig).unwrap());
            assert!(!method.verify(&public, b"tampered", &sig).unwrap());
        }
    }

    #[test]
    fn test_deterministic() {
        let key = test_key();
        let method = from_uri(algorithm::RSA_SHA256).unwrap();
        assert_eq!(method.sign(&key, b"x").unwrap(), method.sign(&key, b"x").unwrap());
        assert_eq!(method.digest_uri(), algorithm::SHA256);
    }

    #[test]
    fn test_unknown_method() {
        assert!(matches!(
            from_uri("http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
