#![forbid(unsafe_code)]

//! Digest (hash) algorithm implementations.

use digest::Digest;
use xades_core::{algorithm, Error};

/// Trait for digest algorithms.
pub trait DigestAlgorithm: Send {
    /// Feed data into the hash.
    fn update(&mut self, data: &[u8]);
    /// Finalize and return the hash value.
    fn finalize(self: Box<Self>) -> Vec<u8>;
    /// Algorithm URI.
    fn uri(&self) -> &'static str;
}

/// Create a digest algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
    match uri {
        algorithm::SHA1 => Ok(Box::new(Sha1Digest::new())),
        algorithm::SHA224 => Ok(Box::new(Sha224Digest::new())),
        algorithm::SHA256 => Ok(Box::new(Sha256Digest::new())),
        algorithm::SHA384 => Ok(Box::new(Sha384Digest::new())),
        algorithm::SHA512 => Ok(Box::new(Sha512Digest::new())),
        #[cfg(feature = "legacy-algorithms")]
        algorithm::MD5 => Ok(Box::new(Md5Digest::new())),
        _ => Err(Error::UnsupportedAlgorithm(format!(
            "digest algorithm: {uri}"
        ))),
    }
}

/// Fail early with `UnsupportedAlgorithm` when `uri` is not a digest we know.
pub fn check_uri(uri: &str) -> Result<(), Error> {
    from_uri(uri).map(|_| ())
}

/// Compute a digest in one shot.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut hasher = from_uri(uri)?;
    hasher.update(data);
    Ok(hasher.finalize())
}

// ── Concrete implementations ─────────────────────────────────────────

macro_rules! impl_digest {
    ($name:ident, $hasher:ty, $uri:expr) => {
        struct $name {
            inner: $hasher,
        }

        impl $name {
            fn new() -> Self {
                Self {
                    inner: <$hasher>::new(),
                }
            }
        }

        impl DigestAlgorithm for $name {
            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.inner, data);
            }

            fn finalize(self: Box<Self>) -> Vec<u8> {
                Digest::finalize(self.inner).to_vec()
            }

            fn uri(&self) -> &'static str {
                $uri
            }
        }
    };
}

impl_digest!(Sha1Digest, sha1::Sha1, algorithm::SHA1);
impl_digest!(Sha224Digest, sha2::Sha224, algorithm::SHA224);
impl_digest!(Sha256Digest, sha2::Sha256, algorithm::SHA256);
impl_digest!(Sha384Digest, sha2::Sha384, algorithm::SHA384);
impl_digest!(Sha512Digest, sha2::Sha512, algorithm::SHA512);

#[cfg(feature = "legacy-algorithms")]
impl_digest!(Md5Digest, md5::Md5, algorithm::MD5);

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_sha256() {
        let result = digest(algorithm::SHA256, b"hello").unwrap();
        assert_eq!(
            hex(&result),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha1() {
        let result = digest(algorithm::SHA1, b"hello").unwrap();
        assert_eq!(hex(&result), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn test_lengths() {
        for (uri, len) in [
            (algorithm::SHA224, 28),
            (algorithm::SHA384, 48),
            (algorithm::SHA512, 64),
        ] {
            assert_eq!(digest(uri, b"hello").unwrap().len(), len);
        }
    }

    #[cfg(feature = "legacy-algorithms")]
    #[test]
    fn test_md5() {
        let result = digest(algorithm::MD5, b"hello").unwrap();
        assert_eq!(hex(&result), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut hasher = from_uri(algorithm::SHA256).unwrap();
        assert_eq!(hasher.uri(), algorithm::SHA256);
        hasher.update(b"hel");
        hasher.update(b"lo");
        assert_eq!(hasher.finalize(), digest(algorithm::SHA256, b"hello").unwrap());
    }

    #[test]
    fn test_unknown_uri() {
        let err = digest("http://example.com/unknown", b"x").unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(ref m) if m.contains("http://example.com/unknown")));
        assert!(check_uri(algorithm::SHA512).is_ok());
    }
}
