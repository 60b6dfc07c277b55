#![forbid(unsafe_code)]

//! PKCS#12 (.p12/.pfx) reader.
//!
//! Handles legacy PBE (SHA-1 + 3DES-CBC) and PBES2 (PBKDF2 + AES-CBC)
//! protection as written by OpenSSL 1.x and 3.x. Decrypted key material is
//! zeroed on drop.

pub mod kdf;
mod parse;

use zeroize::Zeroizing;

/// Contents extracted from a PKCS#12 file.
#[derive(Debug)]
pub struct Pkcs12Contents {
    /// PKCS#8 DER-encoded private keys.
    pub private_keys: Vec<Zeroizing<Vec<u8>>>,
    /// DER-encoded X.509 certificates, in file order.
    pub certificates: Vec<Vec<u8>>,
}

/// Parse a PKCS#12 file, decrypting with the given passphrase.
///
/// A failed integrity check or undecryptable key bag is reported as
/// [`xades_core::Error::InvalidPassphrase`]; structural damage as
/// [`xades_core::Error::MalformedPkcs12`].
pub fn parse_pkcs12(data: &[u8], password: &str) -> Result<Pkcs12Contents, xades_core::Error> {
    parse::parse_pfx(data, password)
}
