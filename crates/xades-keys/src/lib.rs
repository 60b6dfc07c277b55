#![forbid(unsafe_code)]

//! Signing key material for XAdES signatures.
//!
//! Loads an RSA key and its certificates from a PKCS#12 bundle and exposes
//! the certificate facts that `KeyInfo` and `SigningCertificate` need.

pub mod key;
pub mod loader;
pub mod x509;

pub use key::KeyMaterial;
pub use loader::load_pkcs12;
pub use x509::CertInfo;
