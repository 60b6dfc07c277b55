#![forbid(unsafe_code)]

//! Cryptographic primitives for XAdES signing.
//!
//! Algorithm lookup is an immutable `match` on the XML-DSig URI: digests
//! over octet streams and RSA PKCS#1 v1.5 signatures.

pub mod digest;
pub mod sign;

pub use digest::DigestAlgorithm;
pub use sign::RsaPkcs1v15;
