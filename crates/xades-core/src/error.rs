#![forbid(unsafe_code)]

/// Errors produced while building a XAdES-BES signature.
///
/// Every failure aborts the signing call; nothing partial is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input document is not well-formed, uses an unsupported encoding,
    /// or a reference URI / metadata entry cannot be honoured.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The PKCS#12 MAC did not verify or a bag failed to decrypt.
    #[error("invalid passphrase: {0}")]
    InvalidPassphrase(String),

    /// The PKCS#12 container or one of its certificates is structurally invalid.
    #[error("malformed PKCS#12: {0}")]
    MalformedPkcs12(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// A digest, signature or canonicalization URI was rejected.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported transform: {0}")]
    UnsupportedTransform(String),

    /// The assembled signature contradicts itself (Id collision, a
    /// reference into the signature that no longer resolves).
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
