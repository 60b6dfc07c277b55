#![forbid(unsafe_code)]

//! XAdES-BES enveloped XML signatures.
//!
//! [`sign`] takes the document octets, a PKCS#12 bundle and its passphrase,
//! and returns the document with one `ds:Signature` appended as the last
//! child of the root element. The payload bytes are never re-serialized.
//!
//! ```no_run
//! let xml = std::fs::read("invoice.xml")?;
//! let p12 = std::fs::read("signer.p12")?;
//! let signed = xades::sign(&xml, &p12, "secret", "", &xades::SignOptions::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use xades_c14n as c14n;
pub use xades_core as core;
pub use xades_crypto as crypto;
pub use xades_keys as keys;
pub use xades_pkcs12 as pkcs12;
pub use xades_sign as signature;
pub use xades_transforms as transforms;
pub use xades_xml as xml;

pub use xades_core::{Error, Result};
pub use xades_keys::KeyMaterial;
pub use xades_sign::{DataObjectFormat, SignOptions};

use xades_sign::SignatureAssembler;
use xades_xml::XmlDocument;

/// Declaration written in front of every signed document.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Sign `xml` with the key in `pkcs12`, covering the reference `target_uri`.
///
/// `target_uri` is `""` for the whole document or `#id` for one element
/// (the `#xpointer(...)` forms keep comments). The result is UTF-8 with an
/// XML declaration, whatever the input encoding was.
pub fn sign(
    xml: &[u8],
    pkcs12: &[u8],
    passphrase: &str,
    target_uri: &str,
    options: &SignOptions,
) -> Result<Vec<u8>> {
    let document = XmlDocument::parse_bytes(xml)?.with_id_attrs(&options.id_attrs);
    tracing::debug!(chars = document.text().len(), "document parsed");

    let key = xades_keys::load_pkcs12(pkcs12, passphrase)?;
    tracing::debug!(chain = key.chain().len(), "key material loaded");

    sign_document(&document, &key, target_uri, options)
}

/// Sign an already parsed document with already loaded key material.
pub fn sign_document(
    document: &XmlDocument,
    key: &KeyMaterial,
    target_uri: &str,
    options: &SignOptions,
) -> Result<Vec<u8>> {
    let signed = SignatureAssembler::new(document, key, options).sign(target_uri)?;
    Ok(with_declaration(&signed))
}

fn with_declaration(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(XML_DECLARATION.len() + 1 + text.len());
    out.extend_from_slice(XML_DECLARATION.as_bytes());
    if !text.starts_with(['\n', '\r']) {
        out.push(b'\n');
    }
    out.extend_from_slice(text.as_bytes());
    out
}
