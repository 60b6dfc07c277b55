#![forbid(unsafe_code)]

//! Signing options: algorithms, Id handling and the XAdES knobs.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use xades_core::algorithm;

/// Description of the signed data object (`etsi:DataObjectFormat`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataObjectFormat {
    pub description: Option<String>,
    pub object_identifier: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
}

impl DataObjectFormat {
    /// True when no field carries a non-empty value.
    pub fn is_empty(&self) -> bool {
        [
            &self.description,
            &self.object_identifier,
            &self.mime_type,
            &self.encoding,
        ]
        .iter()
        .all(|f| f.as_deref().map_or(true, str::is_empty))
    }
}

/// Options for one signing call. `Default` gives exc-c14n, RSA-SHA256 and
/// SHA-256 with a `KeyInfo` reference and no chain certificates.
#[derive(Debug, Clone)]
pub struct SignOptions {
    pub digest_algorithm: String,
    pub signature_algorithm: String,
    pub canonicalization_algorithm: String,
    /// At most one entry; the key becomes the payload `Reference/@Id`.
    pub references_metadata: BTreeMap<String, DataObjectFormat>,
    /// Frozen signing time. `None` means now.
    pub signing_time: Option<DateTime<Utc>>,
    /// Seed for Id generation. `None` draws from the OS RNG.
    pub id_seed: Option<u64>,
    /// Transforms applied to the payload after enveloped-signature.
    pub extra_transforms: Vec<String>,
    /// Sign the `KeyInfo` element too.
    pub key_info_reference: bool,
    /// Attest the CA certificates of the bundle in `SigningCertificate`.
    pub attest_chain: bool,
    /// Embed the chain certificates in `X509Data`.
    pub include_chain: bool,
    /// List Exclusive C14N explicitly on every reference.
    pub explicit_c14n_transform: bool,
    /// Extra Id attribute names besides `Id`, `ID` and `id`.
    pub id_attrs: Vec<String>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            digest_algorithm: algorithm::DEFAULT_DIGEST.to_owned(),
            signature_algorithm: algorithm::DEFAULT_SIGNATURE.to_owned(),
            canonicalization_algorithm: algorithm::DEFAULT_C14N.to_owned(),
            references_metadata: BTreeMap::new(),
            signing_time: None,
            id_seed: None,
            extra_transforms: Vec::new(),
            key_info_reference: true,
            attest_chain: false,
            include_chain: false,
            explicit_c14n_transform: false,
            id_attrs: Vec::new(),
        }
    }
}

impl SignOptions {
    /// Add an ID attribute name to register during processing.
    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }

    /// Describe the payload reference, naming it `reference_id`.
    pub fn with_data_object_format(
        mut self,
        reference_id: impl Into<String>,
        format: DataObjectFormat,
    ) -> Self {
        self.references_metadata.insert(reference_id.into(), format);
        self
    }
}
