#![forbid(unsafe_code)]

//! `ds:SignedInfo` and reference digesting.

use base64::Engine;
use std::collections::HashMap;
use xades_core::{ns, Error};
use xades_transforms::TransformPipeline;
use xades_xml::Element;

use crate::properties::ds;

/// One `ds:Reference` before or after digesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpec {
    pub id: Option<String>,
    pub uri: String,
    pub type_uri: Option<String>,
    pub transforms: Vec<String>,
    pub digest_uri: String,
    pub digest_value: Option<Vec<u8>>,
}

impl ReferenceSpec {
    pub fn new(uri: impl Into<String>, digest_uri: impl Into<String>) -> Self {
        Self {
            id: None,
            uri: uri.into(),
            type_uri: None,
            transforms: Vec::new(),
            digest_uri: digest_uri.into(),
            digest_value: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_type(mut self, type_uri: impl Into<String>) -> Self {
        self.type_uri = Some(type_uri.into());
        self
    }

    pub fn with_transform(mut self, uri: impl Into<String>) -> Self {
        self.transforms.push(uri.into());
        self
    }

    /// Resolve the URI in `doc`, run the transforms and digest the result.
    ///
    /// `signature` is the enclosing `ds:Signature`, removed by the
    /// enveloped-signature transform.
    pub fn compute_digest(
        &self,
        doc: &roxmltree::Document<'_>,
        id_map: &HashMap<String, roxmltree::NodeId>,
        signature: roxmltree::NodeId,
    ) -> Result<Vec<u8>, Error> {
        let node_set = xades_transforms::resolve_uri(&self.uri, doc, id_map)?;
        let mut pipeline = TransformPipeline::new();
        for uri in &self.transforms {
            pipeline.push(xades_transforms::transform_from_uri(uri, signature)?);
        }
        let octets = pipeline.apply(doc, node_set)?;
        let digest = xades_crypto::digest::digest(&self.digest_uri, &octets)?;
        tracing::trace!(
            uri = %self.uri,
            octets = octets.len(),
            digest = %base64::engine::general_purpose::STANDARD.encode(&digest),
            "digested reference"
        );
        Ok(digest)
    }

    fn to_element(&self) -> Element {
        let mut reference = ds(ns::node::REFERENCE)
            .attr_opt(ns::attr::ID, self.id.as_deref())
            .attr(ns::attr::URI, self.uri.as_str())
            .attr_opt(ns::attr::TYPE, self.type_uri.as_deref());

        if !self.transforms.is_empty() {
            reference.push(ds(ns::node::TRANSFORMS).children(
                self.transforms
                    .iter()
                    .map(|uri| ds(ns::node::TRANSFORM).attr(ns::attr::ALGORITHM, uri.as_str())),
            ));
        }

        let digest_value = self
            .digest_value
            .as_ref()
            .map(|d| base64::engine::general_purpose::STANDARD.encode(d))
            .unwrap_or_default();

        reference
            .child(ds(ns::node::DIGEST_METHOD).attr(ns::attr::ALGORITHM, self.digest_uri.as_str()))
            .child(ds(ns::node::DIGEST_VALUE).text(digest_value))
    }
}

/// Builds `ds:SignedInfo`.
#[derive(Debug, Clone)]
pub struct SignedInfoBuilder {
    c14n_uri: String,
    signature_uri: String,
    references: Vec<ReferenceSpec>,
}

impl SignedInfoBuilder {
    /// Both algorithms are checked up front so a bad URI fails before any
    /// work is done.
    pub fn new(c14n_uri: &str, signature_uri: &str) -> Result<Self, Error> {
        xades_c14n::C14nMode::require(c14n_uri)?;
        xades_crypto::sign::from_uri(signature_uri)?;
        Ok(Self {
            c14n_uri: c14n_uri.to_owned(),
            signature_uri: signature_uri.to_owned(),
            references: Vec::new(),
        })
    }

    pub fn reference(mut self, reference: ReferenceSpec) -> Self {
        self.references.push(reference);
        self
    }

    pub fn references(&self) -> &[ReferenceSpec] {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut [ReferenceSpec] {
        &mut self.references
    }

    pub fn c14n_uri(&self) -> &str {
        &self.c14n_uri
    }

    pub fn signature_uri(&self) -> &str {
        &self.signature_uri
    }

    pub fn build(&self) -> Element {
        ds(ns::node::SIGNED_INFO)
            .child(ds(ns::node::CANONICALIZATION_METHOD).attr(ns::attr::ALGORITHM, self.c14n_uri.as_str()))
            .child(ds(ns::node::SIGNATURE_METHOD).attr(ns::attr::ALGORITHM, self.signature_uri.as_str()))
            .children(self.references.iter().map(ReferenceSpec::to_element))
    }
}
