#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use xades_c14n::C14nMode;
use xades_core::{algorithm, Error};
use xades_xml::NodeSet;

/// Data flowing through the transform pipeline.
pub enum TransformData<'a> {
    /// A node set over a parsed document.
    Xml {
        doc: &'a roxmltree::Document<'a>,
        node_set: NodeSet,
    },
    /// Octets produced by a canonicalization.
    Binary(Vec<u8>),
}

impl<'a> TransformData<'a> {
    /// Convert to octets.
    ///
    /// A node set left over after the last transform is serialized with
    /// Exclusive C14N. Comments are written only when the node set kept
    /// them, i.e. for `#xpointer(...)` references.
    pub fn into_binary(self) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data),
            TransformData::Xml { doc, node_set } => xades_c14n::canonicalize_doc(
                doc,
                C14nMode::ExclusiveWithComments,
                Some(&node_set),
                &[],
            ),
        }
    }
}

/// Trait for individual transforms.
pub trait Transform: Send {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Execute the transform on the given data.
    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error>;
}

/// A pipeline of transforms executed in sequence.
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Add a transform to the pipeline.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let mut data = input;
        for transform in &self.transforms {
            data = transform.execute(data)?;
        }
        Ok(data)
    }

    /// Execute all transforms and convert the result to octets.
    pub fn apply<'a>(
        &self,
        doc: &'a roxmltree::Document<'a>,
        node_set: NodeSet,
    ) -> Result<Vec<u8>, Error> {
        self.execute(TransformData::Xml { doc, node_set })?.into_binary()
    }

    /// Algorithm URIs in pipeline order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(|t| t.uri())
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

// ── C14N Transform ───────────────────────────────────────────────────

/// An Exclusive C14N transform.
pub struct C14nTransform {
    mode: C14nMode,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(mode: C14nMode, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            mode,
            inclusive_prefixes,
        }
    }
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.mode.uri()
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let bytes = match input {
            TransformData::Xml { doc, node_set } => xades_c14n::canonicalize_doc(
                doc,
                self.mode,
                Some(&node_set),
                &self.inclusive_prefixes,
            )?,
            TransformData::Binary(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| Error::MalformedInput(format!("invalid UTF-8: {e}")))?;
                xades_c14n::canonicalize(text, self.mode, None, &self.inclusive_prefixes)?
            }
        };
        Ok(TransformData::Binary(bytes))
    }
}

/// Build the transform named by `uri`.
///
/// `signature` is the `ds:Signature` element the reference lives in; the
/// enveloped-signature transform removes it.
pub fn transform_from_uri(
    uri: &str,
    signature: roxmltree::NodeId,
) -> Result<Box<dyn Transform>, Error> {
    match uri {
        algorithm::ENVELOPED_SIGNATURE => Ok(Box::new(
            crate::enveloped::EnvelopedSignatureTransform::new(signature),
        )),
        algorithm::EXC_C14N => Ok(Box::new(C14nTransform::new(C14nMode::Exclusive, Vec::new()))),
        algorithm::EXC_C14N_WITH_COMMENTS => Ok(Box::new(C14nTransform::new(
            C14nMode::ExclusiveWithComments,
            Vec::new(),
        ))),
        other => Err(Error::UnsupportedTransform(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_root_id(doc: &roxmltree::Document<'_>) -> roxmltree::NodeId {
        doc.root_element().id()
    }

    #[test]
    fn test_unknown_transform() {
        let doc = roxmltree::Document::parse("<r/>").unwrap();
        let err = transform_from_uri("http://www.w3.org/TR/1999/REC-xpath-19991116", doc_root_id(&doc))
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnsupportedTransform(_)));
    }

    #[test]
    fn test_empty_pipeline_canonicalizes_node_set() {
        let doc = roxmltree::Document::parse("<r b=\"2\"   a=\"1\"><!--c--><x/></r>").unwrap();
        let pipeline = TransformPipeline::new();
        let out = pipeline.apply(&doc, NodeSet::all_without_comments(&doc)).unwrap();
        assert_eq!(out, b"<r a=\"1\" b=\"2\"><x></x></r>");
        let out = pipeline.apply(&doc, NodeSet::all(&doc)).unwrap();
        assert_eq!(out, b"<r a=\"1\" b=\"2\"><!--c--><x></x></r>");
    }

    #[test]
    fn test_explicit_c14n_drops_comments() {
        let doc = roxmltree::Document::parse("<r><!--c--><x/></r>").unwrap();
        let mut pipeline = TransformPipeline::new();
        pipeline.push(transform_from_uri(algorithm::EXC_C14N, doc_root_id(&doc)).unwrap());
        let out = pipeline.apply(&doc, NodeSet::all(&doc)).unwrap();
        assert_eq!(out, b"<r><x></x></r>");
        assert_eq!(pipeline.uris().collect::<Vec<_>>(), vec![algorithm::EXC_C14N]);
    }

    #[test]
    fn test_c14n_of_binary_input() {
        let t = C14nTransform::new(C14nMode::Exclusive, Vec::new());
        let out = t
            .execute(TransformData::Binary(b"<a  z=\"1\" y='2'/>".to_vec()))
            .unwrap()
            .into_binary()
            .unwrap();
        assert_eq!(out, b"<a y=\"2\" z=\"1\"></a>");
    }
}
