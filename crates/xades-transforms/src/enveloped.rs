#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Removes the enclosing `<Signature>` element from the node set.

use crate::pipeline::{Transform, TransformData};
use xades_core::{algorithm, Error};

/// Removes the `<Signature>` element and its descendants from the node set.
pub struct EnvelopedSignatureTransform {
    signature: roxmltree::NodeId,
}

impl EnvelopedSignatureTransform {
    pub fn new(signature: roxmltree::NodeId) -> Self {
        Self { signature }
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        match input {
            TransformData::Xml { doc, mut node_set } => {
                let signature = doc.get_node(self.signature).ok_or_else(|| {
                    Error::InternalInconsistency("enveloped signature node not found".into())
                })?;
                node_set.remove_subtree(signature);
                Ok(TransformData::Xml { doc, node_set })
            }
            TransformData::Binary(_) => Err(Error::UnsupportedTransform(
                "enveloped-signature transform requires a node set, not octets".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xades_xml::NodeSet;

    #[test]
    fn test_removes_signature_subtree() {
        let doc = roxmltree::Document::parse("<r><p>x</p><Signature><s/></Signature></r>").unwrap();
        let sig = doc.descendants().find(|n| n.has_tag_name("Signature")).unwrap();
        let t = EnvelopedSignatureTransform::new(sig.id());
        let out = t
            .execute(TransformData::Xml {
                doc: &doc,
                node_set: NodeSet::all_without_comments(&doc),
            })
            .unwrap()
            .into_binary()
            .unwrap();
        assert_eq!(out, b"<r><p>x</p></r>");
    }

    #[test]
    fn test_rejects_octets() {
        let doc = roxmltree::Document::parse("<r/>").unwrap();
        let t = EnvelopedSignatureTransform::new(doc.root_element().id());
        assert!(matches!(
            t.execute(TransformData::Binary(Vec::new())),
            Err(Error::UnsupportedTransform(_))
        ));
    }
}
