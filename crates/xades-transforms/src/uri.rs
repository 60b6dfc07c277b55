#![forbid(unsafe_code)]

//! URI dereferencing for XML-DSig references.

use std::collections::HashMap;
use xades_core::Error;
use xades_xml::xpath::{self, ReferenceTarget};
use xades_xml::NodeSet;

/// Dereference a same-document URI to the node set it selects.
pub fn resolve_uri(
    uri: &str,
    doc: &roxmltree::Document<'_>,
    id_map: &HashMap<String, roxmltree::NodeId>,
) -> Result<NodeSet, Error> {
    match xpath::parse_reference_uri(uri)? {
        ReferenceTarget::Document { with_comments: false } => Ok(NodeSet::all_without_comments(doc)),
        ReferenceTarget::Document { with_comments: true } => Ok(NodeSet::all(doc)),
        ReferenceTarget::Element { id, with_comments } => {
            let node = xpath::resolve_id(doc, id_map, id)?;
            Ok(if with_comments {
                NodeSet::tree_with_comments(node)
            } else {
                NodeSet::tree_without_comments(node)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_map(doc: &roxmltree::Document<'_>) -> HashMap<String, roxmltree::NodeId> {
        doc.descendants()
            .filter_map(|n| n.attribute("Id").map(|v| (v.to_owned(), n.id())))
            .collect()
    }

    #[test]
    fn test_resolve_forms() {
        let doc = roxmltree::Document::parse("<r><!--top--><a Id=\"A\"><!--in--><b/></a></r>").unwrap();
        let map = id_map(&doc);

        let whole = resolve_uri("", &doc, &map).unwrap();
        assert!(doc.descendants().filter(|n| n.is_comment()).all(|n| !whole.contains(&n)));

        let whole_with = resolve_uri("#xpointer(/)", &doc, &map).unwrap();
        assert_eq!(whole_with.len(), NodeSet::all(&doc).len());

        let a = resolve_uri("#A", &doc, &map).unwrap();
        assert_eq!(a.len(), 2);
        let a_with = resolve_uri("#xpointer(id('A'))", &doc, &map).unwrap();
        assert_eq!(a_with.len(), 3);
    }

    #[test]
    fn test_unresolved_and_external() {
        let doc = roxmltree::Document::parse("<r/>").unwrap();
        let map = id_map(&doc);
        assert!(matches!(resolve_uri("#missing", &doc, &map), Err(Error::MalformedInput(_))));
        assert!(matches!(
            resolve_uri("http://example.com/doc.xml", &doc, &map),
            Err(Error::MalformedInput(_))
        ));
    }
}
