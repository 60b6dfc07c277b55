#![forbid(unsafe_code)]

//! Exclusive XML Canonicalization 1.0 for the XAdES signing workspace.
//!
//! Both variants are supported:
//! - `http://www.w3.org/2001/10/xml-exc-c14n#`
//! - `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`

pub mod exclusive;
pub mod render;

use xades_core::{algorithm, Error};
use xades_xml::NodeSet;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    /// Like [`C14nMode::from_uri`] but rejecting unknown URIs with
    /// `UnsupportedAlgorithm`.
    pub fn require(uri: &str) -> Result<Self, Error> {
        Self::from_uri(uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("canonicalization: {uri}")))
    }

    pub fn with_comments(&self) -> bool {
        matches!(self, Self::ExclusiveWithComments)
    }
}

/// Canonicalize an XML document given as text.
///
/// - `xml`: the raw XML text
/// - `mode`: which C14N variant to use
/// - `node_set`: optional node set (for document-subset canonicalization)
/// - `inclusive_prefixes`: the InclusiveNamespaces PrefixList
pub fn canonicalize(
    xml: &str,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = xades_xml::parse(xml)?;
    canonicalize_doc(&doc, mode, node_set, inclusive_prefixes)
}

/// Canonicalize a pre-parsed document.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes)
}

/// Canonicalize the subtree rooted at `element`.
pub fn canonicalize_subtree(
    doc: &roxmltree::Document<'_>,
    element: roxmltree::Node<'_, '_>,
    mode: C14nMode,
) -> Result<Vec<u8>, Error> {
    let node_set = if mode.with_comments() {
        NodeSet::tree_with_comments(element)
    } else {
        NodeSet::tree_without_comments(element)
    };
    canonicalize_doc(doc, mode, Some(&node_set), &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_uris() {
        for mode in [C14nMode::Exclusive, C14nMode::ExclusiveWithComments] {
            assert_eq!(C14nMode::from_uri(mode.uri()), Some(mode));
        }
        assert!(C14nMode::from_uri("http://www.w3.org/TR/2001/REC-xml-c14n-20010315").is_none());
        assert!(matches!(
            C14nMode::require("urn:nope"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_subtree_drops_comments_unless_asked() {
        let xml = "<r><a><!--c-->x</a></r>";
        let doc = roxmltree::Document::parse(xml).unwrap();
        let a = doc.descendants().find(|n| n.has_tag_name("a")).unwrap();
        let plain = canonicalize_subtree(&doc, a, C14nMode::Exclusive).unwrap();
        assert_eq!(plain, b"<a>x</a>");
        let commented = canonicalize_subtree(&doc, a, C14nMode::ExclusiveWithComments).unwrap();
        assert_eq!(commented, b"<a><!--c-->x</a>");
    }
}
