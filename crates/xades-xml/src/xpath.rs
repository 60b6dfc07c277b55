#![forbid(unsafe_code)]

//! Same-document reference URIs.
//!
//! Only the forms a signer emits are supported:
//! - `""`: the whole document without comments
//! - `#id`: the element carrying that Id, without comments
//! - `#xpointer(/)`: the whole document with comments
//! - `#xpointer(id('id'))`: the element carrying that Id, with comments

use std::collections::HashMap;
use xades_core::Error;

/// A parsed same-document reference URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget<'u> {
    Document { with_comments: bool },
    Element { id: &'u str, with_comments: bool },
}

impl<'u> ReferenceTarget<'u> {
    pub fn with_comments(&self) -> bool {
        match self {
            Self::Document { with_comments } | Self::Element { with_comments, .. } => {
                *with_comments
            }
        }
    }
}

/// Parse a reference URI into a [`ReferenceTarget`].
pub fn parse_reference_uri(uri: &str) -> Result<ReferenceTarget<'_>, Error> {
    if uri.is_empty() {
        return Ok(ReferenceTarget::Document {
            with_comments: false,
        });
    }
    let fragment = parse_same_document_ref(uri)
        .ok_or_else(|| Error::MalformedInput(format!("external URI not supported: {uri}")))?;
    if fragment == "xpointer(/)" {
        return Ok(ReferenceTarget::Document {
            with_comments: true,
        });
    }
    if let Some(id) = parse_xpointer_id(fragment) {
        return Ok(ReferenceTarget::Element {
            id,
            with_comments: true,
        });
    }
    if fragment.is_empty() || fragment.starts_with("xpointer(") || !is_ncname(fragment) {
        return Err(Error::MalformedInput(format!(
            "unsupported reference URI: {uri}"
        )));
    }
    Ok(ReferenceTarget::Element {
        id: fragment,
        with_comments: false,
    })
}

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}

/// Parse an `xpointer(id('...'))` expression and return the ID value.
pub fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id(")?;
    let inner = inner.strip_suffix("))")?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

/// Resolve an ID value in a parsed document using a pre-built ID map.
pub fn resolve_id<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    id_map: &HashMap<String, roxmltree::NodeId>,
    id: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    id_map
        .get(id)
        .and_then(|nid| doc.get_node(*nid))
        .ok_or_else(|| Error::MalformedInput(format!("ID not found: {id}")))
}

/// Loose NCName check: no colon, no whitespace, does not start with a digit.
pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            parse_reference_uri("").unwrap(),
            ReferenceTarget::Document { with_comments: false }
        );
        assert_eq!(
            parse_reference_uri("#xpointer(/)").unwrap(),
            ReferenceTarget::Document { with_comments: true }
        );
        assert_eq!(
            parse_reference_uri("#A").unwrap(),
            ReferenceTarget::Element { id: "A", with_comments: false }
        );
        assert_eq!(
            parse_reference_uri("#xpointer(id('doc-1'))").unwrap(),
            ReferenceTarget::Element { id: "doc-1", with_comments: true }
        );
    }

    #[test]
    fn test_rejects_unsupported() {
        for uri in ["http://example.com/x", "#", "#xpointer(//a)", "#a b", "#1abc"] {
            assert!(
                matches!(parse_reference_uri(uri), Err(Error::MalformedInput(_))),
                "{uri} should be rejected"
            );
        }
    }

    #[test]
    fn test_ncname() {
        assert!(is_ncname("payload-ref"));
        assert!(is_ncname("_r.1"));
        for name in ["", "a b", "#r", "1st", "p:r"] {
            assert!(!is_ncname(name), "{name}");
        }
    }

    #[test]
    fn test_resolve_missing_id() {
        let doc = roxmltree::Document::parse("<a Id=\"x\"/>").unwrap();
        let mut map = HashMap::new();
        map.insert("x".to_owned(), doc.root_element().id());
        assert!(resolve_id(&doc, &map, "x").is_ok());
        assert!(resolve_id(&doc, &map, "y").is_err());
    }
}
