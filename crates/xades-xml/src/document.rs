#![forbid(unsafe_code)]

//! XML document wrapper over roxmltree with Id attribute registration and
//! text splicing.
//!
//! The signer never re-serializes the caller's tree. Instead it splices the
//! signature markup into the original text just before the root end tag,
//! which keeps every byte of the payload untouched.

use std::collections::{HashMap, HashSet};
use xades_core::Error;

/// Default attribute names that carry element Ids.
pub const DEFAULT_ID_ATTRS: [&str; 3] = ["Id", "ID", "id"];

/// An owned, well-formed XML document.
///
/// To work with the parsed tree, call [`XmlDocument::parse_doc`] which
/// returns a temporary `roxmltree::Document` borrowing from the text.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    text: String,
    /// Additional ID attribute names to register (beyond `Id`, `ID`, `id`).
    extra_id_attrs: Vec<String>,
}

impl XmlDocument {
    /// Validate and take ownership of already decoded text.
    pub fn parse(text: String) -> Result<Self, Error> {
        crate::parse(&text)?;
        Ok(Self {
            text,
            extra_id_attrs: Vec::new(),
        })
    }

    /// Decode raw bytes (see [`crate::encoding`]) and validate them.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        Self::parse(crate::encoding::decode_document(data)?)
    }

    /// The document text, without XML declaration.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Register additional ID attribute names.
    pub fn with_id_attrs(mut self, names: &[String]) -> Self {
        self.extra_id_attrs.extend(names.iter().cloned());
        self
    }

    /// Parse the document and return a temporary `roxmltree::Document`.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>, Error> {
        crate::parse(&self.text)
    }

    fn id_attr_names(&self) -> impl Iterator<Item = &str> {
        DEFAULT_ID_ATTRS
            .iter()
            .copied()
            .chain(self.extra_id_attrs.iter().map(String::as_str))
    }

    /// Build the ID → NodeId mapping for a parsed document.
    ///
    /// A value carried by more than one element is ambiguous and left out,
    /// so a reference to it does not resolve.
    pub fn build_id_map(
        &self,
        doc: &roxmltree::Document<'_>,
    ) -> HashMap<String, roxmltree::NodeId> {
        let (mut map, duplicates) = self.scan_ids(doc);
        for value in &duplicates {
            map.remove(value);
        }
        map
    }

    /// Every Id value present in the document, duplicates included.
    pub fn id_values(&self) -> Result<HashSet<String>, Error> {
        let doc = self.parse_doc()?;
        Ok(self.scan_ids(&doc).0.into_keys().collect())
    }

    /// Fail with `MalformedInput` when `id` is carried by more than one
    /// element.
    pub fn require_unique_id(&self, id: &str) -> Result<(), Error> {
        let doc = self.parse_doc()?;
        if self.scan_ids(&doc).1.contains(id) {
            return Err(Error::MalformedInput(format!("duplicate ID value: {id}")));
        }
        Ok(())
    }

    /// First element per Id value, and the values seen on several elements.
    fn scan_ids(
        &self,
        doc: &roxmltree::Document<'_>,
    ) -> (HashMap<String, roxmltree::NodeId>, HashSet<String>) {
        let mut map = HashMap::new();
        let mut duplicates = HashSet::new();
        for node in doc.descendants().filter(|n| n.is_element()) {
            for attr_name in self.id_attr_names() {
                if let Some(val) = node.attribute(attr_name) {
                    let first = *map.entry(val.to_owned()).or_insert(node.id());
                    if first != node.id() {
                        duplicates.insert(val.to_owned());
                    }
                }
            }
        }
        (map, duplicates)
    }

    /// Return a copy of the text with `fragment` inserted as the last child
    /// of the root element.
    ///
    /// A self-closing root (`<root/>`) is expanded to a start/end tag pair.
    pub fn insert_as_last_child(&self, fragment: &str) -> Result<String, Error> {
        let doc = self.parse_doc()?;
        let root = doc.root_element();
        let range = root.range();
        let element_text = &self.text[range.clone()];

        let mut out = String::with_capacity(self.text.len() + fragment.len() + 32);
        if element_text.ends_with("/>") && !element_text.contains("</") {
            let qname = start_tag_qname(element_text);
            let mut head = element_text[..element_text.len() - 2].to_owned();
            while head.ends_with(|c: char| c.is_ascii_whitespace()) {
                head.pop();
            }
            out.push_str(&self.text[..range.start]);
            out.push_str(&head);
            out.push('>');
            out.push_str(fragment);
            out.push_str("</");
            out.push_str(qname);
            out.push('>');
        } else {
            let close = element_text.rfind("</").ok_or_else(|| {
                Error::MalformedInput("root element has no end tag".into())
            })?;
            let at = range.start + close;
            out.push_str(&self.text[..at]);
            out.push_str(fragment);
            out.push_str(&self.text[at..range.end]);
        }
        out.push_str(&self.text[range.end..]);
        Ok(out)
    }
}

/// Find the first child element with the given local name and namespace.
pub fn find_child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .find(|n| is_element_named(n, ns, local_name))
}

/// Find all child elements with the given local name and namespace.
pub fn find_child_elements<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| is_element_named(n, ns, local_name))
        .collect()
}

fn is_element_named(node: &roxmltree::Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// The qualified name written in a start tag, e.g. `ds:Signature` for
/// `<ds:Signature Id="x">`.
pub fn start_tag_qname(tag: &str) -> &str {
    let body = tag.strip_prefix('<').unwrap_or(tag);
    let end = body
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(body.len());
    &body[..end]
}

/// The qualified name of an element as written in the source text.
pub fn source_qname<'input>(node: roxmltree::Node<'_, 'input>) -> &'input str {
    let input = node.document().input_text();
    start_tag_qname(&input[node.range().start..])
}

/// The qualified name of one of `node`'s attributes as written in the
/// source text, e.g. `b:at` for `b:at="1"`.
pub fn source_attr_qname<'input>(
    node: roxmltree::Node<'_, 'input>,
    attr: &roxmltree::Attribute<'_, 'input>,
) -> &'input str {
    let input = node.document().input_text();
    let text = &input[attr.range()];
    let end = text
        .find(|c: char| c == '=' || c.is_ascii_whitespace())
        .unwrap_or(text.len());
    &text[..end]
}
