#![forbid(unsafe_code)]

//! Typed element builder for generated signature markup.
//!
//! Elements are rendered compactly with explicit end tags and C14N escaping,
//! so a built subtree whose namespace declarations and attributes are added
//! in canonical order renders byte-identical to its canonical form.

use crate::escape;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Element(Element),
    Text(String),
}

/// An element under construction: qualified name, attributes (namespace
/// declarations included, in insertion order) and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    qname: String,
    attrs: Vec<(String, String)>,
    children: Vec<Content>,
}

impl Element {
    /// Create `prefix:local`, or just `local` when `prefix` is empty.
    pub fn new(prefix: &str, local: &str) -> Self {
        let qname = if prefix.is_empty() {
            local.to_owned()
        } else {
            format!("{prefix}:{local}")
        };
        Self {
            qname,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Declare `xmlns:prefix="uri"` (or `xmlns="uri"` for an empty prefix).
    pub fn ns(mut self, prefix: &str, uri: &str) -> Self {
        let name = if prefix.is_empty() {
            "xmlns".to_owned()
        } else {
            format!("xmlns:{prefix}")
        };
        self.attrs.push((name, uri.to_owned()));
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_owned(), value.into()));
        self
    }

    /// Add the attribute only when `value` is `Some`.
    pub fn attr_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.attr(name, v),
            None => self,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Content::Text(text.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Content::Element(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children
            .extend(children.into_iter().map(Content::Element));
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Content::Element(child));
    }

    pub fn render(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.qname);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape::push_attr(out, value);
            out.push('"');
        }
        out.push('>');
        for child in &self.children {
            match child {
                Content::Element(e) => e.render(out),
                Content::Text(t) => escape::push_text(out, t),
            }
        }
        out.push_str("</");
        out.push_str(&self.qname);
        out.push('>');
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nested() {
        let e = Element::new("ds", "Reference")
            .ns("ds", "http://www.w3.org/2000/09/xmldsig#")
            .attr("URI", "#a")
            .child(Element::new("ds", "DigestValue").text("AAAA"));
        assert_eq!(
            e.to_xml(),
            "<ds:Reference xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\" URI=\"#a\">\
             <ds:DigestValue>AAAA</ds:DigestValue></ds:Reference>"
        );
    }

    #[test]
    fn test_empty_element_has_end_tag() {
        assert_eq!(Element::new("", "a").to_xml(), "<a></a>");
    }

    #[test]
    fn test_escaping() {
        let e = Element::new("", "d")
            .attr("v", "a\"<b")
            .text("x & <y>");
        assert_eq!(e.to_xml(), "<d v=\"a&quot;&lt;b\">x &amp; &lt;y&gt;</d>");
    }

    #[test]
    fn test_attr_opt() {
        let e = Element::new("", "r").attr_opt("Id", Some("x")).attr_opt("Type", None);
        assert_eq!(e.to_xml(), "<r Id=\"x\"></r>");
    }

    #[test]
    fn test_built_markup_parses() {
        let e = Element::new("etsi", "SigningTime")
            .ns("etsi", "http://uri.etsi.org/01903/v1.3.2#")
            .text("2024-01-01T00:00:00Z");
        let xml = e.to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(doc.root_element().text(), Some("2024-01-01T00:00:00Z"));
    }
}
