#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output. A namespace is
//! visibly utilized by an element if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList.
//!
//! A declaration is emitted only when it differs from the one rendered by
//! the nearest output ancestor.

use crate::render::{Attr, NsDecl};
use roxmltree::{Document, Node, NodeType};
use std::collections::{BTreeMap, HashSet};
use xades_core::Error;
use xades_xml::document::{source_attr_qname, source_qname};
use xades_xml::{escape, NodeSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let mut output = String::new();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output.into_bytes())
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    /// PrefixList entries, `#default` mapped to "".
    inclusive_prefixes: HashSet<String>,
}

impl<'a> ExcC14nContext<'a> {
    fn is_visible(&self, node: &Node<'_, '_>) -> bool {
        match self.node_set {
            None => true,
            Some(ns) => ns.contains(node),
        }
    }

    fn process_node(
        &self,
        node: Node<'_, '_>,
        output: &mut String,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns);
                }
            }
            NodeType::Element => self.process_element(node, output, rendered_ns),
            NodeType::Text => {
                if self.is_visible(&node) {
                    escape::push_text(output, node.text().unwrap_or(""));
                }
            }
            NodeType::Comment => {
                if self.with_comments && self.is_visible(&node) {
                    self.around_document_level(node, output, |out| {
                        out.push_str("<!--");
                        out.push_str(node.text().unwrap_or(""));
                        out.push_str("-->");
                    });
                }
            }
            NodeType::PI => {
                if let (true, Some(pi)) = (self.is_visible(&node), node.pi()) {
                    self.around_document_level(node, output, |out| {
                        out.push_str("<?");
                        out.push_str(pi.target);
                        if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                            out.push(' ');
                            out.push_str(&escape::escape_pi(value));
                        }
                        out.push_str("?>");
                    });
                }
            }
        }
    }

    /// Comments and PIs outside the document element are separated from it
    /// by a line feed.
    fn around_document_level(
        &self,
        node: Node<'_, '_>,
        output: &mut String,
        render: impl FnOnce(&mut String),
    ) {
        let parent_is_root = node
            .parent()
            .is_some_and(|p| p.node_type() == NodeType::Root);
        if parent_is_root && node.prev_siblings().any(|s| s.is_element()) {
            output.push('\n');
        }
        render(output);
        if parent_is_root && node.next_siblings().any(|s| s.is_element()) {
            output.push('\n');
        }
    }

    fn process_element(
        &self,
        node: Node<'_, '_>,
        output: &mut String,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            // Invisible elements contribute nothing themselves; their
            // visible descendants see the same output ancestor.
            for child in node.children() {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }

        let elem_name = source_qname(node);
        let inscope_ns = collect_inscope_namespaces(node);

        // Visibly utilized prefixes: tag name, attributes, PrefixList.
        let mut utilized: HashSet<String> = self.inclusive_prefixes.clone();
        utilized.insert(qname_prefix(elem_name).to_owned());

        let mut attrs: Vec<Attr> = Vec::new();
        for attr in node.attributes() {
            let ns_uri = attr.namespace().unwrap_or("");
            // Keep the prefix the author wrote: several prefixes may be
            // bound to the same URI.
            let qualified_name = source_attr_qname(node, &attr);
            if !ns_uri.is_empty() {
                utilized.insert(qname_prefix(qualified_name).to_owned());
            }
            attrs.push(Attr {
                ns_uri: ns_uri.to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name: qualified_name.to_owned(),
                value: attr.value().to_owned(),
            });
        }
        attrs.sort();

        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            if prefix == "xml" {
                continue;
            }
            match inscope_ns.get(prefix) {
                Some(uri) => {
                    if rendered_ns.get(prefix) != Some(uri) {
                        ns_decls.push(NsDecl {
                            prefix: prefix.clone(),
                            uri: uri.clone(),
                        });
                    }
                }
                None if prefix.is_empty() => {
                    // The element is in no namespace but an output ancestor
                    // rendered a default namespace: undeclare it.
                    if rendered_ns.get("").is_some_and(|uri| !uri.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {}
            }
        }
        ns_decls.sort();

        output.push('<');
        output.push_str(elem_name);
        for decl in &ns_decls {
            decl.render_into(output);
        }
        for attr in &attrs {
            attr.render_into(output);
        }
        output.push('>');

        let mut child_rendered_ns = rendered_ns.clone();
        for decl in ns_decls {
            child_rendered_ns.insert(decl.prefix, decl.uri);
        }

        for child in node.children() {
            self.process_node(child, output, &child_rendered_ns);
        }

        output.push_str("</");
        output.push_str(elem_name);
        output.push('>');
    }
}

/// All namespaces in scope for an element, keyed by prefix ("" = default).
fn collect_inscope_namespaces(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|ns| !ns.uri().is_empty())
        .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
        .collect()
}

fn qname_prefix(qname: &str) -> &str {
    qname.split_once(':').map_or("", |(prefix, _)| prefix)
}
