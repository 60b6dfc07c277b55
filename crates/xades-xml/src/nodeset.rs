#![forbid(unsafe_code)]

//! NodeSet type for canonicalization and transforms.
//!
//! A `NodeSet` is the XPath node-set a reference dereferences to: a set of
//! `roxmltree::NodeId`s. Node ids are stable across re-parses of the same
//! text, so a set computed on one parse can drive canonicalization of
//! another parse of the identical document.

use roxmltree::{Document, Node, NodeId, NodeType};
use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node of the document, comments included.
    pub fn all(doc: &Document<'_>) -> Self {
        Self {
            nodes: doc.root().descendants().map(|n| n.id()).collect(),
        }
    }

    /// Every node except comments (the `URI=""` node-set).
    pub fn all_without_comments(doc: &Document<'_>) -> Self {
        Self::tree(doc.root(), false)
    }

    /// The subtree rooted at `root` without comment nodes.
    pub fn tree_without_comments(root: Node<'_, '_>) -> Self {
        Self::tree(root, false)
    }

    /// The subtree rooted at `root` including comment nodes.
    pub fn tree_with_comments(root: Node<'_, '_>) -> Self {
        Self::tree(root, true)
    }

    fn tree(root: Node<'_, '_>, include_comments: bool) -> Self {
        let nodes = root
            .descendants()
            .filter(|n| include_comments || n.node_type() != NodeType::Comment)
            .map(|n| n.id())
            .collect();
        Self { nodes }
    }

    pub fn contains(&self, node: &Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    /// Remove `root` and all its descendants.
    pub fn remove_subtree(&mut self, root: Node<'_, '_>) {
        for n in root.descendants() {
            self.nodes.remove(&n.id());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_empty_drops_comments() {
        let doc = Document::parse("<a><!--c--><b/></a>").unwrap();
        let all = NodeSet::all(&doc);
        let no_comments = NodeSet::all_without_comments(&doc);
        assert_eq!(all.len(), no_comments.len() + 1);
        let comment = doc.descendants().find(|n| n.is_comment()).unwrap();
        assert!(all.contains(&comment));
        assert!(!no_comments.contains(&comment));
    }

    #[test]
    fn test_remove_subtree() {
        let doc = Document::parse("<a><b><c/>t</b><d/></a>").unwrap();
        let mut set = NodeSet::all(&doc);
        let b = doc.descendants().find(|n| n.has_tag_name("b")).unwrap();
        set.remove_subtree(b);
        let d = doc.descendants().find(|n| n.has_tag_name("d")).unwrap();
        assert!(set.contains(&d));
        assert!(!set.contains(&b));
        assert!(b.descendants().all(|n| !set.contains(&n)));
    }

    #[test]
    fn test_ids_survive_reparse() {
        let text = "<a><b/><c/></a>";
        let first = Document::parse(text).unwrap();
        let c = first.descendants().find(|n| n.has_tag_name("c")).unwrap();
        let set = NodeSet::tree_with_comments(c);
        let second = Document::parse(text).unwrap();
        let c2 = second.descendants().find(|n| n.has_tag_name("c")).unwrap();
        assert!(set.contains(&c2));
        assert_eq!(set.len(), 1);
    }
}
