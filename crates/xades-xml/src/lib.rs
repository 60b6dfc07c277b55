#![forbid(unsafe_code)]

//! XML document abstraction for the XAdES signing workspace.
//!
//! Provides input decoding, a document wrapper over `roxmltree` with Id
//! registration and text splicing, the `NodeSet` used by canonicalization
//! and transforms, and a typed builder for the signature markup.

pub mod builder;
pub mod document;
pub mod encoding;
pub mod escape;
pub mod nodeset;
pub mod xpath;

pub use builder::Element;
pub use document::XmlDocument;
pub use nodeset::NodeSet;

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree never fetches external entities, so an internal subset is
/// harmless and common in real-world input.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse `text` with [`parsing_options`], mapping failures to `MalformedInput`.
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, xades_core::Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| xades_core::Error::MalformedInput(format!("XML parse error: {e}")))
}
