#![forbid(unsafe_code)]

//! Reference processing for XML-DSig: URI dereferencing and the transform
//! chain applied before digesting.
//!
//! Supported transforms: enveloped-signature and Exclusive C14N (with and
//! without comments).

pub mod enveloped;
pub mod pipeline;
pub mod uri;

pub use pipeline::{transform_from_uri, Transform, TransformData, TransformPipeline};
pub use uri::resolve_uri;
