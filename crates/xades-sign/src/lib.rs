#![forbid(unsafe_code)]

//! XAdES-BES enveloped signature production.
//!
//! [`SignatureAssembler`] drives one signing call: Id allocation, the
//! qualifying properties, reference digests, `SignedInfo` canonicalization
//! and the RSA signature.

pub mod assemble;
pub mod context;
pub mod ids;
pub mod properties;
pub mod signed_info;

pub use assemble::SignatureAssembler;
pub use context::{DataObjectFormat, SignOptions};
pub use ids::{IdAllocator, SignatureIds};
pub use properties::QualifyingPropertiesBuilder;
pub use signed_info::{ReferenceSpec, SignedInfoBuilder};
