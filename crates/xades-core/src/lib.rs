#![forbid(unsafe_code)]

//! Core types shared by every crate of the XAdES signing workspace.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
