#![forbid(unsafe_code)]

//! Fresh `id-<uuid4>` identifiers for the signature's elements.

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use std::collections::HashSet;
use xades_core::Error;

/// Ids of the elements a signature refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureIds {
    pub signature: String,
    pub signed_properties: String,
    pub key_info: String,
    pub qualifying_properties: String,
    /// `Id` of the payload reference.
    pub reference: String,
}

/// Id source: OS randomness, or a seeded generator for reproducible output.
pub struct IdAllocator {
    rng: Box<dyn RngCore>,
}

impl IdAllocator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng: Box<dyn RngCore> = match seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(OsRng),
        };
        Self { rng }
    }

    /// A fresh `id-<uuid4>`.
    pub fn fresh(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        format!("id-{}", uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Allocate the signature Ids, avoiding every Id in `existing`.
    ///
    /// `reference` names the payload reference instead of a fresh Id.
    pub fn allocate(
        &mut self,
        existing: &HashSet<String>,
        reference: Option<&str>,
    ) -> Result<SignatureIds, Error> {
        let ids = SignatureIds {
            signature: self.fresh(),
            signed_properties: self.fresh(),
            key_info: self.fresh(),
            qualifying_properties: self.fresh(),
            reference: match reference {
                Some(r) => r.to_owned(),
                None => self.fresh(),
            },
        };

        let mut seen = HashSet::new();
        for id in [
            &ids.signature,
            &ids.signed_properties,
            &ids.key_info,
            &ids.qualifying_properties,
            &ids.reference,
        ] {
            if existing.contains(id) || !seen.insert(id) {
                return Err(Error::InternalInconsistency(format!(
                    "Id collision: {id}"
                )));
            }
        }
        Ok(ids)
    }
}
