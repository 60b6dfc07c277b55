#![forbid(unsafe_code)]

//! Enveloped XAdES-BES signature assembly.
//!
//! The caller's text is never re-serialized. The `ds:Signature` markup is
//! rendered with the element builder and spliced in front of the root end
//! tag; each pass re-parses the spliced text so digests and the
//! `SignedInfo` canonical form are computed on exactly the bytes that are
//! returned.

use base64::Engine;
use chrono::Utc;
use xades_c14n::C14nMode;
use xades_core::{algorithm, ns, Error};
use xades_keys::{CertInfo, KeyMaterial};
use xades_xml::xpath::{self, ReferenceTarget};
use xades_xml::{Element, XmlDocument};

use crate::context::{DataObjectFormat, SignOptions};
use crate::ids::{IdAllocator, SignatureIds};
use crate::properties::{ds, QualifyingPropertiesBuilder};
use crate::signed_info::{ReferenceSpec, SignedInfoBuilder};

/// Assembles one enveloped signature over a document.
pub struct SignatureAssembler<'a> {
    document: &'a XmlDocument,
    key: &'a KeyMaterial,
    options: &'a SignOptions,
}

impl<'a> SignatureAssembler<'a> {
    pub fn new(document: &'a XmlDocument, key: &'a KeyMaterial, options: &'a SignOptions) -> Self {
        Self {
            document,
            key,
            options,
        }
    }

    /// Sign the reference `target_uri` and return the signed document text
    /// (without XML declaration).
    pub fn sign(&self, target_uri: &str) -> Result<String, Error> {
        let opts = self.options;
        // Reject bad input before any Id or crypto work.
        let target = xpath::parse_reference_uri(target_uri)?;
        if let ReferenceTarget::Element { id, .. } = &target {
            self.document.require_unique_id(id)?;
        }
        xades_crypto::digest::check_uri(&opts.digest_algorithm)?;
        let mut signed_info =
            SignedInfoBuilder::new(&opts.canonicalization_algorithm, &opts.signature_algorithm)?;
        let c14n_mode = C14nMode::require(&opts.canonicalization_algorithm)?;
        let (reference_name, format) = self.payload_metadata()?;

        let existing = self.document.id_values()?;
        let ids = IdAllocator::new(opts.id_seed).allocate(&existing, reference_name)?;
        tracing::debug!(signature = %ids.signature, "ids allocated");

        // References: SignedProperties, KeyInfo, payload.
        let explicit_c14n = |r: ReferenceSpec, with_comments: bool| {
            if opts.explicit_c14n_transform {
                let uri = if with_comments {
                    algorithm::EXC_C14N_WITH_COMMENTS
                } else {
                    algorithm::EXC_C14N
                };
                r.with_transform(uri)
            } else {
                r
            }
        };
        signed_info = signed_info.reference(explicit_c14n(
            ReferenceSpec::new(format!("#{}", ids.signed_properties), &opts.digest_algorithm)
                .with_type(algorithm::XADES_SIGNED_PROPERTIES),
            false,
        ));
        if opts.key_info_reference {
            signed_info = signed_info.reference(explicit_c14n(
                ReferenceSpec::new(format!("#{}", ids.key_info), &opts.digest_algorithm),
                false,
            ));
        }
        let mut payload = ReferenceSpec::new(target_uri, &opts.digest_algorithm)
            .with_id(ids.reference.as_str())
            .with_transform(algorithm::ENVELOPED_SIGNATURE);
        for uri in &opts.extra_transforms {
            payload = payload.with_transform(uri.as_str());
        }
        signed_info = signed_info.reference(explicit_c14n(payload, target.with_comments()));

        let key_info = self.key_info(&ids)?;
        let object = self.object(&ids, format)?;

        // Skeleton with empty digests, then digest every reference on it.
        let skeleton = self.splice(&ids, &signed_info, "", &key_info, &object)?;
        tracing::debug!(bytes = skeleton.len(), "skeleton placed");
        {
            let spliced = self.reparse(skeleton)?;
            let doc = spliced.parse_doc()?;
            let id_map = spliced.build_id_map(&doc);
            let signature = xpath::resolve_id(&doc, &id_map, &ids.signature)
                .map_err(|e| Error::InternalInconsistency(format!("signature not found: {e}")))?
                .id();
            for reference in signed_info.references_mut() {
                let digest = reference.compute_digest(&doc, &id_map, signature)?;
                reference.digest_value = Some(digest);
            }
        }
        tracing::debug!(references = signed_info.references().len(), "references digested");

        // Canonicalize SignedInfo in place and sign it.
        let digested = self.splice(&ids, &signed_info, "", &key_info, &object)?;
        let signature_value = {
            let spliced = self.reparse(digested)?;
            let doc = spliced.parse_doc()?;
            let id_map = spliced.build_id_map(&doc);
            let signature = xpath::resolve_id(&doc, &id_map, &ids.signature)
                .map_err(|e| Error::InternalInconsistency(format!("signature not found: {e}")))?;
            let si = xades_xml::document::find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO)
                .ok_or_else(|| Error::InternalInconsistency("SignedInfo not found".into()))?;
            let canonical = xades_c14n::canonicalize_subtree(&doc, si, c14n_mode)?;
            tracing::trace!(octets = canonical.len(), "canonicalized SignedInfo");
            self.key.sign(signed_info.signature_uri(), &canonical)?
        };
        tracing::debug!("SignedInfo signed");

        let b64 = base64::engine::general_purpose::STANDARD.encode(signature_value);
        let signed = self.splice(&ids, &signed_info, &b64, &key_info, &object)?;
        self.check(&signed, &ids)?;
        tracing::debug!(bytes = signed.len(), "serialized");
        Ok(signed)
    }

    /// The payload reference name and its DataObjectFormat, if any.
    fn payload_metadata(&self) -> Result<(Option<&'a str>, Option<&'a DataObjectFormat>), Error> {
        let opts: &'a SignOptions = self.options;
        let metadata = &opts.references_metadata;
        if metadata.len() > 1 {
            return Err(Error::MalformedInput(format!(
                "metadata supplied for {} references; only the payload reference can be described",
                metadata.len()
            )));
        }
        Ok(match metadata.iter().next() {
            Some((name, format)) => {
                // The name becomes Reference/@Id and the ObjectReference fragment.
                if !xpath::is_ncname(name) {
                    return Err(Error::MalformedInput(format!(
                        "reference name {name:?} is not a valid Id"
                    )));
                }
                (Some(name.as_str()), Some(format))
            }
            None => (None, None),
        })
    }

    fn key_info(&self, ids: &SignatureIds) -> Result<Element, Error> {
        let engine = base64::engine::general_purpose::STANDARD;
        let signer = self.key.signer();

        let mut x509_data =
            ds(ns::node::X509_DATA).child(ds(ns::node::X509_CERTIFICATE).text(engine.encode(signer.der())));
        if self.options.include_chain {
            for cert in self.key.chain() {
                x509_data.push(ds(ns::node::X509_CERTIFICATE).text(engine.encode(cert.der())));
            }
        }
        x509_data.push(
            ds(ns::node::X509_ISSUER_SERIAL)
                .child(ds(ns::node::X509_ISSUER_NAME).text(signer.issuer_dn()?))
                .child(ds(ns::node::X509_SERIAL_NUMBER).text(signer.serial_decimal())),
        );

        let key_value = ds(ns::node::KEY_VALUE).child(
            ds(ns::node::RSA_KEY_VALUE)
                .child(ds(ns::node::RSA_MODULUS).text(engine.encode(self.key.modulus())))
                .child(ds(ns::node::RSA_EXPONENT).text(engine.encode(self.key.exponent()))),
        );

        Ok(ds(ns::node::KEY_INFO)
            .attr(ns::attr::ID, ids.key_info.as_str())
            .child(x509_data)
            .child(key_value))
    }

    fn object(&self, ids: &SignatureIds, format: Option<&DataObjectFormat>) -> Result<Element, Error> {
        let signing_time = self.options.signing_time.unwrap_or_else(Utc::now);
        let mut properties =
            QualifyingPropertiesBuilder::new(ids, signing_time, &self.options.digest_algorithm);
        for cert in attested_certificates(self.key, self.options) {
            properties = properties.attest(cert);
        }
        if let Some(format) = format {
            properties = properties.data_object_format(format);
        }
        Ok(ds(ns::node::OBJECT).child(properties.build()?))
    }

    /// Render the signature and splice it into the caller's document.
    fn splice(
        &self,
        ids: &SignatureIds,
        signed_info: &SignedInfoBuilder,
        signature_value: &str,
        key_info: &Element,
        object: &Element,
    ) -> Result<String, Error> {
        let signature = ds(ns::node::SIGNATURE)
            .ns(ns::DSIG_PREFIX, ns::DSIG)
            .ns(ns::XADES_PREFIX, ns::XADES)
            .attr(ns::attr::ID, ids.signature.as_str())
            .child(signed_info.build())
            .child(ds(ns::node::SIGNATURE_VALUE).text(signature_value))
            .child(key_info.clone())
            .child(object.clone());
        self.document.insert_as_last_child(&signature.to_xml())
    }

    /// The result must stay well-formed and keep every Id resolvable.
    fn check(&self, signed: &str, ids: &SignatureIds) -> Result<(), Error> {
        let doc = xades_xml::parse(signed)
            .map_err(|e| Error::InternalInconsistency(format!("assembled document: {e}")))?;
        for id in [&ids.signature, &ids.signed_properties, &ids.key_info, &ids.qualifying_properties] {
            let found = doc
                .descendants()
                .filter(|n| n.is_element())
                .filter(|n| n.attribute(ns::attr::ID) == Some(id.as_str()))
                .count();
            if found != 1 {
                return Err(Error::InternalInconsistency(format!(
                    "Id {id} resolves to {found} elements"
                )));
            }
        }
        Ok(())
    }

    fn reparse(&self, text: String) -> Result<XmlDocument, Error> {
        XmlDocument::parse(text)
            .map(|d| d.with_id_attrs(&self.options.id_attrs))
            .map_err(|e| Error::InternalInconsistency(format!("assembled document: {e}")))
    }
}

/// Certificates attested in `SigningCertificate` for `key` under `options`.
pub fn attested_certificates<'k>(key: &'k KeyMaterial, options: &SignOptions) -> Vec<&'k CertInfo> {
    let mut certs = vec![key.signer()];
    if options.attest_chain {
        certs.extend(key.chain().iter().filter(|c| c.is_ca()));
    }
    certs
}
