#![forbid(unsafe_code)]

//! XAdES-BES qualifying properties.
//!
//! ```text
//! etsi:QualifyingProperties @Id @Target
//!   etsi:SignedProperties @Id
//!     etsi:SignedSignatureProperties
//!       etsi:SigningTime
//!       etsi:SigningCertificate / etsi:Cert+
//!     etsi:SignedDataObjectProperties?
//!       etsi:DataObjectFormat @ObjectReference
//! ```

use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use xades_core::{ns, Error};
use xades_keys::CertInfo;
use xades_xml::Element;

use crate::context::DataObjectFormat;
use crate::ids::SignatureIds;

pub(crate) fn ds(local: &str) -> Element {
    Element::new(ns::DSIG_PREFIX, local)
}

pub(crate) fn etsi(local: &str) -> Element {
    Element::new(ns::XADES_PREFIX, local)
}

/// `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_signing_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Builds `etsi:QualifyingProperties` for one signature.
pub struct QualifyingPropertiesBuilder<'a> {
    ids: &'a SignatureIds,
    signing_time: DateTime<Utc>,
    digest_uri: &'a str,
    certificates: Vec<&'a CertInfo>,
    data_object_format: Option<&'a DataObjectFormat>,
}

impl<'a> QualifyingPropertiesBuilder<'a> {
    pub fn new(ids: &'a SignatureIds, signing_time: DateTime<Utc>, digest_uri: &'a str) -> Self {
        Self {
            ids,
            signing_time,
            digest_uri,
            certificates: Vec::new(),
            data_object_format: None,
        }
    }

    /// Attest `cert` in `SigningCertificate`. The signer comes first.
    pub fn attest(mut self, cert: &'a CertInfo) -> Self {
        self.certificates.push(cert);
        self
    }

    /// Describe the payload reference.
    pub fn data_object_format(mut self, format: &'a DataObjectFormat) -> Self {
        self.data_object_format = Some(format);
        self
    }

    pub fn build(&self) -> Result<Element, Error> {
        if self.certificates.is_empty() {
            return Err(Error::InternalInconsistency(
                "SigningCertificate needs at least one certificate".into(),
            ));
        }

        let mut signing_certificate = etsi(ns::node::SIGNING_CERTIFICATE);
        for cert in &self.certificates {
            signing_certificate.push(self.cert(cert)?);
        }

        let signed_signature_properties = etsi(ns::node::SIGNED_SIGNATURE_PROPERTIES)
            .child(etsi(ns::node::SIGNING_TIME).text(format_signing_time(&self.signing_time)))
            .child(signing_certificate);

        let mut signed_properties = etsi(ns::node::SIGNED_PROPERTIES)
            .attr(ns::attr::ID, self.ids.signed_properties.as_str())
            .child(signed_signature_properties);

        if let Some(format) = self.data_object_format {
            signed_properties.push(
                etsi(ns::node::SIGNED_DATA_OBJECT_PROPERTIES)
                    .child(self.data_object_format_element(format)?),
            );
        }

        Ok(etsi(ns::node::QUALIFYING_PROPERTIES)
            .attr(ns::attr::ID, self.ids.qualifying_properties.as_str())
            .attr(ns::attr::TARGET, format!("#{}", self.ids.signature))
            .child(signed_properties))
    }

    fn cert(&self, cert: &CertInfo) -> Result<Element, Error> {
        let digest = xades_crypto::digest::digest(self.digest_uri, cert.der())?;
        let b64 = base64::engine::general_purpose::STANDARD.encode(digest);

        Ok(etsi(ns::node::CERT)
            .child(
                etsi(ns::node::CERT_DIGEST)
                    .child(ds(ns::node::DIGEST_METHOD).attr(ns::attr::ALGORITHM, self.digest_uri))
                    .child(ds(ns::node::DIGEST_VALUE).text(b64)),
            )
            .child(
                etsi(ns::node::ISSUER_SERIAL)
                    .child(ds(ns::node::X509_ISSUER_NAME).text(cert.issuer_dn()?))
                    .child(ds(ns::node::X509_SERIAL_NUMBER).text(cert.serial_decimal())),
            ))
    }

    fn data_object_format_element(&self, format: &DataObjectFormat) -> Result<Element, Error> {
        if format.is_empty() {
            return Err(Error::MalformedInput(format!(
                "DataObjectFormat for reference {} has no content",
                self.ids.reference
            )));
        }
        let field = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(str::to_owned);

        let mut element = etsi(ns::node::DATA_OBJECT_FORMAT)
            .attr(ns::attr::OBJECT_REFERENCE, format!("#{}", self.ids.reference));
        if let Some(description) = field(&format.description) {
            element.push(etsi(ns::node::DESCRIPTION).text(description));
        }
        if let Some(oid) = field(&format.object_identifier) {
            element.push(
                etsi(ns::node::OBJECT_IDENTIFIER).child(etsi(ns::node::IDENTIFIER).text(oid)),
            );
        }
        if let Some(mime_type) = field(&format.mime_type) {
            element.push(etsi(ns::node::MIME_TYPE).text(mime_type));
        }
        if let Some(encoding) = field(&format.encoding) {
            element.push(etsi(ns::node::ENCODING).text(encoding));
        }
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ids() -> SignatureIds {
        SignatureIds {
            signature: "id-sig".into(),
            signed_properties: "id-sp".into(),
            key_info: "id-ki".into(),
            qualifying_properties: "id-qp".into(),
            reference: "id-ref".into(),
        }
    }

    #[test]
    fn test_signing_time_format() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_signing_time(&t), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_requires_a_certificate() {
        let ids = ids();
        let b = QualifyingPropertiesBuilder::new(&ids, Utc::now(), xades_core::algorithm::SHA256);
        assert!(matches!(b.build(), Err(Error::InternalInconsistency(_))));
    }

    #[test]
    fn test_data_object_format_schema_order() {
        let ids = ids();
        let b = QualifyingPropertiesBuilder::new(&ids, Utc::now(), xades_core::algorithm::SHA256);
        let format = DataObjectFormat {
            description: Some("invoice".into()),
            object_identifier: None,
            mime_type: Some("text/xml".into()),
            encoding: Some(String::new()),
        };
        let xml = b.data_object_format_element(&format).unwrap().to_xml();
        assert_eq!(
            xml,
            "<etsi:DataObjectFormat ObjectReference=\"#id-ref\">\
             <etsi:Description>invoice</etsi:Description>\
             <etsi:MimeType>text/xml</etsi:MimeType>\
             </etsi:DataObjectFormat>"
        );
        assert!(matches!(
            b.data_object_format_element(&DataObjectFormat::default()),
            Err(Error::MalformedInput(_))
        ));
    }
}
