#![forbid(unsafe_code)]

//! Certificate facts needed by XML-DSig and XAdES: DER bytes, RFC 2253
//! distinguished names and decimal serial numbers.

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode, Tag, Tagged};
use num_bigint_dig::BigUint;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::Name;
use x509_cert::Certificate;
use xades_core::Error;

const OID_BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");

/// Attribute types with an RFC 2253 short name.
const SHORT_NAMES: &[(&str, &str)] = &[
    ("2.5.4.3", "CN"),
    ("2.5.4.7", "L"),
    ("2.5.4.8", "ST"),
    ("2.5.4.10", "O"),
    ("2.5.4.11", "OU"),
    ("2.5.4.6", "C"),
    ("2.5.4.9", "STREET"),
    ("0.9.2342.19200300.100.1.25", "DC"),
    ("0.9.2342.19200300.100.1.1", "UID"),
];

/// A parsed certificate together with the facts the signature refers to.
#[derive(Debug, Clone)]
pub struct CertInfo {
    der: Vec<u8>,
    cert: Certificate,
}

impl CertInfo {
    pub fn from_der(der: Vec<u8>) -> Result<Self, Error> {
        let cert = Certificate::from_der(&der)
            .map_err(|e| Error::MalformedPkcs12(format!("failed to parse X.509 certificate: {e}")))?;
        Ok(Self { der, cert })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Issuer DN as an RFC 2253 string.
    pub fn issuer_dn(&self) -> Result<String, Error> {
        format_dn(&self.cert.tbs_certificate.issuer)
    }

    /// Subject DN as an RFC 2253 string.
    pub fn subject_dn(&self) -> Result<String, Error> {
        format_dn(&self.cert.tbs_certificate.subject)
    }

    /// Serial number in decimal.
    pub fn serial_decimal(&self) -> String {
        format_serial_decimal(self.cert.tbs_certificate.serial_number.as_bytes())
    }

    /// SubjectPublicKeyInfo as DER.
    pub fn spki_der(&self) -> Result<Vec<u8>, Error> {
        self.cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::MalformedPkcs12(format!("failed to encode SPKI: {e}")))
    }

    /// Whether BasicConstraints marks this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        self.cert
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .filter(|ext| ext.extn_id == OID_BASIC_CONSTRAINTS)
            .filter_map(|ext| {
                x509_cert::ext::pkix::BasicConstraints::from_der(ext.extn_value.as_bytes()).ok()
            })
            .any(|bc| bc.ca)
    }
}

/// Convert a big-endian ASN.1 INTEGER to decimal.
///
/// Serial numbers are positive; a leading `0x00` sign byte is harmless.
pub fn format_serial_decimal(bytes: &[u8]) -> String {
    BigUint::from_bytes_be(bytes).to_string()
}

/// Render a Name per RFC 2253: RDNs in reverse order, comma separated,
/// multi-valued RDNs joined with `+`.
pub fn format_dn(name: &Name) -> Result<String, Error> {
    let mut rdns = Vec::with_capacity(name.0.len());
    for rdn in name.0.iter().rev() {
        let atvs = rdn
            .0
            .iter()
            .map(format_atv)
            .collect::<Result<Vec<_>, _>>()?;
        rdns.push(atvs.join("+"));
    }
    Ok(rdns.join(","))
}

fn format_atv(atv: &AttributeTypeAndValue) -> Result<String, Error> {
    let oid = atv.oid.to_string();
    let short = SHORT_NAMES
        .iter()
        .find(|(dotted, _)| *dotted == oid)
        .map(|(_, name)| *name);

    match (short, string_value(atv)) {
        (Some(name), Some(value)) => Ok(format!("{name}={}", escape_dn_value(&value))),
        // Unknown type or non-string value: dotted OID with hex BER.
        (short, _) => {
            let der = atv
                .value
                .to_der()
                .map_err(|e| Error::MalformedPkcs12(format!("failed to encode DN value: {e}")))?;
            let hex: String = der.iter().map(|b| format!("{b:02X}")).collect();
            Ok(format!("{}=#{hex}", short.unwrap_or(&oid)))
        }
    }
}

fn string_value(atv: &AttributeTypeAndValue) -> Option<String> {
    let bytes = atv.value.value();
    match atv.value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::VisibleString => {
            String::from_utf8(bytes.to_vec()).ok()
        }
        // T.61 in theory; Latin-1 in practice.
        Tag::TeletexString => Some(bytes.iter().map(|&b| b as char).collect()),
        Tag::BmpString => {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        _ => None,
    }
}

fn escape_dn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if needs_escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
