#![forbid(unsafe_code)]

//! Key loading from PKCS#12 bundles.

use der::Decode;
use pkcs8::DecodePrivateKey;
use spki::DecodePublicKey;
use xades_core::Error;

use crate::key::KeyMaterial;
use crate::x509::CertInfo;

const OID_RSA_ENCRYPTION: pkcs8::ObjectIdentifier =
    pkcs8::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Load an RSA private key from PKCS#8 DER bytes.
///
/// A well-formed PKCS#8 structure holding another key type is reported as
/// [`Error::UnsupportedKeyType`].
pub fn load_private_key_pkcs8_der(der: &[u8]) -> Result<rsa::RsaPrivateKey, Error> {
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(pk);
    }
    match pkcs8::PrivateKeyInfo::from_der(der) {
        Ok(pki) if pki.algorithm.oid != OID_RSA_ENCRYPTION => Err(Error::UnsupportedKeyType(
            format!("private key algorithm {} is not RSA", pki.algorithm.oid),
        )),
        Ok(_) => Err(Error::MalformedPkcs12("invalid RSA private key".into())),
        Err(e) => Err(Error::MalformedPkcs12(format!(
            "unable to parse PKCS#8 private key: {e}"
        ))),
    }
}

/// Load the signing key and certificates from a PKCS#12 (.p12/.pfx) file.
///
/// The first private key is used. The signer certificate is the one whose
/// public key matches it; the remaining certificates form the chain.
pub fn load_pkcs12(data: &[u8], password: &str) -> Result<KeyMaterial, Error> {
    let contents = xades_pkcs12::parse_pkcs12(data, password)?;

    let pkcs8_der = contents
        .private_keys
        .first()
        .ok_or_else(|| Error::MalformedPkcs12("PKCS#12 contains no private key".into()))?;
    let private = load_private_key_pkcs8_der(pkcs8_der)?;

    if contents.certificates.is_empty() {
        return Err(Error::MalformedPkcs12("PKCS#12 contains no certificate".into()));
    }
    let mut certs = contents
        .certificates
        .into_iter()
        .map(CertInfo::from_der)
        .collect::<Result<Vec<_>, _>>()?;

    let public = private.to_public_key();
    let signer_idx = find_signer_cert(&certs, &public)?.ok_or_else(|| {
        Error::MalformedPkcs12("no certificate matches the private key".into())
    })?;
    let signer = certs.remove(signer_idx);

    tracing::debug!(
        subject = %signer.subject_dn().unwrap_or_default(),
        chain = certs.len(),
        "loaded signing key"
    );

    Ok(KeyMaterial::new(private, signer, certs))
}

/// Index of the certificate carrying `public`, if any.
fn find_signer_cert(certs: &[CertInfo], public: &rsa::RsaPublicKey) -> Result<Option<usize>, Error> {
    for (i, cert) in certs.iter().enumerate() {
        let spki_der = cert.spki_der()?;
        // Non-RSA certificates simply don't match.
        if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(&spki_der) {
            if &pk == public {
                return Ok(Some(i));
            }
        }
    }
    Ok(None)
}
