#![forbid(unsafe_code)]

//! BER parsing of PKCS#12 (PFX) structures (RFC 7292).
//!
//! Uses `yasna::parse_ber` since PKCS#12 files use BER encoding, not strict DER.

use xades_core::Error;
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, Tag};
use zeroize::Zeroizing;

use crate::kdf::{self, AesCbc, Prf};
use crate::Pkcs12Contents;

// ── OID constants ──────────────────────────────────────────────────────────

const OID_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const OID_ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

const OID_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 1];
const OID_PKCS8_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
const OID_CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];

const OID_X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

const OID_PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
const OID_PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
const OID_PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];

const OID_AES_128_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 2];
const OID_AES_192_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 22];
const OID_AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];

const OID_SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
const OID_HMAC_SHA224: &[u64] = &[1, 2, 840, 113549, 2, 8];
const OID_HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];
const OID_HMAC_SHA384: &[u64] = &[1, 2, 840, 113549, 2, 10];
const OID_HMAC_SHA512: &[u64] = &[1, 2, 840, 113549, 2, 11];

fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}

fn invalid() -> ASN1Error {
    ASN1Error::new(ASN1ErrorKind::Invalid)
}

// ── Algorithm types ────────────────────────────────────────────────────────

#[derive(Debug)]
enum EncryptionAlgorithm {
    PbeSha1And3Des {
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbes2 {
        salt: Vec<u8>,
        iterations: u32,
        prf: Prf,
        scheme: AesCbc,
        iv: Vec<u8>,
    },
    /// Recognized structure, algorithm we cannot decrypt.
    Unsupported(String),
}

#[derive(Debug, Clone, Copy)]
enum MacHashAlgorithm {
    Sha1,
    Sha256,
}

// ── Parsed structures ──────────────────────────────────────────────────────

struct MacData {
    digest_algorithm: MacHashAlgorithm,
    digest_value: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

enum SafeBag {
    KeyBag {
        pkcs8_der: Vec<u8>,
    },
    ShroudedKeyBag {
        algorithm: EncryptionAlgorithm,
        ciphertext: Vec<u8>,
    },
    CertBag {
        cert_der: Vec<u8>,
    },
    Other,
}

enum ContentInfoInner {
    Data(Vec<u8>),
    EncryptedData {
        algorithm: EncryptionAlgorithm,
        ciphertext: Vec<u8>,
    },
    Other(String),
}

// ── Top-level parser ───────────────────────────────────────────────────────

pub fn parse_pfx(data: &[u8], password: &str) -> Result<Pkcs12Contents, Error> {
    let (auth_safe_data, mac_data) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            let version = r.next().read_u32()?;
            if version != 3 {
                return Err(invalid());
            }
            let auth_safe_data = parse_content_info_data(r.next())?;
            let mac_data = r.read_optional(parse_mac_data)?;
            Ok((auth_safe_data, mac_data))
        })
    })
    .map_err(|e| Error::MalformedPkcs12(format!("failed to parse PFX: {e}")))?;

    // With a MAC we learn which password encoding is right; without one we
    // go with the canonical encoding and let decryption judge it.
    let bmp_password = match &mac_data {
        Some(mac) => verify_mac(mac, &auth_safe_data, password)?,
        None => {
            tracing::debug!("PKCS#12 has no integrity MAC");
            kdf::password_to_bmp(password)
        }
    };
    let mac_verified = mac_data.is_some();

    let content_infos = yasna::parse_ber(&auth_safe_data, |r| {
        r.collect_sequence_of(parse_content_info_inner)
    })
    .map_err(|e| Error::MalformedPkcs12(format!("failed to parse authSafe contents: {e}")))?;

    let mut private_keys = Vec::new();
    let mut certificates = Vec::new();

    for ci in content_infos {
        let bags_data = match ci {
            ContentInfoInner::Data(data) => Zeroizing::new(data),
            ContentInfoInner::EncryptedData { algorithm, ciphertext } => {
                decrypt_data(&algorithm, &ciphertext, password, &bmp_password)?
            }
            ContentInfoInner::Other(content_type) => {
                return Err(Error::MalformedPkcs12(format!(
                    "unsupported authSafe content type {content_type}"
                )));
            }
        };

        let bags = yasna::parse_ber(&bags_data, |r| r.collect_sequence_of(parse_safe_bag))
            .map_err(|e| undecodable(mac_verified, format!("failed to parse SafeBags: {e}")))?;

        for bag in bags {
            match bag {
                SafeBag::KeyBag { pkcs8_der } => private_keys.push(Zeroizing::new(pkcs8_der)),
                SafeBag::ShroudedKeyBag { algorithm, ciphertext } => {
                    private_keys.push(decrypt_data(&algorithm, &ciphertext, password, &bmp_password)?);
                }
                SafeBag::CertBag { cert_der } => certificates.push(cert_der),
                SafeBag::Other => {}
            }
        }
    }

    tracing::debug!(
        keys = private_keys.len(),
        certificates = certificates.len(),
        "parsed PKCS#12"
    );

    Ok(Pkcs12Contents {
        private_keys,
        certificates,
    })
}

/// Garbage after a successful decrypt means the key was wrong unless a MAC
/// already vouched for the password.
fn undecodable(mac_verified: bool, msg: String) -> Error {
    if mac_verified {
        Error::MalformedPkcs12(msg)
    } else {
        Error::InvalidPassphrase(msg)
    }
}

// ── ContentInfo parsing ────────────────────────────────────────────────────

/// Top-level ContentInfo wrapping the authSafe: OID must be `data`.
fn parse_content_info_data(r: BERReader) -> Result<Vec<u8>, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type != oid(OID_DATA) {
            return Err(invalid());
        }
        r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
    })
}

fn parse_content_info_inner(r: BERReader) -> Result<ContentInfoInner, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;

        if content_type == oid(OID_DATA) {
            let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            Ok(ContentInfoInner::Data(data))
        } else if content_type == oid(OID_ENCRYPTED_DATA) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let _version = r.next().read_u32()?;
                    r.next().read_sequence(|r| {
                        let _ct = r.next().read_oid()?;
                        let algorithm = parse_algorithm_identifier(r.next())?;
                        // [0] IMPLICIT encrypted content
                        let ciphertext = r
                            .next()
                            .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                        Ok(ContentInfoInner::EncryptedData { algorithm, ciphertext })
                    })
                })
            })
        } else {
            // e.g. envelopedData; swallow the content so the sequence stays aligned
            let _ = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            Ok(ContentInfoInner::Other(content_type.to_string()))
        }
    })
}

// ── SafeBag parsing ────────────────────────────────────────────────────────

fn skip_bag_attributes(r: &mut yasna::BERReaderSeq<'_, '_>) -> Result<(), ASN1Error> {
    r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let _oid = r.next().read_oid()?;
                r.next().read_set_of(|r| {
                    let _ = r.read_der()?;
                    Ok(())
                })
            })
        })
    })?;
    Ok(())
}

fn parse_safe_bag(r: BERReader) -> Result<SafeBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;

        let bag = if bag_type == oid(OID_PKCS8_SHROUDED_KEY_BAG) {
            // [0] EXPLICIT EncryptedPrivateKeyInfo
            let (algorithm, ciphertext) = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let algorithm = parse_algorithm_identifier(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok((algorithm, ciphertext))
                })
            })?;
            SafeBag::ShroudedKeyBag { algorithm, ciphertext }
        } else if bag_type == oid(OID_KEY_BAG) {
            // [0] EXPLICIT PrivateKeyInfo, kept as DER
            let pkcs8_der = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::KeyBag { pkcs8_der }
        } else if bag_type == oid(OID_CERT_BAG) {
            let cert_der = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let cert_type = r.next().read_oid()?;
                    let value = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
                    Ok((cert_type == oid(OID_X509_CERTIFICATE)).then_some(value))
                })
            })?;
            match cert_der {
                Some(cert_der) => SafeBag::CertBag { cert_der },
                None => SafeBag::Other,
            }
        } else {
            let _value = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::Other
        };

        skip_bag_attributes(r)?;
        Ok(bag)
    })
}

// ── AlgorithmIdentifier parsing ────────────────────────────────────────────

fn parse_algorithm_identifier(r: BERReader) -> Result<EncryptionAlgorithm, ASN1Error> {
    r.read_sequence(|r| {
        let alg_oid = r.next().read_oid()?;

        if alg_oid == oid(OID_PBE_SHA1_3DES) {
            // SEQUENCE { salt OCTET STRING, iterations INTEGER }
            r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(EncryptionAlgorithm::PbeSha1And3Des { salt, iterations })
            })
        } else if alg_oid == oid(OID_PBES2) {
            // PBES2-params: SEQUENCE { keyDerivationFunc, encryptionScheme }
            r.next().read_sequence(|r| {
                let kdf = r.next().read_sequence(|r| {
                    let kdf_oid = r.next().read_oid()?;
                    if kdf_oid != oid(OID_PBKDF2) {
                        let _ = r.read_optional(|r| r.read_der())?;
                        return Ok(Err(kdf_oid.to_string()));
                    }
                    // PBKDF2-params: SEQUENCE { salt, iterationCount, keyLength?, prf? }
                    r.next().read_sequence(|r| {
                        let salt = r.next().read_bytes()?;
                        let iterations = r.next().read_u32()?;
                        let _key_length = r.read_optional(|r| r.read_u32())?;
                        let prf = r
                            .read_optional(parse_prf)?
                            .unwrap_or(Ok(Prf::HmacSha1));
                        Ok(prf.map(|prf| (salt, iterations, prf)))
                    })
                })?;

                let scheme = r.next().read_sequence(|r| {
                    let enc_oid = r.next().read_oid()?;
                    let scheme = if enc_oid == oid(OID_AES_128_CBC) {
                        Ok(AesCbc::Aes128)
                    } else if enc_oid == oid(OID_AES_192_CBC) {
                        Ok(AesCbc::Aes192)
                    } else if enc_oid == oid(OID_AES_256_CBC) {
                        Ok(AesCbc::Aes256)
                    } else {
                        Err(enc_oid.to_string())
                    };
                    let params = r.read_optional(|r| r.read_der())?.unwrap_or_default();
                    Ok(scheme.map(|s| (s, params)))
                })?;

                Ok(match (kdf, scheme) {
                    (Ok((salt, iterations, prf)), Ok((scheme, params))) => {
                        let iv = yasna::parse_der(&params, |r| r.read_bytes())?;
                        EncryptionAlgorithm::Pbes2 { salt, iterations, prf, scheme, iv }
                    }
                    (Err(unknown), _) | (_, Err(unknown)) => {
                        EncryptionAlgorithm::Unsupported(unknown)
                    }
                })
            })
        } else {
            let _ = r.read_optional(|r| r.read_der())?;
            Ok(EncryptionAlgorithm::Unsupported(alg_oid.to_string()))
        }
    })
}

/// PRF AlgorithmIdentifier; an unknown OID is reported, not rejected.
fn parse_prf(r: BERReader) -> Result<Result<Prf, String>, ASN1Error> {
    r.read_sequence(|r| {
        let prf_oid = r.next().read_oid()?;
        let _null = r.read_optional(|r| r.read_null())?;
        Ok(if prf_oid == oid(OID_HMAC_SHA1) {
            Ok(Prf::HmacSha1)
        } else if prf_oid == oid(OID_HMAC_SHA224) {
            Ok(Prf::HmacSha224)
        } else if prf_oid == oid(OID_HMAC_SHA256) {
            Ok(Prf::HmacSha256)
        } else if prf_oid == oid(OID_HMAC_SHA384) {
            Ok(Prf::HmacSha384)
        } else if prf_oid == oid(OID_HMAC_SHA512) {
            Ok(Prf::HmacSha512)
        } else {
            Err(prf_oid.to_string())
        })
    })
}

// ── MAC verification ───────────────────────────────────────────────────────

fn parse_mac_data(r: BERReader) -> Result<MacData, ASN1Error> {
    r.read_sequence(|r| {
        // DigestInfo: SEQUENCE { digestAlgorithm, digest }
        let (digest_algorithm, digest_value) = r.next().read_sequence(|r| {
            let alg = r.next().read_sequence(|r| {
                let hash_oid = r.next().read_oid()?;
                let _null = r.read_optional(|r| r.read_null())?;
                if hash_oid == oid(OID_SHA256) {
                    Ok(MacHashAlgorithm::Sha256)
                } else if hash_oid == oid(OID_SHA1) {
                    Ok(MacHashAlgorithm::Sha1)
                } else {
                    Err(invalid())
                }
            })?;
            let digest = r.next().read_bytes()?;
            Ok((alg, digest))
        })?;

        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);

        Ok(MacData {
            digest_algorithm,
            digest_value,
            salt,
            iterations,
        })
    })
}

/// Check the integrity MAC and return the password encoding that matched.
fn verify_mac(
    mac: &MacData,
    auth_safe_data: &[u8],
    password: &str,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    for bmp_password in kdf::password_candidates(password) {
        let ok = match mac.digest_algorithm {
            MacHashAlgorithm::Sha1 => {
                let key = kdf::pkcs12_kdf::<sha1::Sha1>(
                    kdf::ID_MAC,
                    &bmp_password,
                    &mac.salt,
                    mac.iterations,
                    20,
                );
                kdf::verify_hmac_sha1(&key, auth_safe_data, &mac.digest_value)?
            }
            MacHashAlgorithm::Sha256 => {
                let key = kdf::pkcs12_kdf::<sha2::Sha256>(
                    kdf::ID_MAC,
                    &bmp_password,
                    &mac.salt,
                    mac.iterations,
                    32,
                );
                kdf::verify_hmac_sha256(&key, auth_safe_data, &mac.digest_value)?
            }
        };
        if ok {
            return Ok(bmp_password);
        }
    }
    Err(Error::InvalidPassphrase(
        "PKCS#12 MAC verification failed (wrong passphrase?)".into(),
    ))
}

// ── Decryption dispatch ────────────────────────────────────────────────────

fn decrypt_data(
    algorithm: &EncryptionAlgorithm,
    ciphertext: &[u8],
    password: &str,
    bmp_password: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    match algorithm {
        EncryptionAlgorithm::PbeSha1And3Des { salt, iterations } => {
            kdf::decrypt_pbe_sha1_3des(ciphertext, bmp_password, salt, *iterations)
        }
        EncryptionAlgorithm::Pbes2 {
            salt,
            iterations,
            prf,
            scheme,
            iv,
        } => kdf::decrypt_pbes2(ciphertext, password, salt, *iterations, *prf, *scheme, iv),
        EncryptionAlgorithm::Unsupported(oid) => Err(Error::UnsupportedAlgorithm(format!(
            "PKCS#12 encryption algorithm {oid}"
        ))),
    }
}
