//! Test fixtures: an RSA CA and signer, their certificates, a PKCS#12
//! bundle built on the fly, and a verifier for the produced signatures.

#![allow(dead_code)]

use base64::Engine;
use cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use std::sync::OnceLock;
use xades::core::{algorithm, ns};
use xades::xml::document::{find_child_element, find_child_elements};
use xades::xml::XmlDocument;

pub const PASSPHRASE: &str = "x";
pub const SIGNER_SERIAL: u64 = 4660;
pub const SIGNER_SUBJECT: &str = "CN=Test Signer,O=Example Org";
pub const CA_SUBJECT: &str = "CN=Test Root CA,O=Example Org";

const OID_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const OID_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
const OID_CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
const OID_X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];
const OID_PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
const OID_PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
const OID_HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];
const OID_AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_SHA256_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 11];
const OID_COMMON_NAME: &[u64] = &[2, 5, 4, 3];
const OID_ORGANIZATION: &[u64] = &[2, 5, 4, 10];
const OID_BASIC_CONSTRAINTS: &[u64] = &[2, 5, 29, 19];

/// Keys and certificates shared by every test in a binary.
pub struct Fixture {
    pub signer_key: rsa::RsaPrivateKey,
    pub signer_cert: Vec<u8>,
    pub ca_cert: Vec<u8>,
}

pub fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let ca_key = rsa_key(11);
        let signer_key = rsa_key(7);
        let ca_cert = certificate(&ca_key, &ca_key, 1, ("Test Root CA", "Test Root CA"), true);
        let signer_cert = certificate(
            &ca_key,
            &signer_key,
            SIGNER_SERIAL,
            ("Test Root CA", "Test Signer"),
            false,
        );
        Fixture {
            signer_key,
            signer_cert,
            ca_cert,
        }
    })
}

fn rsa_key(seed: u64) -> rsa::RsaPrivateKey {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap()
}

fn oid(components: &[u64]) -> yasna::models::ObjectIdentifier {
    yasna::models::ObjectIdentifier::from_slice(components)
}

fn write_name(w: yasna::DERWriter, common_name: &str) {
    w.write_sequence(|w| {
        for (attr, value) in [(OID_ORGANIZATION, "Example Org"), (OID_COMMON_NAME, common_name)] {
            w.next().write_set(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(attr));
                    w.next().write_der(&short_der(0x0C, value.as_bytes()));
                });
            });
        }
    });
}

/// A primitive DER value shorter than 128 bytes.
fn short_der(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut der = vec![tag, content.len() as u8];
    der.extend_from_slice(content);
    der
}

/// X.509 v3 certificate for `subject_key`, signed with `issuer_key`
/// (sha256WithRSAEncryption). `names` is (issuer CN, subject CN).
fn certificate(
    issuer_key: &rsa::RsaPrivateKey,
    subject_key: &rsa::RsaPrivateKey,
    serial: u64,
    names: (&str, &str),
    ca: bool,
) -> Vec<u8> {
    let spki = subject_key.to_public_key().to_public_key_der().unwrap();
    let write_alg = |w: yasna::DERWriter| {
        w.write_sequence(|w| {
            w.next().write_oid(&oid(OID_SHA256_WITH_RSA));
            w.next().write_null();
        });
    };

    let tbs = yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next()
                .write_tagged(yasna::Tag::context(0), |w| w.write_u8(2));
            w.next().write_u64(serial);
            write_alg(w.next());
            write_name(w.next(), names.0);
            w.next().write_sequence(|w| {
                w.next().write_der(&short_der(0x17, b"240101000000Z"));
                w.next().write_der(&short_der(0x17, b"340101000000Z"));
            });
            write_name(w.next(), names.1);
            w.next().write_der(spki.as_bytes());
            if ca {
                let basic_constraints =
                    yasna::construct_der(|w| w.write_sequence(|w| w.next().write_bool(true)));
                w.next().write_tagged(yasna::Tag::context(3), |w| {
                    w.write_sequence(|w| {
                        w.next().write_sequence(|w| {
                            w.next().write_oid(&oid(OID_BASIC_CONSTRAINTS));
                            w.next().write_bool(true);
                            w.next().write_bytes(&basic_constraints);
                        });
                    });
                });
            }
        });
    });

    let signature = xades::crypto::sign::from_uri(algorithm::RSA_SHA256)
        .unwrap()
        .sign(issuer_key, &tbs)
        .unwrap();

    yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_der(&tbs);
            write_alg(w.next());
            w.next().write_bitvec_bytes(&signature, signature.len() * 8);
        });
    })
}

/// PKCS#12 bundle: PBES2 (PBKDF2-HMAC-SHA256, AES-256-CBC) shrouded key
/// bag, the given certificates, SHA-256 MAC.
pub fn build_pkcs12(key: &rsa::RsaPrivateKey, certs: &[&[u8]], password: &str) -> Vec<u8> {
    let salt = b"fixture-pbes2-salt";
    let iv = [9u8; 16];
    let iterations = 2048u32;

    let pkcs8 = key.to_pkcs8_der().unwrap();
    let mut aes_key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password.as_bytes(), salt, iterations, &mut aes_key);
    let encrypted_key = cbc::Encryptor::<aes::Aes256>::new_from_slices(&aes_key, &iv)
        .unwrap()
        .encrypt_padded_vec_mut::<Pkcs7>(pkcs8.as_bytes());

    let safe_contents = yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_sequence(|w| {
                w.next().write_oid(&oid(OID_SHROUDED_KEY_BAG));
                w.next().write_tagged(yasna::Tag::context(0), |w| {
                    w.write_sequence(|w| {
                        w.next().write_sequence(|w| {
                            w.next().write_oid(&oid(OID_PBES2));
                            w.next().write_sequence(|w| {
                                w.next().write_sequence(|w| {
                                    w.next().write_oid(&oid(OID_PBKDF2));
                                    w.next().write_sequence(|w| {
                                        w.next().write_bytes(salt);
                                        w.next().write_u32(iterations);
                                        w.next().write_sequence(|w| {
                                            w.next().write_oid(&oid(OID_HMAC_SHA256));
                                            w.next().write_null();
                                        });
                                    });
                                });
                                w.next().write_sequence(|w| {
                                    w.next().write_oid(&oid(OID_AES_256_CBC));
                                    w.next().write_bytes(&iv);
                                });
                            });
                        });
                        w.next().write_bytes(&encrypted_key);
                    });
                });
            });
            for cert in certs {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(OID_CERT_BAG));
                    w.next().write_tagged(yasna::Tag::context(0), |w| {
                        w.write_sequence(|w| {
                            w.next().write_oid(&oid(OID_X509_CERTIFICATE));
                            w.next()
                                .write_tagged(yasna::Tag::context(0), |w| w.write_bytes(cert));
                        });
                    });
                });
            }
        });
    });

    let auth_safe = yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_sequence(|w| {
                w.next().write_oid(&oid(OID_DATA));
                w.next()
                    .write_tagged(yasna::Tag::context(0), |w| w.write_bytes(&safe_contents));
            });
        });
    });

    let mac_salt = b"fixture-mac-salt";
    let mac_key = xades::pkcs12::kdf::pkcs12_kdf::<sha2::Sha256>(
        xades::pkcs12::kdf::ID_MAC,
        &xades::pkcs12::kdf::password_to_bmp(password),
        mac_salt,
        iterations,
        32,
    );
    let mut mac = <Hmac<sha2::Sha256> as Mac>::new_from_slice(&mac_key).unwrap();
    mac.update(&auth_safe);
    let mac_value = mac.finalize().into_bytes();

    yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_u32(3);
            w.next().write_sequence(|w| {
                w.next().write_oid(&oid(OID_DATA));
                w.next()
                    .write_tagged(yasna::Tag::context(0), |w| w.write_bytes(&auth_safe));
            });
            w.next().write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(OID_SHA256));
                        w.next().write_null();
                    });
                    w.next().write_bytes(&mac_value);
                });
                w.next().write_bytes(mac_salt);
                w.next().write_u32(iterations);
            });
        });
    })
}

/// Bundle with the signer key, its certificate and the CA certificate.
pub fn signer_pkcs12(password: &str) -> Vec<u8> {
    let f = fixture();
    build_pkcs12(&f.signer_key, &[&f.signer_cert, &f.ca_cert], password)
}

/// What [`verify`] recovered from a signature.
#[derive(Debug)]
pub struct Verified {
    pub subject: String,
    pub reference_uris: Vec<String>,
}

/// Recompute every reference digest and check the SignatureValue with the
/// public key of the first embedded certificate.
pub fn verify(signed: &[u8]) -> Verified {
    let b64 = base64::engine::general_purpose::STANDARD;
    let document = XmlDocument::parse_bytes(signed).unwrap();
    let doc = document.parse_doc().unwrap();
    let id_map = document.build_id_map(&doc);

    let signature = doc
        .root_element()
        .children()
        .filter(|n| n.is_element())
        .last()
        .unwrap();
    assert!(signature.has_tag_name((ns::DSIG, ns::node::SIGNATURE)));
    let signed_info = find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO).unwrap();

    let mut reference_uris = Vec::new();
    for reference in find_child_elements(signed_info, ns::DSIG, ns::node::REFERENCE) {
        let uri = reference.attribute(ns::attr::URI).unwrap();
        let node_set = xades::transforms::resolve_uri(uri, &doc, &id_map).unwrap();
        let mut pipeline = xades::transforms::TransformPipeline::new();
        if let Some(transforms) = find_child_element(reference, ns::DSIG, ns::node::TRANSFORMS) {
            for t in find_child_elements(transforms, ns::DSIG, ns::node::TRANSFORM) {
                let algorithm = t.attribute(ns::attr::ALGORITHM).unwrap();
                pipeline.push(xades::transforms::transform_from_uri(algorithm, signature.id()).unwrap());
            }
        }
        let octets = pipeline.apply(&doc, node_set).unwrap();
        let method = find_child_element(reference, ns::DSIG, ns::node::DIGEST_METHOD).unwrap();
        let digest =
            xades::crypto::digest::digest(method.attribute(ns::attr::ALGORITHM).unwrap(), &octets)
                .unwrap();
        let recorded = find_child_element(reference, ns::DSIG, ns::node::DIGEST_VALUE)
            .unwrap()
            .text()
            .unwrap();
        assert_eq!(b64.encode(digest), recorded, "digest mismatch for URI {uri:?}");
        reference_uris.push(uri.to_owned());
    }

    let c14n_uri = find_child_element(signed_info, ns::DSIG, ns::node::CANONICALIZATION_METHOD)
        .unwrap()
        .attribute(ns::attr::ALGORITHM)
        .unwrap();
    let mode = xades::c14n::C14nMode::require(c14n_uri).unwrap();
    let canonical = xades::c14n::canonicalize_subtree(&doc, signed_info, mode).unwrap();

    let signature_uri = find_child_element(signed_info, ns::DSIG, ns::node::SIGNATURE_METHOD)
        .unwrap()
        .attribute(ns::attr::ALGORITHM)
        .unwrap();
    let signature_value = b64
        .decode(
            find_child_element(signature, ns::DSIG, ns::node::SIGNATURE_VALUE)
                .unwrap()
                .text()
                .unwrap(),
        )
        .unwrap();

    let key_info = find_child_element(signature, ns::DSIG, ns::node::KEY_INFO).unwrap();
    let x509_data = find_child_element(key_info, ns::DSIG, ns::node::X509_DATA).unwrap();
    let cert_b64 = find_child_element(x509_data, ns::DSIG, ns::node::X509_CERTIFICATE)
        .unwrap()
        .text()
        .unwrap();
    let cert = xades::keys::CertInfo::from_der(b64.decode(cert_b64).unwrap()).unwrap();
    let public = rsa::RsaPublicKey::from_public_key_der(&cert.spki_der().unwrap()).unwrap();

    let ok = xades::crypto::sign::from_uri(signature_uri)
        .unwrap()
        .verify(&public, &canonical, &signature_value)
        .unwrap();
    assert!(ok, "SignatureValue does not verify");

    Verified {
        subject: cert.subject_dn().unwrap(),
        reference_uris,
    }
}

/// Signing options that make the output reproducible.
pub fn frozen_options() -> xades::SignOptions {
    use chrono::TimeZone;
    xades::SignOptions {
        signing_time: Some(chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        id_seed: Some(2024),
        ..xades::SignOptions::default()
    }
}
