#![forbid(unsafe_code)]

//! Key derivation and decryption for PKCS#12.
//!
//! Three paths:
//! 1. PKCS#12 KDF (RFC 7292 Appendix B) for MAC keys and legacy PBE
//! 2. Legacy PBE: pbeWithSHAAnd3-KeyTripleDES-CBC
//! 3. PBES2: PBKDF2 (HMAC-SHA1/SHA-2) + AES-CBC

use cipher::{block_padding::Pkcs7, BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit};
use digest::core_api::BlockSizeUser;
use digest::{Digest, FixedOutputReset};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use xades_core::Error;
use zeroize::Zeroizing;

/// PKCS#12 KDF ID values (RFC 7292 Appendix B.3).
pub const ID_KEY: u8 = 1;
pub const ID_IV: u8 = 2;
pub const ID_MAC: u8 = 3;

/// PBKDF2 pseudo-random functions accepted in PBES2 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prf {
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

/// AES key sizes accepted as PBES2 encryption scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesCbc {
    Aes128,
    Aes192,
    Aes256,
}

impl AesCbc {
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }
}

/// PKCS#12 KDF (RFC 7292 Appendix B) over digest `D`.
///
/// `u` is the digest output size and `v` its block size.
/// `password` is the BMP-encoded password (see [`password_to_bmp`]).
pub fn pkcs12_kdf<D>(
    id: u8,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Zeroizing<Vec<u8>>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
{
    let u = <D as Digest>::output_size();
    let v = D::block_size();

    let d_block = vec![id; v];

    // I = S || P, each extended to a multiple of v
    let mut i_block = Zeroizing::new(extend_to_multiple(salt, v));
    i_block.extend_from_slice(&extend_to_multiple(password, v));

    let num_blocks = output_len.div_ceil(u);
    let mut result = Zeroizing::new(Vec::with_capacity(num_blocks * u));

    for block_idx in 0..num_blocks {
        let mut hasher = D::new();
        Digest::update(&mut hasher, &d_block);
        Digest::update(&mut hasher, i_block.as_slice());
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        result.extend_from_slice(&a);

        if block_idx + 1 < num_blocks {
            let b = extend_to_multiple(&a, v);
            for chunk in i_block.chunks_mut(v) {
                add_one_plus_b(chunk, &b);
            }
        }
    }

    result.truncate(output_len);
    result
}

/// Repeat `data` to fill a multiple of `v` bytes. Empty stays empty.
fn extend_to_multiple(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

/// `block = (block + b + 1) mod 2^(8·len)`.
fn add_one_plus_b(block: &mut [u8], b: &[u8]) {
    let mut carry: u16 = 1;
    for (x, y) in block.iter_mut().zip(b).rev() {
        let sum = *x as u16 + *y as u16 + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

/// Encode a password as BMP (UTF-16BE) with two trailing zero bytes.
///
/// The empty password encodes to no bytes at all; see [`password_candidates`].
pub fn password_to_bmp(password: &str) -> Zeroizing<Vec<u8>> {
    let mut bmp = Zeroizing::new(Vec::with_capacity(password.len() * 2 + 2));
    if password.is_empty() {
        return bmp;
    }
    for c in password.encode_utf16() {
        bmp.extend_from_slice(&c.to_be_bytes());
    }
    bmp.extend_from_slice(&[0, 0]);
    bmp
}

/// BMP encodings to try for `password`.
///
/// Producers disagree on the empty password: some encode it as no bytes,
/// others as the lone terminator `00 00`.
pub fn password_candidates(password: &str) -> Vec<Zeroizing<Vec<u8>>> {
    let mut candidates = vec![password_to_bmp(password)];
    if password.is_empty() {
        candidates.push(Zeroizing::new(vec![0, 0]));
    }
    candidates
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| Error::MalformedPkcs12(format!("bad cipher parameters: {e}")))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| Error::InvalidPassphrase("decryption failed (wrong passphrase?)".into()))
}

/// Decrypt with pbeWithSHAAnd3-KeyTripleDES-CBC (24-byte key, 8-byte IV
/// from the SHA-1 PKCS#12 KDF).
pub fn decrypt_pbe_sha1_3des(
    ciphertext: &[u8],
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key = pkcs12_kdf::<Sha1>(ID_KEY, bmp_password, salt, iterations, 24);
    let iv = pkcs12_kdf::<Sha1>(ID_IV, bmp_password, salt, iterations, 8);
    cbc_decrypt::<des::TdesEde3>(&key, &iv, ciphertext)
}

/// Decrypt with PBES2: PBKDF2 under `prf`, then AES-CBC.
pub fn decrypt_pbes2(
    ciphertext: &[u8],
    password: &str,
    salt: &[u8],
    iterations: u32,
    prf: Prf,
    scheme: AesCbc,
    iv: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut key = Zeroizing::new(vec![0u8; scheme.key_len()]);
    let pw = password.as_bytes();
    match prf {
        Prf::HmacSha1 => pbkdf2::pbkdf2_hmac::<Sha1>(pw, salt, iterations, &mut key),
        Prf::HmacSha224 => pbkdf2::pbkdf2_hmac::<Sha224>(pw, salt, iterations, &mut key),
        Prf::HmacSha256 => pbkdf2::pbkdf2_hmac::<Sha256>(pw, salt, iterations, &mut key),
        Prf::HmacSha384 => pbkdf2::pbkdf2_hmac::<Sha384>(pw, salt, iterations, &mut key),
        Prf::HmacSha512 => pbkdf2::pbkdf2_hmac::<Sha512>(pw, salt, iterations, &mut key),
    }
    match scheme {
        AesCbc::Aes128 => cbc_decrypt::<aes::Aes128>(&key, iv, ciphertext),
        AesCbc::Aes192 => cbc_decrypt::<aes::Aes192>(&key, iv, ciphertext),
        AesCbc::Aes256 => cbc_decrypt::<aes::Aes256>(&key, iv, ciphertext),
    }
}

/// Constant-time check of an HMAC-SHA1 integrity MAC.
pub fn verify_hmac_sha1(key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, Error> {
    let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(key)
        .map_err(|e| Error::MalformedPkcs12(format!("MAC key: {e}")))?;
    mac.update(data);
    Ok(mac.verify_slice(expected).is_ok())
}

/// Constant-time check of an HMAC-SHA256 integrity MAC.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, Error> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|e| Error::MalformedPkcs12(format!("MAC key: {e}")))?;
    mac.update(data);
    Ok(mac.verify_slice(expected).is_ok())
}
