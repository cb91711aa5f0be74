//! AES-256-CBC payload decryption with the salted MD5 key expansion

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use md5::{Digest, Md5};
use tracing::debug;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Bytes taken by the `Salted__` marker and the salt at the head of a password-mode payload
const HEADER_LEN: usize = 16;
const SALT_RANGE: std::ops::Range<usize> = 8..16;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Key and IV produced by the password expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIv {
    pub key: [u8; KEY_LEN],
    pub iv: [u8; IV_LEN],
}

/// Three-round salted MD5 expansion.
///
/// `d0 = MD5(password || salt)`, `d1 = MD5(d0 || password || salt)`,
/// `d2 = MD5(d1 || password || salt)`; key is `d0 || d1`, IV is `d2`.
pub fn derive_key_iv(password: &[u8], salt: &[u8]) -> KeyIv {
    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];

    let mut previous: Option<[u8; 16]> = None;
    for round in 0..3 {
        let mut hasher = Md5::new();
        if let Some(prev) = previous {
            hasher.update(prev);
        }
        hasher.update(password);
        hasher.update(salt);
        let mut digest = [0u8; 16];
        digest.copy_from_slice(&hasher.finalize());

        match round {
            0 => key[..16].copy_from_slice(&digest),
            1 => key[16..].copy_from_slice(&digest),
            _ => iv.copy_from_slice(&digest),
        }
        previous = Some(digest);
    }

    KeyIv { key, iv }
}

/// One byte per character, low 8 bits, like a "binary" string encoding
pub fn latin1_bytes(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u32 as u8).collect()
}

/// Decrypt `ciphertext` with an explicit AES-256 key and IV, PKCS#7 padding removed
pub fn decrypt_with_key(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<String, ExtractError> {
    let cipher = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| {
        ExtractError::DecryptionFailure(format!(
            "invalid key/iv length ({} / {} bytes)",
            key.len(),
            iv.len()
        ))
    })?;

    let mut buf = ciphertext.to_vec();
    let plaintext = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| ExtractError::DecryptionFailure("bad padding".to_string()))?;

    String::from_utf8(plaintext.to_vec())
        .map_err(|e| ExtractError::DecryptionFailure(format!("plaintext is not UTF-8: {}", e)))
}

/// Decrypt a base64 `Salted__` payload with a password
pub fn decrypt_with_password(payload: &str, password: &str) -> Result<String, ExtractError> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ExtractError::DecryptionFailure(format!("invalid base64 payload: {}", e)))?;

    if bytes.len() < HEADER_LEN {
        return Err(ExtractError::DecryptionFailure(format!(
            "payload too short: {} bytes",
            bytes.len()
        )));
    }

    let salt = &bytes[SALT_RANGE];
    let key_iv = derive_key_iv(&latin1_bytes(password), salt);
    debug!(
        "Decrypting {} byte payload in password mode",
        bytes.len() - HEADER_LEN
    );

    decrypt_with_key(&bytes[HEADER_LEN..], &key_iv.key, &key_iv.iv)
}

/// Decrypt `payload` with either an explicit key and IV or a password.
///
/// With `iv` the payload bytes are used directly as ciphertext and
/// `key_or_secret` as the key; without it the payload is a base64 salted
/// blob and `key_or_secret` the password.
pub fn decrypt(payload: &str, key_or_secret: &str, iv: Option<&str>) -> Result<String, ExtractError> {
    match iv {
        Some(iv) => decrypt_with_key(payload.as_bytes(), key_or_secret.as_bytes(), iv.as_bytes()),
        None => decrypt_with_password(payload, key_or_secret),
    }
}
