/// AES-256-GCM encryption with explicit IV and auth tag
///
/// Each encryption draws a fresh random 16-byte IV, so encrypting the same
/// plaintext twice yields different ciphertexts. The output carries the IV,
/// the authentication tag, and the key version separately, all
/// base64-encoded, so records remain decryptable across key rotations.
///
/// Tampering with any field fails the tag check and surfaces as
/// `AuthError::Integrity` with no further detail.

use crate::error::{AuthError, AuthResult};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce};
use base64ct::{Base64, Encoding};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// AES-256-GCM with a 16-byte IV
type Cipher = AesGcm<Aes256, U16>;

/// Required key length in bytes
pub const KEY_LEN: usize = 32;

/// IV length in bytes
pub const IV_LEN: usize = 16;

/// GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// An encrypted value with everything needed to decrypt it later
///
/// All fields are standard base64. `key_version` names the key that sealed
/// this record so rotation never strands old data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// Base64 ciphertext (without the tag)
    pub ciphertext: String,

    /// Base64 initialization vector (16 bytes)
    pub iv: String,

    /// Base64 GCM authentication tag (16 bytes)
    pub auth_tag: String,

    /// Version of the key that produced this ciphertext
    pub key_version: u32,
}

/// Encrypts a plaintext under the given key
///
/// # Errors
///
/// - `AuthError::InvalidKey` if the key is not exactly 32 bytes
/// - `AuthError::Internal` if the cipher itself fails
pub fn encrypt(plaintext: &str, key: &[u8], key_version: u32) -> AuthResult<EncryptedSecret> {
    if key.len() != KEY_LEN {
        return Err(AuthError::InvalidKey);
    }

    let cipher = Cipher::new(Key::<Cipher>::from_slice(key));

    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::<U16>::from_slice(&iv);

    // The aead API appends the tag to the ciphertext; split it back out
    let mut combined = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| AuthError::Internal("Encryption failed".to_string()))?;
    let tag = combined.split_off(combined.len() - TAG_LEN);

    Ok(EncryptedSecret {
        ciphertext: Base64::encode_string(&combined),
        iv: Base64::encode_string(&iv),
        auth_tag: Base64::encode_string(&tag),
        key_version,
    })
}

/// Decrypts a sealed value under the given key
///
/// # Errors
///
/// - `AuthError::InvalidKey` if the key is not exactly 32 bytes
/// - `AuthError::Integrity` if any field fails to decode, the IV has the
///   wrong length, or the authentication tag does not verify
pub fn decrypt(secret: &EncryptedSecret, key: &[u8]) -> AuthResult<String> {
    if key.len() != KEY_LEN {
        return Err(AuthError::InvalidKey);
    }

    let ciphertext = Base64::decode_vec(&secret.ciphertext).map_err(|_| AuthError::Integrity)?;
    let iv = Base64::decode_vec(&secret.iv).map_err(|_| AuthError::Integrity)?;
    let tag = Base64::decode_vec(&secret.auth_tag).map_err(|_| AuthError::Integrity)?;

    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(AuthError::Integrity);
    }

    let cipher = Cipher::new(Key::<Cipher>::from_slice(key));
    let nonce = Nonce::<U16>::from_slice(&iv);

    let mut combined = ciphertext;
    combined.extend_from_slice(&tag);

    let plaintext = cipher
        .decrypt(nonce, combined.as_ref())
        .map_err(|_| AuthError::Integrity)?;

    String::from_utf8(plaintext).map_err(|_| AuthError::Integrity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let sealed = encrypt("mfa-secret-material", KEY, 1).unwrap();
        assert_eq!(sealed.key_version, 1);
        assert_eq!(decrypt(&sealed, KEY).unwrap(), "mfa-secret-material");
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let a = encrypt("same plaintext", KEY, 1).unwrap();
        let b = encrypt("same plaintext", KEY, 1).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_length_rejected() {
        assert!(matches!(
            encrypt("data", b"short-key", 1),
            Err(AuthError::InvalidKey)
        ));

        let sealed = encrypt("data", KEY, 1).unwrap();
        assert!(matches!(
            decrypt(&sealed, b"short-key"),
            Err(AuthError::InvalidKey)
        ));
    }

    #[test]
    fn test_wrong_key_fails_integrity() {
        let sealed = encrypt("data", KEY, 1).unwrap();
        let other_key = b"fedcba9876543210fedcba9876543210";
        assert!(matches!(
            decrypt(&sealed, other_key),
            Err(AuthError::Integrity)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails_integrity() {
        let mut sealed = encrypt("data worth protecting", KEY, 1).unwrap();
        let mut raw = Base64::decode_vec(&sealed.ciphertext).unwrap();
        raw[0] ^= 0x01;
        sealed.ciphertext = Base64::encode_string(&raw);

        assert!(matches!(decrypt(&sealed, KEY), Err(AuthError::Integrity)));
    }

    #[test]
    fn test_tampered_tag_fails_integrity() {
        let mut sealed = encrypt("data", KEY, 1).unwrap();
        let mut tag = Base64::decode_vec(&sealed.auth_tag).unwrap();
        tag[0] ^= 0x01;
        sealed.auth_tag = Base64::encode_string(&tag);

        assert!(matches!(decrypt(&sealed, KEY), Err(AuthError::Integrity)));
    }

    #[test]
    fn test_undecodable_fields_fail_integrity() {
        let sealed = encrypt("data", KEY, 1).unwrap();

        let bad_iv = EncryptedSecret {
            iv: "!!not-base64!!".to_string(),
            ..sealed.clone()
        };
        assert!(matches!(decrypt(&bad_iv, KEY), Err(AuthError::Integrity)));

        let short_iv = EncryptedSecret {
            iv: Base64::encode_string(&[0u8; 8]),
            ..sealed
        };
        assert!(matches!(decrypt(&short_iv, KEY), Err(AuthError::Integrity)));
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let sealed = encrypt("", KEY, 3).unwrap();
        assert_eq!(decrypt(&sealed, KEY).unwrap(), "");
    }
}
