//! AES-256-GCM encryption for stored secrets.
//!
//! Every call derives a fresh key from the master key string with PBKDF2-HMAC-SHA512
//! over a random salt, then encrypts with a random 16-byte IV. The record is stored as
//! `salt:iv:tag:ciphertext`, each field hex-encoded.

use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{consts::U16, AeadInPlace, KeyInit},
    aes::Aes256,
    AesGcm, Nonce, Tag,
};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha512;
use thiserror::Error;

/// AES-256-GCM with a 128-bit IV (the stock `Aes256Gcm` alias fixes 96 bits).
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Size of the derived key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the random salt fed to PBKDF2
const SALT_SIZE: usize = 64;

/// Size of the IV in bytes
const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// PBKDF2 iteration count
const ITERATIONS: u32 = 100_000;

const DELIMITER: char = ':';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encrypted record is malformed: {0}")]
    MalformedRecord(String),

    /// Wrong key, tampered ciphertext or corrupted tag.
    #[error("authentication tag verification failed")]
    Integrity,

    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,

    #[error("encryption failed")]
    Encryption,
}

/// On-disk form of an encrypted secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for EncryptedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{d}{}{d}{}{d}{}",
            hex::encode(&self.salt),
            hex::encode(&self.iv),
            hex::encode(&self.tag),
            hex::encode(&self.ciphertext),
            d = DELIMITER
        )
    }
}

impl FromStr for EncryptedRecord {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(DELIMITER).collect();
        if parts.len() != 4 {
            return Err(CryptoError::MalformedRecord(format!(
                "expected 4 fields, got {}",
                parts.len()
            )));
        }

        let decode = |name: &str, value: &str| {
            hex::decode(value)
                .map_err(|e| CryptoError::MalformedRecord(format!("{} is not valid hex: {}", name, e)))
        };

        let record = Self {
            salt: decode("salt", parts[0])?,
            iv: decode("iv", parts[1])?,
            tag: decode("tag", parts[2])?,
            ciphertext: decode("ciphertext", parts[3])?,
        };

        if record.salt.is_empty() {
            return Err(CryptoError::MalformedRecord("salt is empty".to_string()));
        }
        if record.iv.len() != IV_SIZE {
            return Err(CryptoError::MalformedRecord(format!(
                "invalid IV size: expected {}, got {}",
                IV_SIZE,
                record.iv.len()
            )));
        }
        if record.tag.len() != TAG_SIZE {
            return Err(CryptoError::MalformedRecord(format!(
                "invalid tag size: expected {}, got {}",
                TAG_SIZE,
                record.tag.len()
            )));
        }

        Ok(record)
    }
}

fn derive_cipher(master_key: &str, salt: &[u8]) -> Result<Aes256Gcm16, CryptoError> {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha512>(master_key.as_bytes(), salt, ITERATIONS, &mut key);
    Aes256Gcm16::new_from_slice(&key).map_err(|_| CryptoError::Encryption)
}

/// Encrypts `plaintext` under a key derived from `master_key`.
///
/// Salt and IV are single-use random values, so encrypting the same input twice
/// yields two different records.
pub fn encrypt(plaintext: &str, master_key: &str) -> Result<String, CryptoError> {
    let mut salt = vec![0u8; SALT_SIZE];
    let mut iv = vec![0u8; IV_SIZE];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let cipher = derive_cipher(master_key, &salt)?;

    let mut buffer = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
        .map_err(|_| CryptoError::Encryption)?;

    let record = EncryptedRecord {
        salt,
        iv,
        tag: tag.to_vec(),
        ciphertext: buffer,
    };

    Ok(record.to_string())
}

/// Decrypts a `salt:iv:tag:ciphertext` record.
///
/// # Returns
/// * `Ok(String)` - Plaintext, only after the tag verified
/// * `Err(CryptoError::MalformedRecord)` - Not 4 fields, bad hex or bad sizes
/// * `Err(CryptoError::Integrity)` - Wrong key or tampered data
pub fn decrypt(record: &str, master_key: &str) -> Result<String, CryptoError> {
    let record: EncryptedRecord = record.parse()?;

    let cipher = derive_cipher(master_key, &record.salt)?;

    let mut buffer = record.ciphertext;
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(&record.iv),
            b"",
            &mut buffer,
            Tag::<U16>::from_slice(&record.tag),
        )
        .map_err(|_| CryptoError::Integrity)?;

    String::from_utf8(buffer).map_err(|_| CryptoError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "correct horse battery staple";

    fn flip_hex_char(record: &str, index: usize) -> String {
        let mut chars: Vec<char> = record.chars().collect();
        chars[index] = if chars[index] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for plaintext in ["my-secret-access-token-12345", "", "ñandú 🦀 {\"json\":true}"] {
            let record = encrypt(plaintext, KEY).expect("Encryption failed");
            assert_eq!(decrypt(&record, KEY).expect("Decryption failed"), plaintext);
        }
    }

    #[test]
    fn test_record_layout() {
        let record = encrypt("secret", KEY).unwrap();
        let parts: Vec<&str> = record.split(':').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].len(), SALT_SIZE * 2);
        assert_eq!(parts[1].len(), IV_SIZE * 2);
        assert_eq!(parts[2].len(), TAG_SIZE * 2);
        assert_eq!(parts[3].len(), "secret".len() * 2);
    }

    #[test]
    fn test_encryption_is_not_deterministic() {
        let first = encrypt("same-plaintext", KEY).unwrap();
        let second = encrypt("same-plaintext", KEY).unwrap();

        assert_ne!(first, second);
        assert_eq!(decrypt(&first, KEY).unwrap(), "same-plaintext");
        assert_eq!(decrypt(&second, KEY).unwrap(), "same-plaintext");
    }

    #[test]
    fn test_wrong_key_fails() {
        let record = encrypt("secret", KEY).unwrap();
        assert_eq!(decrypt(&record, "another key"), Err(CryptoError::Integrity));
    }

    #[test]
    fn test_tampered_ciphertext_and_tag_fail() {
        let record = encrypt("a longer secret value", KEY).unwrap();
        let tag_start = (SALT_SIZE + IV_SIZE) * 2 + 2;
        let ciphertext_start = tag_start + TAG_SIZE * 2 + 1;

        for index in [tag_start, tag_start + 17, ciphertext_start, record.len() - 1] {
            let tampered = flip_hex_char(&record, index);
            assert_eq!(decrypt(&tampered, KEY), Err(CryptoError::Integrity), "index {}", index);
        }
    }

    #[test]
    fn test_malformed_records_rejected() {
        let record = encrypt("secret", KEY).unwrap();

        assert!(matches!(
            decrypt("not-an-encrypted-record", KEY),
            Err(CryptoError::MalformedRecord(_))
        ));
        assert!(matches!(
            decrypt(&format!("{}:extra", record), KEY),
            Err(CryptoError::MalformedRecord(_))
        ));
        assert!(matches!(
            decrypt("zz:00:00:00", KEY),
            Err(CryptoError::MalformedRecord(_))
        ));

        // Truncated IV
        let parts: Vec<&str> = record.split(':').collect();
        let short_iv = format!("{}:{}:{}:{}", parts[0], &parts[1][..8], parts[2], parts[3]);
        assert!(matches!(decrypt(&short_iv, KEY), Err(CryptoError::MalformedRecord(_))));
    }

    #[test]
    fn test_record_parse_display() {
        let record = encrypt("secret", KEY).unwrap();
        let parsed: EncryptedRecord = record.parse().unwrap();
        assert_eq!(parsed.to_string(), record);
    }
}
