//! AES-256-GCM sealing for stored item values, using `ring`.
//!
//! Each item is sealed under the store's master key with a fresh random
//! 96-bit nonce. The item's `(service, account)` address is bound in as
//! associated data, so a ciphertext copied onto another row fails to open.
//!
//! PBKDF2-HMAC-SHA256 is used only to derive the key that wraps the master
//! key file (see [`crate::master_key`]).

use std::num::NonZeroU32;

use ring::aead::{self, Aad, BoundKey, NONCE_LEN, Nonce, NonceSequence, SealingKey, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{Result, StorageError};

/// Length of the AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN_BYTES: usize = NONCE_LEN;

/// Length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Length of the PBKDF2 salt in bytes.
pub const SALT_LEN: usize = 32;

const PBKDF2_ITERATIONS: NonZeroU32 = NonZeroU32::new(600_000).unwrap();

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

static AEAD_ALG: &aead::Algorithm = &aead::AES_256_GCM;

/// Yields one nonce, then refuses. Every seal/open builds a fresh key.
struct SingleNonce(Option<[u8; NONCE_LEN_BYTES]>);

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

/// Associated data for an item: `service`, a NUL separator, then `account`.
pub fn item_aad(service: &str, account: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(service.len() + account.len() + 1);
    aad.extend_from_slice(service.as_bytes());
    aad.push(0);
    aad.extend_from_slice(account.as_bytes());
    aad
}

/// Seal `plaintext` under `key`, authenticating `aad` alongside it.
///
/// Returns `(nonce, ciphertext || tag)`.
pub fn seal(plaintext: &[u8], key: &[u8], aad: &[u8]) -> Result<([u8; NONCE_LEN_BYTES], Vec<u8>)> {
    if key.len() != KEY_LEN {
        return Err(StorageError::EncryptionFailed {
            reason: format!("key must be {} bytes, got {}", KEY_LEN, key.len()),
        });
    }

    let mut nonce = [0u8; NONCE_LEN_BYTES];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| StorageError::EncryptionFailed {
            reason: "failed to generate random nonce".into(),
        })?;

    let unbound = UnboundKey::new(AEAD_ALG, key).map_err(|_| StorageError::EncryptionFailed {
        reason: "failed to create AES-256-GCM key".into(),
    })?;
    let mut sealing_key = SealingKey::new(unbound, SingleNonce(Some(nonce)));

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(Aad::from(aad), &mut in_out)
        .map_err(|_| StorageError::EncryptionFailed {
            reason: "seal_in_place failed".into(),
        })?;

    Ok((nonce, in_out))
}

/// Open a ciphertext produced by [`seal`] with the same `key` and `aad`.
pub fn open(nonce: &[u8], ciphertext: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if key.len() != KEY_LEN {
        return Err(StorageError::DecryptionFailed {
            reason: format!("key must be {} bytes, got {}", KEY_LEN, key.len()),
        });
    }
    let nonce: [u8; NONCE_LEN_BYTES] =
        nonce.try_into().map_err(|_| StorageError::DecryptionFailed {
            reason: format!("nonce is {} bytes, expected {}", nonce.len(), NONCE_LEN_BYTES),
        })?;

    let unbound = UnboundKey::new(AEAD_ALG, key).map_err(|_| StorageError::DecryptionFailed {
        reason: "failed to create AES-256-GCM key".into(),
    })?;
    let mut opening_key = aead::OpeningKey::new(unbound, SingleNonce(Some(nonce)));

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening_key
        .open_in_place(Aad::from(aad), &mut in_out)
        .map_err(|_| StorageError::DecryptionFailed {
            reason: "authentication failed, wrong key or corrupted data".into(),
        })?;

    Ok(plaintext.to_vec())
}

/// Derive a 256-bit key from `material` and `salt` with PBKDF2-HMAC-SHA256.
pub fn derive_key(material: &[u8], salt: &[u8]) -> [u8; KEY_LEN] {
    let mut out = [0u8; KEY_LEN];
    pbkdf2::derive(PBKDF2_ALG, PBKDF2_ITERATIONS, salt, material, &mut out);
    out
}

/// Generate `len` cryptographically secure random bytes.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| StorageError::Internal("failed to generate random bytes".into()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = random_bytes(KEY_LEN).unwrap();
        let aad = item_aad("cap_sec", "token");

        let (nonce, ciphertext) = seal(b"s3cret", &key, &aad).unwrap();
        assert_eq!(ciphertext.len(), b"s3cret".len() + TAG_LEN);

        let plaintext = open(&nonce, &ciphertext, &key, &aad).unwrap();
        assert_eq!(plaintext, b"s3cret");
    }

    #[test]
    fn ciphertext_is_bound_to_its_address() {
        let key = random_bytes(KEY_LEN).unwrap();
        let (nonce, ciphertext) = seal(b"v", &key, &item_aad("cap_sec", "a")).unwrap();

        let moved = open(&nonce, &ciphertext, &key, &item_aad("cap_sec", "b"));
        assert!(matches!(moved, Err(StorageError::DecryptionFailed { .. })));
    }

    #[test]
    fn wrong_key_fails() {
        let key1 = random_bytes(KEY_LEN).unwrap();
        let key2 = random_bytes(KEY_LEN).unwrap();
        let (nonce, ciphertext) = seal(b"v", &key1, b"").unwrap();
        assert!(open(&nonce, &ciphertext, &key2, b"").is_err());
    }

    #[test]
    fn short_key_and_nonce_rejected() {
        assert!(seal(b"v", &[0u8; 16], b"").is_err());

        let key = random_bytes(KEY_LEN).unwrap();
        let (_, ciphertext) = seal(b"v", &key, b"").unwrap();
        assert!(matches!(
            open(&[0u8; 4], &ciphertext, &key, b""),
            Err(StorageError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        assert_eq!(derive_key(b"host+user", &salt), derive_key(b"host+user", &salt));
        assert_ne!(derive_key(b"host+user", &salt), derive_key(b"other", &salt));
    }
}
