//! At-rest protection for account numbers and IBANs: AES-256-GCM for the
//! value itself, keyed HMAC-SHA256 fingerprints for equality checks (dedup)
//! without decryption.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct SecretBox {
    cipher: Aes256Gcm,
    hmac_key: Vec<u8>,
}

impl SecretBox {
    /// `key_b64` is a base64-encoded 32-byte key from the service config; the
    /// same key feeds both the cipher and the fingerprint MAC.
    pub fn new(key_b64: &str) -> Result<Self> {
        let key_bytes = base64::decode(key_b64).context("Secret key is not valid base64")?;
        anyhow::ensure!(
            key_bytes.len() == 32,
            "Secret key must decode to 32 bytes, got {}",
            key_bytes.len()
        );
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
        Ok(Self {
            cipher,
            hmac_key: key_bytes,
        })
    }

    /// nonce || ciphertext, suitable for a bytea column.
    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("encryption failed: {e}"))?;
        let mut out = nonce.to_vec();
        out.extend(ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, blob: &[u8]) -> Result<String> {
        anyhow::ensure!(blob.len() > NONCE_LEN, "ciphertext too short");
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| anyhow::anyhow!("decryption failed: {e}"))?;
        String::from_utf8(plaintext).context("decrypted value is not utf-8")
    }

    /// Deterministic fingerprint for dedup; whitespace-insensitive so the
    /// same IBAN pasted with spaces matches.
    pub fn fingerprint(&self, value: &str) -> String {
        let normalized: String = value.split_whitespace().collect();
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hmac_key)
            .expect("HMAC accepts any key length");
        mac.update(normalized.to_uppercase().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_box() -> SecretBox {
        SecretBox::new(&base64::encode([7u8; 32])).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let sb = test_box();
        let blob = sb.encrypt("PL61109010140000071219812874").unwrap();
        assert_eq!(sb.decrypt(&blob).unwrap(), "PL61109010140000071219812874");
    }

    #[test]
    fn test_fingerprint_normalizes_whitespace_and_case() {
        let sb = test_box();
        let a = sb.fingerprint("PL61 1090 1014 0000 0712 1981 2874");
        let b = sb.fingerprint("pl61109010140000071219812874");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_for_different_values() {
        let sb = test_box();
        assert_ne!(sb.fingerprint("A"), sb.fingerprint("B"));
    }

    #[test]
    fn test_rejects_short_key() {
        assert!(SecretBox::new(&base64::encode([1u8; 16])).is_err());
        assert!(SecretBox::new("not-base64!!!").is_err());
    }
}
