// Ключевой материал
// Key entries (эфемерные ключи с хешем и сроком действия), долгосрочные
// identity и одноразовые ключи сообщений

use crate::crypto::provider::CryptoProvider;
use crate::crypto::ActiveSuite;
use crate::error::CryptoError;
use crate::utils::b64;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const MESSAGE_KEY_LEN: usize = 64;

/// Назначение ключа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyFunction {
    #[serde(rename = "ECDHE25519")]
    Ecdhe25519,
}

impl KeyFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyFunction::Ecdhe25519 => "ECDHE25519",
        }
    }
}

/// Эфемерный ключ обмена: публичная часть, опционально приватная,
/// хеш публичного ключа (идентификатор) и окно действия
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyEntry {
    #[zeroize(skip)]
    pub hash: String,
    #[zeroize(skip)]
    pub function: KeyFunction,
    #[zeroize(skip)]
    pub public_key: [u8; 32],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_key: Option<[u8; 32]>,
    #[zeroize(skip)]
    pub not_before: u64,
    #[zeroize(skip)]
    pub not_after: u64,
}

impl fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEntry")
            .field("hash", &self.hash)
            .field("function", &self.function)
            .field("has_private_key", &self.private_key.is_some())
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .finish()
    }
}

impl PartialEq for KeyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.function == other.function
            && self.public_key == other.public_key
            && self.not_before == other.not_before
            && self.not_after == other.not_after
    }
}

impl Eq for KeyEntry {}

/// base64(SHA-512(public key))
pub fn key_hash(public_key: &[u8]) -> String {
    b64::encode(&ActiveSuite::hash(public_key))
}

fn to_key(bytes: Vec<u8>) -> Result<[u8; 32], CryptoError> {
    let mut bytes = bytes;
    let key: Result<[u8; 32], _> = bytes.as_slice().try_into();
    bytes.zeroize();
    key.map_err(|_| CryptoError::InvalidInputError("Invalid key length".to_string()))
}

impl KeyEntry {
    pub fn generate(
        function: KeyFunction,
        not_before: u64,
        not_after: u64,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Self, CryptoError> {
        let (private_key, public_key) = ActiveSuite::generate_kem_keys(rng)?;
        let public_key = to_key(public_key)?;
        Ok(Self {
            hash: key_hash(&public_key),
            function,
            public_key,
            private_key: Some(to_key(private_key)?),
            not_before,
            not_after,
        })
    }

    pub fn from_public(
        function: KeyFunction,
        public_key: [u8; 32],
        not_before: u64,
        not_after: u64,
    ) -> Self {
        Self {
            hash: key_hash(&public_key),
            function,
            public_key,
            private_key: None,
            not_before,
            not_after,
        }
    }

    /// Устанавливает приватный ключ; он обязан соответствовать публичному
    pub fn set_private_key(&mut self, private_key: [u8; 32]) -> Result<(), CryptoError> {
        let derived = ActiveSuite::from_private_key_to_public_key(&private_key)?;
        if derived.as_slice() != self.public_key {
            return Err(CryptoError::InvalidInputError(
                "private key does not match public key".to_string(),
            ));
        }
        self.private_key = Some(private_key);
        Ok(())
    }

    pub fn private_key(&self) -> Result<&[u8; 32], CryptoError> {
        self.private_key
            .as_ref()
            .ok_or_else(|| CryptoError::InvalidInputError(format!("no private key for {}", self.hash)))
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Копия без приватной части
    pub fn public_only(&self) -> Self {
        Self::from_public(self.function, self.public_key, self.not_before, self.not_after)
    }

    pub fn hash_bytes(&self) -> [u8; 64] {
        ActiveSuite::hash(&self.public_key)
    }

    /// Проверяет, что `hash` действительно хеш публичного ключа
    pub fn verify(&self) -> bool {
        self.hash == key_hash(&self.public_key)
    }

    pub fn is_valid_at(&self, now: u64) -> bool {
        self.not_before <= now && now < self.not_after
    }
}

/// Публичная часть identity: имя, ключ подписи, долгосрочный ключ обмена
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub name: String,
    pub sig_pub: [u8; 32],
    pub dh_pub: [u8; 32],
}

impl PublicIdentity {
    /// Та же ключевая пара, что и у `other` (подпись или обмен)
    pub fn shares_key_material(&self, other: &PublicIdentity) -> bool {
        self.sig_pub == other.sig_pub || self.dh_pub == other.dh_pub
    }
}

/// Локальная identity с приватными ключами
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Identity {
    #[zeroize(skip)]
    name: String,
    signing_key: [u8; 32],
    #[zeroize(skip)]
    sig_pub: [u8; 32],
    #[zeroize(skip)]
    dh: KeyEntry,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("sig_pub", &b64::encode(&self.sig_pub))
            .field("dh", &self.dh.hash)
            .finish()
    }
}

impl Identity {
    pub fn generate(name: &str, rng: &mut dyn CryptoRngCore) -> Result<Self, CryptoError> {
        let (signing_key, sig_pub) = ActiveSuite::generate_signature_keys(rng)?;
        let dh = KeyEntry::generate(KeyFunction::Ecdhe25519, 0, u64::MAX, rng)?;
        Ok(Self {
            name: name.to_string(),
            signing_key: to_key(signing_key)?,
            sig_pub: to_key(sig_pub)?,
            dh,
        })
    }

    pub fn from_keys(
        name: &str,
        signing_key: [u8; 32],
        dh_private: [u8; 32],
    ) -> Result<Self, CryptoError> {
        let sig_pub = to_key(ActiveSuite::from_signature_private_to_public(&signing_key)?)?;
        let dh_pub = to_key(ActiveSuite::from_private_key_to_public_key(&dh_private)?)?;
        let mut dh = KeyEntry::from_public(KeyFunction::Ecdhe25519, dh_pub, 0, u64::MAX);
        dh.set_private_key(dh_private)?;
        Ok(Self {
            name: name.to_string(),
            signing_key,
            sig_pub,
            dh,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sig_pub(&self) -> &[u8; 32] {
        &self.sig_pub
    }

    pub fn dh(&self) -> &KeyEntry {
        &self.dh
    }

    pub fn signing_key(&self) -> &[u8; 32] {
        &self.signing_key
    }

    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            name: self.name.clone(),
            sig_pub: self.sig_pub,
            dh_pub: self.dh.public_key,
        }
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        ActiveSuite::sign(&self.signing_key, message)
    }
}

/// Одноразовый ключ сообщения: 32 байта ключа AEAD и nonce из следующих 12
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MessageKey([u8; MESSAGE_KEY_LEN]);

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageKey(..)")
    }
}

impl MessageKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; MESSAGE_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidInputError("Invalid message key length".to_string()))?;
        Ok(Self(key))
    }

    pub fn aead_key(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn nonce(&self) -> &[u8] {
        &self.0[32..32 + ActiveSuite::NONCE_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; MESSAGE_KEY_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_key_entry_hash_and_private_key() {
        let entry = KeyEntry::generate(KeyFunction::Ecdhe25519, 0, 100, &mut OsRng).unwrap();
        assert!(entry.verify());
        assert!(entry.has_private_key());

        let mut public = entry.public_only();
        assert!(!public.has_private_key());
        assert_eq!(public, entry);

        let private = *entry.private_key().unwrap();
        public.set_private_key(private).unwrap();
        assert!(public.has_private_key());

        let other = KeyEntry::generate(KeyFunction::Ecdhe25519, 0, 100, &mut OsRng).unwrap();
        let mut mismatched = entry.public_only();
        assert!(mismatched.set_private_key(*other.private_key().unwrap()).is_err());
    }

    #[test]
    fn test_key_entry_tampered_hash() {
        let mut entry = KeyEntry::generate(KeyFunction::Ecdhe25519, 0, 100, &mut OsRng).unwrap();
        entry.public_key[0] ^= 1;
        assert!(!entry.verify());
    }

    #[test]
    fn test_key_entry_validity_window() {
        let entry = KeyEntry::from_public(KeyFunction::Ecdhe25519, [9u8; 32], 10, 20);
        assert!(!entry.is_valid_at(9));
        assert!(entry.is_valid_at(10));
        assert!(!entry.is_valid_at(20));
    }

    #[test]
    fn test_identity_from_keys_roundtrip() {
        let alice = Identity::generate("alice@hush", &mut OsRng).unwrap();
        let restored = Identity::from_keys(
            "alice@hush",
            *alice.signing_key(),
            *alice.dh().private_key().unwrap(),
        )
        .unwrap();
        assert_eq!(restored.public(), alice.public());
    }

    #[test]
    fn test_shares_key_material() {
        let alice = Identity::generate("alice@hush", &mut OsRng).unwrap().public();
        let bob = Identity::generate("bob@hush", &mut OsRng).unwrap().public();
        assert!(!alice.shares_key_material(&bob));

        let mut impostor = bob.clone();
        impostor.sig_pub = alice.sig_pub;
        assert!(alice.shares_key_material(&impostor));
    }
}
