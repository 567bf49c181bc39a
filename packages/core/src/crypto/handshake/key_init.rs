//! Key-init бандлы
//!
//! Identity публикует подписанный бандл, внутри которого зашифрован
//! `SessionAnchor` с одноразовым ключом обмена. Ключ шифрования якоря
//! выводится из хеша ключа подписи, поэтому прочитать якорь может только
//! тот, кто знает identity владельца. Приватная часть ключа остаётся у
//! владельца и кладётся в `KeyStore` как private key entry.

use crate::config::Config;
use crate::crypto::keys::{Identity, KeyEntry, KeyFunction};
use crate::crypto::{ActiveSuite, CryptoProvider};
use crate::error::{CryptoError, KeyInitError};
use crate::utils::{b64, serialization, time};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const KEY_INIT_VERSION: &str = "1.0";

/// Ключи для асинхронного начала сессии
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAnchor {
    /// Последний хоп mix-сети до владельца
    pub mix_address: String,
    pub nym_address: String,
    /// Только публичные части
    pub pf_keys: Vec<KeyEntry>,
}

impl SessionAnchor {
    pub fn key_entry(&self, function: KeyFunction) -> Result<&KeyEntry, KeyInitError> {
        self.pf_keys
            .iter()
            .find(|entry| entry.function == function)
            .ok_or(KeyInitError::NoKeyEntry)
    }
}

/// Подписываемая часть бандла
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInitContents {
    pub version: String,
    /// Для версии 1.0 всегда 0
    pub msg_count: u64,
    pub not_after: u64,
    pub not_before: u64,
    pub fallback: bool,
    /// base64(H(H(sig_pub)))
    pub sig_key_hash: String,
    pub repo_uri: String,
    /// base64(nonce | AEAD(H(sig_pub)[..32], json(SessionAnchor)))
    pub session_anchor: String,
    /// base64(H(json(SessionAnchor)))
    pub session_anchor_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInit {
    pub contents: KeyInitContents,
    /// base64 подписи над json(contents)
    pub signature: String,
}

fn anchor_key(sig_pub: &[u8; 32]) -> [u8; 64] {
    ActiveSuite::hash(sig_pub)
}

fn sig_key_hash(sig_pub: &[u8; 32]) -> String {
    b64::encode(&ActiveSuite::hash(&anchor_key(sig_pub)))
}

fn decode(field: &str) -> Result<Vec<u8>, KeyInitError> {
    b64::decode(field)
        .map_err(|e| KeyInitError::Crypto(CryptoError::DeserializationError(e)))
}

impl Identity {
    /// Создаёт key-init бандл. Возвращает его и key entry с приватной
    /// частью, который нужно сохранить как private key entry.
    #[allow(clippy::too_many_arguments)]
    pub fn key_init(
        &self,
        msg_count: u64,
        not_after: u64,
        not_before: u64,
        fallback: bool,
        repo_uri: &str,
        mix_address: &str,
        nym_address: &str,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(KeyInit, KeyEntry), KeyInitError> {
        let now = time::now_secs();
        if not_before >= not_after {
            return Err(KeyInitError::InvalidTimes);
        }
        if not_after < now {
            return Err(KeyInitError::Expired);
        }
        if not_after > now.saturating_add(Config::global().key_init_max_not_after_secs) {
            return Err(KeyInitError::Future);
        }

        let entry = KeyEntry::generate(KeyFunction::Ecdhe25519, not_before, not_after, rng)?;
        let anchor = SessionAnchor {
            mix_address: mix_address.to_string(),
            nym_address: nym_address.to_string(),
            pf_keys: vec![entry.public_only()],
        };
        let anchor_json = serialization::to_json(&anchor)?;

        let key = anchor_key(self.sig_pub());
        let nonce = ActiveSuite::random_bytes(rng, ActiveSuite::NONCE_LEN)?;
        let mut sealed = nonce.clone();
        sealed.extend(ActiveSuite::aead_encrypt(&key[..32], &nonce, &anchor_json, None)?);

        let contents = KeyInitContents {
            version: KEY_INIT_VERSION.to_string(),
            msg_count,
            not_after,
            not_before,
            fallback,
            sig_key_hash: sig_key_hash(self.sig_pub()),
            repo_uri: repo_uri.to_string(),
            session_anchor: b64::encode(&sealed),
            session_anchor_hash: b64::encode(&ActiveSuite::hash(&anchor_json)),
        };
        let signature = self.sign(&serialization::to_json(&contents)?)?;

        debug!(
            target: "crypto::handshake",
            identity = %self.name(),
            key = %entry.hash,
            not_after,
            "Created key-init"
        );

        Ok((
            KeyInit {
                contents,
                signature: b64::encode(&signature),
            },
            entry,
        ))
    }
}

impl KeyInit {
    pub fn to_json(&self) -> Result<Vec<u8>, KeyInitError> {
        Ok(serialization::to_json(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, KeyInitError> {
        Ok(serialization::from_json(bytes)?)
    }

    pub fn msg_count(&self) -> u64 {
        self.contents.msg_count
    }

    pub fn sig_key_hash(&self) -> &str {
        &self.contents.sig_key_hash
    }

    /// Расшифровывает якорь ключом, выведенным из `sig_pub`
    pub fn session_anchor(&self, sig_pub: &[u8; 32]) -> Result<SessionAnchor, KeyInitError> {
        if self.contents.sig_key_hash != sig_key_hash(sig_pub) {
            return Err(KeyInitError::WrongSigKeyHash);
        }
        let sealed = decode(&self.contents.session_anchor)?;
        if sealed.len() < ActiveSuite::NONCE_LEN {
            return Err(KeyInitError::SessionAnchor);
        }
        let (nonce, ciphertext) = sealed.split_at(ActiveSuite::NONCE_LEN);
        let key = anchor_key(sig_pub);
        let anchor_json = ActiveSuite::aead_decrypt(&key[..32], nonce, ciphertext, None)
            .map_err(|_| KeyInitError::SessionAnchor)?;
        if self.contents.session_anchor_hash != b64::encode(&ActiveSuite::hash(&anchor_json)) {
            return Err(KeyInitError::SessionAnchor);
        }
        Ok(serialization::from_json(&anchor_json)?)
    }

    pub fn key_entry_ecdhe25519(&self, sig_pub: &[u8; 32]) -> Result<KeyEntry, KeyInitError> {
        let anchor = self.session_anchor(sig_pub)?;
        let entry = anchor.key_entry(KeyFunction::Ecdhe25519)?.clone();
        Ok(entry)
    }

    /// Проверяет бандл против списка допустимых репозиториев и ключа подписи владельца
    pub fn verify(&self, repo_uris: &[&str], sig_pub: &[u8; 32]) -> Result<(), KeyInitError> {
        if !repo_uris.contains(&self.contents.repo_uri.as_str()) {
            return Err(KeyInitError::RepoUri(self.contents.repo_uri.clone()));
        }

        let anchor = self.session_anchor(sig_pub)?;
        let entry = anchor.key_entry(KeyFunction::Ecdhe25519)?;
        if !entry.verify() {
            return Err(KeyInitError::InvalidKeyEntry);
        }

        if self.contents.not_before >= self.contents.not_after {
            return Err(KeyInitError::InvalidTimes);
        }
        if self.contents.not_after < time::now_secs() {
            return Err(KeyInitError::Expired);
        }

        let signature = decode(&self.signature)?;
        let message = serialization::to_json(&self.contents)?;
        ActiveSuite::verify(sig_pub, &message, &signature).map_err(|e| {
            warn!(target: "crypto::handshake", error = %e, "Invalid key-init signature");
            KeyInitError::InvalidSignature
        })
    }

    /// Проверки, зависящие от версии
    pub fn check(&self) -> Result<(), KeyInitError> {
        if self.contents.version != KEY_INIT_VERSION {
            return Err(KeyInitError::InvalidVersion(self.contents.version.clone()));
        }
        if self.contents.msg_count != 0 {
            return Err(KeyInitError::InvalidMsgCount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    const REPO: &str = "keyinit.hush.example";

    fn bundle() -> (Identity, KeyInit, KeyEntry) {
        let bob = Identity::generate("bob@hush", &mut OsRng).unwrap();
        let now = time::now_secs();
        let (key_init, entry) = bob
            .key_init(0, now + 3600, now - 60, false, REPO, "mix.hush", "bob-nym", &mut OsRng)
            .unwrap();
        (bob, key_init, entry)
    }

    #[test]
    fn test_key_init_verifies() {
        let (bob, key_init, entry) = bundle();
        key_init.check().unwrap();
        key_init.verify(&[REPO], bob.sig_pub()).unwrap();

        let published = key_init.key_entry_ecdhe25519(bob.sig_pub()).unwrap();
        assert_eq!(published, entry);
        assert!(!published.has_private_key());
        assert_eq!(key_init.session_anchor(bob.sig_pub()).unwrap().nym_address, "bob-nym");
    }

    #[test]
    fn test_key_init_json_roundtrip() {
        let (bob, key_init, _) = bundle();
        let parsed = KeyInit::from_json(&key_init.to_json().unwrap()).unwrap();
        assert_eq!(parsed, key_init);
        parsed.verify(&[REPO], bob.sig_pub()).unwrap();
    }

    #[test]
    fn test_key_init_wrong_signer() {
        let (_, key_init, _) = bundle();
        let mallory = Identity::generate("mallory@hush", &mut OsRng).unwrap();
        assert!(matches!(
            key_init.verify(&[REPO], mallory.sig_pub()),
            Err(KeyInitError::WrongSigKeyHash)
        ));
    }

    #[test]
    fn test_key_init_tampered_contents() {
        let (bob, mut key_init, _) = bundle();
        key_init.contents.fallback = true;
        assert!(matches!(
            key_init.verify(&[REPO], bob.sig_pub()),
            Err(KeyInitError::InvalidSignature)
        ));
    }

    #[test]
    fn test_key_init_unknown_repo() {
        let (bob, key_init, _) = bundle();
        assert!(matches!(
            key_init.verify(&["other.example"], bob.sig_pub()),
            Err(KeyInitError::RepoUri(_))
        ));
    }

    #[test]
    fn test_key_init_times() {
        let bob = Identity::generate("bob@hush", &mut OsRng).unwrap();
        let now = time::now_secs();
        let create = |not_after: u64, not_before: u64| {
            bob.key_init(0, not_after, not_before, false, REPO, "", "", &mut OsRng)
        };
        assert!(matches!(create(now + 10, now + 10), Err(KeyInitError::InvalidTimes)));
        assert!(matches!(create(now - 10, now - 20), Err(KeyInitError::Expired)));
        assert!(matches!(
            create(now + 91 * 24 * 60 * 60, now),
            Err(KeyInitError::Future)
        ));
    }

    #[test]
    fn test_key_init_check() {
        let (_, mut key_init, _) = bundle();
        key_init.contents.msg_count = 1;
        assert!(matches!(key_init.check(), Err(KeyInitError::InvalidMsgCount)));
        key_init.contents.version = "2.0".to_string();
        assert!(matches!(key_init.check(), Err(KeyInitError::InvalidVersion(_))));
    }
}
