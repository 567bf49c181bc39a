// Модели данных для хранилища

use crate::crypto::keys::{KeyEntry, MessageKey, PublicIdentity};
use crate::crypto::messaging::ratchet::SessionState;
use crate::crypto::{ActiveSuite, CryptoProvider};
use zeroize::Zeroizing;

/// Ключ состояния сессии: пара (локальная identity, собеседник)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionStateKey {
    pub local: PublicIdentity,
    pub peer: PublicIdentity,
}

impl SessionStateKey {
    pub fn new(local: PublicIdentity, peer: PublicIdentity) -> Self {
        Self { local, peer }
    }
}

/// Ключ одной сессии: (local, peer, hash пары сессионных ключей)
///
/// Пара упорядочена: сначала ключ инициатора, затем ключ получателя.
/// Сессии (X, Y) и (Y, X) разные, у них разные корневые ключи.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub local: PublicIdentity,
    pub peer: PublicIdentity,
    pub session_hash: [u8; 64],
}

impl SessionKey {
    pub fn new(
        local: PublicIdentity,
        peer: PublicIdentity,
        initiator_pub: &[u8; 32],
        responder_pub: &[u8; 32],
    ) -> Self {
        Self {
            local,
            peer,
            session_hash: session_hash(initiator_pub, responder_pub),
        }
    }

    pub fn state_key(&self) -> SessionStateKey {
        SessionStateKey::new(self.local.clone(), self.peer.clone())
    }
}

/// SHA-512(initiator_pub | responder_pub)
pub fn session_hash(initiator_pub: &[u8; 32], responder_pub: &[u8; 32]) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(initiator_pub);
    buf[32..].copy_from_slice(responder_pub);
    ActiveSuite::hash(&buf)
}

/// Новая сессия: корневой хеш, продвинутый chain key и обе цепочки ключей
#[derive(Debug, Clone)]
pub struct NewSession {
    pub key: SessionKey,
    pub root_key_hash: [u8; 64],
    pub chain_key: Zeroizing<Vec<u8>>,
    pub send: Vec<MessageKey>,
    pub recv: Vec<MessageKey>,
}

/// Использованный ключ сообщения
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedKey {
    pub session: SessionKey,
    pub sender: bool,
    pub index: usize,
}

/// Всё, что одна операция encrypt/decrypt пишет в хранилище.
/// Применяется целиком через `KeyStore::apply`.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub state_key: SessionStateKey,
    pub state: SessionState,
    /// Новые сессионные ключи с приватной частью и временем очистки
    pub session_keys: Vec<(KeyEntry, u64)>,
    pub new_session: Option<NewSession>,
    pub consumed: ConsumedKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_hash_depends_on_roles() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(session_hash(&a, &b), session_hash(&a, &b));
        // ключи A и B, но инициаторы разные: это две разные сессии
        assert_ne!(session_hash(&a, &b), session_hash(&b, &a));
        assert_ne!(session_hash(&a, &b), session_hash(&a, &a));
    }
}
