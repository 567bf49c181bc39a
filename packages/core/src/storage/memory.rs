// In-memory хранилище для тестов и как эталон контракта KeyStore

use crate::crypto::keys::{KeyEntry, MessageKey, PublicIdentity};
use crate::crypto::messaging::ratchet::SessionState;
use crate::error::StoreError;
use crate::storage::models::*;
use crate::storage::KeyStore;
use std::collections::HashMap;
use tracing::{debug, trace};
use zeroize::Zeroizing;

/// Сессия: использованный ключ заменяется на `None`
struct StoredSession {
    root_key_hash: [u8; 64],
    chain_key: Zeroizing<Vec<u8>>,
    send: Vec<Option<MessageKey>>,
    recv: Vec<Option<MessageKey>>,
}

impl StoredSession {
    fn chain(&self, sender: bool) -> &[Option<MessageKey>] {
        if sender {
            &self.send
        } else {
            &self.recv
        }
    }

    fn chain_mut(&mut self, sender: bool) -> &mut Vec<Option<MessageKey>> {
        if sender {
            &mut self.send
        } else {
            &mut self.recv
        }
    }
}

struct StoredSessionKey {
    entry: KeyEntry,
    cleanup_time: u64,
}

/// In-memory хранилище
#[derive(Default)]
pub struct MemoryStorage {
    private_key_entries: HashMap<String, KeyEntry>,
    public_key_entries: HashMap<PublicIdentity, (KeyEntry, String)>,
    session_states: HashMap<SessionStateKey, SessionState>,
    sessions: HashMap<SessionKey, StoredSession>,
    session_keys: HashMap<String, StoredSessionKey>,
    last_session: Option<SessionKey>,
}

fn lookup_key(
    chain: &[Option<MessageKey>],
    index: usize,
) -> Result<MessageKey, StoreError> {
    match chain.get(index) {
        None => Err(StoreError::IndexOutOfRange {
            index,
            len: chain.len(),
        }),
        Some(None) => Err(StoreError::KeyAlreadyUsed { index }),
        Some(Some(key)) => Ok(key.clone()),
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // === Key-init ключи ===

    /// Сохраняет свой key-init ключ (с приватной частью)
    pub fn add_private_key_entry(&mut self, entry: KeyEntry) {
        self.private_key_entries.insert(entry.hash.clone(), entry);
    }

    /// Сохраняет опубликованный key-init ключ собеседника
    pub fn add_public_key_entry(&mut self, identity: PublicIdentity, entry: KeyEntry, nym_address: &str) {
        self.public_key_entries
            .insert(identity, (entry.public_only(), nym_address.to_string()));
    }

    // === Утилиты ===

    /// Хеш последней сохранённой сессии
    pub fn sender_session_pub_hash(&self) -> Option<[u8; 64]> {
        self.last_session.as_ref().map(|key| key.session_hash)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn clear_all(&mut self) {
        self.private_key_entries.clear();
        self.public_key_entries.clear();
        self.session_states.clear();
        self.sessions.clear();
        self.session_keys.clear();
        self.last_session = None;
    }

    fn session(&self, key: &SessionKey) -> Result<&StoredSession, StoreError> {
        self.sessions.get(key).ok_or(StoreError::NoSession)
    }

    fn check_update(&self, update: &SessionUpdate) -> Result<(), StoreError> {
        let consumed = &update.consumed;
        match &update.new_session {
            Some(session) if self.sessions.contains_key(&session.key) => {
                return Err(StoreError::SessionExists)
            }
            Some(session) if session.key == consumed.session => {
                let chain = if consumed.sender { &session.send } else { &session.recv };
                if consumed.index >= chain.len() {
                    return Err(StoreError::IndexOutOfRange {
                        index: consumed.index,
                        len: chain.len(),
                    });
                }
                return Ok(());
            }
            _ => {}
        }
        let chain = self.session(&consumed.session)?.chain(consumed.sender);
        lookup_key(chain, consumed.index).map(|_| ())
    }
}

impl KeyStore for MemoryStorage {
    fn get_session_state(&self, key: &SessionStateKey) -> Result<Option<SessionState>, StoreError> {
        Ok(self.session_states.get(key).cloned())
    }

    fn set_session_state(
        &mut self,
        key: &SessionStateKey,
        state: &SessionState,
    ) -> Result<(), StoreError> {
        self.session_states.insert(key.clone(), state.clone());
        Ok(())
    }

    fn store_session(
        &mut self,
        key: &SessionKey,
        root_key_hash: &[u8; 64],
        chain_key: &[u8],
        send: &[MessageKey],
        recv: &[MessageKey],
    ) -> Result<(), StoreError> {
        if self.sessions.contains_key(key) {
            return Err(StoreError::SessionExists);
        }
        self.sessions.insert(
            key.clone(),
            StoredSession {
                root_key_hash: *root_key_hash,
                chain_key: Zeroizing::new(chain_key.to_vec()),
                send: send.iter().cloned().map(Some).collect(),
                recv: recv.iter().cloned().map(Some).collect(),
            },
        );
        self.last_session = Some(key.clone());
        debug!(
            target: "storage::memory",
            peer = %key.peer.name,
            keys = send.len(),
            "Stored session"
        );
        Ok(())
    }

    fn has_session(&self, key: &SessionKey) -> Result<bool, StoreError> {
        Ok(self.sessions.contains_key(key))
    }

    fn get_private_key_entry(&self, hash: &str) -> Result<KeyEntry, StoreError> {
        self.private_key_entries
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::NoKeyEntry(hash.to_string()))
    }

    fn get_public_key_entry(
        &self,
        identity: &PublicIdentity,
    ) -> Result<(KeyEntry, String), StoreError> {
        self.public_key_entries
            .get(identity)
            .cloned()
            .ok_or_else(|| StoreError::NoKeyEntry(identity.name.clone()))
    }

    fn get_message_key(
        &self,
        key: &SessionKey,
        sender: bool,
        index: usize,
    ) -> Result<MessageKey, StoreError> {
        lookup_key(self.session(key)?.chain(sender), index)
    }

    fn num_message_keys(&self, key: &SessionKey) -> Result<usize, StoreError> {
        Ok(self.session(key)?.send.len())
    }

    fn get_root_key_hash(&self, key: &SessionKey) -> Result<[u8; 64], StoreError> {
        Ok(self.session(key)?.root_key_hash)
    }

    fn get_chain_key(&self, key: &SessionKey) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        Ok(self.session(key)?.chain_key.clone())
    }

    fn delete_message_key(
        &mut self,
        key: &SessionKey,
        sender: bool,
        index: usize,
    ) -> Result<(), StoreError> {
        let chain = self
            .sessions
            .get_mut(key)
            .ok_or(StoreError::NoSession)?
            .chain_mut(sender);
        let len = chain.len();
        match chain.get_mut(index) {
            None => Err(StoreError::IndexOutOfRange { index, len }),
            Some(None) => Err(StoreError::KeyAlreadyUsed { index }),
            Some(slot) => {
                *slot = None;
                trace!(target: "storage::memory", index, sender, "Deleted message key");
                Ok(())
            }
        }
    }

    fn add_session_key(&mut self, entry: &KeyEntry, cleanup_time: u64) -> Result<(), StoreError> {
        self.session_keys.insert(
            entry.hash.clone(),
            StoredSessionKey {
                entry: entry.clone(),
                cleanup_time,
            },
        );
        Ok(())
    }

    fn get_session_key(&self, hash: &str) -> Result<KeyEntry, StoreError> {
        self.session_keys
            .get(hash)
            .map(|stored| stored.entry.clone())
            .ok_or_else(|| StoreError::NoKeyEntry(hash.to_string()))
    }

    fn delete_private_session_key(&mut self, hash: &str) -> Result<(), StoreError> {
        let stored = self
            .session_keys
            .get_mut(hash)
            .ok_or_else(|| StoreError::NoKeyEntry(hash.to_string()))?;
        stored.entry = stored.entry.public_only();
        Ok(())
    }

    fn cleanup_session_keys(&mut self, before: u64) -> Result<usize, StoreError> {
        let initial = self.session_keys.len();
        self.session_keys
            .retain(|_, stored| stored.cleanup_time >= before);
        let removed = initial - self.session_keys.len();
        debug!(target: "storage::memory", removed, "Cleaned up session keys");
        Ok(removed)
    }

    /// Сначала проверяет всё обновление, потом пишет: при ошибке store не меняется
    fn apply(&mut self, update: &SessionUpdate) -> Result<(), StoreError> {
        self.check_update(update)?;

        for (entry, cleanup_time) in &update.session_keys {
            self.add_session_key(entry, *cleanup_time)?;
        }
        if let Some(session) = &update.new_session {
            self.store_session(
                &session.key,
                &session.root_key_hash,
                &session.chain_key,
                &session.send,
                &session.recv,
            )?;
        }
        self.delete_message_key(
            &update.consumed.session,
            update.consumed.sender,
            update.consumed.index,
        )?;
        self.set_session_state(&update.state_key, &update.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{Identity, KeyFunction};
    use rand::rngs::OsRng;

    fn session_fixture() -> (MemoryStorage, SessionKey) {
        let alice = Identity::generate("alice@hush", &mut OsRng).unwrap().public();
        let bob = Identity::generate("bob@hush", &mut OsRng).unwrap().public();
        let key = SessionKey::new(alice, bob, &[1u8; 32], &[2u8; 32]);
        let send: Vec<MessageKey> = (0..50u8)
            .map(|i| MessageKey::from_slice(&[i; 64]).unwrap())
            .collect();
        let recv: Vec<MessageKey> = (0..50u8)
            .map(|i| MessageKey::from_slice(&[i + 100; 64]).unwrap())
            .collect();

        let mut storage = MemoryStorage::new();
        storage
            .store_session(&key, &[7u8; 64], &[8u8; 32], &send, &recv)
            .unwrap();
        (storage, key)
    }

    #[test]
    fn test_message_key_used_once() {
        let (mut storage, key) = session_fixture();

        let first = storage.get_message_key(&key, true, 3).unwrap();
        assert_eq!(first.as_bytes(), &[3u8; 64]);
        storage.delete_message_key(&key, true, 3).unwrap();

        assert_eq!(
            storage.get_message_key(&key, true, 3).unwrap_err(),
            StoreError::KeyAlreadyUsed { index: 3 }
        );
        // recv chain untouched
        assert!(storage.get_message_key(&key, false, 3).is_ok());
    }

    #[test]
    fn test_index_out_of_range() {
        let (storage, key) = session_fixture();
        assert_eq!(storage.num_message_keys(&key).unwrap(), 50);
        assert_eq!(
            storage.get_message_key(&key, false, 50).unwrap_err(),
            StoreError::IndexOutOfRange { index: 50, len: 50 }
        );
    }

    #[test]
    fn test_session_accessors() {
        let (mut storage, key) = session_fixture();
        assert!(storage.has_session(&key).unwrap());
        assert_eq!(storage.get_root_key_hash(&key).unwrap(), [7u8; 64]);
        assert_eq!(storage.get_chain_key(&key).unwrap().as_slice(), &[8u8; 32]);
        assert_eq!(storage.sender_session_pub_hash(), Some(key.session_hash));
        assert_eq!(
            storage.store_session(&key, &[0u8; 64], &[], &[], &[]),
            Err(StoreError::SessionExists)
        );
    }

    #[test]
    fn test_session_key_lifecycle() {
        let mut storage = MemoryStorage::new();
        let old = KeyEntry::generate(KeyFunction::Ecdhe25519, 0, 100, &mut OsRng).unwrap();
        let fresh = KeyEntry::generate(KeyFunction::Ecdhe25519, 0, 100, &mut OsRng).unwrap();
        storage.add_session_key(&old, 10).unwrap();
        storage.add_session_key(&fresh, 1000).unwrap();

        storage.delete_private_session_key(&fresh.hash).unwrap();
        let stored = storage.get_session_key(&fresh.hash).unwrap();
        assert!(!stored.has_private_key());
        assert_eq!(stored.public_key, fresh.public_key);

        assert_eq!(storage.cleanup_session_keys(500).unwrap(), 1);
        assert!(storage.get_session_key(&old.hash).is_err());
        assert!(storage.get_session_key(&fresh.hash).is_ok());
    }

    #[test]
    fn test_key_entries() {
        let mut storage = MemoryStorage::new();
        let bob = Identity::generate("bob@hush", &mut OsRng).unwrap();
        let entry = KeyEntry::generate(KeyFunction::Ecdhe25519, 0, 100, &mut OsRng).unwrap();

        storage.add_private_key_entry(entry.clone());
        storage.add_public_key_entry(bob.public(), entry.clone(), "bob-nym");

        assert!(storage.get_private_key_entry(&entry.hash).unwrap().has_private_key());
        let (public, nym) = storage.get_public_key_entry(&bob.public()).unwrap();
        assert!(!public.has_private_key());
        assert_eq!(nym, "bob-nym");
        assert!(matches!(
            storage.get_private_key_entry("missing"),
            Err(StoreError::NoKeyEntry(_))
        ));
    }
}
