//! Хранилище ключей
//!
//! `KeyStore` - контракт, который реализует вызывающая сторона: состояние
//! сессий, цепочки ключей сообщений, key-init и сессионные ключи.
//! Движок держит `&mut dyn KeyStore` на время одного вызова; общий store
//! оборачивается в `Arc<Mutex<_>>`, так что два вызова для одной сессии
//! не могут одновременно израсходовать один индекс.

pub mod memory;
pub mod models;

use crate::crypto::keys::{KeyEntry, MessageKey, PublicIdentity};
use crate::crypto::messaging::ratchet::SessionState;
use crate::error::StoreError;
use zeroize::Zeroizing;

pub use memory::MemoryStorage;
pub use models::{ConsumedKey, NewSession, SessionKey, SessionStateKey, SessionUpdate};

pub trait KeyStore {
    fn get_session_state(&self, key: &SessionStateKey) -> Result<Option<SessionState>, StoreError>;

    fn set_session_state(
        &mut self,
        key: &SessionStateKey,
        state: &SessionState,
    ) -> Result<(), StoreError>;

    fn store_session(
        &mut self,
        key: &SessionKey,
        root_key_hash: &[u8; 64],
        chain_key: &[u8],
        send: &[MessageKey],
        recv: &[MessageKey],
    ) -> Result<(), StoreError>;

    fn has_session(&self, key: &SessionKey) -> Result<bool, StoreError>;

    /// Приватная часть опубликованного key-init ключа по base64-хешу
    fn get_private_key_entry(&self, hash: &str) -> Result<KeyEntry, StoreError>;

    /// Опубликованный key-init ключ собеседника и его nym-адрес
    fn get_public_key_entry(
        &self,
        identity: &PublicIdentity,
    ) -> Result<(KeyEntry, String), StoreError>;

    /// Ключ по индексу. Второй запрос того же индекса даёт `KeyAlreadyUsed`,
    /// индекс за пределами цепочки даёт `IndexOutOfRange`
    fn get_message_key(
        &self,
        key: &SessionKey,
        sender: bool,
        index: usize,
    ) -> Result<MessageKey, StoreError>;

    /// Длина цепочек сессии
    fn num_message_keys(&self, key: &SessionKey) -> Result<usize, StoreError>;

    fn get_root_key_hash(&self, key: &SessionKey) -> Result<[u8; 64], StoreError>;

    fn get_chain_key(&self, key: &SessionKey) -> Result<Zeroizing<Vec<u8>>, StoreError>;

    fn delete_message_key(
        &mut self,
        key: &SessionKey,
        sender: bool,
        index: usize,
    ) -> Result<(), StoreError>;

    fn add_session_key(&mut self, entry: &KeyEntry, cleanup_time: u64) -> Result<(), StoreError>;

    /// Сессионный ключ по base64-хешу; приватная часть может быть уже удалена
    fn get_session_key(&self, hash: &str) -> Result<KeyEntry, StoreError>;

    fn delete_private_session_key(&mut self, hash: &str) -> Result<(), StoreError>;

    /// Удаляет сессионные ключи со временем очистки раньше `before`, возвращает их число
    fn cleanup_session_keys(&mut self, before: u64) -> Result<usize, StoreError>;

    /// Применяет результат одной операции. Реализация по умолчанию вызывает
    /// методы по очереди; хранилища с транзакциями должны её переопределить.
    fn apply(&mut self, update: &SessionUpdate) -> Result<(), StoreError> {
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
