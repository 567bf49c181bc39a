//! Session Ratchet
//!
//! ## Архитектура
//!
//! Сессия определяется упорядоченной парой сессионных ключей (X инициатора,
//! Y получателя). Если обе стороны ротируют одновременно, получаются две
//! сессии (A, B) и (B, A); каждая сторона хранит обе и принимает сообщения
//! в любой из них.
//! При создании сессии:
//! 1. Triple DH + `KDF_RK(salt, ·)` дают root_key_hash и chain key
//! 2. Chain key продвигается 50 раз через `KDF_CK`; из каждого шага
//!    выводятся два независимых ключа: `i2r` (info = label | X | Y) и
//!    `r2i` (info = label | Y | X)
//! 3. У инициатора send = i2r, recv = r2i; у получателя наоборот
//! 4. Сохраняется только продвинутый chain key
//!
//! ## Key Responsibilities
//!
//! - `plan_send`: найти или создать сессию, при необходимости объявить
//!   следующий сессионный ключ или переключиться на новую сессию, выдать
//!   ключ по индексу `sender_message_count`
//! - `plan_receive`: найти или создать сессию по заголовку, выдать ключ
//!   recv-цепочки по индексу из заголовка
//!
//! Оба возвращают `SessionUpdate`, который движок применяет только после
//! успешной аутентификации. До этого в хранилище ничего не пишется.

use crate::config::Config;
use crate::crypto::handshake::{
    derive_root, initiator_agreement, responder_agreement, rotation_salt,
};
use crate::crypto::keys::{Identity, KeyEntry, KeyFunction, MessageKey, PublicIdentity};
use crate::crypto::provider::CryptoProvider;
use crate::crypto::ActiveSuite;
use crate::error::{CryptoError, MessageError};
use crate::protocol::header::Header;
use crate::protocol::limits::{HASH_LEN, NUM_OF_FUTURE_KEYS};
use crate::storage::{ConsumedKey, KeyStore, NewSession, SessionKey, SessionStateKey, SessionUpdate};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

const MESSAGE_KEY_INFO: &[u8] = b"hush message key";

/// Состояние отношений (локальная identity, собеседник)
///
/// ### Счётчики
/// - `sender_session_count`: сообщения, отправленные под всеми прошлыми сессионными ключами
/// - `sender_message_count`: сообщения под текущим ключом, он же следующий индекс send-цепочки
/// - `max_recipient_count`: наибольший номер сообщения собеседника
///   (`session_count + message_count + 1`). Справочный: движок его ведёт,
///   но решений по нему не принимает
///
/// ### Ключи
/// - `sender_session_pub` / `recipient_temp`: пара ключей активной сессии
/// - `next_sender_session_pub`: наш объявленный следующий ключ
/// - `next_recipient_session_pub_seen`: следующий ключ, объявленный собеседником
/// - `initiator`: активную сессию создали мы (наш ключ стоит первым в паре)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub sender_session_count: u64,
    pub sender_message_count: u64,
    pub max_recipient_count: u64,
    pub recipient_temp: KeyEntry,
    pub sender_session_pub: KeyEntry,
    pub next_sender_session_pub: Option<KeyEntry>,
    pub next_recipient_session_pub_seen: Option<KeyEntry>,
    pub nym_address: String,
    pub key_init_session: bool,
    pub initiator: bool,
    /// Хеш сессии, которую заменила активная (если она создана ротацией)
    pub previous_session: Option<Vec<u8>>,
}

impl SessionState {
    /// Ключ активной сессии
    pub fn session_key(&self, local: &PublicIdentity, peer: &PublicIdentity) -> SessionKey {
        let ours = &self.sender_session_pub.public_key;
        let theirs = &self.recipient_temp.public_key;
        let (initiator_pub, responder_pub) = if self.initiator {
            (ours, theirs)
        } else {
            (theirs, ours)
        };
        SessionKey::new(local.clone(), peer.clone(), initiator_pub, responder_pub)
    }

    pub fn remaining_send_keys(&self) -> usize {
        NUM_OF_FUTURE_KEYS.saturating_sub(self.sender_message_count as usize)
    }
}

fn message_key_info(first: &[u8; 32], second: &[u8; 32]) -> Vec<u8> {
    let mut info = Vec::with_capacity(MESSAGE_KEY_INFO.len() + 64);
    info.extend_from_slice(MESSAGE_KEY_INFO);
    info.extend_from_slice(first);
    info.extend_from_slice(second);
    info
}

/// Выводит обе цепочки и продвинутый chain key.
/// Возвращает `(send, recv, chain_key)` с точки зрения стороны `initiator`.
pub fn derive_chains<P: CryptoProvider>(
    chain_key: &[u8],
    initiator_pub: &[u8; 32],
    responder_pub: &[u8; 32],
    initiator: bool,
) -> Result<(Vec<MessageKey>, Vec<MessageKey>, Zeroizing<Vec<u8>>), CryptoError> {
    let i2r_info = message_key_info(initiator_pub, responder_pub);
    let r2i_info = message_key_info(responder_pub, initiator_pub);

    let mut chain = Zeroizing::new(chain_key.to_vec());
    let mut i2r = Vec::with_capacity(NUM_OF_FUTURE_KEYS);
    let mut r2i = Vec::with_capacity(NUM_OF_FUTURE_KEYS);
    for _ in 0..NUM_OF_FUTURE_KEYS {
        let (seed, next) = P::kdf_ck(&chain)?;
        let seed = Zeroizing::new(seed);
        chain = Zeroizing::new(next);

        let forward = Zeroizing::new(P::hkdf_derive_key(b"", &seed, &i2r_info, 64)?);
        let backward = Zeroizing::new(P::hkdf_derive_key(b"", &seed, &r2i_info, 64)?);
        i2r.push(MessageKey::from_slice(&forward)?);
        r2i.push(MessageKey::from_slice(&backward)?);
    }

    if initiator {
        Ok((i2r, r2i, chain))
    } else {
        Ok((r2i, i2r, chain))
    }
}

/// Создаёт сессию из результата triple DH
pub fn new_session<P: CryptoProvider>(
    key: SessionKey,
    salt: &[u8],
    agreement: &[u8],
    initiator_pub: &[u8; 32],
    responder_pub: &[u8; 32],
    initiator: bool,
) -> Result<NewSession, CryptoError> {
    let root = derive_root::<P>(salt, agreement)?;
    let (send, recv, chain_key) =
        derive_chains::<P>(&root.chain_key, initiator_pub, responder_pub, initiator)?;
    Ok(NewSession {
        key,
        root_key_hash: root.root_key_hash,
        chain_key,
        send,
        recv,
    })
}

fn initiate(
    from: &Identity,
    to: &PublicIdentity,
    x: &KeyEntry,
    y: &KeyEntry,
    salt: &[u8],
) -> Result<NewSession, MessageError> {
    let agreement = initiator_agreement::<ActiveSuite>(
        from.dh().private_key()?,
        x.private_key()?,
        &to.dh_pub,
        &y.public_key,
    )?;
    let key = SessionKey::new(from.public(), to.clone(), &x.public_key, &y.public_key);
    Ok(new_session::<ActiveSuite>(
        key,
        salt,
        &agreement,
        &x.public_key,
        &y.public_key,
        true,
    )?)
}

fn session_salt(
    store: &dyn KeyStore,
    previous: &SessionKey,
) -> Result<Zeroizing<Vec<u8>>, MessageError> {
    let root_key_hash = store.get_root_key_hash(previous)?;
    let chain_key = store.get_chain_key(previous)?;
    Ok(rotation_salt(&root_key_hash, &chain_key))
}

/// Результат планирования отправки
#[derive(Debug)]
pub struct SendPlan {
    /// Заголовок без `nym_address` и `sender_last_directory_hash`
    pub header: Header,
    /// Ключ получателя, которому адресовано сообщение
    pub recipient_temp: KeyEntry,
    pub message_key: MessageKey,
    pub update: SessionUpdate,
}

/// Результат планирования приёма
#[derive(Debug)]
pub struct ReceivePlan {
    pub message_key: MessageKey,
    pub update: SessionUpdate,
}

pub fn plan_send(
    from: &Identity,
    to: &PublicIdentity,
    store: &dyn KeyStore,
    rng: &mut dyn CryptoRngCore,
    config: &Config,
    now: u64,
) -> Result<SendPlan, MessageError> {
    let local = from.public();
    let state_key = SessionStateKey::new(local.clone(), to.clone());
    let cleanup_time = now.saturating_add(config.session_key_lifetime_secs);
    let mut session_keys: Vec<(KeyEntry, u64)> = Vec::new();
    let mut created: Option<NewSession> = None;

    let mut state = match store.get_session_state(&state_key)? {
        Some(state) => state,
        None => {
            let (published, nym_address) = store.get_public_key_entry(to)?;
            if published.public_key == from.dh().public_key {
                return Err(MessageError::Reflection);
            }
            if !published.verify() {
                return Err(MessageError::InvalidInput(
                    "published key entry does not match its hash".to_string(),
                ));
            }
            if !published.is_valid_at(now) {
                return Err(MessageError::KeyEntryExpired);
            }

            let x = KeyEntry::generate(KeyFunction::Ecdhe25519, now, cleanup_time, rng)?;
            let y = published.public_only();
            created = Some(initiate(from, to, &x, &y, b"")?);
            info!(
                target: "crypto::ratchet",
                peer = %to.name,
                key_init = %y.hash,
                "Starting session from key-init"
            );

            let state = SessionState {
                sender_session_count: 0,
                sender_message_count: 0,
                max_recipient_count: 0,
                recipient_temp: y,
                sender_session_pub: x.public_only(),
                next_sender_session_pub: None,
                next_recipient_session_pub_seen: None,
                nym_address,
                key_init_session: true,
                initiator: true,
                previous_session: None,
            };
            session_keys.push((x, cleanup_time));
            state
        }
    };

    // send-цепочка исчерпана: переключаемся на новую сессию
    if state.sender_message_count as usize >= NUM_OF_FUTURE_KEYS {
        let previous = state.session_key(&local, to);
        let salt = session_salt(store, &previous)?;

        let staged = state
            .next_sender_session_pub
            .take()
            .and_then(|staged| store.get_session_key(&staged.hash).ok())
            .filter(|entry| entry.has_private_key());
        let x = match staged {
            Some(entry) => entry,
            None => {
                let entry = KeyEntry::generate(KeyFunction::Ecdhe25519, now, cleanup_time, rng)?;
                session_keys.push((entry.clone(), cleanup_time));
                entry
            }
        };
        let y = state
            .next_recipient_session_pub_seen
            .take()
            .unwrap_or_else(|| state.recipient_temp.clone());

        created = Some(initiate(from, to, &x, &y, &salt)?);

        state.sender_session_count += state.sender_message_count;
        state.sender_message_count = 0;
        state.sender_session_pub = x.public_only();
        state.recipient_temp = y;
        state.key_init_session = false;
        state.initiator = true;
        state.previous_session = Some(previous.session_hash.to_vec());

        info!(
            target: "crypto::ratchet",
            peer = %to.name,
            sender_session_count = state.sender_session_count,
            "Rotated session key"
        );
    }

    if state.next_sender_session_pub.is_none()
        && (state.remaining_send_keys() <= config.rotation_margin
            || state.next_recipient_session_pub_seen.is_some())
    {
        let staged = KeyEntry::generate(KeyFunction::Ecdhe25519, now, cleanup_time, rng)?;
        debug!(
            target: "crypto::ratchet",
            peer = %to.name,
            remaining = state.remaining_send_keys(),
            "Staged next session key"
        );
        state.next_sender_session_pub = Some(staged.public_only());
        session_keys.push((staged, cleanup_time));
    }

    let session_key = state.session_key(&local, to);
    let index = state.sender_message_count as usize;
    let message_key = match &created {
        Some(session) => session
            .send
            .get(index)
            .cloned()
            .ok_or(MessageError::ChainExhausted { index })?,
        None => store.get_message_key(&session_key, true, index)?,
    };

    let header = Header {
        sender: local,
        sender_session_pub: state.sender_session_pub.public_key,
        sender_initiator: state.initiator,
        sender_session_count: state.sender_session_count,
        sender_message_count: state.sender_message_count,
        recipient_temp_hash: state.recipient_temp.hash_bytes().to_vec(),
        previous_session: state.previous_session.clone(),
        next_sender_session_pub: state
            .next_sender_session_pub
            .as_ref()
            .map(|entry| entry.public_key),
        nym_address: String::new(),
        sender_last_directory_hash: Vec::new(),
    };
    let recipient_temp = state.recipient_temp.clone();
    state.sender_message_count += 1;

    debug!(target: "crypto::ratchet", peer = %to.name, index, "Planned send");

    Ok(SendPlan {
        header,
        recipient_temp,
        message_key,
        update: SessionUpdate {
            state_key,
            state,
            session_keys,
            new_session: created,
            consumed: ConsumedKey {
                session: session_key,
                sender: true,
                index,
            },
        },
    })
}

/// `recipient_key` - наш ключ (key-init или сессионный) с приватной частью,
/// на который указывает pre-header
pub fn plan_receive(
    identity: &Identity,
    header: &Header,
    recipient_key: &KeyEntry,
    store: &dyn KeyStore,
) -> Result<ReceivePlan, MessageError> {
    let local = identity.public();
    let peer = header.sender.clone();
    let x = header.sender_session_pub;
    let ours = &recipient_key.public_key;
    let session_key = if header.sender_initiator {
        SessionKey::new(local.clone(), peer.clone(), &x, ours)
    } else {
        SessionKey::new(local.clone(), peer.clone(), ours, &x)
    };

    let index = header.sender_message_count as usize;
    if index >= NUM_OF_FUTURE_KEYS {
        return Err(MessageError::ChainExhausted { index });
    }

    let mut created: Option<NewSession> = None;
    let message_key = if store.has_session(&session_key)? {
        if index >= store.num_message_keys(&session_key)? {
            return Err(MessageError::ChainExhausted { index });
        }
        store.get_message_key(&session_key, false, index)?
    } else {
        // создать сессию может только сообщение её инициатора
        if !header.sender_initiator {
            return Err(MessageError::NoSession);
        }
        let salt = match &header.previous_session {
            Some(previous) => {
                let session_hash: [u8; HASH_LEN] = previous.as_slice().try_into().map_err(|_| {
                    MessageError::MalformedHeader("previous session hash".to_string())
                })?;
                let previous = SessionKey {
                    local: local.clone(),
                    peer: peer.clone(),
                    session_hash,
                };
                session_salt(store, &previous)?
            }
            None => Zeroizing::new(Vec::new()),
        };
        let agreement = responder_agreement::<ActiveSuite>(
            identity.dh().private_key()?,
            recipient_key.private_key()?,
            &peer.dh_pub,
            &x,
        )?;
        let session = new_session::<ActiveSuite>(
            session_key.clone(),
            &salt,
            &agreement,
            &x,
            &recipient_key.public_key,
            false,
        )?;
        let key = session.recv[index].clone();
        created = Some(session);
        key
    };

    let peer_key = KeyEntry::from_public(KeyFunction::Ecdhe25519, x, 0, u64::MAX);
    let state_key = SessionStateKey::new(local.clone(), peer.clone());
    let mut state = match store.get_session_state(&state_key)? {
        None => SessionState {
            sender_session_count: 0,
            sender_message_count: 0,
            max_recipient_count: 0,
            recipient_temp: peer_key,
            sender_session_pub: recipient_key.public_only(),
            next_sender_session_pub: None,
            next_recipient_session_pub_seen: None,
            nym_address: header.nym_address.clone(),
            key_init_session: header.previous_session.is_none(),
            initiator: false,
            previous_session: header.previous_session.clone(),
        },
        Some(mut state) => {
            if created.is_some() {
                // собеседник начал новую сессию: она становится активной
                state.sender_session_count += state.sender_message_count;
                state.sender_message_count = 0;
                if state
                    .next_sender_session_pub
                    .as_ref()
                    .map_or(false, |next| next.public_key == recipient_key.public_key)
                {
                    state.next_sender_session_pub = None;
                }
                if state
                    .next_recipient_session_pub_seen
                    .as_ref()
                    .map_or(false, |seen| seen.public_key == x)
                {
                    state.next_recipient_session_pub_seen = None;
                }
                state.sender_session_pub = recipient_key.public_only();
                state.recipient_temp = peer_key;
                state.key_init_session = header.previous_session.is_none();
                state.initiator = false;
                state.previous_session = header.previous_session.clone();

                info!(
                    target: "crypto::ratchet",
                    peer = %peer.name,
                    "Switched to session started by peer"
                );
            }
            state
        }
    };

    if state.session_key(&local, &peer) == session_key {
        if let Some(next) = header.next_sender_session_pub {
            if next != state.recipient_temp.public_key {
                state.next_recipient_session_pub_seen =
                    Some(KeyEntry::from_public(KeyFunction::Ecdhe25519, next, 0, u64::MAX));
            }
        }
    }
    state.max_recipient_count = state
        .max_recipient_count
        .max(header.sender_session_count + header.sender_message_count + 1);
    if !header.nym_address.is_empty() {
        state.nym_address = header.nym_address.clone();
    }

    debug!(target: "crypto::ratchet", peer = %peer.name, index, "Planned receive");

    Ok(ReceivePlan {
        message_key,
        update: SessionUpdate {
            state_key,
            state,
            session_keys: Vec::new(),
            new_session: created,
            consumed: ConsumedKey {
                session: session_key,
                sender: false,
                index,
            },
        },
    })
}
