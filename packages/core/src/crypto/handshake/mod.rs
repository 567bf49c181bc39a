//! Установка сессий
//!
//! ## Протоколы
//! - **Triple DH**: аутентифицированное согласование ключа между
//!   долгосрочными ключами обеих сторон и сессионными ключами
//! - **Key-init**: одноразовые опубликованные бандлы, с которых начинается
//!   первая сессия без синхронного handshake
//!
//! ## Dataflow
//! ```text
//! Alice (инициатор)                          Bob (получатель)
//! ==================                         =================
//!
//! 1. Получает KeyInit Боба, проверяет подпись
//! 2. Генерирует сессионный ключ X
//! 3. initiator_agreement(IA, X, IB, Y)
//! 4. derive_root(salt, agreement) → root_key_hash, chain_key
//!
//!                                            1. По хешу Y находит приватный ключ
//!                                            2. responder_agreement(IB, Y, IA, X)
//!                                            3. derive_root → те же ключи
//! ```
//!
//! `salt` пуст для первой сессии и равен `root_key_hash | chain_key`
//! заменяемой сессии при ротации.

pub mod key_init;
pub mod triple_dh;

pub use key_init::{KeyInit, KeyInitContents, SessionAnchor};
pub use triple_dh::{derive_root, initiator_agreement, responder_agreement, rotation_salt, RootKeys};
