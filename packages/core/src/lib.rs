// Hush Core
// Message-layer protocol engine: forward-secret, fixed-size encrypted envelopes

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

// Модули
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod storage;
pub mod utils;

// Re-exports для удобства
pub use crypto::keys::{Identity, KeyEntry, KeyFunction, PublicIdentity};
pub use crypto::CIPHERSUITE;
pub use engine::{decrypt, encrypt, Decrypted, EncryptArgs};
pub use error::{ErrorKind, MessageError};
pub use protocol::limits::{
    ENCODED_MSG_SIZE, MAX_CONTENT_LENGTH, NUM_OF_FUTURE_KEYS, UNENCODED_MSG_SIZE, VERSION,
};
pub use protocol::{read_header, write_header};
pub use storage::{KeyStore, MemoryStorage};
