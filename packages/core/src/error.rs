//! Ошибки ядра
//!
//! Каждый слой имеет свой enum: примитивы (`CryptoError`), контракт
//! хранилища (`StoreError`), внешний заголовок (`FramingError`),
//! key-init бандлы (`KeyInitError`) и движок сообщений (`MessageError`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Failed to generate keys: {0}")]
    KeyGenerationError(String),
    #[error("Signing failed: {0}")]
    SigningError(String),
    #[error("Signature verification failed: {0}")]
    SignatureVerificationError(String),
    #[error("Key agreement failed: {0}")]
    KeyAgreementError(String),
    #[error("AEAD encryption failed: {0}")]
    AeadEncryptionError(String),
    #[error("AEAD decryption failed: {0}")]
    AeadDecryptionError(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),
    #[error("Randomness source failed: {0}")]
    RandomnessError(String),
    #[error("Invalid input: {0}")]
    InvalidInputError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl From<ed25519_dalek::SignatureError> for CryptoError {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        CryptoError::SignatureVerificationError(err.to_string())
    }
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        CryptoError::RandomnessError(err.to_string())
    }
}

/// Ошибки контракта `KeyStore`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("session not found")]
    NoSession,
    #[error("session state not found")]
    NoSessionState,
    #[error("key entry not found: {0}")]
    NoKeyEntry(String),
    #[error("message key {index} already used")]
    KeyAlreadyUsed { index: usize },
    #[error("message key index {index} out of range (chain length {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("session already stored")]
    SessionExists,
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Ошибки внешнего заголовка (единственная часть, которую можно разобрать до аутентификации)
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("outer header truncated")]
    Truncated,
    #[error("protocol version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u16, found: u16 },
    #[error("pre-header too large: {0} bytes")]
    PreHeaderTooLarge(usize),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ошибки key-init бандлов
#[derive(Error, Debug)]
pub enum KeyInitError {
    #[error("invalid times: not_before must precede not_after")]
    InvalidTimes,
    #[error("key-init expired")]
    Expired,
    #[error("key-init not_after too far in the future")]
    Future,
    #[error("wrong signature key hash")]
    WrongSigKeyHash,
    #[error("session anchor hash mismatch")]
    SessionAnchor,
    #[error("repository URI not accepted: {0}")]
    RepoUri(String),
    #[error("invalid key-init signature")]
    InvalidSignature,
    #[error("unsupported key-init version: {0}")]
    InvalidVersion(String),
    #[error("key-init message count must be zero")]
    InvalidMsgCount,
    #[error("key entry does not match its hash")]
    InvalidKeyEntry,
    #[error("no ECDHE25519 key entry in session anchor")]
    NoKeyEntry,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Класс ошибки движка: по нему вызывающий выбирает реакцию
/// (запросить новый key-init, переслать, считать атакой)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    Authentication,
    State,
    SelfReference,
    Transient,
    Internal,
}

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("content too large: {len} bytes (max {max})")]
    ContentTooLarge { len: usize, max: usize },
    #[error("malformed padding")]
    MalformedPadding,
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error("unknown ciphersuite: {0}")]
    UnknownCiphersuite(String),
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("message authentication failed")]
    AuthenticationFailed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("no matching identity for message")]
    NoMatchingIdentity,
    #[error("no key entry for hash {0}")]
    NoKeyEntry(String),
    #[error("key entry expired")]
    KeyEntryExpired,
    #[error("no session found")]
    NoSession,
    #[error("message key {index} already used")]
    KeyAlreadyUsed { index: usize },
    #[error("message key chain exhausted at index {index}")]
    ChainExhausted { index: usize },
    #[error("reflection: sender and recipient share the same key material")]
    Reflection,
    #[error("session key deleted, resend requested")]
    ResendRequested,
    #[error(transparent)]
    KeyInit(#[from] KeyInitError),
    #[error("key store: {0}")]
    Store(StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MessageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MessageError::ContentTooLarge { .. }
            | MessageError::MalformedPadding
            | MessageError::Framing(_)
            | MessageError::UnknownCiphersuite(_)
            | MessageError::MalformedHeader(_)
            | MessageError::InvalidInput(_)
            | MessageError::KeyInit(_) => ErrorKind::InputValidation,
            MessageError::AuthenticationFailed | MessageError::InvalidSignature => {
                ErrorKind::Authentication
            }
            MessageError::NoMatchingIdentity
            | MessageError::NoKeyEntry(_)
            | MessageError::KeyEntryExpired
            | MessageError::NoSession
            | MessageError::KeyAlreadyUsed { .. }
            | MessageError::ChainExhausted { .. } => ErrorKind::State,
            MessageError::Reflection => ErrorKind::SelfReference,
            MessageError::ResendRequested => ErrorKind::Transient,
            MessageError::Store(_) | MessageError::Crypto(_) | MessageError::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<StoreError> for MessageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::KeyAlreadyUsed { index } => MessageError::KeyAlreadyUsed { index },
            StoreError::IndexOutOfRange { index, .. } => MessageError::ChainExhausted { index },
            StoreError::NoSession => MessageError::NoSession,
            StoreError::NoKeyEntry(hash) => MessageError::NoKeyEntry(hash),
            other => MessageError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let used: MessageError = StoreError::KeyAlreadyUsed { index: 3 }.into();
        assert!(matches!(used, MessageError::KeyAlreadyUsed { index: 3 }));
        assert_eq!(used.kind(), ErrorKind::State);

        let exhausted: MessageError = StoreError::IndexOutOfRange { index: 50, len: 50 }.into();
        assert!(matches!(exhausted, MessageError::ChainExhausted { index: 50 }));

        let backend: MessageError = StoreError::Backend("disk".into()).into();
        assert_eq!(backend.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(MessageError::Reflection.kind(), ErrorKind::SelfReference);
        assert_eq!(MessageError::ResendRequested.kind(), ErrorKind::Transient);
        assert_eq!(MessageError::AuthenticationFailed.kind(), ErrorKind::Authentication);
        assert_eq!(MessageError::MalformedPadding.kind(), ErrorKind::InputValidation);
    }
}
