//! Протокольные константы
//!
//! Определяют формат конверта версии 1 и не зависят от `Config`:
//! изменение любой из них ломает совместимость.

use crate::crypto::{ActiveSuite, CryptoProvider, CIPHERSUITE};

/// Версия протокола во внешнем заголовке
pub const VERSION: u16 = 1;

/// Длина каждой цепочки ключей сообщений (send и recv)
pub const NUM_OF_FUTURE_KEYS: usize = 50;

/// Размер конверта до base64
pub const UNENCODED_MSG_SIZE: usize = 49152;

/// Размер конверта после base64
pub const ENCODED_MSG_SIZE: usize = crate::utils::b64::encoded_len(UNENCODED_MSG_SIZE);

pub const KEY_LEN: usize = ActiveSuite::KEY_LEN;
pub const HASH_LEN: usize = 64;
pub const SIGNATURE_LEN: usize = ActiveSuite::SIGNATURE_LEN;
pub const TAG_LEN: usize = ActiveSuite::TAG_LEN;

/// suite_len:u8 | suite | sender_header_pub | recipient_identity_hash | recipient_temp_hash
pub const PRE_HEADER_SIZE: usize = 1 + CIPHERSUITE.len() + KEY_LEN + HASH_LEN + HASH_LEN;

/// version:u16 | pre_header_len:u16 | pre_header
pub const OUTER_HEADER_SIZE: usize = 2 + 2 + PRE_HEADER_SIZE;

/// Верхняя граница pre-header при разборе недоверенного ввода
pub const MAX_PRE_HEADER_SIZE: usize = 1024;

/// Размер зашифрованного заголовка до AEAD (с паддингом)
pub const HEADER_PLAIN_SIZE: usize = 1024;
pub const ENCRYPTED_HEADER_SIZE: usize = HEADER_PLAIN_SIZE + TAG_LEN;

/// content_len:u32 | sig_flag:u8 | signature
pub const INNER_OVERHEAD: usize = 4 + 1 + SIGNATURE_LEN;

/// Открытый внутренний блок, шифруемый ключом сообщения
pub const INNER_SIZE: usize = UNENCODED_MSG_SIZE - OUTER_HEADER_SIZE - ENCRYPTED_HEADER_SIZE - TAG_LEN;

/// Максимальная длина содержимого сообщения
pub const MAX_CONTENT_LENGTH: usize = INNER_SIZE - INNER_OVERHEAD;

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_NYM_ADDRESS_LEN: usize = 256;
pub const MAX_DIRECTORY_HASH_LEN: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_arithmetic() {
        assert_eq!(PRE_HEADER_SIZE, 189);
        assert_eq!(OUTER_HEADER_SIZE, 193);
        assert_eq!(INNER_SIZE, 47903);
        assert_eq!(MAX_CONTENT_LENGTH, 47834);
        assert_eq!(ENCODED_MSG_SIZE, 65536);
        assert_eq!(
            OUTER_HEADER_SIZE + ENCRYPTED_HEADER_SIZE + INNER_SIZE + TAG_LEN,
            UNENCODED_MSG_SIZE
        );
    }
}
