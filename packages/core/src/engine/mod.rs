//! Шифрование и расшифровка сообщений
//!
//! ## Конверт
//!
//! ```text
//! base64( outer header | encrypted header | body )
//!
//! outer header  version | pre_header_len | pre_header      (открыто)
//! header        AEAD(header key, Header)                   (AAD: outer header)
//! body          AEAD(message key, sig_flag | sig | content | padding)
//!                                                         (AAD: outer header | header)
//! ```
//!
//! Размер конверта постоянен: `ENCODED_MSG_SIZE` символов для любого
//! содержимого до `MAX_CONTENT_LENGTH` байт.
//!
//! ## Расшифровка
//!
//! Вызывающий сам читает внешний заголовок и передаёт pre-header:
//!
//! ```ignore
//! let mut input = b64::decoder(envelope_text.as_bytes());
//! let (_version, pre_header) = read_header(&mut input)?;
//! let decrypted = decrypt(&mut out, &identities, &pre_header, &mut input, &mut store)?;
//! ```

pub mod decrypt;
pub mod encrypt;

pub use decrypt::{decrypt, Decrypted};
pub use encrypt::{encrypt, EncryptArgs};

/// sig_flag | signature
const SIGNATURE_BLOCK: usize = 1 + crate::protocol::limits::SIGNATURE_LEN;

const SIG_ABSENT: u8 = 0;
const SIG_PRESENT: u8 = 1;
