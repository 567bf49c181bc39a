//! Паддинг до фиксированного размера
//!
//! ```text
//! len:u32 (BE) | data | случайные байты
//! ```
//!
//! Все блоки одного назначения имеют одинаковый размер, поэтому длина
//! содержимого видна только тому, кто может расшифровать префикс.

use crate::crypto::{ActiveSuite, CryptoProvider};
use crate::error::MessageError;
use rand_core::CryptoRngCore;

pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Дополняет `data` до ровно `size` байт
pub fn pad(data: &[u8], size: usize, rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>, MessageError> {
    let max = size.saturating_sub(LENGTH_PREFIX_SIZE);
    if data.len() > max {
        return Err(MessageError::ContentTooLarge {
            len: data.len(),
            max,
        });
    }
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    let fill = ActiveSuite::random_bytes(rng, size - out.len())?;
    out.extend_from_slice(&fill);
    Ok(out)
}

/// Снимает паддинг, проверяя, что префикс согласован с фиксированным размером
pub fn unpad(padded: &[u8], size: usize) -> Result<&[u8], MessageError> {
    if padded.len() != size || size < LENGTH_PREFIX_SIZE {
        return Err(MessageError::MalformedPadding);
    }
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    prefix.copy_from_slice(&padded[..LENGTH_PREFIX_SIZE]);
    let len = u32::from_be_bytes(prefix) as usize;
    if len > size - LENGTH_PREFIX_SIZE {
        return Err(MessageError::MalformedPadding);
    }
    Ok(&padded[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len])
}
