// Base64 утилиты (стандартный алфавит, с паддингом)

use base64::engine::general_purpose::{self, GeneralPurpose};
use base64::read::DecoderReader;
use base64::Engine;
use std::io::Read;

pub fn encode(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

pub fn decode(data: &str) -> Result<Vec<u8>, String> {
    general_purpose::STANDARD
        .decode(data)
        .map_err(|e| format!("Base64 decode failed: {}", e))
}

/// Потоковое декодирование (конверт читается прямо из base64-входа)
pub fn decoder<R: Read>(reader: R) -> DecoderReader<'static, GeneralPurpose, R> {
    DecoderReader::new(reader, &general_purpose::STANDARD)
}

/// Длина base64-представления `n` байт
pub const fn encoded_len(n: usize) -> usize {
    (n + 2) / 3 * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_len() {
        assert_eq!(encoded_len(0), 0);
        assert_eq!(encoded_len(1), 4);
        assert_eq!(encoded_len(3), 4);
        assert_eq!(encoded_len(49152), 65536);
        assert_eq!(encode(&[0u8; 49152]).len(), 65536);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("@@@").is_err());
        assert_eq!(decode(&encode(b"hush")).unwrap(), b"hush");
    }

    #[test]
    fn test_decoder_streams() {
        let text = encode(b"envelope bytes");
        let mut out = Vec::new();
        decoder(text.as_bytes()).read_to_end(&mut out).unwrap();
        assert_eq!(out, b"envelope bytes");
    }
}
