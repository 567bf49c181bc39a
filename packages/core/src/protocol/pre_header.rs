//! Pre-header: открытая часть конверта
//!
//! ```text
//! suite_len:u8 | suite | sender_header_pub[32] | recipient_identity_hash[64] | recipient_temp_hash[64]
//! ```
//!
//! `recipient_identity_hash = H(recipient_sig_pub | sender_header_pub)`: каждая
//! локальная identity может проверить совпадение, но внешний наблюдатель
//! не связывает разные сообщения с одним получателем.

use crate::crypto::{ActiveSuite, CryptoProvider, CIPHERSUITE};
use crate::error::MessageError;
use crate::protocol::limits::{HASH_LEN, KEY_LEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreHeader {
    pub ciphersuite: String,
    pub sender_header_pub: [u8; KEY_LEN],
    pub recipient_identity_hash: [u8; HASH_LEN],
    pub recipient_temp_hash: [u8; HASH_LEN],
}

pub fn identity_hash(recipient_sig_pub: &[u8], sender_header_pub: &[u8]) -> [u8; HASH_LEN] {
    let mut buf = Vec::with_capacity(recipient_sig_pub.len() + sender_header_pub.len());
    buf.extend_from_slice(recipient_sig_pub);
    buf.extend_from_slice(sender_header_pub);
    ActiveSuite::hash(&buf)
}

impl PreHeader {
    pub fn new(
        sender_header_pub: [u8; KEY_LEN],
        recipient_sig_pub: &[u8; 32],
        recipient_temp_pub: &[u8; KEY_LEN],
    ) -> Self {
        Self {
            ciphersuite: CIPHERSUITE.to_string(),
            sender_header_pub,
            recipient_identity_hash: identity_hash(recipient_sig_pub, &sender_header_pub),
            recipient_temp_hash: ActiveSuite::hash(recipient_temp_pub),
        }
    }

    /// Адресовано ли сообщение identity с этим ключом подписи
    pub fn matches(&self, sig_pub: &[u8; 32]) -> bool {
        identity_hash(sig_pub, &self.sender_header_pub) == self.recipient_identity_hash
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let suite = self.ciphersuite.as_bytes();
        let mut out = Vec::with_capacity(1 + suite.len() + KEY_LEN + 2 * HASH_LEN);
        out.push(suite.len() as u8);
        out.extend_from_slice(suite);
        out.extend_from_slice(&self.sender_header_pub);
        out.extend_from_slice(&self.recipient_identity_hash);
        out.extend_from_slice(&self.recipient_temp_hash);
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, MessageError> {
        let (&suite_len, rest) = bytes
            .split_first()
            .ok_or_else(|| MessageError::MalformedHeader("empty pre-header".to_string()))?;
        let suite_len = suite_len as usize;
        if rest.len() < suite_len {
            return Err(MessageError::MalformedHeader("truncated ciphersuite".to_string()));
        }
        let (suite, rest) = rest.split_at(suite_len);
        if suite != CIPHERSUITE.as_bytes() {
            return Err(MessageError::UnknownCiphersuite(
                String::from_utf8_lossy(suite).into_owned(),
            ));
        }
        if rest.len() != KEY_LEN + 2 * HASH_LEN {
            return Err(MessageError::MalformedHeader(format!(
                "pre-header body has {} bytes",
                rest.len()
            )));
        }

        let mut pre_header = Self {
            ciphersuite: CIPHERSUITE.to_string(),
            sender_header_pub: [0u8; KEY_LEN],
            recipient_identity_hash: [0u8; HASH_LEN],
            recipient_temp_hash: [0u8; HASH_LEN],
        };
        pre_header.sender_header_pub.copy_from_slice(&rest[..KEY_LEN]);
        pre_header
            .recipient_identity_hash
            .copy_from_slice(&rest[KEY_LEN..KEY_LEN + HASH_LEN]);
        pre_header
            .recipient_temp_hash
            .copy_from_slice(&rest[KEY_LEN + HASH_LEN..]);
        Ok(pre_header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::limits::PRE_HEADER_SIZE;

    #[test]
    fn test_pre_header_layout() {
        let pre_header = PreHeader::new([1u8; 32], &[2u8; 32], &[3u8; 32]);
        let bytes = pre_header.to_bytes();
        assert_eq!(bytes.len(), PRE_HEADER_SIZE);
        assert_eq!(PreHeader::parse(&bytes).unwrap(), pre_header);
        assert!(pre_header.matches(&[2u8; 32]));
        assert!(!pre_header.matches(&[4u8; 32]));
    }

    #[test]
    fn test_unknown_ciphersuite() {
        let mut pre_header = PreHeader::new([1u8; 32], &[2u8; 32], &[3u8; 32]);
        pre_header.ciphersuite = "CURVE25519 XSALSA20 POLY1305".to_string();
        let result = PreHeader::parse(&pre_header.to_bytes());
        assert!(matches!(result, Err(MessageError::UnknownCiphersuite(_))));
    }

    #[test]
    fn test_truncated_pre_header() {
        let bytes = PreHeader::new([1u8; 32], &[2u8; 32], &[3u8; 32]).to_bytes();
        assert!(matches!(
            PreHeader::parse(&bytes[..bytes.len() - 1]),
            Err(MessageError::MalformedHeader(_))
        ));
        assert!(PreHeader::parse(&[]).is_err());
    }
}
