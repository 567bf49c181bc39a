//! Зашифрованный заголовок сообщения
//!
//! Несёт всё, что нужно получателю для поиска или создания сессии.
//! Шифруется ключом `HKDF(DH(sender_header_priv, recipient_temp_pub))`,
//! свежая пара `sender_header` генерируется на каждое сообщение.
//! AAD: внешний заголовок целиком.

use crate::crypto::keys::PublicIdentity;
use crate::crypto::{ActiveSuite, CryptoProvider};
use crate::error::{CryptoError, MessageError};
use crate::protocol::limits::{
    ENCRYPTED_HEADER_SIZE, HASH_LEN, HEADER_PLAIN_SIZE, MAX_DIRECTORY_HASH_LEN, MAX_NAME_LEN,
    MAX_NYM_ADDRESS_LEN,
};
use crate::protocol::padding;
use crate::utils::serialization;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const HEADER_KEY_INFO: &[u8] = b"hush header key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub sender: PublicIdentity,
    pub sender_session_pub: [u8; 32],
    /// Отправитель создал сессию сообщения (его ключ стоит первым в паре)
    pub sender_initiator: bool,
    pub sender_session_count: u64,
    /// Индекс ключа в send-цепочке отправителя
    pub sender_message_count: u64,
    #[serde(with = "serde_bytes")]
    pub recipient_temp_hash: Vec<u8>,
    /// Хеш сессии, которую заменяет эта (при ротации)
    pub previous_session: Option<Vec<u8>>,
    pub next_sender_session_pub: Option<[u8; 32]>,
    pub nym_address: String,
    #[serde(with = "serde_bytes")]
    pub sender_last_directory_hash: Vec<u8>,
}

impl Header {
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.sender.name.len() > MAX_NAME_LEN {
            return Err(MessageError::InvalidInput("identity name too long".to_string()));
        }
        if self.nym_address.len() > MAX_NYM_ADDRESS_LEN {
            return Err(MessageError::InvalidInput("nym address too long".to_string()));
        }
        if self.sender_last_directory_hash.len() > MAX_DIRECTORY_HASH_LEN {
            return Err(MessageError::InvalidInput("directory hash too long".to_string()));
        }
        if self.recipient_temp_hash.len() != HASH_LEN {
            return Err(MessageError::MalformedHeader("recipient temp hash".to_string()));
        }
        if let Some(previous) = &self.previous_session {
            if previous.len() != HASH_LEN {
                return Err(MessageError::MalformedHeader("previous session hash".to_string()));
            }
        }
        Ok(())
    }

    /// Шифрует заголовок; результат всегда `ENCRYPTED_HEADER_SIZE` байт
    pub fn seal(
        &self,
        sender_header_priv: &[u8],
        recipient_temp_pub: &[u8],
        aad: &[u8],
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Vec<u8>, MessageError> {
        self.validate()?;
        let encoded = serialization::to_bytes(self)?;
        let padded = Zeroizing::new(padding::pad(&encoded, HEADER_PLAIN_SIZE, rng)?);
        let key = header_key(sender_header_priv, recipient_temp_pub)?;
        let sealed = ActiveSuite::aead_encrypt(&key[..32], &key[32..], &padded, Some(aad))?;
        debug_assert_eq!(sealed.len(), ENCRYPTED_HEADER_SIZE);
        Ok(sealed)
    }

    /// Расшифровывает заголовок. Любая ошибка AEAD это `AuthenticationFailed`
    pub fn open(
        sealed: &[u8],
        recipient_temp_priv: &[u8],
        sender_header_pub: &[u8],
        aad: &[u8],
    ) -> Result<Self, MessageError> {
        if sealed.len() != ENCRYPTED_HEADER_SIZE {
            return Err(MessageError::MalformedHeader("encrypted header size".to_string()));
        }
        let key = header_key(recipient_temp_priv, sender_header_pub)?;
        let padded = ActiveSuite::aead_decrypt(&key[..32], &key[32..], sealed, Some(aad))
            .map(Zeroizing::new)
            .map_err(|_| MessageError::AuthenticationFailed)?;
        let encoded = padding::unpad(&padded, HEADER_PLAIN_SIZE)?;
        let header: Header = serialization::from_bytes(encoded)
            .map_err(|e| MessageError::MalformedHeader(e.to_string()))?;
        header.validate()?;
        Ok(header)
    }
}

fn header_key(private_key: &[u8], public_key: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let shared = Zeroizing::new(ActiveSuite::diffie_hellman(private_key, public_key)?);
    let okm = ActiveSuite::hkdf_derive_key(
        b"",
        &shared,
        HEADER_KEY_INFO,
        32 + ActiveSuite::NONCE_LEN,
    )?;
    Ok(Zeroizing::new(okm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Identity;
    use rand::rngs::OsRng;

    fn sample_header() -> Header {
        let alice = Identity::generate("alice@hush", &mut OsRng).unwrap();
        Header {
            sender: alice.public(),
            sender_session_pub: [5u8; 32],
            sender_initiator: true,
            sender_session_count: 50,
            sender_message_count: 3,
            recipient_temp_hash: vec![1u8; HASH_LEN],
            previous_session: Some(vec![2u8; HASH_LEN]),
            next_sender_session_pub: None,
            nym_address: "nym@mix".to_string(),
            sender_last_directory_hash: vec![9u8; 64],
        }
    }

    #[test]
    fn test_seal_open() {
        let (header_priv, header_pub) = ActiveSuite::generate_kem_keys(&mut OsRng).unwrap();
        let (temp_priv, temp_pub) = ActiveSuite::generate_kem_keys(&mut OsRng).unwrap();
        let header = sample_header();

        let sealed = header.seal(&header_priv, &temp_pub, b"outer", &mut OsRng).unwrap();
        assert_eq!(sealed.len(), ENCRYPTED_HEADER_SIZE);

        let opened = Header::open(&sealed, &temp_priv, &header_pub, b"outer").unwrap();
        assert_eq!(opened, header);

        let wrong_aad = Header::open(&sealed, &temp_priv, &header_pub, b"other");
        assert!(matches!(wrong_aad, Err(MessageError::AuthenticationFailed)));
    }

    #[test]
    fn test_oversized_fields_rejected() {
        let mut header = sample_header();
        header.nym_address = "n".repeat(MAX_NYM_ADDRESS_LEN + 1);
        assert!(matches!(header.validate(), Err(MessageError::InvalidInput(_))));

        let mut header = sample_header();
        header.sender.name = "a".repeat(MAX_NAME_LEN + 1);
        assert!(header.validate().is_err());
    }
}
