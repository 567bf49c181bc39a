// Decryption Engine

use super::{SIGNATURE_BLOCK, SIG_ABSENT, SIG_PRESENT};
use crate::crypto::keys::{Identity, KeyEntry, PublicIdentity};
use crate::crypto::messaging::plan_receive;
use crate::crypto::{ActiveSuite, CryptoProvider};
use crate::error::{FramingError, MessageError, StoreError};
use crate::protocol::header::Header;
use crate::protocol::limits::{ENCRYPTED_HEADER_SIZE, INNER_SIZE, UNENCODED_MSG_SIZE, VERSION};
use crate::protocol::{padding, write_header, PreHeader};
use crate::storage::KeyStore;
use crate::utils::b64;
use std::io::{Read, Write};
use tracing::{debug, warn};
use zeroize::Zeroizing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    pub bytes_written: usize,
    /// Подпись над H(content), если отправитель её поставил
    pub signature: Option<Vec<u8>>,
    pub sender: PublicIdentity,
}

/// Ищет наш ключ, на который указывает pre-header:
/// сначала сессионные ключи, затем key-init
fn recipient_key(store: &dyn KeyStore, hash: &str) -> Result<KeyEntry, MessageError> {
    match store.get_session_key(hash) {
        Ok(entry) if entry.has_private_key() => Ok(entry),
        Ok(_) => Err(MessageError::ResendRequested),
        Err(StoreError::NoKeyEntry(_)) => store.get_private_key_entry(hash).map_err(Into::into),
        Err(e) => Err(e.into()),
    }
}

/// Расшифровывает тело конверта. `reader` стоит сразу за внешним
/// заголовком, `pre_header` получен из `read_header`.
pub fn decrypt(
    writer: &mut dyn Write,
    identities: &[Identity],
    pre_header: &[u8],
    reader: &mut dyn Read,
    store: &mut dyn KeyStore,
) -> Result<Decrypted, MessageError> {
    let parsed = PreHeader::parse(pre_header)?;
    let outer = write_header(VERSION, pre_header)?;

    let expected = UNENCODED_MSG_SIZE - outer.len();
    let mut rest = Vec::with_capacity(expected);
    reader.take(expected as u64 + 1).read_to_end(&mut rest)?;
    if rest.len() < expected {
        return Err(FramingError::Truncated.into());
    }
    if rest.len() > expected {
        return Err(MessageError::InvalidInput("trailing data after envelope".to_string()));
    }
    let (sealed_header, body) = rest.split_at(ENCRYPTED_HEADER_SIZE);

    let identity = identities
        .iter()
        .find(|identity| parsed.matches(identity.sig_pub()))
        .ok_or(MessageError::NoMatchingIdentity)?;

    let key_hash = b64::encode(&parsed.recipient_temp_hash);
    let recipient = recipient_key(&*store, &key_hash)?;

    let header = Header::open(
        sealed_header,
        recipient.private_key()?,
        &parsed.sender_header_pub,
        &outer,
    )
    .map_err(|e| {
        warn!(target: "msg::decrypt", error = %e, "Header rejected");
        e
    })?;
    if header.recipient_temp_hash != parsed.recipient_temp_hash {
        return Err(MessageError::MalformedHeader(
            "recipient key hash differs from pre-header".to_string(),
        ));
    }

    let plan = plan_receive(identity, &header, &recipient, &*store)?;

    let mut aad = Vec::with_capacity(outer.len() + sealed_header.len());
    aad.extend_from_slice(&outer);
    aad.extend_from_slice(sealed_header);
    let padded = ActiveSuite::aead_decrypt(
        plan.message_key.aead_key(),
        plan.message_key.nonce(),
        body,
        Some(&aad),
    )
    .map(Zeroizing::new)
    .map_err(|_| {
        warn!(target: "msg::decrypt", from = %header.sender.name, "Body authentication failed");
        MessageError::AuthenticationFailed
    })?;

    let inner = padding::unpad(&padded, INNER_SIZE)?;
    if inner.len() < SIGNATURE_BLOCK {
        return Err(MessageError::MalformedPadding);
    }
    let (signature_block, content) = inner.split_at(SIGNATURE_BLOCK);
    let signature = match signature_block[0] {
        SIG_ABSENT => None,
        SIG_PRESENT => {
            let signature = &signature_block[1..];
            ActiveSuite::verify(&header.sender.sig_pub, &ActiveSuite::hash(content), signature)
                .map_err(|_| MessageError::InvalidSignature)?;
            Some(signature.to_vec())
        }
        _ => return Err(MessageError::MalformedPadding),
    };

    // всё проверено: расходуем ключ и сохраняем состояние до выдачи текста
    store.apply(&plan.update)?;

    writer.write_all(content)?;

    debug!(
        target: "msg::decrypt",
        from = %header.sender.name,
        index = plan.update.consumed.index,
        content_len = content.len(),
        signed = signature.is_some(),
        "Decrypted message"
    );
    Ok(Decrypted {
        bytes_written: content.len(),
        signature,
        sender: header.sender,
    })
}
