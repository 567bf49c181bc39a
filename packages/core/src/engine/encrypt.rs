// Encryption Engine

use super::{SIGNATURE_BLOCK, SIG_ABSENT, SIG_PRESENT};
use crate::config::Config;
use crate::crypto::keys::{Identity, PublicIdentity};
use crate::crypto::messaging::plan_send;
use crate::crypto::{ActiveSuite, CryptoProvider};
use crate::error::MessageError;
use crate::protocol::limits::{INNER_SIZE, MAX_CONTENT_LENGTH, SIGNATURE_LEN, UNENCODED_MSG_SIZE, VERSION};
use crate::protocol::{padding, write_header, PreHeader};
use crate::storage::KeyStore;
use crate::utils::{b64, time};
use rand_core::CryptoRngCore;
use std::io::{Read, Write};
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub struct EncryptArgs<'a> {
    pub from: &'a Identity,
    pub to: &'a PublicIdentity,
    pub sender_last_directory_hash: &'a [u8],
    /// Обратный адрес отправителя в mix-сети
    pub nym_address: &'a str,
    /// Постоянный ключ подписи; подпись ставится над H(content)
    pub signing_key: Option<&'a [u8; 32]>,
}

/// Шифрует содержимое `reader` и пишет конверт в `writer`.
/// Возвращает число записанных байт (всегда `ENCODED_MSG_SIZE`).
pub fn encrypt(
    writer: &mut dyn Write,
    args: &EncryptArgs<'_>,
    reader: &mut dyn Read,
    rng: &mut dyn CryptoRngCore,
    store: &mut dyn KeyStore,
) -> Result<usize, MessageError> {
    if args.from.public().shares_key_material(args.to) {
        warn!(target: "msg::encrypt", to = %args.to.name, "Refusing self-addressed message");
        return Err(MessageError::Reflection);
    }

    if let Some(signing_key) = args.signing_key {
        let public = ActiveSuite::from_signature_private_to_public(signing_key)?;
        if public.as_slice() != args.from.sig_pub().as_slice() {
            return Err(MessageError::InvalidInput(
                "signing key does not belong to sender".to_string(),
            ));
        }
    }

    let mut content = Zeroizing::new(Vec::new());
    reader
        .take(MAX_CONTENT_LENGTH as u64 + 1)
        .read_to_end(&mut content)?;
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(MessageError::ContentTooLarge {
            len: content.len(),
            max: MAX_CONTENT_LENGTH,
        });
    }

    let plan = plan_send(
        args.from,
        args.to,
        &*store,
        rng,
        Config::global(),
        time::now_secs(),
    )?;

    let mut header = plan.header;
    header.nym_address = args.nym_address.to_string();
    header.sender_last_directory_hash = args.sender_last_directory_hash.to_vec();

    let (header_priv, header_pub) = ActiveSuite::generate_kem_keys(rng)?;
    let header_priv = Zeroizing::new(header_priv);
    let header_pub: [u8; 32] = header_pub.as_slice().try_into().map_err(|_| {
        MessageError::InvalidInput("header key length".to_string())
    })?;

    let pre_header = PreHeader::new(
        header_pub,
        &args.to.sig_pub,
        &plan.recipient_temp.public_key,
    );
    let outer = write_header(VERSION, &pre_header.to_bytes())?;
    let sealed_header = header.seal(
        &header_priv,
        &plan.recipient_temp.public_key,
        &outer,
        rng,
    )?;

    let mut inner = Zeroizing::new(Vec::with_capacity(SIGNATURE_BLOCK + content.len()));
    match args.signing_key {
        Some(signing_key) => {
            let signature = ActiveSuite::sign(signing_key, &ActiveSuite::hash(&content))?;
            inner.push(SIG_PRESENT);
            inner.extend_from_slice(&signature);
        }
        None => {
            inner.push(SIG_ABSENT);
            inner.extend_from_slice(&[0u8; SIGNATURE_LEN]);
        }
    }
    inner.extend_from_slice(&content);
    let padded = Zeroizing::new(padding::pad(&inner, INNER_SIZE, rng)?);

    let mut envelope = Vec::with_capacity(UNENCODED_MSG_SIZE);
    envelope.extend_from_slice(&outer);
    envelope.extend_from_slice(&sealed_header);
    let body = ActiveSuite::aead_encrypt(
        plan.message_key.aead_key(),
        plan.message_key.nonce(),
        &padded,
        Some(&envelope),
    )?;
    envelope.extend_from_slice(&body);
    debug_assert_eq!(envelope.len(), UNENCODED_MSG_SIZE);

    // ключ израсходован только вместе с сохранённым состоянием
    store.apply(&plan.update)?;

    let encoded = b64::encode(&envelope);
    writer.write_all(encoded.as_bytes())?;

    debug!(
        target: "msg::encrypt",
        to = %args.to.name,
        content_len = content.len(),
        index = plan.update.consumed.index,
        signed = args.signing_key.is_some(),
        "Encrypted message"
    );
    Ok(encoded.len())
}
