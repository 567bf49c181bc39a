//! Triple Diffie-Hellman
//!
//! ## Ключи
//!
//! ### Инициатор
//! - **IA**: долгосрочный ключ обмена identity
//! - **X**: сессионный ключ, свежий для каждой сессии
//!
//! ### Получатель
//! - **IB**: долгосрочный ключ обмена identity
//! - **Y**: опубликованный key-init ключ или сессионный ключ, объявленный ранее
//!
//! ## Протокол
//!
//! ```text
//! Инициатор:                    Получатель:
//!   t1 = DH(IA, Y)                t1 = DH(Y, IA)
//!   t2 = DH(X, IB)                t2 = DH(IB, X)
//!   t3 = DH(X, Y)                 t3 = DH(Y, X)
//!
//! (root_key, chain_key) = KDF_RK(salt, t1 | t2 | t3)
//! root_key_hash = H(root_key)
//! ```

use crate::crypto::provider::CryptoProvider;
use crate::error::CryptoError;
use tracing::debug;
use zeroize::Zeroizing;

/// Результат согласования: хранится только хеш root key и chain key
pub struct RootKeys {
    pub root_key_hash: [u8; 64],
    pub chain_key: Zeroizing<Vec<u8>>,
}

fn concat(parts: [Zeroizing<Vec<u8>>; 3]) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(parts.iter().map(|p| p.len()).sum()));
    for part in parts.iter() {
        out.extend_from_slice(part);
    }
    out
}

/// Сторона, начинающая сессию
pub fn initiator_agreement<P: CryptoProvider>(
    identity_priv: &[u8],
    session_priv: &[u8],
    peer_identity_pub: &[u8],
    peer_key_pub: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let t1 = Zeroizing::new(P::diffie_hellman(identity_priv, peer_key_pub)?);
    let t2 = Zeroizing::new(P::diffie_hellman(session_priv, peer_identity_pub)?);
    let t3 = Zeroizing::new(P::diffie_hellman(session_priv, peer_key_pub)?);
    Ok(concat([t1, t2, t3]))
}

/// Сторона, чей ключ `Y` был использован
pub fn responder_agreement<P: CryptoProvider>(
    identity_priv: &[u8],
    key_priv: &[u8],
    peer_identity_pub: &[u8],
    peer_session_pub: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let t1 = Zeroizing::new(P::diffie_hellman(key_priv, peer_identity_pub)?);
    let t2 = Zeroizing::new(P::diffie_hellman(identity_priv, peer_session_pub)?);
    let t3 = Zeroizing::new(P::diffie_hellman(key_priv, peer_session_pub)?);
    Ok(concat([t1, t2, t3]))
}

pub fn derive_root<P: CryptoProvider>(
    salt: &[u8],
    agreement: &[u8],
) -> Result<RootKeys, CryptoError> {
    let (root_key, chain_key) = P::kdf_rk(salt, agreement)?;
    let root_key = Zeroizing::new(root_key);
    debug!(
        target: "crypto::handshake",
        chained = !salt.is_empty(),
        "Derived root key"
    );
    Ok(RootKeys {
        root_key_hash: P::hash(&root_key),
        chain_key: Zeroizing::new(chain_key),
    })
}

/// Соль для сессии, заменяющей сессию с этими ключами
pub fn rotation_salt(previous_root_key_hash: &[u8; 64], previous_chain_key: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut salt = Zeroizing::new(Vec::with_capacity(64 + previous_chain_key.len()));
    salt.extend_from_slice(previous_root_key_hash);
    salt.extend_from_slice(previous_chain_key);
    salt
}
