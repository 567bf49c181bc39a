//! Defines the CryptoProvider trait for crypto-agility.

use crate::error::CryptoError;
use rand_core::CryptoRngCore;

/// Trait that formalizes all cryptographic operations for a specific cipher suite.
///
/// Randomness is always supplied by the caller. Implementations must fail
/// when the source fails and never fall back to another source.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Human-readable ciphersuite identifier carried in every pre-header.
    const CIPHERSUITE: &'static str;

    /// Length of public/private key-agreement keys.
    const KEY_LEN: usize;

    /// Length of a detached signature.
    const SIGNATURE_LEN: usize;

    /// Length of the AEAD authentication tag.
    const TAG_LEN: usize;

    /// Length of the AEAD nonce.
    const NONCE_LEN: usize;

    /// Fills a fresh buffer from `rng`.
    fn random_bytes(rng: &mut dyn CryptoRngCore, len: usize) -> Result<Vec<u8>, CryptoError>;

    /// Generates a new key-agreement key pair as `(private, public)`.
    fn generate_kem_keys(rng: &mut dyn CryptoRngCore) -> Result<(Vec<u8>, Vec<u8>), CryptoError>;

    /// Derives a key-agreement public key from its private key.
    fn from_private_key_to_public_key(private_key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Computes the shared secret. Rejects non-contributory (all-zero) results.
    fn diffie_hellman(private_key: &[u8], public_key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Generates a new Signature key pair as `(private, public)`.
    fn generate_signature_keys(
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError>;

    /// Derives a Signature public key from a Signature private key.
    fn from_signature_private_to_public(private_key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Signs a message with the given private key.
    fn sign(private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verifies a signature with the given public key.
    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError>;

    /// Performs AEAD encryption, returning ciphertext with the tag appended.
    fn aead_encrypt(
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Performs AEAD decryption.
    fn aead_decrypt(
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Derives a key from input key material using HKDF.
    fn hkdf_derive_key(
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Derives a root key and a chain key from a salt (previous root hash) and key-agreement output.
    fn kdf_rk(salt: &[u8], dh_output: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CryptoError>;

    /// Derives a message-key seed and the next chain key from the current chain key.
    fn kdf_ck(chain_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CryptoError>;

    /// 64-byte digest used for key hashes, identity tags and signatures.
    fn hash(data: &[u8]) -> [u8; 64];
}
