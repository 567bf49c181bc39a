use crate::crypto::provider::CryptoProvider;
use crate::error::CryptoError;
use chacha20poly1305::{
    aead::{Aead, Payload},
    ChaCha20Poly1305, Key as AeadKeyChacha, KeyInit, Nonce,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256, Sha512};
use x25519_dalek::{PublicKey as KemPublicKeyDalek, StaticSecret};
use zeroize::Zeroize;

const ROOT_KEY_INFO: &[u8] = b"hush root key";
const CHAIN_KEY_INFO: &[u8] = b"hush chain key";

/// Concrete implementation of `CryptoProvider` for the classic suite:
/// X25519, ChaCha20-Poly1305, Ed25519, HKDF-SHA256, SHA-512.
pub struct ClassicSuiteProvider;

fn to_array32(bytes: &[u8], what: &str) -> Result<[u8; 32], CryptoError> {
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidInputError(format!("Invalid {} length", what)))
}

impl CryptoProvider for ClassicSuiteProvider {
    const CIPHERSUITE: &'static str = "CURVE25519 CHACHA20 POLY1305";
    const KEY_LEN: usize = 32;
    const SIGNATURE_LEN: usize = 64;
    const TAG_LEN: usize = 16;
    const NONCE_LEN: usize = 12;

    fn random_bytes(rng: &mut dyn CryptoRngCore, len: usize) -> Result<Vec<u8>, CryptoError> {
        let mut bytes = vec![0u8; len];
        rng.try_fill_bytes(&mut bytes)?;
        Ok(bytes)
    }

    fn generate_kem_keys(rng: &mut dyn CryptoRngCore) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let mut seed = to_array32(&Self::random_bytes(rng, 32)?, "KEM seed")?;
        let private_key = StaticSecret::from(seed);
        seed.zeroize();
        let public_key = KemPublicKeyDalek::from(&private_key);
        Ok((private_key.to_bytes().to_vec(), public_key.to_bytes().to_vec()))
    }

    fn from_private_key_to_public_key(private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let static_secret = StaticSecret::from(to_array32(private_key, "KEM private key")?);
        let public_key = KemPublicKeyDalek::from(&static_secret);
        Ok(public_key.to_bytes().to_vec())
    }

    fn diffie_hellman(private_key: &[u8], public_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let static_secret = StaticSecret::from(to_array32(private_key, "KEM private key")?);
        let remote = KemPublicKeyDalek::from(to_array32(public_key, "KEM public key")?);
        let shared_secret = static_secret.diffie_hellman(&remote);
        if !shared_secret.was_contributory() {
            return Err(CryptoError::KeyAgreementError(
                "non-contributory key agreement".to_string(),
            ));
        }
        Ok(shared_secret.to_bytes().to_vec())
    }

    fn generate_signature_keys(
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let mut seed = to_array32(&Self::random_bytes(rng, 32)?, "signing seed")?;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        let verifying_key = signing_key.verifying_key();
        Ok((
            signing_key.to_bytes().to_vec(),
            verifying_key.to_bytes().to_vec(),
        ))
    }

    fn from_signature_private_to_public(private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signing_key = SigningKey::from_bytes(&to_array32(private_key, "signing key")?);
        Ok(signing_key.verifying_key().to_bytes().to_vec())
    }

    fn sign(private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signing_key = SigningKey::from_bytes(&to_array32(private_key, "signing key")?);
        let signature = signing_key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }

    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let verifying_key = VerifyingKey::from_bytes(&to_array32(public_key, "verifying key")?)
            .map_err(|e| CryptoError::InvalidInputError(format!("Invalid verifying key: {}", e)))?;

        let sig_bytes: &[u8; 64] = signature
            .try_into()
            .map_err(|_| CryptoError::InvalidInputError("Invalid signature length".to_string()))?;
        let signature_obj = Signature::from_bytes(sig_bytes);

        verifying_key
            .verify(message, &signature_obj)
            .map_err(|e| CryptoError::SignatureVerificationError(e.to_string()))
    }

    fn aead_encrypt(
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        if key.len() != 32 || nonce.len() != Self::NONCE_LEN {
            return Err(CryptoError::InvalidInputError(
                "Invalid AEAD key or nonce length".to_string(),
            ));
        }
        let cipher = ChaCha20Poly1305::new(AeadKeyChacha::from_slice(key));
        let payload = Payload {
            msg: plaintext,
            aad: associated_data.unwrap_or(b""),
        };

        cipher
            .encrypt(Nonce::from_slice(nonce), payload)
            .map_err(|e| CryptoError::AeadEncryptionError(e.to_string()))
    }

    fn aead_decrypt(
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        if key.len() != 32 || nonce.len() != Self::NONCE_LEN {
            return Err(CryptoError::InvalidInputError(
                "Invalid AEAD key or nonce length".to_string(),
            ));
        }
        let cipher = ChaCha20Poly1305::new(AeadKeyChacha::from_slice(key));
        let payload = Payload {
            msg: ciphertext,
            aad: associated_data.unwrap_or(b""),
        };

        cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map_err(|e| CryptoError::AeadDecryptionError(e.to_string()))
    }

    fn hkdf_derive_key(
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
        let mut okm = vec![0u8; len];
        hkdf.expand(info, &mut okm)
            .map_err(|e| CryptoError::KeyDerivationError(e.to_string()))?;
        Ok(okm)
    }

    fn kdf_rk(salt: &[u8], dh_output: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let mut output = Self::hkdf_derive_key(salt, dh_output, ROOT_KEY_INFO, 64)?;
        let root_key = output[..32].to_vec();
        let chain_key = output[32..].to_vec();
        output.zeroize();
        Ok((root_key, chain_key))
    }

    fn kdf_ck(chain_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let mut output = Self::hkdf_derive_key(chain_key, b"", CHAIN_KEY_INFO, 64)?;
        let seed = output[..32].to_vec();
        let next_chain = output[32..].to_vec();
        output.zeroize();
        Ok((seed, next_chain))
    }

    fn hash(data: &[u8]) -> [u8; 64] {
        let digest = Sha512::digest(data);
        let mut out = [0u8; 64];
        out.copy_from_slice(&digest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_diffie_hellman_agrees() {
        let (a_priv, a_pub) = ClassicSuiteProvider::generate_kem_keys(&mut OsRng).unwrap();
        let (b_priv, b_pub) = ClassicSuiteProvider::generate_kem_keys(&mut OsRng).unwrap();
        let ab = ClassicSuiteProvider::diffie_hellman(&a_priv, &b_pub).unwrap();
        let ba = ClassicSuiteProvider::diffie_hellman(&b_priv, &a_pub).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_diffie_hellman_rejects_low_order_point() {
        let (a_priv, _) = ClassicSuiteProvider::generate_kem_keys(&mut OsRng).unwrap();
        let result = ClassicSuiteProvider::diffie_hellman(&a_priv, &[0u8; 32]);
        assert!(matches!(result, Err(CryptoError::KeyAgreementError(_))));
    }

    #[test]
    fn test_kdf_ck_is_one_way_chain() {
        let (seed1, ck1) = ClassicSuiteProvider::kdf_ck(&[7u8; 32]).unwrap();
        let (seed2, ck2) = ClassicSuiteProvider::kdf_ck(&ck1).unwrap();
        assert_ne!(seed1, seed2);
        assert_ne!(ck1, ck2);
        assert_ne!(seed1, ck1);
    }

    #[test]
    fn test_aead_rejects_bad_key_length() {
        let result = ClassicSuiteProvider::aead_encrypt(&[0u8; 16], &[0u8; 12], b"x", None);
        assert!(result.is_err());
    }
}
