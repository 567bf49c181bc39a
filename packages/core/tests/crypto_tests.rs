//! Tests for cryptographic building blocks
//!
//! This test suite covers:
//! - Classic Suite Provider (X25519, Ed25519, ChaCha20-Poly1305, HKDF, SHA-512)
//! - Triple DH agreement and session chains
//! - Key-init bundles
//! - Outer header framing

use hush_core::crypto::handshake::{derive_root, initiator_agreement, responder_agreement};
use hush_core::crypto::messaging::ratchet::derive_chains;
use hush_core::crypto::suites::classic::ClassicSuiteProvider;
use hush_core::crypto::CryptoProvider;
use hush_core::error::FramingError;
use hush_core::protocol::limits::NUM_OF_FUTURE_KEYS;
use hush_core::utils::time;
use hush_core::{read_header, write_header, Identity, VERSION};
use rand::rngs::OsRng;

/// Test that ClassicSuiteProvider can generate KEM keys
#[test]
fn test_classic_suite_generate_kem_keys() {
    let result = ClassicSuiteProvider::generate_kem_keys(&mut OsRng);
    assert!(result.is_ok(), "Failed to generate KEM keys");

    let (private_key, public_key) = result.unwrap();

    // X25519 keys should be 32 bytes
    assert_eq!(private_key.len(), 32, "Private key should be 32 bytes");
    assert_eq!(public_key.len(), 32, "Public key should be 32 bytes");
}

/// Test signature creation and verification
#[test]
fn test_classic_suite_sign_verify() {
    let (signing_key, verifying_key) =
        ClassicSuiteProvider::generate_signature_keys(&mut OsRng).unwrap();
    let message = b"Hello, Hush!";

    let signature = ClassicSuiteProvider::sign(&signing_key, message).unwrap();
    assert_eq!(signature.len(), 64, "Signature should be 64 bytes");

    let verify_result = ClassicSuiteProvider::verify(&verifying_key, message, &signature);
    assert!(verify_result.is_ok(), "Signature verification failed");

    let wrong = ClassicSuiteProvider::verify(&verifying_key, b"Modified message", &signature);
    assert!(wrong.is_err(), "Verification should fail with wrong message");
}

/// Test AEAD encryption and decryption
#[test]
fn test_classic_suite_aead_encrypt_decrypt() {
    let key = vec![0u8; 32];
    let nonce = ClassicSuiteProvider::random_bytes(&mut OsRng, 12).unwrap();
    let plaintext = b"Secret message for encryption test";
    let aad = b"associated data";

    let ciphertext = ClassicSuiteProvider::aead_encrypt(&key, &nonce, plaintext, Some(aad)).unwrap();

    // Ciphertext should be plaintext + 16-byte tag
    assert_eq!(ciphertext.len(), plaintext.len() + 16, "Ciphertext length incorrect");

    let decrypted = ClassicSuiteProvider::aead_decrypt(&key, &nonce, &ciphertext, Some(aad)).unwrap();
    assert_eq!(decrypted, plaintext, "Decrypted plaintext doesn't match");

    let wrong_aad = ClassicSuiteProvider::aead_decrypt(&key, &nonce, &ciphertext, Some(b"other"));
    assert!(wrong_aad.is_err(), "Decryption should fail with wrong AAD");
}

/// Test that AEAD decryption fails with wrong key or nonce
#[test]
fn test_classic_suite_aead_decrypt_fails_with_wrong_key() {
    let key = vec![0u8; 32];
    let nonce = ClassicSuiteProvider::random_bytes(&mut OsRng, 12).unwrap();
    let ciphertext = ClassicSuiteProvider::aead_encrypt(&key, &nonce, b"Secret", None).unwrap();

    let result = ClassicSuiteProvider::aead_decrypt(&[1u8; 32], &nonce, &ciphertext, None);
    assert!(result.is_err(), "Decryption should fail with wrong key");

    let wrong_nonce = ClassicSuiteProvider::random_bytes(&mut OsRng, 12).unwrap();
    let result = ClassicSuiteProvider::aead_decrypt(&key, &wrong_nonce, &ciphertext, None);
    assert!(result.is_err(), "Decryption should fail with wrong nonce");
}

/// Test HKDF key derivation
#[test]
fn test_classic_suite_hkdf() {
    let salt = b"test_salt";
    let ikm = b"input_key_material_for_derivation";
    let info = b"context_info";

    let key = ClassicSuiteProvider::hkdf_derive_key(salt, ikm, info, 64).unwrap();
    assert_eq!(key.len(), 64, "Derived key length incorrect");

    // Verify determinism: same inputs should give same output
    let again = ClassicSuiteProvider::hkdf_derive_key(salt, ikm, info, 64).unwrap();
    assert_eq!(key, again, "HKDF should be deterministic");
}

/// Test KDF_RK and KDF_CK
#[test]
fn test_classic_suite_kdf_rk_ck() {
    let (root_key, chain_key) = ClassicSuiteProvider::kdf_rk(b"", &[1u8; 96]).unwrap();
    assert_eq!(root_key.len(), 32);
    assert_eq!(chain_key.len(), 32);
    assert_ne!(root_key, chain_key);

    let (seed, next) = ClassicSuiteProvider::kdf_ck(&chain_key).unwrap();
    assert_eq!(seed.len(), 32);
    assert_ne!(seed, next);
    assert_ne!(next, chain_key, "Chain key must advance");
}

/// Both sides of a triple DH end up with mirrored message key chains
#[test]
fn test_triple_dh_session_chains() {
    type P = ClassicSuiteProvider;
    let (ia, ia_pub) = P::generate_kem_keys(&mut OsRng).unwrap();
    let (ib, ib_pub) = P::generate_kem_keys(&mut OsRng).unwrap();
    let (x, x_pub) = P::generate_kem_keys(&mut OsRng).unwrap();
    let (y, y_pub) = P::generate_kem_keys(&mut OsRng).unwrap();
    let x_pub: [u8; 32] = x_pub.try_into().unwrap();
    let y_pub: [u8; 32] = y_pub.try_into().unwrap();

    let alice = derive_root::<P>(b"", &initiator_agreement::<P>(&ia, &x, &ib_pub, &y_pub).unwrap()).unwrap();
    let bob = derive_root::<P>(b"", &responder_agreement::<P>(&ib, &y, &ia_pub, &x_pub).unwrap()).unwrap();
    assert_eq!(alice.root_key_hash, bob.root_key_hash);

    let (alice_send, alice_recv, _) = derive_chains::<P>(&alice.chain_key, &x_pub, &y_pub, true).unwrap();
    let (bob_send, bob_recv, _) = derive_chains::<P>(&bob.chain_key, &x_pub, &y_pub, false).unwrap();
    assert_eq!(alice_send.len(), NUM_OF_FUTURE_KEYS);
    assert_eq!(alice_send, bob_recv);
    assert_eq!(alice_recv, bob_send);
}

/// Key-init bundle survives JSON transport and verifies for its owner
#[test]
fn test_key_init_bundle() {
    let bob = Identity::generate("bob@hush", &mut OsRng).unwrap();
    let now = time::now_secs();
    let (key_init, entry) = bob
        .key_init(0, now + 3600, now, false, "repo.hush", "mix.hush", "bob-nym", &mut OsRng)
        .unwrap();

    let parsed = hush_core::crypto::handshake::KeyInit::from_json(&key_init.to_json().unwrap()).unwrap();
    parsed.check().unwrap();
    parsed.verify(&["repo.hush"], bob.sig_pub()).unwrap();
    assert_eq!(parsed.key_entry_ecdhe25519(bob.sig_pub()).unwrap(), entry);
}

/// Outer header framing round trip and rejection
#[test]
fn test_outer_header_framing() {
    let bytes = write_header(VERSION, b"pre-header").unwrap();
    let (version, pre_header) = read_header(&mut bytes.as_slice()).unwrap();
    assert_eq!(version, VERSION);
    assert_eq!(pre_header, b"pre-header");

    let truncated = &bytes[..bytes.len() - 1];
    assert!(matches!(
        read_header(&mut &truncated[..]),
        Err(FramingError::Truncated)
    ));

    let other = write_header(VERSION + 1, b"pre-header").unwrap();
    assert!(matches!(
        read_header(&mut other.as_slice()),
        Err(FramingError::VersionMismatch { .. })
    ));
}

/// Test random number generation quality (entropy check)
#[test]
fn test_random_number_quality() {
    let mut bytes_set = std::collections::HashSet::new();

    // Generate 100 random nonces
    for _ in 0..100 {
        let nonce = ClassicSuiteProvider::random_bytes(&mut OsRng, 12).unwrap();
        let nonce_hex = hex::encode(&nonce);

        // All nonces should be unique
        assert!(
            bytes_set.insert(nonce_hex.clone()),
            "Duplicate nonce generated: {}",
            nonce_hex
        );
    }

    assert_eq!(bytes_set.len(), 100, "Not all nonces are unique");
}
