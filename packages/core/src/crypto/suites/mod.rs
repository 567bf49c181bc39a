//! Криптографические наборы (Crypto Suites)
//!
//! ### Classic Suite (текущий)
//! - **Key agreement**: X25519
//! - **Signatures**: Ed25519 (над SHA-512 от открытого текста)
//! - **AEAD**: ChaCha20-Poly1305
//! - **KDF**: HKDF-SHA256
//! - **Digest**: SHA-512
//! - **Идентификатор**: `"CURVE25519 CHACHA20 POLY1305"`
//!
//! ```rust
//! use hush_core::crypto::suites::classic::ClassicSuiteProvider;
//! use hush_core::crypto::provider::CryptoProvider;
//! use rand::rngs::OsRng;
//!
//! let (_private_key, public_key) = ClassicSuiteProvider::generate_kem_keys(&mut OsRng).unwrap();
//! assert_eq!(public_key.len(), 32);
//! ```

pub mod classic;
