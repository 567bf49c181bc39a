//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              engine::{encrypt, decrypt}                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   handshake               │  │  messaging::ratchet      │
//! │  - triple DH              │  │  - SessionState          │
//! │  - key-init бандлы        │  │  - цепочки по 50 ключей  │
//! │  - root/chain key         │  │  - ротация сессий        │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                └─────────────┬─────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CryptoProvider (Crypto-Agility)                │
//! │  - X25519, Ed25519, ChaCha20-Poly1305, HKDF, SHA-512        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// ============================================================================
// Core Traits
// ============================================================================

/// CryptoProvider trait для crypto-agility
pub mod provider;

/// Установка сессий (triple DH, key-init)
pub mod handshake;

/// Сессионный ratchet
pub mod messaging;

// ============================================================================
// Implementations
// ============================================================================

pub mod suites;

// ============================================================================
// Key material
// ============================================================================

pub mod keys;

// ============================================================================
// Re-exports для удобства
// ============================================================================

pub use provider::CryptoProvider;

/// Набор, которым пользуется движок сообщений
pub type ActiveSuite = suites::classic::ClassicSuiteProvider;

/// Идентификатор набора в pre-header
pub const CIPHERSUITE: &str = <ActiveSuite as CryptoProvider>::CIPHERSUITE;
