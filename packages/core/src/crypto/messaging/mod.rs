//! Сессионный ratchet
//!
//! ## Dataflow
//! ```text
//! Нет состояния ──первый send/receive──▶ Active (key_init_session = true)
//!                                           │
//!       осталось <= rotation_margin ключей  │ или собеседник объявил следующий ключ
//!                                           ▼
//!                                   RotationPending (next_sender_session_pub)
//!                                           │
//!       send-цепочка исчерпана, либо пришло │ сообщение новой сессии
//!                                           ▼
//!                                   Active (новая пара ключей, новые цепочки)
//! ```
//!
//! ## Security Properties
//!
//! ### Forward Secrecy
//! Каждый ключ сообщения удаляется после использования; хранится только
//! chain key, продвинутый за все 50 шагов, поэтому из него нельзя
//! восстановить уже выданные ключи.
//!
//! ### Без регенерации
//! Исчерпанная recv-цепочка не пересчитывается: сообщение с индексом
//! за её пределами отклоняется с `ChainExhausted`.

pub mod ratchet;

pub use ratchet::{plan_receive, plan_send, ReceivePlan, SendPlan, SessionState};
