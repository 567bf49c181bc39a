//! Формат конверта
//!
//! ```text
//! outer header  = version | pre_header_len | pre_header          (framing, pre_header)
//! header_ct     = AEAD(header_key, pad(Header), aad = outer)      (header)
//! body_ct       = AEAD(message_key, pad(sig_flag | sig | content),
//!                      aad = outer | header_ct)                   (padding)
//! ```
//!
//! Весь конверт до base64 занимает ровно `limits::UNENCODED_MSG_SIZE` байт.

pub mod framing;
pub mod header;
pub mod limits;
pub mod padding;
pub mod pre_header;

pub use framing::{read_header, write_header};
pub use header::Header;
pub use pre_header::PreHeader;
