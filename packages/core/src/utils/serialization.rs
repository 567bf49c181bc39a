// Сериализация (bincode для бинарных структур, JSON для подписываемых)

use crate::error::CryptoError;
use serde::{Deserialize, Serialize};

pub fn to_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>, CryptoError> {
    bincode::serialize(data).map_err(|e| CryptoError::SerializationError(e.to_string()))
}

pub fn from_bytes<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, CryptoError> {
    bincode::deserialize(bytes).map_err(|e| CryptoError::DeserializationError(e.to_string()))
}

pub fn to_json<T: Serialize>(data: &T) -> Result<Vec<u8>, CryptoError> {
    serde_json::to_vec(data).map_err(|e| CryptoError::SerializationError(e.to_string()))
}

pub fn from_json<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, CryptoError> {
    serde_json::from_slice(bytes).map_err(|e| CryptoError::DeserializationError(e.to_string()))
}
