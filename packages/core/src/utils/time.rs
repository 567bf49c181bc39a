// Время (Unix seconds)

use chrono::Utc;

/// Текущее время в секундах с эпохи Unix
pub fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
