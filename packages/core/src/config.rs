//! Централизованная конфигурация ядра
//!
//! Здесь только настраиваемые параметры. Всё, что определяет формат
//! конверта на проводе (версия, размеры, длина цепочки), живёт в
//! `protocol::limits` и не меняется без смены версии протокола.

use crate::protocol::limits::NUM_OF_FUTURE_KEYS;
use std::sync::OnceLock;

/// Глобальная конфигурация (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // РОТАЦИЯ СЕССИОННЫХ КЛЮЧЕЙ
    // ============================================

    /// Сколько неиспользованных send-ключей должно остаться,
    /// чтобы начать готовить следующий сессионный ключ
    pub rotation_margin: usize,

    /// Через сколько секунд сгенерированный сессионный ключ
    /// считается устаревшим для `cleanup_session_keys`
    /// По умолчанию: 30 дней
    pub session_key_lifetime_secs: u64,

    // ============================================
    // KEY-INIT
    // ============================================

    /// Максимальный срок жизни key-init бандла (в секундах)
    /// По умолчанию: 90 дней
    pub key_init_max_not_after_secs: u64,
}

impl Config {
    /// Создать конфигурацию с дефолтными значениями
    pub fn default() -> Self {
        Self {
            rotation_margin: 10,
            session_key_lifetime_secs: 30 * 24 * 60 * 60, // 30 days
            key_init_max_not_after_secs: 90 * 24 * 60 * 60, // 90 days
        }
    }

    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HUSH_ROTATION_MARGIN") {
            if let Ok(parsed) = val.parse::<usize>() {
                // margin must leave at least one key of the chain unused by staging
                config.rotation_margin = parsed.min(NUM_OF_FUTURE_KEYS - 1);
            }
        }

        if let Ok(val) = std::env::var("HUSH_SESSION_KEY_LIFETIME_SECS") {
            if let Ok(parsed) = val.parse() {
                config.session_key_lifetime_secs = parsed;
            }
        }

        if let Ok(val) = std::env::var("HUSH_KEY_INIT_MAX_NOT_AFTER_SECS") {
            if let Ok(parsed) = val.parse() {
                config.key_init_max_not_after_secs = parsed;
            }
        }

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// При первом вызове инициализирует значениями по умолчанию
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::default())
            .map_err(|_| "Config already initialized")
    }

    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }

    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}
