//! 環境変数ベースの設定

use std::env;
use std::time::Duration;
use log::warn;

/// リクエストボディ上限の既定値（5MB）
pub const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

const ENV_MAX_BODY_SIZE: &str = "HANDLERCHAIN_MAX_BODY_SIZE";
const ENV_ASYNC_TIMEOUT_MS: &str = "HANDLERCHAIN_ASYNC_TIMEOUT_MS";
const ENV_EXPOSE_ERRORS: &str = "HANDLERCHAIN_EXPOSE_ERRORS";

/// ディスパッチャーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// リクエストボディの最大サイズ（バイト）
    pub max_body_size: usize,
    /// 遅延処理の待ち時間上限（`None` なら無制限）
    pub async_timeout: Option<Duration>,
    /// エラーレスポンスの本文にエラーメッセージを含めるか
    pub expose_error_details: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            async_timeout: None,
            expose_error_details: false,
        }
    }
}

impl DispatcherConfig {
    /// 環境変数から設定を読み込む
    ///
    /// 不正な値は警告を出して既定値にフォールバックする。
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_body_size = read_env(ENV_MAX_BODY_SIZE)
            .and_then(|s| parse_or_warn::<usize>(ENV_MAX_BODY_SIZE, &s))
            .unwrap_or(defaults.max_body_size);

        // 0 は「タイムアウトなし」として扱う
        let async_timeout = read_env(ENV_ASYNC_TIMEOUT_MS)
            .and_then(|s| parse_or_warn::<u64>(ENV_ASYNC_TIMEOUT_MS, &s))
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let expose_error_details = read_env(ENV_EXPOSE_ERRORS)
            .map(|s| parse_flag(&s))
            .unwrap_or(defaults.expose_error_details);

        Self {
            max_body_size,
            async_timeout,
            expose_error_details,
        }
    }

    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn with_async_timeout(mut self, timeout: Duration) -> Self {
        self.async_timeout = Some(timeout);
        self
    }

    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid value for {}: '{}'", key, raw);
            None
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
