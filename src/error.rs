//! エラー型の定義

use thiserror::Error;

/// アプリケーションのエラー型
///
/// インターセプターとハンドラーはこの型でエラーを返す。
/// チェーン側でどの段階の失敗かを [`crate::chain::Fault`] に包んで区別する。
#[derive(Error, Debug)]
pub enum Error {
    /// リクエストのルーティングエラー
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    /// 無効なリクエストボディ
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// リクエストボディのサイズ超過
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// レスポンスのシリアライズエラー
    #[error("Failed to serialize response: {0}")]
    ResponseSerializationError(String),

    /// インターセプターエラー
    #[error("Interceptor error: {0}")]
    InterceptorError(String),

    /// 内部サーバーエラー
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 認証エラー
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// 認可エラー
    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    /// 遅延処理がキャンセルされた（クライアント切断、完了側の破棄など）
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// 遅延処理のタイムアウト
    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) => 404,
            Error::InvalidRequestBody(_) => 400,
            Error::PayloadTooLarge(_) => 413,
            Error::ResponseSerializationError(_) => 500,
            Error::InterceptorError(_) => 500,
            Error::InternalServerError(_) => 500,
            Error::ConfigurationError(_) => 500,
            Error::AuthenticationError(_) => 401,
            Error::AuthorizationError(_) => 403,
            Error::Cancelled(_) => 500,
            Error::Timeout(_) => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(Error::RouteNotFound("/x".into()).status_code(), 404);
        assert_eq!(Error::InvalidRequestBody("bad".into()).status_code(), 400);
        assert_eq!(Error::PayloadTooLarge("big".into()).status_code(), 413);
        assert_eq!(Error::AuthenticationError("who".into()).status_code(), 401);
        assert_eq!(Error::AuthorizationError("no".into()).status_code(), 403);
        assert_eq!(Error::Timeout("slow".into()).status_code(), 503);
        assert_eq!(Error::Cancelled("gone".into()).status_code(), 500);
    }

    #[test]
    fn test_display() {
        let err = Error::InterceptorError("boom".to_string());
        assert_eq!(err.to_string(), "Interceptor error: boom");
    }
}
