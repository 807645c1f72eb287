//! HTTP関連の基本型

use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use crate::error::Error;

/// 既定で付与するセキュリティヘッダー
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("X-XSS-Protection", "1; mode=block"),
    ("Referrer-Policy", "strict-origin-when-cross-origin"),
    ("Content-Security-Policy", "default-src 'self'"),
];

/// HTTPステータスコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    // 2xx Success
    Ok = 200,
    Created = 201,
    NoContent = 204,

    // 4xx Client Error
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    PayloadTooLarge = 413,
    TooManyRequests = 429,

    // 5xx Server Error
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// u16の値を取得
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// u16から変換（未定義のコードはNone）
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(StatusCode::Ok),
            201 => Some(StatusCode::Created),
            204 => Some(StatusCode::NoContent),
            400 => Some(StatusCode::BadRequest),
            401 => Some(StatusCode::Unauthorized),
            403 => Some(StatusCode::Forbidden),
            404 => Some(StatusCode::NotFound),
            405 => Some(StatusCode::MethodNotAllowed),
            413 => Some(StatusCode::PayloadTooLarge),
            429 => Some(StatusCode::TooManyRequests),
            500 => Some(StatusCode::InternalServerError),
            501 => Some(StatusCode::NotImplemented),
            502 => Some(StatusCode::BadGateway),
            503 => Some(StatusCode::ServiceUnavailable),
            _ => None,
        }
    }

    /// 理由句を取得
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::TooManyRequests => "Too Many Requests",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 成功ステータスかどうか判定
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> u16 {
        status.as_u16()
    }
}

/// HTTPメソッド
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
        };
        f.write_str(name)
    }
}

impl Method {
    /// 文字列からMethodに変換
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_uppercase().as_str() {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "PATCH" => Some(Method::PATCH),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            _ => None,
        }
    }
}

/// HTTPリクエスト
///
/// トランスポート層から受け取った内容をそのまま保持する。
/// インターセプター間で共有する値は [`super::RequestContext`] の属性に置く。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTPメソッド
    pub method: Method,
    /// リクエストパス
    pub path: String,
    /// クエリパラメータ
    pub query_params: HashMap<String, String>,
    /// HTTPヘッダー
    pub headers: HashMap<String, String>,
    /// リクエストボディ
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// 新しいリクエストを作成
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: HashMap::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// クエリパラメータを追加
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// ヘッダーを追加
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// ボディを追加
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// ヘッダー値を取得（キーの大文字小文字は区別しない）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// ボディのバイト数
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    /// ボディをJSONとしてパース
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, Error> {
        if let Some(body) = &self.body {
            serde_json::from_slice(body)
                .map_err(|e| Error::InvalidRequestBody(e.to_string()))
        } else {
            Err(Error::InvalidRequestBody("No request body".to_string()))
        }
    }
}

/// HTTPレスポンス
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTPステータスコード
    pub status: u16,
    /// HTTPヘッダー
    pub headers: HashMap<String, String>,
    /// レスポンスボディ
    pub body: Option<Vec<u8>>,
}

impl Response {
    /// 新しいレスポンスを作成
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// ヘッダーを追加
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// ボディを追加
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// テキストボディを設定
    pub fn text(self, text: impl Into<String>) -> Self {
        self.with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(text.into().into_bytes())
    }

    /// JSONをボディとして設定
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value)
            .map_err(|e| Error::ResponseSerializationError(e.to_string()))?;

        self.headers.insert("Content-Type".to_string(), "application/json".to_string());
        self.body = Some(json);
        Ok(self)
    }

    /// 未設定のセキュリティヘッダーだけを追加（既存の値は上書きしない）
    pub fn apply_security_headers(&mut self) {
        for (key, value) in SECURITY_HEADERS {
            if !self.headers.keys().any(|k| k.eq_ignore_ascii_case(key)) {
                self.headers.insert((*key).to_string(), (*value).to_string());
            }
        }
    }

    /// ヘッダー値を取得（キーの大文字小文字は区別しない）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// ボディを文字列として取得
    pub fn body_text(&self) -> Option<String> {
        self.body.as_ref().map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// 200 OKレスポンスを作成
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// 204 No Contentレスポンスを作成
    pub fn no_content() -> Self {
        Self::new(204)
    }

    /// 401 Unauthorizedレスポンスを作成
    pub fn unauthorized() -> Self {
        Self::new(401)
    }

    /// 403 Forbiddenレスポンスを作成
    pub fn forbidden() -> Self {
        Self::new(403)
    }

    /// Error型から固定メッセージのレスポンスを生成
    ///
    /// `expose_details` が真ならエラーメッセージ本文も含める。
    pub fn from_error(error: &Error, expose_details: bool) -> Self {
        let status = error.status_code();
        let reason = StatusCode::from_u16(status)
            .map(|s| s.reason_phrase())
            .unwrap_or("Error");
        let body = if expose_details {
            format!("{}: {}", reason, error)
        } else {
            reason.to_string()
        };
        Response::new(status).text(body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Serialize, Deserialize};

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("GET"), Some(Method::GET));
        assert_eq!(Method::parse("get"), Some(Method::GET));
        assert_eq!(Method::parse("OPTIONS"), Some(Method::OPTIONS));
        assert_eq!(Method::parse("INVALID"), None);
        assert_eq!(Method::DELETE.to_string(), "DELETE");
    }

    #[test]
    fn test_request_builder() {
        let req = Request::new(Method::GET, "/test")
            .with_query_param("key1", "value1")
            .with_header("Content-Type", "application/json")
            .with_body(b"test body".to_vec());

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/test");
        assert_eq!(req.query_params.get("key1"), Some(&"value1".to_string()));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body_len(), 9);
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_response_json() {
        let data = TestData { name: "test".to_string(), value: 42 };
        let res = Response::ok().json(&data).unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("application/json"));
        let decoded: TestData = serde_json::from_slice(res.body.as_ref().unwrap()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_request_json_without_body() {
        let req = Request::new(Method::POST, "/test");
        let result: Result<TestData, Error> = req.json();
        assert!(matches!(result, Err(Error::InvalidRequestBody(_))));
    }

    #[test]
    fn test_security_headers_do_not_override() {
        let mut res = Response::ok().with_header("X-Frame-Options", "SAMEORIGIN");
        res.apply_security_headers();

        assert_eq!(res.header("X-Frame-Options"), Some("SAMEORIGIN"));
        assert_eq!(res.header("X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(res.header("Content-Security-Policy"), Some("default-src 'self'"));
    }

    #[test]
    fn test_from_error_hides_details_by_default() {
        let err = Error::AuthorizationError("secret reason".to_string());

        let res = Response::from_error(&err, false);
        assert_eq!(res.status, 403);
        assert_eq!(res.body_text().as_deref(), Some("Forbidden"));

        let res = Response::from_error(&err, true);
        assert_eq!(res.body_text().as_deref(), Some("Forbidden: Authorization error: secret reason"));
    }

    #[test]
    fn test_status_code_roundtrip() {
        assert_eq!(StatusCode::from_u16(413), Some(StatusCode::PayloadTooLarge));
        assert_eq!(StatusCode::from_u16(418), None);
        let code: u16 = StatusCode::ServiceUnavailable.into();
        assert_eq!(code, 503);
        assert!(StatusCode::Created.is_success());
        assert!(!StatusCode::NotFound.is_success());
    }
}
