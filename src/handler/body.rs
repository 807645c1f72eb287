use log::warn;
use serde::de::DeserializeOwned;

use crate::common::Request;
use crate::error::Error;

/// Content-Typeの許容範囲を判定
pub fn is_json_like_content_type(ct: &str) -> bool {
    let main_type = ct
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    main_type == "application/json" || main_type.ends_with("+json")
}

/// 空でないボディがあればJSONとしてデコードする
///
/// ボディが無い（または長さ0）の場合は `None`。
pub fn decode_json_body<T: DeserializeOwned>(req: &Request) -> Result<Option<T>, Error> {
    if req.body_len() == 0 {
        return Ok(None);
    }

    let ct = req.header("content-type").ok_or_else(|| {
        warn!("Request with body missing Content-Type header");
        Error::InvalidRequestBody("Missing Content-Type header".to_string())
    })?;

    if !is_json_like_content_type(ct) {
        warn!("Unsupported Content-Type for JSON parsing: {}", ct);
        return Err(Error::InvalidRequestBody(format!(
            "Unsupported Content-Type: {} (expected application/json or *+json)",
            ct
        )));
    }

    req.json::<T>().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Method;

    #[test]
    fn test_json_like_content_types() {
        assert!(is_json_like_content_type("application/json"));
        assert!(is_json_like_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_like_content_type("application/problem+json"));
        assert!(!is_json_like_content_type("text/plain"));
    }

    #[test]
    fn test_decode_rejects_wrong_content_type() {
        let req = Request::new(Method::POST, "/")
            .with_header("Content-Type", "text/plain")
            .with_body(b"{}".to_vec());
        let result: Result<Option<serde_json::Value>, Error> = decode_json_body(&req);
        assert!(matches!(result, Err(Error::InvalidRequestBody(_))));
    }

    #[test]
    fn test_decode_empty_body_is_none() {
        let req = Request::new(Method::POST, "/").with_body(Vec::new());
        let result: Option<serde_json::Value> = decode_json_body(&req).unwrap();
        assert!(result.is_none());
    }
}
