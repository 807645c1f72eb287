//! リクエストコンテキストの実装

use std::collections::HashMap;
use std::any::Any;

use super::http::{Request, Response};

/// 型付き属性マップ（インターセプター間でのデータ共有）
#[derive(Debug, Default)]
pub struct Attributes {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Attributes {
    /// 新しいAttributesを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を設定
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_string(), Box::new(value));
    }

    /// 値を取得
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values
            .get(key)
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// 値を削除して返却
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.values
            .remove(key)
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// 指定されたキーが存在するかチェック
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// 全てのキーを取得
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// 属性が空かどうか
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 1回のチェーン実行で共有されるリクエストスコープの状態
///
/// チェーン実行中は `&mut` で排他的に借用される。インターセプターの
/// インスタンスは並行リクエスト間で共有されるため、リクエストごとの
/// 状態はここに置く。
#[derive(Debug)]
pub struct RequestContext {
    request: Request,
    response: Response,
    attributes: Attributes,
    route: Option<String>,
}

impl RequestContext {
    /// リクエストからコンテキストを作成（レスポンスは200の空レスポンス）
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::ok(),
            attributes: Attributes::new(),
            route: None,
        }
    }

    /// マッチしたルートパターンを設定
    pub fn with_route(mut self, pattern: impl Into<String>) -> Self {
        self.route = Some(pattern.into());
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// 中断したインターセプターやハンドラーが直接書き込むレスポンス
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// レスポンスを置き換える
    pub fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// 属性を設定（`attributes_mut().set` の短縮形）
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.attributes.set(key, value);
    }

    /// 属性を取得（`attributes().get` の短縮形）
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.attributes.get(key)
    }

    /// マッチしたルートパターン
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// コンテキストを分解
    pub fn into_parts(self) -> (Request, Response, Attributes) {
        (self.request, self.response, self.attributes)
    }
}
