use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::chain::{deferred, Completer};
use crate::common::{Handler, HandlerOutcome, Method, Request, RequestContext, Response};
use crate::error::Error;

use super::body::decode_json_body;

/// ハンドラー関数の戻り値をチェーンの結果へ変換するトレイト
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> Result<Option<Response>, Error>;
}

/// シリアライズ可能な値は200のJSONレスポンスになる
impl<T: Serialize> IntoHandlerResult for T {
    fn into_handler_result(self) -> Result<Option<Response>, Error> {
        Response::ok().json(&self).map(Some)
    }
}

/// Responseはそのまま返す
impl IntoHandlerResult for Response {
    fn into_handler_result(self) -> Result<Option<Response>, Error> {
        Ok(Some(self))
    }
}

/// 同期関数ハンドラー
///
/// 関数はコンテキストを参照で受け取るので、インターセプターが設定した属性を読める。
pub struct FnHandler<F, T, R> {
    handler_fn: F,
    _request_type: PhantomData<fn() -> T>,
    _response_type: PhantomData<fn() -> R>,
}

impl<F, T, R> FnHandler<F, T, R>
where
    F: Fn(&RequestContext, Option<T>) -> Result<R, Error> + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    pub fn new(handler_fn: F) -> Self {
        Self {
            handler_fn,
            _request_type: PhantomData,
            _response_type: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, R> Handler for FnHandler<F, T, R>
where
    F: Fn(&RequestContext, Option<T>) -> Result<R, Error> + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    async fn handle(&self, ctx: &mut RequestContext) -> Result<HandlerOutcome, Error> {
        let body = decode_json_body::<T>(ctx.request())?;
        let result = (self.handler_fn)(&*ctx, body)?;
        result.into_handler_result().map(HandlerOutcome::Complete)
    }
}

/// 非同期関数ハンドラー
///
/// 関数には `ctx.request()` の複製が渡される。属性が必要な場合は
/// [`Handler`] を直接実装すること。
pub struct AsyncFnHandler<F, T, R, Fut> {
    handler_fn: F,
    _request_type: PhantomData<fn() -> T>,
    _response_type: PhantomData<fn() -> R>,
    _future_type: PhantomData<fn() -> Fut>,
}

impl<F, T, R, Fut> AsyncFnHandler<F, T, R, Fut>
where
    F: Fn(Request, Option<T>) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    pub fn new(handler_fn: F) -> Self {
        Self {
            handler_fn,
            _request_type: PhantomData,
            _response_type: PhantomData,
            _future_type: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, R, Fut> Handler for AsyncFnHandler<F, T, R, Fut>
where
    F: Fn(Request, Option<T>) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    async fn handle(&self, ctx: &mut RequestContext) -> Result<HandlerOutcome, Error> {
        let body = decode_json_body::<T>(ctx.request())?;
        let result = (self.handler_fn)(ctx.request().clone(), body).await?;
        result.into_handler_result().map(HandlerOutcome::Complete)
    }
}

/// 処理を別タスクへ引き渡すハンドラー
///
/// 関数は [`Completer`] を受け取り、どこかで完了させる。関数自体がエラーを返した場合は
/// 通常のハンドラー障害になる。
pub struct DeferredHandler<F> {
    handler_fn: F,
}

impl<F> DeferredHandler<F>
where
    F: Fn(Request, Completer) -> Result<(), Error> + Send + Sync + 'static,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

#[async_trait]
impl<F> Handler for DeferredHandler<F>
where
    F: Fn(Request, Completer) -> Result<(), Error> + Send + Sync + 'static,
{
    async fn handle(&self, ctx: &mut RequestContext) -> Result<HandlerOutcome, Error> {
        let (completer, pending) = deferred::channel();
        (self.handler_fn)(ctx.request().clone(), completer)?;
        debug!("Deferred handling started for {}", ctx.request().path);
        Ok(HandlerOutcome::Pending(pending))
    }
}

/// メソッドとパスパターンに結び付いたハンドラー
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: String,
    handler: Arc<dyn Handler>,
}

impl Route {
    /// パターンはディスパッチャー構築時に検証・コンパイルされる
    pub fn new(method: Method, pattern: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self::shared(method, pattern, Arc::new(handler))
    }

    pub fn shared(method: Method, pattern: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            handler,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}
