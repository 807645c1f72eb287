use std::future::Future;

use futures::future::{self, Ready};
use serde::de::DeserializeOwned;

use crate::chain::Completer;
use crate::common::{Method, Request, RequestContext};
use crate::error::Error;

use super::core::{AsyncFnHandler, DeferredHandler, FnHandler, IntoHandlerResult, Route};

// 可読性のための型エイリアス（ボディ必須の非同期ハンドラー）
pub type BodyOrError<Fut, R> = future::Either<Ready<Result<R, Error>>, Fut>;

fn require_body<T>(body: Option<T>) -> Result<T, Error> {
    body.ok_or_else(|| Error::InvalidRequestBody("Missing request body".to_string()))
}

// 非同期: Option<T> から T を要求し、なければ即時エラーfutureを返すアダプタ
fn require_body_async<F, T, R, Fut>(handler: F) -> impl Fn(Request, Option<T>) -> BodyOrError<Fut, R> + Send + Sync + 'static
where
    F: Fn(Request, T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    move |req, body| match require_body(body) {
        Ok(data) => future::Either::Right(handler(req, data)),
        Err(e) => future::Either::Left(future::ready(Err(e))),
    }
}

fn without_body<F, R>(method: Method, pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(&RequestContext) -> Result<R, Error> + Send + Sync + 'static,
    R: IntoHandlerResult + 'static,
{
    Route::new(
        method,
        pattern,
        FnHandler::new(move |ctx: &RequestContext, _: Option<()>| handler(ctx)),
    )
}

fn with_body<F, T, R>(method: Method, pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(&RequestContext, T) -> Result<R, Error> + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    Route::new(
        method,
        pattern,
        FnHandler::new(move |ctx: &RequestContext, body: Option<T>| handler(ctx, require_body(body)?)),
    )
}

fn async_without_body<F, R, Fut>(method: Method, pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    Route::new(
        method,
        pattern,
        AsyncFnHandler::new(move |req, _: Option<()>| handler(req)),
    )
}

fn async_with_body<F, T, R, Fut>(method: Method, pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(Request, T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    Route::new(method, pattern, AsyncFnHandler::new(require_body_async(handler)))
}

/// GETハンドラーを作成
pub fn get<F, R>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(&RequestContext) -> Result<R, Error> + Send + Sync + 'static,
    R: IntoHandlerResult + 'static,
{
    without_body(Method::GET, pattern, handler)
}

/// DELETEハンドラーを作成
pub fn delete<F, R>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(&RequestContext) -> Result<R, Error> + Send + Sync + 'static,
    R: IntoHandlerResult + 'static,
{
    without_body(Method::DELETE, pattern, handler)
}

/// OPTIONSハンドラーを作成
pub fn options<F, R>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(&RequestContext) -> Result<R, Error> + Send + Sync + 'static,
    R: IntoHandlerResult + 'static,
{
    without_body(Method::OPTIONS, pattern, handler)
}

/// POSTハンドラーを作成（JSONボディ必須）
pub fn post<F, T, R>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(&RequestContext, T) -> Result<R, Error> + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    with_body(Method::POST, pattern, handler)
}

/// PUTハンドラーを作成（JSONボディ必須）
pub fn put<F, T, R>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(&RequestContext, T) -> Result<R, Error> + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + 'static,
{
    with_body(Method::PUT, pattern, handler)
}

/// 非同期GETハンドラーを作成
pub fn async_get<F, R, Fut>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    async_without_body(Method::GET, pattern, handler)
}

/// 非同期DELETEハンドラーを作成
pub fn async_delete<F, R, Fut>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    async_without_body(Method::DELETE, pattern, handler)
}

/// 非同期POSTハンドラーを作成
pub fn async_post<F, T, R, Fut>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(Request, T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    async_with_body(Method::POST, pattern, handler)
}

/// 非同期PUTハンドラーを作成
pub fn async_put<F, T, R, Fut>(pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(Request, T) -> Fut + Send + Sync + 'static,
    T: DeserializeOwned + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    async_with_body(Method::PUT, pattern, handler)
}

/// 処理を引き渡すハンドラーを作成
pub fn deferred<F>(method: Method, pattern: impl Into<String>, handler: F) -> Route
where
    F: Fn(Request, Completer) -> Result<(), Error> + Send + Sync + 'static,
{
    Route::new(method, pattern, DeferredHandler::new(handler))
}
