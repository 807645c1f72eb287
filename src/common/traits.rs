//! コアトレイト定義（Handler、Interceptor）

use async_trait::async_trait;
use crate::chain::DeferredResult;
use crate::error::Error;
use super::context::RequestContext;
use super::http::Response;

/// ハンドラーの実行結果
#[derive(Debug)]
pub enum HandlerOutcome {
    /// 同期的に完了した。`None` はハンドラーがコンテキストのレスポンスへ直接書き込んだことを示す
    Complete(Option<Response>),
    /// 別の実行コンテキストへ引き渡した。完了するまでチェーンは中断される
    Pending(DeferredResult),
}

impl HandlerOutcome {
    /// レスポンス付きで完了
    pub fn respond(response: Response) -> Self {
        HandlerOutcome::Complete(Some(response))
    }
}

/// ハンドラーの特性
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Handler: Send + Sync {
    /// リクエストを処理
    async fn handle(&self, ctx: &mut RequestContext) -> Result<HandlerOutcome, Error>;
}

/// インターセプターの特性
///
/// すべてのメソッドに何もしない既定実装がある。インスタンスは並行リクエスト間で
/// 共有されるので、リクエスト固有の状態は `ctx` の属性に置くこと。
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// ログや障害報告に使う名前
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// ハンドラー実行前の処理
    ///
    /// `false` を返すとチェーンを中断する。その場合、このインターセプターが
    /// 既にレスポンスを用意したものとみなされる。
    async fn pre_handle(&self, _ctx: &mut RequestContext) -> Result<bool, Error> {
        Ok(true)
    }

    /// ハンドラー成功後の処理（逆順）
    async fn post_handle(
        &self,
        _ctx: &mut RequestContext,
        _result: &mut Option<Response>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// 完了後の後始末（逆順、`pre_handle` が `true` を返した場合は必ず呼ばれる）
    async fn after_completion(
        &self,
        _ctx: &mut RequestContext,
        _error: Option<&Error>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// ハンドラーが処理を非同期に引き渡した直後に呼ばれる
    ///
    /// この時点では `post_handle` と `after_completion` は呼ばれず、
    /// 遅延処理の完了後に呼ばれる。
    async fn after_concurrent_handling_started(
        &self,
        _ctx: &mut RequestContext,
    ) -> Result<(), Error> {
        Ok(())
    }
}
