//! インターセプターチェーンの実行
//!
//! 1リクエストにつき1つのチェーンを作り、一度だけ実行して破棄する。
//! 前処理は登録順、後処理と後始末は前処理が成功した順の逆順で呼ばれる。

pub mod deferred;
pub mod fault;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};

use crate::common::{Handler, HandlerOutcome, Interceptor, RequestContext, Response};
use crate::error::Error;

pub use deferred::{Completer, DeferredResult};
pub use fault::{ChainError, ChainOutcome, Fault, Stage};

/// ハンドラーとインターセプター列の組
pub struct InterceptorChain {
    handler: Arc<dyn Handler>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

/// `execute` の戻り値
///
/// `Suspended` を再開せずに破棄すると後処理も後始末も呼ばれない。
#[derive(Debug)]
#[must_use = "a suspended chain must be resumed, completed or cancelled so that after_completion runs"]
pub enum Execution {
    /// 実行が完了した
    Done(ChainOutcome),
    /// ハンドラーが処理を引き渡したため中断中
    Suspended(SuspendedChain),
}

impl Execution {
    /// 中断中なら遅延結果を待って完了させる
    pub async fn finish(self, ctx: &mut RequestContext) -> ChainOutcome {
        match self {
            Execution::Done(outcome) => outcome,
            Execution::Suspended(suspended) => suspended.resume(ctx).await,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Execution::Suspended(_))
    }
}

/// チェーン定義から実行する（[`InterceptorChain::execute`] の関数版）
pub async fn execute(
    ctx: &mut RequestContext,
    interceptors: Vec<Arc<dyn Interceptor>>,
    handler: Arc<dyn Handler>,
) -> Execution {
    InterceptorChain::new(handler)
        .with_interceptors(interceptors)
        .execute(ctx)
        .await
}

impl InterceptorChain {
    /// ハンドラーだけのチェーンを作成
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            interceptors: Vec::new(),
        }
    }

    /// インターセプターを末尾に追加
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// 共有インターセプターを末尾に追加
    pub fn with_shared(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with_interceptors(mut self, interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// チェーンを実行する
    ///
    /// 前処理の `false` による中断は障害ではなく、結果もエラーもない
    /// [`ChainOutcome`] として返る。ハンドラーが [`HandlerOutcome::Pending`] を
    /// 返した場合は後処理と後始末を保留した [`SuspendedChain`] を返す。
    pub async fn execute(self, ctx: &mut RequestContext) -> Execution {
        let InterceptorChain { handler, interceptors } = self;
        let mut executed: Vec<Arc<dyn Interceptor>> = Vec::with_capacity(interceptors.len());

        for interceptor in interceptors {
            match interceptor.pre_handle(ctx).await {
                Ok(true) => {
                    debug!("pre_handle passed: {}", interceptor.name());
                    executed.push(interceptor);
                }
                Ok(false) => {
                    debug!("Chain aborted by interceptor: {}", interceptor.name());
                    let aborted_by = interceptor.name().to_string();
                    let cleanup = after_completion_phase(ctx, &executed, None).await;
                    return Execution::Done(ChainOutcome::assemble(None, Some(aborted_by), None, cleanup));
                }
                Err(e) => {
                    warn!("pre_handle failed in {}: {}", interceptor.name(), e);
                    let fault = Fault::PreHandle {
                        interceptor: interceptor.name().to_string(),
                        source: e,
                    };
                    let cleanup = after_completion_phase(ctx, &executed, Some(fault.error())).await;
                    return Execution::Done(ChainOutcome::assemble(None, None, Some(fault), cleanup));
                }
            }
        }

        match handler.handle(ctx).await {
            Ok(HandlerOutcome::Complete(result)) => {
                Execution::Done(complete(ctx, &executed, Ok(result)).await)
            }
            Ok(HandlerOutcome::Pending(deferred)) => {
                debug!("Handler started concurrent handling; suspending chain");
                for interceptor in executed.iter().rev() {
                    if let Err(e) = interceptor.after_concurrent_handling_started(ctx).await {
                        error!(
                            "after_concurrent_handling_started failed in {}: {}",
                            interceptor.name(),
                            e
                        );
                    }
                }
                Execution::Suspended(SuspendedChain { executed, deferred })
            }
            Err(e) => Execution::Done(complete(ctx, &executed, Err(e)).await),
        }
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &names(&self.interceptors))
            .finish_non_exhaustive()
    }
}

/// 遅延処理の完了を待っているチェーン
///
/// どの方法で再開しても、後処理と後始末は通常の完了時と同じ規則で実行される。
/// 再開せずに破棄すると `after_completion` は一切呼ばれないので、必ず
/// `resume` / `resume_with_timeout` / `complete_with` / `cancel` のいずれかで終わらせること。
#[must_use = "dropping a suspended chain skips post_handle and after_completion"]
pub struct SuspendedChain {
    executed: Vec<Arc<dyn Interceptor>>,
    deferred: DeferredResult,
}

impl SuspendedChain {
    /// 遅延結果を待って再開（タイムアウトなし）
    pub async fn resume(self, ctx: &mut RequestContext) -> ChainOutcome {
        let SuspendedChain { executed, deferred } = self;
        let result = deferred.wait().await;
        complete(ctx, &executed, result).await
    }

    /// 遅延結果を指定時間まで待って再開
    ///
    /// 時間切れは [`Error::Timeout`] のハンドラー障害として扱う。
    pub async fn resume_with_timeout(self, ctx: &mut RequestContext, timeout: Duration) -> ChainOutcome {
        let SuspendedChain { executed, deferred } = self;
        let result = match tokio::time::timeout(timeout, deferred.wait()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Deferred handler did not complete within {:?}", timeout);
                Err(Error::Timeout(format!("no result within {:?}", timeout)))
            }
        };
        complete(ctx, &executed, result).await
    }

    /// 呼び出し側が用意した結果で再開（遅延結果は破棄される）
    pub async fn complete_with(
        self,
        ctx: &mut RequestContext,
        result: Result<Option<Response>, Error>,
    ) -> ChainOutcome {
        complete(ctx, &self.executed, result).await
    }

    /// キャンセル（クライアント切断など）として再開
    pub async fn cancel(self, ctx: &mut RequestContext, reason: impl Into<String>) -> ChainOutcome {
        self.complete_with(ctx, Err(Error::Cancelled(reason.into()))).await
    }

    /// 前処理を通過したインターセプター名（登録順）
    pub fn interceptor_names(&self) -> Vec<&str> {
        names(&self.executed)
    }
}

impl fmt::Debug for SuspendedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendedChain")
            .field("executed", &names(&self.executed))
            .finish_non_exhaustive()
    }
}

fn names(interceptors: &[Arc<dyn Interceptor>]) -> Vec<&str> {
    interceptors.iter().map(|i| i.name()).collect()
}

/// ハンドラー結果が出た後の後処理と後始末
async fn complete(
    ctx: &mut RequestContext,
    executed: &[Arc<dyn Interceptor>],
    handled: Result<Option<Response>, Error>,
) -> ChainOutcome {
    let (result, fault) = match handled {
        Ok(result) => post_handle_phase(ctx, executed, result).await,
        Err(e) => {
            warn!("Handler failed: {}", e);
            (None, Some(Fault::Handler(e)))
        }
    };

    let cleanup = after_completion_phase(ctx, executed, fault.as_ref().map(Fault::error)).await;
    ChainOutcome::assemble(result, None, fault, cleanup)
}

/// 後処理を逆順に実行。最初の失敗で打ち切り、結果は破棄する
async fn post_handle_phase(
    ctx: &mut RequestContext,
    executed: &[Arc<dyn Interceptor>],
    mut result: Option<Response>,
) -> (Option<Response>, Option<Fault>) {
    for interceptor in executed.iter().rev() {
        if let Err(e) = interceptor.post_handle(ctx, &mut result).await {
            warn!("post_handle failed in {}: {}", interceptor.name(), e);
            let fault = Fault::PostHandle {
                interceptor: interceptor.name().to_string(),
                source: e,
            };
            return (None, Some(fault));
        }
    }
    (result, None)
}

/// 後始末を逆順に必ず全件実行し、失敗を収集する
async fn after_completion_phase(
    ctx: &mut RequestContext,
    executed: &[Arc<dyn Interceptor>],
    error: Option<&Error>,
) -> Vec<Fault> {
    let mut faults = Vec::new();
    for interceptor in executed.iter().rev() {
        if let Err(e) = interceptor.after_completion(ctx, error).await {
            error!("after_completion failed in {}: {}", interceptor.name(), e);
            faults.push(Fault::Cleanup {
                interceptor: interceptor.name().to_string(),
                source: e,
            });
        }
    }
    faults
}
