//! リクエストのログと所要時間の記録

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::common::{Interceptor, RequestContext, Response};
use crate::error::Error;

/// 受信時刻の属性キー（`DateTime<Utc>`）
pub const RECEIVED_AT: &str = "handlerchain.received_at";
/// 後処理時点のレスポンスステータスの属性キー（`u16`）
pub const RESPONSE_STATUS: &str = "handlerchain.response_status";
const STARTED: &str = "handlerchain.started";

/// 受信時刻を属性に記録し、完了時にメソッド・パス・ステータス・所要時間をログに出す
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        "logging"
    }

    async fn pre_handle(&self, ctx: &mut RequestContext) -> Result<bool, Error> {
        let received_at: DateTime<Utc> = Utc::now();
        ctx.set(RECEIVED_AT, received_at);
        ctx.set(STARTED, Instant::now());
        Ok(true)
    }

    async fn post_handle(&self, ctx: &mut RequestContext, result: &mut Option<Response>) -> Result<(), Error> {
        // ハンドラーが結果を返した場合はそちらが送られる
        let status = result.as_ref().unwrap_or(ctx.response()).status;
        ctx.set(RESPONSE_STATUS, status);
        Ok(())
    }

    async fn after_completion(&self, ctx: &mut RequestContext, error: Option<&Error>) -> Result<(), Error> {
        match error {
            Some(_) => warn!("{}", completion_message(ctx, error)),
            None => info!("{}", completion_message(ctx, error)),
        }
        Ok(())
    }
}

fn completion_message(ctx: &RequestContext, error: Option<&Error>) -> String {
    let elapsed = ctx
        .get::<Instant>(STARTED)
        .map(|started| started.elapsed())
        .unwrap_or_default();
    let request = ctx.request();

    match error {
        Some(e) => format!("{} {} failed after {:?}: {}", request.method, request.path, elapsed, e),
        None => {
            // 中断時は後処理が走らないのでコンテキストのレスポンスを使う
            let status = ctx
                .get::<u16>(RESPONSE_STATUS)
                .copied()
                .unwrap_or(ctx.response().status);
            format!(
                "{} {} completed with status {} in {:?}",
                request.method, request.path, status, elapsed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Method, Request};

    #[tokio::test]
    async fn test_records_receive_time() {
        let interceptor = LoggingInterceptor::new();
        let mut ctx = RequestContext::new(Request::new(Method::GET, "/"));

        let before = Utc::now();
        assert!(interceptor.pre_handle(&mut ctx).await.unwrap());

        let received = ctx.get::<DateTime<Utc>>(RECEIVED_AT).copied().unwrap();
        assert!(received >= before);
        assert!(ctx.get::<Instant>(STARTED).is_some());
        assert!(interceptor.after_completion(&mut ctx, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_logs_status_of_handler_result() {
        let interceptor = LoggingInterceptor::new();
        let mut ctx = RequestContext::new(Request::new(Method::POST, "/created"));
        interceptor.pre_handle(&mut ctx).await.unwrap();

        let mut result = Some(Response::new(201));
        interceptor.post_handle(&mut ctx, &mut result).await.unwrap();

        assert_eq!(ctx.get::<u16>(RESPONSE_STATUS), Some(&201));
        let message = completion_message(&ctx, None);
        assert!(message.starts_with("POST /created completed with status 201"), "{}", message);
    }

    #[tokio::test]
    async fn test_logs_context_status_after_short_circuit() {
        let interceptor = LoggingInterceptor::new();
        let mut ctx = RequestContext::new(Request::new(Method::GET, "/admin"));
        interceptor.pre_handle(&mut ctx).await.unwrap();
        ctx.set_response(Response::unauthorized());

        let message = completion_message(&ctx, None);
        assert!(message.contains("with status 401"), "{}", message);

        let err = Error::InternalServerError("boom".to_string());
        let message = completion_message(&ctx, Some(&err));
        assert!(message.starts_with("GET /admin failed after"), "{}", message);
        assert!(message.ends_with("Internal server error: boom"), "{}", message);
    }
}
