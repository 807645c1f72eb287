use async_trait::async_trait;

use crate::common::{Interceptor, RequestContext, Response};
use crate::error::Error;

/// ハンドラー結果に既定のセキュリティヘッダーを付与する
///
/// ハンドラーが設定済みのヘッダーは上書きしない。[`crate::Dispatcher`] は
/// 全レスポンスに同じヘッダーを付けるので、これはチェーンを直接実行する場合や
/// 後続の後処理にヘッダーを見せたい場合に使う。
#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityHeadersInterceptor;

#[async_trait]
impl Interceptor for SecurityHeadersInterceptor {
    fn name(&self) -> &str {
        "security-headers"
    }

    async fn post_handle(&self, ctx: &mut RequestContext, result: &mut Option<Response>) -> Result<(), Error> {
        match result {
            Some(response) => response.apply_security_headers(),
            None => ctx.response_mut().apply_security_headers(),
        }
        Ok(())
    }
}
