//! ヘッダーのトークンによる簡易認証

use async_trait::async_trait;
use log::warn;
use subtle::ConstantTimeEq;

use crate::common::{Interceptor, RequestContext, Response};
use crate::error::Error;

/// 認証済みトークンの属性キー（`String`）
pub const PRINCIPAL: &str = "handlerchain.principal";

/// 指定ヘッダーの値が期待するトークンと一致するか検査する
///
/// 一致しなければ401を書き込み、チェーンを中断する（エラーにはしない）。
#[derive(Debug, Clone)]
pub struct HeaderTokenInterceptor {
    header: String,
    token: String,
}

impl HeaderTokenInterceptor {
    pub fn new(header: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            token: token.into(),
        }
    }

    /// 定数時間で比較する（長さが異なれば不一致）
    fn verify(&self, presented: &str) -> bool {
        self.token.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

#[async_trait]
impl Interceptor for HeaderTokenInterceptor {
    fn name(&self) -> &str {
        "header-token"
    }

    async fn pre_handle(&self, ctx: &mut RequestContext) -> Result<bool, Error> {
        let presented = ctx.request().header(&self.header).map(str::to_string);
        match presented {
            Some(token) if self.verify(&token) => {
                ctx.set(PRINCIPAL, token);
                Ok(true)
            }
            other => {
                warn!(
                    "Rejected {} {}: {} header {}",
                    ctx.request().method,
                    ctx.request().path,
                    self.header,
                    if other.is_some() { "mismatch" } else { "missing" }
                );
                ctx.set_response(
                    Response::unauthorized()
                        .with_header("WWW-Authenticate", format!("Token header=\"{}\"", self.header))
                        .text("Unauthorized"),
                );
                Ok(false)
            }
        }
    }
}
