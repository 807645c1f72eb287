//! handlerchain: ハンドラー実行をインターセプターで包むリクエスト処理チェーン
//!
//! ルートの解決、チェーンの組み立てと実行、結果のレスポンス化までを
//! [`Dispatcher`] がまとめて行う。チェーン単体は [`chain`] モジュールから使える。

pub mod chain;
pub mod common;
pub mod error;
pub mod handler;
pub mod interceptor;

use std::sync::Arc;

use log::{debug, error, info, warn};

pub use chain::{ChainError, ChainOutcome, Completer, Execution, Fault, InterceptorChain, Stage};
pub use common::*;
pub use error::Error;
pub use handler::{PathPattern, Route};
pub use interceptor::MappedInterceptor;

use interceptor::mapped::CompiledMapping;

/// パターンをコンパイル済みのルート
struct CompiledRoute {
    route: Route,
    pattern: PathPattern,
}

impl CompiledRoute {
    fn matches(&self, path: &str, method: Method) -> bool {
        self.route.method() == method && self.pattern.is_match(path)
    }
}

/// [`Dispatcher`] を構築するためのビルダー
#[derive(Default)]
pub struct DispatcherBuilder {
    routes: Vec<Route>,
    mappings: Vec<MappedInterceptor>,
    config: Option<DispatcherConfig>,
}

impl DispatcherBuilder {
    /// 新しいDispatcherBuilderインスタンスを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ルートを追加（登録順に照合される）
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// 全パスに適用するインターセプターを追加
    pub fn interceptor(self, interceptor: impl Interceptor + 'static) -> Self {
        self.mapped(MappedInterceptor::new(interceptor))
    }

    /// パス指定付きのインターセプターを追加
    pub fn mapped(mut self, mapping: MappedInterceptor) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// 設定を指定（省略時は環境変数から読み込む）
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// パターンをコンパイルしてディスパッチャーを作成
    pub fn build(self) -> Result<Dispatcher, Error> {
        let routes = self
            .routes
            .into_iter()
            .map(|route| {
                let pattern = PathPattern::compile(route.pattern())?;
                Ok(CompiledRoute { route, pattern })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let mappings = self
            .mappings
            .into_iter()
            .map(MappedInterceptor::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let config = self.config.unwrap_or_else(DispatcherConfig::from_env);
        info!(
            "Dispatcher built with {} routes and {} interceptors",
            routes.len(),
            mappings.len()
        );

        Ok(Dispatcher { routes, mappings, config })
    }
}

/// ルート解決とチェーン実行を行うディスパッチャー
///
/// 構築後は不変なので `Arc` で包んで並行リクエスト間で共有できる。
pub struct Dispatcher {
    routes: Vec<CompiledRoute>,
    mappings: Vec<CompiledMapping>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// 新しいDispatcherBuilderインスタンスを作成
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn find_route(&self, path: &str, method: Method) -> Option<&CompiledRoute> {
        self.routes.iter().find(|r| r.matches(path, method))
    }

    /// パスに適用されるインターセプター（登録順）
    fn interceptors_for(&self, path: &str) -> Vec<Arc<dyn Interceptor>> {
        self.mappings
            .iter()
            .filter(|m| m.matches(path))
            .map(|m| Arc::clone(m.interceptor()))
            .collect()
    }

    fn chain_for(&self, route: &CompiledRoute, path: &str) -> InterceptorChain {
        InterceptorChain::new(Arc::clone(route.route.handler()))
            .with_interceptors(self.interceptors_for(path))
    }

    /// パスとメソッドに対応するチェーンを組み立てる
    pub fn resolve(&self, path: &str, method: Method) -> Option<InterceptorChain> {
        self.find_route(path, method)
            .map(|route| self.chain_for(route, path))
    }

    /// リクエストを処理してレスポンスを返す
    ///
    /// エラーや中断を含む全レスポンスに既定のセキュリティヘッダーを付与する
    /// （ハンドラーやインターセプターが設定した値は上書きしない）。
    pub async fn dispatch(&self, request: Request) -> Response {
        let mut response = self.process(request).await;
        response.apply_security_headers();
        response
    }

    async fn process(&self, request: Request) -> Response {
        if request.body_len() > self.config.max_body_size {
            warn!(
                "Request body too large: {} bytes (limit {})",
                request.body_len(),
                self.config.max_body_size
            );
            let err = Error::PayloadTooLarge(format!(
                "{} bytes exceeds limit of {} bytes",
                request.body_len(),
                self.config.max_body_size
            ));
            return Response::from_error(&err, self.config.expose_error_details);
        }

        let (route, chain) = match self.find_route(&request.path, request.method) {
            Some(route) => (route, self.chain_for(route, &request.path)),
            None => {
                debug!("No route for {} {}", request.method, request.path);
                let err = Error::RouteNotFound(format!("{} {}", request.method, request.path));
                return Response::from_error(&err, self.config.expose_error_details);
            }
        };

        let mut ctx = RequestContext::new(request).with_route(route.pattern.as_str());
        let outcome = match chain.execute(&mut ctx).await {
            Execution::Done(outcome) => outcome,
            Execution::Suspended(suspended) => match self.config.async_timeout {
                Some(timeout) => suspended.resume_with_timeout(&mut ctx, timeout).await,
                None => suspended.resume(&mut ctx).await,
            },
        };

        self.render(ctx, outcome)
    }

    /// チェーンの結果をレスポンスに変換
    fn render(&self, ctx: RequestContext, mut outcome: ChainOutcome) -> Response {
        if let Some(err) = outcome.error() {
            let primary = err.primary();
            if !primary.is_cleanup() {
                error!("Request failed: {}", err);
                return Response::from_error(primary.error(), self.config.expose_error_details);
            }
            // 後始末だけの失敗ではレスポンスを差し替えない
            for fault in err.faults() {
                warn!("Ignoring cleanup fault: {}", fault);
            }
        }

        if let Some(name) = outcome.aborted_by() {
            debug!("Responding with context response after abort by {}", name);
        }

        match outcome.take_result() {
            Some(response) => response,
            None => {
                let (_, response, _) = ctx.into_parts();
                response
            }
        }
    }
}
