//! チェーン実行順序のインテグレーションテスト

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use handlerchain::{
        chain, ChainOutcome, Error, Execution, Handler, HandlerOutcome, Interceptor,
        InterceptorChain, Method, Request, RequestContext, Response, Stage,
    };

    type Log = Arc<Mutex<Vec<String>>>;

    /// 各段階の呼び出しをログに残すインターセプター
    struct Tracer {
        name: &'static str,
        log: Log,
        abort: bool,
        fail_post: bool,
        fail_after: bool,
    }

    impl Tracer {
        fn new(name: &'static str, log: &Log) -> Self {
            Self { name, log: log.clone(), abort: false, fail_post: false, fail_after: false }
        }

        fn aborting(mut self) -> Self {
            self.abort = true;
            self
        }

        fn failing_post(mut self) -> Self {
            self.fail_post = true;
            self
        }

        fn failing_after(mut self) -> Self {
            self.fail_after = true;
            self
        }

        fn record(&self, event: String) {
            self.log.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl Interceptor for Tracer {
        fn name(&self) -> &str {
            self.name
        }

        async fn pre_handle(&self, ctx: &mut RequestContext) -> Result<bool, Error> {
            self.record(format!("{}.pre", self.name));
            if self.abort {
                ctx.set_response(Response::forbidden().text("stopped"));
                return Ok(false);
            }
            Ok(true)
        }

        async fn post_handle(&self, _ctx: &mut RequestContext, _result: &mut Option<Response>) -> Result<(), Error> {
            self.record(format!("{}.post", self.name));
            if self.fail_post {
                return Err(Error::InterceptorError(format!("{} post", self.name)));
            }
            Ok(())
        }

        async fn after_completion(&self, _ctx: &mut RequestContext, error: Option<&Error>) -> Result<(), Error> {
            match error {
                Some(e) => self.record(format!("{}.after({})", self.name, e)),
                None => self.record(format!("{}.after", self.name)),
            }
            if self.fail_after {
                return Err(Error::InterceptorError(format!("{} after", self.name)));
            }
            Ok(())
        }
    }

    struct TracedHandler {
        log: Log,
        fail: bool,
    }

    #[async_trait]
    impl Handler for TracedHandler {
        async fn handle(&self, _ctx: &mut RequestContext) -> Result<HandlerOutcome, Error> {
            if self.fail {
                self.log.lock().unwrap().push("handler(fails E)".to_string());
                return Err(Error::InternalServerError("E".to_string()));
            }
            self.log.lock().unwrap().push("handler".to_string());
            Ok(HandlerOutcome::respond(Response::ok().text("handled")))
        }
    }

    fn handler(log: &Log, fail: bool) -> Arc<dyn Handler> {
        Arc::new(TracedHandler { log: log.clone(), fail })
    }

    async fn run(chain: InterceptorChain) -> (ChainOutcome, RequestContext) {
        let mut ctx = RequestContext::new(Request::new(Method::GET, "/trace"));
        let outcome = match chain.execute(&mut ctx).await {
            Execution::Done(outcome) => outcome,
            Execution::Suspended(_) => panic!("chain should not suspend"),
        };
        (outcome, ctx)
    }

    fn events(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_all_pass_runs_post_and_after_in_reverse() {
        let log = Log::default();
        let chain = InterceptorChain::new(handler(&log, false))
            .with(Tracer::new("A", &log))
            .with(Tracer::new("B", &log))
            .with(Tracer::new("C", &log));

        let (outcome, _) = run(chain).await;

        assert_eq!(
            events(&log),
            vec!["A.pre", "B.pre", "C.pre", "handler", "C.post", "B.post", "A.post", "C.after", "B.after", "A.after"]
        );
        assert!(outcome.is_success());
        assert_eq!(outcome.result().and_then(|r| r.body_text()), Some("handled".to_string()));
    }

    #[tokio::test]
    async fn test_short_circuit_cleans_up_only_passed_interceptors() {
        let log = Log::default();
        let chain = InterceptorChain::new(handler(&log, false))
            .with(Tracer::new("A", &log))
            .with(Tracer::new("B", &log).aborting())
            .with(Tracer::new("C", &log));

        let (outcome, ctx) = run(chain).await;

        assert_eq!(events(&log), vec!["A.pre", "B.pre", "A.after"]);
        assert_eq!(outcome.aborted_by(), Some("B"));
        assert!(outcome.is_success());
        assert!(outcome.result().is_none());
        assert_eq!(ctx.response().status, 403);
    }

    #[tokio::test]
    async fn test_handler_error_reaches_every_cleanup() {
        let log = Log::default();
        let chain = InterceptorChain::new(handler(&log, true))
            .with(Tracer::new("A", &log))
            .with(Tracer::new("B", &log))
            .with(Tracer::new("C", &log));

        let (outcome, _) = run(chain).await;

        let e = "Internal server error: E";
        assert_eq!(
            events(&log),
            vec![
                "A.pre".to_string(),
                "B.pre".to_string(),
                "C.pre".to_string(),
                "handler(fails E)".to_string(),
                format!("C.after({})", e),
                format!("B.after({})", e),
                format!("A.after({})", e),
            ]
        );
        let err = outcome.error().unwrap();
        assert_eq!(err.primary().stage(), Stage::Handler);
        assert!(outcome.result().is_none());
    }

    #[tokio::test]
    async fn test_post_handle_fault_stops_remaining_post_handles() {
        let log = Log::default();
        let chain = InterceptorChain::new(handler(&log, false))
            .with(Tracer::new("A", &log))
            .with(Tracer::new("B", &log).failing_post())
            .with(Tracer::new("C", &log));

        let (outcome, _) = run(chain).await;

        let e = "Interceptor error: B post";
        assert_eq!(
            events(&log),
            vec![
                "A.pre".to_string(),
                "B.pre".to_string(),
                "C.pre".to_string(),
                "handler".to_string(),
                "C.post".to_string(),
                "B.post".to_string(),
                format!("C.after({})", e),
                format!("B.after({})", e),
                format!("A.after({})", e),
            ]
        );
        let err = outcome.error().unwrap();
        assert_eq!(err.primary().stage(), Stage::PostHandle);
        assert_eq!(err.primary().interceptor(), Some("B"));
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_skip_remaining_cleanup() {
        let log = Log::default();
        let chain = InterceptorChain::new(handler(&log, true))
            .with(Tracer::new("A", &log))
            .with(Tracer::new("B", &log).failing_after())
            .with(Tracer::new("C", &log).failing_after());

        let (outcome, _) = run(chain).await;

        let after: Vec<String> = events(&log).into_iter().filter(|e| e.contains(".after")).collect();
        assert_eq!(after.len(), 3);
        assert!(after[2].starts_with("A.after"));

        // ハンドラーの障害が主障害で、後始末の障害も観測できる
        let err = outcome.error().unwrap();
        assert_eq!(err.primary().stage(), Stage::Handler);
        let cleanup: Vec<Option<&str>> = err.suppressed().iter().map(|f| f.interceptor()).collect();
        assert_eq!(cleanup, vec![Some("C"), Some("B")]);
    }

    #[tokio::test]
    async fn test_free_function_matches_chain_execution() {
        let log = Log::default();
        let interceptors: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(Tracer::new("A", &log)),
            Arc::new(Tracer::new("B", &log)),
        ];
        let mut ctx = RequestContext::new(Request::new(Method::POST, "/trace"));

        let outcome = chain::execute(&mut ctx, interceptors, handler(&log, false))
            .await
            .finish(&mut ctx)
            .await;

        assert!(outcome.is_success());
        assert_eq!(events(&log), vec!["A.pre", "B.pre", "handler", "B.post", "A.post", "B.after", "A.after"]);
    }

    #[tokio::test]
    async fn test_empty_chain_only_runs_handler() {
        let log = Log::default();
        let (outcome, _) = run(InterceptorChain::new(handler(&log, false))).await;

        assert_eq!(events(&log), vec!["handler"]);
        assert_eq!(outcome.into_result().unwrap().map(|r| r.status), Some(200));
    }
}
