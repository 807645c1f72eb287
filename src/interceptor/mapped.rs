//! パスパターンで適用範囲を絞るインターセプター

use std::sync::Arc;

use crate::common::Interceptor;
use crate::error::Error;
use crate::handler::PathPattern;

/// 適用するパスを include / exclude パターンで指定したインターセプター
///
/// exclude に一致すれば適用しない。include が空なら全パスに適用する。
#[derive(Clone)]
pub struct MappedInterceptor {
    interceptor: Arc<dyn Interceptor>,
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl MappedInterceptor {
    pub fn new(interceptor: impl Interceptor + 'static) -> Self {
        Self::shared(Arc::new(interceptor))
    }

    pub fn shared(interceptor: Arc<dyn Interceptor>) -> Self {
        Self {
            interceptor,
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    /// 適用するパスパターンを追加
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.includes.push(pattern.into());
        self
    }

    /// 除外するパスパターンを追加
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    pub fn interceptor(&self) -> &Arc<dyn Interceptor> {
        &self.interceptor
    }

    /// パターンをコンパイル
    pub(crate) fn compile(self) -> Result<CompiledMapping, Error> {
        let includes = self
            .includes
            .iter()
            .map(|p| PathPattern::compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        let excludes = self
            .excludes
            .iter()
            .map(|p| PathPattern::compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledMapping {
            interceptor: self.interceptor,
            includes,
            excludes,
        })
    }
}

/// コンパイル済みのマッピング
pub(crate) struct CompiledMapping {
    interceptor: Arc<dyn Interceptor>,
    includes: Vec<PathPattern>,
    excludes: Vec<PathPattern>,
}

impl CompiledMapping {
    pub(crate) fn matches(&self, path: &str) -> bool {
        if self.excludes.iter().any(|p| p.is_match(path)) {
            return false;
        }
        self.includes.is_empty() || self.includes.iter().any(|p| p.is_match(path))
    }

    pub(crate) fn interceptor(&self) -> &Arc<dyn Interceptor> {
        &self.interceptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Interceptor for Noop {}

    #[test]
    fn test_unmapped_interceptor_matches_everything() {
        let mapping = MappedInterceptor::new(Noop).compile().unwrap();
        assert!(mapping.matches("/"));
        assert!(mapping.matches("/anything/at/all"));
    }

    #[test]
    fn test_include_and_exclude() {
        let mapping = MappedInterceptor::new(Noop)
            .include("^/api/.*$")
            .exclude("/api/health")
            .compile()
            .unwrap();

        assert!(mapping.matches("/api/items"));
        assert!(!mapping.matches("/api/health"));
        assert!(!mapping.matches("/static/app.js"));
    }

    #[test]
    fn test_invalid_pattern_fails_compilation() {
        let result = MappedInterceptor::new(Noop).include("(").compile();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }
}
