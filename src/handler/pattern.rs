use log::{debug, warn};
use regex::Regex;

#[cfg(debug_assertions)]
use std::time::{Duration, Instant};

use crate::error::Error;

/// パターンの安全性を確保（アンカーの確認と追加）
pub fn ensure_safe_pattern(pattern: &str) -> Result<String, Error> {
    if pattern.is_empty() {
        return Err(Error::ConfigurationError("Empty regex pattern is not allowed".to_string()));
    }

    let has_start_anchor = pattern.starts_with('^');
    let has_end_anchor = pattern.ends_with('$');

    if !has_start_anchor || !has_end_anchor {
        let safe_pattern = format!(
            "^{}$",
            pattern.trim_start_matches('^').trim_end_matches('$')
        );
        warn!(
            "Pattern '{}' lacks proper anchors, converted to '{}' for security",
            pattern,
            safe_pattern
        );
        Ok(safe_pattern)
    } else {
        Ok(pattern.to_string())
    }
}

/// コンパイル済みのパスパターン
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    /// アンカーを補ってコンパイルする
    pub fn compile(pattern: &str) -> Result<Self, Error> {
        let source = ensure_safe_pattern(pattern)?;
        let regex = Regex::new(&source).map_err(|e| {
            Error::ConfigurationError(format!("Invalid path pattern '{}': {}", pattern, e))
        })?;
        Ok(Self { source, regex })
    }

    /// アンカー補完後のパターン文字列
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        // デバッグビルド時のみ所要時間を監視
        #[cfg(debug_assertions)]
        {
            let start_time = Instant::now();
            let is_match = self.regex.is_match(path);
            let elapsed = start_time.elapsed();

            if elapsed > Duration::from_millis(100) {
                warn!(
                    "Slow regex matching detected: pattern '{}' took {:?} for path '{}'",
                    self.source, elapsed, path
                );
            }
            debug!("Path matching: {} against pattern {}: {}", path, self.source, is_match);
            is_match
        }
        #[cfg(not(debug_assertions))]
        {
            let is_match = self.regex.is_match(path);
            debug!("Path matching: {} against pattern {}: {}", path, self.source, is_match);
            is_match
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_are_added() {
        assert_eq!(ensure_safe_pattern("/items").unwrap(), "^/items$");
        assert_eq!(ensure_safe_pattern("^/items").unwrap(), "^/items$");
        assert_eq!(ensure_safe_pattern("^/items$").unwrap(), "^/items$");
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(ensure_safe_pattern(""), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_compiled_pattern_matching() {
        let pattern = PathPattern::compile(r"/items/\d+").unwrap();
        assert_eq!(pattern.as_str(), r"^/items/\d+$");
        assert!(pattern.is_match("/items/123"));
        assert!(!pattern.is_match("/items/abc"));
        assert!(!pattern.is_match("/prefix/items/1"));
    }

    #[test]
    fn test_invalid_regex_is_configuration_error() {
        assert!(matches!(PathPattern::compile("^/items/($"), Err(Error::ConfigurationError(_))));
    }
}
