//! チェーン実行の障害と結果

use std::fmt;
use thiserror::Error;

use crate::common::Response;
use crate::error::Error;

/// 障害が起きた段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PreHandle,
    Handler,
    PostHandle,
    AfterCompletion,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::PreHandle => "pre-handle",
            Stage::Handler => "handler",
            Stage::PostHandle => "post-handle",
            Stage::AfterCompletion => "after-completion",
        };
        f.write_str(name)
    }
}

/// チェーンのいずれかの段階で発生した障害
#[derive(Error, Debug)]
pub enum Fault {
    /// インターセプターの前処理が失敗した。以降の前処理とハンドラーは実行されない
    #[error("pre-handle failed in interceptor `{interceptor}`: {source}")]
    PreHandle { interceptor: String, source: Error },

    /// ハンドラーが失敗した。後処理は実行されないが後始末は実行される
    #[error("handler failed: {0}")]
    Handler(#[source] Error),

    /// インターセプターの後処理が失敗した。残りの後処理は実行されない
    #[error("post-handle failed in interceptor `{interceptor}`: {source}")]
    PostHandle { interceptor: String, source: Error },

    /// 後始末が失敗した。残りの後始末は続行される
    #[error("after-completion failed in interceptor `{interceptor}`: {source}")]
    Cleanup { interceptor: String, source: Error },
}

impl Fault {
    pub fn stage(&self) -> Stage {
        match self {
            Fault::PreHandle { .. } => Stage::PreHandle,
            Fault::Handler(_) => Stage::Handler,
            Fault::PostHandle { .. } => Stage::PostHandle,
            Fault::Cleanup { .. } => Stage::AfterCompletion,
        }
    }

    /// 元のエラー
    pub fn error(&self) -> &Error {
        match self {
            Fault::PreHandle { source, .. }
            | Fault::PostHandle { source, .. }
            | Fault::Cleanup { source, .. } => source,
            Fault::Handler(source) => source,
        }
    }

    /// 障害を起こしたインターセプター名（ハンドラーの場合はNone）
    pub fn interceptor(&self) -> Option<&str> {
        match self {
            Fault::PreHandle { interceptor, .. }
            | Fault::PostHandle { interceptor, .. }
            | Fault::Cleanup { interceptor, .. } => Some(interceptor),
            Fault::Handler(_) => None,
        }
    }

    pub fn into_error(self) -> Error {
        match self {
            Fault::PreHandle { source, .. }
            | Fault::PostHandle { source, .. }
            | Fault::Cleanup { source, .. } => source,
            Fault::Handler(source) => source,
        }
    }

    pub fn is_cleanup(&self) -> bool {
        matches!(self, Fault::Cleanup { .. })
    }
}

/// チェーン実行の終端エラー
///
/// 主たる障害に加え、同じ実行中に起きた後始末の障害を `suppressed` に保持する。
#[derive(Error, Debug)]
#[error("{primary}{}", suppressed_suffix(.suppressed))]
pub struct ChainError {
    #[source]
    primary: Fault,
    suppressed: Vec<Fault>,
}

fn suppressed_suffix(suppressed: &[Fault]) -> String {
    match suppressed.len() {
        0 => String::new(),
        1 => " (1 suppressed cleanup fault)".to_string(),
        n => format!(" ({} suppressed cleanup faults)", n),
    }
}

impl ChainError {
    pub fn new(primary: Fault, suppressed: Vec<Fault>) -> Self {
        Self { primary, suppressed }
    }

    pub fn primary(&self) -> &Fault {
        &self.primary
    }

    pub fn suppressed(&self) -> &[Fault] {
        &self.suppressed
    }

    /// 主障害と抑制された障害を順に列挙
    pub fn faults(&self) -> impl Iterator<Item = &Fault> {
        std::iter::once(&self.primary).chain(self.suppressed.iter())
    }

    pub fn into_primary(self) -> Fault {
        self.primary
    }
}

/// 完了したチェーン実行の結果
#[derive(Debug, Default)]
pub struct ChainOutcome {
    result: Option<Response>,
    aborted_by: Option<String>,
    error: Option<ChainError>,
}

impl ChainOutcome {
    /// 段階ごとの記録から結果を組み立てる
    ///
    /// 主障害がなければ最初の後始末障害を主障害に繰り上げる。
    pub(crate) fn assemble(
        result: Option<Response>,
        aborted_by: Option<String>,
        primary: Option<Fault>,
        mut cleanup: Vec<Fault>,
    ) -> Self {
        let error = match primary {
            Some(primary) => Some(ChainError::new(primary, cleanup)),
            None if !cleanup.is_empty() => {
                let first = cleanup.remove(0);
                Some(ChainError::new(first, cleanup))
            }
            None => None,
        };
        Self { result, aborted_by, error }
    }

    /// ハンドラー（と後処理）の結果
    pub fn result(&self) -> Option<&Response> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<Response> {
        self.result.take()
    }

    /// `pre_handle` が `false` を返して中断したインターセプター名
    pub fn aborted_by(&self) -> Option<&str> {
        self.aborted_by.as_deref()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted_by.is_some()
    }

    pub fn error(&self) -> Option<&ChainError> {
        self.error.as_ref()
    }

    /// 障害なしで終わったか（中断も成功扱い）
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Option<Response>, ChainError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result),
        }
    }
}
