//! 遅延完了（非同期引き渡し）

use tokio::sync::oneshot;

use crate::common::Response;
use crate::error::Error;

type Completion = Result<Option<Response>, Error>;

/// 遅延結果の送信側と受信側を作成
pub fn channel() -> (Completer, DeferredResult) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, DeferredResult { rx })
}

/// 遅延処理を完了させる側
///
/// 別タスクへムーブして使う。完了させずに破棄するとチェーン側では
/// [`Error::Cancelled`] として扱われる。
#[derive(Debug)]
pub struct Completer {
    tx: oneshot::Sender<Completion>,
}

impl Completer {
    /// 結果を送る。受信側が既にいなければ `false`
    pub fn complete(self, result: Completion) -> bool {
        self.tx.send(result).is_ok()
    }

    pub fn succeed(self, response: Response) -> bool {
        self.complete(Ok(Some(response)))
    }

    pub fn fail(self, error: Error) -> bool {
        self.complete(Err(error))
    }

    /// 受信側（チェーン）が既に結果を待っていないか
    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }
}

/// ハンドラーが返す保留中の結果
#[derive(Debug)]
pub struct DeferredResult {
    rx: oneshot::Receiver<Completion>,
}

impl DeferredResult {
    /// 完了を待つ
    pub async fn wait(self) -> Completion {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::Cancelled(
                "deferred result was dropped before completion".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completion_from_another_task() {
        let (completer, deferred) = channel();

        tokio::spawn(async move {
            completer.succeed(Response::ok().text("late"));
        });

        let response = deferred.wait().await.unwrap().unwrap();
        assert_eq!(response.body_text().as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_dropped_completer_is_cancellation() {
        let (completer, deferred) = channel();
        drop(completer);

        assert!(matches!(deferred.wait().await, Err(Error::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_completer_sees_dropped_receiver() {
        let (completer, deferred) = channel();
        drop(deferred);

        assert!(completer.is_cancelled());
        assert!(!completer.fail(Error::InternalServerError("nobody listening".to_string())));
    }
}
