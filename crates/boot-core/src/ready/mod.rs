use std::collections::HashMap;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::BootError;

/// One-shot readiness signal per task name.
///
/// Built before scheduling starts and never structurally modified afterwards; closing a signal
/// is permanent, so every later waiter sees it ready immediately.
#[derive(Debug)]
pub struct ReadyMap {
    signals: HashMap<String, watch::Sender<bool>>,
}

impl ReadyMap {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let signals = names
            .into_iter()
            .map(|name| (name.into(), watch::Sender::new(false)))
            .collect();
        Self { signals }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    /// Mark `name` ready and wake its waiters.
    pub fn close(&self, name: &str) -> Result<(), BootError> {
        let tx = self.sender(name)?;
        let closed_now = tx.send_if_modified(|ready| !std::mem::replace(ready, true));
        debug_assert!(closed_now, "readiness signal for {name} closed twice");
        Ok(())
    }

    pub fn is_ready(&self, name: &str) -> bool {
        self.signals
            .get(name)
            .map(|tx| *tx.borrow())
            .unwrap_or(false)
    }

    /// Block until every task in `names` is ready, in order.
    ///
    /// Returns [`BootError::Cancelled`] as soon as `cancel` fires, and
    /// [`BootError::UnknownTask`] for a name that has no signal.
    pub async fn wait<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        names: &[S],
    ) -> Result<(), BootError> {
        for name in names {
            let name = name.as_ref();
            let mut rx = self.sender(name)?.subscribe();
            info!(target: "boot.core.sched", task = name, "waiting");
            tokio::select! {
                biased;
                res = rx.wait_for(|ready| *ready) => {
                    // The sender lives in `self`, so the channel cannot close under us.
                    if res.is_err() {
                        return Err(BootError::Cancelled);
                    }
                    info!(target: "boot.core.sched", task = name, "ready");
                }
                _ = cancel.cancelled() => {
                    info!(target: "boot.core.sched", task = name, "task was never ready");
                    return Err(BootError::Cancelled);
                }
            }
        }
        Ok(())
    }

    fn sender(&self, name: &str) -> Result<&watch::Sender<bool>, BootError> {
        self.signals
            .get(name)
            .ok_or_else(|| BootError::UnknownTask(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[tokio::test]
    async fn wait_returns_once_all_closed() {
        let ready = Arc::new(ReadyMap::new(["a", "b"]));
        let cancel = CancellationToken::new();

        let waiter = {
            let (ready, cancel) = (ready.clone(), cancel.clone());
            tokio::spawn(async move { ready.wait(&cancel, &["a", "b"]).await })
        };
        ready.close("b").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        ready.close("a").unwrap();
        waiter.await.unwrap().unwrap();
        assert!(ready.is_ready("a") && ready.is_ready("b"));
    }

    #[tokio::test]
    async fn closed_signal_stays_ready() {
        let ready = ReadyMap::new(["a"]);
        ready.close("a").unwrap();
        assert!(ready.is_ready("a"));
        ready.wait(&CancellationToken::new(), &["a"]).await.unwrap();
        ready.wait(&CancellationToken::new(), &["a"]).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_unblocks_waiters() {
        let ready = ReadyMap::new(["a"]);
        let cancel = CancellationToken::new();
        let c = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            c.cancel();
        });
        let err = ready.wait(&cancel, &["a"]).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!ready.is_ready("a"));
    }

    #[tokio::test]
    async fn unknown_name_is_an_error() {
        let ready = ReadyMap::new(["a"]);
        let err = ready
            .wait(&CancellationToken::new(), &["nope"])
            .await
            .unwrap_err();
        assert!(matches!(err, BootError::UnknownTask(n) if n == "nope"));
        assert!(matches!(ready.close("nope"), Err(BootError::UnknownTask(_))));
    }
}
