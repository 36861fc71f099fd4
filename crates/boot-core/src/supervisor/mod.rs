//! The root object: owns one boot run and exposes its lifecycle.

mod env;
mod run;

use std::sync::Arc;

use boot_health::HealthAggregator;
use boot_model::{Config, ServiceUrl};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{BootError, SupervisorConfig};

/// Published once every task is ready.
pub(crate) struct ReadyState {
    aggregator: HealthAggregator,
    controller: Option<ServiceUrl>,
}

/// Handle to a boot running in the background.
///
/// SIGINT and SIGTERM cancel the run, as do [`stop`](Self::stop) and any task failure.
pub struct Supervisor {
    cancel: CancellationToken,
    ready: watch::Receiver<Option<Arc<ReadyState>>>,
    health_interval: std::time::Duration,
    handle: JoinHandle<Result<(), BootError>>,
}

impl Supervisor {
    /// Start booting the single cluster in `config`. Must be called inside a tokio runtime.
    pub fn start(opts: SupervisorConfig, config: Config) -> Self {
        let cancel = CancellationToken::new();
        let (ready_tx, ready) = watch::channel(None);
        let health_interval = opts.health_interval;

        tokio::spawn(cancel_on_signal(cancel.clone()));
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let res = run::run(opts, config, run_cancel, ready_tx).await;
            if let Err(e) = &res {
                warn!(target: "boot.core", error = %e, "supervisor shut down");
            }
            res
        });

        Self {
            cancel,
            ready,
            health_interval,
            handle,
        }
    }

    /// The run's cancellation token; cancelling it is the same as [`stop`](Self::stop)
    /// without waiting.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait until every task is ready and every health check passes.
    ///
    /// Returns the controller's external URL, or `None` if the run was cancelled first.
    pub async fn wait_ready(&self) -> Option<ServiceUrl> {
        let mut rx = self.ready.clone();
        let state = loop {
            let current = rx.borrow_and_update().clone();
            if let Some(state) = current {
                break state;
            }
            tokio::select! {
                res = rx.changed() => if res.is_err() { return None },
                _ = self.cancel.cancelled() => return None,
            }
        };
        state
            .aggregator
            .wait_all_ok(&self.cancel, self.health_interval)
            .await
            .ok()?;
        state.controller.clone()
    }

    /// Wait for the run to finish and return its result.
    pub async fn wait(self) -> Result<(), BootError> {
        match self.handle.await {
            Ok(res) => res,
            Err(e) => Err(BootError::Aborted(e.to_string())),
        }
    }

    /// Cancel the run and wait for shutdown to complete.
    pub async fn stop(self) -> Result<(), BootError> {
        self.cancel.cancel();
        self.wait().await
    }
}

#[cfg(unix)]
async fn cancel_on_signal(cancel: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut int, mut term) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(int), Ok(term)) => (int, term),
        (Err(e), _) | (_, Err(e)) => {
            warn!(target: "boot.core", error = %e, "cannot install signal handlers");
            return;
        }
    };
    loop {
        let sig = tokio::select! {
            _ = int.recv() => "SIGINT",
            _ = term.recv() => "SIGTERM",
            _ = cancel.cancelled() => return,
        };
        info!(target: "boot.core", signal = sig, "caught signal");
        cancel.cancel();
    }
}

#[cfg(not(unix))]
async fn cancel_on_signal(cancel: CancellationToken) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if res.is_ok() {
                info!(target: "boot.core", signal = "ctrl-c", "caught signal");
                cancel.cancel();
            }
        }
        _ = cancel.cancelled() => {}
    }
}
