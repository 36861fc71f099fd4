use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use boot_exec::{ProcRunner, ProcSpec};
use boot_model::Cluster;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::error;

use crate::{BootError, Fail, ReadyMap, SupervisorConfig, TaskGraph, TaskRef};

/// What every task gets to see of the running boot.
///
/// Configuration is frozen by the time this exists; the only shared mutable state is the
/// readiness map, the first recorded failure and the install lock.
pub struct BootContext {
    opts: SupervisorConfig,
    cluster: Cluster,
    workspace: PathBuf,
    source_version: String,
    runner: ProcRunner,
    ready: ReadyMap,
    cancel: CancellationToken,
    failure: Mutex<Option<BootError>>,
    install_lock: tokio::sync::Mutex<()>,
}

impl BootContext {
    /// One readiness signal is allocated per task in `graph`.
    pub fn new(
        opts: SupervisorConfig,
        cluster: Cluster,
        workspace: impl Into<PathBuf>,
        runner: ProcRunner,
        graph: &TaskGraph,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            opts,
            cluster,
            workspace: workspace.into(),
            source_version: String::new(),
            runner,
            ready: ReadyMap::new(graph.names()),
            cancel,
            failure: Mutex::new(None),
            install_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_source_version(mut self, version: impl Into<String>) -> Self {
        self.source_version = version.into();
        self
    }

    pub fn opts(&self) -> &SupervisorConfig {
        &self.opts
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.workspace.join("bin")
    }

    pub fn config_file(&self) -> PathBuf {
        self.workspace.join(crate::workspace::CONFIG_FILE)
    }

    pub fn source_path(&self) -> &Path {
        &self.opts.source_path
    }

    pub fn source_version(&self) -> &str {
        &self.source_version
    }

    pub fn runner(&self) -> &ProcRunner {
        &self.runner
    }

    pub fn ready(&self) -> &ReadyMap {
        &self.ready
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Tracks background services and process watchers until shutdown.
    pub fn tracker(&self) -> &TaskTracker {
        self.runner.tracker()
    }

    /// Serializes dependency installs that share a toolchain cache.
    pub(crate) fn install_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.install_lock
    }

    /// Block until the named tasks are ready, or `cancel` fires.
    pub async fn wait<S: AsRef<str>>(
        &self,
        cancel: &CancellationToken,
        names: &[S],
    ) -> Result<(), BootError> {
        self.ready.wait(cancel, names).await
    }

    /// [`wait`](Self::wait) on the names of `tasks`.
    pub async fn wait_for(
        &self,
        cancel: &CancellationToken,
        tasks: &[TaskRef],
    ) -> Result<(), BootError> {
        let names: Vec<String> = tasks.iter().map(|t| t.name()).collect();
        self.wait(cancel, &names).await
    }

    /// Run a program to completion.
    pub async fn run(&self, cancel: &CancellationToken, spec: &ProcSpec) -> Result<(), BootError> {
        Ok(self.runner.run(cancel, spec, None).await?)
    }

    /// Run a program and return its stdout.
    pub async fn output(
        &self,
        cancel: &CancellationToken,
        spec: &ProcSpec,
    ) -> Result<String, BootError> {
        Ok(self.runner.output(cancel, spec).await?)
    }

    /// Start a long-running service program in the background.
    ///
    /// The program is expected to run until shutdown: any exit before `cancel` fires, clean or
    /// not, is reported through `fail`.
    pub fn spawn_background(&self, name: String, cancel: CancellationToken, fail: Fail, spec: ProcSpec) {
        let runner = self.runner.clone();
        self.tracker().spawn(async move {
            match runner.run(&cancel, &spec, None).await {
                Ok(()) if !cancel.is_cancelled() => fail.report(BootError::Exited(name)),
                Ok(()) => {}
                Err(e) => fail.report(e.into()),
            }
        });
    }

    /// `go install` the program at `src` (relative to the source tree) into the bin dir.
    pub async fn install_go_program(
        &self,
        cancel: &CancellationToken,
        src: &str,
    ) -> Result<PathBuf, BootError> {
        crate::tasks::go_install(
            &self.runner,
            cancel,
            &self.source_path().join(src),
            &self.bin_dir(),
            &self.source_version,
        )
        .await
    }

    /// Record a task failure and cancel the boot.
    ///
    /// Only the first failure is kept; anything reported after cancellation is shutdown noise
    /// and is dropped.
    pub fn fail_task(&self, task: &str, err: BootError) {
        if self.cancel.is_cancelled() {
            return;
        }
        error!(target: "boot.core.sched", task, error = %err, "task failed");
        if let Ok(mut slot) = self.failure.lock() {
            slot.get_or_insert(BootError::TaskFailed {
                task: task.to_string(),
                source: Box::new(err),
            });
        }
        self.cancel.cancel();
    }

    /// The first recorded task failure, if any.
    pub fn take_failure(&self) -> Option<BootError> {
        self.failure.lock().ok().and_then(|mut slot| slot.take())
    }
}
