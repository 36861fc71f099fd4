mod prefix;
pub use prefix::log_prefix;

mod spec;
pub use spec::ProcSpec;

mod stream;

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use boot_model::Environ;
use tokio::{io::AsyncWrite, process::Command, sync::oneshot};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use crate::{
    error::{ExecError, ExecResult},
    util::send_sigterm,
};

/// How long a child gets to exit after SIGTERM before its output streams are abandoned.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Runs external programs on behalf of the orchestrator.
///
/// Cheap to clone; clones share the environment snapshot and the shutdown tracker.
#[derive(Clone)]
pub struct ProcRunner {
    environ: Arc<Environ>,
    source_path: PathBuf,
    bin_dir: Option<PathBuf>,
    grace: Duration,
    shutdown: TaskTracker,
}

impl ProcRunner {
    pub fn new(environ: Environ) -> Self {
        Self {
            environ: Arc::new(environ),
            source_path: PathBuf::from("."),
            bin_dir: None,
            grace: DEFAULT_GRACE,
            shutdown: TaskTracker::new(),
        }
    }

    /// Base directory for relative working directories.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Directory of installed binaries; stripped from log prefixes.
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Track termination watchers in `tracker` instead of a private one.
    pub fn with_tracker(mut self, tracker: TaskTracker) -> Self {
        self.shutdown = tracker;
        self
    }

    pub fn environ(&self) -> &Environ {
        &self.environ
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.shutdown
    }

    /// Run `spec` to completion.
    ///
    /// Stderr always goes to the log. Stdout goes to `output` when given, otherwise to the log.
    /// Returns once both streams are drained and the child has exited. If `cancel` fired at any
    /// point the result is [`ExecError::Cancelled`], whatever the exit status was.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        spec: &ProcSpec,
        output: Option<&mut (dyn AsyncWrite + Unpin + Send)>,
    ) -> ExecResult<()> {
        let cmdline = spec.cmdline();
        info!(target: "boot.exec", command = %cmdline, dir = %spec.dir.display(), "executing");

        let prefix = log_prefix(&spec.program, &spec.args, &spec.dir, self.bin_dir.as_deref());

        let mut cmd = Command::new(self.resolve_program(&spec.program));
        cmd.args(&spec.args)
            .current_dir(self.resolve_dir(&spec.dir))
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for kv in self.environ.merged(&spec.env) {
            if let Some((k, v)) = kv.split_once('=') {
                cmd.env(k, v);
            }
        }

        let (started_tx, started_rx) = oneshot::channel();
        let done = CancellationToken::new();
        let close = CancellationToken::new();
        self.shutdown.spawn(terminate_on_cancel(Watch {
            cancel: cancel.clone(),
            done: done.clone(),
            close: close.clone(),
            started: started_rx,
            grace: self.grace,
            cmdline: cmdline.clone(),
            dir: spec.dir.display().to_string(),
        }));
        let _done = done.drop_guard();

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            cmdline: cmdline.clone(),
            source,
        })?;
        if let Some(pid) = child.id() {
            let _ = started_tx.send(pid);
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (prefix, close) = (&prefix, &close);
        let copy_out = async move {
            match output {
                Some(w) => stream::copy_raw(stdout, w, close).await,
                None => {
                    stream::forward_lines(stdout, prefix, close).await;
                    Ok(())
                }
            }
        };
        let copy_err = stream::forward_lines(stderr, prefix, close);
        let (copied, ()) = tokio::join!(copy_out, copy_err);

        let status = child.wait().await;
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        let status = status.map_err(|source| ExecError::Wait {
            cmdline: cmdline.clone(),
            source,
        })?;
        copied.map_err(|source| ExecError::Output {
            cmdline: cmdline.clone(),
            source,
        })?;
        if !status.success() {
            return Err(ExecError::Failed { cmdline, status });
        }
        debug!(target: "boot.exec", command = %cmdline, "exit success");
        Ok(())
    }

    /// Run `spec` and return its stdout.
    pub async fn output(&self, cancel: &CancellationToken, spec: &ProcSpec) -> ExecResult<String> {
        let mut buf: Vec<u8> = Vec::new();
        self.run(cancel, spec, Some(&mut buf)).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn resolve_program(&self, program: &str) -> PathBuf {
        if program.contains('/') {
            return PathBuf::from(program);
        }
        self.environ
            .look_path(program)
            .unwrap_or_else(|| PathBuf::from(program))
    }

    fn resolve_dir(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.source_path.join(dir)
        }
    }
}

struct Watch {
    cancel: CancellationToken,
    done: CancellationToken,
    close: CancellationToken,
    started: oneshot::Receiver<u32>,
    grace: Duration,
    cmdline: String,
    dir: String,
}

/// Background half of [`ProcRunner::run`]: SIGTERM on cancel, then abandon the streams
/// every grace period until the run finishes. The child is never SIGKILLed.
async fn terminate_on_cancel(w: Watch) {
    tokio::select! {
        _ = w.cancel.cancelled() => {}
        _ = w.done.cancelled() => return,
    }

    let pid = tokio::select! {
        pid = w.started => match pid {
            Ok(pid) => pid,
            // Spawn failed; nothing to terminate.
            Err(_) => return,
        },
        _ = w.done.cancelled() => return,
    };

    loop {
        if w.done.is_cancelled() {
            return;
        }
        debug!(target: "boot.exec", pid, command = %w.cmdline, dir = %w.dir, "sending SIGTERM");
        if let Err(e) = send_sigterm(pid) {
            debug!(target: "boot.exec", pid, error = %e, "SIGTERM failed");
        }

        tokio::select! {
            _ = w.done.cancelled() => return,
            _ = tokio::time::sleep(w.grace) => {}
        }
        w.close.cancel();
        warn!(
            target: "boot.exec",
            pid,
            command = %w.cmdline,
            dir = %w.dir,
            "still waiting for child process to exit {:?} after SIGTERM",
            w.grace
        );
    }
}
