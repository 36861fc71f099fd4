use std::{path::PathBuf, sync::Arc};

use boot_exec::ProcRunner;
use boot_health::HealthAggregator;
use boot_model::{Config, Environ};
use tokio::sync::watch;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};

use super::{
    ReadyState,
    env::{child_environ, setup_ruby_env, source_version},
};
use crate::{
    BootContext, BootError, SupervisorConfig, TaskGraph, Workspace, autofill, schedule,
    tasks::{cluster_tasks, go_install},
};

const SERVER_SRC: &str = "cmd/arvados-server";

/// One complete boot: prepare, bring everything up, idle until cancelled, tear down.
///
/// Returns `Ok` only when cancellation came from outside after a clean bring-up.
pub(crate) async fn run(
    mut opts: SupervisorConfig,
    config: Config,
    cancel: CancellationToken,
    ready: watch::Sender<Option<Arc<ReadyState>>>,
) -> Result<(), BootError> {
    opts.source_path = resolve_source(&opts.source_path)?;
    if !opts.source_version.is_empty() {
        return Err(BootError::Config(
            "specifying a version to run is not yet supported".to_string(),
        ));
    }

    let workspace = Workspace::create()?;
    let tracker = TaskTracker::new();
    let result = bring_up(&opts, config, &workspace, &cancel, &ready, &tracker).await;
    if let Err(e) = &result {
        if !e.is_cancelled() {
            warn!(target: "boot.core", error = %e, "boot failed");
        }
        cancel.cancel();
    }

    info!(target: "boot.core", "shutting down");
    tracker.close();
    tracker.wait().await;
    workspace.close();
    result
}

async fn bring_up(
    opts: &SupervisorConfig,
    mut config: Config,
    workspace: &Workspace,
    cancel: &CancellationToken,
    ready: &watch::Sender<Option<Arc<ReadyState>>>,
    tracker: &TaskTracker,
) -> Result<(), BootError> {
    let mut cluster = config.single_cluster()?;
    autofill(&mut cluster, opts, workspace.path())?;
    config.replace_cluster(cluster.clone());
    let config_file = workspace.write_config(&config)?;

    let mut environ = child_environ(
        Environ::from_host(),
        &config_file,
        opts.cluster_type,
        workspace.path(),
    );
    let runner_for = |env: &Environ| {
        ProcRunner::new(env.clone())
            .with_source_path(&opts.source_path)
            .with_bin_dir(workspace.bin_dir())
            .with_grace(opts.grace_period)
            .with_tracker(tracker.clone())
    };

    let version = source_version(&runner_for(&environ), cancel).await?;
    info!(target: "boot.core", version = %version, source = %opts.source_path.display(), "source tree");
    go_install(
        &runner_for(&environ),
        cancel,
        &opts.source_path.join(SERVER_SRC),
        &workspace.bin_dir(),
        &version,
    )
    .await?;
    setup_ruby_env(&mut environ, &runner_for, cancel).await?;

    let graph = TaskGraph::new(cluster_tasks(opts.cluster_type))?;
    let ctx = Arc::new(
        BootContext::new(
            opts.clone(),
            cluster,
            workspace.path(),
            runner_for(&environ),
            &graph,
            cancel.clone(),
        )
        .with_source_version(version),
    );

    if let Err(e) = schedule(ctx.clone(), &graph).await {
        return Err(ctx.take_failure().unwrap_or(e));
    }
    info!(target: "boot.core", "all startup tasks are complete; starting health checks");

    let aggregator = HealthAggregator::for_cluster(ctx.cluster())?;
    ready.send_replace(Some(Arc::new(ReadyState {
        aggregator,
        controller: ctx.cluster().services.controller.external_url.clone(),
    })));

    cancel.cancelled().await;
    match ctx.take_failure() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn resolve_source(path: &std::path::Path) -> Result<PathBuf, BootError> {
    std::fs::canonicalize(path).map_err(|e| BootError::io(path.display().to_string(), e))
}
