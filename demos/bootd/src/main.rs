use std::{env, process::ExitCode};

use anyhow::Context;
use tracing::{error, info};

use boot_core::{Supervisor, SupervisorConfig};
use boot_model::{ClusterType, Config};
use boot_observe::{LoggerConfig, init_logger};

const DEFAULT_CONFIG: &str = "/etc/arvados/config.yml";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("bootd: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    // 1) Config
    let path = env::var("BOOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = Config::load(&path).with_context(|| format!("loading {path}"))?;
    let cluster = config.single_cluster()?;

    // 2) Logger, from the cluster's own logging section
    let debug = env::var("ARVADOS_DEBUG").ok();
    let logger = LoggerConfig::from_system_logs(
        &cluster.system_logs.format,
        &cluster.system_logs.log_level,
        debug.as_deref(),
    )?;
    init_logger(&logger)?;
    info!(config = %path, cluster = %cluster.cluster_id, "logger initialized");

    // 3) Orchestrator options
    let opts = options()?;
    info!(
        source = %opts.source_path.display(),
        cluster_type = %opts.cluster_type,
        "booting"
    );

    // 4) Boot, report the URL once healthy, run until signalled
    let supervisor = Supervisor::start(opts, config);
    if let Some(url) = supervisor.wait_ready().await {
        println!("{url}");
        info!(controller = %url, "cluster is up; press Ctrl+C to stop");
    }
    supervisor.wait().await?;
    info!("shut down cleanly");
    Ok(())
}

fn options() -> anyhow::Result<SupervisorConfig> {
    let mut opts = SupervisorConfig::default();
    if let Ok(v) = env::var("BOOT_SOURCE") {
        opts.source_path = v.into();
    }
    if let Ok(v) = env::var("BOOT_CLUSTER_TYPE") {
        opts.cluster_type = v.parse::<ClusterType>()?;
    }
    if let Ok(v) = env::var("BOOT_LISTEN_HOST") {
        opts.listen_host = v;
    }
    if let Ok(v) = env::var("BOOT_CONTROLLER_ADDR") {
        opts.controller_addr = v;
    }
    if let Ok(v) = env::var("BOOT_OWN_DATABASE") {
        opts.own_temporary_database = matches!(v.as_str(), "1" | "true" | "yes");
    }
    Ok(opts)
}
