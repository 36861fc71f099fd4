use std::{path::PathBuf, time::Duration};

use boot_exec::DEFAULT_GRACE;
use boot_model::ClusterType;

/// Orchestrator options (as opposed to cluster configuration).
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Source tree the services are built and run from.
    pub source_path: PathBuf,
    /// Empty means "detect from git".
    pub source_version: String,
    pub cluster_type: ClusterType,
    /// Host every auto-assigned endpoint listens on.
    pub listen_host: String,
    /// `host:port` for the controller when it has no external URL; port `0` picks one.
    pub controller_addr: String,
    /// Run a throwaway PostgreSQL instance instead of using the configured one.
    pub own_temporary_database: bool,
    pub grace_period: Duration,
    pub health_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("."),
            source_version: String::new(),
            cluster_type: ClusterType::Development,
            listen_host: "localhost".to_string(),
            controller_addr: ":0".to_string(),
            own_temporary_database: false,
            grace_period: DEFAULT_GRACE,
            health_interval: Duration::from_secs(1),
        }
    }
}
