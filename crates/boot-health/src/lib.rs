//! Health aggregation for a booted cluster.
//!
//! Every configured service exposes `GET /_health/ping` returning `{"health": "OK"}` (bearer
//! management token required). [`HealthAggregator`] polls all of them and reports per-check
//! status; [`HealthAggregator::wait_all_ok`] loops until every check passes or the run is canceled.

mod tasks;

mod config;
pub use config::{HEALTH_PATH, HealthConfig};

mod errors;
pub use errors::HealthError;

mod aggregator;
pub use aggregator::{CheckResult, ClusterHealth, HealthAggregator, HealthTarget};

/// The only passing status value.
pub const HEALTH_OK: &str = "OK";
