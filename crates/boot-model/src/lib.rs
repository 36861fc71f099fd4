//! Data model shared by the boot orchestrator crates.
//!
//! - [`Config`] / [`Cluster`]: the cluster configuration document, read from YAML and written back as JSON once autofill has completed it.
//! - [`ServiceUrl`]: scheme + authority (+ optional path) used as service endpoints and as map keys.
//! - [`Environ`]: ordered `KEY=VALUE` list handed to child processes.
//! - [`ClusterType`]: run mode (`production`, `development`, `test`).

mod error;
pub use error::ModelError;

mod domain;
pub use domain::*;

mod config;
pub use config::*;
