//! Logger setup for the boot orchestrator.
//!
//! Output goes to stderr so that stdout stays free for whatever the caller prints
//! (e.g. the controller URL once the cluster is up).

mod logger;
pub use logger::*;
