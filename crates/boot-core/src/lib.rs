//! Boot orchestrator core.
//!
//! [`Supervisor`] owns one run: it completes the cluster configuration ([`autofill`]), prepares
//! the child environment, builds the [`TaskGraph`], schedules every task concurrently (each task
//! waits on its dependencies through the [`BootContext`]), and tears everything down when the
//! shared cancellation token fires.

pub mod error;
pub use error::BootError;

mod options;
pub use options::SupervisorConfig;

pub mod autofill;
pub use autofill::{PortAllocator, autofill, random_hex};

mod ready;
pub use ready::ReadyMap;

pub mod graph;
pub use graph::{Fail, Task, TaskGraph, TaskRef};

mod context;
pub use context::BootContext;

mod sched;
pub use sched::schedule;

mod probe;
pub use probe::wait_for_connect;

mod workspace;
pub use workspace::Workspace;

pub mod tasks;

pub mod supervisor;
pub use supervisor::Supervisor;
