//! Process supervision for the boot orchestrator.
//!
//! [`ProcRunner`] runs one external program to completion: environment merged from the
//! orchestrator's [`boot_model::Environ`], output forwarded to the log with a derived prefix
//! (or captured), and SIGTERM delivered when the shared cancellation token fires.

mod error;
pub use error::{ExecError, ExecResult};

mod proc;
pub use proc::{DEFAULT_GRACE, ProcRunner, ProcSpec, log_prefix};

mod util;

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::{ProcRunner, ProcSpec};
}
