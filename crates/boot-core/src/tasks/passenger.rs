use std::sync::Arc;

use async_trait::async_trait;
use boot_exec::ProcSpec;
use boot_model::ServiceKind;
use tokio_util::sync::CancellationToken;

use super::{RAILS_ENV, service::connect_addr};
use crate::{BootContext, BootError, Fail, Task, TaskRef, wait_for_connect};

const BUNDLER_VERSIONS: [&str; 3] = ["1.11.0", "1.17.3", "2.0.2"];
const BUNDLER_GEMS: [&str; 3] = ["bundler:1.11", "bundler:1.17.3", "bundler:2.0.2"];
const PASSENGER_CHECKS: [&str; 3] = [
    "build-native-support",
    "install-standalone-runtime",
    "validate-install",
];

/// Passenger's numeric log level for a config log level; unknown levels map to info.
pub fn passenger_log_level(level: &str) -> &'static str {
    match level {
        "debug" => "5",
        "warn" | "warning" => "2",
        "error" => "1",
        "fatal" | "panic" => "0",
        _ => "4",
    }
}

/// Install the gems of a Rails application and prepare its Passenger runtime.
pub struct InstallPassenger {
    src: String,
    depends: Vec<TaskRef>,
}

impl InstallPassenger {
    pub fn new(src: impl Into<String>, depends: Vec<TaskRef>) -> Self {
        Self {
            src: src.into(),
            depends,
        }
    }
}

#[async_trait]
impl Task for InstallPassenger {
    fn name(&self) -> String {
        format!("install {}", self.src)
    }

    fn depends(&self) -> Vec<TaskRef> {
        self.depends.clone()
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        _fail: Fail,
        ctx: Arc<BootContext>,
    ) -> Result<(), BootError> {
        ctx.wait_for(&cancel, &self.depends).await?;
        // Concurrent bundler runs trample each other's gem directory.
        let _install = ctx.install_lock().lock().await;

        let in_src = |spec: ProcSpec| spec.dir(&self.src);
        let installed = ctx
            .output(
                &cancel,
                &in_src(ProcSpec::new("gem").args(["list", "--details", "bundler"])),
            )
            .await?;
        if BUNDLER_VERSIONS
            .iter()
            .any(|v| !installed.contains(&format!("({v})")))
        {
            ctx.run(
                &cancel,
                &in_src(ProcSpec::new("gem").args(["install", "--user"]).args(BUNDLER_GEMS)),
            )
            .await?;
        }

        let home = ctx.runner().environ().get("HOME").unwrap_or_default();
        let gem_dir = std::path::Path::new(home).join(".gem");
        ctx.run(
            &cancel,
            &in_src(
                ProcSpec::new("bundle")
                    .args(["install", "--jobs", "4", "--path"])
                    .arg(gem_dir.to_string_lossy()),
            ),
        )
        .await?;
        for check in PASSENGER_CHECKS {
            ctx.run(
                &cancel,
                &in_src(ProcSpec::new("bundle").args(["exec", "passenger-config", check])),
            )
            .await?;
        }
        Ok(())
    }
}

/// Serve a Rails application with Passenger on its single internal port.
pub struct RunPassenger {
    src: String,
    svc: ServiceKind,
    depends: Vec<TaskRef>,
}

impl RunPassenger {
    pub fn new(src: impl Into<String>, svc: ServiceKind, depends: Vec<TaskRef>) -> Self {
        Self {
            src: src.into(),
            svc,
            depends,
        }
    }
}

#[async_trait]
impl Task for RunPassenger {
    fn name(&self) -> String {
        format!("passenger {}", self.src)
    }

    fn depends(&self) -> Vec<TaskRef> {
        self.depends.clone()
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        fail: Fail,
        ctx: Arc<BootContext>,
    ) -> Result<(), BootError> {
        ctx.wait_for(&cancel, &self.depends).await?;

        let svc = ctx.cluster().services.get(self.svc);
        let port = svc.internal_port()?;
        let url = svc
            .internal_urls
            .keys()
            .next()
            .ok_or_else(|| BootError::Config(format!("{}: no internal URL", self.name())))?;
        let level = passenger_log_level(&ctx.cluster().system_logs.log_level);
        let pid_file = ctx
            .workspace()
            .join(format!("passenger.{}.pid", self.src.replace('/', "_")));

        let mut spec = ProcSpec::new("bundle")
            .args(["exec", "passenger", "start", "-p", port.as_str()])
            .args(["--log-file", "/dev/stderr", "--log-level", level])
            .arg("--no-friendly-error-pages")
            .arg("--pid-file")
            .arg(pid_file.to_string_lossy())
            .dir(&self.src);
        for (k, v) in RAILS_ENV {
            spec = spec.env(k, v);
        }
        ctx.spawn_background(self.name(), cancel.clone(), fail, spec);

        wait_for_connect(&cancel, &connect_addr(url)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels() {
        assert_eq!(passenger_log_level("debug"), "5");
        assert_eq!(passenger_log_level("info"), "4");
        assert_eq!(passenger_log_level("warning"), "2");
        assert_eq!(passenger_log_level("panic"), "0");
        assert_eq!(passenger_log_level("chatty"), "4");
    }
}
