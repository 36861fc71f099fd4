use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use boot_exec::{ProcRunner, ProcSpec};
use boot_model::ServiceKind;
use tokio_util::sync::CancellationToken;

use super::service::{INTERNAL_URL_ENV, start_instances};
use crate::{BootContext, BootError, Fail, Task, TaskRef};

const VERSION_VARS: [&str; 2] = ["git.arvados.org/arvados.git/lib/cmd.version", "main.version"];

/// `go install` the package in `src_dir` into `bin_dir`, stamping `version` into the binary.
pub async fn go_install(
    runner: &ProcRunner,
    cancel: &CancellationToken,
    src_dir: &Path,
    bin_dir: &Path,
    version: &str,
) -> Result<PathBuf, BootError> {
    let basename = src_dir.file_name().ok_or_else(|| {
        BootError::Config(format!("{}: no program name", src_dir.display()))
    })?;
    let ldflags = VERSION_VARS
        .iter()
        .map(|var| format!("-X {var}={version}"))
        .collect::<Vec<_>>()
        .join(" ");
    let spec = ProcSpec::new("go")
        .args(["install", "-ldflags", ldflags.as_str()])
        .env("GOBIN", bin_dir.to_string_lossy())
        .dir(src_dir);
    runner.run(cancel, &spec, None).await?;
    Ok(bin_dir.join(basename))
}

/// Build a program from the source tree and run it, one process per internal URL of `svc`.
///
/// Without `svc` a single process is started with no readiness probe.
pub struct RunGoProgram {
    src: String,
    svc: Option<ServiceKind>,
    depends: Vec<TaskRef>,
}

impl RunGoProgram {
    pub fn new(src: impl Into<String>, svc: Option<ServiceKind>, depends: Vec<TaskRef>) -> Self {
        Self {
            src: src.into(),
            svc,
            depends,
        }
    }
}

#[async_trait]
impl Task for RunGoProgram {
    fn name(&self) -> String {
        self.src.clone()
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
        let binfile = ctx.install_go_program(&cancel, &self.src).await?;
        let binfile = binfile.to_string_lossy().into_owned();
        ctx.run(
            &cancel,
            &ProcSpec::new(&binfile).arg("-version").dir(ctx.workspace()),
        )
        .await?;
        ctx.wait_for(&cancel, &self.depends).await?;

        match self.svc {
            Some(svc) => {
                start_instances(&ctx, &cancel, &fail, &self.src, svc, |url| {
                    ProcSpec::new(&binfile)
                        .env(INTERNAL_URL_ENV, url.to_string())
                        .dir(ctx.workspace())
                })
                .await
            }
            None => {
                let spec = ProcSpec::new(&binfile).dir(ctx.workspace());
                ctx.spawn_background(self.src.clone(), cancel, fail, spec);
                Ok(())
            }
        }
    }
}
