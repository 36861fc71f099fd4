use std::sync::Arc;

use async_trait::async_trait;
use boot_exec::ProcSpec;
use boot_model::{ServiceKind, ServiceUrl, join_host_port};
use tokio_util::sync::CancellationToken;

use crate::{BootContext, BootError, Fail, Task, TaskRef, wait_for_connect};

pub(crate) const INTERNAL_URL_ENV: &str = "ARVADOS_SERVICE_INTERNAL_URL";

/// `arvados-server <name> -config <file>`, one process per internal URL of `svc`.
pub struct RunServiceCommand {
    name: String,
    svc: ServiceKind,
    depends: Vec<TaskRef>,
}

impl RunServiceCommand {
    pub fn new(name: impl Into<String>, svc: ServiceKind, depends: Vec<TaskRef>) -> Self {
        Self {
            name: name.into(),
            svc,
            depends,
        }
    }
}

#[async_trait]
impl Task for RunServiceCommand {
    fn name(&self) -> String {
        self.name.clone()
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
        let binfile = ctx.bin_dir().join("arvados-server");
        let binfile = binfile.to_string_lossy().into_owned();
        ctx.run(
            &cancel,
            &ProcSpec::new(&binfile).arg("-version").dir(ctx.workspace()),
        )
        .await?;
        ctx.wait_for(&cancel, &self.depends).await?;

        let config = ctx.config_file().to_string_lossy().into_owned();
        start_instances(&ctx, &cancel, &fail, &self.name, self.svc, |url| {
            ProcSpec::new(&binfile)
                .args([self.name.as_str(), "-config", config.as_str()])
                .env(INTERNAL_URL_ENV, url.to_string())
                .dir(ctx.workspace())
        })
        .await
    }
}

/// Start one background process per internal URL of `svc`, then wait until each accepts
/// connections.
pub(crate) async fn start_instances<F>(
    ctx: &BootContext,
    cancel: &CancellationToken,
    fail: &Fail,
    label: &str,
    svc: ServiceKind,
    spec: F,
) -> Result<(), BootError>
where
    F: Fn(&ServiceUrl) -> ProcSpec,
{
    let urls: Vec<ServiceUrl> = ctx
        .cluster()
        .services
        .get(svc)
        .internal_urls
        .keys()
        .cloned()
        .collect();
    if urls.is_empty() {
        return Err(BootError::Config(format!(
            "{label}: no internal URLs configured for {}",
            svc.as_str()
        )));
    }
    for url in &urls {
        ctx.spawn_background(label.to_string(), cancel.clone(), fail.clone(), spec(url));
    }
    for url in &urls {
        wait_for_connect(cancel, &connect_addr(url)?).await?;
    }
    Ok(())
}

/// `host:port` to dial for `url`, with the scheme's default port filled in.
pub(crate) fn connect_addr(url: &ServiceUrl) -> Result<String, BootError> {
    Ok(join_host_port(&url.hostname(), &url.port()?))
}
