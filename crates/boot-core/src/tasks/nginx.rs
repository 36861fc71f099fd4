use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use boot_exec::ProcSpec;
use boot_model::ServiceKind;
use tokio_util::sync::CancellationToken;

use super::service::connect_addr;
use crate::{BootContext, BootError, Fail, Task, TaskRef, wait_for_connect};

const TEMPLATE: &str = "sdk/python/tests/nginx.conf";
const SBIN_DIRS: [&str; 3] = ["/sbin", "/usr/sbin", "/usr/local/sbin"];

/// Services proxied by nginx, with the template variable prefix for each.
const PROXIED: [(&str, ServiceKind); 7] = [
    ("GIT", ServiceKind::GitHttp),
    ("KEEPWEB", ServiceKind::WebDav),
    ("KEEPWEBDL", ServiceKind::WebDavDownload),
    ("KEEPPROXY", ServiceKind::Keepproxy),
    ("CONTROLLER", ServiceKind::Controller),
    ("WS", ServiceKind::Websocket),
    ("WORKBENCH1", ServiceKind::Workbench1),
];

/// TLS-terminating reverse proxy in front of the public services.
#[derive(Debug, Clone, Copy)]
pub struct Nginx;

#[async_trait]
impl Task for Nginx {
    fn name(&self) -> String {
        "nginx".to_string()
    }

    fn depends(&self) -> Vec<TaskRef> {
        vec![super::certificates()]
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        fail: Fail,
        ctx: Arc<BootContext>,
    ) -> Result<(), BootError> {
        ctx.wait_for(&cancel, &self.depends()).await?;

        let ws = ctx.workspace();
        let in_ws = |file: &str| ws.join(file).to_string_lossy().into_owned();
        let mut vars: HashMap<String, String> = HashMap::from([
            ("LISTENHOST".to_string(), ctx.opts().listen_host.clone()),
            ("SSLCERT".to_string(), in_ws("server.crt")),
            ("SSLKEY".to_string(), in_ws("server.key")),
            ("ACCESSLOG".to_string(), in_ws("nginx_access.log")),
            ("ERRORLOG".to_string(), in_ws("nginx_error.log")),
            ("TMPDIR".to_string(), ws.to_string_lossy().into_owned()),
        ]);
        for (var, kind) in PROXIED {
            let svc = ctx.cluster().services.get(kind);
            vars.insert(format!("{var}PORT"), svc.internal_port()?);
            vars.insert(format!("{var}SSLPORT"), svc.external_port()?);
        }

        let tmpl_path = ctx.source_path().join(TEMPLATE);
        let tmpl = tokio::fs::read_to_string(&tmpl_path)
            .await
            .map_err(|e| BootError::io(tmpl_path.display().to_string(), e))?;
        let conffile = ws.join("nginx.conf");
        tokio::fs::write(&conffile, render_template(&tmpl, &vars))
            .await
            .map_err(|e| BootError::io(conffile.display().to_string(), e))?;

        let pid = format!("pid {};", in_ws("nginx.pid"));
        let spec = ProcSpec::new(nginx_program(&ctx))
            .args(["-g", "error_log stderr info;", "-g", pid.as_str(), "-c"])
            .arg(conffile.to_string_lossy())
            .dir(ws);
        ctx.spawn_background(self.name(), cancel.clone(), fail, spec);

        let controller = ctx
            .cluster()
            .services
            .controller
            .external_url
            .as_ref()
            .ok_or_else(|| BootError::Config("controller has no external URL".to_string()))?;
        wait_for_connect(&cancel, &connect_addr(controller)?).await
    }
}

fn nginx_program(ctx: &BootContext) -> String {
    if ctx.runner().environ().look_path("nginx").is_some() {
        return "nginx".to_string();
    }
    SBIN_DIRS
        .iter()
        .map(|dir| Path::new(dir).join("nginx"))
        .find(|p| p.exists())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "nginx".to_string())
}

/// Replace every `{{NAME}}` in `tmpl` with `vars[NAME]` (empty when unset).
pub fn render_template(tmpl: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(tmpl.len());
    let mut rest = tmpl;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = &rest[start + 2..start + 2 + len];
        out.push_str(vars.get(key).map(String::as_str).unwrap_or(""));
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    out
}
