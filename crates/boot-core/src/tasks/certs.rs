use std::sync::Arc;

use async_trait::async_trait;
use boot_exec::ProcSpec;
use tokio_util::sync::CancellationToken;

use crate::{BootContext, BootError, Fail, Task};

const SUBJECT: &str = "/C=US/ST=MA/O=Example Org/CN=localhost";
const SAN_SECTION: &str = "\n[SAN]\nsubjectAltName=DNS:localhost,DNS:localhost.localdomain\n";
const SYSTEM_OPENSSL_CNF: &str = "/etc/ssl/openssl.cnf";

/// Root CA plus a CA-signed server certificate for `localhost`, written into the workspace
/// (`rootCA.{key,crt}`, `server.{key,crt}`).
#[derive(Debug, Clone, Copy)]
pub struct Certificates;

#[async_trait]
impl Task for Certificates {
    fn name(&self) -> String {
        "certificates".to_string()
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        _fail: Fail,
        ctx: Arc<BootContext>,
    ) -> Result<(), BootError> {
        let ws = ctx.workspace().to_path_buf();
        let openssl = |args: &[&str]| ProcSpec::new("openssl").args(args.iter().copied()).dir(&ws);

        ctx.run(&cancel, &openssl(&["genrsa", "-out", "rootCA.key", "4096"]))
            .await?;
        ctx.run(
            &cancel,
            &openssl(&[
                "req", "-x509", "-new", "-nodes", "-key", "rootCA.key", "-sha256", "-days", "3650",
                "-out", "rootCA.crt", "-subj", SUBJECT,
            ]),
        )
        .await?;
        ctx.run(&cancel, &openssl(&["genrsa", "-out", "server.key", "2048"]))
            .await?;

        let mut conf = tokio::fs::read_to_string(SYSTEM_OPENSSL_CNF)
            .await
            .map_err(|e| BootError::io(SYSTEM_OPENSSL_CNF, e))?;
        conf.push_str(SAN_SECTION);
        let cfg_path = ws.join("server.cfg");
        tokio::fs::write(&cfg_path, conf)
            .await
            .map_err(|e| BootError::io(cfg_path.display().to_string(), e))?;

        ctx.run(
            &cancel,
            &openssl(&[
                "req", "-new", "-sha256", "-key", "server.key", "-subj", SUBJECT, "-reqexts",
                "SAN", "-config", "server.cfg", "-out", "server.csr",
            ]),
        )
        .await?;
        ctx.run(
            &cancel,
            &openssl(&[
                "x509", "-req", "-in", "server.csr", "-CA", "rootCA.crt", "-CAkey", "rootCA.key",
                "-CAcreateserial", "-out", "server.crt", "-days", "3650", "-sha256",
            ]),
        )
        .await
    }
}
