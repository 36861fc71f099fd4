use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use boot_exec::ProcSpec;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{BootContext, BootError, Fail, Task, TaskRef, probe::sleep_or_cancel};

const READY_RETRY: Duration = Duration::from_millis(500);

/// Throwaway PostgreSQL server in the workspace, when the run owns its database.
///
/// With a configured external database this task does nothing.
#[derive(Debug, Clone, Copy)]
pub struct PostgreSql;

#[async_trait]
impl Task for PostgreSql {
    fn name(&self) -> String {
        "postgresql".to_string()
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
        if !ctx.opts().own_temporary_database {
            return Ok(());
        }

        let conn = &ctx.cluster().postgresql.connection;
        let setting = |key: &str| {
            conn.get(key)
                .cloned()
                .ok_or_else(|| BootError::Config(format!("PostgreSQL connection has no {key}")))
        };
        let (host, port) = (setting("host")?, setting("port")?);
        let (user, password) = (setting("user")?, setting("password")?);
        let ws = ctx.workspace().to_path_buf();

        let bindir = ctx
            .output(&cancel, &ProcSpec::new("pg_config").arg("--bindir").dir(&ws))
            .await?;
        let bindir = std::path::PathBuf::from(bindir.trim());
        let bin = |prog: &str| bindir.join(prog).to_string_lossy().into_owned();

        let datadir = ws.join("pgdata");
        tokio::fs::create_dir(&datadir)
            .await
            .map_err(|e| BootError::io(datadir.display().to_string(), e))?;
        let datadir = datadir.to_string_lossy().into_owned();

        ctx.run(
            &cancel,
            &ProcSpec::new(bin("initdb"))
                .args(["-D", datadir.as_str(), "-E", "utf8", "-U", "postgres"])
                .dir(&ws),
        )
        .await?;
        ctx.run(
            &cancel,
            &ProcSpec::new("cp")
                .args(["server.crt", "server.key", datadir.as_str()])
                .dir(&ws),
        )
        .await?;

        let server = ProcSpec::new(bin("postgres"))
            .args(["-l", "-D", datadir.as_str(), "-k", datadir.as_str(), "-p", port.as_str()])
            .dir(&ws);
        ctx.spawn_background(self.name(), cancel.clone(), fail, server);

        let isready = ProcSpec::new(bin("pg_isready"))
            .arg("--timeout=10")
            .arg(format!("--host={host}"))
            .arg(format!("--port={port}"))
            .dir(&ws);
        loop {
            match ctx.run(&cancel, &isready).await {
                Ok(()) => break,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => debug!(target: "boot.core.tasks", error = %e, "database not ready"),
            }
            sleep_or_cancel(&cancel, READY_RETRY).await?;
        }

        let psql = |db: &str, sql: String| {
            ProcSpec::new(bin("psql"))
                .args(["-h", host.as_str(), "-p", port.as_str(), "-U", "postgres", "-d", db])
                .args(["-v", "ON_ERROR_STOP=1", "-c"])
                .arg(sql)
                .dir(&ws)
        };
        ctx.run(
            &cancel,
            &psql(
                "postgres",
                format!("CREATE USER {user} WITH SUPERUSER ENCRYPTED PASSWORD '{password}'"),
            ),
        )
        .await?;
        ctx.run(
            &cancel,
            &psql("template1", "CREATE EXTENSION IF NOT EXISTS pg_trgm".to_string()),
        )
        .await
    }
}
