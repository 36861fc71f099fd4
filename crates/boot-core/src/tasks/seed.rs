use std::sync::Arc;

use async_trait::async_trait;
use boot_exec::ProcSpec;
use tokio_util::sync::CancellationToken;

use super::{API_SRC, RAILS_ENV};
use crate::{BootContext, BootError, Fail, Task, TaskRef};

/// Create the API schema and initial rows.
#[derive(Debug, Clone, Copy)]
pub struct SeedDatabase;

#[async_trait]
impl Task for SeedDatabase {
    fn name(&self) -> String {
        "seed database".to_string()
    }

    fn depends(&self) -> Vec<TaskRef> {
        vec![super::postgresql(), super::install_api()]
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        _fail: Fail,
        ctx: Arc<BootContext>,
    ) -> Result<(), BootError> {
        ctx.wait_for(&cancel, &self.depends()).await?;
        let mut spec = ProcSpec::new("bundle")
            .args(["exec", "rake", "db:setup"])
            .dir(API_SRC);
        for (k, v) in RAILS_ENV {
            spec = spec.env(k, v);
        }
        ctx.run(&cancel, &spec).await
    }
}
