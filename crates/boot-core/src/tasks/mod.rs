//! The bring-up tasks of a single-host cluster.

mod certs;
pub use certs::Certificates;

mod postgres;
pub use postgres::PostgreSql;

mod nginx;
pub use nginx::{Nginx, render_template};

mod service;
pub use service::RunServiceCommand;

mod go;
pub use go::{RunGoProgram, go_install};

mod passenger;
pub use passenger::{InstallPassenger, RunPassenger, passenger_log_level};

mod seed;
pub use seed::SeedDatabase;

use std::sync::Arc;

use boot_model::{ClusterType, ServiceKind};

use crate::TaskRef;

/// Extra environment for every Rails program.
pub(crate) const RAILS_ENV: [(&str, &str); 2] = [
    ("ARVADOS_RAILS_LOG_TO_STDOUT", "1"),
    ("ARVADOS_CONFIG_NOLEGACY", "1"),
];

pub(crate) const API_SRC: &str = "services/api";
pub(crate) const WORKBENCH_SRC: &str = "apps/workbench";

pub(crate) fn certificates() -> TaskRef {
    Arc::new(Certificates)
}

pub(crate) fn postgresql() -> TaskRef {
    Arc::new(PostgreSql)
}

pub(crate) fn install_api() -> TaskRef {
    Arc::new(InstallPassenger::new(API_SRC, vec![]))
}

pub(crate) fn passenger_api() -> TaskRef {
    Arc::new(RunPassenger::new(
        API_SRC,
        ServiceKind::RailsApi,
        vec![certificates(), postgresql(), install_api()],
    ))
}

/// Every task needed to boot a cluster of `cluster_type`.
pub fn cluster_tasks(cluster_type: ClusterType) -> Vec<TaskRef> {
    let install_workbench: TaskRef =
        Arc::new(InstallPassenger::new(WORKBENCH_SRC, vec![install_api()]));

    let mut tasks: Vec<TaskRef> = vec![
        certificates(),
        postgresql(),
        Arc::new(Nginx),
        Arc::new(RunServiceCommand::new("controller", ServiceKind::Controller, vec![postgresql()])),
        Arc::new(RunGoProgram::new("services/arv-git-httpd", Some(ServiceKind::GitHttp), vec![])),
        Arc::new(RunGoProgram::new("services/health", Some(ServiceKind::Health), vec![])),
        Arc::new(RunGoProgram::new(
            "services/keepproxy",
            Some(ServiceKind::Keepproxy),
            vec![passenger_api()],
        )),
        Arc::new(RunGoProgram::new("services/keepstore", Some(ServiceKind::Keepstore), vec![])),
        Arc::new(RunGoProgram::new("services/keep-web", Some(ServiceKind::WebDav), vec![])),
        Arc::new(RunServiceCommand::new("ws", ServiceKind::Websocket, vec![postgresql()])),
        install_api(),
        passenger_api(),
        // Depends on the API install only so it does not slow down API startup.
        install_workbench.clone(),
        Arc::new(RunPassenger::new(
            WORKBENCH_SRC,
            ServiceKind::Workbench1,
            vec![install_workbench],
        )),
        Arc::new(SeedDatabase),
    ];
    if !cluster_type.is_test() {
        tasks.push(Arc::new(RunServiceCommand::new(
            "dispatch-cloud",
            ServiceKind::DispatchCloud,
            vec![],
        )));
        tasks.push(Arc::new(RunGoProgram::new("services/keep-balance", None, vec![])));
    }
    tasks
}
