//! Completes a partially specified cluster configuration before anything is started.

mod ports;
pub use ports::PortAllocator;

mod secrets;
pub use secrets::random_hex;

use std::{collections::BTreeMap, path::Path};

use boot_model::{
    Cluster, ClusterType, ServiceInstance, ServiceKind, ServiceUrl, Volume, join_host_port,
    split_host_port,
};
use tracing::debug;

use crate::{BootError, SupervisorConfig};

/// Length of every generated token and key.
pub const SECRET_CHARS: usize = 64;

/// Services that get an `https` external URL when none is configured.
const HTTPS_EXTERNAL: [ServiceKind; 6] = [
    ServiceKind::Controller,
    ServiceKind::GitHttp,
    ServiceKind::Keepproxy,
    ServiceKind::WebDav,
    ServiceKind::WebDavDownload,
    ServiceKind::Workbench1,
];

/// Services that get URLs assigned; keep-balance has no listener of its own.
const DEFAULTED: [ServiceKind; 11] = [
    ServiceKind::Controller,
    ServiceKind::DispatchCloud,
    ServiceKind::GitHttp,
    ServiceKind::Health,
    ServiceKind::Keepproxy,
    ServiceKind::Keepstore,
    ServiceKind::RailsApi,
    ServiceKind::WebDav,
    ServiceKind::WebDavDownload,
    ServiceKind::Websocket,
    ServiceKind::Workbench1,
];

const DISPATCH_KEY_PATH: &str = "lib/dispatchcloud/test/sshkey_dispatch";

/// Fill every unset endpoint, secret and (in test mode) storage volume of `cluster`.
///
/// Values already present are left alone. Storage directories are created under `workspace`.
pub fn autofill(
    cluster: &mut Cluster,
    opts: &SupervisorConfig,
    workspace: &Path,
) -> Result<(), BootError> {
    let mut ports = PortAllocator::new();
    let host = opts.listen_host.as_str();

    if cluster.services.controller.external_url.is_none() {
        let (h, p) = split_host_port(&opts.controller_addr)?;
        let h = if h.is_empty() { host.to_string() } else { h };
        let p = if p == "0" {
            ports.next(&h)?.to_string()
        } else {
            p
        };
        cluster.services.controller.external_url =
            Some(ServiceUrl::new("https", join_host_port(&h, &p)));
    }

    for kind in DEFAULTED {
        if kind == ServiceKind::DispatchCloud && opts.cluster_type.is_test() {
            continue;
        }
        let svc = cluster.services.get_mut(kind);
        if svc.external_url.is_none() {
            let scheme = if HTTPS_EXTERNAL.contains(&kind) {
                Some("https")
            } else if kind == ServiceKind::Websocket {
                Some("wss")
            } else {
                None
            };
            if let Some(scheme) = scheme {
                let port = ports.next(host)?.to_string();
                svc.external_url = Some(ServiceUrl::new(scheme, join_host_port(host, &port)));
            }
        }
        if svc.internal_urls.is_empty() {
            let url = internal_url(&mut ports, host)?;
            svc.internal_urls.insert(url, ServiceInstance::default());
        }
    }

    fill_secrets(cluster)?;

    if !opts.cluster_type.is_production() {
        if cluster.containers.dispatch_private_key.is_empty() {
            let path = opts.source_path.join(DISPATCH_KEY_PATH);
            cluster.containers.dispatch_private_key = std::fs::read_to_string(&path)
                .map_err(|e| BootError::io(path.display().to_string(), e))?;
        }
        cluster.tls.insecure = true;
    }

    if opts.cluster_type == ClusterType::Test {
        // Second keepstore process, one directory volume each.
        let url = internal_url(&mut ports, host)?;
        cluster
            .services
            .keepstore
            .internal_urls
            .insert(url, ServiceInstance::default());
        cluster.volumes = test_volumes(cluster, workspace)?;
    }

    if opts.own_temporary_database {
        let port = ports.next(host)?.to_string();
        cluster.postgresql.connection = temporary_database(&port);
    }

    debug!(target: "boot.core.autofill", cluster = %cluster.cluster_id, ports = ports.used(), "config autofilled");
    Ok(())
}

fn internal_url(ports: &mut PortAllocator, host: &str) -> Result<ServiceUrl, BootError> {
    let port = ports.next(host)?.to_string();
    Ok(ServiceUrl::new("http", join_host_port(host, &port)))
}

fn fill_secrets(cluster: &mut Cluster) -> Result<(), BootError> {
    for secret in [
        &mut cluster.system_root_token,
        &mut cluster.management_token,
        &mut cluster.api.rails_session_secret_token,
        &mut cluster.collections.blob_signing_key,
    ] {
        if secret.is_empty() {
            *secret = random_hex(SECRET_CHARS)?;
        }
    }
    Ok(())
}

fn test_volumes(
    cluster: &Cluster,
    workspace: &Path,
) -> Result<BTreeMap<String, Volume>, BootError> {
    let mut volumes = BTreeMap::new();
    for (n, url) in cluster.services.keepstore.internal_urls.keys().enumerate() {
        let datadir = workspace.join(format!("keep{n}.data"));
        match std::fs::create_dir(&datadir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && datadir.is_dir() => {}
            Err(e) => return Err(BootError::io(datadir.display().to_string(), e)),
        }
        let name = format!("{}-nyw5e-{:015}", cluster.cluster_id, n);
        volumes.insert(
            name,
            Volume::directory(&datadir.to_string_lossy(), url.clone()),
        );
    }
    Ok(volumes)
}

fn temporary_database(port: &str) -> BTreeMap<String, String> {
    [
        ("client_encoding", "utf8"),
        ("host", "localhost"),
        ("port", port),
        ("dbname", "arvados_test"),
        ("user", "arvados"),
        ("password", "insecure_arvados_test"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(source: &Path, cluster_type: ClusterType) -> SupervisorConfig {
        SupervisorConfig {
            source_path: source.to_path_buf(),
            cluster_type,
            ..SupervisorConfig::default()
        }
    }

    #[test]
    fn preset_secrets_are_kept() {
        let ws = tempfile::tempdir().unwrap();
        let mut cluster = Cluster {
            cluster_id: "xxxxx".into(),
            system_root_token: "preset".into(),
            ..Cluster::default()
        };
        autofill(&mut cluster, &opts(ws.path(), ClusterType::Production), ws.path()).unwrap();

        assert_eq!(cluster.system_root_token, "preset");
        for s in [
            &cluster.management_token,
            &cluster.api.rails_session_secret_token,
            &cluster.collections.blob_signing_key,
        ] {
            assert_eq!(s.len(), SECRET_CHARS);
        }
        assert!(!cluster.tls.insecure);
        assert!(cluster.containers.dispatch_private_key.is_empty());
    }

    #[test]
    fn controller_addr_supplies_external_url() {
        let ws = tempfile::tempdir().unwrap();
        let mut o = opts(ws.path(), ClusterType::Production);
        o.controller_addr = "127.0.0.1:4430".into();
        let mut cluster = Cluster::default();
        autofill(&mut cluster, &o, ws.path()).unwrap();

        let url = cluster.services.controller.external_url.unwrap();
        assert_eq!(url.to_string(), "https://127.0.0.1:4430");
    }

    #[test]
    fn missing_dispatch_key_fails_outside_production() {
        let ws = tempfile::tempdir().unwrap();
        let mut cluster = Cluster::default();
        let err = autofill(&mut cluster, &opts(ws.path(), ClusterType::Development), ws.path())
            .unwrap_err();
        assert!(matches!(err, BootError::Io { .. }), "{err:?}");
    }

    #[test]
    fn bad_controller_addr_is_a_config_error() {
        let ws = tempfile::tempdir().unwrap();
        let mut o = opts(ws.path(), ClusterType::Production);
        o.controller_addr = "no-port".into();
        let err = autofill(&mut Cluster::default(), &o, ws.path()).unwrap_err();
        assert!(matches!(err, BootError::Model(_)), "{err:?}");
    }
}
