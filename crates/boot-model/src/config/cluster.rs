use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{Extra, ServiceUrl, Services};

/// One cluster's configuration.
///
/// Only the keys the orchestrator reads or fills in are typed. Every other key is kept in
/// `extra` and written back untouched, so children see the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Cluster {
    #[serde(rename = "ClusterID")]
    pub cluster_id: String,
    pub services: Services,
    pub system_root_token: String,
    pub management_token: String,
    #[serde(rename = "API")]
    pub api: ApiConfig,
    pub collections: Collections,
    pub containers: Containers,
    #[serde(rename = "TLS")]
    pub tls: TlsConfig,
    pub volumes: BTreeMap<String, Volume>,
    #[serde(rename = "PostgreSQL")]
    pub postgresql: PostgreSql,
    pub system_logs: SystemLogs,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApiConfig {
    pub rails_session_secret_token: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Collections {
    pub blob_signing_key: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Containers {
    pub dispatch_private_key: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TlsConfig {
    /// Skip certificate verification on internal calls.
    pub insecure: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificate: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Storage volume: a driver name plus driver-specific parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Volume {
    pub driver: String,
    pub driver_parameters: serde_json::Value,
    pub access_via_hosts: BTreeMap<ServiceUrl, VolumeAccess>,
    #[serde(skip_serializing_if = "is_zero")]
    pub replication: u32,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Volume {
    /// `Directory` volume rooted at `root`, served by the storage process at `via`.
    pub fn directory(root: &str, via: ServiceUrl) -> Self {
        let mut access_via_hosts = BTreeMap::new();
        access_via_hosts.insert(via, VolumeAccess::default());
        Self {
            driver: "Directory".to_string(),
            driver_parameters: serde_json::json!({ "Root": root }),
            access_via_hosts,
            replication: 0,
            extra: Extra::new(),
        }
    }

    /// `Root` driver parameter, if present.
    pub fn root(&self) -> Option<&str> {
        self.driver_parameters.get("Root")?.as_str()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VolumeAccess {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PostgreSql {
    /// libpq-style connection keys (`host`, `port`, `dbname`, `user`, ...).
    #[serde(deserialize_with = "scalar_map")]
    pub connection: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SystemLogs {
    pub format: String,
    pub log_level: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for SystemLogs {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            log_level: "info".to_string(),
            extra: Extra::new(),
        }
    }
}

/// String map whose values may be written as bare YAML numbers or booleans (`port: 5432`).
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => Ok((k, s)),
            serde_json::Value::Number(n) => Ok((k, n.to_string())),
            serde_json::Value::Bool(b) => Ok((k, b.to_string())),
            other => Err(de::Error::custom(format!("{k}: expected a scalar, got {other}"))),
        })
        .collect()
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}
