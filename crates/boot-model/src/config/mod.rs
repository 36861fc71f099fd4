mod cluster;
pub use cluster::{
    ApiConfig, Cluster, Collections, Containers, PostgreSql, SystemLogs, TlsConfig, Volume,
    VolumeAccess,
};

mod service;
pub use service::{Service, ServiceInstance, ServiceKind, Services};

use std::{collections::BTreeMap, io::Write, path::Path};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Keys a config section holds beyond the ones the orchestrator types out.
pub type Extra = BTreeMap<String, serde_json::Value>;

/// Top-level configuration document: `Clusters: { <id>: Cluster }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub clusters: BTreeMap<String, Cluster>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Config {
    /// Parse a YAML (or JSON) document.
    pub fn from_yaml(text: &str) -> Result<Self, ModelError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// A config holding exactly one cluster.
    pub fn with_cluster(cluster: Cluster) -> Self {
        let mut clusters = BTreeMap::new();
        clusters.insert(cluster.cluster_id.clone(), cluster);
        Self {
            clusters,
            extra: Extra::new(),
        }
    }

    /// The only cluster in this document, with `cluster_id` filled from its key when empty.
    pub fn single_cluster(&self) -> Result<Cluster, ModelError> {
        let mut iter = self.clusters.iter();
        let (key, cluster) = iter.next().ok_or(ModelError::NoCluster)?;
        if iter.next().is_some() {
            return Err(ModelError::MultipleClusters(
                self.clusters.keys().cloned().collect(),
            ));
        }

        let mut cluster = cluster.clone();
        if cluster.cluster_id.is_empty() {
            cluster.cluster_id = key.clone();
        } else if &cluster.cluster_id != key {
            return Err(ModelError::ClusterIdMismatch {
                key: key.clone(),
                id: cluster.cluster_id,
            });
        }
        if cluster.cluster_id.is_empty() {
            return Err(ModelError::MissingClusterId);
        }
        Ok(cluster)
    }

    /// Store `cluster` under its own identifier, replacing any previous entry.
    pub fn replace_cluster(&mut self, cluster: Cluster) {
        self.clusters.clear();
        self.clusters.insert(cluster.cluster_id.clone(), cluster);
    }

    /// Encode as JSON into `w` (JSON is valid YAML, so children can read it as either).
    pub fn write_json<W: Write>(&self, w: W) -> Result<(), ModelError> {
        serde_json::to_writer_pretty(w, self)?;
        Ok(())
    }
}
