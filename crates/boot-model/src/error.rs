use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("config has no clusters")]
    NoCluster,
    #[error("config has multiple clusters: {0:?}")]
    MultipleClusters(Vec<String>),
    #[error("cluster identifier is empty")]
    MissingClusterId,
    #[error("cluster key {key:?} does not match ClusterID {id:?}")]
    ClusterIdMismatch { key: String, id: String },
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid address {addr:?}: {reason}")]
    InvalidAddress { addr: String, reason: &'static str },
    #[error("unknown cluster type: {0:?} (expected: production|development|test)")]
    UnknownClusterType(String),
    #[error("service has no external URL")]
    NoExternalUrl,
    #[error("service has no internal URLs")]
    NoInternalUrl,
    #[error("service has {0} internal URLs; expected exactly one")]
    MultipleInternalUrls(usize),
}
