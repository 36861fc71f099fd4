use std::time::Duration;

/// Path every service serves its health document on.
pub const HEALTH_PATH: &str = "/_health/ping";

#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Bearer token sent with every request (the cluster's management token).
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Accept self-signed certificates.
    pub insecure: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            timeout: Duration::from_secs(5),
            insecure: false,
        }
    }
}
