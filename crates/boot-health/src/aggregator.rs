use std::collections::BTreeMap;

use boot_model::Cluster;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::trace;

use crate::{HEALTH_OK, HEALTH_PATH, HealthConfig, HealthError};

/// One endpoint to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthTarget {
    /// Check key, e.g. `Keepstore+http://localhost:9001/_health/ping`.
    pub name: String,
    pub url: String,
}

impl HealthTarget {
    pub fn new(service: &str, base: &str) -> Self {
        let url = format!("{}{HEALTH_PATH}", base.trim_end_matches('/'));
        Self {
            name: format!("{service}+{url}"),
            url,
        }
    }
}

/// Result of polling one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub health: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
}

impl CheckResult {
    fn error(msg: impl Into<String>, code: Option<u16>) -> Self {
        Self {
            health: "ERROR".to_string(),
            error: Some(msg.into()),
            http_status_code: code,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.health == HEALTH_OK
    }
}

/// Aggregated status keyed by check name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub health: String,
    pub checks: BTreeMap<String, CheckResult>,
}

impl ClusterHealth {
    /// Names of checks that are not OK, sorted.
    pub fn failing(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, c)| !c.is_ok())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Deserialize)]
struct PingResponse {
    health: String,
    #[serde(default)]
    error: Option<String>,
}

pub struct HealthAggregator {
    client: reqwest::Client,
    token: String,
    targets: Vec<HealthTarget>,
}

impl HealthAggregator {
    pub fn new(cfg: &HealthConfig, targets: Vec<HealthTarget>) -> Result<Self, HealthError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .danger_accept_invalid_certs(cfg.insecure)
            .build()?;
        Ok(Self {
            client,
            token: cfg.token.clone(),
            targets,
        })
    }

    /// One target per internal URL of every configured service, authenticated with the
    /// cluster's management token.
    pub fn for_cluster(cluster: &Cluster) -> Result<Self, HealthError> {
        let targets = cluster
            .services
            .configured()
            .flat_map(|(kind, svc)| {
                svc.internal_urls
                    .keys()
                    .map(move |url| HealthTarget::new(kind.as_str(), &url.to_string()))
            })
            .collect();
        let cfg = HealthConfig {
            token: cluster.management_token.clone(),
            insecure: cluster.tls.insecure,
            ..Default::default()
        };
        Self::new(&cfg, targets)
    }

    pub fn targets(&self) -> &[HealthTarget] {
        &self.targets
    }

    /// Poll every target concurrently.
    pub async fn cluster_health(&self) -> ClusterHealth {
        let mut set = JoinSet::new();
        for target in &self.targets {
            let client = self.client.clone();
            let token = self.token.clone();
            let target = target.clone();
            set.spawn(async move {
                let result = ping(&client, &token, &target.url).await;
                (target.name, result)
            });
        }

        let mut checks = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            if let Ok((name, result)) = joined {
                checks.insert(name, result);
            }
        }
        for target in &self.targets {
            checks
                .entry(target.name.clone())
                .or_insert_with(|| CheckResult::error("check panicked", None));
        }

        let health = if checks.values().all(CheckResult::is_ok) {
            HEALTH_OK
        } else {
            "ERROR"
        };
        ClusterHealth {
            health: health.to_string(),
            checks,
        }
    }
}

async fn ping(client: &reqwest::Client, token: &str, url: &str) -> CheckResult {
    let resp = match client.get(url).bearer_auth(token).send().await {
        Ok(resp) => resp,
        Err(e) => return CheckResult::error(e.to_string(), None),
    };
    let code = resp.status().as_u16();
    if !resp.status().is_success() {
        return CheckResult::error(format!("HTTP {code}"), Some(code));
    }
    match resp.json::<PingResponse>().await {
        Ok(body) => {
            trace!(target: "boot.health", url, health = %body.health, "ping");
            CheckResult {
                health: body.health,
                error: body.error,
                http_status_code: Some(code),
            }
        }
        Err(e) => CheckResult::error(format!("bad response: {e}"), Some(code)),
    }
}
