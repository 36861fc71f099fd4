use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
};
use boot_health::{HealthAggregator, HealthConfig, HealthError, HealthTarget};
use boot_model::{Cluster, ServiceInstance, ServiceUrl};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const TOKEN: &str = "mgmt-token";

/// Serves `/_health/ping`, reporting OK only from the `ok_after`-th request on.
async fn fake_service(ok_after: usize) -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));

    async fn ping(
        State((hits, ok_after)): State<(Arc<AtomicUsize>, usize)>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if auth != format!("Bearer {TOKEN}") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
        }
        let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= ok_after {
            (StatusCode::OK, Json(json!({"health": "OK"})))
        } else {
            (StatusCode::OK, Json(json!({"health": "ERROR", "error": "warming up"})))
        }
    }

    let app = Router::new()
        .route("/_health/ping", get(ping))
        .with_state((Arc::clone(&hits), ok_after));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

fn cfg(token: &str) -> HealthConfig {
    HealthConfig {
        token: token.to_string(),
        timeout: Duration::from_secs(2),
        insecure: false,
    }
}

#[tokio::test]
async fn reports_per_check_status() {
    let (ok, _) = fake_service(1).await;
    let (warming, _) = fake_service(100).await;

    let agg = HealthAggregator::new(
        &cfg(TOKEN),
        vec![
            HealthTarget::new("Keepstore", &format!("http://{ok}")),
            HealthTarget::new("Controller", &format!("http://{warming}/")),
        ],
    )
    .unwrap();

    let health = agg.cluster_health().await;
    assert_eq!(health.health, "ERROR");
    assert_eq!(health.checks.len(), 2);

    let ok_key = format!("Keepstore+http://{ok}/_health/ping");
    let warming_key = format!("Controller+http://{warming}/_health/ping");
    assert!(health.checks[&ok_key].is_ok());
    assert_eq!(health.checks[&warming_key].error.as_deref(), Some("warming up"));
    assert_eq!(health.failing(), [warming_key.as_str()]);
}

#[tokio::test]
async fn wrong_token_and_unreachable_targets_fail() {
    let (addr, _) = fake_service(1).await;
    let agg = HealthAggregator::new(
        &cfg("wrong"),
        vec![
            HealthTarget::new("Keepstore", &format!("http://{addr}")),
            HealthTarget::new("Websocket", "http://127.0.0.1:1"),
        ],
    )
    .unwrap();

    let health = agg.cluster_health().await;
    let ks = &health.checks[&format!("Keepstore+http://{addr}/_health/ping")];
    assert_eq!(ks.http_status_code, Some(401));
    assert!(!ks.is_ok());
    let ws = &health.checks["Websocket+http://127.0.0.1:1/_health/ping"];
    assert!(ws.error.is_some());
    assert_eq!(ws.http_status_code, None);
}

#[tokio::test]
async fn wait_all_ok_polls_until_every_check_passes() {
    let (a, a_hits) = fake_service(3).await;
    let (b, _) = fake_service(1).await;
    let agg = HealthAggregator::new(
        &cfg(TOKEN),
        vec![
            HealthTarget::new("A", &format!("http://{a}")),
            HealthTarget::new("B", &format!("http://{b}")),
        ],
    )
    .unwrap();

    let cancel = CancellationToken::new();
    tokio::time::timeout(
        Duration::from_secs(5),
        agg.wait_all_ok(&cancel, Duration::from_millis(20)),
    )
    .await
    .expect("checks pass in time")
    .unwrap();

    assert_eq!(a_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn wait_all_ok_stops_on_cancel() {
    let (addr, _) = fake_service(usize::MAX).await;
    let agg = HealthAggregator::new(
        &cfg(TOKEN),
        vec![HealthTarget::new("Never", &format!("http://{addr}"))],
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = agg
        .wait_all_ok(&cancel, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, HealthError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn for_cluster_targets_every_internal_url() {
    let mut cluster = Cluster {
        management_token: TOKEN.to_string(),
        ..Default::default()
    };
    for port in ["9001", "9002"] {
        cluster.services.keepstore.internal_urls.insert(
            ServiceUrl::new("http", format!("localhost:{port}")),
            ServiceInstance::default(),
        );
    }
    cluster.services.controller.internal_urls.insert(
        ServiceUrl::new("http", "localhost:9000"),
        ServiceInstance::default(),
    );

    let agg = HealthAggregator::for_cluster(&cluster).unwrap();
    let names: Vec<_> = agg.targets().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Controller+http://localhost:9000/_health/ping",
            "Keepstore+http://localhost:9001/_health/ping",
            "Keepstore+http://localhost:9002/_health/ping",
        ]
    );
}
