use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use boot_core::{BootContext, BootError, Fail, SupervisorConfig, Task, TaskGraph, TaskRef, schedule};
use boot_exec::ProcRunner;
use boot_model::{Cluster, Environ};
use tokio_util::sync::CancellationToken;

type Log = Arc<Mutex<Vec<String>>>;

enum Outcome {
    Ok,
    Fail,
    FailLater,
}

struct Step {
    name: &'static str,
    deps: Vec<TaskRef>,
    max_delay_ms: u64,
    outcome: Outcome,
    log: Log,
}

#[async_trait]
impl Task for Step {
    fn name(&self) -> String {
        self.name.to_string()
    }

    fn depends(&self) -> Vec<TaskRef> {
        self.deps.clone()
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        fail: Fail,
        ctx: Arc<BootContext>,
    ) -> Result<(), BootError> {
        ctx.wait_for(&cancel, &self.deps).await?;
        self.log.lock().unwrap().push(format!("begin {}", self.name));
        if self.max_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(fastrand::u64(0..self.max_delay_ms))).await;
        }
        match self.outcome {
            Outcome::Ok => {}
            Outcome::Fail => return Err(BootError::Config(format!("{} broke", self.name))),
            Outcome::FailLater => {
                let name = self.name;
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    fail.report(BootError::Exited(name.to_string()));
                });
            }
        }
        self.log.lock().unwrap().push(format!("end {}", self.name));
        Ok(())
    }
}

fn step(name: &'static str, deps: Vec<TaskRef>, delay: u64, outcome: Outcome, log: &Log) -> TaskRef {
    Arc::new(Step {
        name,
        deps,
        max_delay_ms: delay,
        outcome,
        log: log.clone(),
    })
}

fn context(graph: &TaskGraph, cancel: &CancellationToken) -> Arc<BootContext> {
    Arc::new(BootContext::new(
        SupervisorConfig::default(),
        Cluster::default(),
        std::env::temp_dir(),
        ProcRunner::new(Environ::from_host()),
        graph,
        cancel.clone(),
    ))
}

fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|e| e == entry)
        .unwrap_or_else(|| panic!("{entry} missing from {log:?}"))
}

async fn shutdown(ctx: &BootContext) {
    ctx.cancel_token().cancel();
    ctx.tracker().close();
    ctx.tracker().wait().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dependents_wait_for_their_dependencies() {
    for _ in 0..25 {
        let log: Log = Log::default();
        let a = step("a", vec![], 15, Outcome::Ok, &log);
        let b = step("b", vec![a.clone()], 15, Outcome::Ok, &log);
        let c = step("c", vec![a.clone(), b.clone()], 15, Outcome::Ok, &log);
        // Listed dependents-first on purpose.
        let graph = TaskGraph::new(vec![c, b, a]).unwrap();
        let cancel = CancellationToken::new();
        let ctx = context(&graph, &cancel);

        schedule(ctx.clone(), &graph).await.unwrap();

        let log = log.lock().unwrap().clone();
        assert!(position(&log, "end a") < position(&log, "begin b"), "{log:?}");
        assert!(position(&log, "end b") < position(&log, "begin c"), "{log:?}");
        for name in ["a", "b", "c"] {
            assert!(ctx.ready().is_ready(name));
        }
        assert!(ctx.take_failure().is_none());
        shutdown(&ctx).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_dependency_never_unblocks_dependents() {
    let log: Log = Log::default();
    let a = step("a", vec![], 20, Outcome::Fail, &log);
    let b = step("b", vec![a.clone()], 0, Outcome::Ok, &log);
    let other = step("other", vec![], 0, Outcome::Ok, &log);
    let graph = TaskGraph::new(vec![a, b, other]).unwrap();
    let cancel = CancellationToken::new();
    let ctx = context(&graph, &cancel);

    let err = tokio::time::timeout(Duration::from_secs(5), schedule(ctx.clone(), &graph))
        .await
        .expect("schedule hung after a failure")
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(cancel.is_cancelled());

    shutdown(&ctx).await;
    let log = log.lock().unwrap().clone();
    assert!(!log.iter().any(|e| e == "begin b"), "{log:?}");
    assert!(!ctx.ready().is_ready("a"));
    assert!(!ctx.ready().is_ready("b"));

    match ctx.take_failure() {
        Some(BootError::TaskFailed { task, source }) => {
            assert_eq!(task, "a");
            assert_eq!(source.to_string(), "a broke");
        }
        other => panic!("unexpected failure record {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_failure_cancels_a_running_boot() {
    let log: Log = Log::default();
    let svc = step("svc", vec![], 0, Outcome::FailLater, &log);
    let graph = TaskGraph::new(vec![svc]).unwrap();
    let cancel = CancellationToken::new();
    let ctx = context(&graph, &cancel);

    schedule(ctx.clone(), &graph).await.unwrap();
    assert!(ctx.ready().is_ready("svc"));

    tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
        .await
        .expect("failure did not cancel");
    assert!(matches!(
        ctx.take_failure(),
        Some(BootError::TaskFailed { task, .. }) if task == "svc"
    ));
    // Only the first failure is kept.
    assert!(ctx.take_failure().is_none());
    shutdown(&ctx).await;
}

#[tokio::test]
async fn failures_after_cancel_are_ignored() {
    let graph = TaskGraph::new(vec![]).unwrap();
    let cancel = CancellationToken::new();
    let ctx = context(&graph, &cancel);
    cancel.cancel();
    ctx.fail_task("late", BootError::Cancelled);
    assert!(ctx.take_failure().is_none());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_service_exit_is_a_failure() {
    use boot_exec::ProcSpec;

    let graph = TaskGraph::new(vec![]).unwrap();
    let cancel = CancellationToken::new();
    let ctx = context(&graph, &cancel);
    let fail = {
        let ctx = ctx.clone();
        Fail::new(move |err| ctx.fail_task("svc", err))
    };

    ctx.spawn_background(
        "svc".to_string(),
        cancel.clone(),
        fail,
        ProcSpec::new("sh").args(["-c", "exit 0"]),
    );
    tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
        .await
        .expect("exit was not reported");
    match ctx.take_failure() {
        Some(BootError::TaskFailed { source, .. }) => {
            assert!(matches!(*source, BootError::Exited(ref n) if n == "svc"))
        }
        other => panic!("unexpected failure record {other:?}"),
    }
    shutdown(&ctx).await;
}
