//! Crash-recovery tests: the engine over a real SQLite checkpoint store,
//! with a process restart simulated by rebuilding every in-memory structure
//! over the same database file.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use handrail_core::workflow::engine::WorkflowEngine;
use handrail_core::workflow::registry::{
    BoxStepHandler, DefinitionRegistry, StepHandler, WorkflowDefinitionBuilder,
};
use handrail_infra::sqlite::checkpoint::SqliteCheckpointRepository;
use handrail_infra::sqlite::pool::DatabasePool;
use handrail_types::error::StepError;
use handrail_types::workflow::WorkflowStatus;

/// Counts invocations so recovery can prove no step re-ran.
struct CountingHandler {
    output: &'static str,
    calls: Arc<AtomicUsize>,
}

impl StepHandler for CountingHandler {
    async fn invoke(&self, payload: &str) -> Result<String, StepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}({payload})", self.output))
    }
}

fn build_engine(
    pool: DatabasePool,
) -> (WorkflowEngine<SqliteCheckpointRepository>, Vec<Arc<AtomicUsize>>) {
    let counters: Vec<Arc<AtomicUsize>> =
        (0..2).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    let definition = WorkflowDefinitionBuilder::new("recruiting")
        .step(
            "draft_description",
            "proceed?",
            BoxStepHandler::new(CountingHandler {
                output: "jd",
                calls: counters[0].clone(),
            }),
        )
        .step(
            "match_candidates",
            "send?",
            BoxStepHandler::new(CountingHandler {
                output: "match",
                calls: counters[1].clone(),
            }),
        )
        .build()
        .unwrap();

    let mut definitions = DefinitionRegistry::new();
    definitions.register(definition).unwrap();

    let engine = WorkflowEngine::new(
        Arc::new(definitions),
        SqliteCheckpointRepository::new(pool),
    );
    (engine, counters)
}

#[tokio::test]
async fn recover_after_restart_reproduces_suspended_state() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

    // First "process": start a workflow, then drop everything.
    let before = {
        let pool = DatabasePool::new(&url).await.unwrap();
        let (engine, counters) = build_engine(pool);
        let instance = engine.start("s1", "recruiting", "x").await.unwrap();
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
        instance
    };

    // Second "process": same database file, fresh pools and handlers.
    let pool = DatabasePool::new(&url).await.unwrap();
    let (engine, counters) = build_engine(pool);

    let recovered = engine.recover("s1").await.unwrap();
    assert_eq!(recovered.instance_id, before.instance_id);
    assert_eq!(recovered.current_step_index, 1);
    assert_eq!(recovered.step_outputs, vec!["jd(x)".to_string()]);
    assert_eq!(recovered.pending_request, before.pending_request);
    assert_eq!(recovered.status, WorkflowStatus::AwaitingInput);

    // Recovery is idempotent: no handler ran.
    assert_eq!(counters[0].load(Ordering::SeqCst), 0);
    assert_eq!(counters[1].load(Ordering::SeqCst), 0);

    // The revived engine resumes exactly where the old one paused.
    let finished = engine.resume("s1", "proceed").await.unwrap();
    assert_eq!(finished.status, WorkflowStatus::Completed);
    assert_eq!(
        finished.step_outputs,
        vec!["jd(x)".to_string(), "match(jd(x))".to_string()]
    );
    assert_eq!(counters[1].load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn startup_sweep_lists_only_suspended_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

    {
        let pool = DatabasePool::new(&url).await.unwrap();
        let (engine, _) = build_engine(pool);
        engine.start("s1", "recruiting", "x").await.unwrap();
        engine.start("s2", "recruiting", "y").await.unwrap();
        engine.resume("s2", "proceed").await.unwrap(); // s2 completes
        engine.start("s3", "recruiting", "z").await.unwrap();
        engine.resume("s3", "cancel").await.unwrap(); // s3 abandoned
    }

    let pool = DatabasePool::new(&url).await.unwrap();
    let (engine, _) = build_engine(pool);

    let awaiting = engine.list_awaiting().await.unwrap();
    assert_eq!(awaiting.len(), 1);
    assert_eq!(awaiting[0].session_id, "s1");
}
