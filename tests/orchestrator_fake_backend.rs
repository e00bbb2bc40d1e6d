// tests/orchestrator_fake_backend.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use watchrun::engine::{
    ChangeReceiver, ChangeSender, ChangeSignal, CycleCommands, CycleState, Orchestrator,
    OrchestratorOptions, join_supersession_watcher, queue, spawn_supersession_watcher,
};
use watchrun_test_utils::fake_backend::{FakeBackend, Journal, PrepScript, Step};
use watchrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

struct Harness {
    journal: Journal,
    queue: ChangeSender,
    shutdown: CancellationToken,
    state: tokio::sync::watch::Receiver<CycleState>,
    task: JoinHandle<watchrun::errors::Result<()>>,
}

/// Start an orchestrator over `backend`. `prefill` is queued before the
/// orchestrator starts consuming.
fn start(
    backend: FakeBackend,
    journal: Journal,
    prep: Option<&str>,
    grace: Duration,
    prefill: &[&str],
) -> Harness {
    init_tracing();
    let (queue, changes) = queue::channel(16);
    for path in prefill {
        queue.requeue(ChangeSignal::new(*path));
    }
    let shutdown = CancellationToken::new();
    let commands = CycleCommands {
        prep: prep.map(str::to_string),
        run: "./app".to_string(),
    };
    let orchestrator = Orchestrator::new(
        backend,
        commands,
        queue.clone(),
        shutdown.clone(),
        OrchestratorOptions {
            grace_period: grace,
        },
    );
    let state = orchestrator.subscribe_state();
    let task = tokio::spawn(orchestrator.run(changes));

    Harness {
        journal,
        queue,
        shutdown,
        state,
        task,
    }
}

fn position(steps: &[Step], step: &Step) -> usize {
    steps
        .iter()
        .position(|s| s == step)
        .unwrap_or_else(|| panic!("{step:?} not found in {steps:?}"))
}

async fn stop(h: Harness) -> Result<Vec<Step>, Box<dyn Error>> {
    h.shutdown.cancel();
    with_timeout(h.task).await??;
    Ok(h.journal.steps())
}

#[tokio::test]
async fn run_command_starts_immediately_and_is_stopped_on_shutdown() -> TestResult {
    let journal = Journal::new();
    let h = start(
        FakeBackend::new(journal.clone()),
        journal.clone(),
        Some("make"),
        Duration::from_millis(500),
        &[],
    );

    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(1)))).await;
    assert_eq!(*h.state.borrow(), CycleState::RunningMain);

    let mut state = h.state.clone();
    let steps = stop(h).await?;
    assert_eq!(
        steps,
        vec![Step::RunStarted(1), Step::Terminated(1), Step::Reaped(1)]
    );
    assert_eq!(*state.borrow_and_update(), CycleState::Idle);
    Ok(())
}

#[tokio::test]
async fn change_runs_prep_then_replaces_the_run_command() -> TestResult {
    let journal = Journal::new();
    let h = start(
        FakeBackend::new(journal.clone()),
        journal.clone(),
        Some("make"),
        Duration::from_millis(500),
        &[],
    );
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(1)))).await;

    h.queue.send(ChangeSignal::new("/proj/main.go")).await?;
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(2)))).await;

    let steps = stop(h).await?;
    // Old instance is stopped only after prep succeeded, right before the new
    // one starts.
    let prep_done = position(&steps, &Step::PrepSucceeded);
    let terminated = position(&steps, &Step::Terminated(1));
    let reaped = position(&steps, &Step::Reaped(1));
    let started = position(&steps, &Step::RunStarted(2));
    assert!(position(&steps, &Step::PrepStarted("make".into())) < prep_done);
    assert!(prep_done < terminated);
    assert!(terminated < reaped);
    assert!(reaped < started);
    Ok(())
}

#[tokio::test]
async fn failed_prep_keeps_the_old_run_command() -> TestResult {
    let journal = Journal::new();
    let backend = FakeBackend::new(journal.clone());
    backend.script_prep(PrepScript::Fail);
    let h = start(
        backend,
        journal.clone(),
        Some("make"),
        Duration::from_millis(500),
        &[],
    );
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(1)))).await;

    h.queue.send(ChangeSignal::new("/proj/main.go")).await?;
    with_timeout(journal.wait_for(|s| s.contains(&Step::PrepFailed))).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(journal.count(|s| matches!(s, Step::Terminated(_))), 0);
    assert_eq!(journal.count(|s| matches!(s, Step::RunStarted(_))), 1);
    assert_eq!(*h.state.borrow(), CycleState::RunningMain);

    // The next change retries the full cycle.
    h.queue.send(ChangeSignal::new("/proj/main.go")).await?;
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(2)))).await;

    stop(h).await?;
    Ok(())
}

#[tokio::test]
async fn change_during_prep_supersedes_the_cycle() -> TestResult {
    let journal = Journal::new();
    let backend = FakeBackend::new(journal.clone());
    let never_released = Arc::new(Notify::new());
    backend.script_prep(PrepScript::Block(never_released));
    backend.script_prep(PrepScript::Succeed);

    let mut h = start(
        backend,
        journal.clone(),
        Some("make"),
        Duration::from_millis(500),
        &[],
    );
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(1)))).await;

    h.queue.send(ChangeSignal::new("/proj/a.go")).await?;
    with_timeout(h.state.wait_for(|s| *s == CycleState::RunningPrep)).await?;

    h.queue.send(ChangeSignal::new("/proj/b.go")).await?;
    let steps = with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(2)))).await;

    assert_eq!(
        steps,
        vec![
            Step::RunStarted(1),
            Step::PrepStarted("make".into()),
            Step::PrepCancelled,
            Step::PrepStarted("make".into()),
            Step::PrepSucceeded,
            Step::Terminated(1),
            Step::Reaped(1),
            Step::RunStarted(2),
        ]
    );

    stop(h).await?;
    Ok(())
}

#[tokio::test]
async fn released_prep_moves_to_running_main() -> TestResult {
    let journal = Journal::new();
    let backend = FakeBackend::new(journal.clone());
    let release = Arc::new(Notify::new());
    backend.script_prep(PrepScript::Block(release.clone()));

    let mut h = start(
        backend,
        journal.clone(),
        Some("make"),
        Duration::from_millis(500),
        &[],
    );
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(1)))).await;

    h.queue.send(ChangeSignal::new("/proj/a.go")).await?;
    with_timeout(h.state.wait_for(|s| *s == CycleState::RunningPrep)).await?;

    release.notify_one();
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(2)))).await;
    with_timeout(h.state.wait_for(|s| *s == CycleState::RunningMain)).await?;

    stop(h).await?;
    Ok(())
}

#[tokio::test]
async fn queued_changes_are_coalesced_into_one_cycle() -> TestResult {
    let journal = Journal::new();
    let h = start(
        FakeBackend::new(journal.clone()),
        journal.clone(),
        None,
        Duration::from_millis(500),
        &["/proj/a.go", "/proj/b.go", "/proj/c.go"],
    );

    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(2)))).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(journal.count(|s| matches!(s, Step::RunStarted(_))), 2);

    stop(h).await?;
    Ok(())
}

#[tokio::test]
async fn run_command_ignoring_terminate_is_killed_after_grace() -> TestResult {
    let journal = Journal::new();
    let h = start(
        FakeBackend::new(journal.clone()).ignoring_terminate(),
        journal.clone(),
        None,
        Duration::from_millis(50),
        &[],
    );
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(1)))).await;

    let steps = stop(h).await?;
    assert_eq!(
        steps,
        vec![
            Step::RunStarted(1),
            Step::Terminated(1),
            Step::Killed(1),
            Step::Reaped(1),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn queue_is_closed_after_shutdown() -> TestResult {
    let journal = Journal::new();
    let h = start(
        FakeBackend::new(journal.clone()),
        journal.clone(),
        None,
        Duration::from_millis(500),
        &[],
    );
    with_timeout(journal.wait_for(|s| s.contains(&Step::RunStarted(1)))).await;

    let queue = h.queue.clone();
    stop(h).await?;

    assert!(queue.is_closed());
    assert!(queue.send(ChangeSignal::new("/proj/late.go")).await.is_err());
    Ok(())
}

#[tokio::test]
async fn finished_supersession_watcher_hands_the_receiver_back() -> TestResult {
    init_tracing();
    let (queue, changes) = queue::channel(4);
    let cycle = CancellationToken::new();
    let watcher = spawn_supersession_watcher(changes, queue.clone(), cycle.clone());

    queue.send(ChangeSignal::new("/proj/a.go")).await?;
    let mut changes = with_timeout(join_supersession_watcher(watcher))
        .await
        .ok_or("watcher should return the receiver")?;

    assert!(cycle.is_cancelled());
    assert_eq!(changes.try_recv()?, ChangeSignal::new("/proj/a.go"));
    Ok(())
}

#[tokio::test]
async fn panicked_supersession_watcher_closes_the_queue() {
    init_tracing();
    let (queue, changes) = queue::channel(4);
    let watcher: JoinHandle<ChangeReceiver> = tokio::spawn(async move {
        let _held = changes;
        panic!("supersession watcher blew up");
    });

    assert!(with_timeout(join_supersession_watcher(watcher)).await.is_none());
    assert!(queue.is_closed());
}

#[tokio::test]
async fn aborted_supersession_watcher_closes_the_queue() {
    init_tracing();
    let (queue, changes) = queue::channel(4);
    let watcher = tokio::spawn(async move {
        std::future::pending::<()>().await;
        changes
    });
    watcher.abort();

    assert!(with_timeout(join_supersession_watcher(watcher)).await.is_none());
    assert!(queue.is_closed());
}
