use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use tokio::{runtime::Handle, time::Instant};

use solo_core::{
    Admission, CoreError, HandshakeError, ProvisionContext, Provisioner, SkipReason,
    inventory::{InventoryHandle, NodeInventory},
    queue::{AdmissionQueue, EntryState, MemoryQueue},
    retention::{RetentionDecision, TaskResult},
};
use solo_model::{
    AffinityLabel, ConnectionState, FailureAction, LabelBinding, LabelExpr, ProvisionConfig,
};
use solo_testkit::{ConflictingInventory, FakeLauncher, RecordingMetrics, Script, StaticProbe, auto_connect};

struct Harness {
    provisioner: Arc<Provisioner>,
    queue: Arc<MemoryQueue>,
    launcher: FakeLauncher,
    metrics: Arc<RecordingMetrics>,
}

fn config() -> ProvisionConfig {
    ProvisionConfig {
        ready_timeout_ms: 10_000,
        poll_interval_ms: 1_000,
        ..ProvisionConfig::default()
    }
}

fn harness_with(
    cfg: ProvisionConfig,
    launcher: FakeLauncher,
    queue: MemoryQueue,
    probe: Option<StaticProbe>,
    inventory: Option<InventoryHandle>,
) -> Harness {
    let queue = Arc::new(queue);
    let metrics = Arc::new(RecordingMetrics::new());

    let mut builder = Provisioner::builder(cfg)
        .with_queue(queue.clone())
        .with_launcher(Arc::new(launcher.clone()))
        .with_context(ProvisionContext::default().with_metrics(metrics.clone()));
    if let Some(probe) = probe {
        builder = builder.with_probe(Arc::new(probe));
    }
    if let Some(inventory) = inventory {
        builder = builder.with_inventory(inventory);
    }

    Harness {
        provisioner: Arc::new(builder.build(Handle::current()).unwrap()),
        queue,
        launcher,
        metrics,
    }
}

fn harness(cfg: ProvisionConfig, launcher: FakeLauncher) -> Harness {
    harness_with(cfg, launcher, MemoryQueue::new(), None, None)
}

fn docker() -> Option<LabelExpr> {
    Some(LabelExpr::parse("docker").unwrap())
}

async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(60);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn settle<F: Future>(f: F) -> F::Output {
    let out = f.await;
    tokio::task::yield_now().await;
    out
}

fn admitted_label(admission: Admission) -> AffinityLabel {
    match admission {
        Admission::Provisioning { label } => label,
        other => panic!("expected provisioning, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn admitted_task_is_bound_and_worker_registered_in_the_same_call() {
    let h = harness(config(), FakeLauncher::new());
    let item = h.queue.push("build", docker());

    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    assert_eq!(label.prefix(), "docker");

    let entry = h.queue.get(item.id).unwrap();
    let binding = entry.item.binding.clone().unwrap();
    assert_eq!(binding.label(), &label);
    assert_eq!(entry.item.effective_label().unwrap(), label.as_expr());

    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();
    assert_eq!(worker.item(), item.id);
    assert_eq!(worker.state(), ConnectionState::Pending);
    assert_eq!(worker.executors(), 1);
    assert!(binding.permits(&worker.labels()));

    // the matcher refuses every other worker for this task
    let mut stranger = item.clone();
    stranger.binding = Some(LabelBinding::new(AffinityLabel::mint("docker").unwrap()));
    h.provisioner.supervisor().handshake(worker.name(), worker.secret()).unwrap();
    assert!(worker.can_run(&entry.item));
    assert!(!worker.can_run(&stranger));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admissions_get_distinct_labels_and_workers() {
    const N: usize = 32;
    let h = harness(config(), FakeLauncher::new());
    let connector = auto_connect(h.provisioner.clone(), &h.launcher, Duration::from_millis(5));

    let items: Vec<_> = (0..N).map(|i| h.queue.push(format!("t{i}"), docker())).collect();
    let calls: Vec<_> = items
        .into_iter()
        .map(|item| {
            let provisioner = h.provisioner.clone();
            tokio::task::spawn_blocking(move || provisioner.listener().on_buildable(&item))
        })
        .collect();

    let mut labels = HashSet::new();
    for call in calls {
        labels.insert(admitted_label(call.await.unwrap().unwrap()));
    }
    assert_eq!(labels.len(), N);

    eventually("all workers online", || {
        h.metrics.count("provision_completed:online") == N as u64
    })
    .await;

    let inventory = h.provisioner.inventory();
    assert_eq!(inventory.len(), N);
    for label in &labels {
        let worker = inventory.find_by_label(label).unwrap();
        assert!(worker.is_online());
    }
    let names: HashSet<_> = inventory.list().iter().map(|w| w.name().to_string()).collect();
    assert_eq!(names.len(), N);
    connector.abort();
}

#[tokio::test(start_paused = true)]
async fn launch_failure_terminates_deregisters_and_cancels_the_task() {
    let h = harness(config(), FakeLauncher::refusing("docker daemon unavailable"));
    let item = h.queue.push("build", docker());

    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();

    eventually("launch failure", || {
        h.metrics.count("provision_error:launch_failure") == 1
    })
    .await;

    assert_eq!(worker.state(), ConnectionState::Terminated);
    assert!(h.provisioner.inventory().is_empty());
    assert!(h.provisioner.affinity().is_empty());
    assert_eq!(h.metrics.count("teardown:provision_failed"), 1);

    let entry = h.queue.get(item.id).unwrap();
    assert!(matches!(entry.state, EntryState::Cancelled { .. }));
    assert!(entry.last_reason.unwrap().contains("launch_failure"));
}

#[tokio::test(start_paused = true)]
async fn requeue_gives_a_fresh_label_until_the_budget_runs_out() {
    let cfg = ProvisionConfig {
        on_failure: FailureAction::Requeue,
        max_requeues: 1,
        ..config()
    };
    let (queue, mut requeued) = MemoryQueue::with_requeue_channel();
    let h = harness_with(cfg, FakeLauncher::refusing("no capacity"), queue, None, None);
    let item = h.queue.push("build", docker());

    let first = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());

    let again = requeued.recv().await.unwrap();
    assert_eq!(again.id, item.id);
    assert_eq!(again.requeues, 1);
    assert!(again.binding.is_none());

    let second = admitted_label(h.provisioner.listener().on_buildable(&again).unwrap());
    assert_ne!(first, second);

    eventually("task cancelled", || {
        matches!(
            h.queue.get(item.id).map(|e| e.state),
            Some(EntryState::Cancelled { .. })
        )
    })
    .await;
    assert!(requeued.try_recv().is_err());
    assert_eq!(h.launcher.launched().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn requeued_task_comes_online_on_second_attempt() {
    let cfg = ProvisionConfig {
        on_failure: FailureAction::Requeue,
        ..config()
    };
    let launcher = FakeLauncher::new().script([Script::Refuse("flaky".into())]);
    let (queue, mut requeued) = MemoryQueue::with_requeue_channel();
    let h = harness_with(cfg, launcher, queue, None, None);
    let connector = auto_connect(h.provisioner.clone(), &h.launcher, Duration::from_millis(500));
    let item = h.queue.push("build", docker());

    h.provisioner.listener().on_buildable(&item).unwrap();
    let again = requeued.recv().await.unwrap();
    let label = admitted_label(h.provisioner.listener().on_buildable(&again).unwrap());

    eventually("worker online", || {
        h.metrics.count("provision_completed:online") == 1
    })
    .await;
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();
    assert!(worker.is_online());
    assert!(h.queue.is_pending(item.id));
    connector.abort();
}

#[tokio::test(start_paused = true)]
async fn worker_online_after_three_seconds_is_observed_within_one_poll_interval() {
    let cfg = config();
    let poll = cfg.poll_interval();
    let h = harness(cfg, FakeLauncher::new());
    let connector = auto_connect(h.provisioner.clone(), &h.launcher, Duration::from_secs(3));
    let item = h.queue.push("build", docker());

    let started = Instant::now();
    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());

    eventually("worker online", || {
        h.metrics.count("provision_completed:online") == 1
    })
    .await;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3) + poll, "{elapsed:?}");

    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();
    assert!(worker.is_online());
    assert_eq!(h.provisioner.in_flight(), 0);
    connector.abort();
}

#[tokio::test(start_paused = true)]
async fn ready_timeout_releases_backing_and_cancels() {
    let cfg = ProvisionConfig {
        ready_timeout_ms: 5_000,
        ..config()
    };
    let h = harness(cfg, FakeLauncher::new());
    let item = h.queue.push("build", docker());

    let started = Instant::now();
    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();

    eventually("ready timeout", || {
        h.metrics.count("provision_error:ready_timeout") == 1
    })
    .await;
    assert!(started.elapsed() >= Duration::from_secs(5));

    assert_eq!(worker.state(), ConnectionState::Terminated);
    assert_eq!(h.launcher.released(), vec![worker.name().to_string()]);
    assert!(h.provisioner.inventory().is_empty());
    assert!(!h.queue.is_pending(item.id));
    assert_eq!(h.metrics.count("provision_completed:timeout"), 1);
}

#[tokio::test(start_paused = true)]
async fn backing_exit_before_connect_is_a_launch_failure() {
    let launcher = FakeLauncher::new().script([Script::ExitEarly(Some(127))]);
    let h = harness(config(), launcher);
    let item = h.queue.push("build", docker());

    h.provisioner.listener().on_buildable(&item).unwrap();

    eventually("launch failure", || {
        h.metrics.count("provision_error:launch_failure") == 1
    })
    .await;
    assert!(h.provisioner.inventory().is_empty());
    assert!(matches!(
        h.queue.get(item.id).unwrap().state,
        EntryState::Cancelled { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn non_matching_tasks_are_a_no_op() {
    let h = harness(config(), FakeLauncher::new());
    let listener = h.provisioner.listener();

    let linux = h.queue.push("a", Some(LabelExpr::parse("linux").unwrap()));
    let both = h.queue.push("b", Some(LabelExpr::parse("docker && windows").unwrap()));
    let none = h.queue.push("c", None);
    let mut bound = h.queue.push("d", docker());
    bound.binding = Some(LabelBinding::new(AffinityLabel::mint("docker").unwrap()));

    assert_eq!(
        listener.on_buildable(&linux).unwrap(),
        Admission::Skipped(SkipReason::NotOnDemand)
    );
    assert_eq!(
        listener.on_buildable(&both).unwrap(),
        Admission::Skipped(SkipReason::NotOnDemand)
    );
    assert_eq!(
        listener.on_buildable(&none).unwrap(),
        Admission::Skipped(SkipReason::NoLabel)
    );
    assert_eq!(
        listener.on_buildable(&bound).unwrap(),
        Admission::Skipped(SkipReason::AlreadyBound)
    );

    settle(tokio::time::sleep(Duration::from_secs(5))).await;
    assert!(h.provisioner.inventory().is_empty());
    assert!(h.provisioner.affinity().is_empty());
    assert!(h.launcher.launched().is_empty());
    assert_eq!(h.provisioner.in_flight(), 0);
    for entry in h.queue.list() {
        assert!(entry.item.binding.is_none());
        assert_eq!(entry.state, EntryState::Pending);
    }
    assert_eq!(h.metrics.count("admission:skipped"), 4);
}

#[tokio::test(start_paused = true)]
async fn vanished_queue_item_abandons_the_wait_and_leaves_queue_alone() {
    let h = harness(config(), FakeLauncher::new());
    let item = h.queue.push("build", docker());

    h.provisioner.listener().on_buildable(&item).unwrap();
    h.queue.remove(item.id);

    eventually("item gone", || {
        h.metrics.count("provision_error:cancelled_item_gone") == 1
    })
    .await;
    assert!(h.provisioner.inventory().is_empty());
    assert!(h.queue.get(item.id).is_none());
    assert_eq!(h.launcher.released().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn probe_marks_worker_online() {
    let probe = StaticProbe::new(false);
    let h = harness_with(config(), FakeLauncher::new(), MemoryQueue::new(), Some(probe.clone()), None);
    let item = h.queue.push("build", docker());

    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    settle(tokio::time::sleep(Duration::from_secs(2))).await;
    assert_eq!(h.metrics.count("provision_completed:online"), 0);

    probe.set(true);
    eventually("worker online", || {
        h.metrics.count("provision_completed:online") == 1
    })
    .await;
    assert!(
        h.provisioner
            .inventory()
            .find_by_label(&label)
            .unwrap()
            .is_online()
    );
}

#[tokio::test(start_paused = true)]
async fn name_conflicts_are_retried_with_fresh_names() {
    let inventory: InventoryHandle = Arc::new(ConflictingInventory::new(2));
    let h = harness_with(config(), FakeLauncher::new(), MemoryQueue::new(), None, Some(inventory));
    let item = h.queue.push("build", docker());

    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    assert!(h.provisioner.inventory().find_by_label(&label).is_some());
}

#[tokio::test(start_paused = true)]
async fn exhausted_name_retries_are_a_registration_conflict() {
    let inventory: InventoryHandle = Arc::new(ConflictingInventory::new(10));
    let h = harness_with(config(), FakeLauncher::new(), MemoryQueue::new(), None, Some(inventory));
    let item = h.queue.push("build", docker());

    h.provisioner.listener().on_buildable(&item).unwrap();

    eventually("registration conflict", || {
        h.metrics.count("provision_error:registration_conflict") == 1
    })
    .await;
    assert!(h.launcher.launched().is_empty());
    assert!(h.provisioner.affinity().is_empty());
    assert!(!h.queue.is_pending(item.id));
}

#[tokio::test(start_paused = true)]
async fn single_task_completion_tears_the_worker_down() {
    let h = harness(config(), FakeLauncher::new());
    let connector = auto_connect(h.provisioner.clone(), &h.launcher, Duration::from_millis(100));
    let item = h.queue.push("build", docker());

    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    eventually("worker online", || {
        h.metrics.count("provision_completed:online") == 1
    })
    .await;
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();

    let decision = h
        .provisioner
        .retention()
        .task_completed(worker.name(), TaskResult::Failure)
        .await
        .unwrap();
    assert_eq!(decision, RetentionDecision::Terminate);
    assert_eq!(worker.state(), ConnectionState::Terminated);
    assert!(h.provisioner.inventory().is_empty());
    assert!(!h.provisioner.affinity().is_live(&label));
    assert_eq!(h.launcher.released(), vec![worker.name().to_string()]);
    assert_eq!(h.metrics.count("teardown:retention"), 1);

    let again = h
        .provisioner
        .retention()
        .task_completed(worker.name(), TaskResult::Success)
        .await;
    assert!(matches!(again, Err(CoreError::UnknownWorker(_))));
    connector.abort();
}

#[tokio::test(start_paused = true)]
async fn completion_on_pending_worker_is_rejected() {
    let h = harness(config(), FakeLauncher::new());
    let item = h.queue.push("build", docker());
    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();

    let res = h
        .provisioner
        .retention()
        .task_completed(worker.name(), TaskResult::Success)
        .await;
    assert!(matches!(res, Err(CoreError::WorkerNotOnline { .. })));
}

#[tokio::test(start_paused = true)]
async fn handshake_validates_identity_and_state() {
    let h = harness(config(), FakeLauncher::new());
    let item = h.queue.push("build", docker());
    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();
    let supervisor = h.provisioner.supervisor();

    assert_eq!(
        supervisor.handshake("nope", worker.secret()).unwrap_err(),
        HandshakeError::UnknownWorker("nope".into())
    );
    assert!(matches!(
        supervisor.handshake(worker.name(), "wrong").unwrap_err(),
        HandshakeError::BadSecret(_)
    ));
    supervisor.handshake(worker.name(), worker.secret()).unwrap();
    assert!(matches!(
        supervisor.handshake(worker.name(), worker.secret()).unwrap_err(),
        HandshakeError::NotPending {
            state: ConnectionState::Online,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn state_only_moves_forward() {
    let h = harness(config(), FakeLauncher::new());
    let item = h.queue.push("build", docker());
    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();

    let mut rx = worker.subscribe();
    let mut seen = vec![*rx.borrow_and_update()];
    let observer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            seen.push(*rx.borrow_and_update());
        }
        seen
    });

    h.provisioner
        .supervisor()
        .handshake(worker.name(), worker.secret())
        .unwrap();
    eventually("worker online", || {
        h.metrics.count("provision_completed:online") == 1
    })
    .await;
    h.provisioner
        .retention()
        .worker_disconnected(worker.name())
        .await
        .unwrap();

    // terminated workers never come back
    assert!(h.provisioner.supervisor().handshake(worker.name(), worker.secret()).is_err());
    assert_eq!(worker.state(), ConnectionState::Terminated);

    drop(worker);
    let seen = observer.await.unwrap();
    assert_eq!(
        seen,
        vec![
            ConnectionState::Pending,
            ConnectionState::Online,
            ConnectionState::Terminated
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn disconnect_before_dispatch_releases_the_task() {
    let h = harness(config(), FakeLauncher::new());
    let item = h.queue.push("build", docker());
    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();

    h.provisioner
        .supervisor()
        .handshake(worker.name(), worker.secret())
        .unwrap();
    eventually("worker online", || {
        h.metrics.count("provision_completed:online") == 1
    })
    .await;
    h.provisioner
        .retention()
        .worker_disconnected(worker.name())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert!(!h.queue.is_pending(item.id));
    let entry = h.queue.get(item.id).unwrap();
    assert!(matches!(entry.state, EntryState::Cancelled { .. }));
    assert!(entry.last_reason.unwrap().contains("disconnected"));
    assert!(h.provisioner.inventory().find_by_label(&label).is_none());
    assert!(h.provisioner.affinity().is_empty());
    assert_eq!(h.provisioner.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_before_dispatch_requeues_with_a_fresh_label() {
    let cfg = ProvisionConfig {
        on_failure: FailureAction::Requeue,
        max_requeues: 1,
        ..config()
    };
    let (queue, mut requeued) = MemoryQueue::with_requeue_channel();
    let h = harness_with(cfg, FakeLauncher::new(), queue, None, None);
    let item = h.queue.push("build", docker());
    let label = admitted_label(h.provisioner.listener().on_buildable(&item).unwrap());
    let worker = h.provisioner.inventory().find_by_label(&label).unwrap();

    h.provisioner
        .supervisor()
        .handshake(worker.name(), worker.secret())
        .unwrap();
    eventually("worker online", || {
        h.metrics.count("provision_completed:online") == 1
    })
    .await;
    h.provisioner
        .retention()
        .worker_disconnected(worker.name())
        .await
        .unwrap();

    let again = requeued.recv().await.unwrap();
    assert_eq!(again.id, item.id);
    assert_eq!(again.requeues, 1);
    assert!(again.binding.is_none());

    let second = admitted_label(h.provisioner.listener().on_buildable(&again).unwrap());
    assert_ne!(label, second);
    let replacement = h.provisioner.inventory().find_by_label(&second).unwrap();
    assert_eq!(replacement.requeues(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_waits_and_reaps_everything() {
    let h = harness(config(), FakeLauncher::new());
    let items: Vec<_> = (0..3).map(|i| h.queue.push(format!("t{i}"), docker())).collect();
    for item in &items {
        h.provisioner.listener().on_buildable(item).unwrap();
    }
    settle(tokio::task::yield_now()).await;

    h.provisioner.shutdown(Duration::from_secs(5)).await.unwrap();

    assert!(h.provisioner.inventory().is_empty());
    assert!(h.provisioner.affinity().is_empty());
    assert_eq!(h.provisioner.in_flight(), 0);
    for item in &items {
        assert!(matches!(
            h.queue.get(item.id).unwrap().state,
            EntryState::Cancelled { .. }
        ));
    }

    let late = h.queue.push("late", docker());
    assert!(matches!(
        h.provisioner.listener().on_buildable(&late),
        Err(CoreError::PoolClosed)
    ));
    assert!(h.provisioner.inventory().is_empty());
    assert!(!h.queue.is_pending(late.id));
}

#[tokio::test(start_paused = true)]
async fn bind_failure_releases_the_label() {
    let h = harness(config(), FakeLauncher::new());
    let item = h.queue.push("build", docker());
    h.queue
        .bind(item.id, LabelBinding::new(AffinityLabel::mint("docker").unwrap()))
        .unwrap();

    // stale view: the listener sees no binding but the queue already has one
    let res = h.provisioner.listener().on_buildable(&item);
    assert!(matches!(res, Err(CoreError::Queue(_))));
    assert!(h.provisioner.affinity().is_empty());
    assert!(h.provisioner.inventory().is_empty());
    assert_eq!(h.metrics.count("admission:rejected"), 1);
}
