//! End-to-end placement tests: submission, fairness rounds, backpressure,
//! get-requests, and lifecycle. Ticks are driven manually except where the
//! built-in loops are the subject under test.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fairplacer::{
    Config, Entry, GetRequest, Job, JobKind, Location, LocationTracker, Notifier, PayloadFn,
    PlainEntry, ProcessError, Scheduler, StaticAuthorizer,
};

/// Small limits and short cadences so tests run in milliseconds.
fn test_config() -> Config {
    Config {
        quota: 2,
        vip_quota: 0,
        hard_limit: 10,
        soft_limit: 5,
        global_max: 0,
        interval: Duration::from_millis(5),
        get_interval: Duration::from_millis(1),
        talk_interval: 0,
        get_idle_runs: 3,
        get_max_rounds: 200,
        cancel_wait: Duration::from_millis(50),
        cancel_poll: Duration::from_millis(5),
    }
}

type TagLog = Arc<Mutex<Vec<String>>>;

/// Entry whose payload appends `tag` to the shared log when processed.
fn tagged(log: &TagLog, tag: &str) -> Entry {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    Entry::Plain(PlainEntry::ungrouped(PayloadFn::arc(move || {
        let log = Arc::clone(&log);
        let tag = tag.clone();
        async move {
            log.lock().unwrap().push(tag);
            Ok::<_, ProcessError>(())
        }
    })))
}

fn noop() -> Entry {
    Entry::Plain(PlainEntry::ungrouped(PayloadFn::arc(|| async {
        Ok::<_, ProcessError>(())
    })))
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    fn count_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| m.contains(needle))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, actor: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((actor.to_string(), message.to_string()));
    }
}

#[derive(Clone, Default)]
struct RecordingTracker {
    tracked: Arc<Mutex<Vec<(String, Location)>>>,
    forgotten: Arc<Mutex<Vec<(String, Location)>>>,
}

impl LocationTracker for RecordingTracker {
    fn track(&self, world: &str, location: Location) {
        self.tracked
            .lock()
            .unwrap()
            .push((world.to_string(), location));
    }

    fn untrack(&self, world: &str, location: Location) {
        self.forgotten
            .lock()
            .unwrap()
            .push((world.to_string(), location));
    }
}

#[tokio::test]
async fn test_fifo_within_one_actor() {
    let mut cfg = test_config();
    cfg.quota = 10;
    let scheduler = Scheduler::new(cfg);
    let log: TagLog = Default::default();

    for i in 1..=5 {
        assert!(scheduler.submit("solo", tagged(&log, &format!("e{i}"))));
    }
    assert_eq!(scheduler.queued("solo"), 5);

    scheduler.run_placement_tick().await;

    assert_eq!(*log.lock().unwrap(), vec!["e1", "e2", "e3", "e4", "e5"]);
    assert_eq!(scheduler.queued("solo"), 0);
    // Nothing queued and no jobs: the actor leaves the table.
    assert!(scheduler.actors().is_empty());
}

#[tokio::test]
async fn test_round_robin_rotates_across_ticks() {
    let mut cfg = test_config();
    cfg.quota = 1;
    let scheduler = Scheduler::new(cfg);
    let log: TagLog = Default::default();

    for actor in ["a", "b", "c"] {
        scheduler.submit(actor, tagged(&log, &format!("{actor}1")));
        scheduler.submit(actor, tagged(&log, &format!("{actor}2")));
    }

    // One entry per tick; the cursor persists, so consecutive ticks visit
    // consecutive actors instead of restarting at the same one.
    scheduler.run_placement_tick().await;
    scheduler.run_placement_tick().await;
    scheduler.run_placement_tick().await;

    assert_eq!(*log.lock().unwrap(), vec!["a1", "b1", "c1"]);
    assert_eq!(scheduler.total_queued(), 3);
}

#[tokio::test]
async fn test_vip_round_drains_extra_quota() {
    let mut cfg = test_config();
    cfg.quota = 1;
    cfg.vip_quota = 2;
    let scheduler = Scheduler::builder()
        .config(cfg)
        .authorizer(StaticAuthorizer::new().with_vip("ann"))
        .build();

    for _ in 0..5 {
        scheduler.submit("ann", noop());
        scheduler.submit("bob", noop());
    }

    // Tick 1: base round takes 1 from ann (cursor at the start), VIP round
    // takes 2 more from ann. Bob only drains through the base round.
    scheduler.run_placement_tick().await;
    assert_eq!(scheduler.queued("ann"), 2);
    assert_eq!(scheduler.queued("bob"), 5);

    // Tick 2: base round resumes at bob, VIP round finishes ann.
    scheduler.run_placement_tick().await;
    assert_eq!(scheduler.queued("ann"), 0);
    assert_eq!(scheduler.queued("bob"), 4);
}

#[tokio::test]
async fn test_demanding_entry_halts_the_round() {
    let mut cfg = test_config();
    cfg.quota = 3;
    let scheduler = Scheduler::new(cfg);
    let log: TagLog = Default::default();

    let demanding = {
        let log = Arc::clone(&log);
        Entry::Plain(
            PlainEntry::ungrouped(PayloadFn::arc(move || {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push("d1".to_string());
                    Ok::<_, ProcessError>(())
                }
            }))
            .demanding(),
        )
    };
    scheduler.submit("a", demanding);
    scheduler.submit("a", tagged(&log, "p2"));
    scheduler.submit("a", tagged(&log, "p3"));

    // The demanding entry consumes the whole round despite quota 3.
    scheduler.run_placement_tick().await;
    assert_eq!(*log.lock().unwrap(), vec!["d1"]);
    assert_eq!(scheduler.queued("a"), 2);

    scheduler.run_placement_tick().await;
    assert_eq!(*log.lock().unwrap(), vec!["d1", "p2", "p3"]);
}

#[tokio::test]
async fn test_queue_below_limits_never_locks() {
    let notifier = RecordingNotifier::default();
    let mut cfg = test_config();
    cfg.quota = 2;
    cfg.hard_limit = 10;
    cfg.soft_limit = 3;
    let scheduler = Scheduler::builder()
        .config(cfg)
        .notifier(notifier.clone())
        .build();

    for _ in 0..5 {
        assert!(scheduler.submit("alice", noop()));
    }
    assert!(!scheduler.is_locked("alice"));

    let mut sizes = Vec::new();
    for _ in 0..3 {
        scheduler.run_placement_tick().await;
        sizes.push(scheduler.queued("alice"));
        assert!(!scheduler.is_locked("alice"));
    }
    assert_eq!(sizes, vec![3, 1, 0]);
    assert!(notifier.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_hard_limit_locks_and_soft_limit_unlocks() {
    let notifier = RecordingNotifier::default();
    let mut cfg = test_config();
    cfg.quota = 3;
    cfg.hard_limit = 10;
    cfg.soft_limit = 5;
    let scheduler = Scheduler::builder()
        .config(cfg)
        .notifier(notifier.clone())
        .build();

    for _ in 0..9 {
        assert!(scheduler.submit("bob", noop()));
    }
    // The submission that reaches the hard limit is still enqueued, but the
    // call reports rejection and the queue locks.
    assert!(!scheduler.submit("bob", noop()));
    assert!(scheduler.is_locked("bob"));
    assert_eq!(scheduler.queued("bob"), 10);
    assert_eq!(notifier.count_containing("queue is full"), 1);

    // Locked queues reject flat, without growing.
    assert!(!scheduler.submit("bob", noop()));
    assert_eq!(scheduler.queued("bob"), 10);

    // 10 -> 7: still at or above the soft limit, still locked.
    scheduler.run_placement_tick().await;
    assert_eq!(scheduler.queued("bob"), 7);
    assert!(scheduler.is_locked("bob"));

    // 7 -> 4: below the soft limit, the tick unlocks and says so.
    scheduler.run_placement_tick().await;
    assert_eq!(scheduler.queued("bob"), 4);
    assert!(!scheduler.is_locked("bob"));
    assert_eq!(notifier.count_containing("unlocked"), 1);

    assert!(scheduler.submit("bob", noop()));
}

#[tokio::test]
async fn test_global_cap_rejects_with_a_single_notice() {
    let notifier = RecordingNotifier::default();
    let mut cfg = test_config();
    cfg.quota = 100;
    cfg.global_max = 2;
    let scheduler = Scheduler::builder()
        .config(cfg)
        .notifier(notifier.clone())
        .build();

    // The cap is checked against the count before the append, so the queue
    // settles at cap + 1.
    assert!(scheduler.submit("x", noop()));
    assert!(scheduler.submit("x", noop()));
    assert!(scheduler.submit("x", noop()));
    assert!(!scheduler.submit("x", noop()));
    assert!(!scheduler.submit("x", noop()));
    assert_eq!(scheduler.total_queued(), 3);
    assert_eq!(notifier.count_containing("Out of space"), 1);

    // Draining frees space and re-arms the notification.
    scheduler.run_placement_tick().await;
    assert!(scheduler.submit("x", noop()));
}

#[tokio::test]
async fn test_global_cap_exempts_jobs_and_bypass_actors() {
    let mut cfg = test_config();
    cfg.global_max = 1;
    let scheduler = Scheduler::builder()
        .config(cfg)
        .authorizer(StaticAuthorizer::new().with_bypass("ops"))
        .build();

    assert!(scheduler.submit("x", noop()));
    assert!(scheduler.submit("x", noop()));
    assert!(!scheduler.submit("x", noop()));

    // Bypass-capable actors ignore the global cap entirely.
    assert!(scheduler.submit("ops", noop()));

    // So do job entries, whoever submits them.
    let id = scheduler.next_job_id("x");
    let job = Job::new(
        id,
        "exempt",
        JobKind::Edit,
        PayloadFn::arc(|| async { Ok::<_, ProcessError>(()) }),
    );
    assert!(scheduler.submit("x", Entry::Job(job)));
    assert_eq!(scheduler.job_count("x"), 1);
}

#[tokio::test]
async fn test_tracker_sees_targets_through_the_drain() {
    let tracker = RecordingTracker::default();
    let mut cfg = test_config();
    cfg.quota = 10;
    let scheduler = Scheduler::builder()
        .config(cfg)
        .tracker(tracker.clone())
        .build();

    let payload = PayloadFn::arc(|| async { Ok::<_, ProcessError>(()) });
    scheduler.submit(
        "a",
        Entry::Plain(
            PlainEntry::ungrouped(payload.clone()).with_target("world", Location::new(1, 64, -3)),
        ),
    );
    scheduler.submit(
        "a",
        Entry::Plain(
            PlainEntry::ungrouped(payload.clone()).with_target("nether", Location::new(0, 70, 0)),
        ),
    );
    scheduler.submit("a", Entry::Plain(PlainEntry::ungrouped(payload)));

    assert_eq!(tracker.tracked.lock().unwrap().len(), 2);
    assert!(tracker.forgotten.lock().unwrap().is_empty());

    scheduler.run_placement_tick().await;

    let forgotten = tracker.forgotten.lock().unwrap();
    assert_eq!(forgotten.len(), 2);
    assert_eq!(forgotten[0], ("world".to_string(), Location::new(1, 64, -3)));
}

#[tokio::test]
async fn test_progress_reports_throughput_while_draining() {
    let mut cfg = test_config();
    cfg.quota = 3;
    let scheduler = Scheduler::new(cfg);

    for _ in 0..6 {
        scheduler.submit("a", noop());
    }
    tokio::time::sleep(Duration::from_millis(5)).await;
    scheduler.run_placement_tick().await;

    let report = scheduler.progress("a").expect("actor still queued");
    assert_eq!(report.queued, 3);
    assert!(report.speed > 0.0);
    assert!(report.eta_seconds() > 0.0);
}

#[tokio::test]
async fn test_talk_messages_follow_the_interval() {
    let notifier = RecordingNotifier::default();
    let mut cfg = test_config();
    cfg.quota = 1;
    cfg.talk_interval = 2;
    let scheduler = Scheduler::builder()
        .config(cfg)
        .authorizer(StaticAuthorizer::new().with_talkative())
        .notifier(notifier.clone())
        .build();

    for _ in 0..5 {
        scheduler.submit("a", noop());
    }

    scheduler.run_placement_tick().await;
    assert!(notifier.messages.lock().unwrap().is_empty());

    // Second tick crosses the interval: one announcement, counter resets.
    scheduler.run_placement_tick().await;
    assert_eq!(notifier.messages.lock().unwrap().len(), 1);
    let (actor, message) = notifier.messages.lock().unwrap()[0].clone();
    assert_eq!(actor, "a");
    assert!(message.contains("queued"));

    scheduler.run_placement_tick().await;
    assert_eq!(notifier.messages.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_graceful_stop_waits_for_the_drain() {
    let mut cfg = test_config();
    cfg.quota = 2;
    let scheduler = Scheduler::new(cfg);

    for _ in 0..3 {
        scheduler.submit("a", noop());
    }
    scheduler.queue_stop();

    scheduler.run_placement_tick().await;
    assert!(!scheduler.is_stopped());

    scheduler.run_placement_tick().await;
    assert!(!scheduler.is_stopped());
    assert_eq!(scheduler.total_queued(), 0);

    // First tick that drains nothing stops the scheduler.
    scheduler.run_placement_tick().await;
    assert!(scheduler.is_stopped());
}

#[tokio::test]
async fn test_get_requests_run_in_submission_order() {
    let scheduler = Scheduler::new(test_config());
    let log: Arc<Mutex<Vec<i32>>> = Default::default();

    for i in 1..=3 {
        let log = Arc::clone(&log);
        scheduler.submit_get(GetRequest::new(move |_: &Scheduler| {
            log.lock().unwrap().push(i);
        }));
    }

    assert!(scheduler.run_get_tick().await);
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    assert!(!scheduler.run_get_tick().await);
}

#[tokio::test(start_paused = true)]
async fn test_get_loop_parks_when_idle_and_revives() {
    let scheduler = Scheduler::new(test_config());
    let log: Arc<Mutex<Vec<i32>>> = Default::default();

    for i in 1..=2 {
        let log = Arc::clone(&log);
        scheduler.submit_get(GetRequest::new(move |_: &Scheduler| {
            log.lock().unwrap().push(i);
        }));
    }

    // Virtual time: get_interval 1ms and get_idle_runs 3 mean the loop has
    // serviced both requests and parked itself well within 50ms.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);

    // A fresh request revives the parked loop.
    {
        let log = Arc::clone(&log);
        scheduler.submit_get(GetRequest::new(move |_: &Scheduler| {
            log.lock().unwrap().push(3);
        }));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_get_requests_can_read_scheduler_state() {
    let scheduler = Scheduler::new(test_config());
    scheduler.submit("a", noop());
    scheduler.submit("a", noop());

    let (tx, rx) = tokio::sync::oneshot::channel();
    scheduler.submit_get(GetRequest::new(move |s: &Scheduler| {
        let _ = tx.send(s.queued("a"));
    }));

    scheduler.run_get_tick().await;
    assert_eq!(rx.await.unwrap(), 2);
}

#[tokio::test]
async fn test_start_drives_the_placement_loop() {
    let scheduler = Scheduler::new(test_config());
    let log: TagLog = Default::default();

    for i in 1..=3 {
        scheduler.submit("a", tagged(&log, &format!("e{i}")));
    }

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(*log.lock().unwrap(), vec!["e1", "e2", "e3"]);
    assert_eq!(scheduler.total_queued(), 0);

    scheduler.stop();
    assert!(scheduler.is_stopped());

    // A stopped scheduler stays stopped.
    scheduler.start();
    assert!(scheduler.is_stopped());
}
