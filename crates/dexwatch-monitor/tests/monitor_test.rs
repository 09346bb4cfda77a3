//! Monitor scheduling tests.
//!
//! Run on a paused clock: sleeping in the test auto-advances time, which
//! lets job ticks and delayed fetches fire deterministically.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dexwatch_core::{PollInterval, Record};
use dexwatch_fetch::normalize::parse_value;
use dexwatch_fetch::{BoxFuture, FetchError, FetchResult, Fetcher, MockFetcher};
use dexwatch_monitor::{Monitor, MonitorEvent, StartStatus};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn record(id: &str) -> Record {
    Record {
        id: id.to_string(),
        position: 0,
        sender: "0xseller".to_string(),
        recipient: "0xbuyer".to_string(),
        raw_amount: dec!(10),
        amount_usd: Some(dec!(250000)),
        currency: Some("WBNB".to_string()),
        block_height: 1,
        timestamp: Utc::now(),
    }
}

fn minutes(n: i64) -> PollInterval {
    PollInterval::new(n).unwrap()
}

fn setup() -> (Arc<MockFetcher>, Monitor, Arc<Mutex<Vec<MonitorEvent>>>) {
    let fetcher = Arc::new(MockFetcher::returning(vec![record("fallback")]));
    let monitor = Monitor::new(fetcher.clone());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    monitor.subscribe(move |event| sink.lock().push(event.clone()));
    (fetcher, monitor, events)
}

fn snapshot_ids(monitor: &Monitor) -> Vec<String> {
    monitor
        .snapshot()
        .records()
        .iter()
        .map(|r| r.id.clone())
        .collect()
}

fn event_names(events: &Mutex<Vec<MonitorEvent>>) -> Vec<&'static str> {
    events.lock().iter().map(MonitorEvent::name).collect()
}

#[tokio::test(start_paused = true)]
async fn test_initialize_runs_once() {
    let (fetcher, monitor, events) = setup();
    fetcher.push(Ok(vec![record("a"), record("b")]));

    assert!(!monitor.is_initialized());
    assert!(monitor.snapshot().is_empty());

    monitor.initialize().await;
    monitor.initialize().await;

    assert!(monitor.is_initialized());
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(snapshot_ids(&monitor), ["a", "b"]);
    assert_eq!(event_names(&events), ["initial"]);
    assert!(monitor.active_intervals().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_initialize_failure_leaves_snapshot_empty() {
    let (fetcher, monitor, events) = setup();
    fetcher.push(Err(FetchError::Transport("connection refused".to_string())));

    monitor.initialize().await;

    assert!(monitor.is_initialized());
    assert!(monitor.snapshot().is_empty());
    assert!(matches!(
        events.lock().as_slice(),
        [MonitorEvent::Error(FetchError::Transport(_))]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent_per_interval() {
    let (fetcher, monitor, events) = setup();

    assert_eq!(monitor.start(minutes(1)).await, StartStatus::Started);
    assert_eq!(monitor.start(minutes(1)).await, StartStatus::AlreadyActive);

    assert_eq!(monitor.active_intervals(), [minutes(1)]);
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(event_names(&events), ["update"]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_start_creates_single_job() {
    let (fetcher, monitor, _events) = setup();
    fetcher.push_delayed(Ok(vec![record("slow")]), Duration::from_secs(5));

    tokio::join!(monitor.start(minutes(1)), monitor.start(minutes(1)));

    assert_eq!(monitor.active_intervals(), [minutes(1)]);
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_intervals_run_concurrently() {
    let (_fetcher, monitor, _events) = setup();

    monitor.start(minutes(5)).await;
    monitor.start(minutes(1)).await;

    assert_eq!(monitor.active_intervals(), [minutes(1), minutes(5)]);
    assert!(monitor.is_active(minutes(5)));
}

#[tokio::test(start_paused = true)]
async fn test_stop_unknown_interval_is_noop() {
    let (fetcher, monitor, events) = setup();

    assert!(!monitor.stop(minutes(7)));

    assert_eq!(fetcher.call_count(), 0);
    assert!(events.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ticks_follow_interval() {
    let (fetcher, monitor, events) = setup();

    monitor.start(minutes(1)).await;
    assert_eq!(fetcher.call_count(), 1);

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(fetcher.call_count(), 1, "first tick is one period after start");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fetcher.call_count(), 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fetcher.call_count(), 3);
    assert_eq!(event_names(&events), ["update", "update", "update"]);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_job_never_ticks() {
    let (fetcher, monitor, _events) = setup();

    monitor.start(minutes(1)).await;
    assert!(monitor.stop(minutes(1)));
    assert!(monitor.active_intervals().is_empty());

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tick_failure_keeps_previous_snapshot() {
    let (fetcher, monitor, events) = setup();
    fetcher.push(Ok(vec![record("good")]));
    fetcher.push(Err(FetchError::Upstream("quota exceeded".to_string())));

    monitor.start(minutes(1)).await;
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(fetcher.call_count(), 2);
    assert_eq!(snapshot_ids(&monitor), ["good"]);
    assert_eq!(event_names(&events), ["update", "error"]);
    assert!(monitor.is_active(minutes(1)), "failures are not fatal to the job");
}

#[tokio::test(start_paused = true)]
async fn test_eager_failure_still_schedules_job() {
    let (fetcher, monitor, events) = setup();
    fetcher.push(Err(FetchError::Shape("not an array".to_string())));

    monitor.start(minutes(1)).await;
    assert!(monitor.snapshot().is_empty());
    assert!(monitor.is_active(minutes(1)));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(snapshot_ids(&monitor), ["fallback"]);
    assert_eq!(event_names(&events), ["error", "update"]);
}

#[tokio::test(start_paused = true)]
async fn test_last_completed_fetch_wins() {
    let (fetcher, monitor, events) = setup();
    // start(1)'s job task is spawned first and gets the slow response.
    fetcher.push_delayed(Ok(vec![record("one")]), Duration::from_secs(10));
    fetcher.push_delayed(Ok(vec![record("five")]), Duration::from_secs(1));

    tokio::join!(monitor.start(minutes(1)), monitor.start(minutes(5)));

    assert_eq!(snapshot_ids(&monitor), ["one"]);
    let order: Vec<String> = events
        .lock()
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::Update(s) => Some(s.records()[0].id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(order, ["five", "one"]);
}

#[tokio::test(start_paused = true)]
async fn test_completion_order_not_start_order_decides() {
    let (fetcher, monitor, _events) = setup();
    fetcher.push_delayed(Ok(vec![record("one")]), Duration::from_secs(1));
    fetcher.push_delayed(Ok(vec![record("five")]), Duration::from_secs(10));

    tokio::join!(monitor.start(minutes(1)), monitor.start(minutes(5)));

    assert_eq!(snapshot_ids(&monitor), ["five"]);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_fetch_applied_after_stop() {
    let (fetcher, monitor, events) = setup();
    fetcher.push(Ok(vec![record("eager")]));
    fetcher.push_delayed(Ok(vec![record("late")]), Duration::from_secs(30));

    monitor.start(minutes(1)).await;

    // Tick fires at 60s; its fetch resolves at 90s.
    tokio::time::sleep(Duration::from_secs(70)).await;
    assert_eq!(fetcher.call_count(), 2);
    assert!(monitor.stop(minutes(1)));
    assert_eq!(snapshot_ids(&monitor), ["eager"]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(snapshot_ids(&monitor), ["late"]);
    assert_eq!(event_names(&events), ["update", "update"]);

    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_eager_fetch_cancels_job() {
    let (fetcher, monitor, _events) = setup();
    fetcher.push_delayed(Ok(vec![record("eager")]), Duration::from_secs(5));

    let starter = monitor.clone();
    let handle = tokio::spawn(async move { starter.start(minutes(1)).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(monitor.stop(minutes(1)));
    handle.await.unwrap();

    assert_eq!(snapshot_ids(&monitor), ["eager"]);
    assert!(monitor.active_intervals().is_empty());

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_start_keeps_polling() {
    let (fetcher, monitor, events) = setup();
    fetcher.push_delayed(Ok(vec![record("eager")]), Duration::from_secs(10));

    let waited = tokio::time::timeout(Duration::from_secs(1), monitor.start(minutes(5))).await;
    assert!(waited.is_err());
    assert_eq!(monitor.active_intervals(), [minutes(5)]);

    // The abandoned eager fetch still lands and the job ticks afterwards.
    assert_eq!(monitor.start(minutes(5)).await, StartStatus::AlreadyActive);
    tokio::time::sleep(Duration::from_secs(30 * 60)).await;

    assert_eq!(snapshot_ids(&monitor), ["fallback"]);
    assert_eq!(events.lock()[0].name(), "update");
    // Eager fetch at 10s, then ticks at 5m10s, 10m10s, ..., 25m10s.
    assert_eq!(fetcher.call_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_begin_start_returns_before_eager_fetch() {
    let (fetcher, monitor, _events) = setup();
    fetcher.push_delayed(Ok(vec![record("eager")]), Duration::from_secs(60 * 60));

    let pending = monitor.begin_start(minutes(2));
    assert_eq!(pending.status(), StartStatus::Started);
    assert!(monitor.is_active(minutes(2)));

    assert_eq!(monitor.start(minutes(3)).await, StartStatus::Started);
    assert_eq!(snapshot_ids(&monitor), ["fallback"]);
    drop(pending);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_all_jobs() {
    let (fetcher, monitor, _events) = setup();

    monitor.start(minutes(1)).await;
    monitor.start(minutes(2)).await;
    monitor.shutdown();

    assert!(monitor.active_intervals().is_empty());
    assert_eq!(monitor.start(minutes(3)).await, StartStatus::ShutDown);
    assert!(monitor.active_intervals().is_empty());

    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribed_handler_stops_receiving() {
    let (_fetcher, monitor, events) = setup();
    let extra = Arc::new(Mutex::new(0usize));
    let counter = extra.clone();
    let id = monitor.subscribe(move |_| *counter.lock() += 1);

    monitor.start(minutes(1)).await;
    assert!(monitor.unsubscribe(id));
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(*extra.lock(), 1);
    assert_eq!(events.lock().len(), 2);
}

/// Serves one fixed raw response through the real normalizer.
struct RawFetcher(Value);

impl Fetcher for RawFetcher {
    fn fetch(&self) -> BoxFuture<'_, FetchResult<Vec<Record>>> {
        Box::pin(async move { parse_value(&self.0) })
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_event_carries_only_valid_entries() {
    let trade = |hash: Option<&str>| {
        let mut entry = json!({
            "Block": {"Time": "2024-05-01T12:00:00Z", "Number": 1},
            "Trade": {"Buy": {"Amount": "4.2", "AmountInUSD": "200000"}},
        });
        if let Some(hash) = hash {
            entry["Transaction"] = json!({"Hash": hash});
        }
        entry
    };
    let body = json!({"data": {"EVM": {"DEXTrades": [
        trade(Some("0x1")),
        trade(None),
        trade(Some("0x3")),
    ]}}});

    let monitor = Monitor::new(Arc::new(RawFetcher(body)));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    monitor.subscribe(move |event| sink.lock().push(event.clone()));

    monitor.initialize().await;

    assert_eq!(snapshot_ids(&monitor), ["0x1", "0x3"]);
    match events.lock().as_slice() {
        [MonitorEvent::Initial(snapshot)] => assert_eq!(snapshot.len(), 2),
        other => panic!("unexpected events {other:?}"),
    };
}
