use std::error::Error;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

use stagepipe::runner::{drain_output, IncrementalOptions, IncrementalRunner, StageEvent};
use stagepipe::Item;
use stagepipe_test_utils::builders::ItemBuilder;
use stagepipe_test_utils::fake_stage::RecordingStage;
use stagepipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const QUIET: Duration = Duration::from_millis(50);

fn ms(start: Instant, at: Instant) -> u128 {
    (at - start).as_millis()
}

fn item(path: &str, contents: &str) -> Item {
    ItemBuilder::new(path).contents(contents).build()
}

fn options(initial: Option<Vec<Item>>, supports_cancellation: bool) -> IncrementalOptions {
    IncrementalOptions {
        initial,
        supports_cancellation,
        quiet_period: Some(QUIET),
    }
}

fn relative_paths(items: &[Item]) -> Vec<String> {
    items.iter().map(|i| i.relative_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn burst_coalesces_same_key_and_launches_once() -> TestResult {
    init_tracing();

    let stage = RecordingStage::new(Duration::from_millis(5));
    let (out_tx, _out_rx) = mpsc::channel(64);
    let start = Instant::now();
    let runner = IncrementalRunner::spawn(stage.factory(), options(None, false), out_tx);

    // A at t=0, B (same key, new value) at t=10, C (different key) at t=20.
    runner.send(item("a.js", "A")).await?;
    sleep(Duration::from_millis(10)).await;
    runner.send(item("a.js", "B")).await?;
    sleep(Duration::from_millis(10)).await;
    runner.send(item("c.js", "C")).await?;

    sleep(Duration::from_millis(300)).await;
    let runs = stage.runs();
    assert_eq!(runs.len(), 1, "a burst within one quiet period is one run");
    assert_eq!(
        ms(start, runs[0].started_at),
        70,
        "run launches quiet-period after the last arrival"
    );
    assert_eq!(relative_paths(&runs[0].inputs), vec!["a.js", "c.js"]);
    assert_eq!(runs[0].inputs[0].contents, b"B", "A's value is superseded");
    assert_eq!(runs[0].inputs[1].contents, b"C");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn leftover_buffer_waits_for_next_arrival_and_nothing_is_lost() -> TestResult {
    init_tracing();

    // Initial run takes 100ms; items buffer during it.
    let stage = RecordingStage::new(Duration::from_millis(100));
    let (out_tx, _out_rx) = mpsc::channel(64);
    let start = Instant::now();
    let initial = vec![item("a.js", "A")];
    let runner = IncrementalRunner::spawn(stage.factory(), options(Some(initial), true), out_tx);

    sleep(Duration::from_millis(10)).await;
    runner.send(item("b.js", "B1")).await?; // t=10, mid-run
    sleep(Duration::from_millis(10)).await;
    runner.send(item("b.js", "B2")).await?; // t=20, supersedes B1

    // Run completes at t=100 with the buffer non-empty. No auto-flush:
    // well past the quiet period, still only the initial run has happened.
    sleep(Duration::from_millis(280)).await; // t=300
    assert_eq!(stage.run_count(), 1, "leftover buffer must not auto-flush");

    // The next arrival schedules the flush; everything buffered rides along.
    runner.send(item("c.js", "C")).await?; // t=300

    sleep(Duration::from_millis(300)).await;
    let runs = stage.runs();
    assert_eq!(runs.len(), 2);
    assert_eq!(ms(start, runs[1].started_at), 350);
    assert_eq!(relative_paths(&runs[1].inputs), vec!["b.js", "c.js"]);
    assert_eq!(runs[1].inputs[0].contents, b"B2", "last write wins per key");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn runs_never_overlap() -> TestResult {
    init_tracing();

    let run_len = Duration::from_millis(100);
    let stage = RecordingStage::new(run_len);
    let (out_tx, _out_rx) = mpsc::channel(64);
    let runner = IncrementalRunner::spawn(
        stage.factory(),
        IncrementalOptions {
            initial: None,
            supports_cancellation: true,
            quiet_period: Some(Duration::from_millis(10)),
        },
        out_tx,
    );

    // Arrivals spaced wider than the quiet period, narrower than a run.
    for i in 0..20 {
        runner.send(item(&format!("f{}.js", i % 3), "x")).await?;
        sleep(Duration::from_millis(20)).await;
    }
    sleep(Duration::from_millis(500)).await;

    let runs = stage.runs();
    assert!(runs.len() >= 2, "expected several runs, got {}", runs.len());
    for pair in runs.windows(2) {
        assert!(
            pair[1].started_at >= pair[0].started_at + run_len,
            "run launched before the previous one completed"
        );
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn initial_run_never_observes_cancellation() -> TestResult {
    init_tracing();

    let stage = RecordingStage::new(Duration::from_millis(100));
    let (out_tx, _out_rx) = mpsc::channel(64);
    let initial = vec![item("a.js", "A")];
    let runner = IncrementalRunner::spawn(stage.factory(), options(Some(initial), true), out_tx);

    // Items buffering during the initial run must not flip its predicate.
    sleep(Duration::from_millis(10)).await;
    runner.send(item("b.js", "B")).await?;

    sleep(Duration::from_millis(200)).await;
    let runs = stage.runs();
    assert_eq!(runs[0].cancel_at_start, false);
    assert_eq!(runs[0].cancel_at_end, false);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn buffered_run_observes_cancellation_when_item_arrives_mid_run() -> TestResult {
    init_tracing();

    let stage = RecordingStage::new(Duration::from_millis(100));
    let (out_tx, _out_rx) = mpsc::channel(64);
    let runner = IncrementalRunner::spawn(stage.factory(), options(None, true), out_tx);

    runner.send(item("a.js", "A")).await?; // run 1 launches at t=50
    sleep(Duration::from_millis(80)).await;
    runner.send(item("b.js", "B")).await?; // t=80, mid-run -> predicate flips

    sleep(Duration::from_millis(500)).await;
    let runs = stage.runs();
    assert!(!runs[0].cancel_at_start, "buffer was drained at launch");
    assert!(
        runs[0].cancel_at_end,
        "arrival during a cancellable run must be observable"
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn disabled_cancellation_is_never_reported() -> TestResult {
    init_tracing();

    let stage = RecordingStage::new(Duration::from_millis(100));
    let (out_tx, _out_rx) = mpsc::channel(64);
    let runner = IncrementalRunner::spawn(stage.factory(), options(None, false), out_tx);

    runner.send(item("a.js", "A")).await?;
    sleep(Duration::from_millis(80)).await;
    runner.send(item("b.js", "B")).await?;

    sleep(Duration::from_millis(500)).await;
    for run in stage.runs() {
        assert!(!run.cancel_at_start);
        assert!(!run.cancel_at_end);
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn outputs_are_relayed_and_channel_closes_after_shutdown() -> TestResult {
    init_tracing();

    let stage = RecordingStage::new(Duration::from_millis(10));
    let (out_tx, out_rx) = mpsc::channel(64);
    let runner = IncrementalRunner::spawn(stage.factory(), options(None, false), out_tx);

    runner.send(item("a.js", "A")).await?;
    runner.send(item("b.js", "B")).await?;
    drop(runner); // close the input; pending flush still runs

    let items = with_timeout(drain_output(out_rx)).await?;
    assert_eq!(relative_paths(&items), vec!["a.js", "b.js"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_run_is_relayed_and_bookkeeping_proceeds() -> TestResult {
    init_tracing();

    let stage = RecordingStage::failing(Duration::from_millis(10));
    let (out_tx, mut out_rx) = mpsc::channel(64);
    let runner = IncrementalRunner::spawn(stage.factory(), options(None, false), out_tx);

    runner.send(item("a.js", "A")).await?;
    sleep(Duration::from_millis(100)).await;

    // The run's echoed output arrives first, then the failure.
    let mut saw_failure = false;
    while let Ok(event) = out_rx.try_recv() {
        if let StageEvent::Failed(_) = event {
            saw_failure = true;
        }
    }
    assert!(saw_failure, "stage failure must be relayed on the output");

    // A failing run ends like any other: new arrivals launch new runs.
    runner.send(item("b.js", "B")).await?;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(stage.run_count(), 2);

    Ok(())
}
