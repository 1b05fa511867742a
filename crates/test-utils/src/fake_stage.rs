use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

use stagepipe::item::Item;
use stagepipe::runner::{BoxStage, CancelToken, StageEvent};

/// One recorded stage invocation.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    /// When the stage future started executing.
    pub started_at: Instant,
    /// The input batch handed to this run (empty for debounce-only stages).
    pub inputs: Vec<Item>,
    /// Cancellation predicate sampled when the run started.
    pub cancel_at_start: bool,
    /// Cancellation predicate sampled just before the run finished.
    pub cancel_at_end: bool,
}

/// A fake stage for driving the controllers in tests:
/// - records every run (inputs, start time, cancellation observations)
/// - sleeps for a configurable duration to simulate in-flight work
/// - echoes its inputs onto the output channel
/// - optionally fails instead of completing.
#[derive(Debug, Clone)]
pub struct RecordingStage {
    runs: Arc<Mutex<Vec<RecordedRun>>>,
    duration: Duration,
    fail: bool,
}

impl RecordingStage {
    pub fn new(duration: Duration) -> Self {
        Self {
            runs: Arc::new(Mutex::new(Vec::new())),
            duration,
            fail: false,
        }
    }

    /// A stage that resolves with an error after its sleep.
    pub fn failing(duration: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(duration)
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }

    /// Factory for `IncrementalRunner::spawn`.
    pub fn factory(
        &self,
    ) -> impl FnMut(Vec<Item>, CancelToken, mpsc::Sender<StageEvent>) -> BoxStage + Send + 'static
    {
        let runs = Arc::clone(&self.runs);
        let duration = self.duration;
        let fail = self.fail;

        move |items, token, out| {
            let runs = Arc::clone(&runs);
            Box::pin(async move {
                let started_at = Instant::now();
                let cancel_at_start = token.is_cancellation_requested();

                sleep(duration).await;

                let cancel_at_end = token.is_cancellation_requested();
                for item in items.clone() {
                    let _ = out.send(StageEvent::Output(item)).await;
                }

                runs.lock().unwrap().push(RecordedRun {
                    started_at,
                    inputs: items,
                    cancel_at_start,
                    cancel_at_end,
                });

                if fail {
                    Err(anyhow::anyhow!("fake stage failure"))
                } else {
                    Ok(())
                }
            })
        }
    }

    /// Factory for `DebouncedRunner::spawn` (no input batch, no token).
    pub fn debounce_factory(
        &self,
    ) -> impl FnMut(mpsc::Sender<StageEvent>) -> BoxStage + Send + 'static {
        let mut factory = self.factory();
        move |out| factory(Vec::new(), CancelToken::none(), out)
    }
}
