// src/runner/incremental.rs

//! Incremental build controller.
//!
//! Generalizes the debounced runner to per-invocation input. Changed items
//! are buffered keyed by path (last write wins); while idle, an arrival
//! schedules a debounced flush that atomically drains the buffer into the
//! next run. Items arriving mid-run only accumulate — and, when cancellation
//! support is enabled, flip the in-flight run's polled cancellation
//! predicate so a cooperative stage can wind down early.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::item::Item;
use crate::runner::debounce::DEFAULT_QUIET_PERIOD;
use crate::runner::stage::{
    launch_stage, relay_failure, BoxStage, CancelToken, RunDone, StageEvent,
};
use crate::runner::state::{self, RunState, TimerAction};
use crate::runner::timer::DebounceTimer;

/// Construction options for [`IncrementalRunner`].
#[derive(Debug, Default)]
pub struct IncrementalOptions {
    /// Input sequence to run immediately on construction. That initial run
    /// is never cancellable, even if items buffer during it.
    pub initial: Option<Vec<Item>>,

    /// Whether buffered-triggered runs receive a live cancellation token.
    /// When false, every run sees a token that never reports cancellation.
    pub supports_cancellation: bool,

    /// Quiet period for the debounced flush.
    pub quiet_period: Option<Duration>,
}

/// Handle to a spawned incremental build controller.
///
/// Dropping all input senders shuts the controller down once the in-flight
/// run (if any) and any pending flush have finished; items still buffered at
/// that point are discarded, since no further arrival can flush them.
#[derive(Debug, Clone)]
pub struct IncrementalRunner {
    input_tx: mpsc::Sender<Item>,
}

impl IncrementalRunner {
    /// Spawn a controller around `factory`. Every run's output is relayed
    /// onto `output`.
    ///
    /// The factory receives the drained input batch (in path order), the
    /// run's cancellation token, and the shared output sender.
    pub fn spawn<F>(factory: F, options: IncrementalOptions, output: mpsc::Sender<StageEvent>) -> Self
    where
        F: FnMut(Vec<Item>, CancelToken, mpsc::Sender<StageEvent>) -> BoxStage + Send + 'static,
    {
        let (input_tx, input_rx) = mpsc::channel(64);
        tokio::spawn(run_loop(factory, options, output, input_rx));
        Self { input_tx }
    }

    /// Feed one changed item into the controller.
    pub async fn send(&self, item: Item) -> crate::errors::Result<()> {
        self.input_tx
            .send(item)
            .await
            .map_err(|_| PipelineError::ControllerClosed)
    }

    /// A clonable input sender for external drivers.
    pub fn sender(&self) -> mpsc::Sender<Item> {
        self.input_tx.clone()
    }
}

async fn run_loop<F>(
    mut factory: F,
    options: IncrementalOptions,
    output: mpsc::Sender<StageEvent>,
    mut input_rx: mpsc::Receiver<Item>,
) where
    F: FnMut(Vec<Item>, CancelToken, mpsc::Sender<StageEvent>) -> BoxStage + Send + 'static,
{
    let quiet = options.quiet_period.unwrap_or(DEFAULT_QUIET_PERIOD);
    let mut timer = DebounceTimer::new(quiet);

    // Keyed by item path; BTreeMap keeps drain order deterministic.
    let mut buffer: BTreeMap<PathBuf, Item> = BTreeMap::new();
    // Mirror of `buffer.len()` observable by in-flight cancellable stages.
    let buffered = Arc::new(AtomicUsize::new(0));

    // Held for the lifetime of the loop so `done_rx.recv()` never observes
    // a closed channel while a run could still be launched.
    let (done_tx, mut done_rx) = mpsc::channel::<RunDone>(1);
    let mut input_open = true;

    let mut state = RunState::Idle;
    if let Some(initial) = options.initial {
        info!(count = initial.len(), "launching initial run");
        state = RunState::Running;
        // The initial run was not triggered by buffered arrivals, so it is
        // never cancellable.
        launch_stage(
            factory(initial, CancelToken::none(), output.clone()),
            done_tx.clone(),
        );
    }

    loop {
        if !input_open && state == RunState::Idle && !timer.is_armed() {
            break;
        }

        tokio::select! {
            maybe = input_rx.recv(), if input_open => match maybe {
                Some(item) => {
                    debug!(path = %item.path.display(), "buffering changed item");
                    buffer.insert(item.path.clone(), item);
                    buffered.store(buffer.len(), Ordering::SeqCst);
                    if state::on_arrival(state) == TimerAction::Arm {
                        timer.arm();
                    }
                }
                None => input_open = false,
            },
            _ = timer.fired(), if timer.is_armed() => {
                timer.disarm();
                if !buffer.is_empty() {
                    let items: Vec<Item> = std::mem::take(&mut buffer).into_values().collect();
                    buffered.store(0, Ordering::SeqCst);

                    // Triggered by buffered arrivals, so cancellable when
                    // cancellation support is enabled.
                    let token = if options.supports_cancellation {
                        CancelToken::watching(Arc::clone(&buffered))
                    } else {
                        CancelToken::none()
                    };

                    info!(
                        count = items.len(),
                        cancellable = options.supports_cancellation,
                        "quiet period elapsed; launching incremental run"
                    );
                    state = RunState::Running;
                    launch_stage(factory(items, token, output.clone()), done_tx.clone());
                }
            }
            Some(result) = done_rx.recv(), if state == RunState::Running => {
                relay_failure(&output, result).await;
                state = RunState::Idle;
                // Items buffered during the run stay put: the next arrival
                // (not run completion) schedules the flush.
                if !buffer.is_empty() {
                    debug!(
                        buffered = buffer.len(),
                        "run completed with items still buffered; waiting for next arrival"
                    );
                }
            }
        }
    }

    debug!("incremental runner loop ended");
}
