// src/runner/debounce.rs

//! Debounced re-run controller.
//!
//! Wraps a zero-input stage factory. The first run launches immediately on
//! construction; afterwards, trigger signals either schedule a debounced
//! re-run (while idle) or mark the in-flight run stale so that a debounced
//! re-run is scheduled once it completes. Rapid trigger bursts coalesce into
//! a single run, launched one quiet period after the last signal.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::runner::stage::{launch_stage, relay_failure, BoxStage, RunDone, StageEvent};
use crate::runner::state::{self, RunState, TimerAction};
use crate::runner::timer::DebounceTimer;

/// Default quiet period for both controllers.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Handle to a spawned debounced re-run controller.
///
/// Dropping all trigger senders shuts the controller down once any pending
/// run (including a pending stale re-run) has finished; dropping the handle
/// alone is enough when `sender()` was never used.
#[derive(Debug, Clone)]
pub struct DebouncedRunner {
    trigger_tx: mpsc::Sender<()>,
}

impl DebouncedRunner {
    /// Spawn a controller around `task` with the default quiet period,
    /// immediately launching the first run. Every run's output is relayed
    /// onto `output`.
    pub fn spawn<F>(task: F, output: mpsc::Sender<StageEvent>) -> Self
    where
        F: FnMut(mpsc::Sender<StageEvent>) -> BoxStage + Send + 'static,
    {
        Self::with_quiet_period(task, DEFAULT_QUIET_PERIOD, output)
    }

    /// Spawn with an explicit quiet period.
    pub fn with_quiet_period<F>(
        task: F,
        quiet: Duration,
        output: mpsc::Sender<StageEvent>,
    ) -> Self
    where
        F: FnMut(mpsc::Sender<StageEvent>) -> BoxStage + Send + 'static,
    {
        let (trigger_tx, trigger_rx) = mpsc::channel(64);
        tokio::spawn(run_loop(task, quiet, output, trigger_rx));
        Self { trigger_tx }
    }

    /// Signal that the wrapped stage should re-run.
    pub async fn trigger(&self) -> crate::errors::Result<()> {
        self.trigger_tx
            .send(())
            .await
            .map_err(|_| PipelineError::ControllerClosed)
    }

    /// A clonable trigger sender for external drivers.
    pub fn sender(&self) -> mpsc::Sender<()> {
        self.trigger_tx.clone()
    }
}

async fn run_loop<F>(
    mut task: F,
    quiet: Duration,
    output: mpsc::Sender<StageEvent>,
    mut trigger_rx: mpsc::Receiver<()>,
) where
    F: FnMut(mpsc::Sender<StageEvent>) -> BoxStage + Send + 'static,
{
    let mut timer = DebounceTimer::new(quiet);
    // Held for the lifetime of the loop so `done_rx.recv()` never observes
    // a closed channel while a run could still be launched.
    let (done_tx, mut done_rx) = mpsc::channel::<RunDone>(1);
    let mut input_open = true;

    // The first run launches on construction.
    info!("debounced runner started; launching initial run");
    let mut state = RunState::Running;
    launch_stage(task(output.clone()), done_tx.clone());

    loop {
        if !input_open && state == RunState::Idle && !timer.is_armed() {
            break;
        }

        tokio::select! {
            maybe = trigger_rx.recv(), if input_open => match maybe {
                Some(()) => {
                    let (next, action) = state::on_signal(state);
                    debug!(?state, ?next, "trigger received");
                    state = next;
                    if action == TimerAction::Arm {
                        timer.arm();
                    }
                }
                None => input_open = false,
            },
            _ = timer.fired(), if timer.is_armed() => {
                timer.disarm();
                debug!("quiet period elapsed; launching debounced re-run");
                state = RunState::Running;
                launch_stage(task(output.clone()), done_tx.clone());
            }
            Some(result) = done_rx.recv(), if state != RunState::Idle => {
                relay_failure(&output, result).await;
                let (next, action) = state::on_run_complete(state);
                debug!(?state, ?next, "run completed");
                state = next;
                if action == TimerAction::Arm {
                    timer.arm();
                }
            }
        }
    }

    debug!("debounced runner loop ended");
}
