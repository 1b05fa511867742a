// src/runner/stage.rs

//! The stage contract shared by both controllers.
//!
//! A stage is one invocation of the wrapped build/transform operation: an
//! asynchronous unit of work that sends its output items onto the
//! controller's shared output channel and resolves exactly once with success
//! or failure. The controllers own stage invocation exclusively; they never
//! interpret item contents.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::item::Item;

/// Errors raised inside a stage are opaque to the controllers; they are
/// relayed on the output channel and never retried.
pub type StageError = anyhow::Error;

/// One invocation of a stage, boxed so factories can be plain closures.
pub type BoxStage = Pin<Box<dyn Future<Output = Result<(), StageError>> + Send>>;

/// Events relayed on a controller's shared output channel.
///
/// Output order from distinct runs follows launch order, since runs never
/// overlap.
#[derive(Debug)]
pub enum StageEvent {
    /// An item produced by the in-flight stage.
    Output(Item),
    /// The stage signalled failure; the run is over. The controller's own
    /// bookkeeping proceeds as if the run had completed normally.
    Failed(StageError),
}

/// Advisory cancellation predicate handed to cancellable stages.
///
/// This is a polled condition, not an imperative cancel message: it reads
/// "true" for as long as the controller's buffer is non-empty, i.e. as soon
/// as newer input has superseded the in-flight run. A stage that ignores it
/// simply runs to completion; the controller takes no corrective action.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    buffered: Option<Arc<AtomicUsize>>,
}

impl CancelToken {
    /// A token that never reports cancellation. Handed to non-cancellable
    /// runs (the initial run) and used whenever cancellation support is
    /// disabled.
    pub fn none() -> Self {
        Self { buffered: None }
    }

    /// A token observing the controller's buffered-item count.
    pub(crate) fn watching(buffered: Arc<AtomicUsize>) -> Self {
        Self {
            buffered: Some(buffered),
        }
    }

    /// Whether the stage should wind down early.
    pub fn is_cancellation_requested(&self) -> bool {
        self.buffered
            .as_ref()
            .is_some_and(|count| count.load(Ordering::SeqCst) > 0)
    }
}

/// Completion notification sent from the run wrapper task back into the
/// controller loop.
pub(crate) type RunDone = Result<(), StageError>;

/// Spawn a stage and report its completion on `done_tx` exactly once.
pub(crate) fn launch_stage(stage: BoxStage, done_tx: mpsc::Sender<RunDone>) {
    tokio::spawn(async move {
        let result = stage.await;
        if done_tx.send(result).await.is_err() {
            debug!("controller loop gone; dropping stage completion");
        }
    });
}

/// Relay a failed run onto the output channel.
pub(crate) async fn relay_failure(output: &mpsc::Sender<StageEvent>, result: RunDone) {
    if let Err(err) = result {
        warn!(error = %err, "stage run failed");
        if output.send(StageEvent::Failed(err)).await.is_err() {
            debug!("output channel closed; dropping stage failure");
        }
    }
}

/// Collect everything flowing out of a controller until its output channel
/// closes, failing on the first relayed stage error.
///
/// Mostly useful for one-shot pipelines and tests, where the driver wants a
/// single completion point instead of a stream.
pub async fn drain_output(mut output: mpsc::Receiver<StageEvent>) -> Result<Vec<Item>, StageError> {
    let mut items = Vec::new();
    while let Some(event) = output.recv().await {
        match event {
            StageEvent::Output(item) => items.push(item),
            StageEvent::Failed(err) => return Err(err),
        }
    }
    Ok(items)
}
