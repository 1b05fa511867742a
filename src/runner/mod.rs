// src/runner/mod.rs

//! Debounced and incremental stage runners.
//!
//! - [`state`] holds the pure run-state machine shared by both controllers.
//! - [`timer`] is the resettable quiet-period timer, one per controller.
//! - [`stage`] defines the stage/output contract: the stage future, the
//!   output event channel, and the polled cancellation token.
//! - [`debounce`] is the trigger-only controller; [`incremental`] the
//!   item-buffering one.

pub mod debounce;
pub mod incremental;
pub mod stage;
pub mod state;
pub mod timer;

pub use debounce::{DebouncedRunner, DEFAULT_QUIET_PERIOD};
pub use incremental::{IncrementalOptions, IncrementalRunner};
pub use stage::{drain_output, BoxStage, CancelToken, StageError, StageEvent};
pub use state::{RunState, TimerAction};
pub use timer::DebounceTimer;
