// src/runner/state.rs

//! Pure run-state machine shared by both controllers.
//!
//! The state is the sole coordination variable between the event-arrival
//! path and the run-completion path. Transitions are pure functions returning
//! the next state plus the timer action the async shell should perform, so
//! they can be tested without Tokio, channels, or time.

/// Lifecycle of a controller's (single) run slot.
///
/// - `Idle`: no run in flight.
/// - `Running`: a run is in flight.
/// - `Stale`: a run is in flight and a trigger arrived meanwhile; a debounced
///   re-run must be scheduled once the run completes. Only the debounce-only
///   controller uses this value; the incremental controller tracks pending
///   work in its buffer instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stale,
}

/// What the shell should do with its debounce timer after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Arm (or re-arm, resetting the deadline of) the quiet-period timer.
    Arm,
    /// Leave the timer alone.
    None,
}

/// Transition for the debounce-only controller when a trigger signal arrives.
///
/// While idle, the signal schedules a debounced re-run; while a run is in
/// flight it only marks the run stale and does NOT re-trigger immediately.
pub fn on_signal(state: RunState) -> (RunState, TimerAction) {
    match state {
        RunState::Idle => (RunState::Idle, TimerAction::Arm),
        RunState::Running | RunState::Stale => (RunState::Stale, TimerAction::None),
    }
}

/// Transition for the debounce-only controller when the in-flight run
/// completes (successfully or not).
///
/// A stale run schedules the debounced re-run; otherwise the controller goes
/// back to idle.
pub fn on_run_complete(state: RunState) -> (RunState, TimerAction) {
    match state {
        RunState::Stale => (RunState::Idle, TimerAction::Arm),
        RunState::Idle | RunState::Running => (RunState::Idle, TimerAction::None),
    }
}

/// Transition for the incremental controller when a changed item arrives
/// (after it has been stored into the buffer).
///
/// Arrivals only schedule a flush while idle; while a run is in flight the
/// buffered item simply waits for a later arrival-triggered flush.
pub fn on_arrival(state: RunState) -> TimerAction {
    match state {
        RunState::Idle => TimerAction::Arm,
        RunState::Running | RunState::Stale => TimerAction::None,
    }
}
