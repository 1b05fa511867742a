// src/lib.rs

//! Build-pipeline helpers: debounced/incremental stage runners plus the small
//! file, version and manifest utilities that surround them.
//!
//! The core of the crate lives in [`runner`]:
//!
//! - [`runner::DebouncedRunner`] wraps a zero-input build stage and coalesces
//!   rapid re-run triggers into a single run after a quiet period.
//! - [`runner::IncrementalRunner`] generalizes this to per-invocation input:
//!   changed items are buffered (last write wins per path) while a run is in
//!   flight and fed into the next run, with an advisory cancellation predicate
//!   exposed to the in-flight stage.
//!
//! Everything else is collaborator material wired around the runners by an
//! external orchestrator: per-item transforms ([`transform`]), file-system
//! utilities ([`fsutil`]), semantic-version parsing ([`version`]) and
//! web-bundle entry-point resolution ([`webpaths`]).

pub mod errors;
pub mod fsutil;
pub mod item;
pub mod logging;
pub mod runner;
pub mod transform;
pub mod version;
pub mod webpaths;

pub use item::{Item, SourceMap};
pub use runner::{
    drain_output, BoxStage, CancelToken, DebouncedRunner, IncrementalOptions, IncrementalRunner,
    StageError, StageEvent, DEFAULT_QUIET_PERIOD,
};
