// src/transform/mod.rs

//! Per-item pipeline transforms.
//!
//! These are the synchronous collaborators an orchestrator composes around
//! the runners: each one rewrites, annotates or filters [`Item`]s
//! (source-map handling, permission fixups, path rebasing, rule-based
//! filtering). None of them touch runner state.
//!
//! [`Item`]: crate::item::Item

pub mod filters;
pub mod perms;
pub mod sourcemap;

pub use filters::{partition, rebase, skip_directories, CleanRules};
pub use perms::{
    fix_win32_directory_permissions, ExecutableBit, EXECUTABLE_FILE_MODE, WIN32_DIRECTORY_MODE,
};
pub use sourcemap::{
    append_own_path_source_url, load_source_map, rewrite_source_mapping_url,
    strip_source_mapping_url,
};
