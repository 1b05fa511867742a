// src/version.rs

//! Semantic-version parsing for build metadata.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{PipelineError, Result};

static SEMVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("hard-coded regex"));

/// Collapse the first `major.minor.patch` triple found in `version` into a
/// single comparable number: `major * 10_000 + minor * 100 + patch`.
///
/// Surrounding text (a leading `v`, a `-insider` suffix) is ignored; a
/// string with no triple at all is an error.
pub fn version_string_to_number(version: &str) -> Result<u32> {
    let caps = SEMVER
        .captures(version)
        .ok_or_else(|| PipelineError::InvalidVersion(version.to_string()))?;

    let part = |idx: usize| -> Result<u32> {
        caps[idx]
            .parse::<u32>()
            .map_err(|_| PipelineError::InvalidVersion(version.to_string()))
    };

    Ok(part(1)? * 10_000 + part(2)? * 100 + part(3)?)
}
