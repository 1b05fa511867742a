// src/fsutil/mod.rs

//! File-system utilities used around the build pipeline.

use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context;
use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::Result;

const RIMRAF_MAX_ATTEMPTS: u32 = 5;
const RIMRAF_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Recursively remove a directory tree.
///
/// Removal can race with processes still releasing handles inside the tree
/// (common on Windows), surfacing as a not-empty error; those are retried up
/// to five times with a short pause. A missing directory is success.
pub async fn rimraf(dir: &Path) -> Result<()> {
    rimraf_with(dir, |dir: PathBuf| tokio::fs::remove_dir_all(dir)).await
}

/// [`rimraf`] with the removal operation injected, so the retry policy can be
/// exercised against failure patterns the real filesystem will not produce on
/// demand.
pub async fn rimraf_with<F, Fut>(dir: &Path, mut remove: F) -> Result<()>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;
        match remove(dir.to_path_buf()).await {
            Ok(()) => {
                debug!(dir = %dir.display(), "removed directory tree");
                return Ok(());
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err)
                if err.kind() == io::ErrorKind::DirectoryNotEmpty
                    && attempts < RIMRAF_MAX_ATTEMPTS =>
            {
                warn!(
                    dir = %dir.display(),
                    attempts,
                    "directory not empty during removal; retrying"
                );
                sleep(RIMRAF_RETRY_DELAY).await;
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("removing directory tree at {dir:?}"))
                    .into());
            }
        }
    }
}

/// Recursively list all files under `dir`.
///
/// Entries are returned as `/`-separated paths relative to `dir`, each with
/// a leading `/` (e.g. `"/sub/file.txt"`); directories themselves are not
/// listed.
pub fn rreaddir(dir: &Path) -> Result<Vec<String>> {
    let mut result = Vec::new();
    walk(dir, "", &mut result)?;
    Ok(result)
}

fn walk(dir: &Path, prepend: &str, result: &mut Vec<String>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading directory {dir:?}"))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("reading entry in {dir:?}"))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat for {:?}", entry.path()))?;

        if file_type.is_dir() {
            walk(&dir.join(&name), &format!("{prepend}/{name}"), result)?;
        } else {
            result.push(format!("{prepend}/{name}"));
        }
    }

    Ok(())
}

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating directory {dir:?}"))?;
    Ok(())
}

/// A Windows drive-letter prefix like `c:` at the start of a path string.
static DRIVE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)([a-z]):(.*)$").expect("hard-coded regex"));

/// Convert a path into a `file://` URI string.
///
/// Windows drive letters are upper-cased and prefixed with `/`, and
/// backslashes are flattened to forward slashes.
pub fn to_file_uri(path: &Path) -> String {
    let mut s = path.to_string_lossy().into_owned();

    if let Some(caps) = DRIVE_LETTER.captures(&s) {
        s = format!("/{}:{}", caps[1].to_uppercase(), &caps[2]);
    }

    format!("file://{}", s.replace('\\', "/"))
}
