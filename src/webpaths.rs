// src/webpaths.rs

//! Third-party package entry-point resolution for a web bundle manifest.
//!
//! Given a manifest listing the packages a web build depends on, resolve
//! each package's browser entry point from its own manifest under
//! `node_modules/`, and optionally emit the result as a generated
//! `webPackagePaths.js` file or as a loader configuration for a remote
//! endpoint.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fsutil::ensure_dir;

/// Where the web dependency manifests live relative to the project root.
#[derive(Debug, Clone)]
pub struct WebPathsLayout {
    /// Project root containing `node_modules/`.
    pub root: PathBuf,

    /// Manifest whose `dependencies` map lists the web packages.
    pub web_manifest: PathBuf,

    /// Optional overlay manifest whose dependencies take precedence; skipped
    /// silently when the file does not exist.
    pub overlay_manifest: Option<PathBuf>,
}

/// The subset of a package manifest this module reads.
#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,

    #[serde(default)]
    browser: Option<Value>,

    #[serde(default)]
    main: Option<String>,
}

/// Loader configuration pointing a web client at a remote build endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLoaderConfig {
    pub base_url: String,
    pub record_stats: bool,
    pub paths: BTreeMap<String, String>,
}

fn read_manifest(path: &Path) -> Result<PackageManifest> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading manifest at {path:?}"))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Resolve the entry point of every web dependency.
///
/// Resolution per package, from its manifest under `node_modules/<name>/`:
/// a string-valued `browser` field wins, then `main`; packages without
/// either are assumed to ship `dist/<name>.min.js` (with a warning). Leading
/// `./` or `/` is stripped, and when a plain `.js` entry has a `.min.js`
/// sibling on disk, the minified one is preferred.
pub fn acquire_web_node_paths(layout: &WebPathsLayout) -> Result<BTreeMap<String, String>> {
    let mut dependencies = read_manifest(&layout.web_manifest)?.dependencies;

    if let Some(overlay) = &layout.overlay_manifest {
        if overlay.exists() {
            let extra = read_manifest(overlay)?.dependencies;
            debug!(count = extra.len(), "merging overlay manifest dependencies");
            dependencies.extend(extra);
        }
    }

    let node_modules = layout.root.join("node_modules");
    let mut node_paths = BTreeMap::new();

    for name in dependencies.keys() {
        let manifest_path = node_modules.join(name).join("package.json");
        let manifest = read_manifest(&manifest_path)?;

        // Only string-valued `browser` fields are handled; object forms are
        // per-file remappings this manifest cannot express.
        let mut entry_point = match manifest.browser {
            Some(Value::String(s)) => s,
            _ => manifest.main.unwrap_or_default(),
        };

        if entry_point.is_empty() {
            warn!(package = %name, "no entry point; assuming dist/{name}.min.js");
            entry_point = format!("dist/{name}.min.js");
        }

        // Normalize to a path relative to the package directory.
        if let Some(rest) = entry_point.strip_prefix("./") {
            entry_point = rest.to_string();
        } else if let Some(rest) = entry_point.strip_prefix('/') {
            entry_point = rest.to_string();
        }

        if let Some(minified) = minified_sibling(&entry_point) {
            if node_modules.join(name).join(&minified).exists() {
                entry_point = minified;
            }
        }

        node_paths.insert(name.clone(), entry_point);
    }

    Ok(node_paths)
}

/// `foo.js` -> `foo.min.js`, unless the entry is already minified or is not
/// a `.js` file at all.
fn minified_sibling(entry_point: &str) -> Option<String> {
    let lower = entry_point.to_ascii_lowercase();
    if !lower.ends_with(".js") || lower.ends_with(".min.js") {
        return None;
    }
    let stem = &entry_point[..entry_point.len() - ".js".len()];
    Some(format!("{stem}.min.js"))
}

/// Build a loader config for a remote web endpoint.
///
/// Returns `None` unless endpoint, commit and quality are all present; the
/// resolved entry points are re-rooted at `../node_modules/` relative to the
/// served output directory.
pub fn create_external_loader_config(
    layout: &WebPathsLayout,
    web_endpoint: Option<&str>,
    commit: Option<&str>,
    quality: Option<&str>,
) -> Result<Option<ExternalLoaderConfig>> {
    let (Some(endpoint), Some(commit), Some(quality)) = (web_endpoint, commit, quality) else {
        return Ok(None);
    };

    let endpoint = format!("{endpoint}/{quality}/{commit}");

    let mut paths = acquire_web_node_paths(layout)?;
    for (name, entry_point) in paths.iter_mut() {
        *entry_point = format!("../node_modules/{name}/{entry_point}");
    }

    Ok(Some(ExternalLoaderConfig {
        base_url: format!("{endpoint}/out"),
        record_stats: true,
        paths,
    }))
}

const GENERATED_FILE_WARNING: &str = "// This file is generated. Do not edit.";

/// Resolve the web node paths and write them as a generated
/// `webPackagePaths.js` under `out_dir` (relative to the layout root).
/// Returns the path of the written file.
pub fn build_web_node_paths(layout: &WebPathsLayout, out_dir: &Path) -> Result<PathBuf> {
    let node_paths = acquire_web_node_paths(layout)?;

    let out_directory = layout.root.join(out_dir);
    ensure_dir(&out_directory)?;

    let body = serde_json::to_string_pretty(&node_paths)?;
    let contents = format!("{GENERATED_FILE_WARNING}\nself.webPackagePaths = {body};\n");

    let out_path = out_directory.join("webPackagePaths.js");
    fs::write(&out_path, contents)
        .with_context(|| format!("writing web package paths to {out_path:?}"))?;

    info!(path = %out_path.display(), packages = node_paths.len(), "wrote web package paths");
    Ok(out_path)
}
