use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use stagepipe::webpaths::{
    acquire_web_node_paths, build_web_node_paths, create_external_loader_config, WebPathsLayout,
};
use stagepipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

/// Lay out a fake project: a web manifest naming the dependencies, and a
/// `node_modules/<name>/package.json` (plus entry files) for each package.
struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new(dependencies: &[&str]) -> Result<Self, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().to_path_buf();

        let deps: serde_json::Map<String, serde_json::Value> = dependencies
            .iter()
            .map(|name| (name.to_string(), json!("1.0.0")))
            .collect();
        fs::write(
            root.join("package.json"),
            json!({ "dependencies": deps }).to_string(),
        )?;

        Ok(Self { _dir: dir, root })
    }

    fn layout(&self) -> WebPathsLayout {
        WebPathsLayout {
            root: self.root.clone(),
            web_manifest: self.root.join("package.json"),
            overlay_manifest: Some(self.root.join("overlay.json")),
        }
    }

    fn add_package(&self, name: &str, manifest: serde_json::Value) -> TestResult {
        let pkg = self.root.join("node_modules").join(name);
        fs::create_dir_all(&pkg)?;
        fs::write(pkg.join("package.json"), manifest.to_string())?;
        Ok(())
    }

    fn add_file(&self, name: &str, rel: &str) -> TestResult {
        let path = self.root.join("node_modules").join(name).join(rel);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(path, "// entry")?;
        Ok(())
    }
}

#[test]
fn browser_field_wins_and_minified_sibling_is_preferred() -> TestResult {
    init_tracing();

    let fx = Fixture::new(&["widget"])?;
    fx.add_package(
        "widget",
        json!({ "browser": "lib/widget.js", "main": "index.js" }),
    )?;
    fx.add_file("widget", "lib/widget.js")?;
    fx.add_file("widget", "lib/widget.min.js")?;

    let paths = acquire_web_node_paths(&fx.layout())?;
    assert_eq!(paths["widget"], "lib/widget.min.js");

    Ok(())
}

#[test]
fn main_field_is_used_when_browser_is_absent_or_an_object() -> TestResult {
    let fx = Fixture::new(&["plain", "mapped"])?;
    fx.add_package("plain", json!({ "main": "./index.js" }))?;
    fx.add_package(
        "mapped",
        json!({ "browser": { "fs": false }, "main": "/lib/mapped.js" }),
    )?;

    let paths = acquire_web_node_paths(&fx.layout())?;
    assert_eq!(paths["plain"], "index.js", "leading ./ is stripped");
    assert_eq!(paths["mapped"], "lib/mapped.js", "leading / is stripped");

    Ok(())
}

#[test]
fn missing_entry_point_falls_back_to_dist_min_js() -> TestResult {
    init_tracing();

    let fx = Fixture::new(&["bare"])?;
    fx.add_package("bare", json!({}))?;

    let paths = acquire_web_node_paths(&fx.layout())?;
    assert_eq!(paths["bare"], "dist/bare.min.js");

    Ok(())
}

#[test]
fn already_minified_entries_are_left_alone() -> TestResult {
    let fx = Fixture::new(&["slim"])?;
    fx.add_package("slim", json!({ "main": "slim.min.js" }))?;
    fx.add_file("slim", "slim.min.js")?;
    fx.add_file("slim", "slim.min.min.js")?;

    let paths = acquire_web_node_paths(&fx.layout())?;
    assert_eq!(paths["slim"], "slim.min.js");

    Ok(())
}

#[test]
fn overlay_manifest_dependencies_are_merged_in() -> TestResult {
    let fx = Fixture::new(&["base-pkg"])?;
    fx.add_package("base-pkg", json!({ "main": "index.js" }))?;
    fx.add_package("extra-pkg", json!({ "main": "extra.js" }))?;
    fs::write(
        fx.root.join("overlay.json"),
        json!({ "dependencies": { "extra-pkg": "1.0.0" } }).to_string(),
    )?;

    let paths = acquire_web_node_paths(&fx.layout())?;
    assert_eq!(paths.len(), 2);
    assert_eq!(paths["base-pkg"], "index.js");
    assert_eq!(paths["extra-pkg"], "extra.js");

    Ok(())
}

#[test]
fn loader_config_requires_endpoint_commit_and_quality() -> TestResult {
    let fx = Fixture::new(&[])?;

    let config =
        create_external_loader_config(&fx.layout(), Some("https://cdn.test"), Some("abc"), None)?;
    assert!(config.is_none());

    Ok(())
}

#[test]
fn loader_config_reroots_paths_under_node_modules() -> TestResult {
    let fx = Fixture::new(&["widget"])?;
    fx.add_package("widget", json!({ "main": "index.js" }))?;

    let config = create_external_loader_config(
        &fx.layout(),
        Some("https://cdn.test"),
        Some("abc123"),
        Some("stable"),
    )?
    .expect("all parts present");

    assert_eq!(config.base_url, "https://cdn.test/stable/abc123/out");
    assert!(config.record_stats);
    assert_eq!(config.paths["widget"], "../node_modules/widget/index.js");

    let rendered = serde_json::to_value(&config)?;
    assert!(rendered.get("baseUrl").is_some(), "camelCase on the wire");
    assert!(rendered.get("recordStats").is_some());

    Ok(())
}

#[test]
fn build_writes_a_generated_web_package_paths_file() -> TestResult {
    init_tracing();

    let fx = Fixture::new(&["widget"])?;
    fx.add_package("widget", json!({ "main": "index.js" }))?;

    let out_path = build_web_node_paths(&fx.layout(), Path::new("out/dist"))?;
    assert_eq!(out_path, fx.root.join("out/dist/webPackagePaths.js"));

    let contents = fs::read_to_string(&out_path)?;
    assert!(contents.starts_with("// This file is generated. Do not edit.\n"));
    assert!(contents.contains("self.webPackagePaths = {"));
    assert!(contents.contains("\"widget\": \"index.js\""));

    Ok(())
}
