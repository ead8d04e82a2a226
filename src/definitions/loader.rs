//! Loading server profiles and test files from disk

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::common::config::RunConfig;
use crate::common::{Error, Result};

use super::server::ServerProfile;
use super::test_case::TestCase;

/// Suffix recognized as a test file
pub const TEST_FILE_SUFFIX: &str = ".test.json";

/// File run serially before everything else
pub const SETUP_FILE: &str = "setup.test.json";

/// File run serially after everything else
pub const TEARDOWN_FILE: &str = "teardown.test.json";

/// Tests loaded from one file, in file order
#[derive(Debug, Clone)]
pub struct TestFile {
    /// File name, e.g. `users.test.json`
    pub name: String,
    pub tests: Vec<TestCase>,
}

/// Everything a run needs to execute
#[derive(Debug, Clone, Default)]
pub struct Suite {
    /// Regular test files, sorted by name
    pub files: Vec<TestFile>,
    pub setup: Option<TestFile>,
    pub teardown: Option<TestFile>,
}

#[derive(Deserialize)]
struct TestFileContent {
    #[serde(default, alias = "Tests")]
    tests: Vec<TestCase>,
}

impl Suite {
    /// Number of tests across regular files
    pub fn test_count(&self) -> usize {
        self.files.iter().map(|f| f.tests.len()).sum()
    }

    /// All files including setup and teardown
    pub fn all_files(&self) -> impl Iterator<Item = &TestFile> {
        self.setup
            .iter()
            .chain(self.files.iter())
            .chain(self.teardown.iter())
    }

    /// Ensure every test points at a known server
    pub fn check_servers(&self, servers: &BTreeMap<String, ServerProfile>) -> Result<()> {
        for test in self.all_files().flat_map(|f| f.tests.iter()) {
            if !test.server.is_empty() && !servers.contains_key(&test.server) {
                return Err(Error::UnknownServer {
                    test: test.name.clone(),
                    server: test.server.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Read and validate the server profiles file
pub fn load_servers(config: &RunConfig) -> Result<BTreeMap<String, ServerProfile>> {
    let path = &config.servers_file;
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    let mut servers: BTreeMap<String, ServerProfile> = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("cannot decode file '{}': {}", path.display(), e)))?;

    for (name, server) in servers.iter_mut() {
        server.prepare(name, config)?;
    }
    Ok(servers)
}

/// Read every `*.test.json` file in the tests directory
pub fn load_suite(config: &RunConfig) -> Result<Suite> {
    let dir = &config.tests_dir;
    let entries = std::fs::read_dir(dir).map_err(|e| Error::file_read(dir, &e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(TEST_FILE_SUFFIX) && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();

    // name -> whether that test loads files
    let mut unique: HashMap<String, bool> = HashMap::new();
    let mut suite = Suite::default();

    for name in names {
        match name.as_str() {
            SETUP_FILE => {
                suite.setup = Some(load_file(dir, &name, &mut unique)?);
                continue;
            }
            TEARDOWN_FILE => {
                suite.teardown = Some(load_file(dir, &name, &mut unique)?);
                continue;
            }
            _ => {}
        }

        if let Some(filter) = &config.file {
            if !matches_file_filter(&name, filter) {
                continue;
            }
        }

        let mut file = load_file(dir, &name, &mut unique)?;
        if file.tests.is_empty() {
            tracing::info!("Skipping '{}': no tests found in file", name);
            continue;
        }

        if let Some(wanted) = &config.test {
            let found = file.tests.drain(..).find(|t| &t.name == wanted);
            if let Some(test) = found {
                file.tests.push(test);
                suite.files.push(file);
                break;
            }
            continue;
        }

        suite.files.push(file);
    }

    if let Some(filter) = &config.file {
        if suite.files.is_empty() && config.test.is_none() {
            return Err(Error::Config(format!("no test file named '{}'", filter)));
        }
    }
    if let Some(wanted) = &config.test {
        if suite.files.is_empty() {
            return Err(Error::Config(format!("no test named '{}'", wanted)));
        }
    }

    Ok(suite)
}

fn matches_file_filter(name: &str, filter: &str) -> bool {
    name == filter || name.strip_suffix(TEST_FILE_SUFFIX) == Some(filter)
}

fn load_file(dir: &Path, name: &str, unique: &mut HashMap<String, bool>) -> Result<TestFile> {
    let path = dir.join(name);
    let content = std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, &e))?;
    let parsed: TestFileContent = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("cannot decode json file '{}': {}", name, e)))?;

    let mut tests = parsed.tests;
    for test in &mut tests {
        test.substitute_env();
        test.validate()?;

        let uses_files = test.uses_file_refs();
        match unique.get(&test.name) {
            None => {
                unique.insert(test.name.clone(), uses_files);
            }
            Some(&seen_uses_files) => {
                tracing::warn!("Two tests with the same name ({})", test.name);
                if seen_uses_files && uses_files {
                    tracing::warn!(
                        "Potential conflict: two tests with the same name ({}) are using @file",
                        test.name
                    );
                }
                if !seen_uses_files {
                    unique.insert(test.name.clone(), uses_files);
                }
            }
        }

        resolve_file_refs(dir, test)?;
    }

    Ok(TestFile {
        name: name.to_string(),
        tests,
    })
}

/// Which side of a test a file reference fills
#[derive(Clone, Copy)]
enum FileRef {
    Payload,
    Expected,
}

impl FileRef {
    fn default_file(self, test: &str) -> String {
        match self {
            FileRef::Payload => format!("{}.payload.json", test),
            FileRef::Expected => format!("{}.expected.json", test),
        }
    }

    fn fallback_file(self, test: &str) -> String {
        match self {
            FileRef::Payload => format!("payload/{}.json", test),
            FileRef::Expected => format!("expected/{}.json", test),
        }
    }
}

fn resolve_file_refs(dir: &Path, test: &mut TestCase) -> Result<()> {
    if let Some(reference) = test.payload.strip_prefix('@') {
        test.payload = read_reference(dir, &test.name, reference, FileRef::Payload)?;
    }
    if let Some(reference) = test.expected.response.strip_prefix('@') {
        test.expected.response = read_reference(dir, &test.name, reference, FileRef::Expected)?;
    }
    Ok(())
}

fn read_reference(dir: &Path, test: &str, reference: &str, kind: FileRef) -> Result<String> {
    let lower = test.to_lowercase();
    let file = if reference == "file" {
        kind.default_file(&lower)
    } else {
        reference.to_string()
    };

    if let Ok(content) = std::fs::read_to_string(dir.join(&file)) {
        return Ok(content);
    }

    let fallback = dir.join(kind.fallback_file(&lower));
    std::fs::read_to_string(&fallback).map_err(|e| Error::file_read(&fallback, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn config(dir: &Path) -> RunConfig {
        RunConfig::new(dir.join("servers.json"), dir)
    }

    const TWO_TESTS: &str = r#"{"tests": [
        {"name": "first", "server": "api", "method": "GET", "endpoint": "/a",
         "expected": {"statusCode": 200}},
        {"name": "second", "server": "api", "method": "GET", "endpoint": "/b",
         "expected": {"statusCode": 200}}
    ]}"#;

    #[test]
    fn test_load_suite_sorts_and_splits_special_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.test.json", TWO_TESTS.replace("first", "b1").replace("second", "b2").as_str());
        write(dir.path(), "a.test.json", TWO_TESTS);
        write(dir.path(), "setup.test.json", r#"{"tests": [
            {"name": "seed", "server": "api", "method": "POST", "endpoint": "/seed",
             "expected": {"statusCode": 201}}]}"#);
        write(dir.path(), "notes.json", "{}");

        let suite = load_suite(&config(dir.path())).unwrap();
        let names: Vec<&str> = suite.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.test.json", "b.test.json"]);
        assert_eq!(suite.test_count(), 4);
        assert_eq!(suite.setup.as_ref().map(|f| f.tests.len()), Some(1));
        assert!(suite.teardown.is_none());
    }

    #[test]
    fn test_empty_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "empty.test.json", r#"{"tests": []}"#);
        write(dir.path(), "a.test.json", TWO_TESTS);
        let suite = load_suite(&config(dir.path())).unwrap();
        assert_eq!(suite.files.len(), 1);
    }

    #[test]
    fn test_file_and_test_filters() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.test.json", TWO_TESTS);
        write(dir.path(), "b.test.json", TWO_TESTS.replace("first", "b1").replace("second", "b2").as_str());

        let mut cfg = config(dir.path());
        cfg.file = Some("b".to_string());
        let suite = load_suite(&cfg).unwrap();
        assert_eq!(suite.files.len(), 1);
        assert_eq!(suite.files[0].name, "b.test.json");

        let mut cfg = config(dir.path());
        cfg.test = Some("second".to_string());
        let suite = load_suite(&cfg).unwrap();
        assert_eq!(suite.files.len(), 1);
        assert_eq!(suite.files[0].tests.len(), 1);
        assert_eq!(suite.files[0].tests[0].name, "second");

        let mut cfg = config(dir.path());
        cfg.test = Some("missing".to_string());
        assert!(load_suite(&cfg).is_err());
    }

    #[test]
    fn test_at_file_references() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.test.json", r#"{"tests": [
            {"name": "Create", "server": "api", "method": "POST", "endpoint": "/a",
             "payload": "@file", "expected": {"statusCode": 201, "response": "@file"}},
            {"name": "update", "server": "api", "method": "PUT", "endpoint": "/a",
             "payload": "@shared.json", "expected": {"statusCode": 200, "response": "@file"}}
        ]}"#);
        write(dir.path(), "create.payload.json", r#"{"name":"x"}"#);
        write(dir.path(), "create.expected.json", r#"{"id":"1"}"#);
        write(dir.path(), "shared.json", r#"{"name":"y"}"#);
        write(dir.path(), "expected/update.json", r#"{"ok":true}"#);

        let suite = load_suite(&config(dir.path())).unwrap();
        let tests = &suite.files[0].tests;
        assert_eq!(tests[0].payload, r#"{"name":"x"}"#);
        assert_eq!(tests[0].expected.response, r#"{"id":"1"}"#);
        assert_eq!(tests[1].payload, r#"{"name":"y"}"#);
        assert_eq!(tests[1].expected.response, r#"{"ok":true}"#);
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.test.json", r#"{"tests": [
            {"name": "nope", "server": "api", "method": "POST", "endpoint": "/a",
             "payload": "@file", "expected": {"statusCode": 201}}]}"#);
        assert!(matches!(
            load_suite(&config(dir.path())),
            Err(Error::FileRead { .. })
        ));
    }

    #[test]
    fn test_invalid_test_aborts_loading() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.test.json", r#"{"tests": [
            {"name": "a.b", "server": "api", "method": "GET", "endpoint": "/",
             "expected": {"statusCode": 200}}]}"#);
        assert!(matches!(
            load_suite(&config(dir.path())),
            Err(Error::InvalidTest { .. })
        ));
    }

    #[test]
    fn test_load_servers_and_check_references() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "servers.json", r#"{"api": {"host": "http://localhost:1"}}"#);
        write(dir.path(), "a.test.json", r#"{"tests": [
            {"name": "x", "server": "other", "method": "GET", "endpoint": "/",
             "expected": {"statusCode": 200}}]}"#);

        let cfg = config(dir.path());
        let servers = load_servers(&cfg).unwrap();
        assert!(servers.contains_key("api"));

        let suite = load_suite(&cfg).unwrap();
        assert!(matches!(
            suite.check_servers(&servers),
            Err(Error::UnknownServer { .. })
        ));
    }
}
