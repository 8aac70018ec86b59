//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for testing aof CLI behavior against a
//! temporary data directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Minimal project manifest used by most specs.
pub const MINIMAL_PROJECT: &str = "id: demo\n";

/// Project manifest with a two-gate workflow.
pub const WORKFLOW_PROJECT: &str = r#"
id: demo
workflow:
  gates:
    - id: dev
      role: developer
    - id: qa
      role: reviewer
      canReject: true
"#;

/// Roster with one team and two agents.
pub const BASIC_ORG: &str = r#"
teams:
  - id: alpha
    orchestrator: lead-1
agents:
  - id: lead-1
    team: alpha
    roles: [orchestrator]
  - id: a1
    team: alpha
    roles: [developer]
"#;

/// Roster with a queue-empty murmur trigger.
pub const MURMUR_ORG: &str = r#"
teams:
  - id: alpha
    orchestrator: lead-1
    murmur:
      triggers:
        - type: queueEmpty
agents:
  - id: lead-1
    team: alpha
    roles: [orchestrator]
  - id: a1
    team: alpha
    roles: [developer]
"#;

/// Returns the path to the aof binary built alongside the test binary.
fn aof_binary() -> PathBuf {
    // The test binary lives at target/debug/deps/specs-<hash>; the CLI is
    // built into target/debug/.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let candidate = debug_dir.join("aof");
            if candidate.exists() {
                return candidate;
            }
        }
    }
    Path::new(env!("CARGO_MANIFEST_DIR")).join("target/debug/aof")
}

/// A temporary data directory plus a CLI runner bound to it.
pub struct Project {
    pub dir: tempfile::TempDir,
}

impl Project {
    /// An empty data directory (no manifest).
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// A data directory with the minimal manifest and basic roster.
    pub fn basic() -> Self {
        let project = Self::empty();
        project.file("project.yaml", MINIMAL_PROJECT);
        project.file("org/org-chart.yaml", BASIC_ORG);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file under the data directory.
    pub fn file(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    /// Read a file under the data directory.
    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(rel)).unwrap()
    }

    /// Start building an aof invocation against this data directory.
    pub fn aof(&self) -> CliBuilder {
        CliBuilder::new(self.dir.path().to_path_buf())
    }

    /// Ids of records in one status bucket.
    pub fn tasks_in(&self, status: &str) -> Vec<String> {
        let dir = self.dir.path().join("tasks").join(status);
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .flatten()
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_suffix(".md").map(str::to_string)
            })
            .collect();
        ids.sort();
        ids
    }

    /// The raw record text for a task in a given bucket.
    pub fn record(&self, status: &str, id: &str) -> String {
        self.read(&format!("tasks/{status}/{id}.md"))
    }

    /// Every event line from the (single-day) event stream.
    pub fn events(&self) -> Vec<serde_json::Value> {
        let dir = self.dir.path().join("events");
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut lines = Vec::new();
        let mut files: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        files.sort();
        for file in files {
            let raw = std::fs::read_to_string(file).unwrap();
            for line in raw.lines() {
                if let Ok(value) = serde_json::from_str(line) {
                    lines.push(value);
                }
            }
        }
        lines
    }

    /// Whether any event of the given type exists.
    pub fn has_event(&self, kind: &str) -> bool {
        self.events().iter().any(|e| e["type"] == kind)
    }

    /// Rewrite one frontmatter field of a blocked task record (used to
    /// backdate timestamps in retry specs).
    pub fn rewrite_field(&self, status: &str, id: &str, field: &str, value: &str) {
        let rel = format!("tasks/{status}/{id}.md");
        let raw = self.read(&rel);
        let rewritten: Vec<String> = raw
            .lines()
            .map(|line| {
                let trimmed = line.trim_start();
                if trimmed.starts_with(&format!("{field}:")) {
                    let indent = &line[..line.len() - trimmed.len()];
                    format!("{indent}{field}: {value}")
                } else {
                    line.to_string()
                }
            })
            .collect();
        self.file(&rel, &(rewritten.join("\n") + "\n"));
    }
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    root: PathBuf,
    args: Vec<String>,
}

impl CliBuilder {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            args: Vec::new(),
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    fn output(&self) -> Output {
        Command::new(aof_binary())
            .args(&self.args)
            .env("AOF_ROOT", &self.root)
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run aof")
    }

    /// Run and require exit code 0.
    pub fn passes(self) -> Assertion {
        let output = self.output();
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        Assertion { output }
    }

    /// Run and require exit code 1.
    pub fn fails(self) -> Assertion {
        let output = self.output();
        assert_eq!(
            output.status.code(),
            Some(1),
            "expected exit 1\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        Assertion { output }
    }
}

/// Fluent assertions on a finished invocation.
pub struct Assertion {
    output: Output,
}

impl Assertion {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).to_string()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).to_string()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout().contains(needle),
            "stdout missing {needle:?}\nstdout: {}",
            self.stdout(),
        );
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(
            !self.stdout().contains(needle),
            "stdout unexpectedly contains {needle:?}\nstdout: {}",
            self.stdout(),
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr().contains(needle),
            "stderr missing {needle:?}\nstderr: {}",
            self.stderr(),
        );
        self
    }
}

/// Extract the task id from a `task create` stdout line.
pub fn created_id(assertion: &Assertion) -> String {
    let stdout = assertion.stdout();
    stdout
        .split_whitespace()
        .find(|w| w.starts_with("TASK-"))
        .expect("no task id in output")
        .to_string()
}
