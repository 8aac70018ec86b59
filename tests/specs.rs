//! Behavioral specifications for the aof CLI.
//!
//! These tests are black-box: they invoke the CLI binary and verify
//! stdout, stderr, exit codes, and the data directory left behind.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// task/
#[path = "specs/task/crud.rs"]
mod task_crud;
#[path = "specs/task/deps.rs"]
mod task_deps;

// scheduler/
#[path = "specs/scheduler/dispatch.rs"]
mod scheduler_dispatch;
#[path = "specs/scheduler/failures.rs"]
mod scheduler_failures;
#[path = "specs/scheduler/murmur.rs"]
mod scheduler_murmur;

// config/
#[path = "specs/config/lint.rs"]
mod config_lint;
#[path = "specs/config/org.rs"]
mod config_org;

// views/
#[path = "specs/views.rs"]
mod views;
