// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console notification adapter.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;

/// Notification adapter that prints to stderr.
///
/// The default for interactive CLI use: deadletters, SLA violations, and
/// escalations land in the operator's terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifyAdapter;

impl ConsoleNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for ConsoleNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        eprintln!("[aof] {title}: {message}");
        Ok(())
    }
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
