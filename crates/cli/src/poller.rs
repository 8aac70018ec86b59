// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rescan loop helper for the watch command.
//!
//! Wraps the interval + Ctrl+C pattern so the watch loop body stays a plain
//! rescan-and-render function.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Result of waiting for the next rescan tick.
pub enum Tick {
    /// Ready for the next rescan.
    Ready,
    /// Ctrl+C was pressed.
    Interrupted,
}

/// Interval ticker with Ctrl+C handling.
pub struct Poller {
    interval: Duration,
    ctrl_c: Pin<Box<dyn Future<Output = std::io::Result<()>>>>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ctrl_c: Box::pin(tokio::signal::ctrl_c()),
        }
    }

    /// Sleep one interval; wakes early with [`Tick::Interrupted`] on Ctrl+C.
    pub async fn tick(&mut self) -> Tick {
        tokio::select! {
            _ = &mut self.ctrl_c => Tick::Interrupted,
            _ = tokio::time::sleep(self.interval) => Tick::Ready,
        }
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
