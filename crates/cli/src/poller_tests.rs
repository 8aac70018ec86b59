// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn ticks_after_interval() {
    let mut poller = Poller::new(Duration::from_millis(5));
    assert!(matches!(poller.tick().await, Tick::Ready));
}

#[tokio::test]
async fn ticks_repeatedly() {
    let mut poller = Poller::new(Duration::from_millis(1));
    for _ in 0..3 {
        assert!(matches!(poller.tick().await, Tick::Ready));
    }
}
