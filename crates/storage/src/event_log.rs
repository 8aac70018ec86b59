// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only daily event streams.
//!
//! One JSON object per line under `events/YYYY-MM-DD.jsonl`. Event ids are
//! monotonic within a day and reset at the day boundary; the logger resumes
//! the counter by scanning the tail of today's file on first use.
//!
//! Logging failures are swallowed (warn only) — an event that cannot be
//! written must never fail the mutation that produced it.

use aof_core::{Clock, EventRecord};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Receiver for every appended event (notifier fan-out).
pub trait EventSink: Send + Sync {
    fn on_event(&self, record: &EventRecord);
}

struct LoggerState {
    /// Day the counter belongs to.
    date: Option<NaiveDate>,
    next_event_id: u64,
}

/// Append-only event logger with notifier fan-out.
///
/// Cheap to clone; clones share the id counter.
#[derive(Clone)]
pub struct EventLogger {
    events_dir: PathBuf,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<LoggerState>>,
    sinks: Arc<Vec<Box<dyn EventSink>>>,
}

impl EventLogger {
    pub fn new(root: &Path, clock: Arc<dyn Clock>) -> Self {
        Self {
            events_dir: root.join("events"),
            clock,
            state: Arc::new(Mutex::new(LoggerState {
                date: None,
                next_event_id: 1,
            })),
            sinks: Arc::new(Vec::new()),
        }
    }

    /// Attach sinks at construction time. Replaces the current set.
    pub fn with_sinks(mut self, sinks: Vec<Box<dyn EventSink>>) -> Self {
        self.sinks = Arc::new(sinks);
        self
    }

    fn day_file(&self, date: NaiveDate) -> PathBuf {
        self.events_dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Assign the day-monotonic id, append the record, fan out to sinks.
    ///
    /// Returns the record as written (with its assigned id). Errors are
    /// logged and swallowed; the returned record still carries the id the
    /// logger tried to assign.
    pub fn emit(&self, mut record: EventRecord) -> EventRecord {
        let today = self.clock.now().date_naive();
        {
            let mut state = self.state.lock();
            if state.date != Some(today) {
                state.next_event_id = self.resume_counter(today);
                state.date = Some(today);
            }
            record.event_id = state.next_event_id;
            state.next_event_id += 1;
        }

        if let Err(e) = self.append_line(today, &record) {
            warn!(kind = %record.kind, error = %e, "failed to append event record");
        }
        for sink in self.sinks.iter() {
            sink.on_event(&record);
        }
        record
    }

    fn append_line(&self, date: NaiveDate, record: &EventRecord) -> std::io::Result<()> {
        fs::create_dir_all(&self.events_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.day_file(date))?;
        let line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(file, "{}", line)?;
        file.flush()
    }

    /// Find the next id for a day by scanning the existing file's tail.
    fn resume_counter(&self, date: NaiveDate) -> u64 {
        let path = self.day_file(date);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return 1,
        };
        raw.lines()
            .rev()
            .find_map(|line| serde_json::from_str::<EventRecord>(line).ok())
            .map(|record| record.event_id + 1)
            .unwrap_or(1)
    }

    /// Read back one day's stream, skipping unparseable lines.
    pub fn read_day(&self, date: NaiveDate) -> Vec<EventRecord> {
        let raw = match fs::read_to_string(self.day_file(date)) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        raw.lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Today's stream, for views and tests.
    pub fn read_today(&self) -> Vec<EventRecord> {
        self.read_day(self.clock.now().date_naive())
    }
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
