use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// In-process counters for turn outcomes. Monotonically increasing,
/// safe to share across threads.
#[derive(Default)]
pub struct TurnMetrics {
    turns_started: AtomicU64,
    turns_completed: AtomicU64,
    turns_cancelled: AtomicU64,
    turns_failed: AtomicU64,
    tool_calls: AtomicU64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnMetricsSnapshot {
    pub turns_started: u64,
    pub turns_completed: u64,
    pub turns_cancelled: u64,
    pub turns_failed: u64,
    pub tool_calls: u64,
}

impl TurnMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turn_started(&self) {
        self.turns_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn turn_completed(&self) {
        self.turns_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn turn_cancelled(&self) {
        self.turns_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn turn_failed(&self) {
        self.turns_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tool_call(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TurnMetricsSnapshot {
        TurnMetricsSnapshot {
            turns_started: self.turns_started.load(Ordering::Relaxed),
            turns_completed: self.turns_completed.load(Ordering::Relaxed),
            turns_cancelled: self.turns_cancelled.load(Ordering::Relaxed),
            turns_failed: self.turns_failed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
        }
    }
}
