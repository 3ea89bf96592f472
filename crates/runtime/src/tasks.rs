//! Background task bookkeeping for async invocations.
//!
//! The hosting platform polls `/ping`; while any task is in flight the
//! runtime reports `HealthyBusy` so the session is not reclaimed mid-run.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PingStatus {
    Healthy,
    HealthyBusy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: PingStatus,
    /// Unix seconds of the last busy/idle transition.
    pub time_of_last_update: i64,
}

#[derive(Debug, Clone)]
struct TaskInfo {
    name: String,
    started_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TaskTracker {
    active: Mutex<HashMap<u64, TaskInfo>>,
    next_id: AtomicU64,
    last_update: AtomicI64,
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTracker {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            last_update: AtomicI64::new(Utc::now().timestamp()),
        }
    }

    /// Register a running task and return its id.
    pub fn add_async_task(&self, name: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut active = self.lock();
        let was_idle = active.is_empty();
        active.insert(
            id,
            TaskInfo {
                name: name.to_string(),
                started_at: Utc::now(),
            },
        );
        if was_idle {
            self.touch();
        }
        info!(task_id = id, task = name, active = active.len(), "async task started");
        id
    }

    /// Mark `id` finished.  Returns `false` for ids that are not active.
    pub fn complete_async_task(&self, id: u64) -> bool {
        let mut active = self.lock();
        let Some(task) = active.remove(&id) else {
            warn!(task_id = id, "completing unknown async task");
            return false;
        };
        if active.is_empty() {
            self.touch();
        }
        let elapsed_ms = (Utc::now() - task.started_at).num_milliseconds();
        info!(task_id = id, task = %task.name, elapsed_ms, active = active.len(), "async task finished");
        true
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    pub fn ping_status(&self) -> PingStatus {
        if self.active_count() > 0 {
            PingStatus::HealthyBusy
        } else {
            PingStatus::Healthy
        }
    }

    pub fn ping(&self) -> PingResponse {
        PingResponse {
            status: self.ping_status(),
            time_of_last_update: self.last_update.load(Ordering::Relaxed),
        }
    }

    fn touch(&self) {
        self.last_update.store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, TaskInfo>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_while_tasks_are_active() {
        let tracker = TaskTracker::new();
        assert_eq!(tracker.ping_status(), PingStatus::Healthy);

        let a = tracker.add_async_task("summarize a");
        let b = tracker.add_async_task("summarize b");
        assert_ne!(a, b);
        assert_eq!(tracker.active_count(), 2);
        assert_eq!(tracker.ping_status(), PingStatus::HealthyBusy);

        assert!(tracker.complete_async_task(a));
        assert_eq!(tracker.ping_status(), PingStatus::HealthyBusy);
        assert!(tracker.complete_async_task(b));
        assert_eq!(tracker.ping_status(), PingStatus::Healthy);
    }

    #[test]
    fn completing_unknown_task_returns_false() {
        let tracker = TaskTracker::new();
        assert!(!tracker.complete_async_task(42));
        let id = tracker.add_async_task("x");
        assert!(tracker.complete_async_task(id));
        assert!(!tracker.complete_async_task(id));
    }

    #[test]
    fn ping_serializes_platform_names() {
        let tracker = TaskTracker::new();
        tracker.add_async_task("x");
        let json = serde_json::to_value(tracker.ping()).unwrap();
        assert_eq!(json["status"], "HealthyBusy");
        assert!(json["time_of_last_update"].as_i64().unwrap() > 0);
    }
}
