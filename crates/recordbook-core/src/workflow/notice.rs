//! Transient user-facing messages that dismiss themselves.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Notice {
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct Queue {
    next_id: u64,
    items: Vec<Notice>,
}

/// Shared queue of notices. Clones see the same queue.
///
/// Expired notices are dropped whenever the queue is read or added to.
#[derive(Clone)]
pub struct Notices {
    queue: Arc<Mutex<Queue>>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl Notices {
    pub fn new(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Queue::default())),
            clock,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raise a notice visible for the configured window. Returns its id.
    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let now = self.clock.now();
        let mut queue = self.queue();
        queue.items.retain(|n| n.is_visible(now));
        queue.next_id += 1;
        let id = queue.next_id;
        queue.items.push(Notice {
            id,
            level,
            message: message.into(),
            raised_at: now,
            expires_at: now + self.window,
        });
        id
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Error, message)
    }

    /// Notices still within their window, oldest first.
    pub fn active(&self) -> Vec<Notice> {
        let now = self.clock.now();
        let mut queue = self.queue();
        queue.items.retain(|n| n.is_visible(now));
        queue.items.clone()
    }

    /// Dismiss a notice before its window ends.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut queue = self.queue();
        let before = queue.items.len();
        queue.items.retain(|n| n.id != id);
        queue.items.len() != before
    }
}
