use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BecameAvailable,
    BecameUnavailable,
    AlertSent,
    AlertFailed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BecameAvailable => write!(f, "AVAILABLE"),
            Self::BecameUnavailable => write!(f, "GONE"),
            Self::AlertSent => write!(f, "ALERT"),
            Self::AlertFailed => write!(f, "ALERT-FAIL"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub source: String,
    pub item: String,
    pub details: String,
}

impl MonitorEvent {
    pub fn new(
        kind: EventKind,
        source: impl Into<String>,
        item: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            source: source.into(),
            item: item.into(),
            details: details.into(),
        }
    }
}

/// Fixed-capacity circular buffer for recent events. O(1) insert, evicts oldest when full.
#[derive(Debug, Clone)]
pub struct EventRing {
    buffer: VecDeque<MonitorEvent>,
    capacity: usize,
}

impl EventRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: MonitorEvent) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn list(&self) -> Vec<MonitorEvent> {
        self.buffer.iter().rev().cloned().collect()
    }

    pub fn list_chronological(&self) -> Vec<MonitorEvent> {
        self.buffer.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(kind: EventKind, detail: &str) -> MonitorEvent {
        MonitorEvent::new(kind, "argos", "console", detail)
    }

    #[test]
    fn ring_push_and_list() {
        let mut ring = EventRing::new(5);
        ring.push(make_event(EventKind::BecameAvailable, "in stock"));
        ring.push(make_event(EventKind::AlertSent, "message delivered"));
        assert_eq!(ring.len(), 2);

        let events = ring.list();
        assert_eq!(events[0].kind, EventKind::AlertSent);
        assert_eq!(events[1].kind, EventKind::BecameAvailable);
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut ring = EventRing::new(2);
        ring.push(make_event(EventKind::BecameAvailable, "e1"));
        ring.push(make_event(EventKind::AlertSent, "e2"));
        ring.push(make_event(EventKind::BecameUnavailable, "e3"));
        assert_eq!(ring.len(), 2);
        let events = ring.list_chronological();
        assert_eq!(events[0].kind, EventKind::AlertSent);
        assert_eq!(events[1].kind, EventKind::BecameUnavailable);
    }

    #[test]
    fn ring_clear() {
        let mut ring = EventRing::new(5);
        ring.push(make_event(EventKind::BecameAvailable, "e1"));
        ring.clear();
        assert!(ring.is_empty());
    }

    #[test]
    fn event_display() {
        assert_eq!(format!("{}", EventKind::BecameAvailable), "AVAILABLE");
        assert_eq!(format!("{}", EventKind::BecameUnavailable), "GONE");
        assert_eq!(format!("{}", EventKind::AlertSent), "ALERT");
        assert_eq!(format!("{}", EventKind::AlertFailed), "ALERT-FAIL");
    }
}
