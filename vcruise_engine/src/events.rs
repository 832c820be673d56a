use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeymappedEvent {
    Escape,
    Menu,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OsEvent {
    MouseMove { pos: Point },
    MouseDown { pos: Point },
    MouseUp { pos: Point },
    Keymapped { key: KeymappedEvent },
}

impl OsEvent {
    pub fn position(&self) -> Option<Point> {
        match *self {
            OsEvent::MouseMove { pos } | OsEvent::MouseDown { pos } | OsEvent::MouseUp { pos } => {
                Some(pos)
            }
            OsEvent::Keymapped { .. } => None,
        }
    }
}

/// Input events in arrival order, consumed by whichever state is active.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: VecDeque<OsEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: OsEvent) {
        self.pending.push_back(event);
    }

    pub fn next(&mut self) -> Option<OsEvent> {
        self.pending.pop_front()
    }

    pub fn peek(&self) -> Option<&OsEvent> {
        self.pending.front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_preserves_arrival_order() {
        let mut queue = EventQueue::new();
        queue.push(OsEvent::MouseMove {
            pos: Point::new(1, 2),
        });
        queue.push(OsEvent::Keymapped {
            key: KeymappedEvent::Escape,
        });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().and_then(OsEvent::position), Some(Point::new(1, 2)));
        assert!(matches!(queue.next(), Some(OsEvent::MouseMove { .. })));
        assert!(matches!(
            queue.next(),
            Some(OsEvent::Keymapped {
                key: KeymappedEvent::Escape
            })
        ));
        assert!(queue.next().is_none());
        assert!(queue.is_empty());
    }
}
