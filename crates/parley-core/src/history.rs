//! Bounded conversation history.
//!
//! [`HistoryBuffer`] keeps the most recent `capacity` turns of a conversation
//! in arrival order. Appending to a full buffer evicts exactly one turn from
//! the front, whatever its role.

use std::collections::VecDeque;

use crate::message::{Message, Role};

/// Number of turns retained when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Fixed-capacity FIFO of [`Message`]s.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of `0` is raised to `1` so the
    /// latest user turn can always be sent as context.
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a turn, evicting the oldest one if the buffer overflows.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.push(Message::new(role, content));
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message);
        if self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// Ordered copy of the current contents.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
