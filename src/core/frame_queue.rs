//! # Frame Queue
//!
//! Bounded FIFO of [`FrameSlot`]s between the acquisition thread and the
//! renderer. The producer appends at the back and evicts from the front when
//! the bound is reached; the consumer trims and seeds at the front.
//!
//! The queue itself is not synchronized. The controller keeps it behind the
//! same mutex as the stream geometry, and callers hold that lock only for the
//! splice itself.
//!
//! ```text
//!  front (oldest)                         back (newest)
//!  ┌──────┬──────┬──────┬─────┬──────┐
//!  │ slot │ slot │ slot │ ... │ slot │ ◀── push_evicting (producer)
//!  └──────┴──────┴──────┴─────┴──────┘
//!     ▲
//!     └── front / pop_front / push_front (consumer)
//! ```

use std::collections::VecDeque;

use super::frame_slot::FrameSlot;
use crate::config::MIN_QUEUED_FRAMES;

#[derive(Debug)]
pub struct FrameQueue {
    slots: VecDeque<FrameSlot>,
    bound: usize,
}

impl FrameQueue {
    /// Creates an empty queue. Bounds below the minimum are raised to it.
    pub fn new(bound: usize) -> Self {
        let bound = bound.max(MIN_QUEUED_FRAMES);
        Self {
            slots: VecDeque::with_capacity(bound),
            bound,
        }
    }

    /// Appends `slot`, evicting the oldest first when full.
    ///
    /// Returns true if a slot was evicted.
    pub fn push_evicting(&mut self, slot: FrameSlot) -> bool {
        let evicted = if self.slots.len() >= self.bound {
            self.slots.pop_front().is_some()
        } else {
            false
        };
        self.slots.push_back(slot);
        evicted
    }

    /// Inserts at the front unless the queue is full.
    pub fn push_front(&mut self, slot: FrameSlot) -> bool {
        if self.slots.len() >= self.bound {
            return false;
        }
        self.slots.push_front(slot);
        true
    }

    pub fn pop_front(&mut self) -> Option<FrameSlot> {
        self.slots.pop_front()
    }

    pub fn front(&self) -> Option<&FrameSlot> {
        self.slots.front()
    }

    pub fn back(&self) -> Option<&FrameSlot> {
        self.slots.back()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameSlot> {
        self.slots.iter()
    }
}
