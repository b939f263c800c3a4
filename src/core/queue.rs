//! Bounded record queue between the poll loop and the publish scheduler.
//!
//! The queue never blocks the producer. When the consumer falls more than
//! `capacity` records behind, the oldest unread record is overwritten and the
//! read side skips past it, so the records that survive come out in FIFO order.

use crate::core::window::Record;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Ring {
    slots: Vec<Record>,
    write_cursor: usize,
    read_cursor: usize,
    // Monotonic; only the cursors wrap.
    write_count: u64,
    read_count: u64,
}

/// Single-producer/single-consumer ring of completed cycle records.
pub struct RecordQueue {
    ring: Mutex<Ring>,
}

impl RecordQueue {
    /// Create a queue with room for `capacity` unread records (at least one).
    pub fn new(capacity: u32) -> Self {
        Self {
            ring: Mutex::new(Ring {
                slots: vec![Record::default(); capacity.max(1) as usize],
                write_cursor: 0,
                read_cursor: 0,
                write_count: 0,
                read_count: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a record.
    ///
    /// Always succeeds. Returns the unread record that was overwritten when
    /// the queue was already full.
    pub fn push(&self, record: Record) -> Option<Record> {
        let mut ring = self.lock();
        let capacity = ring.slots.len();

        let cursor = ring.write_cursor;
        let overwritten = ring.slots[cursor];
        ring.slots[cursor] = record;
        ring.write_cursor = (cursor + 1) % capacity;
        ring.write_count += 1;

        if ring.write_count - ring.read_count > capacity as u64 {
            ring.read_count = ring.write_count - capacity as u64;
            ring.read_cursor = ring.write_cursor;
            Some(overwritten)
        } else {
            None
        }
    }

    /// Take the oldest unread record, if any.
    pub fn pop(&self) -> Option<Record> {
        let mut ring = self.lock();
        if ring.read_count >= ring.write_count {
            return None;
        }

        let cursor = ring.read_cursor;
        let record = ring.slots[cursor];
        ring.read_cursor = (cursor + 1) % ring.slots.len();
        ring.read_count += 1;
        Some(record)
    }

    /// Pop every unread record into a batch, in FIFO order.
    pub fn drain(&self) -> Batch {
        let mut records = Vec::new();
        for _ in 0..self.capacity() {
            match self.pop() {
                Some(record) => records.push(record),
                None => break,
            }
        }
        Batch { records }
    }

    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    /// Number of records waiting to be read.
    pub fn len(&self) -> usize {
        let ring = self.lock();
        (ring.write_count - ring.read_count) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total records ever pushed.
    pub fn write_count(&self) -> u64 {
        self.lock().write_count
    }

    /// Total records ever popped or skipped after an overwrite.
    pub fn read_count(&self) -> u64 {
        self.lock().read_count
    }
}

/// Records drained from the queue for one publish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for Batch {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}
