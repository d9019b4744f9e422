// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Bounded free-slot queue mediating slot ownership between the capture
//! producer and the consumer.
//!
//! The queue is the only synchronization point in the pipeline: a slot's
//! metadata and buffer contents are written by the producer strictly
//! before the index is pushed, and read by the consumer strictly after it
//! is popped, so the push/pop pair provides the happens-before edge and
//! the arrays themselves need no locking beyond that discipline.

use tracing::warn;

/// Thread-safe, capacity-bounded queue of buffer slot indices.
///
/// Cloning yields another handle to the same queue; both ends may be used
/// from any number of threads. `try_pop` never blocks.
#[derive(Clone)]
pub struct SlotQueue {
    tx: kanal::Sender<usize>,
    rx: kanal::Receiver<usize>,
}

impl SlotQueue {
    /// Create a queue holding at most `capacity` slot indices.
    ///
    /// Capacity equals the pool's slot count, so a producer honoring the
    /// one-push-per-owned-slot contract can never observe a full queue.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = kanal::bounded(capacity);
        Self { tx, rx }
    }

    /// Push a slot index, making it visible to `try_pop`.
    ///
    /// Never blocks. A full or closed queue indicates a broken slot
    /// ownership contract upstream; the index is dropped with a warning
    /// rather than wedging the capture thread.
    pub fn push(&self, slot: usize) {
        match self.tx.try_send(slot) {
            Ok(true) => {}
            Ok(false) => warn!("slot queue full, dropping slot {slot}"),
            Err(_) => warn!("slot queue closed, dropping slot {slot}"),
        }
    }

    /// Pop one slot index without waiting.
    ///
    /// Returns `None` immediately when no slot is ready; this is the
    /// normal per-cycle "no frame yet" case, not an error.
    pub fn try_pop(&self) -> Option<usize> {
        self.rx.try_recv().ok().flatten()
    }
}
