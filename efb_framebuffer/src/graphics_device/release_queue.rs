/// Deferred release of GPU resources, keyed by command-batch completion
///
/// Resources released while a command batch is being recorded may still be
/// referenced by that batch. They are parked here, tagged with the batch id,
/// and dropped once the command stream reports that batch complete.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use crate::graphics_device::{GpuImage, ReadbackBuffer};
use crate::efb_trace;

/// Identifier of a command batch (monotonically increasing, starting at 0)
pub type BatchId = u64;

/// A resource waiting for its batch to complete
pub enum ReleasedResource {
    Image(Box<dyn GpuImage>),
    Buffer(Box<dyn ReadbackBuffer>),
}

struct PendingRelease {
    batch: BatchId,
    resource: ReleasedResource,
}

struct ReleaseQueueState {
    /// Batch currently being recorded
    recording_batch: BatchId,
    /// Pending releases, ordered by batch
    pending: VecDeque<PendingRelease>,
}

/// Deferred-free queue shared between a device and the surfaces it created
pub struct ReleaseQueue {
    state: Mutex<ReleaseQueueState>,
}

impl ReleaseQueue {
    /// Create an empty queue recording batch 0
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReleaseQueueState {
                recording_batch: 0,
                pending: VecDeque::new(),
            }),
        }
    }

    // Resource drops must keep working while unwinding
    fn lock(&self) -> MutexGuard<'_, ReleaseQueueState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Park a resource until the batch currently being recorded completes
    pub fn defer(&self, resource: ReleasedResource) {
        let mut state = self.lock();
        let batch = state.recording_batch;
        state.pending.push_back(PendingRelease { batch, resource });
    }

    /// Batch currently being recorded
    pub fn recording_batch(&self) -> BatchId {
        self.lock().recording_batch
    }

    /// Close the batch being recorded (it was submitted) and start the next one
    ///
    /// Returns the id of the closed batch.
    pub fn close_batch(&self) -> BatchId {
        let mut state = self.lock();
        let closed = state.recording_batch;
        state.recording_batch += 1;
        closed
    }

    /// Drop every resource whose batch is `completed` or older
    ///
    /// Returns the number of resources dropped.
    pub fn retire(&self, completed: BatchId) -> usize {
        let released: Vec<ReleasedResource> = {
            let mut state = self.lock();
            let mut released = Vec::new();
            while state.pending.front().is_some_and(|p| p.batch <= completed) {
                if let Some(pending) = state.pending.pop_front() {
                    released.push(pending.resource);
                }
            }
            released
        };

        // Dropped outside the lock: backend destructors may take other locks
        let count = released.len();
        drop(released);
        if count > 0 {
            efb_trace!("efb::ReleaseQueue", "Released {} resource(s) up to batch {}", count, completed);
        }
        count
    }

    /// Drop every pending resource regardless of batch
    ///
    /// Only valid once the device is idle (teardown).
    pub fn drain_all(&self) -> usize {
        let released: Vec<PendingRelease> = self.lock().pending.drain(..).collect();
        released.len()
    }

    /// Number of resources waiting for their batch
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

impl Default for ReleaseQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "release_queue_tests.rs"]
mod tests;
