use parking_lot::Mutex;
use tracing::trace;

use super::backend::{BufferHandle, GraphicsBackend};

/// Buffers waiting to be freed at the end of a simulation step.
///
/// Anything may queue a buffer at any time; the buffers are only deleted
/// by [`ReclaimQueue::drain`], which runs between steps when no draw can be
/// using them.
#[derive(Debug, Default)]
pub struct ReclaimQueue {
    pending: Mutex<Vec<BufferHandle>>,
}

impl ReclaimQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `buffer` for deletion.
    pub fn defer(&self, buffer: BufferHandle) {
        self.pending.lock().push(buffer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Deletes every queued buffer under a single lock and returns how many
    /// were freed.
    pub fn drain<B: GraphicsBackend + ?Sized>(&self, backend: &mut B) -> usize {
        let mut pending = self.pending.lock();
        let freed = pending.len();
        for buffer in pending.drain(..) {
            backend.delete_buffer(buffer);
        }
        if freed > 0 {
            trace!(freed, "reclaimed buffers");
        }
        freed
    }
}
