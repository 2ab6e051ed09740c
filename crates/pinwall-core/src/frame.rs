//! Animation-frame coalescing.

/// Token for a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Keeps at most one frame pending.
///
/// A new request replaces the pending frame; the host cancels the old callback
/// and schedules the new one. Frames that fire with a stale id are ignored.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    next: u64,
    pending: Option<FrameId>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a frame, replacing any pending one.
    pub fn request(&mut self) -> FrameId {
        if let Some(previous) = self.pending.take() {
            log::debug!("Frame {:?} replaced", previous);
        }
        self.next += 1;
        let id = FrameId(self.next);
        self.pending = Some(id);
        id
    }

    /// Request a frame only if none is pending.
    pub fn ensure(&mut self) -> FrameId {
        match self.pending {
            Some(id) => id,
            None => self.request(),
        }
    }

    pub fn pending(&self) -> Option<FrameId> {
        self.pending
    }

    /// Consume the pending frame. Returns false for stale ids.
    pub fn begin(&mut self, id: FrameId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) -> Option<FrameId> {
        self.pending.take()
    }
}
