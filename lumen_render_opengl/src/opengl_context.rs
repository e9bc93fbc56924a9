/// GlContext - Shared GL state for all OpenGL objects
///
/// Every resource handle keeps an `Rc<GlContext>` so it can delete its driver
/// object when dropped, and so live-object counts stay in one place.

use std::fmt;

use lumen_render::lumen::render::{ResourceCounter, ResourceKind};

/// Shared OpenGL context for all resources.
pub struct GlContext {
    /// Loaded GL function table
    pub gl: glow::Context,

    /// Live-object counts and resource serials
    pub counter: ResourceCounter,
}

impl GlContext {
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            counter: ResourceCounter::default(),
        }
    }

    /// Register a new driver object, returning its serial
    pub fn track(&self, kind: ResourceKind) -> u64 {
        self.counter.acquire(kind)
    }

    /// Forget a driver object that was just deleted
    pub fn untrack(&self, kind: ResourceKind) {
        self.counter.release(kind);
    }
}

impl fmt::Debug for GlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlContext")
            .field("live", &self.counter.snapshot())
            .finish_non_exhaustive()
    }
}
