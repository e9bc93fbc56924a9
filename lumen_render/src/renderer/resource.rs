/// Backend handles, live-object bookkeeping and resource serials

use std::any::Any;
use std::cell::Cell;
use std::fmt;

use crate::error::{Error, Result};

/// Graphics API a renderer (and every resource it creates) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    OpenGl,
    D3D11,
    Mock,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::OpenGl => write!(f, "OpenGL"),
            Backend::D3D11 => write!(f, "Direct3D 11"),
            Backend::Mock => write!(f, "Mock"),
        }
    }
}

/// Backend-side object behind a resource descriptor
///
/// Implemented by each backend's resource types (e.g. `GlBuffer`). The native
/// object is released when the handle is dropped.
pub trait NativeHandle: Any + fmt::Debug {
    fn backend(&self) -> Backend;

    /// Driver object name (GL name, COM pointer bits, slot index, ...)
    fn raw_id(&self) -> u64;

    /// Unique per backend instance, never reused
    fn serial(&self) -> u64;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Downcast a handle to the backend's concrete type.
///
/// A handle created by another backend yields `Error::InvalidResource`.
pub fn downcast_handle<'a, T: 'static>(handle: &'a dyn NativeHandle, what: &str) -> Result<&'a T> {
    let backend = handle.backend();
    handle.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::InvalidResource(format!(
            "{} #{} belongs to the {} backend",
            what,
            handle.serial(),
            backend
        ))
    })
}

/// Mutable counterpart of `downcast_handle`
pub fn downcast_handle_mut<'a, T: 'static>(
    handle: &'a mut dyn NativeHandle,
    what: &str,
) -> Result<&'a mut T> {
    let backend = handle.backend();
    let serial = handle.serial();
    handle.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
        Error::InvalidResource(format!("{} #{} belongs to the {} backend", what, serial, backend))
    })
}

/// Kind of a live backend object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ShaderStage,
    Shader,
    Texture,
    VertexBuffer,
    IndexBuffer,
    UniformBuffer,
    VertexArray,
}

/// Number of live backend objects per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCounts {
    pub shader_stages: u32,
    pub shaders: u32,
    pub textures: u32,
    pub vertex_buffers: u32,
    pub index_buffers: u32,
    pub uniform_buffers: u32,
    pub vertex_arrays: u32,
}

impl ResourceCounts {
    pub fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::ShaderStage => self.shader_stages,
            ResourceKind::Shader => self.shaders,
            ResourceKind::Texture => self.textures,
            ResourceKind::VertexBuffer => self.vertex_buffers,
            ResourceKind::IndexBuffer => self.index_buffers,
            ResourceKind::UniformBuffer => self.uniform_buffers,
            ResourceKind::VertexArray => self.vertex_arrays,
        }
    }

    fn slot(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::ShaderStage => &mut self.shader_stages,
            ResourceKind::Shader => &mut self.shaders,
            ResourceKind::Texture => &mut self.textures,
            ResourceKind::VertexBuffer => &mut self.vertex_buffers,
            ResourceKind::IndexBuffer => &mut self.index_buffers,
            ResourceKind::UniformBuffer => &mut self.uniform_buffers,
            ResourceKind::VertexArray => &mut self.vertex_arrays,
        }
    }

    pub fn total(&self) -> u32 {
        self.shader_stages
            + self.shaders
            + self.textures
            + self.vertex_buffers
            + self.index_buffers
            + self.uniform_buffers
            + self.vertex_arrays
    }
}

/// Live-object counts and serial allocation for one backend instance
///
/// Shared through the backend context (`Rc`) so resource handles can decrement
/// their kind on drop.
#[derive(Debug, Default)]
pub struct ResourceCounter {
    counts: Cell<ResourceCounts>,
    next_serial: Cell<u64>,
}

impl ResourceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new live object and return its serial
    pub fn acquire(&self, kind: ResourceKind) -> u64 {
        let mut counts = self.counts.get();
        *counts.slot(kind) += 1;
        self.counts.set(counts);
        self.next_serial()
    }

    pub fn release(&self, kind: ResourceKind) {
        let mut counts = self.counts.get();
        let slot = counts.slot(kind);
        *slot = slot.saturating_sub(1);
        self.counts.set(counts);
    }

    /// Allocate a serial without counting a live object
    pub fn next_serial(&self) -> u64 {
        let serial = self.next_serial.get() + 1;
        self.next_serial.set(serial);
        serial
    }

    pub fn snapshot(&self) -> ResourceCounts {
        self.counts.get()
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
