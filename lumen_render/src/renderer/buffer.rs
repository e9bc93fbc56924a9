/// Vertex, index and uniform buffer descriptors and range validation

use crate::error::{Error, Result};
use crate::renderer::{downcast_handle, downcast_handle_mut, Backend, DataType, NativeHandle, VertexBufferLayout};

// ===== VALIDATION =====

/// Check that `[offset, offset + len)` lies inside a buffer of `size` bytes
pub fn validate_sub_range(offset: u64, len: u64, size: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::InvalidParameter(format!(
            "range [{}, {}+{}) exceeds buffer size {}",
            offset, offset, len, size
        ))),
    }
}

/// Pack / unpack row alignment accepted by the drivers
pub fn is_valid_pixel_alignment(alignment: u32) -> bool {
    matches!(alignment, 1 | 2 | 4 | 8)
}

/// Check the index type and that `data` holds exactly `count` indices
pub fn validate_index_data(count: u32, data: &[u8], data_type: DataType) -> Result<()> {
    if !data_type.is_valid_index_type() {
        return Err(Error::UnsupportedFormat(format!(
            "{} is not an index type (UnsignedByte, UnsignedShort or UnsignedInt)",
            data_type
        )));
    }
    let expected = count as u64 * data_type.byte_size() as u64;
    if data.len() as u64 != expected {
        return Err(Error::InvalidParameter(format!(
            "{} {} indices need {} bytes, got {}",
            count,
            data_type,
            expected,
            data.len()
        )));
    }
    Ok(())
}

/// Check that initial data, when given, matches the declared size exactly
pub fn validate_initial_data(size: u64, data: Option<&[u8]>) -> Result<()> {
    match data {
        Some(bytes) if bytes.len() as u64 != size => Err(Error::InvalidParameter(format!(
            "buffer of {} bytes created with {} bytes of data",
            size,
            bytes.len()
        ))),
        _ => Ok(()),
    }
}

// ===== VERTEX BUFFER =====

/// GPU vertex storage with the layout of one record
#[derive(Debug)]
pub struct VertexBuffer {
    size: u64,
    layout: VertexBufferLayout,
    handle: Box<dyn NativeHandle>,
}

impl VertexBuffer {
    pub fn new(size: u64, layout: VertexBufferLayout, handle: Box<dyn NativeHandle>) -> Self {
        Self { size, layout, handle }
    }

    /// Declared size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn layout(&self) -> &VertexBufferLayout {
        &self.layout
    }

    /// Complete records stored in the buffer; zero for a zero-stride layout
    pub fn vertex_count(&self) -> u64 {
        match self.layout.stride() {
            0 => 0,
            stride => self.size / stride as u64,
        }
    }

    pub fn backend(&self) -> Backend {
        self.handle.backend()
    }

    pub fn serial(&self) -> u64 {
        self.handle.serial()
    }

    pub fn native<T: 'static>(&self) -> Result<&T> {
        downcast_handle(self.handle.as_ref(), "VertexBuffer")
    }
}

// ===== INDEX BUFFER =====

/// GPU index storage
#[derive(Debug)]
pub struct IndexBuffer {
    count: u32,
    data_type: DataType,
    handle: Box<dyn NativeHandle>,
}

impl IndexBuffer {
    pub fn new(count: u32, data_type: DataType, handle: Box<dyn NativeHandle>) -> Self {
        Self { count, data_type, handle }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn size(&self) -> u64 {
        self.count as u64 * self.data_type.byte_size() as u64
    }

    pub fn backend(&self) -> Backend {
        self.handle.backend()
    }

    pub fn serial(&self) -> u64 {
        self.handle.serial()
    }

    pub fn native<T: 'static>(&self) -> Result<&T> {
        downcast_handle(self.handle.as_ref(), "IndexBuffer")
    }
}

// ===== UNIFORM BUFFER =====

/// Binding of a uniform buffer (or a range of it) to a binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformBinding {
    pub point: u32,
    pub offset: u64,
    pub size: u64,
}

/// GPU storage backing uniform blocks
#[derive(Debug)]
pub struct UniformBuffer {
    size: u64,
    binding: Option<UniformBinding>,
    handle: Box<dyn NativeHandle>,
}

impl UniformBuffer {
    pub fn new(size: u64, handle: Box<dyn NativeHandle>) -> Self {
        Self { size, binding: None, handle }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current binding, `None` until a binding point is set
    pub fn binding(&self) -> Option<UniformBinding> {
        self.binding
    }

    /// Record a binding after the backend applied it
    pub fn record_binding(&mut self, binding: UniformBinding) {
        self.binding = Some(binding);
    }

    pub fn backend(&self) -> Backend {
        self.handle.backend()
    }

    pub fn serial(&self) -> u64 {
        self.handle.serial()
    }

    pub fn native<T: 'static>(&self) -> Result<&T> {
        downcast_handle(self.handle.as_ref(), "UniformBuffer")
    }

    pub fn native_mut<T: 'static>(&mut self) -> Result<&mut T> {
        downcast_handle_mut(self.handle.as_mut(), "UniformBuffer")
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
