/// Vertex array: owned vertex buffers plus an optional index buffer

use crate::error::{Error, Result};
use crate::renderer::{
    downcast_handle, downcast_handle_mut, Backend, DataType, IndexBuffer, NativeHandle, VertexBuffer,
};

/// What `draw_vertex_array` issues for a given array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPlan {
    /// Indexed triangles from the attached index buffer
    Indexed { count: u32, data_type: DataType },
    /// Non-indexed triangles from the first vertex buffer
    Arrays { vertex_count: u32 },
}

impl DrawPlan {
    pub fn triangle_count(&self) -> u32 {
        match self {
            DrawPlan::Indexed { count, .. } => count / 3,
            DrawPlan::Arrays { vertex_count } => vertex_count / 3,
        }
    }
}

/// Vertex buffers and an optional index buffer used together for draws
///
/// The array exclusively owns what is bound to it. Fields drop in declaration
/// order, so buffers are released before the array object itself.
#[derive(Debug)]
pub struct VertexArray {
    vertex_buffers: Vec<VertexBuffer>,
    index_buffer: Option<IndexBuffer>,
    handle: Box<dyn NativeHandle>,
}

impl VertexArray {
    pub fn new(handle: Box<dyn NativeHandle>) -> Self {
        Self {
            vertex_buffers: Vec::new(),
            index_buffer: None,
            handle,
        }
    }

    pub fn vertex_buffers(&self) -> &[VertexBuffer] {
        &self.vertex_buffers
    }

    pub fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.index_buffer.as_ref()
    }

    /// First attribute location free for the next vertex buffer
    pub fn next_attribute_location(&self) -> u32 {
        self.vertex_buffers
            .iter()
            .map(|vb| vb.layout().location_count())
            .sum()
    }

    /// Take ownership of a vertex buffer after the backend attached it
    pub fn push_vertex_buffer(&mut self, buffer: VertexBuffer) {
        self.vertex_buffers.push(buffer);
    }

    /// Take ownership of an index buffer, returning the one it replaces
    pub fn replace_index_buffer(&mut self, buffer: IndexBuffer) -> Option<IndexBuffer> {
        self.index_buffer.replace(buffer)
    }

    /// Decide how this array is drawn
    pub fn draw_plan(&self) -> Result<DrawPlan> {
        if let Some(index_buffer) = &self.index_buffer {
            return Ok(DrawPlan::Indexed {
                count: index_buffer.count(),
                data_type: index_buffer.data_type(),
            });
        }

        let first = self.vertex_buffers.first().ok_or_else(|| {
            Error::InvalidParameter(format!("VertexArray #{} has no vertex buffer", self.serial()))
        })?;
        if first.layout().stride() == 0 {
            return Err(Error::InvalidParameter(format!(
                "VertexArray #{} first vertex buffer has a zero-stride layout",
                self.serial()
            )));
        }
        let vertex_count = u32::try_from(first.vertex_count()).map_err(|_| {
            Error::InvalidParameter(format!("{} vertices exceed a single draw", first.vertex_count()))
        })?;
        Ok(DrawPlan::Arrays { vertex_count })
    }

    pub fn backend(&self) -> Backend {
        self.handle.backend()
    }

    pub fn serial(&self) -> u64 {
        self.handle.serial()
    }

    pub fn native<T: 'static>(&self) -> Result<&T> {
        downcast_handle(self.handle.as_ref(), "VertexArray")
    }

    pub fn native_mut<T: 'static>(&mut self) -> Result<&mut T> {
        downcast_handle_mut(self.handle.as_mut(), "VertexArray")
    }
}

#[cfg(test)]
#[path = "vertex_array_tests.rs"]
mod tests;
