/// Vertex array - OpenGL vertex array object and attribute setup

use std::any::Any;
use std::rc::Rc;

use glow::HasContext;
use lumen_render::engine_err;
use lumen_render::lumen::render::{Backend, NativeHandle, ResourceKind, VertexBufferLayout};
use lumen_render::lumen::Result;

use crate::opengl_context::GlContext;
use crate::opengl_format::{attribute_kind, data_type_to_gl, AttributeKind};

/// OpenGL vertex array object
///
/// Only the VAO itself; the buffers it reads from are owned by the engine-side
/// `VertexArray` and dropped before this handle.
#[derive(Debug)]
pub struct GlVertexArray {
    ctx: Rc<GlContext>,
    pub(crate) vao: glow::VertexArray,
    serial: u64,
}

impl GlVertexArray {
    pub fn create(ctx: &Rc<GlContext>) -> Result<Self> {
        let vao = unsafe {
            ctx.gl
                .create_vertex_array()
                .map_err(|e| engine_err!("lumen::opengl", "Failed to create vertex array: {}", e))?
        };
        let serial = ctx.track(ResourceKind::VertexArray);
        Ok(Self {
            ctx: Rc::clone(ctx),
            vao,
            serial,
        })
    }

    pub fn bind(&self) {
        unsafe {
            self.ctx.gl.bind_vertex_array(Some(self.vao));
        }
    }

    /// Describe the attributes of the buffer currently bound to `ARRAY_BUFFER`
    ///
    /// Locations start at `first_location`; Mat3/Mat4 elements take one location
    /// per column. Returns the next free location.
    pub fn set_attributes(&self, layout: &VertexBufferLayout, first_location: u32) -> u32 {
        let gl = &self.ctx.gl;
        let stride = layout.stride() as i32;
        let mut location = first_location;

        for (element, offset) in layout.iter() {
            let columns = element.structure.location_span();
            let size = element.structure.column_component_count() as i32;
            let column_bytes = element.structure.column_component_count() * element.data_type.byte_size();
            let gl_type = data_type_to_gl(element.data_type);

            for column in 0..columns {
                let column_offset = (offset + column * column_bytes) as i32;
                unsafe {
                    gl.enable_vertex_attrib_array(location);
                    match attribute_kind(element.data_type, element.normalized) {
                        AttributeKind::Float => gl.vertex_attrib_pointer_f32(
                            location,
                            size,
                            gl_type,
                            element.normalized,
                            stride,
                            column_offset,
                        ),
                        AttributeKind::Integer => {
                            gl.vertex_attrib_pointer_i32(location, size, gl_type, stride, column_offset)
                        }
                        AttributeKind::Double => {
                            gl.vertex_attrib_pointer_f64(location, size, gl_type, stride, column_offset)
                        }
                    }
                }
                location += 1;
            }
        }

        location
    }
}

impl NativeHandle for GlVertexArray {
    fn backend(&self) -> Backend {
        Backend::OpenGl
    }

    fn raw_id(&self) -> u64 {
        self.vao.0.get() as u64
    }

    fn serial(&self) -> u64 {
        self.serial
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for GlVertexArray {
    fn drop(&mut self) {
        unsafe {
            self.ctx.gl.delete_vertex_array(self.vao);
        }
        self.ctx.untrack(ResourceKind::VertexArray);
    }
}
