/// Buffer - OpenGL buffer object behind vertex, index and uniform buffers

use std::any::Any;
use std::rc::Rc;

use glow::HasContext;
use lumen_render::lumen::render::{Backend, NativeHandle, ResourceKind};
use lumen_render::lumen::Result;
use lumen_render::engine_err;

use crate::opengl_context::GlContext;

/// OpenGL buffer object
#[derive(Debug)]
pub struct GlBuffer {
    /// Shared GL context
    ctx: Rc<GlContext>,
    /// GL buffer name
    pub(crate) buffer: glow::Buffer,
    /// Vertex, index or uniform buffer
    kind: ResourceKind,
    serial: u64,
}

impl GlBuffer {
    /// Generate a buffer and allocate `size` bytes, optionally filled with `data`
    ///
    /// The buffer is left bound to `target`.
    pub fn create(
        ctx: &Rc<GlContext>,
        kind: ResourceKind,
        target: u32,
        size: u64,
        data: Option<&[u8]>,
        usage: u32,
    ) -> Result<Self> {
        let gl = &ctx.gl;
        let size = i32::try_from(size)
            .map_err(|_| engine_err!("lumen::opengl", "{:?} of {} bytes exceeds the GL size range", kind, size))?;

        unsafe {
            let buffer = gl
                .create_buffer()
                .map_err(|e| engine_err!("lumen::opengl", "Failed to create {:?}: {}", kind, e))?;
            gl.bind_buffer(target, Some(buffer));
            match data {
                Some(bytes) => gl.buffer_data_u8_slice(target, bytes, usage),
                None => gl.buffer_data_size(target, size, usage),
            }

            let serial = ctx.track(kind);
            Ok(Self {
                ctx: Rc::clone(ctx),
                buffer,
                kind,
                serial,
            })
        }
    }

    /// Bind to `target` and overwrite `data.len()` bytes at `offset`
    ///
    /// Callers validate the range against the declared size first.
    pub fn write(&self, target: u32, offset: u64, data: &[u8]) {
        let gl = &self.ctx.gl;
        unsafe {
            gl.bind_buffer(target, Some(self.buffer));
            gl.buffer_sub_data_u8_slice(target, offset as i32, data);
        }
    }
}

impl NativeHandle for GlBuffer {
    fn backend(&self) -> Backend {
        Backend::OpenGl
    }

    fn raw_id(&self) -> u64 {
        self.buffer.0.get() as u64
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

impl Drop for GlBuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.gl.delete_buffer(self.buffer);
        }
        self.ctx.untrack(self.kind);
    }
}
