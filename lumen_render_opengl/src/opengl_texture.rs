/// Texture - OpenGL 2D texture object

use std::any::Any;
use std::num::NonZeroU32;
use std::rc::Rc;

use glow::HasContext;
use lumen_render::{engine_err, engine_error};
use lumen_render::lumen::render::{
    Backend, NativeHandle, ResourceKind, Texture2DDesc, TextureFilter, TextureWrapMode,
};
use lumen_render::lumen::{Error, Result};

use crate::opengl_context::GlContext;
use crate::opengl_format::{
    filter_to_gl, internal_format_to_gl, pixel_type_to_gl, texture_format_to_gl, wrap_mode_to_gl,
};

/// OpenGL texture object
#[derive(Debug)]
pub struct GlTexture {
    ctx: Rc<GlContext>,
    pub(crate) texture: glow::Texture,
    serial: u64,
}

impl GlTexture {
    /// Upload a validated descriptor: image, mipmaps, then sampling state
    ///
    /// The texture previously bound on the active unit is bound again afterwards.
    pub fn create(ctx: &Rc<GlContext>, desc: &Texture2DDesc<'_>) -> Result<Self> {
        let internal_format = internal_format_to_gl(desc.format, desc.data_type).ok_or_else(|| {
            let err = Error::UnsupportedFormat(format!("{} texture with {} data", desc.format, desc.data_type));
            engine_error!("lumen::opengl", "{}", err);
            err
        })?;

        let gl = &ctx.gl;
        let texture = unsafe {
            gl.create_texture()
                .map_err(|e| engine_err!("lumen::opengl", "Failed to create texture: {}", e))?
        };
        let serial = ctx.track(ResourceKind::Texture);
        let handle = Self {
            ctx: Rc::clone(ctx),
            texture,
            serial,
        };

        handle.edit(|gl| unsafe {
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format,
                desc.width as i32,
                desc.height as i32,
                0,
                texture_format_to_gl(desc.format),
                pixel_type_to_gl(desc.format, desc.data_type),
                desc.data,
            );
            gl.generate_mipmap(glow::TEXTURE_2D);
            set_wrap_mode(gl, desc.wrap_x, desc.wrap_y);
            set_filter(gl, desc.min_filter, desc.mag_filter);
        });
        Ok(handle)
    }

    /// Bind to `TEXTURE_2D` on the active unit
    pub fn bind(&self) {
        unsafe {
            self.ctx.gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
        }
    }

    pub fn apply_wrap_mode(&self, x: TextureWrapMode, y: TextureWrapMode) {
        self.edit(|gl| unsafe { set_wrap_mode(gl, x, y) });
    }

    pub fn apply_filter(&self, min: TextureFilter, mag: TextureFilter) {
        self.edit(|gl| unsafe { set_filter(gl, min, mag) });
    }

    /// Run `f` with this texture bound, leaving the active unit's binding unchanged
    fn edit(&self, f: impl FnOnce(&glow::Context)) {
        let gl = &self.ctx.gl;
        unsafe {
            let previous = bound_texture_2d(gl);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            f(gl);
            if previous != Some(self.texture) {
                gl.bind_texture(glow::TEXTURE_2D, previous);
            }
        }
    }
}

/// Texture bound to `TEXTURE_2D` on the active unit
unsafe fn bound_texture_2d(gl: &glow::Context) -> Option<glow::Texture> {
    let name = gl.get_parameter_i32(glow::TEXTURE_BINDING_2D);
    u32::try_from(name).ok().and_then(NonZeroU32::new).map(glow::NativeTexture)
}

unsafe fn set_wrap_mode(gl: &glow::Context, x: TextureWrapMode, y: TextureWrapMode) {
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap_mode_to_gl(x));
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap_mode_to_gl(y));
}

unsafe fn set_filter(gl: &glow::Context, min: TextureFilter, mag: TextureFilter) {
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter_to_gl(min));
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter_to_gl(mag));
}

impl NativeHandle for GlTexture {
    fn backend(&self) -> Backend {
        Backend::OpenGl
    }

    fn raw_id(&self) -> u64 {
        self.texture.0.get() as u64
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

impl Drop for GlTexture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.gl.delete_texture(self.texture);
        }
        self.ctx.untrack(ResourceKind::Texture);
    }
}
