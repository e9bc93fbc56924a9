/// Shader - OpenGL shader stages and linked programs
///
/// Stage objects only live for the duration of `create_shader`: they are
/// detached and deleted once the program is linked, whether linking
/// succeeded or not.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use glow::HasContext;
use lumen_render::lumen::render::{Backend, NativeHandle, ResourceKind, ShaderStage, UniformId};
use lumen_render::lumen::{Error, Result};
use lumen_render::{engine_debug, engine_err, engine_error, engine_warn};

use crate::opengl_context::GlContext;
use crate::opengl_format::shader_stage_to_gl;

// ===== STAGE =====

/// Compiled shader stage, deleted on drop
#[derive(Debug)]
pub struct GlShaderStage {
    ctx: Rc<GlContext>,
    pub(crate) shader: glow::Shader,
}

impl GlShaderStage {
    /// Compile one stage from GLSL source
    pub fn compile(ctx: &Rc<GlContext>, stage: ShaderStage, source: &str) -> Result<Self> {
        let gl = &ctx.gl;
        unsafe {
            let shader = gl
                .create_shader(shader_stage_to_gl(stage))
                .map_err(|e| engine_err!("lumen::opengl", "Failed to create {} shader: {}", stage, e))?;
            ctx.track(ResourceKind::ShaderStage);
            let handle = Self {
                ctx: Rc::clone(ctx),
                shader,
            };

            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                engine_error!("lumen::opengl", "{} shader compilation failed:\n{}", stage, log.trim_end());
                return Err(Error::ShaderCompilation { stage, log });
            }
            Ok(handle)
        }
    }
}

impl Drop for GlShaderStage {
    fn drop(&mut self) {
        unsafe {
            self.ctx.gl.delete_shader(self.shader);
        }
        self.ctx.untrack(ResourceKind::ShaderStage);
    }
}

// ===== PROGRAM =====

/// Linked OpenGL program
///
/// Uniform ids index `uniforms`, the locations resolved so far by name.
#[derive(Debug)]
pub struct GlProgram {
    ctx: Rc<GlContext>,
    pub(crate) program: glow::Program,
    serial: u64,
    uniforms: RefCell<Vec<(String, glow::UniformLocation)>>,
}

impl GlProgram {
    /// Link a program from compiled stages, detaching them afterwards
    pub fn link(ctx: &Rc<GlContext>, stages: &[&GlShaderStage]) -> Result<Self> {
        let gl = &ctx.gl;
        unsafe {
            let program = gl
                .create_program()
                .map_err(|e| engine_err!("lumen::opengl", "Failed to create program: {}", e))?;
            let serial = ctx.track(ResourceKind::Shader);
            let handle = Self {
                ctx: Rc::clone(ctx),
                program,
                serial,
                uniforms: RefCell::new(Vec::new()),
            };

            for stage in stages {
                gl.attach_shader(program, stage.shader);
            }
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            for stage in stages {
                gl.detach_shader(program, stage.shader);
            }

            if !linked {
                let log = gl.get_program_info_log(program);
                engine_error!("lumen::opengl", "Shader link failed:\n{}", log.trim_end());
                return Err(Error::ShaderLink { log });
            }

            engine_debug!("lumen::opengl", "Shader #{} linked", serial);
            Ok(handle)
        }
    }

    /// Resolve a uniform by name, reusing the id of an earlier lookup
    pub fn uniform_id(&self, name: &str) -> Option<UniformId> {
        let mut uniforms = self.uniforms.borrow_mut();
        if let Some(index) = uniforms.iter().position(|(known, _)| known == name) {
            return Some(UniformId::new(index as u64));
        }

        let location = unsafe { self.ctx.gl.get_uniform_location(self.program, name) };
        match location {
            Some(location) => {
                uniforms.push((name.to_string(), location));
                Some(UniformId::new((uniforms.len() - 1) as u64))
            }
            None => {
                engine_warn!("lumen::opengl", "Uniform '{}' not found in shader #{}", name, self.serial);
                None
            }
        }
    }

    pub fn uniform_location(&self, id: UniformId) -> Option<glow::UniformLocation> {
        self.uniforms
            .borrow()
            .get(id.raw() as usize)
            .map(|(_, location)| location.clone())
    }

    /// Attach a named uniform block to a binding point
    pub fn bind_uniform_block(&self, block: &str, binding_point: u32) -> bool {
        let gl = &self.ctx.gl;
        unsafe {
            match gl.get_uniform_block_index(self.program, block) {
                Some(index) => {
                    gl.uniform_block_binding(self.program, index, binding_point);
                    true
                }
                None => {
                    engine_warn!("lumen::opengl", "Uniform block '{}' not found in shader #{}", block, self.serial);
                    false
                }
            }
        }
    }
}

impl NativeHandle for GlProgram {
    fn backend(&self) -> Backend {
        Backend::OpenGl
    }

    fn raw_id(&self) -> u64 {
        self.program.0.get() as u64
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

impl Drop for GlProgram {
    fn drop(&mut self) {
        unsafe {
            self.ctx.gl.delete_program(self.program);
        }
        self.ctx.untrack(ResourceKind::Shader);
    }
}
