/// OpenGlRenderer - OpenGL implementation of the Renderer trait

use std::ffi::c_void;
use std::rc::Rc;
use std::sync::Arc;

use glow::HasContext;
use lumen_render::lumen::render::{
    is_valid_pixel_alignment, validate_index_data, validate_initial_data, validate_sub_range,
    Backend, BlendEquation, BlendFactor, Config, DataType, DebugMessageSink, DrawPlan, IndexBuffer,
    NativeHandle,
    RendererInfo, RendererStats, ResourceCounts, ResourceKind, Shader, ShaderStage, Texture2D,
    Texture2DDesc, TextureFilter, TextureWrapMode, UniformBinding, UniformBuffer, UniformId,
    UniformValue, ValidationStats, VertexArray, VertexBuffer, VertexBufferLayout,
};
use lumen_render::lumen::{Error, Renderer, Result};
use lumen_render::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use rustc_hash::FxHashMap;

use crate::debug::{install_debug_callback, print_validation_stats_report};
use crate::opengl_buffer::GlBuffer;
use crate::opengl_context::GlContext;
use crate::opengl_format::{
    blend_equation_to_gl, blend_factor_to_gl, clear_flags_to_gl, data_type_to_gl,
};
use crate::opengl_shader::{GlProgram, GlShaderStage};
use crate::opengl_texture::GlTexture;
use crate::opengl_vertex_array::GlVertexArray;

const SOURCE: &str = "lumen::opengl";

/// Presents the back buffer; supplied by the windowing layer
pub type SwapFn = Box<dyn FnMut() -> std::result::Result<(), String>>;

/// Driver limits queried in `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlLimits {
    pub uniform_buffer_offset_alignment: u64,
    pub max_texture_units: u32,
    pub max_uniform_buffer_bindings: u32,
}

impl Default for GlLimits {
    /// Minimums guaranteed by OpenGL 3.3
    fn default() -> Self {
        Self {
            uniform_buffer_offset_alignment: 256,
            max_texture_units: 48,
            max_uniform_buffer_bindings: 36,
        }
    }
}

/// Log a failed handle downcast (resource from another backend)
fn checked<T>(result: Result<&T>) -> Result<&T> {
    result.map_err(|e| {
        engine_error!(SOURCE, "{}", e);
        e
    })
}

/// OpenGL renderer
///
/// Owns the loaded GL function table (shared with every resource it creates)
/// and the state bookkeeping that makes redundant driver calls skippable.
pub struct OpenGlRenderer {
    ctx: Rc<GlContext>,
    swap: SwapFn,
    config: Config,
    info: RendererInfo,
    limits: GlLimits,
    debug_sink: Option<Arc<DebugMessageSink>>,
    stats: RendererStats,

    pack_alignment: u32,
    unpack_alignment: u32,
    blending: bool,

    current_shader: Option<u64>,
    /// Array selected by `use_vertex_array`
    current_vertex_array: Option<u64>,
    /// VAO bound in the driver, which buffer setup may change
    bound_vertex_array: Option<u64>,
    uniform_bindings: FxHashMap<u32, (u64, UniformBinding)>,
}

impl OpenGlRenderer {
    /// Wrap an already loaded GL context
    ///
    /// The context must be current on this thread for the renderer's lifetime.
    pub fn new(gl: glow::Context, swap: SwapFn, config: Config) -> Self {
        Self {
            ctx: Rc::new(GlContext::new(gl)),
            swap,
            config,
            info: RendererInfo::default(),
            limits: GlLimits::default(),
            debug_sink: None,
            stats: RendererStats::default(),
            pack_alignment: 4,
            unpack_alignment: 4,
            blending: false,
            current_shader: None,
            current_vertex_array: None,
            bound_vertex_array: None,
            uniform_bindings: FxHashMap::default(),
        }
    }

    /// Load GL entry points through `loader` (e.g. glutin's `get_proc_address`)
    ///
    /// # Safety
    ///
    /// `loader` must return valid function pointers for the context that is
    /// current on this thread.
    pub unsafe fn from_loader<F>(loader: F, swap: SwapFn, config: Config) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        let gl = glow::Context::from_loader_function(loader);
        Self::new(gl, swap, config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn limits(&self) -> GlLimits {
        self.limits
    }

    /// Raw GL access for code outside the renderer contract
    pub fn gl(&self) -> &glow::Context {
        &self.ctx.gl
    }

    fn install_debug_output(&mut self) {
        let sink = DebugMessageSink::new(SOURCE, self.config.debug_sink_config());
        let Some(ctx) = Rc::get_mut(&mut self.ctx) else {
            engine_warn!(SOURCE, "Debug output not installed: resources already exist");
            return;
        };
        if !ctx.gl.supports_debug() {
            engine_warn!(SOURCE, "Debug output not supported by this context");
            return;
        }
        install_debug_callback(&mut ctx.gl, Arc::clone(&sink));
        self.debug_sink = Some(sink);
        engine_debug!(SOURCE, "Debug output enabled");
    }

    fn query_limits(&self) -> GlLimits {
        let gl = &self.ctx.gl;
        let defaults = GlLimits::default();
        let positive = |value: i32, fallback: u32| u32::try_from(value).ok().filter(|v| *v > 0).unwrap_or(fallback);
        unsafe {
            GlLimits {
                uniform_buffer_offset_alignment: positive(
                    gl.get_parameter_i32(glow::UNIFORM_BUFFER_OFFSET_ALIGNMENT),
                    defaults.uniform_buffer_offset_alignment as u32,
                ) as u64,
                max_texture_units: positive(
                    gl.get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS),
                    defaults.max_texture_units,
                ),
                max_uniform_buffer_bindings: positive(
                    gl.get_parameter_i32(glow::MAX_UNIFORM_BUFFER_BINDINGS),
                    defaults.max_uniform_buffer_bindings,
                ),
            }
        }
    }

    fn bind_vertex_array_object(&mut self, vao: &GlVertexArray, serial: u64) {
        if self.bound_vertex_array != Some(serial) {
            vao.bind();
            self.bound_vertex_array = Some(serial);
        }
    }

    /// Unbind the driver VAO so element-buffer binds cannot leak into it
    ///
    /// The current array stays selected and is bound again at draw time.
    fn unbind_vertex_array(&mut self) {
        if self.bound_vertex_array.take().is_some() {
            unsafe {
                self.ctx.gl.bind_vertex_array(None);
            }
        }
    }

    /// Raise a `panic_on_error` failure caught by the debug callback
    fn raise_debug_errors(&self) {
        if let Some(sink) = &self.debug_sink {
            sink.raise_deferred();
        }
    }

    fn write_buffer(&self, handle: &GlBuffer, target: u32, size: u64, offset: u64, data: &[u8], what: &str) {
        if let Err(e) = validate_sub_range(offset, data.len() as u64, size) {
            engine_error!(SOURCE, "{} #{} sub-upload ignored: {}", what, handle.serial(), e);
            return;
        }
        handle.write(target, offset, data);
    }

    fn bind_uniform_range(&mut self, buffer: &mut UniformBuffer, binding: UniformBinding) -> Result<()> {
        let handle = checked(buffer.native::<GlBuffer>())?;
        let serial = buffer.serial();

        if binding.point >= self.limits.max_uniform_buffer_bindings {
            engine_error!(
                SOURCE,
                "UniformBuffer #{} binding ignored: point {} exceeds the {} available",
                serial,
                binding.point,
                self.limits.max_uniform_buffer_bindings
            );
            return Ok(());
        }

        if self.uniform_bindings.get(&binding.point) != Some(&(serial, binding)) {
            unsafe {
                self.ctx.gl.bind_buffer_range(
                    glow::UNIFORM_BUFFER,
                    binding.point,
                    Some(handle.buffer),
                    binding.offset as i32,
                    binding.size as i32,
                );
            }
            self.uniform_bindings.insert(binding.point, (serial, binding));
        }
        buffer.record_binding(binding);
        Ok(())
    }
}

impl Renderer for OpenGlRenderer {
    fn backend(&self) -> Backend {
        Backend::OpenGl
    }

    fn info(&self) -> &RendererInfo {
        &self.info
    }

    fn stats(&self) -> RendererStats {
        self.stats
    }

    fn validation_stats(&self) -> ValidationStats {
        self.debug_sink
            .as_ref()
            .map(|sink| sink.stats())
            .unwrap_or_default()
    }

    fn live_resources(&self) -> ResourceCounts {
        self.ctx.counter.snapshot()
    }

    fn initialize(&mut self) -> Result<()> {
        if self.config.enable_validation {
            self.install_debug_output();
        }

        let gl = &self.ctx.gl;
        self.info = unsafe {
            RendererInfo {
                vendor: gl.get_parameter_string(glow::VENDOR),
                device: gl.get_parameter_string(glow::RENDERER),
                version: gl.get_parameter_string(glow::VERSION),
                shading_language_version: gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION),
            }
        };
        if self.info.version.is_empty() {
            let err = Error::InitializationFailed("GL context reports no version string".to_string());
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        }
        self.limits = self.query_limits();

        unsafe {
            let gl = &self.ctx.gl;
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, self.pack_alignment as i32);
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, self.unpack_alignment as i32);
        }

        engine_info!(
            SOURCE,
            "{} initialized: {} ({}), GLSL {}",
            self.config.app_name,
            self.info.device,
            self.info.version,
            self.info.shading_language_version
        );
        engine_debug!(SOURCE, "Limits: {:?}", self.limits);
        Ok(())
    }

    fn clear_buffer(&mut self) {
        unsafe {
            self.ctx.gl.clear(clear_flags_to_gl(self.config.clear_flags));
        }
    }

    fn swap_buffers(&mut self) -> Result<()> {
        (self.swap)().map_err(|e| engine_err!(SOURCE, "Failed to swap buffers: {}", e))?;
        self.stats = RendererStats::default();
        self.raise_debug_errors();
        Ok(())
    }

    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe {
            self.ctx.gl.clear_color(r, g, b, a);
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe {
            self.ctx.gl.viewport(0, 0, width as i32, height as i32);
        }
    }

    fn set_pack_alignment(&mut self, alignment: u32) {
        if !is_valid_pixel_alignment(alignment) {
            engine_error!(SOURCE, "Pack alignment {} ignored (expected 1, 2, 4 or 8)", alignment);
            return;
        }
        unsafe {
            self.ctx.gl.pixel_store_i32(glow::PACK_ALIGNMENT, alignment as i32);
        }
        self.pack_alignment = alignment;
    }

    fn set_unpack_alignment(&mut self, alignment: u32) {
        if !is_valid_pixel_alignment(alignment) {
            engine_error!(SOURCE, "Unpack alignment {} ignored (expected 1, 2, 4 or 8)", alignment);
            return;
        }
        unsafe {
            self.ctx.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment as i32);
        }
        self.unpack_alignment = alignment;
    }

    fn set_blending_enabled(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.ctx.gl.enable(glow::BLEND);
            } else {
                self.ctx.gl.disable(glow::BLEND);
            }
        }
        self.blending = enabled;
    }

    fn is_blending_enabled(&self) -> bool {
        self.blending
    }

    fn set_blend_function(
        &mut self,
        src_color: BlendFactor,
        dst_color: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        unsafe {
            self.ctx.gl.blend_func_separate(
                blend_factor_to_gl(src_color),
                blend_factor_to_gl(dst_color),
                blend_factor_to_gl(src_alpha),
                blend_factor_to_gl(dst_alpha),
            );
        }
    }

    fn set_blend_equation(&mut self, color: BlendEquation, alpha: BlendEquation) {
        unsafe {
            self.ctx
                .gl
                .blend_equation_separate(blend_equation_to_gl(color), blend_equation_to_gl(alpha));
        }
    }

    fn set_wireframe_enabled(&mut self, enabled: bool) {
        let mode = if enabled { glow::LINE } else { glow::FILL };
        unsafe {
            self.ctx.gl.polygon_mode(glow::FRONT_AND_BACK, mode);
        }
    }

    fn set_depth_test_enabled(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.ctx.gl.enable(glow::DEPTH_TEST);
            } else {
                self.ctx.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    // ===== SHADERS =====

    fn create_shader(&mut self, vertex_source: &str, fragment_source: &str) -> Result<Shader> {
        // Stages are deleted when they go out of scope, linked or not
        let vertex = GlShaderStage::compile(&self.ctx, ShaderStage::Vertex, vertex_source)?;
        let fragment = GlShaderStage::compile(&self.ctx, ShaderStage::Fragment, fragment_source)?;
        let program = GlProgram::link(&self.ctx, &[&vertex, &fragment]);
        self.raise_debug_errors();
        Ok(Shader::new(Box::new(program?)))
    }

    fn delete_shaders(&mut self, shaders: Vec<Shader>) {
        for shader in shaders {
            if self.current_shader == Some(shader.serial()) {
                unsafe {
                    self.ctx.gl.use_program(None);
                }
                self.current_shader = None;
            }
        }
    }

    fn use_shader(&mut self, shader: &Shader) -> Result<()> {
        let program = checked(shader.native::<GlProgram>())?;
        if self.current_shader != Some(shader.serial()) {
            unsafe {
                self.ctx.gl.use_program(Some(program.program));
            }
            self.current_shader = Some(shader.serial());
        }
        Ok(())
    }

    fn get_uniform_id(&mut self, shader: &Shader, name: &str) -> Option<UniformId> {
        checked(shader.native::<GlProgram>()).ok()?.uniform_id(name)
    }

    fn set_uniform(&mut self, shader: &Shader, id: UniformId, value: UniformValue) -> Result<()> {
        let program = checked(shader.native::<GlProgram>())?;
        if self.current_shader != Some(shader.serial()) {
            let err = Error::InvalidResource(format!("Shader #{} is not the current program", shader.serial()));
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        }
        let location = program.uniform_location(id).ok_or_else(|| {
            let err = Error::InvalidParameter(format!("Uniform id {} out of range", id.raw()));
            engine_error!(SOURCE, "{}", err);
            err
        })?;

        let gl = &self.ctx.gl;
        let location = Some(&location);
        unsafe {
            match value {
                UniformValue::Float(v) => gl.uniform_1_f32(location, v),
                UniformValue::UInt(v) => gl.uniform_1_u32(location, v),
                UniformValue::Int(v) => gl.uniform_1_i32(location, v),
                UniformValue::Vec2(v) => gl.uniform_2_f32(location, v.x, v.y),
                UniformValue::Vec3(v) => gl.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Vec4(v) => gl.uniform_4_f32(location, v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => gl.uniform_matrix_3_f32_slice(location, false, &m.to_cols_array()),
                UniformValue::Mat4(m) => gl.uniform_matrix_4_f32_slice(location, false, &m.to_cols_array()),
            }
        }
        Ok(())
    }

    fn shader_bind_uniform_block(&mut self, shader: &Shader, block: &str, binding_point: u32) -> bool {
        match checked(shader.native::<GlProgram>()) {
            Ok(program) => program.bind_uniform_block(block, binding_point),
            Err(_) => false,
        }
    }

    // ===== TEXTURES =====

    fn create_texture_2d(&mut self, desc: &Texture2DDesc<'_>) -> Result<Texture2D> {
        desc.validate(self.unpack_alignment).map_err(|e| {
            engine_error!(SOURCE, "Texture creation rejected: {}", e);
            e
        })?;
        let handle = GlTexture::create(&self.ctx, desc)?;
        Ok(Texture2D::new(desc.info(), Box::new(handle)))
    }

    fn delete_textures_2d(&mut self, textures: Vec<Texture2D>) {
        // GL unbinds deleted textures from every unit
        drop(textures);
    }

    fn use_texture_2d(&mut self, texture: &Texture2D, unit: u32) -> Result<()> {
        let handle = checked(texture.native::<GlTexture>())?;
        if unit >= self.limits.max_texture_units {
            engine_error!(
                SOURCE,
                "Texture unit {} ignored (device has {})",
                unit,
                self.limits.max_texture_units
            );
            return Ok(());
        }
        unsafe {
            self.ctx.gl.active_texture(glow::TEXTURE0 + unit);
        }
        handle.bind();
        Ok(())
    }

    fn set_texture_2d_wrap_mode(
        &mut self,
        texture: &mut Texture2D,
        x: TextureWrapMode,
        y: TextureWrapMode,
    ) -> Result<()> {
        checked(texture.native::<GlTexture>())?.apply_wrap_mode(x, y);
        texture.record_wrap_mode(x, y);
        Ok(())
    }

    fn set_texture_2d_filter(
        &mut self,
        texture: &mut Texture2D,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Result<()> {
        let handle = checked(texture.native::<GlTexture>())?;
        if !mag.is_valid_mag_filter() {
            engine_error!(SOURCE, "Magnification filter {} ignored for texture #{}", mag, texture.serial());
            return Ok(());
        }
        handle.apply_filter(min, mag);
        texture.record_filter(min, mag);
        Ok(())
    }

    // ===== VERTEX / INDEX BUFFERS =====

    fn create_vertex_buffer(
        &mut self,
        size: u64,
        data: Option<&[u8]>,
        layout: VertexBufferLayout,
    ) -> Result<VertexBuffer> {
        validate_initial_data(size, data).map_err(|e| {
            engine_error!(SOURCE, "Vertex buffer creation rejected: {}", e);
            e
        })?;
        let handle = GlBuffer::create(
            &self.ctx,
            ResourceKind::VertexBuffer,
            glow::ARRAY_BUFFER,
            size,
            data,
            glow::DYNAMIC_DRAW,
        )?;
        Ok(VertexBuffer::new(size, layout, Box::new(handle)))
    }

    fn use_vertex_buffer(&mut self, buffer: &VertexBuffer) -> Result<()> {
        let handle = checked(buffer.native::<GlBuffer>())?;
        unsafe {
            self.ctx.gl.bind_buffer(glow::ARRAY_BUFFER, Some(handle.buffer));
        }
        Ok(())
    }

    fn vertex_buffer_sub_data(&mut self, buffer: &VertexBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let handle = checked(buffer.native::<GlBuffer>())?;
        self.write_buffer(handle, glow::ARRAY_BUFFER, buffer.size(), offset, data, "VertexBuffer");
        Ok(())
    }

    fn delete_vertex_buffers(&mut self, buffers: Vec<VertexBuffer>) {
        drop(buffers);
    }

    fn create_index_buffer(&mut self, count: u32, data: &[u8], data_type: DataType) -> Result<IndexBuffer> {
        validate_index_data(count, data, data_type).map_err(|e| {
            engine_error!(SOURCE, "Index buffer creation rejected: {}", e);
            e
        })?;
        self.unbind_vertex_array();
        let handle = GlBuffer::create(
            &self.ctx,
            ResourceKind::IndexBuffer,
            glow::ELEMENT_ARRAY_BUFFER,
            data.len() as u64,
            Some(data),
            glow::STATIC_DRAW,
        )?;
        Ok(IndexBuffer::new(count, data_type, Box::new(handle)))
    }

    fn use_index_buffer(&mut self, buffer: &IndexBuffer) -> Result<()> {
        let handle = checked(buffer.native::<GlBuffer>())?;
        self.unbind_vertex_array();
        unsafe {
            self.ctx.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(handle.buffer));
        }
        Ok(())
    }

    fn delete_index_buffers(&mut self, buffers: Vec<IndexBuffer>) {
        drop(buffers);
    }

    // ===== UNIFORM BUFFERS =====

    fn create_uniform_buffer(&mut self, size: u64, data: Option<&[u8]>) -> Result<UniformBuffer> {
        validate_initial_data(size, data).map_err(|e| {
            engine_error!(SOURCE, "Uniform buffer creation rejected: {}", e);
            e
        })?;
        let handle = GlBuffer::create(
            &self.ctx,
            ResourceKind::UniformBuffer,
            glow::UNIFORM_BUFFER,
            size,
            data,
            glow::DYNAMIC_DRAW,
        )?;
        Ok(UniformBuffer::new(size, Box::new(handle)))
    }

    fn uniform_buffer_data(&mut self, buffer: &UniformBuffer, data: &[u8]) -> Result<()> {
        let handle = checked(buffer.native::<GlBuffer>())?;
        if data.len() as u64 != buffer.size() {
            engine_error!(
                SOURCE,
                "UniformBuffer #{} upload ignored: {} bytes for a {}-byte buffer",
                buffer.serial(),
                data.len(),
                buffer.size()
            );
            return Ok(());
        }
        handle.write(glow::UNIFORM_BUFFER, 0, data);
        Ok(())
    }

    fn uniform_buffer_sub_data(&mut self, buffer: &UniformBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let handle = checked(buffer.native::<GlBuffer>())?;
        self.write_buffer(handle, glow::UNIFORM_BUFFER, buffer.size(), offset, data, "UniformBuffer");
        Ok(())
    }

    fn uniform_buffer_set_binding_point(&mut self, buffer: &mut UniformBuffer, point: u32) -> Result<()> {
        let binding = UniformBinding { point, offset: 0, size: buffer.size() };
        self.bind_uniform_range(buffer, binding)
    }

    fn uniform_buffer_set_binding_point_range(
        &mut self,
        buffer: &mut UniformBuffer,
        offset: u64,
        size: u64,
        point: u32,
    ) -> Result<()> {
        checked(buffer.native::<GlBuffer>())?;
        if let Err(e) = validate_sub_range(offset, size, buffer.size()) {
            engine_error!(SOURCE, "UniformBuffer #{} range binding ignored: {}", buffer.serial(), e);
            return Ok(());
        }
        let alignment = self.limits.uniform_buffer_offset_alignment;
        if offset % alignment != 0 {
            engine_error!(
                SOURCE,
                "UniformBuffer #{} range binding ignored: offset {} not a multiple of {}",
                buffer.serial(),
                offset,
                alignment
            );
            return Ok(());
        }
        self.bind_uniform_range(buffer, UniformBinding { point, offset, size })
    }

    fn delete_uniform_buffers(&mut self, buffers: Vec<UniformBuffer>) {
        for buffer in buffers {
            let serial = buffer.serial();
            self.uniform_bindings.retain(|_, (bound, _)| *bound != serial);
        }
    }

    // ===== VERTEX ARRAYS =====

    fn create_vertex_array(&mut self) -> Result<VertexArray> {
        let handle = GlVertexArray::create(&self.ctx)?;
        Ok(VertexArray::new(Box::new(handle)))
    }

    fn delete_vertex_arrays(&mut self, arrays: Vec<VertexArray>) {
        for array in arrays {
            if self.current_vertex_array == Some(array.serial()) {
                self.current_vertex_array = None;
            }
            if self.bound_vertex_array == Some(array.serial()) {
                self.unbind_vertex_array();
            }
        }
    }

    fn use_vertex_array(&mut self, array: &VertexArray) -> Result<()> {
        let vao = checked(array.native::<GlVertexArray>())?;
        self.bind_vertex_array_object(vao, array.serial());
        self.current_vertex_array = Some(array.serial());
        Ok(())
    }

    fn vertex_array_bind_vertex_buffer(&mut self, array: &mut VertexArray, buffer: VertexBuffer) -> Result<()> {
        let first_location = array.next_attribute_location();
        let vao = checked(array.native::<GlVertexArray>())?;
        let handle = checked(buffer.native::<GlBuffer>())?;

        self.bind_vertex_array_object(vao, array.serial());
        unsafe {
            self.ctx.gl.bind_buffer(glow::ARRAY_BUFFER, Some(handle.buffer));
        }
        let next = vao.set_attributes(buffer.layout(), first_location);
        engine_debug!(
            SOURCE,
            "VertexArray #{}: buffer #{} at locations {}..{}",
            array.serial(),
            buffer.serial(),
            first_location,
            next
        );

        array.push_vertex_buffer(buffer);
        Ok(())
    }

    fn vertex_array_bind_index_buffer(&mut self, array: &mut VertexArray, buffer: IndexBuffer) -> Result<()> {
        let vao = checked(array.native::<GlVertexArray>())?;
        let handle = checked(buffer.native::<GlBuffer>())?;

        self.bind_vertex_array_object(vao, array.serial());
        unsafe {
            self.ctx.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(handle.buffer));
        }
        // The replaced buffer is deleted here
        drop(array.replace_index_buffer(buffer));
        Ok(())
    }

    // ===== DRAW =====

    fn draw_vertex_array(&mut self, array: &VertexArray) -> Result<()> {
        let vao = checked(array.native::<GlVertexArray>())?;
        if self.current_vertex_array != Some(array.serial()) {
            let err = Error::InvalidResource(format!(
                "VertexArray #{} is not the current vertex array",
                array.serial()
            ));
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        }
        if self.current_shader.is_none() {
            let err = Error::InvalidResource("draw without a current shader".to_string());
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        }

        let plan = array.draw_plan().map_err(|e| {
            engine_error!(SOURCE, "Draw rejected: {}", e);
            e
        })?;
        self.bind_vertex_array_object(vao, array.serial());
        unsafe {
            match plan {
                DrawPlan::Indexed { count, data_type } => {
                    self.ctx
                        .gl
                        .draw_elements(glow::TRIANGLES, count as i32, data_type_to_gl(data_type), 0);
                }
                DrawPlan::Arrays { vertex_count } => {
                    self.ctx.gl.draw_arrays(glow::TRIANGLES, 0, vertex_count as i32);
                }
            }
        }
        self.stats.record_draw(plan.triangle_count());
        self.raise_debug_errors();
        Ok(())
    }
}

impl Drop for OpenGlRenderer {
    fn drop(&mut self) {
        if let Some(sink) = &self.debug_sink {
            if sink.config().enable_stats {
                print_validation_stats_report(&sink.stats());
            }
        }
        let live = self.ctx.counter.snapshot();
        if live.total() > 0 {
            engine_warn!(SOURCE, "Renderer dropped with live resources: {:?}", live);
        }
    }
}

#[cfg(test)]
#[path = "opengl_tests.rs"]
mod tests;
