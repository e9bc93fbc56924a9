/// Renderer trait - the backend-agnostic drawing and resource contract

use bitflags::bitflags;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::error::Result;
use crate::renderer::{
    Backend, BlendEquation, BlendFactor, DataType, DebugMessageFilter, DebugOutput, DebugSeverity,
    IndexBuffer, ResourceCounts, Shader, Texture2D, Texture2DDesc, TextureFilter, TextureWrapMode,
    UniformBuffer, UniformId, UniformValue, ValidationStats, VertexArray, VertexBuffer,
    VertexBufferLayout,
};

// ============================================================================
// Configuration
// ============================================================================

bitflags! {
    /// Attachments cleared by `Renderer::clear_buffer`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        ClearFlags::COLOR | ClearFlags::DEPTH
    }
}

/// Uniform-block binding points shared by convention between shaders and the
/// code that fills their buffers. The renderer never assigns them itself.
pub mod binding_points {
    /// 2D orthographic projection matrix
    pub const ORTHO_PROJECTION: u32 = 0;
    /// 3D view / projection pair
    pub const VIEW_PROJECTION: u32 = 1;
    /// Light data block
    pub const LIGHTS: u32 = 2;
    /// Shared scalar block
    pub const SHARED_SCALARS: u32 = 3;
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name (window title / debug labels)
    pub app_name: String,
    /// Enable the driver debug-message channel
    pub enable_validation: bool,
    /// Minimum severity of reported debug messages
    pub debug_severity: DebugSeverity,
    /// Where debug messages are written
    pub debug_output: DebugOutput,
    /// Category filter for debug messages
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on a debug error (to attach a debugger)
    pub break_on_error: bool,
    /// Panic on a debug error
    pub panic_on_error: bool,
    /// Count debug messages into `ValidationStats`
    pub enable_validation_stats: bool,
    /// Debug message ids never reported
    pub ignored_debug_message_ids: Vec<u32>,
    /// Attachments cleared by `clear_buffer`
    pub clear_flags: ClearFlags,
    /// Wait for vertical blank on present (swap chain backends)
    pub vsync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Lumen Application".to_string(),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_error: false,
            panic_on_error: false,
            enable_validation_stats: cfg!(debug_assertions),
            // Buffer placement info, buffer usage hints, shader recompile and
            // texture base-level notices from NVIDIA drivers
            ignored_debug_message_ids: vec![131169, 131185, 131218, 131204],
            clear_flags: ClearFlags::default(),
            vsync: true,
        }
    }
}

impl Config {
    /// Settings for a backend's `DebugMessageSink`
    pub fn debug_sink_config(&self) -> crate::renderer::DebugSinkConfig {
        crate::renderer::DebugSinkConfig {
            severity: self.debug_severity,
            output: self.debug_output.clone(),
            message_filter: self.debug_message_filter,
            ignored_ids: self.ignored_debug_message_ids.clone(),
            break_on_error: self.break_on_error,
            panic_on_error: self.panic_on_error,
            enable_stats: self.enable_validation_stats,
        }
    }
}

/// Per-frame statistics, reset by `swap_buffers`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Number of draw calls this frame
    pub draw_calls: u32,
    /// Number of triangles drawn this frame
    pub triangles: u32,
}

impl RendererStats {
    pub fn record_draw(&mut self, triangles: u32) {
        self.draw_calls += 1;
        self.triangles += triangles;
    }
}

/// Driver identification strings, filled by `initialize`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RendererInfo {
    pub vendor: String,
    pub device: String,
    pub version: String,
    pub shading_language_version: String,
}

// ============================================================================
// Renderer trait
// ============================================================================

/// Main renderer trait
///
/// One implementation per graphics API (`OpenGlRenderer`, `D3D11Renderer`,
/// `MockRenderer`), chosen once at startup. Every call runs synchronously on the
/// thread that owns the native context.
///
/// Resources are owned by the caller. Dropping a resource or passing it to the
/// matching `delete_*` method releases the native object. Passing a resource
/// created by another backend returns `Error::InvalidResource`.
///
/// Size and range violations (sub-uploads past the end, invalid alignments,
/// out-of-range texture units) are logged and ignored: the call returns `Ok(())`
/// without touching the driver.
pub trait Renderer {
    // ===== IDENTITY =====

    fn backend(&self) -> Backend;

    /// Driver strings. Empty until `initialize` ran.
    fn info(&self) -> &RendererInfo;

    /// Draw statistics for the current frame
    fn stats(&self) -> RendererStats;

    /// Counted debug messages since `initialize`
    fn validation_stats(&self) -> ValidationStats {
        ValidationStats::default()
    }

    /// Live native objects created by this renderer
    fn live_resources(&self) -> ResourceCounts;

    // ===== LIFECYCLE =====

    /// Query driver strings and limits, enable the debug channel, set default state
    fn initialize(&mut self) -> Result<()>;

    /// Clear the attachments named by `Config::clear_flags`
    fn clear_buffer(&mut self);

    /// Present the back buffer and reset frame statistics
    fn swap_buffers(&mut self) -> Result<()>;

    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);

    fn set_viewport(&mut self, width: u32, height: u32);

    // ===== STATE =====

    /// Row alignment for pixel reads (1, 2, 4 or 8)
    fn set_pack_alignment(&mut self, alignment: u32);

    /// Row alignment for pixel uploads (1, 2, 4 or 8)
    fn set_unpack_alignment(&mut self, alignment: u32);

    fn set_blending_enabled(&mut self, enabled: bool);

    fn is_blending_enabled(&self) -> bool;

    fn set_blend_function(
        &mut self,
        src_color: BlendFactor,
        dst_color: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );

    fn set_blend_equation(&mut self, color: BlendEquation, alpha: BlendEquation);

    fn set_wireframe_enabled(&mut self, enabled: bool);

    fn set_depth_test_enabled(&mut self, enabled: bool);

    // ===== SHADERS =====

    /// Compile both stages and link them into a program
    ///
    /// # Errors
    ///
    /// `ShaderCompilation` with the driver log of the failing stage, or
    /// `ShaderLink` with the link log. Intermediate stage objects are always
    /// released.
    fn create_shader(&mut self, vertex_source: &str, fragment_source: &str) -> Result<Shader>;

    fn delete_shaders(&mut self, shaders: Vec<Shader>);

    fn use_shader(&mut self, shader: &Shader) -> Result<()>;

    /// Resolve a uniform by name. Logs a warning and returns `None` when the
    /// program has no active uniform with that name.
    fn get_uniform_id(&mut self, shader: &Shader, name: &str) -> Option<UniformId>;

    /// Write a plain uniform of `shader`, which must be the current program
    fn set_uniform(&mut self, shader: &Shader, id: UniformId, value: UniformValue) -> Result<()>;

    fn uniform_float(&mut self, shader: &Shader, id: UniformId, value: f32) -> Result<()> {
        self.set_uniform(shader, id, UniformValue::Float(value))
    }

    fn uniform_uint(&mut self, shader: &Shader, id: UniformId, value: u32) -> Result<()> {
        self.set_uniform(shader, id, UniformValue::UInt(value))
    }

    fn uniform_int(&mut self, shader: &Shader, id: UniformId, value: i32) -> Result<()> {
        self.set_uniform(shader, id, UniformValue::Int(value))
    }

    fn uniform_vec2(&mut self, shader: &Shader, id: UniformId, value: Vec2) -> Result<()> {
        self.set_uniform(shader, id, UniformValue::Vec2(value))
    }

    fn uniform_vec3(&mut self, shader: &Shader, id: UniformId, value: Vec3) -> Result<()> {
        self.set_uniform(shader, id, UniformValue::Vec3(value))
    }

    fn uniform_vec4(&mut self, shader: &Shader, id: UniformId, value: Vec4) -> Result<()> {
        self.set_uniform(shader, id, UniformValue::Vec4(value))
    }

    fn uniform_mat3(&mut self, shader: &Shader, id: UniformId, value: Mat3) -> Result<()> {
        self.set_uniform(shader, id, UniformValue::Mat3(value))
    }

    fn uniform_mat4(&mut self, shader: &Shader, id: UniformId, value: Mat4) -> Result<()> {
        self.set_uniform(shader, id, UniformValue::Mat4(value))
    }

    /// Attach the shader's uniform block `block` to `binding_point`.
    /// Returns false (and logs) when the block does not exist.
    fn shader_bind_uniform_block(&mut self, shader: &Shader, block: &str, binding_point: u32) -> bool;

    // ===== TEXTURES =====

    /// Upload pixels, generate mipmaps, then apply wrap and filter state
    fn create_texture_2d(&mut self, desc: &Texture2DDesc<'_>) -> Result<Texture2D>;

    fn delete_textures_2d(&mut self, textures: Vec<Texture2D>);

    /// Bind `texture` to texture unit `unit`
    fn use_texture_2d(&mut self, texture: &Texture2D, unit: u32) -> Result<()>;

    fn set_texture_2d_wrap_mode(
        &mut self,
        texture: &mut Texture2D,
        x: TextureWrapMode,
        y: TextureWrapMode,
    ) -> Result<()>;

    fn set_texture_2d_filter(
        &mut self,
        texture: &mut Texture2D,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Result<()>;

    // ===== VERTEX / INDEX BUFFERS =====

    /// Allocate `size` bytes, optionally initialized with exactly `size` bytes of `data`
    fn create_vertex_buffer(
        &mut self,
        size: u64,
        data: Option<&[u8]>,
        layout: VertexBufferLayout,
    ) -> Result<VertexBuffer>;

    fn use_vertex_buffer(&mut self, buffer: &VertexBuffer) -> Result<()>;

    /// Overwrite `[offset, offset + data.len())`; a range past the end is a logged no-op
    fn vertex_buffer_sub_data(&mut self, buffer: &VertexBuffer, offset: u64, data: &[u8]) -> Result<()>;

    fn delete_vertex_buffers(&mut self, buffers: Vec<VertexBuffer>);

    /// `data` must hold exactly `count` indices of `data_type`
    fn create_index_buffer(&mut self, count: u32, data: &[u8], data_type: DataType) -> Result<IndexBuffer>;

    fn use_index_buffer(&mut self, buffer: &IndexBuffer) -> Result<()>;

    fn delete_index_buffers(&mut self, buffers: Vec<IndexBuffer>);

    // ===== UNIFORM BUFFERS =====

    fn create_uniform_buffer(&mut self, size: u64, data: Option<&[u8]>) -> Result<UniformBuffer>;

    /// Replace the whole content; `data` must be exactly the buffer size
    fn uniform_buffer_data(&mut self, buffer: &UniformBuffer, data: &[u8]) -> Result<()>;

    /// Overwrite `[offset, offset + data.len())`; a range past the end is a logged no-op
    fn uniform_buffer_sub_data(&mut self, buffer: &UniformBuffer, offset: u64, data: &[u8]) -> Result<()>;

    /// Bind the whole buffer to `point`. Rebinding the same point is free.
    fn uniform_buffer_set_binding_point(&mut self, buffer: &mut UniformBuffer, point: u32) -> Result<()>;

    /// Bind `[offset, offset + size)` to `point`. The range must lie inside the
    /// buffer and `offset` must honour the driver's offset alignment.
    fn uniform_buffer_set_binding_point_range(
        &mut self,
        buffer: &mut UniformBuffer,
        offset: u64,
        size: u64,
        point: u32,
    ) -> Result<()>;

    fn delete_uniform_buffers(&mut self, buffers: Vec<UniformBuffer>);

    // ===== VERTEX ARRAYS =====

    fn create_vertex_array(&mut self) -> Result<VertexArray>;

    /// Release arrays together with the buffers they own
    fn delete_vertex_arrays(&mut self, arrays: Vec<VertexArray>);

    fn use_vertex_array(&mut self, array: &VertexArray) -> Result<()>;

    /// Move `buffer` into `array`, wiring its elements to the next free attribute
    /// locations. On error the buffer is released.
    fn vertex_array_bind_vertex_buffer(&mut self, array: &mut VertexArray, buffer: VertexBuffer) -> Result<()>;

    /// Move `buffer` into `array`, releasing any index buffer it replaces
    fn vertex_array_bind_index_buffer(&mut self, array: &mut VertexArray, buffer: IndexBuffer) -> Result<()>;

    // ===== DRAW =====

    /// Draw triangles from `array`, which must be the current vertex array
    fn draw_vertex_array(&mut self, array: &VertexArray) -> Result<()>;
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
