/// Mock Renderer for unit tests (no GPU required)
///
/// Implements the whole `Renderer` contract on the CPU: buffer bytes live in a
/// slot map, shader "compilation" checks for a `main` entry point and scans
/// `uniform` declarations, and every driver-equivalent call is appended to a
/// command log. Validation rules are the same as the GPU backends'.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::renderer::{
    is_valid_pixel_alignment, validate_index_data, validate_initial_data, validate_sub_range,
    Backend, BlendEquation, BlendFactor, Config, DataType, IndexBuffer, NativeHandle,
    RendererInfo, RendererStats, Renderer, ResourceCounter, ResourceCounts, ResourceKind, Shader,
    ShaderStage, Texture2D, Texture2DDesc, TextureFilter, TextureWrapMode, UniformBinding,
    UniformBuffer, UniformId, UniformValue, VertexArray, VertexBuffer, VertexBufferLayout,
};
use crate::{engine_debug, engine_error, engine_info, engine_warn};

const SOURCE: &str = "lumen::mock";

/// Texture units reported by the mock device
pub const MOCK_MAX_TEXTURE_UNITS: u32 = 32;

/// Uniform buffer offset alignment reported by the mock device
pub const MOCK_UNIFORM_OFFSET_ALIGNMENT: u64 = 256;

/// Uniform buffer binding points reported by the mock device
pub const MOCK_MAX_UNIFORM_BINDINGS: u32 = 36;

/// Largest buffer the mock device allocates
pub const MOCK_MAX_BUFFER_SIZE: u64 = i32::MAX as u64;

new_key_type! {
    /// Key of a buffer's bytes in the mock device memory
    pub struct MockBufferKey;
}

// ============================================================================
// Mock device context
// ============================================================================

#[derive(Debug, Default)]
struct MockContext {
    counter: ResourceCounter,
    memory: RefCell<SlotMap<MockBufferKey, Vec<u8>>>,
    commands: RefCell<Vec<String>>,
}

impl MockContext {
    fn record(&self, command: String) {
        self.commands.borrow_mut().push(command);
    }
}

// ============================================================================
// Mock handle
// ============================================================================

/// Backend object behind every mock resource
#[derive(Debug)]
pub struct MockHandle {
    ctx: Rc<MockContext>,
    kind: ResourceKind,
    serial: u64,
    memory: Option<MockBufferKey>,
    uniforms: Vec<String>,
    blocks: Vec<String>,
}

impl MockHandle {
    fn new(ctx: &Rc<MockContext>, kind: ResourceKind) -> Self {
        let serial = ctx.counter.acquire(kind);
        ctx.record(format!("create {:?} #{}", kind, serial));
        Self {
            ctx: Rc::clone(ctx),
            kind,
            serial,
            memory: None,
            uniforms: Vec::new(),
            blocks: Vec::new(),
        }
    }

    fn with_memory(ctx: &Rc<MockContext>, kind: ResourceKind, bytes: Vec<u8>) -> Self {
        let mut handle = Self::new(ctx, kind);
        handle.memory = Some(ctx.memory.borrow_mut().insert(bytes));
        handle
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Uniform names resolved when the program was "linked"
    pub fn uniforms(&self) -> &[String] {
        &self.uniforms
    }

    /// Uniform block names resolved when the program was "linked"
    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    fn bytes(&self) -> Option<Vec<u8>> {
        let key = self.memory?;
        self.ctx.memory.borrow().get(key).cloned()
    }

    fn write(&self, offset: usize, data: &[u8]) {
        if let Some(key) = self.memory {
            if let Some(bytes) = self.ctx.memory.borrow_mut().get_mut(key) {
                bytes[offset..offset + data.len()].copy_from_slice(data);
            }
        }
    }
}

impl NativeHandle for MockHandle {
    fn backend(&self) -> Backend {
        Backend::Mock
    }

    fn raw_id(&self) -> u64 {
        self.serial
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

impl Drop for MockHandle {
    fn drop(&mut self) {
        if let Some(key) = self.memory.take() {
            self.ctx.memory.borrow_mut().remove(key);
        }
        self.ctx.counter.release(self.kind);
        self.ctx.record(format!("delete {:?} #{}", self.kind, self.serial));
    }
}

// ============================================================================
// GLSL declaration scanning
// ============================================================================

/// Plain uniform names and uniform block names declared in a shader source
pub fn scan_uniform_declarations(source: &str) -> (Vec<String>, Vec<String>) {
    let spaced = source.replace('{', " { ").replace('}', " } ").replace(';', " ; ");
    let mut tokens = spaced.split_whitespace();
    let mut uniforms = Vec::new();
    let mut blocks = Vec::new();

    while let Some(token) = tokens.next() {
        if token != "uniform" {
            continue;
        }
        let mut declaration: Vec<&str> = Vec::new();
        for next in tokens.by_ref() {
            match next {
                ";" => {
                    let before_init = declaration.split(|t| *t == "=").next().unwrap_or(&[]);
                    if let Some(&name) = before_init.last() {
                        let name = name.split('[').next().unwrap_or(name);
                        uniforms.push(name.to_string());
                    }
                    break;
                }
                "{" => {
                    if let Some(name) = declaration.last() {
                        blocks.push(name.to_string());
                    }
                    // Skip block members
                    for member in tokens.by_ref() {
                        if member == "}" {
                            break;
                        }
                    }
                    break;
                }
                other => declaration.push(other),
            }
        }
    }

    (uniforms, blocks)
}

/// Names of global `in` or `out` variables declared in a shader source
pub fn scan_stage_interface(source: &str, qualifier: &str) -> Vec<String> {
    let code: String = source
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in code.chars() {
        match c {
            '{' => {
                depth += 1;
                current.clear();
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.clear();
            }
            ';' if depth == 0 => statements.push(std::mem::take(&mut current)),
            _ if depth == 0 => current.push(c),
            _ => {}
        }
    }

    let mut names = Vec::new();
    for statement in statements {
        // Drop layout(...) qualifiers, anything else with parentheses is a prototype
        let statement = match (statement.find("layout"), statement.find(')')) {
            (Some(start), Some(end)) if start < end => {
                format!("{} {}", &statement[..start], &statement[end + 1..])
            }
            _ => statement,
        };
        if statement.contains('(') {
            continue;
        }
        let tokens: Vec<&str> = statement.split_whitespace().collect();
        if tokens.len() < 3 || !tokens[..tokens.len() - 1].contains(&qualifier) {
            continue;
        }
        if let Some(name) = tokens.last() {
            let name = name.split('[').next().unwrap_or(name);
            names.push(name.to_string());
        }
    }
    names
}

/// Backing bytes of a new buffer, zeroed when no data is given
fn allocate(size: u64, data: Option<&[u8]>) -> Result<Vec<u8>> {
    if size > MOCK_MAX_BUFFER_SIZE {
        engine_error!(SOURCE, "Buffer of {} bytes exceeds device memory", size);
        return Err(Error::OutOfMemory);
    }
    Ok(data.map_or_else(|| vec![0u8; size as usize], <[u8]>::to_vec))
}

fn has_entry_point(source: &str) -> bool {
    source.contains("main")
}

// ============================================================================
// Mock renderer
// ============================================================================

/// CPU-only renderer with full state bookkeeping
pub struct MockRenderer {
    ctx: Rc<MockContext>,
    config: Config,
    info: RendererInfo,
    initialized: bool,
    stats: RendererStats,

    clear_color: [f32; 4],
    viewport: (u32, u32),
    pack_alignment: u32,
    unpack_alignment: u32,
    blending: bool,
    blend_function: [BlendFactor; 4],
    blend_equation: (BlendEquation, BlendEquation),
    wireframe: bool,
    depth_test: bool,

    current_shader: Option<u64>,
    current_vertex_array: Option<u64>,
    current_vertex_buffer: Option<u64>,
    current_index_buffer: Option<u64>,
    texture_units: FxHashMap<u32, u64>,
    uniform_bindings: FxHashMap<u32, (u64, UniformBinding)>,
    block_bindings: FxHashMap<(u64, String), u32>,
    uniform_values: FxHashMap<(u64, UniformId), UniformValue>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            ctx: Rc::new(MockContext::default()),
            config,
            info: RendererInfo::default(),
            initialized: false,
            stats: RendererStats::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            viewport: (0, 0),
            pack_alignment: 4,
            unpack_alignment: 4,
            blending: false,
            blend_function: [BlendFactor::One, BlendFactor::Zero, BlendFactor::One, BlendFactor::Zero],
            blend_equation: (BlendEquation::Add, BlendEquation::Add),
            wireframe: false,
            depth_test: false,
            current_shader: None,
            current_vertex_array: None,
            current_vertex_buffer: None,
            current_index_buffer: None,
            texture_units: FxHashMap::default(),
            uniform_bindings: FxHashMap::default(),
            block_bindings: FxHashMap::default(),
            uniform_values: FxHashMap::default(),
        }
    }

    // ===== INSPECTION =====

    /// Driver-equivalent calls issued so far
    pub fn commands(&self) -> Vec<String> {
        self.ctx.commands.borrow().clone()
    }

    pub fn clear_commands(&self) {
        self.ctx.commands.borrow_mut().clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn pack_alignment(&self) -> u32 {
        self.pack_alignment
    }

    pub fn unpack_alignment(&self) -> u32 {
        self.unpack_alignment
    }

    pub fn blend_function(&self) -> [BlendFactor; 4] {
        self.blend_function
    }

    pub fn blend_equation(&self) -> (BlendEquation, BlendEquation) {
        self.blend_equation
    }

    pub fn is_wireframe_enabled(&self) -> bool {
        self.wireframe
    }

    pub fn is_depth_test_enabled(&self) -> bool {
        self.depth_test
    }

    pub fn current_shader(&self) -> Option<u64> {
        self.current_shader
    }

    pub fn current_vertex_array(&self) -> Option<u64> {
        self.current_vertex_array
    }

    /// Serial of the texture bound to `unit`
    pub fn bound_texture(&self, unit: u32) -> Option<u64> {
        self.texture_units.get(&unit).copied()
    }

    /// Buffer serial and range bound to a uniform binding point
    pub fn uniform_binding(&self, point: u32) -> Option<(u64, UniformBinding)> {
        self.uniform_bindings.get(&point).copied()
    }

    /// Binding point a shader's uniform block was attached to
    pub fn uniform_block_binding(&self, shader: &Shader, block: &str) -> Option<u32> {
        self.block_bindings.get(&(shader.serial(), block.to_string())).copied()
    }

    pub fn uniform_value(&self, shader: &Shader, id: UniformId) -> Option<UniformValue> {
        self.uniform_values.get(&(shader.serial(), id)).copied()
    }

    pub fn vertex_buffer_contents(&self, buffer: &VertexBuffer) -> Option<Vec<u8>> {
        buffer.native::<MockHandle>().ok()?.bytes()
    }

    pub fn index_buffer_contents(&self, buffer: &IndexBuffer) -> Option<Vec<u8>> {
        buffer.native::<MockHandle>().ok()?.bytes()
    }

    pub fn uniform_buffer_contents(&self, buffer: &UniformBuffer) -> Option<Vec<u8>> {
        buffer.native::<MockHandle>().ok()?.bytes()
    }

    // ===== HELPERS =====

    fn handle<'a>(&self, result: Result<&'a MockHandle>) -> Result<&'a MockHandle> {
        result.map_err(|e| {
            engine_error!(SOURCE, "{}", e);
            e
        })
    }

    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<MockHandle> {
        let handle = MockHandle::new(&self.ctx, ResourceKind::ShaderStage);
        self.ctx.record(format!("compile {} #{}", stage, handle.serial));
        if !has_entry_point(source) {
            let log = "0:1(1): error: entry point 'main' not found\n".to_string();
            engine_error!(SOURCE, "{} shader compilation failed: {}", stage, log.trim_end());
            return Err(Error::ShaderCompilation { stage, log });
        }
        Ok(handle)
    }

    fn write_buffer(&self, handle: &MockHandle, size: u64, offset: u64, data: &[u8], what: &str) -> bool {
        if let Err(e) = validate_sub_range(offset, data.len() as u64, size) {
            engine_error!(SOURCE, "{} #{} sub-upload ignored: {}", what, handle.serial, e);
            return false;
        }
        handle.write(offset as usize, data);
        self.ctx.record(format!("buffer_sub_data #{} {}+{}", handle.serial, offset, data.len()));
        true
    }

    fn bind_uniform_range(&mut self, buffer: &mut UniformBuffer, binding: UniformBinding) -> Result<()> {
        let serial = self.handle(buffer.native::<MockHandle>())?.serial;
        if binding.point >= MOCK_MAX_UNIFORM_BINDINGS {
            engine_error!(
                SOURCE,
                "Binding point {} ignored (device has {})",
                binding.point,
                MOCK_MAX_UNIFORM_BINDINGS
            );
            return Ok(());
        }
        if self.uniform_bindings.get(&binding.point) == Some(&(serial, binding)) {
            buffer.record_binding(binding);
            return Ok(());
        }
        self.ctx.record(format!(
            "bind_buffer_range point={} #{} {}+{}",
            binding.point, serial, binding.offset, binding.size
        ));
        self.uniform_bindings.insert(binding.point, (serial, binding));
        buffer.record_binding(binding);
        Ok(())
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MockRenderer {
    fn backend(&self) -> Backend {
        Backend::Mock
    }

    fn info(&self) -> &RendererInfo {
        &self.info
    }

    fn stats(&self) -> RendererStats {
        self.stats
    }

    fn live_resources(&self) -> ResourceCounts {
        self.ctx.counter.snapshot()
    }

    fn initialize(&mut self) -> Result<()> {
        self.info = RendererInfo {
            vendor: "Lumen".to_string(),
            device: "Mock Device".to_string(),
            version: "Mock 1.0".to_string(),
            shading_language_version: "none".to_string(),
        };
        self.initialized = true;
        engine_info!(SOURCE, "{} initialized ({})", self.info.device, self.config.app_name);
        Ok(())
    }

    fn clear_buffer(&mut self) {
        self.ctx.record(format!("clear {:?}", self.config.clear_flags));
    }

    fn swap_buffers(&mut self) -> Result<()> {
        self.ctx.record("swap".to_string());
        self.stats = RendererStats::default();
        Ok(())
    }

    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.clear_color = [r, g, b, a];
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn set_pack_alignment(&mut self, alignment: u32) {
        if !is_valid_pixel_alignment(alignment) {
            engine_error!(SOURCE, "Pack alignment {} ignored (expected 1, 2, 4 or 8)", alignment);
            return;
        }
        self.pack_alignment = alignment;
    }

    fn set_unpack_alignment(&mut self, alignment: u32) {
        if !is_valid_pixel_alignment(alignment) {
            engine_error!(SOURCE, "Unpack alignment {} ignored (expected 1, 2, 4 or 8)", alignment);
            return;
        }
        self.unpack_alignment = alignment;
    }

    fn set_blending_enabled(&mut self, enabled: bool) {
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
        self.blend_function = [src_color, dst_color, src_alpha, dst_alpha];
    }

    fn set_blend_equation(&mut self, color: BlendEquation, alpha: BlendEquation) {
        self.blend_equation = (color, alpha);
    }

    fn set_wireframe_enabled(&mut self, enabled: bool) {
        self.wireframe = enabled;
    }

    fn set_depth_test_enabled(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    // ===== SHADERS =====

    fn create_shader(&mut self, vertex_source: &str, fragment_source: &str) -> Result<Shader> {
        // Stage handles drop at the end of this scope, success or not
        let vertex = self.compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment = self.compile_stage(ShaderStage::Fragment, fragment_source)?;

        let outputs = scan_stage_interface(vertex_source, "out");
        let unmatched: Vec<String> = scan_stage_interface(fragment_source, "in")
            .into_iter()
            .filter(|name| !outputs.contains(name))
            .collect();
        if !unmatched.is_empty() {
            let log = unmatched
                .iter()
                .map(|name| format!("error: fragment shader input `{}' has no matching vertex shader output\n", name))
                .collect::<String>();
            self.ctx.record(format!("link failed (stages #{} #{})", vertex.serial, fragment.serial));
            engine_error!(SOURCE, "Shader link failed: {}", log.trim_end());
            return Err(Error::ShaderLink { log });
        }

        let mut program = MockHandle::new(&self.ctx, ResourceKind::Shader);
        self.ctx.record(format!(
            "link #{} (stages #{} #{})",
            program.serial, vertex.serial, fragment.serial
        ));

        for source in [vertex_source, fragment_source] {
            let (uniforms, blocks) = scan_uniform_declarations(source);
            for name in uniforms {
                if !program.uniforms.contains(&name) {
                    program.uniforms.push(name);
                }
            }
            for name in blocks {
                if !program.blocks.contains(&name) {
                    program.blocks.push(name);
                }
            }
        }

        engine_debug!(SOURCE, "Shader #{} linked ({} uniforms)", program.serial, program.uniforms.len());
        Ok(Shader::new(Box::new(program)))
    }

    fn delete_shaders(&mut self, shaders: Vec<Shader>) {
        for shader in shaders {
            let serial = shader.serial();
            if self.current_shader == Some(serial) {
                self.current_shader = None;
            }
            self.uniform_values.retain(|(s, _), _| *s != serial);
            self.block_bindings.retain(|(s, _), _| *s != serial);
        }
    }

    fn use_shader(&mut self, shader: &Shader) -> Result<()> {
        let serial = self.handle(shader.native::<MockHandle>())?.serial;
        if self.current_shader != Some(serial) {
            self.ctx.record(format!("use_program #{}", serial));
            self.current_shader = Some(serial);
        }
        Ok(())
    }

    fn get_uniform_id(&mut self, shader: &Shader, name: &str) -> Option<UniformId> {
        let program = self.handle(shader.native::<MockHandle>()).ok()?;
        match program.uniforms.iter().position(|u| u == name) {
            Some(index) => Some(UniformId::new(index as u64)),
            None => {
                engine_warn!(SOURCE, "Uniform '{}' not found in shader #{}", name, program.serial);
                None
            }
        }
    }

    fn set_uniform(&mut self, shader: &Shader, id: UniformId, value: UniformValue) -> Result<()> {
        let program = self.handle(shader.native::<MockHandle>())?;
        if self.current_shader != Some(program.serial) {
            let err = Error::InvalidResource(format!("Shader #{} is not the current program", program.serial));
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        }
        if id.raw() as usize >= program.uniforms.len() {
            let err = Error::InvalidParameter(format!("Uniform id {} out of range", id.raw()));
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        }
        self.ctx.record(format!("uniform {} #{} loc={}", value.type_name(), program.serial, id.raw()));
        self.uniform_values.insert((program.serial, id), value);
        Ok(())
    }

    fn shader_bind_uniform_block(&mut self, shader: &Shader, block: &str, binding_point: u32) -> bool {
        let Ok(program) = self.handle(shader.native::<MockHandle>()) else {
            return false;
        };
        if !program.blocks.iter().any(|b| b == block) {
            engine_warn!(SOURCE, "Uniform block '{}' not found in shader #{}", block, program.serial);
            return false;
        }
        let serial = program.serial;
        self.ctx.record(format!("uniform_block_binding #{} {}={}", serial, block, binding_point));
        self.block_bindings.insert((serial, block.to_string()), binding_point);
        true
    }

    // ===== TEXTURES =====

    fn create_texture_2d(&mut self, desc: &Texture2DDesc<'_>) -> Result<Texture2D> {
        desc.validate(self.unpack_alignment).map_err(|e| {
            engine_error!(SOURCE, "Texture creation rejected: {}", e);
            e
        })?;
        let handle = MockHandle::new(&self.ctx, ResourceKind::Texture);
        self.ctx.record(format!(
            "tex_image_2d #{} {}x{} {} {} data={}",
            handle.serial,
            desc.width,
            desc.height,
            desc.format,
            desc.data_type,
            desc.data.is_some()
        ));
        self.ctx.record(format!("generate_mipmap #{}", handle.serial));
        Ok(Texture2D::new(desc.info(), Box::new(handle)))
    }

    fn delete_textures_2d(&mut self, textures: Vec<Texture2D>) {
        for texture in textures {
            let serial = texture.serial();
            self.texture_units.retain(|_, bound| *bound != serial);
        }
    }

    fn use_texture_2d(&mut self, texture: &Texture2D, unit: u32) -> Result<()> {
        let serial = self.handle(texture.native::<MockHandle>())?.serial;
        if unit >= MOCK_MAX_TEXTURE_UNITS {
            engine_error!(SOURCE, "Texture unit {} ignored (device has {})", unit, MOCK_MAX_TEXTURE_UNITS);
            return Ok(());
        }
        self.ctx.record(format!("bind_texture unit={} #{}", unit, serial));
        self.texture_units.insert(unit, serial);
        Ok(())
    }

    fn set_texture_2d_wrap_mode(
        &mut self,
        texture: &mut Texture2D,
        x: TextureWrapMode,
        y: TextureWrapMode,
    ) -> Result<()> {
        let serial = self.handle(texture.native::<MockHandle>())?.serial;
        self.ctx.record(format!("tex_wrap #{} {} {}", serial, x, y));
        texture.record_wrap_mode(x, y);
        Ok(())
    }

    fn set_texture_2d_filter(
        &mut self,
        texture: &mut Texture2D,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Result<()> {
        let serial = self.handle(texture.native::<MockHandle>())?.serial;
        if !mag.is_valid_mag_filter() {
            engine_error!(SOURCE, "Magnification filter {} ignored for texture #{}", mag, serial);
            return Ok(());
        }
        self.ctx.record(format!("tex_filter #{} {} {}", serial, min, mag));
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
        let bytes = allocate(size, data)?;
        let handle = MockHandle::with_memory(&self.ctx, ResourceKind::VertexBuffer, bytes);
        self.ctx.record(format!("buffer_data #{} {} bytes", handle.serial, size));
        Ok(VertexBuffer::new(size, layout, Box::new(handle)))
    }

    fn use_vertex_buffer(&mut self, buffer: &VertexBuffer) -> Result<()> {
        let serial = self.handle(buffer.native::<MockHandle>())?.serial;
        self.ctx.record(format!("bind_array_buffer #{}", serial));
        self.current_vertex_buffer = Some(serial);
        Ok(())
    }

    fn vertex_buffer_sub_data(&mut self, buffer: &VertexBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let handle = self.handle(buffer.native::<MockHandle>())?;
        self.write_buffer(handle, buffer.size(), offset, data, "VertexBuffer");
        Ok(())
    }

    fn delete_vertex_buffers(&mut self, buffers: Vec<VertexBuffer>) {
        for buffer in buffers {
            if self.current_vertex_buffer == Some(buffer.serial()) {
                self.current_vertex_buffer = None;
            }
        }
    }

    fn create_index_buffer(&mut self, count: u32, data: &[u8], data_type: DataType) -> Result<IndexBuffer> {
        validate_index_data(count, data, data_type).map_err(|e| {
            engine_error!(SOURCE, "Index buffer creation rejected: {}", e);
            e
        })?;
        let handle = MockHandle::with_memory(&self.ctx, ResourceKind::IndexBuffer, data.to_vec());
        self.ctx.record(format!("buffer_data #{} {} {} indices", handle.serial, count, data_type));
        Ok(IndexBuffer::new(count, data_type, Box::new(handle)))
    }

    fn use_index_buffer(&mut self, buffer: &IndexBuffer) -> Result<()> {
        let serial = self.handle(buffer.native::<MockHandle>())?.serial;
        self.ctx.record(format!("bind_element_buffer #{}", serial));
        self.current_index_buffer = Some(serial);
        Ok(())
    }

    fn delete_index_buffers(&mut self, buffers: Vec<IndexBuffer>) {
        for buffer in buffers {
            if self.current_index_buffer == Some(buffer.serial()) {
                self.current_index_buffer = None;
            }
        }
    }

    // ===== UNIFORM BUFFERS =====

    fn create_uniform_buffer(&mut self, size: u64, data: Option<&[u8]>) -> Result<UniformBuffer> {
        validate_initial_data(size, data).map_err(|e| {
            engine_error!(SOURCE, "Uniform buffer creation rejected: {}", e);
            e
        })?;
        let bytes = allocate(size, data)?;
        let handle = MockHandle::with_memory(&self.ctx, ResourceKind::UniformBuffer, bytes);
        self.ctx.record(format!("buffer_data #{} {} bytes", handle.serial, size));
        Ok(UniformBuffer::new(size, Box::new(handle)))
    }

    fn uniform_buffer_data(&mut self, buffer: &UniformBuffer, data: &[u8]) -> Result<()> {
        let handle = self.handle(buffer.native::<MockHandle>())?;
        if data.len() as u64 != buffer.size() {
            engine_error!(
                SOURCE,
                "UniformBuffer #{} upload ignored: {} bytes for a {}-byte buffer",
                handle.serial,
                data.len(),
                buffer.size()
            );
            return Ok(());
        }
        self.write_buffer(handle, buffer.size(), 0, data, "UniformBuffer");
        Ok(())
    }

    fn uniform_buffer_sub_data(&mut self, buffer: &UniformBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let handle = self.handle(buffer.native::<MockHandle>())?;
        self.write_buffer(handle, buffer.size(), offset, data, "UniformBuffer");
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
        let serial = self.handle(buffer.native::<MockHandle>())?.serial;
        if let Err(e) = validate_sub_range(offset, size, buffer.size()) {
            engine_error!(SOURCE, "UniformBuffer #{} range binding ignored: {}", serial, e);
            return Ok(());
        }
        if offset % MOCK_UNIFORM_OFFSET_ALIGNMENT != 0 {
            engine_error!(
                SOURCE,
                "UniformBuffer #{} range binding ignored: offset {} not a multiple of {}",
                serial,
                offset,
                MOCK_UNIFORM_OFFSET_ALIGNMENT
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
        Ok(VertexArray::new(Box::new(MockHandle::new(&self.ctx, ResourceKind::VertexArray))))
    }

    fn delete_vertex_arrays(&mut self, arrays: Vec<VertexArray>) {
        for array in arrays {
            if self.current_vertex_array == Some(array.serial()) {
                self.current_vertex_array = None;
            }
        }
    }

    fn use_vertex_array(&mut self, array: &VertexArray) -> Result<()> {
        let serial = self.handle(array.native::<MockHandle>())?.serial;
        if self.current_vertex_array != Some(serial) {
            self.ctx.record(format!("bind_vertex_array #{}", serial));
            self.current_vertex_array = Some(serial);
        }
        Ok(())
    }

    fn vertex_array_bind_vertex_buffer(&mut self, array: &mut VertexArray, buffer: VertexBuffer) -> Result<()> {
        let array_serial = self.handle(array.native::<MockHandle>())?.serial;
        let buffer_serial = self.handle(buffer.native::<MockHandle>())?.serial;

        let mut location = array.next_attribute_location();
        for (element, offset) in buffer.layout().iter() {
            for column in 0..element.structure.location_span() {
                let column_offset =
                    offset + column * element.structure.column_component_count() * element.data_type.byte_size();
                self.ctx.record(format!(
                    "vertex_attrib #{} loc={} {}x{} stride={} offset={} normalized={}",
                    array_serial,
                    location,
                    element.structure.column_component_count(),
                    element.data_type,
                    buffer.layout().stride(),
                    column_offset,
                    element.normalized
                ));
                location += 1;
            }
        }
        self.ctx.record(format!("attach_vertex_buffer #{} #{}", array_serial, buffer_serial));
        array.push_vertex_buffer(buffer);
        Ok(())
    }

    fn vertex_array_bind_index_buffer(&mut self, array: &mut VertexArray, buffer: IndexBuffer) -> Result<()> {
        let array_serial = self.handle(array.native::<MockHandle>())?.serial;
        let buffer_serial = self.handle(buffer.native::<MockHandle>())?.serial;
        self.ctx.record(format!("attach_index_buffer #{} #{}", array_serial, buffer_serial));
        // The replaced buffer is released here
        drop(array.replace_index_buffer(buffer));
        Ok(())
    }

    // ===== DRAW =====

    fn draw_vertex_array(&mut self, array: &VertexArray) -> Result<()> {
        let serial = self.handle(array.native::<MockHandle>())?.serial;
        if self.current_vertex_array != Some(serial) {
            let err = Error::InvalidResource(format!("VertexArray #{} is not the current vertex array", serial));
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
        self.ctx.record(format!("draw #{} {:?}", serial, plan));
        self.stats.record_draw(plan.triangle_count());
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_renderer_tests.rs"]
mod tests;
