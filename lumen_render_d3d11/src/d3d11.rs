/// D3D11Renderer - Direct3D 11 implementation of the Renderer trait

use std::ffi::c_void;
use std::rc::Rc;

use lumen_render::lumen::render::{
    is_valid_pixel_alignment, validate_index_data, validate_initial_data, validate_sub_range,
    Backend, BlendEquation, BlendFactor, ClearFlags, Config, DataType, DebugMessageSink, DrawPlan,
    IndexBuffer, NativeHandle, RendererInfo, RendererStats, ResourceCounts, ResourceKind, Shader,
    ShaderStage, Texture2D, Texture2DDesc, TextureFilter, TextureWrapMode, UniformBinding,
    UniformBuffer, UniformId, UniformValue, ValidationStats, VertexArray, VertexBuffer,
    VertexBufferLayout,
};
use lumen_render::lumen::{Error, Renderer, Result};
use lumen_render::{engine_debug, engine_error, engine_info, engine_warn};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use rustc_hash::FxHashMap;
use windows::core::Interface;
use windows::Win32::Foundation::{BOOL, HMODULE, HWND, RECT};
use windows::Win32::Graphics::Direct3D::{
    D3D_DRIVER_TYPE_HARDWARE, D3D_FEATURE_LEVEL, D3D_FEATURE_LEVEL_10_0, D3D_FEATURE_LEVEL_10_1,
    D3D_FEATURE_LEVEL_11_0, D3D_FEATURE_LEVEL_11_1, D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
};
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::{
    IDXGIDevice, IDXGISwapChain, DXGI_PRESENT, DXGI_SWAP_CHAIN_DESC, DXGI_SWAP_EFFECT_DISCARD,
    DXGI_USAGE_RENDER_TARGET_OUTPUT,
};
use windows::Win32::UI::WindowsAndMessaging::GetClientRect;

use crate::d3d11_buffer::D3dBuffer;
use crate::d3d11_constants::RANGE_ALIGNMENT;
use crate::d3d11_context::{driver_error, D3dContext};
use crate::d3d11_format::{
    blend_factor, blend_factor_alpha, blend_op, feature_level_name, index_format, vendor_name,
};
use crate::d3d11_shader::{BoundUniform, D3dProgram, D3dShader, D3dShaderStage};
use crate::d3d11_texture::D3dTexture;
use crate::d3d11_upload::widen_u8_indices;
use crate::d3d11_vertex_array::D3dVertexArray;
use crate::debug::{print_validation_stats_report, InfoQueueDrain};

const SOURCE: &str = "lumen::d3d11";

/// Pixel-shader resource and sampler slots usable as texture units
const MAX_TEXTURE_UNITS: u32 = D3D11_COMMONSHADER_SAMPLER_SLOT_COUNT;

/// Constant buffer slots available to each stage
const MAX_UNIFORM_BINDINGS: u32 = D3D11_COMMONSHADER_CONSTANT_BUFFER_API_SLOT_COUNT;

const FEATURE_LEVELS: [D3D_FEATURE_LEVEL; 4] = [
    D3D_FEATURE_LEVEL_11_1,
    D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_10_1,
    D3D_FEATURE_LEVEL_10_0,
];

fn checked<T>(result: Result<&T>) -> Result<&T> {
    result.map_err(|e| {
        engine_error!(SOURCE, "{}", e);
        e
    })
}

fn init_error(message: String) -> Error {
    engine_error!(SOURCE, "{}", message);
    Error::InitializationFailed(message)
}

/// Blend function and equations, applied as one blend state object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlendSettings {
    src_color: BlendFactor,
    dst_color: BlendFactor,
    src_alpha: BlendFactor,
    dst_alpha: BlendFactor,
    color_op: BlendEquation,
    alpha_op: BlendEquation,
}

impl Default for BlendSettings {
    /// OpenGL defaults: ONE, ZERO, ADD
    fn default() -> Self {
        Self {
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            color_op: BlendEquation::Add,
            alpha_op: BlendEquation::Add,
        }
    }
}

/// Direct3D 11 renderer
///
/// Owns the device, swap chain and back-buffer views. OpenGL-style state
/// (blending, wireframe, depth test) is kept on the CPU and turned into
/// immutable state objects whenever it changes.
pub struct D3D11Renderer {
    ctx: Rc<D3dContext>,
    swap_chain: IDXGISwapChain,
    render_target: ID3D11RenderTargetView,
    depth_stencil: ID3D11DepthStencilView,
    feature_level: D3D_FEATURE_LEVEL,
    size: (u32, u32),

    config: Config,
    info: RendererInfo,
    debug: Option<InfoQueueDrain>,
    stats: RendererStats,

    clear_color: [f32; 4],
    pack_alignment: u32,
    unpack_alignment: u32,
    blending: bool,
    blend: BlendSettings,
    wireframe: bool,
    depth_test: bool,

    current_program: Option<Rc<D3dProgram>>,
    current_vertex_array: Option<u64>,
    bound_textures: FxHashMap<u32, u64>,
    uniform_bindings: FxHashMap<u32, BoundUniform>,
}

impl D3D11Renderer {
    /// Create the device, swap chain and back-buffer views for a Win32 window
    ///
    /// With `Config::enable_validation` the debug layer is requested; when it is
    /// not installed the device is created without it.
    pub fn new(window: &impl HasWindowHandle, config: Config) -> Result<Self> {
        let handle = window
            .window_handle()
            .map_err(|e| init_error(format!("Window handle unavailable: {}", e)))?;
        let hwnd = match handle.as_raw() {
            RawWindowHandle::Win32(win32) => HWND(win32.hwnd.get() as *mut c_void),
            other => return Err(init_error(format!("Direct3D 11 needs a Win32 window, got {:?}", other))),
        };

        let mut rect = RECT::default();
        unsafe {
            GetClientRect(hwnd, &mut rect).map_err(|e| init_error(format!("GetClientRect failed: {}", e)))?;
        }
        let size = (
            (rect.right - rect.left).max(1) as u32,
            (rect.bottom - rect.top).max(1) as u32,
        );

        let (device, context, swap_chain, feature_level) = if config.enable_validation {
            match create_device(hwnd, size, D3D11_CREATE_DEVICE_DEBUG) {
                Ok(created) => created,
                Err(e) => {
                    engine_warn!(SOURCE, "Debug layer unavailable ({}), creating device without it", e);
                    create_device(hwnd, size, D3D11_CREATE_DEVICE_FLAG(0))
                        .map_err(|e| init_error(format!("Failed to create device and swap chain: {}", e)))?
                }
            }
        } else {
            create_device(hwnd, size, D3D11_CREATE_DEVICE_FLAG(0))
                .map_err(|e| init_error(format!("Failed to create device and swap chain: {}", e)))?
        };

        let ctx = Rc::new(D3dContext::new(device, context));
        let (render_target, depth_stencil) = create_views(&ctx, &swap_chain, size)?;
        unsafe {
            ctx.context
                .OMSetRenderTargets(Some(&[Some(render_target.clone())]), &depth_stencil);
        }

        engine_debug!(SOURCE, "Device created ({}x{}, feature level {})", size.0, size.1, feature_level_name(feature_level));
        Ok(Self {
            ctx,
            swap_chain,
            render_target,
            depth_stencil,
            feature_level,
            size,
            config,
            info: RendererInfo::default(),
            debug: None,
            stats: RendererStats::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            pack_alignment: 4,
            unpack_alignment: 4,
            blending: false,
            blend: BlendSettings::default(),
            wireframe: false,
            depth_test: false,
            current_program: None,
            current_vertex_array: None,
            bound_textures: FxHashMap::default(),
            uniform_bindings: FxHashMap::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Device access for code outside the renderer contract
    pub fn device(&self) -> &ID3D11Device {
        &self.ctx.device
    }

    fn adapter_description(&self) -> Option<(String, String)> {
        unsafe {
            let dxgi_device = self.ctx.device.cast::<IDXGIDevice>().ok()?;
            let adapter = dxgi_device.GetAdapter().ok()?;
            let desc = adapter.GetDesc().ok()?;
            let name_len = desc.Description.iter().position(|c| *c == 0).unwrap_or(desc.Description.len());
            Some((
                vendor_name(desc.VendorId),
                String::from_utf16_lossy(&desc.Description[..name_len]),
            ))
        }
    }

    fn drain_debug_messages(&self) {
        if let Some(debug) = &self.debug {
            debug.drain();
        }
    }

    // ===== STATE OBJECTS =====

    fn apply_blend_state(&self) {
        let context = &self.ctx.context;
        if !self.blending {
            unsafe {
                context.OMSetBlendState(None, None, u32::MAX);
            }
            return;
        }

        let target = D3D11_RENDER_TARGET_BLEND_DESC {
            BlendEnable: BOOL::from(true),
            SrcBlend: blend_factor(self.blend.src_color),
            DestBlend: blend_factor(self.blend.dst_color),
            BlendOp: blend_op(self.blend.color_op),
            SrcBlendAlpha: blend_factor_alpha(self.blend.src_alpha),
            DestBlendAlpha: blend_factor_alpha(self.blend.dst_alpha),
            BlendOpAlpha: blend_op(self.blend.alpha_op),
            RenderTargetWriteMask: D3D11_COLOR_WRITE_ENABLE_ALL.0 as u8,
        };
        let desc = D3D11_BLEND_DESC {
            AlphaToCoverageEnable: BOOL::from(false),
            IndependentBlendEnable: BOOL::from(false),
            RenderTarget: [target; 8],
        };

        let mut state = None;
        unsafe {
            if let Err(e) = self.ctx.device.CreateBlendState(&desc, Some(&mut state)) {
                engine_error!(SOURCE, "Failed to create blend state: {}", e);
                return;
            }
            context.OMSetBlendState(state.as_ref(), None, u32::MAX);
        }
    }

    fn apply_rasterizer_state(&self) {
        let desc = D3D11_RASTERIZER_DESC {
            FillMode: if self.wireframe { D3D11_FILL_WIREFRAME } else { D3D11_FILL_SOLID },
            CullMode: D3D11_CULL_NONE,
            FrontCounterClockwise: BOOL::from(true),
            DepthBias: 0,
            DepthBiasClamp: 0.0,
            SlopeScaledDepthBias: 0.0,
            DepthClipEnable: BOOL::from(true),
            ScissorEnable: BOOL::from(false),
            MultisampleEnable: BOOL::from(false),
            AntialiasedLineEnable: BOOL::from(false),
        };
        let mut state = None;
        unsafe {
            if let Err(e) = self.ctx.device.CreateRasterizerState(&desc, Some(&mut state)) {
                engine_error!(SOURCE, "Failed to create rasterizer state: {}", e);
                return;
            }
            self.ctx.context.RSSetState(state.as_ref());
        }
    }

    fn apply_depth_state(&self) {
        let desc = D3D11_DEPTH_STENCIL_DESC {
            DepthEnable: BOOL::from(self.depth_test),
            DepthWriteMask: D3D11_DEPTH_WRITE_MASK_ALL,
            DepthFunc: D3D11_COMPARISON_LESS,
            StencilEnable: BOOL::from(false),
            ..Default::default()
        };
        let mut state = None;
        unsafe {
            if let Err(e) = self.ctx.device.CreateDepthStencilState(&desc, Some(&mut state)) {
                engine_error!(SOURCE, "Failed to create depth-stencil state: {}", e);
                return;
            }
            self.ctx.context.OMSetDepthStencilState(state.as_ref(), 0);
        }
    }

    // ===== BUFFERS =====

    fn write_buffer(&self, handle: &D3dBuffer, size: u64, offset: u64, data: &[u8], what: &str) {
        if let Err(e) = validate_sub_range(offset, data.len() as u64, size) {
            engine_error!(SOURCE, "{} #{} sub-upload ignored: {}", what, handle.serial(), e);
            return;
        }
        handle.write(offset, data);
    }

    fn bind_uniform_range(&mut self, buffer: &mut UniformBuffer, binding: UniformBinding) -> Result<()> {
        let handle = checked(buffer.native::<D3dBuffer>())?;
        let serial = buffer.serial();

        if binding.point >= MAX_UNIFORM_BINDINGS {
            engine_error!(
                SOURCE,
                "UniformBuffer #{} binding ignored: point {} exceeds the {} available",
                serial,
                binding.point,
                MAX_UNIFORM_BINDINGS
            );
            return Ok(());
        }

        let unchanged = self
            .uniform_bindings
            .get(&binding.point)
            .is_some_and(|bound| bound.serial == serial && bound.binding == binding);
        if !unchanged {
            self.uniform_bindings.insert(
                binding.point,
                BoundUniform {
                    serial,
                    binding,
                    buffer: handle.buffer.clone(),
                    width: buffer.size(),
                },
            );
        }
        buffer.record_binding(binding);
        Ok(())
    }

    fn rebind_texture_units(&self, texture: &Texture2D, handle: &D3dTexture) {
        for (unit, serial) in &self.bound_textures {
            if *serial == texture.serial() {
                handle.bind(*unit);
            }
        }
    }

    fn draw(&mut self, array: &VertexArray, program: &D3dProgram, plan: DrawPlan) -> Result<()> {
        let vao = checked(array.native::<D3dVertexArray>())?;
        let layout = vao.input_layout(program)?;

        let mut buffers = Vec::with_capacity(array.vertex_buffers().len());
        let mut strides = Vec::with_capacity(buffers.capacity());
        for buffer in array.vertex_buffers() {
            buffers.push(Some(checked(buffer.native::<D3dBuffer>())?.buffer.clone()));
            strides.push(buffer.layout().stride());
        }
        let offsets = vec![0u32; buffers.len()];

        let context = &self.ctx.context;
        unsafe {
            context.IASetInputLayout(&layout);
            context.IASetVertexBuffers(
                0,
                buffers.len() as u32,
                Some(buffers.as_ptr()),
                Some(strides.as_ptr()),
                Some(offsets.as_ptr()),
            );
            context.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
        }
        program.apply_constants(&self.uniform_bindings);

        unsafe {
            match plan {
                DrawPlan::Indexed { count, data_type } => {
                    if let Some(index_buffer) = array.index_buffer() {
                        let handle = checked(index_buffer.native::<D3dBuffer>())?;
                        context.IASetIndexBuffer(&handle.buffer, index_format(data_type), 0);
                    }
                    context.DrawIndexed(count, 0, 0);
                }
                DrawPlan::Arrays { vertex_count } => context.Draw(vertex_count, 0),
            }
        }
        Ok(())
    }
}

fn create_device(
    hwnd: HWND,
    size: (u32, u32),
    flags: D3D11_CREATE_DEVICE_FLAG,
) -> windows::core::Result<(ID3D11Device, ID3D11DeviceContext, IDXGISwapChain, D3D_FEATURE_LEVEL)> {
    let swap_desc = DXGI_SWAP_CHAIN_DESC {
        BufferDesc: DXGI_MODE_DESC {
            Width: size.0,
            Height: size.1,
            RefreshRate: DXGI_RATIONAL { Numerator: 0, Denominator: 1 },
            Format: DXGI_FORMAT_R8G8B8A8_UNORM,
            ..Default::default()
        },
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
        BufferCount: 1,
        OutputWindow: hwnd,
        Windowed: BOOL::from(true),
        SwapEffect: DXGI_SWAP_EFFECT_DISCARD,
        Flags: 0,
    };

    let mut swap_chain = None;
    let mut device = None;
    let mut context = None;
    let mut feature_level = D3D_FEATURE_LEVEL::default();
    unsafe {
        D3D11CreateDeviceAndSwapChain(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            HMODULE::default(),
            flags,
            Some(&FEATURE_LEVELS),
            D3D11_SDK_VERSION,
            Some(&swap_desc),
            Some(&mut swap_chain),
            Some(&mut device),
            Some(&mut feature_level),
            Some(&mut context),
        )?;
    }

    match (device, context, swap_chain) {
        (Some(device), Some(context), Some(swap_chain)) => Ok((device, context, swap_chain, feature_level)),
        _ => Err(windows::core::Error::from(windows::Win32::Foundation::E_FAIL)),
    }
}

/// Render-target view of the back buffer and a matching depth-stencil view
fn create_views(
    ctx: &D3dContext,
    swap_chain: &IDXGISwapChain,
    size: (u32, u32),
) -> Result<(ID3D11RenderTargetView, ID3D11DepthStencilView)> {
    unsafe {
        let back_buffer: ID3D11Texture2D = swap_chain
            .GetBuffer(0)
            .map_err(|e| init_error(format!("Failed to get back buffer: {}", e)))?;
        let mut render_target = None;
        ctx.device
            .CreateRenderTargetView(&back_buffer, None, Some(&mut render_target))
            .map_err(|e| init_error(format!("Failed to create render target view: {}", e)))?;

        let depth_desc = D3D11_TEXTURE2D_DESC {
            Width: size.0,
            Height: size.1,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_D24_UNORM_S8_UINT,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_DEPTH_STENCIL.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let mut depth_texture = None;
        ctx.device
            .CreateTexture2D(&depth_desc, None, Some(&mut depth_texture))
            .map_err(|e| init_error(format!("Failed to create depth buffer: {}", e)))?;
        let depth_texture = depth_texture.ok_or_else(|| init_error("No depth buffer returned".to_string()))?;

        let mut depth_stencil = None;
        ctx.device
            .CreateDepthStencilView(&depth_texture, None, Some(&mut depth_stencil))
            .map_err(|e| init_error(format!("Failed to create depth-stencil view: {}", e)))?;

        match (render_target, depth_stencil) {
            (Some(render_target), Some(depth_stencil)) => Ok((render_target, depth_stencil)),
            _ => Err(init_error("Back-buffer views were not returned".to_string())),
        }
    }
}

impl Renderer for D3D11Renderer {
    fn backend(&self) -> Backend {
        Backend::D3D11
    }

    fn info(&self) -> &RendererInfo {
        &self.info
    }

    fn stats(&self) -> RendererStats {
        self.stats
    }

    fn validation_stats(&self) -> ValidationStats {
        self.debug
            .as_ref()
            .map(|debug| debug.sink().stats())
            .unwrap_or_default()
    }

    fn live_resources(&self) -> ResourceCounts {
        self.ctx.counter.snapshot()
    }

    fn initialize(&mut self) -> Result<()> {
        if self.config.enable_validation {
            let sink = DebugMessageSink::new(SOURCE, self.config.debug_sink_config());
            self.debug = InfoQueueDrain::new(&self.ctx.device, sink);
            if self.debug.is_none() {
                engine_warn!(SOURCE, "Debug layer not active, no validation messages will be reported");
            }
        }

        let (vendor, device) = self
            .adapter_description()
            .unwrap_or_else(|| ("Unknown".to_string(), "Unknown adapter".to_string()));
        self.info = RendererInfo {
            vendor,
            device,
            version: format!("Direct3D 11 (feature level {})", feature_level_name(self.feature_level)),
            shading_language_version: "HLSL 5.0".to_string(),
        };

        self.set_viewport(self.size.0, self.size.1);
        self.apply_blend_state();
        self.apply_rasterizer_state();
        self.apply_depth_state();
        self.drain_debug_messages();

        engine_info!(
            SOURCE,
            "{} initialized: {} ({})",
            self.config.app_name,
            self.info.device,
            self.info.version
        );
        Ok(())
    }

    fn clear_buffer(&mut self) {
        let flags = self.config.clear_flags;
        let context = &self.ctx.context;
        let mut depth_flags = 0u32;
        if flags.contains(ClearFlags::DEPTH) {
            depth_flags |= D3D11_CLEAR_DEPTH.0 as u32;
        }
        if flags.contains(ClearFlags::STENCIL) {
            depth_flags |= D3D11_CLEAR_STENCIL.0 as u32;
        }
        unsafe {
            if flags.contains(ClearFlags::COLOR) {
                context.ClearRenderTargetView(&self.render_target, &self.clear_color);
            }
            if depth_flags != 0 {
                context.ClearDepthStencilView(&self.depth_stencil, depth_flags, 1.0, 0);
            }
        }
    }

    fn swap_buffers(&mut self) -> Result<()> {
        let interval = u32::from(self.config.vsync);
        unsafe {
            self.swap_chain
                .Present(interval, DXGI_PRESENT(0))
                .ok()
                .map_err(|e| driver_error("Failed to present", e))?;
        }
        self.drain_debug_messages();
        self.stats = RendererStats::default();
        Ok(())
    }

    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.clear_color = [r, g, b, a];
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        let viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width as f32,
            Height: height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        unsafe {
            self.ctx.context.RSSetViewports(Some(&[viewport]));
        }
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
        self.apply_blend_state();
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
        self.blend = BlendSettings {
            src_color,
            dst_color,
            src_alpha,
            dst_alpha,
            ..self.blend
        };
        self.apply_blend_state();
    }

    fn set_blend_equation(&mut self, color: BlendEquation, alpha: BlendEquation) {
        self.blend = BlendSettings {
            color_op: color,
            alpha_op: alpha,
            ..self.blend
        };
        self.apply_blend_state();
    }

    fn set_wireframe_enabled(&mut self, enabled: bool) {
        if self.wireframe != enabled {
            self.wireframe = enabled;
            self.apply_rasterizer_state();
        }
    }

    fn set_depth_test_enabled(&mut self, enabled: bool) {
        if self.depth_test != enabled {
            self.depth_test = enabled;
            self.apply_depth_state();
        }
    }

    // ===== SHADERS =====

    fn create_shader(&mut self, vertex_source: &str, fragment_source: &str) -> Result<Shader> {
        let debug = self.config.enable_validation;
        let vertex = D3dShaderStage::compile(&self.ctx, ShaderStage::Vertex, vertex_source, debug)?;
        let fragment = D3dShaderStage::compile(&self.ctx, ShaderStage::Fragment, fragment_source, debug)?;
        let program = D3dProgram::link(&self.ctx, &vertex, &fragment)?;
        Ok(Shader::new(Box::new(D3dShader {
            program: Rc::new(program),
        })))
    }

    fn delete_shaders(&mut self, shaders: Vec<Shader>) {
        for shader in shaders {
            if self.current_program.as_ref().is_some_and(|p| p.serial() == shader.serial()) {
                unsafe {
                    self.ctx.context.VSSetShader(None, None);
                    self.ctx.context.PSSetShader(None, None);
                }
                self.current_program = None;
            }
        }
    }

    fn use_shader(&mut self, shader: &Shader) -> Result<()> {
        let handle = checked(shader.native::<D3dShader>())?;
        if self.current_program.as_ref().map(|p| p.serial()) != Some(shader.serial()) {
            handle.program.bind();
            self.current_program = Some(Rc::clone(&handle.program));
        }
        Ok(())
    }

    fn get_uniform_id(&mut self, shader: &Shader, name: &str) -> Option<UniformId> {
        checked(shader.native::<D3dShader>()).ok()?.program.uniform_id(name)
    }

    fn set_uniform(&mut self, shader: &Shader, id: UniformId, value: UniformValue) -> Result<()> {
        let handle = checked(shader.native::<D3dShader>())?;
        if self.current_program.as_ref().map(|p| p.serial()) != Some(shader.serial()) {
            let err = Error::InvalidResource(format!("Shader #{} is not the current program", shader.serial()));
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        }
        handle.program.set_uniform(id, &value)
    }

    fn shader_bind_uniform_block(&mut self, shader: &Shader, block: &str, binding_point: u32) -> bool {
        match checked(shader.native::<D3dShader>()) {
            Ok(handle) => handle.program.bind_uniform_block(block, binding_point),
            Err(_) => false,
        }
    }

    // ===== TEXTURES =====

    fn create_texture_2d(&mut self, desc: &Texture2DDesc<'_>) -> Result<Texture2D> {
        desc.validate(self.unpack_alignment).map_err(|e| {
            engine_error!(SOURCE, "Texture creation rejected: {}", e);
            e
        })?;
        let handle = D3dTexture::create(&self.ctx, desc, self.unpack_alignment)?;
        Ok(Texture2D::new(desc.info(), Box::new(handle)))
    }

    fn delete_textures_2d(&mut self, textures: Vec<Texture2D>) {
        for texture in textures {
            let serial = texture.serial();
            let units: Vec<u32> = self
                .bound_textures
                .iter()
                .filter(|(_, bound)| **bound == serial)
                .map(|(unit, _)| *unit)
                .collect();
            for unit in units {
                unsafe {
                    self.ctx.context.PSSetShaderResources(unit, Some(&[None]));
                }
                self.bound_textures.remove(&unit);
            }
        }
    }

    fn use_texture_2d(&mut self, texture: &Texture2D, unit: u32) -> Result<()> {
        let handle = checked(texture.native::<D3dTexture>())?;
        if unit >= MAX_TEXTURE_UNITS {
            engine_error!(SOURCE, "Texture unit {} ignored (device has {})", unit, MAX_TEXTURE_UNITS);
            return Ok(());
        }
        handle.bind(unit);
        self.bound_textures.insert(unit, texture.serial());
        Ok(())
    }

    fn set_texture_2d_wrap_mode(
        &mut self,
        texture: &mut Texture2D,
        x: TextureWrapMode,
        y: TextureWrapMode,
    ) -> Result<()> {
        let info = *texture.info();
        let handle = checked(texture.native::<D3dTexture>())?;
        handle.rebuild_sampler((x, y), (info.min_filter, info.mag_filter))?;
        self.rebind_texture_units(texture, handle);
        texture.record_wrap_mode(x, y);
        Ok(())
    }

    fn set_texture_2d_filter(
        &mut self,
        texture: &mut Texture2D,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Result<()> {
        let info = *texture.info();
        let handle = checked(texture.native::<D3dTexture>())?;
        if !mag.is_valid_mag_filter() {
            engine_error!(SOURCE, "Magnification filter {} ignored for texture #{}", mag, texture.serial());
            return Ok(());
        }
        handle.rebuild_sampler((info.wrap_x, info.wrap_y), (min, mag))?;
        self.rebind_texture_units(texture, handle);
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
        let handle = D3dBuffer::create(&self.ctx, ResourceKind::VertexBuffer, size, data)?;
        Ok(VertexBuffer::new(size, layout, Box::new(handle)))
    }

    fn use_vertex_buffer(&mut self, buffer: &VertexBuffer) -> Result<()> {
        let handle = checked(buffer.native::<D3dBuffer>())?;
        let buffers = [Some(handle.buffer.clone())];
        let stride = buffer.layout().stride();
        let offset = 0u32;
        unsafe {
            self.ctx
                .context
                .IASetVertexBuffers(0, 1, Some(buffers.as_ptr()), Some(&stride), Some(&offset));
        }
        Ok(())
    }

    fn vertex_buffer_sub_data(&mut self, buffer: &VertexBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let handle = checked(buffer.native::<D3dBuffer>())?;
        self.write_buffer(handle, buffer.size(), offset, data, "VertexBuffer");
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
        let handle = if data_type == DataType::UnsignedByte {
            let widened = widen_u8_indices(data);
            D3dBuffer::create(&self.ctx, ResourceKind::IndexBuffer, widened.len() as u64, Some(&widened))?
        } else {
            D3dBuffer::create(&self.ctx, ResourceKind::IndexBuffer, data.len() as u64, Some(data))?
        };
        Ok(IndexBuffer::new(count, data_type, Box::new(handle)))
    }

    fn use_index_buffer(&mut self, buffer: &IndexBuffer) -> Result<()> {
        let handle = checked(buffer.native::<D3dBuffer>())?;
        unsafe {
            self.ctx
                .context
                .IASetIndexBuffer(&handle.buffer, index_format(buffer.data_type()), 0);
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
        let handle = D3dBuffer::create(&self.ctx, ResourceKind::UniformBuffer, size, data)?;
        Ok(UniformBuffer::new(size, Box::new(handle)))
    }

    fn uniform_buffer_data(&mut self, buffer: &UniformBuffer, data: &[u8]) -> Result<()> {
        let handle = checked(buffer.native::<D3dBuffer>())?;
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
        handle.write(0, data);
        Ok(())
    }

    fn uniform_buffer_sub_data(&mut self, buffer: &UniformBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let handle = checked(buffer.native::<D3dBuffer>())?;
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
        checked(buffer.native::<D3dBuffer>())?;
        if let Err(e) = validate_sub_range(offset, size, buffer.size()) {
            engine_error!(SOURCE, "UniformBuffer #{} range binding ignored: {}", buffer.serial(), e);
            return Ok(());
        }
        if offset % RANGE_ALIGNMENT != 0 {
            engine_error!(
                SOURCE,
                "UniformBuffer #{} range binding ignored: offset {} not a multiple of {}",
                buffer.serial(),
                offset,
                RANGE_ALIGNMENT
            );
            return Ok(());
        }
        if self.ctx.context1.is_none() && (offset != 0 || size < buffer.size()) {
            engine_warn!(SOURCE, "Range binding needs Direct3D 11.1, the whole buffer will be bound");
        }
        self.bind_uniform_range(buffer, UniformBinding { point, offset, size })
    }

    fn delete_uniform_buffers(&mut self, buffers: Vec<UniformBuffer>) {
        for buffer in buffers {
            let serial = buffer.serial();
            self.uniform_bindings.retain(|_, bound| bound.serial != serial);
        }
    }

    // ===== VERTEX ARRAYS =====

    fn create_vertex_array(&mut self) -> Result<VertexArray> {
        let handle = D3dVertexArray::create(&self.ctx);
        Ok(VertexArray::new(Box::new(handle)))
    }

    fn delete_vertex_arrays(&mut self, arrays: Vec<VertexArray>) {
        for array in arrays {
            if self.current_vertex_array == Some(array.serial()) {
                self.current_vertex_array = None;
            }
        }
    }

    fn use_vertex_array(&mut self, array: &VertexArray) -> Result<()> {
        checked(array.native::<D3dVertexArray>())?;
        self.current_vertex_array = Some(array.serial());
        Ok(())
    }

    fn vertex_array_bind_vertex_buffer(&mut self, array: &mut VertexArray, buffer: VertexBuffer) -> Result<()> {
        let first_location = array.next_attribute_location();
        let slot = array.vertex_buffers().len() as u32;
        let vao = checked(array.native::<D3dVertexArray>())?;
        checked(buffer.native::<D3dBuffer>())?;

        let next = vao.add_buffer(buffer.layout(), slot, first_location)?;
        engine_debug!(
            SOURCE,
            "VertexArray #{}: buffer #{} in slot {} at locations {}..{}",
            array.serial(),
            buffer.serial(),
            slot,
            first_location,
            next
        );
        array.push_vertex_buffer(buffer);
        Ok(())
    }

    fn vertex_array_bind_index_buffer(&mut self, array: &mut VertexArray, buffer: IndexBuffer) -> Result<()> {
        checked(array.native::<D3dVertexArray>())?;
        checked(buffer.native::<D3dBuffer>())?;
        // The replaced buffer is released here
        drop(array.replace_index_buffer(buffer));
        Ok(())
    }

    // ===== DRAW =====

    fn draw_vertex_array(&mut self, array: &VertexArray) -> Result<()> {
        checked(array.native::<D3dVertexArray>())?;
        if self.current_vertex_array != Some(array.serial()) {
            let err = Error::InvalidResource(format!(
                "VertexArray #{} is not the current vertex array",
                array.serial()
            ));
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        }
        let Some(program) = self.current_program.clone() else {
            let err = Error::InvalidResource("draw without a current shader".to_string());
            engine_error!(SOURCE, "{}", err);
            return Err(err);
        };

        let plan = array.draw_plan().map_err(|e| {
            engine_error!(SOURCE, "Draw rejected: {}", e);
            e
        })?;
        self.draw(array, &program, plan)?;
        self.stats.record_draw(plan.triangle_count());
        self.drain_debug_messages();
        Ok(())
    }
}

impl Drop for D3D11Renderer {
    fn drop(&mut self) {
        self.current_program = None;
        self.uniform_bindings.clear();
        unsafe {
            self.ctx.context.ClearState();
        }
        self.drain_debug_messages();

        if let Some(debug) = &self.debug {
            if debug.sink().config().enable_stats {
                print_validation_stats_report(&debug.sink().stats());
            }
        }
        let live = self.ctx.counter.snapshot();
        if live.total() > 0 {
            engine_warn!(SOURCE, "Renderer dropped with live resources: {:?}", live);
        }
    }
}
