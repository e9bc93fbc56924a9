//! Tests for D3D11Renderer against a real device
//!
//! Each test opens a hidden winit window and builds a device and swap chain on it.
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test d3d11_renderer_tests -- --ignored --test-threads=1

#![cfg(windows)]

use lumen_render::lumen::render::{
    Config, DataType, ElementStructure, ResourceCounts, Texture2DDesc, TextureFilter,
    TextureFormat, TextureWrapMode, VertexBufferElement, VertexBufferLayout,
};
use lumen_render::lumen::{Error, Renderer};
use lumen_render_d3d11::D3D11Renderer;
use winit::event_loop::EventLoop;
use winit::platform::windows::EventLoopBuilderExtWindows;
use winit::window::Window;

const VERTEX_SHADER: &str = r#"
cbuffer Camera { float4x4 u_projection; };
float4 u_tint;

struct VsOut {
    float4 position : SV_Position;
    float2 uv : TEXCOORD0;
    float4 tint : COLOR0;
};

VsOut main(float2 position : ATTRIB0, float2 uv : ATTRIB1) {
    VsOut output;
    output.position = mul(u_projection, float4(position, 0.0, 1.0));
    output.uv = uv;
    output.tint = u_tint;
    return output;
}
"#;

const PIXEL_SHADER: &str = r#"
Texture2D u_texture : register(t0);
SamplerState u_sampler : register(s0);

float4 main(float4 position : SV_Position, float2 uv : TEXCOORD0, float4 tint : COLOR0) : SV_Target {
    return u_texture.Sample(u_sampler, uv) * tint;
}
"#;

/// Renderer plus the window it presents to
///
/// Field order matters: the renderer is dropped before the window.
struct D3dTestContext {
    renderer: D3D11Renderer,
    _window: Window,
    _event_loop: EventLoop<()>,
}

/// Helper to create a hidden window and a renderer bound to it
#[allow(deprecated)]
fn create_test_context(config: Config) -> D3dTestContext {
    let event_loop = EventLoop::builder().with_any_thread(true).build().unwrap();
    let window_attrs = Window::default_attributes()
        .with_title("Direct3D 11 Renderer Test")
        .with_inner_size(winit::dpi::PhysicalSize::new(320, 240))
        .with_visible(false); // Hidden window for tests
    let window = event_loop.create_window(window_attrs).unwrap();

    let mut renderer = D3D11Renderer::new(&window, config).unwrap();
    renderer.initialize().unwrap();

    D3dTestContext {
        renderer,
        _window: window,
        _event_loop: event_loop,
    }
}

fn sprite_layout() -> VertexBufferLayout {
    VertexBufferLayout::new(vec![
        VertexBufferElement::new(ElementStructure::Vec2, DataType::Float, false),
        VertexBufferElement::new(ElementStructure::Vec2, DataType::Float, false),
    ])
}

fn quad_vertices() -> Vec<u8> {
    let vertices: [f32; 16] = [
        -0.5, -0.5, 0.0, 0.0, //
        0.5, -0.5, 1.0, 0.0, //
        0.5, 0.5, 1.0, 1.0, //
        -0.5, 0.5, 0.0, 1.0,
    ];
    f32_bytes(&vertices)
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

// ============================================================================
// INITIALIZATION TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_d3d11_initialize_reports_adapter() {
    let ctx = create_test_context(Config::default());
    let info = ctx.renderer.info();

    assert!(!info.vendor.is_empty());
    assert!(!info.device.is_empty());
    assert!(info.version.starts_with("Direct3D 11"));
    assert_eq!(info.shading_language_version, "HLSL 5.0");
}

#[test]
#[ignore] // Requires GPU
fn test_d3d11_clean_frame_with_validation() {
    let config = Config {
        enable_validation: true,
        enable_validation_stats: true,
        ..Config::default()
    };
    let mut ctx = create_test_context(config);

    ctx.renderer.set_clear_color(0.1, 0.2, 0.3, 1.0);
    ctx.renderer.clear_buffer();
    ctx.renderer.swap_buffers().unwrap();
    assert_eq!(ctx.renderer.validation_stats().errors, 0);
}

// ============================================================================
// SHADER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_d3d11_shader_uniforms() {
    let mut ctx = create_test_context(Config::default());
    let r = &mut ctx.renderer;

    let shader = r.create_shader(VERTEX_SHADER, PIXEL_SHADER).unwrap();
    r.use_shader(&shader).unwrap();

    let tint = r.get_uniform_id(&shader, "u_tint").unwrap();
    assert_eq!(r.get_uniform_id(&shader, "u_tint"), Some(tint));
    assert!(r.get_uniform_id(&shader, "u_missing").is_none());
    r.uniform_vec4(&shader, tint, lumen_render::glam::Vec4::ONE).unwrap();

    assert!(r.shader_bind_uniform_block(&shader, "Camera", 0));
    assert!(!r.shader_bind_uniform_block(&shader, "Lights", 1));

    assert_eq!(r.live_resources().shader_stages, 0);
    assert_eq!(r.live_resources().shaders, 1);
    r.delete_shaders(vec![shader]);
    assert_eq!(r.live_resources(), ResourceCounts::default());
}

#[test]
#[ignore] // Requires GPU
fn test_d3d11_set_uniform_requires_current_shader() {
    let mut ctx = create_test_context(Config::default());
    let r = &mut ctx.renderer;

    let shader = r.create_shader(VERTEX_SHADER, PIXEL_SHADER).unwrap();
    let tint = r.get_uniform_id(&shader, "u_tint").unwrap();

    let result = r.uniform_vec4(&shader, tint, lumen_render::glam::Vec4::ONE);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_d3d11_shader_compile_error() {
    let mut ctx = create_test_context(Config::default());
    let result = ctx.renderer.create_shader("float4 main() : SV_Position { oops }", PIXEL_SHADER);

    match result {
        Err(Error::ShaderCompilation { log, .. }) => assert!(!log.is_empty()),
        other => panic!("expected a compilation error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(ctx.renderer.live_resources().total(), 0);
}

// ============================================================================
// TEXTURE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_d3d11_texture_parameters() {
    let mut ctx = create_test_context(Config::default());
    let r = &mut ctx.renderer;

    let pixels: Vec<u8> = (0..64).collect();
    let desc = Texture2DDesc::new(4, 4, TextureFormat::Rgba, DataType::UnsignedByte).with_data(&pixels);
    let mut texture = r.create_texture_2d(&desc).unwrap();

    r.use_texture_2d(&texture, 0).unwrap();
    r.set_texture_2d_wrap_mode(&mut texture, TextureWrapMode::ClampToEdge, TextureWrapMode::Repeat)
        .unwrap();
    r.set_texture_2d_filter(&mut texture, TextureFilter::LinearMipmapLinear, TextureFilter::Linear)
        .unwrap();

    assert_eq!(texture.info().wrap_x, TextureWrapMode::ClampToEdge);
    assert_eq!(texture.info().min_filter, TextureFilter::LinearMipmapLinear);
    r.delete_textures_2d(vec![texture]);
    assert_eq!(r.live_resources().textures, 0);
}

#[test]
#[ignore] // Requires GPU
fn test_d3d11_rgb_texture_with_padded_rows() {
    let mut ctx = create_test_context(Config::default());
    let r = &mut ctx.renderer;
    r.set_unpack_alignment(4);

    // 3x2 RGB: 9 bytes per row padded to 12
    let pixels = [0x80u8; 24];
    let desc = Texture2DDesc::new(3, 2, TextureFormat::Rgb, DataType::UnsignedByte).with_data(&pixels);
    let texture = r.create_texture_2d(&desc).unwrap();
    assert_eq!(texture.info().format, TextureFormat::Rgb);
}

#[test]
#[ignore] // Requires GPU
fn test_d3d11_integer_color_texture_unsupported() {
    let mut ctx = create_test_context(Config::default());
    let desc = Texture2DDesc::new(4, 4, TextureFormat::Rgba, DataType::Int);

    assert!(matches!(
        ctx.renderer.create_texture_2d(&desc),
        Err(Error::UnsupportedFormat(_))
    ));
}

// ============================================================================
// BUFFER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_d3d11_uniform_buffer_range_binding() {
    let mut ctx = create_test_context(Config::default());
    let r = &mut ctx.renderer;

    let mut buffer = r.create_uniform_buffer(512, None).unwrap();
    r.uniform_buffer_data(&buffer, &[0u8; 512]).unwrap();
    r.uniform_buffer_sub_data(&buffer, 0, &[1u8; 64]).unwrap();

    r.uniform_buffer_set_binding_point_range(&mut buffer, 256, 64, 2).unwrap();
    let binding = buffer.binding().unwrap();
    assert_eq!((binding.point, binding.offset, binding.size), (2, 256, 64));

    // Misaligned offsets leave the previous binding in place
    r.uniform_buffer_set_binding_point_range(&mut buffer, 16, 64, 3).unwrap();
    assert_eq!(buffer.binding().unwrap().point, 2);

    r.delete_uniform_buffers(vec![buffer]);
    assert_eq!(r.live_resources().uniform_buffers, 0);
}

#[test]
#[ignore] // Requires GPU
fn test_d3d11_byte_indices_are_accepted() {
    let mut ctx = create_test_context(Config::default());
    let ib = ctx
        .renderer
        .create_index_buffer(6, &[0, 1, 2, 2, 3, 0], DataType::UnsignedByte)
        .unwrap();

    assert_eq!(ib.count(), 6);
    assert_eq!(ib.data_type(), DataType::UnsignedByte);
}

// ============================================================================
// DRAW TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_d3d11_draw_indexed_quad() {
    let mut ctx = create_test_context(Config::default());
    let r = &mut ctx.renderer;

    let shader = r.create_shader(VERTEX_SHADER, PIXEL_SHADER).unwrap();
    r.use_shader(&shader).unwrap();
    r.shader_bind_uniform_block(&shader, "Camera", 0);
    let tint = r.get_uniform_id(&shader, "u_tint").unwrap();
    r.uniform_vec4(&shader, tint, lumen_render::glam::Vec4::ONE).unwrap();

    let projection = lumen_render::glam::Mat4::IDENTITY.to_cols_array();
    let mut camera = r.create_uniform_buffer(64, Some(&f32_bytes(&projection))).unwrap();
    r.uniform_buffer_set_binding_point(&mut camera, 0).unwrap();

    let pixels = [255u8; 16];
    let desc = Texture2DDesc::new(2, 2, TextureFormat::Rgba, DataType::UnsignedByte).with_data(&pixels);
    let texture = r.create_texture_2d(&desc).unwrap();
    r.use_texture_2d(&texture, 0).unwrap();

    let vertices = quad_vertices();
    let vb = r.create_vertex_buffer(vertices.len() as u64, Some(&vertices), sprite_layout()).unwrap();
    let indices: Vec<u8> = [0u16, 1, 2, 2, 3, 0].iter().flat_map(|i| i.to_le_bytes()).collect();
    let ib = r.create_index_buffer(6, &indices, DataType::UnsignedShort).unwrap();

    let mut va = r.create_vertex_array().unwrap();
    r.vertex_array_bind_vertex_buffer(&mut va, vb).unwrap();
    r.vertex_array_bind_index_buffer(&mut va, ib).unwrap();
    r.use_vertex_array(&va).unwrap();

    r.set_viewport(320, 240);
    r.clear_buffer();
    r.draw_vertex_array(&va).unwrap();
    assert_eq!(r.stats().draw_calls, 1);
    assert_eq!(r.stats().triangles, 2);

    r.swap_buffers().unwrap();
    assert_eq!(r.stats().draw_calls, 0);

    r.delete_vertex_arrays(vec![va]);
    r.delete_textures_2d(vec![texture]);
    r.delete_uniform_buffers(vec![camera]);
    r.delete_shaders(vec![shader]);
    assert_eq!(r.live_resources(), ResourceCounts::default());
}

#[test]
#[ignore] // Requires GPU
fn test_d3d11_draw_without_shader_fails() {
    let mut ctx = create_test_context(Config::default());
    let r = &mut ctx.renderer;

    let vertices = quad_vertices();
    let vb = r.create_vertex_buffer(vertices.len() as u64, Some(&vertices), sprite_layout()).unwrap();
    let mut va = r.create_vertex_array().unwrap();
    r.vertex_array_bind_vertex_buffer(&mut va, vb).unwrap();
    r.use_vertex_array(&va).unwrap();

    assert!(matches!(r.draw_vertex_array(&va), Err(Error::InvalidResource(_))));
}
