//! Unit tests for MockRenderer
//!
//! Exercises the renderer contract without a GPU: resource lifetimes, sub-upload
//! bounds, shader failure isolation, binding bookkeeping and draw preconditions.

use glam::Mat4;

use crate::error::Error;
use crate::renderer::mock_renderer::{
    scan_stage_interface, scan_uniform_declarations, MockRenderer, MOCK_MAX_UNIFORM_BINDINGS,
};
use crate::renderer::{
    binding_points, DataType, ElementStructure, Renderer, ResourceCounts, Texture2DDesc,
    TextureFilter, TextureFormat, TextureWrapMode, UniformValue, VertexBufferLayout,
};

const VERTEX_SRC: &str = r#"
#version 330 core
layout(location = 0) in vec3 a_position;
layout(std140) uniform Camera {
    mat4 view;
    mat4 projection;
};
uniform mat4 u_model;
void main() {
    gl_Position = projection * view * u_model * vec4(a_position, 1.0);
}
"#;

const FRAGMENT_SRC: &str = r#"
#version 330 core
uniform vec4 u_color;
uniform sampler2D u_texture;
out vec4 frag_color;
void main() {
    frag_color = u_color;
}
"#;

fn renderer() -> MockRenderer {
    let mut renderer = MockRenderer::new();
    renderer.initialize().unwrap();
    renderer
}

fn position_layout() -> VertexBufferLayout {
    VertexBufferLayout::builder()
        .push(ElementStructure::Vec3, DataType::Float, false)
        .build()
}

fn count_commands(renderer: &MockRenderer, prefix: &str) -> usize {
    renderer.commands().iter().filter(|c| c.starts_with(prefix)).count()
}

// ============================================================================
// INITIALIZATION AND STATE
// ============================================================================

#[test]
fn test_initialize_fills_info() {
    let renderer = renderer();
    assert!(renderer.is_initialized());
    assert_eq!(renderer.info().device, "Mock Device");
    assert_eq!(renderer.live_resources(), ResourceCounts::default());
}

#[test]
fn test_blend_and_raster_state() {
    use crate::renderer::{BlendEquation, BlendFactor};
    let mut renderer = renderer();

    assert!(!renderer.is_blending_enabled());
    renderer.set_blending_enabled(true);
    renderer.set_blend_function(
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        BlendFactor::One,
        BlendFactor::Zero,
    );
    renderer.set_blend_equation(BlendEquation::Add, BlendEquation::Max);
    renderer.set_wireframe_enabled(true);
    renderer.set_depth_test_enabled(true);

    assert!(renderer.is_blending_enabled());
    assert_eq!(renderer.blend_function()[1], BlendFactor::OneMinusSrcAlpha);
    assert_eq!(renderer.blend_equation(), (BlendEquation::Add, BlendEquation::Max));
    assert!(renderer.is_wireframe_enabled());
    assert!(renderer.is_depth_test_enabled());
}

#[test]
fn test_invalid_alignment_is_ignored() {
    let mut renderer = renderer();
    renderer.set_unpack_alignment(1);
    renderer.set_unpack_alignment(3);
    renderer.set_pack_alignment(16);

    assert_eq!(renderer.unpack_alignment(), 1);
    assert_eq!(renderer.pack_alignment(), 4);
}

#[test]
fn test_clear_color_and_viewport() {
    let mut renderer = renderer();
    renderer.set_clear_color(0.1, 0.2, 0.3, 1.0);
    renderer.set_viewport(1280, 720);
    renderer.clear_buffer();

    assert_eq!(renderer.clear_color(), [0.1, 0.2, 0.3, 1.0]);
    assert_eq!(renderer.viewport(), (1280, 720));
    assert_eq!(count_commands(&renderer, "clear"), 1);
}

// ============================================================================
// SHADERS
// ============================================================================

#[test]
fn test_scan_uniform_declarations() {
    let (uniforms, blocks) = scan_uniform_declarations(VERTEX_SRC);
    assert_eq!(uniforms, vec!["u_model".to_string()]);
    assert_eq!(blocks, vec!["Camera".to_string()]);

    let (uniforms, _) = scan_uniform_declarations("uniform float u_weights[4];\nuniform int u_mode = 2;");
    assert_eq!(uniforms, vec!["u_weights".to_string(), "u_mode".to_string()]);
}

#[test]
fn test_create_shader_releases_stages() {
    let mut renderer = renderer();
    let shader = renderer.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();

    let live = renderer.live_resources();
    assert_eq!(live.shaders, 1);
    assert_eq!(live.shader_stages, 0);

    renderer.delete_shaders(vec![shader]);
    assert_eq!(renderer.live_resources().shaders, 0);
}

#[test]
fn test_failing_shaders_leave_no_stages() {
    let mut renderer = renderer();

    for _ in 0..5 {
        let err = renderer.create_shader(VERTEX_SRC, "void broken() {}").unwrap_err();
        match err {
            Error::ShaderCompilation { stage, log } => {
                assert_eq!(stage, crate::renderer::ShaderStage::Fragment);
                assert!(log.contains("main"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    let live = renderer.live_resources();
    assert_eq!(live.shader_stages, 0);
    assert_eq!(live.shaders, 0);
}

const VARYING_VS: &str = r#"
#version 330 core
layout(location = 0) in vec2 a_position;
out vec2 v_uv;
out vec4 v_tint[2];
void main() {
    v_uv = a_position;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
"#;

const VARYING_FS: &str = r#"
#version 330 core
in vec2 v_uv;
flat in vec4 v_tint[2];
out vec4 color;
void main() { color = vec4(v_uv, 0.0, 1.0) * v_tint[0]; }
"#;

#[test]
fn test_scan_stage_interface() {
    assert_eq!(scan_stage_interface(VARYING_VS, "out"), vec!["v_uv", "v_tint"]);
    assert_eq!(scan_stage_interface(VARYING_VS, "in"), vec!["a_position"]);
    assert_eq!(scan_stage_interface(VARYING_FS, "in"), vec!["v_uv", "v_tint"]);
    assert!(scan_stage_interface("void helper(in vec2 p);", "in").is_empty());
}

#[test]
fn test_matching_varyings_link() {
    let mut renderer = renderer();
    let shader = renderer.create_shader(VARYING_VS, VARYING_FS).unwrap();
    assert_eq!(renderer.live_resources().shaders, 1);
    renderer.delete_shaders(vec![shader]);
}

#[test]
fn test_link_failures_leave_no_objects() {
    let mut renderer = renderer();
    let fragment = VARYING_FS.replace("in vec2 v_uv;", "in vec2 v_normal;");

    for _ in 0..5 {
        match renderer.create_shader(VARYING_VS, &fragment).unwrap_err() {
            Error::ShaderLink { log } => assert!(log.contains("v_normal")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    let live = renderer.live_resources();
    assert_eq!(live.shader_stages, 0);
    assert_eq!(live.shaders, 0);
    assert_eq!(count_commands(&renderer, "link failed"), 5);
}

#[test]
fn test_uniform_lookup_and_set() {
    let mut renderer = renderer();
    let shader = renderer.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();

    let model = renderer.get_uniform_id(&shader, "u_model").unwrap();
    assert!(renderer.get_uniform_id(&shader, "u_missing").is_none());

    // Program must be current
    assert!(matches!(
        renderer.uniform_mat4(&shader, model, Mat4::IDENTITY),
        Err(Error::InvalidResource(_))
    ));

    renderer.use_shader(&shader).unwrap();
    renderer.uniform_mat4(&shader, model, Mat4::IDENTITY).unwrap();
    assert_eq!(renderer.uniform_value(&shader, model), Some(UniformValue::Mat4(Mat4::IDENTITY)));
}

#[test]
fn test_bind_uniform_block() {
    let mut renderer = renderer();
    let shader = renderer.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();

    assert!(renderer.shader_bind_uniform_block(&shader, "Camera", binding_points::VIEW_PROJECTION));
    assert!(!renderer.shader_bind_uniform_block(&shader, "Lights", binding_points::LIGHTS));
    assert_eq!(renderer.uniform_block_binding(&shader, "Camera"), Some(1));
}

#[test]
fn test_delete_current_shader_clears_binding() {
    let mut renderer = renderer();
    let shader = renderer.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    renderer.use_shader(&shader).unwrap();
    assert!(renderer.current_shader().is_some());

    renderer.delete_shaders(vec![shader]);
    assert!(renderer.current_shader().is_none());

    // A replacement behaves like a first creation
    let replacement = renderer.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    renderer.use_shader(&replacement).unwrap();
    assert_eq!(renderer.current_shader(), Some(replacement.serial()));
}

// ============================================================================
// TEXTURES
// ============================================================================

#[test]
fn test_texture_lifecycle() {
    let mut renderer = renderer();
    let pixels = vec![0u8; 4 * 4 * 4];
    let desc = Texture2DDesc::new(4, 4, TextureFormat::Rgba, DataType::UnsignedByte).with_data(&pixels);

    let mut texture = renderer.create_texture_2d(&desc).unwrap();
    assert_eq!(renderer.live_resources().textures, 1);
    assert_eq!(count_commands(&renderer, "generate_mipmap"), 1);

    renderer.use_texture_2d(&texture, 3).unwrap();
    assert_eq!(renderer.bound_texture(3), Some(texture.serial()));

    renderer
        .set_texture_2d_wrap_mode(&mut texture, TextureWrapMode::ClampToEdge, TextureWrapMode::ClampToEdge)
        .unwrap();
    renderer
        .set_texture_2d_filter(&mut texture, TextureFilter::Nearest, TextureFilter::Nearest)
        .unwrap();
    assert_eq!(texture.info().wrap_x, TextureWrapMode::ClampToEdge);
    assert_eq!(texture.info().mag_filter, TextureFilter::Nearest);

    renderer.delete_textures_2d(vec![texture]);
    assert_eq!(renderer.live_resources().textures, 0);
    assert_eq!(renderer.bound_texture(3), None);
}

#[test]
fn test_texture_short_data_is_rejected() {
    let mut renderer = renderer();
    let pixels = vec![0u8; 10];
    let desc = Texture2DDesc::new(4, 4, TextureFormat::Rgba, DataType::UnsignedByte).with_data(&pixels);

    assert!(matches!(renderer.create_texture_2d(&desc), Err(Error::InvalidParameter(_))));
    assert_eq!(renderer.live_resources().textures, 0);
}

#[test]
fn test_texture_unit_out_of_range_is_ignored() {
    let mut renderer = renderer();
    let desc = Texture2DDesc::new(1, 1, TextureFormat::Red, DataType::UnsignedByte);
    let texture = renderer.create_texture_2d(&desc).unwrap();

    assert!(renderer.use_texture_2d(&texture, 1000).is_ok());
    assert_eq!(renderer.bound_texture(1000), None);
}

#[test]
fn test_integer_colour_texture_is_unsupported() {
    let mut renderer = renderer();
    let desc = Texture2DDesc::new(2, 2, TextureFormat::Rgba, DataType::Int);

    assert!(matches!(renderer.create_texture_2d(&desc), Err(Error::UnsupportedFormat(_))));
    assert_eq!(renderer.live_resources().textures, 0);
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
fn test_oversized_buffers_are_rejected() {
    let mut renderer = renderer();

    let vertices = renderer.create_vertex_buffer(u64::MAX, None, position_layout());
    assert!(matches!(vertices, Err(Error::OutOfMemory)));
    let uniforms = renderer.create_uniform_buffer(1 << 40, None);
    assert!(matches!(uniforms, Err(Error::OutOfMemory)));

    let live = renderer.live_resources();
    assert_eq!(live.vertex_buffers, 0);
    assert_eq!(live.uniform_buffers, 0);
}

#[test]
fn test_vertex_buffer_sub_data_bounds() {
    let mut renderer = renderer();
    let buffer = renderer.create_vertex_buffer(16, None, position_layout()).unwrap();

    // Past the end: nothing written
    renderer.vertex_buffer_sub_data(&buffer, 12, &[1, 2, 3, 4, 5]).unwrap();
    assert_eq!(renderer.vertex_buffer_contents(&buffer).unwrap(), vec![0u8; 16]);

    // Exactly to the end: tail equals the data
    renderer.vertex_buffer_sub_data(&buffer, 12, &[1, 2, 3, 4]).unwrap();
    let contents = renderer.vertex_buffer_contents(&buffer).unwrap();
    assert_eq!(&contents[12..], &[1, 2, 3, 4]);
    assert_eq!(&contents[..12], &[0u8; 12]);
}

#[test]
fn test_uniform_buffer_sub_data_bounds() {
    let mut renderer = renderer();
    let buffer = renderer.create_uniform_buffer(64, None).unwrap();

    renderer.uniform_buffer_sub_data(&buffer, 60, &[9u8; 8]).unwrap();
    assert_eq!(renderer.uniform_buffer_contents(&buffer).unwrap(), vec![0u8; 64]);

    renderer.uniform_buffer_sub_data(&buffer, 56, &[9u8; 8]).unwrap();
    let contents = renderer.uniform_buffer_contents(&buffer).unwrap();
    assert_eq!(&contents[56..], &[9u8; 8]);
}

#[test]
fn test_uniform_buffer_data_requires_full_size() {
    let mut renderer = renderer();
    let buffer = renderer.create_uniform_buffer(8, Some(&[1u8; 8])).unwrap();

    renderer.uniform_buffer_data(&buffer, &[2u8; 4]).unwrap();
    assert_eq!(renderer.uniform_buffer_contents(&buffer).unwrap(), vec![1u8; 8]);

    renderer.uniform_buffer_data(&buffer, &[2u8; 8]).unwrap();
    assert_eq!(renderer.uniform_buffer_contents(&buffer).unwrap(), vec![2u8; 8]);
}

#[test]
fn test_initial_data_size_mismatch() {
    let mut renderer = renderer();
    let result = renderer.create_vertex_buffer(16, Some(&[0u8; 8]), position_layout());
    assert!(matches!(result, Err(Error::InvalidParameter(_))));
    assert_eq!(renderer.live_resources().vertex_buffers, 0);
}

#[test]
fn test_index_buffer_validation() {
    let mut renderer = renderer();
    let indices: [u16; 3] = [0, 1, 2];
    let buffer = renderer
        .create_index_buffer(3, bytemuck::cast_slice(&indices), DataType::UnsignedShort)
        .unwrap();
    assert_eq!(buffer.size(), 6);
    assert_eq!(renderer.index_buffer_contents(&buffer).unwrap().len(), 6);

    let result = renderer.create_index_buffer(1, &[0u8; 4], DataType::Float);
    assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
}

#[test]
fn test_binding_point_idempotence() {
    let mut renderer = renderer();
    let mut buffer = renderer.create_uniform_buffer(128, None).unwrap();

    renderer.uniform_buffer_set_binding_point(&mut buffer, binding_points::VIEW_PROJECTION).unwrap();
    renderer.uniform_buffer_set_binding_point(&mut buffer, binding_points::VIEW_PROJECTION).unwrap();

    assert_eq!(count_commands(&renderer, "bind_buffer_range"), 1);
    let binding = buffer.binding().unwrap();
    assert_eq!(binding.point, 1);
    assert_eq!(binding.size, 128);
}

#[test]
fn test_binding_point_range_validation() {
    let mut renderer = renderer();
    let mut buffer = renderer.create_uniform_buffer(512, None).unwrap();

    // Past the end
    renderer.uniform_buffer_set_binding_point_range(&mut buffer, 256, 512, 2).unwrap();
    // Misaligned offset
    renderer.uniform_buffer_set_binding_point_range(&mut buffer, 16, 64, 2).unwrap();
    assert!(buffer.binding().is_none());
    assert!(renderer.uniform_binding(2).is_none());

    renderer.uniform_buffer_set_binding_point_range(&mut buffer, 256, 256, 2).unwrap();
    let (serial, binding) = renderer.uniform_binding(2).unwrap();
    assert_eq!(serial, buffer.serial());
    assert_eq!((binding.offset, binding.size), (256, 256));
}

#[test]
fn test_binding_point_past_device_limit_is_ignored() {
    let mut renderer = renderer();
    let mut buffer = renderer.create_uniform_buffer(64, None).unwrap();

    renderer.clear_commands();
    assert!(renderer.uniform_buffer_set_binding_point(&mut buffer, MOCK_MAX_UNIFORM_BINDINGS).is_ok());
    assert!(renderer.uniform_buffer_set_binding_point(&mut buffer, 1000).is_ok());
    assert!(buffer.binding().is_none());
    assert!(renderer.uniform_binding(1000).is_none());
    assert_eq!(count_commands(&renderer, "bind_buffer_range"), 0);

    renderer.uniform_buffer_set_binding_point(&mut buffer, MOCK_MAX_UNIFORM_BINDINGS - 1).unwrap();
    assert!(buffer.binding().is_some());
}

#[test]
fn test_deleted_uniform_buffer_leaves_no_binding() {
    let mut renderer = renderer();
    let mut buffer = renderer.create_uniform_buffer(64, None).unwrap();
    renderer.uniform_buffer_set_binding_point(&mut buffer, 0).unwrap();

    renderer.delete_uniform_buffers(vec![buffer]);
    assert!(renderer.uniform_binding(0).is_none());

    // A fresh buffer on the same point issues a real bind
    renderer.clear_commands();
    let mut fresh = renderer.create_uniform_buffer(64, None).unwrap();
    renderer.uniform_buffer_set_binding_point(&mut fresh, 0).unwrap();
    assert_eq!(count_commands(&renderer, "bind_buffer_range"), 1);
}

// ============================================================================
// VERTEX ARRAYS AND DRAW
// ============================================================================

#[test]
fn test_vertex_array_owns_buffers() {
    let mut renderer = renderer();
    let mut array = renderer.create_vertex_array().unwrap();
    let vertices = renderer.create_vertex_buffer(36, None, position_layout()).unwrap();
    let indices = renderer.create_index_buffer(3, &[0, 1, 2], DataType::UnsignedByte).unwrap();

    renderer.vertex_array_bind_vertex_buffer(&mut array, vertices).unwrap();
    renderer.vertex_array_bind_index_buffer(&mut array, indices).unwrap();

    let live = renderer.live_resources();
    assert_eq!((live.vertex_arrays, live.vertex_buffers, live.index_buffers), (1, 1, 1));

    renderer.delete_vertex_arrays(vec![array]);
    assert_eq!(renderer.live_resources(), ResourceCounts::default());

    // Buffers are released before the array object
    let commands = renderer.commands();
    let deletes: Vec<&String> = commands.iter().filter(|c| c.starts_with("delete")).collect();
    assert!(deletes.last().unwrap().starts_with("delete VertexArray"));
}

#[test]
fn test_replacing_index_buffer_releases_previous() {
    let mut renderer = renderer();
    let mut array = renderer.create_vertex_array().unwrap();
    let first = renderer.create_index_buffer(3, &[0, 1, 2], DataType::UnsignedByte).unwrap();
    let second = renderer.create_index_buffer(6, &[0, 1, 2, 2, 3, 0], DataType::UnsignedByte).unwrap();

    renderer.vertex_array_bind_index_buffer(&mut array, first).unwrap();
    renderer.vertex_array_bind_index_buffer(&mut array, second).unwrap();

    assert_eq!(renderer.live_resources().index_buffers, 1);
    assert_eq!(array.index_buffer().unwrap().count(), 6);
}

#[test]
fn test_matrix_attribute_spans_four_locations() {
    let mut renderer = renderer();
    let mut array = renderer.create_vertex_array().unwrap();
    let instance_layout = VertexBufferLayout::builder()
        .push(ElementStructure::Mat4, DataType::Float, false)
        .build();

    let positions = renderer.create_vertex_buffer(12, None, position_layout()).unwrap();
    let instances = renderer.create_vertex_buffer(64, None, instance_layout).unwrap();
    renderer.vertex_array_bind_vertex_buffer(&mut array, positions).unwrap();
    renderer.vertex_array_bind_vertex_buffer(&mut array, instances).unwrap();

    let commands = renderer.commands();
    let attribs: Vec<&String> = commands.iter().filter(|c| c.starts_with("vertex_attrib")).collect();
    assert_eq!(attribs.len(), 5);
    assert!(attribs[4].contains("loc=4"));
    assert!(attribs[4].contains("offset=48"));
    assert_eq!(array.next_attribute_location(), 5);
}

#[test]
fn test_draw_requires_current_vertex_array_and_shader() {
    let mut renderer = renderer();
    let mut array = renderer.create_vertex_array().unwrap();
    let vertices = renderer.create_vertex_buffer(36, None, position_layout()).unwrap();
    renderer.vertex_array_bind_vertex_buffer(&mut array, vertices).unwrap();

    assert!(matches!(renderer.draw_vertex_array(&array), Err(Error::InvalidResource(_))));

    renderer.use_vertex_array(&array).unwrap();
    assert!(matches!(renderer.draw_vertex_array(&array), Err(Error::InvalidResource(_))));

    let shader = renderer.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    renderer.use_shader(&shader).unwrap();
    renderer.draw_vertex_array(&array).unwrap();

    // 36 bytes / 12-byte stride = 3 vertices = 1 triangle
    assert_eq!(renderer.stats().draw_calls, 1);
    assert_eq!(renderer.stats().triangles, 1);

    renderer.swap_buffers().unwrap();
    assert_eq!(renderer.stats().draw_calls, 0);
}

#[test]
fn test_draw_indexed_counts_indices() {
    let mut renderer = renderer();
    let shader = renderer.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    let mut array = renderer.create_vertex_array().unwrap();
    let vertices = renderer.create_vertex_buffer(48, None, position_layout()).unwrap();
    let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];
    let index_buffer = renderer
        .create_index_buffer(6, bytemuck::cast_slice(&indices), DataType::UnsignedInt)
        .unwrap();
    renderer.vertex_array_bind_vertex_buffer(&mut array, vertices).unwrap();
    renderer.vertex_array_bind_index_buffer(&mut array, index_buffer).unwrap();

    renderer.use_shader(&shader).unwrap();
    renderer.use_vertex_array(&array).unwrap();
    renderer.draw_vertex_array(&array).unwrap();

    assert_eq!(renderer.stats().triangles, 2);
}

#[test]
fn test_draw_zero_stride_is_rejected() {
    let mut renderer = renderer();
    let shader = renderer.create_shader(VERTEX_SRC, FRAGMENT_SRC).unwrap();
    let mut array = renderer.create_vertex_array().unwrap();
    let vertices = renderer.create_vertex_buffer(16, None, VertexBufferLayout::default()).unwrap();
    renderer.vertex_array_bind_vertex_buffer(&mut array, vertices).unwrap();

    renderer.use_shader(&shader).unwrap();
    renderer.use_vertex_array(&array).unwrap();
    assert!(matches!(renderer.draw_vertex_array(&array), Err(Error::InvalidParameter(_))));
    assert_eq!(renderer.stats().draw_calls, 0);
}

// ============================================================================
// CROSS-RENDERER RESOURCES
// ============================================================================

#[test]
fn test_serials_are_not_reused_after_delete() {
    let mut renderer = renderer();
    let first = renderer.create_vertex_array().unwrap();
    let first_serial = first.serial();
    renderer.delete_vertex_arrays(vec![first]);

    let second = renderer.create_vertex_array().unwrap();
    assert_ne!(second.serial(), first_serial);
}

#[test]
fn test_dropped_resources_are_released() {
    let mut renderer = renderer();
    {
        let _texture = renderer
            .create_texture_2d(&Texture2DDesc::new(2, 2, TextureFormat::Rgba, DataType::UnsignedByte))
            .unwrap();
        let _buffer = renderer.create_uniform_buffer(16, None).unwrap();
        assert_eq!(renderer.live_resources().total(), 2);
    }
    assert_eq!(renderer.live_resources().total(), 0);
}
