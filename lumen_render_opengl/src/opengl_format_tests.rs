//! Unit tests for OpenGL enum conversions
//!
//! Pure mappings, no GL context required.

use super::*;

// ============================================================================
// DATA TYPES
// ============================================================================

#[test]
fn test_data_type_to_gl() {
    assert_eq!(data_type_to_gl(DataType::Byte), glow::BYTE);
    assert_eq!(data_type_to_gl(DataType::UnsignedByte), glow::UNSIGNED_BYTE);
    assert_eq!(data_type_to_gl(DataType::Short), glow::SHORT);
    assert_eq!(data_type_to_gl(DataType::UnsignedShort), glow::UNSIGNED_SHORT);
    assert_eq!(data_type_to_gl(DataType::Int), glow::INT);
    assert_eq!(data_type_to_gl(DataType::UnsignedInt), glow::UNSIGNED_INT);
    assert_eq!(data_type_to_gl(DataType::Float), glow::FLOAT);
    assert_eq!(data_type_to_gl(DataType::Double), glow::DOUBLE);
}

#[test]
fn test_attribute_kind() {
    assert_eq!(attribute_kind(DataType::Float, false), AttributeKind::Float);
    assert_eq!(attribute_kind(DataType::UnsignedByte, true), AttributeKind::Float);
    assert_eq!(attribute_kind(DataType::Int, false), AttributeKind::Integer);
    assert_eq!(attribute_kind(DataType::UnsignedShort, false), AttributeKind::Integer);
    assert_eq!(attribute_kind(DataType::Double, false), AttributeKind::Double);
}

// ============================================================================
// TEXTURES
// ============================================================================

#[test]
fn test_texture_format_to_gl() {
    assert_eq!(texture_format_to_gl(TextureFormat::Red), glow::RED);
    assert_eq!(texture_format_to_gl(TextureFormat::Rg), glow::RG);
    assert_eq!(texture_format_to_gl(TextureFormat::Rgb), glow::RGB);
    assert_eq!(texture_format_to_gl(TextureFormat::Rgba), glow::RGBA);
    assert_eq!(texture_format_to_gl(TextureFormat::Depth), glow::DEPTH_COMPONENT);
    assert_eq!(texture_format_to_gl(TextureFormat::DepthStencil), glow::DEPTH_STENCIL);
}

#[test]
fn test_internal_formats_are_sized() {
    let internal = |format, data_type| internal_format_to_gl(format, data_type);
    assert_eq!(internal(TextureFormat::Rgba, DataType::UnsignedByte), Some(glow::RGBA8 as i32));
    assert_eq!(internal(TextureFormat::Rgba, DataType::Float), Some(glow::RGBA32F as i32));
    assert_eq!(internal(TextureFormat::Red, DataType::Float), Some(glow::R32F as i32));
    assert_eq!(internal(TextureFormat::Rg, DataType::Short), Some(glow::RG16_SNORM as i32));
    assert_eq!(internal(TextureFormat::Depth, DataType::Float), Some(glow::DEPTH_COMPONENT32F as i32));
    assert_eq!(
        internal(TextureFormat::DepthStencil, DataType::UnsignedInt),
        Some(glow::DEPTH24_STENCIL8 as i32)
    );
}

#[test]
fn test_integer_colour_has_no_internal_format() {
    assert_eq!(internal_format_to_gl(TextureFormat::Rgba, DataType::Int), None);
    assert_eq!(internal_format_to_gl(TextureFormat::Red, DataType::UnsignedInt), None);
    assert_eq!(internal_format_to_gl(TextureFormat::Rgb, DataType::Double), None);
}

#[test]
fn test_depth_stencil_uses_packed_type() {
    assert_eq!(
        pixel_type_to_gl(TextureFormat::DepthStencil, DataType::UnsignedInt),
        glow::UNSIGNED_INT_24_8
    );
    assert_eq!(pixel_type_to_gl(TextureFormat::Depth, DataType::Float), glow::FLOAT);
    assert_eq!(pixel_type_to_gl(TextureFormat::Rgba, DataType::UnsignedByte), glow::UNSIGNED_BYTE);
}

#[test]
fn test_wrap_and_filter_to_gl() {
    assert_eq!(wrap_mode_to_gl(TextureWrapMode::Repeat), glow::REPEAT as i32);
    assert_eq!(wrap_mode_to_gl(TextureWrapMode::ClampToBorder), glow::CLAMP_TO_BORDER as i32);
    assert_eq!(filter_to_gl(TextureFilter::Nearest), glow::NEAREST as i32);
    assert_eq!(
        filter_to_gl(TextureFilter::LinearMipmapLinear),
        glow::LINEAR_MIPMAP_LINEAR as i32
    );
}

// ============================================================================
// BLENDING AND CLEARING
// ============================================================================

#[test]
fn test_blend_factor_to_gl() {
    assert_eq!(blend_factor_to_gl(BlendFactor::Zero), glow::ZERO);
    assert_eq!(blend_factor_to_gl(BlendFactor::One), glow::ONE);
    assert_eq!(blend_factor_to_gl(BlendFactor::SrcAlpha), glow::SRC_ALPHA);
    assert_eq!(blend_factor_to_gl(BlendFactor::OneMinusSrcAlpha), glow::ONE_MINUS_SRC_ALPHA);
    assert_eq!(blend_factor_to_gl(BlendFactor::SrcAlphaSaturate), glow::SRC_ALPHA_SATURATE);
}

#[test]
fn test_blend_equation_to_gl() {
    assert_eq!(blend_equation_to_gl(BlendEquation::Add), glow::FUNC_ADD);
    assert_eq!(blend_equation_to_gl(BlendEquation::ReverseSubtract), glow::FUNC_REVERSE_SUBTRACT);
    assert_eq!(blend_equation_to_gl(BlendEquation::Max), glow::MAX);
}

#[test]
fn test_clear_flags_to_gl() {
    assert_eq!(
        clear_flags_to_gl(ClearFlags::default()),
        glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT
    );
    assert_eq!(clear_flags_to_gl(ClearFlags::STENCIL), glow::STENCIL_BUFFER_BIT);
    assert_eq!(clear_flags_to_gl(ClearFlags::empty()), 0);
}

#[test]
fn test_shader_stage_to_gl() {
    assert_eq!(shader_stage_to_gl(ShaderStage::Vertex), glow::VERTEX_SHADER);
    assert_eq!(shader_stage_to_gl(ShaderStage::Fragment), glow::FRAGMENT_SHADER);
}
