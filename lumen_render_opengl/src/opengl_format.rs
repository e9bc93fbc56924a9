/// Conversions from engine enums to OpenGL enums

use lumen_render::lumen::render::{
    BlendEquation, BlendFactor, ClearFlags, DataType, ShaderStage, TextureFilter, TextureFormat,
    TextureWrapMode,
};

/// Component type of vertex attributes, indices and pixels
pub fn data_type_to_gl(data_type: DataType) -> u32 {
    match data_type {
        DataType::Byte => glow::BYTE,
        DataType::UnsignedByte => glow::UNSIGNED_BYTE,
        DataType::Short => glow::SHORT,
        DataType::UnsignedShort => glow::UNSIGNED_SHORT,
        DataType::Int => glow::INT,
        DataType::UnsignedInt => glow::UNSIGNED_INT,
        DataType::Float => glow::FLOAT,
        DataType::Double => glow::DOUBLE,
    }
}

/// Pixel transfer format
pub fn texture_format_to_gl(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Red => glow::RED,
        TextureFormat::Rg => glow::RG,
        TextureFormat::Rgb => glow::RGB,
        TextureFormat::Rgba => glow::RGBA,
        TextureFormat::Depth => glow::DEPTH_COMPONENT,
        TextureFormat::DepthStencil => glow::DEPTH_STENCIL,
    }
}

/// Sized internal format for a format / data-type pair
///
/// Float colour data keeps 32 bits per channel; integer colour data has no
/// normalized storage and yields `None`.
pub fn internal_format_to_gl(format: TextureFormat, data_type: DataType) -> Option<i32> {
    use TextureFormat::*;
    let value = match (format, data_type) {
        (Depth, DataType::UnsignedShort) => glow::DEPTH_COMPONENT16,
        (Depth, DataType::UnsignedInt | DataType::Float) => glow::DEPTH_COMPONENT32F,
        (DepthStencil, DataType::UnsignedInt) => glow::DEPTH24_STENCIL8,
        (Depth | DepthStencil, _) => return None,

        (Red, DataType::UnsignedByte) => glow::R8,
        (Rg, DataType::UnsignedByte) => glow::RG8,
        (Rgb, DataType::UnsignedByte) => glow::RGB8,
        (Rgba, DataType::UnsignedByte) => glow::RGBA8,

        (Red, DataType::Byte) => glow::R8_SNORM,
        (Rg, DataType::Byte) => glow::RG8_SNORM,
        (Rgb, DataType::Byte) => glow::RGB8_SNORM,
        (Rgba, DataType::Byte) => glow::RGBA8_SNORM,

        (Red, DataType::UnsignedShort) => glow::R16,
        (Rg, DataType::UnsignedShort) => glow::RG16,
        (Rgb, DataType::UnsignedShort) => glow::RGB16,
        (Rgba, DataType::UnsignedShort) => glow::RGBA16,

        (Red, DataType::Short) => glow::R16_SNORM,
        (Rg, DataType::Short) => glow::RG16_SNORM,
        (Rgb, DataType::Short) => glow::RGB16_SNORM,
        (Rgba, DataType::Short) => glow::RGBA16_SNORM,

        (Red, DataType::Float) => glow::R32F,
        (Rg, DataType::Float) => glow::RG32F,
        (Rgb, DataType::Float) => glow::RGB32F,
        (Rgba, DataType::Float) => glow::RGBA32F,

        _ => return None,
    };
    Some(value as i32)
}

/// Pixel transfer type. Depth-stencil data is packed 24/8 into one word.
pub fn pixel_type_to_gl(format: TextureFormat, data_type: DataType) -> u32 {
    match format {
        TextureFormat::DepthStencil => glow::UNSIGNED_INT_24_8,
        _ => data_type_to_gl(data_type),
    }
}

pub fn wrap_mode_to_gl(mode: TextureWrapMode) -> i32 {
    let value = match mode {
        TextureWrapMode::Repeat => glow::REPEAT,
        TextureWrapMode::MirroredRepeat => glow::MIRRORED_REPEAT,
        TextureWrapMode::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrapMode::ClampToBorder => glow::CLAMP_TO_BORDER,
    };
    value as i32
}

pub fn filter_to_gl(filter: TextureFilter) -> i32 {
    let value = match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    };
    value as i32
}

pub fn blend_factor_to_gl(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFactor::SrcAlphaSaturate => glow::SRC_ALPHA_SATURATE,
    }
}

pub fn blend_equation_to_gl(equation: BlendEquation) -> u32 {
    match equation {
        BlendEquation::Add => glow::FUNC_ADD,
        BlendEquation::Subtract => glow::FUNC_SUBTRACT,
        BlendEquation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendEquation::Min => glow::MIN,
        BlendEquation::Max => glow::MAX,
    }
}

pub fn shader_stage_to_gl(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

/// `glClear` mask for the configured attachments
pub fn clear_flags_to_gl(flags: ClearFlags) -> u32 {
    let mut mask = 0;
    if flags.contains(ClearFlags::COLOR) {
        mask |= glow::COLOR_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::DEPTH) {
        mask |= glow::DEPTH_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::STENCIL) {
        mask |= glow::STENCIL_BUFFER_BIT;
    }
    mask
}

/// How an attribute of this type is fed to the vertex shader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// `glVertexAttribPointer` (floats, or normalized/converted integers)
    Float,
    /// `glVertexAttribIPointer` (integer inputs)
    Integer,
    /// `glVertexAttribLPointer` (double inputs)
    Double,
}

pub fn attribute_kind(data_type: DataType, normalized: bool) -> AttributeKind {
    match data_type {
        DataType::Double => AttributeKind::Double,
        dt if dt.is_integer() && !normalized => AttributeKind::Integer,
        _ => AttributeKind::Float,
    }
}

#[cfg(test)]
#[path = "opengl_format_tests.rs"]
mod tests;
