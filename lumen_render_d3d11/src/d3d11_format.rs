/// Format conversion between lumen and Direct3D 11 enums

use lumen_render::lumen::render::{
    BlendEquation, BlendFactor, DataType, ShaderStage, TextureFilter, TextureFormat, TextureWrapMode,
};
use windows::core::{s, PCSTR};
use windows::Win32::Graphics::Direct3D::{
    D3D_FEATURE_LEVEL, D3D_FEATURE_LEVEL_10_0, D3D_FEATURE_LEVEL_10_1, D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_11_1,
};
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;

/// Storage format of a texture and the format its shader view reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFormats {
    pub texture: DXGI_FORMAT,
    pub view: DXGI_FORMAT,
}

impl TextureFormats {
    fn same(format: DXGI_FORMAT) -> Self {
        Self { texture: format, view: format }
    }
}

/// DXGI formats for pixels already repacked by `upload_layout`
///
/// RGB data is stored as RGBA.
pub fn texture_formats(format: TextureFormat, data_type: DataType) -> Option<TextureFormats> {
    let formats = match (format, data_type) {
        (TextureFormat::Depth, DataType::UnsignedShort) => TextureFormats {
            texture: DXGI_FORMAT_R16_TYPELESS,
            view: DXGI_FORMAT_R16_UNORM,
        },
        (TextureFormat::Depth, DataType::UnsignedInt | DataType::Float) => TextureFormats {
            texture: DXGI_FORMAT_R32_TYPELESS,
            view: DXGI_FORMAT_R32_FLOAT,
        },
        (TextureFormat::DepthStencil, DataType::UnsignedInt) => TextureFormats {
            texture: DXGI_FORMAT_R24G8_TYPELESS,
            view: DXGI_FORMAT_R24_UNORM_X8_TYPELESS,
        },
        (TextureFormat::Depth | TextureFormat::DepthStencil, _) => return None,

        (TextureFormat::Red, DataType::UnsignedByte) => TextureFormats::same(DXGI_FORMAT_R8_UNORM),
        (TextureFormat::Rg, DataType::UnsignedByte) => TextureFormats::same(DXGI_FORMAT_R8G8_UNORM),
        (_, DataType::UnsignedByte) => TextureFormats::same(DXGI_FORMAT_R8G8B8A8_UNORM),

        (TextureFormat::Red, DataType::Byte) => TextureFormats::same(DXGI_FORMAT_R8_SNORM),
        (TextureFormat::Rg, DataType::Byte) => TextureFormats::same(DXGI_FORMAT_R8G8_SNORM),
        (_, DataType::Byte) => TextureFormats::same(DXGI_FORMAT_R8G8B8A8_SNORM),

        (TextureFormat::Red, DataType::UnsignedShort) => TextureFormats::same(DXGI_FORMAT_R16_UNORM),
        (TextureFormat::Rg, DataType::UnsignedShort) => TextureFormats::same(DXGI_FORMAT_R16G16_UNORM),
        (_, DataType::UnsignedShort) => TextureFormats::same(DXGI_FORMAT_R16G16B16A16_UNORM),

        (TextureFormat::Red, DataType::Short) => TextureFormats::same(DXGI_FORMAT_R16_SNORM),
        (TextureFormat::Rg, DataType::Short) => TextureFormats::same(DXGI_FORMAT_R16G16_SNORM),
        (_, DataType::Short) => TextureFormats::same(DXGI_FORMAT_R16G16B16A16_SNORM),

        (TextureFormat::Red, DataType::Float) => TextureFormats::same(DXGI_FORMAT_R32_FLOAT),
        (TextureFormat::Rg, DataType::Float) => TextureFormats::same(DXGI_FORMAT_R32G32_FLOAT),
        (_, DataType::Float) => TextureFormats::same(DXGI_FORMAT_R32G32B32A32_FLOAT),

        _ => return None,
    };
    Some(formats)
}

/// Vertex attribute format for `components` values of `data_type`
///
/// D3D11 has no 3-component 8/16-bit formats and no doubles.
pub fn attribute_format(data_type: DataType, components: u32, normalized: bool) -> Option<DXGI_FORMAT> {
    let format = match (data_type, components, normalized) {
        (DataType::Float, 1, _) => DXGI_FORMAT_R32_FLOAT,
        (DataType::Float, 2, _) => DXGI_FORMAT_R32G32_FLOAT,
        (DataType::Float, 3, _) => DXGI_FORMAT_R32G32B32_FLOAT,
        (DataType::Float, 4, _) => DXGI_FORMAT_R32G32B32A32_FLOAT,

        (DataType::Int, 1, _) => DXGI_FORMAT_R32_SINT,
        (DataType::Int, 2, _) => DXGI_FORMAT_R32G32_SINT,
        (DataType::Int, 3, _) => DXGI_FORMAT_R32G32B32_SINT,
        (DataType::Int, 4, _) => DXGI_FORMAT_R32G32B32A32_SINT,

        (DataType::UnsignedInt, 1, _) => DXGI_FORMAT_R32_UINT,
        (DataType::UnsignedInt, 2, _) => DXGI_FORMAT_R32G32_UINT,
        (DataType::UnsignedInt, 3, _) => DXGI_FORMAT_R32G32B32_UINT,
        (DataType::UnsignedInt, 4, _) => DXGI_FORMAT_R32G32B32A32_UINT,

        (DataType::Short, 1, false) => DXGI_FORMAT_R16_SINT,
        (DataType::Short, 2, false) => DXGI_FORMAT_R16G16_SINT,
        (DataType::Short, 4, false) => DXGI_FORMAT_R16G16B16A16_SINT,
        (DataType::Short, 1, true) => DXGI_FORMAT_R16_SNORM,
        (DataType::Short, 2, true) => DXGI_FORMAT_R16G16_SNORM,
        (DataType::Short, 4, true) => DXGI_FORMAT_R16G16B16A16_SNORM,

        (DataType::UnsignedShort, 1, false) => DXGI_FORMAT_R16_UINT,
        (DataType::UnsignedShort, 2, false) => DXGI_FORMAT_R16G16_UINT,
        (DataType::UnsignedShort, 4, false) => DXGI_FORMAT_R16G16B16A16_UINT,
        (DataType::UnsignedShort, 1, true) => DXGI_FORMAT_R16_UNORM,
        (DataType::UnsignedShort, 2, true) => DXGI_FORMAT_R16G16_UNORM,
        (DataType::UnsignedShort, 4, true) => DXGI_FORMAT_R16G16B16A16_UNORM,

        (DataType::Byte, 1, false) => DXGI_FORMAT_R8_SINT,
        (DataType::Byte, 2, false) => DXGI_FORMAT_R8G8_SINT,
        (DataType::Byte, 4, false) => DXGI_FORMAT_R8G8B8A8_SINT,
        (DataType::Byte, 1, true) => DXGI_FORMAT_R8_SNORM,
        (DataType::Byte, 2, true) => DXGI_FORMAT_R8G8_SNORM,
        (DataType::Byte, 4, true) => DXGI_FORMAT_R8G8B8A8_SNORM,

        (DataType::UnsignedByte, 1, false) => DXGI_FORMAT_R8_UINT,
        (DataType::UnsignedByte, 2, false) => DXGI_FORMAT_R8G8_UINT,
        (DataType::UnsignedByte, 4, false) => DXGI_FORMAT_R8G8B8A8_UINT,
        (DataType::UnsignedByte, 1, true) => DXGI_FORMAT_R8_UNORM,
        (DataType::UnsignedByte, 2, true) => DXGI_FORMAT_R8G8_UNORM,
        (DataType::UnsignedByte, 4, true) => DXGI_FORMAT_R8G8B8A8_UNORM,

        _ => return None,
    };
    Some(format)
}

/// Index format; 8-bit indices are widened to 16-bit on upload
pub fn index_format(data_type: DataType) -> DXGI_FORMAT {
    match data_type {
        DataType::UnsignedInt => DXGI_FORMAT_R32_UINT,
        _ => DXGI_FORMAT_R16_UINT,
    }
}

pub fn blend_factor(factor: BlendFactor) -> D3D11_BLEND {
    match factor {
        BlendFactor::Zero => D3D11_BLEND_ZERO,
        BlendFactor::One => D3D11_BLEND_ONE,
        BlendFactor::SrcColor => D3D11_BLEND_SRC_COLOR,
        BlendFactor::OneMinusSrcColor => D3D11_BLEND_INV_SRC_COLOR,
        BlendFactor::DstColor => D3D11_BLEND_DEST_COLOR,
        BlendFactor::OneMinusDstColor => D3D11_BLEND_INV_DEST_COLOR,
        BlendFactor::SrcAlpha => D3D11_BLEND_SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => D3D11_BLEND_INV_SRC_ALPHA,
        BlendFactor::DstAlpha => D3D11_BLEND_DEST_ALPHA,
        BlendFactor::OneMinusDstAlpha => D3D11_BLEND_INV_DEST_ALPHA,
        BlendFactor::SrcAlphaSaturate => D3D11_BLEND_SRC_ALPHA_SAT,
    }
}

/// Alpha-channel blend factor; color factors are not allowed there
pub fn blend_factor_alpha(factor: BlendFactor) -> D3D11_BLEND {
    match factor {
        BlendFactor::SrcColor => D3D11_BLEND_SRC_ALPHA,
        BlendFactor::OneMinusSrcColor => D3D11_BLEND_INV_SRC_ALPHA,
        BlendFactor::DstColor => D3D11_BLEND_DEST_ALPHA,
        BlendFactor::OneMinusDstColor => D3D11_BLEND_INV_DEST_ALPHA,
        other => blend_factor(other),
    }
}

pub fn blend_op(equation: BlendEquation) -> D3D11_BLEND_OP {
    match equation {
        BlendEquation::Add => D3D11_BLEND_OP_ADD,
        BlendEquation::Subtract => D3D11_BLEND_OP_SUBTRACT,
        BlendEquation::ReverseSubtract => D3D11_BLEND_OP_REV_SUBTRACT,
        BlendEquation::Min => D3D11_BLEND_OP_MIN,
        BlendEquation::Max => D3D11_BLEND_OP_MAX,
    }
}

pub fn address_mode(mode: TextureWrapMode) -> D3D11_TEXTURE_ADDRESS_MODE {
    match mode {
        TextureWrapMode::Repeat => D3D11_TEXTURE_ADDRESS_WRAP,
        TextureWrapMode::MirroredRepeat => D3D11_TEXTURE_ADDRESS_MIRROR,
        TextureWrapMode::ClampToEdge => D3D11_TEXTURE_ADDRESS_CLAMP,
        TextureWrapMode::ClampToBorder => D3D11_TEXTURE_ADDRESS_BORDER,
    }
}

/// Sampler filter for a GL-style min/mag pair, and whether mip levels are sampled
pub fn sampler_filter(min: TextureFilter, mag: TextureFilter) -> (D3D11_FILTER, bool) {
    let (min_linear, mip) = match min {
        TextureFilter::Nearest => (false, None),
        TextureFilter::Linear => (true, None),
        TextureFilter::NearestMipmapNearest => (false, Some(false)),
        TextureFilter::LinearMipmapNearest => (true, Some(false)),
        TextureFilter::NearestMipmapLinear => (false, Some(true)),
        TextureFilter::LinearMipmapLinear => (true, Some(true)),
    };
    let mag_linear = mag == TextureFilter::Linear;
    let mip_linear = mip.unwrap_or(false);

    let filter = match (min_linear, mag_linear, mip_linear) {
        (false, false, false) => D3D11_FILTER_MIN_MAG_MIP_POINT,
        (false, false, true) => D3D11_FILTER_MIN_MAG_POINT_MIP_LINEAR,
        (false, true, false) => D3D11_FILTER_MIN_POINT_MAG_LINEAR_MIP_POINT,
        (false, true, true) => D3D11_FILTER_MIN_POINT_MAG_MIP_LINEAR,
        (true, false, false) => D3D11_FILTER_MIN_LINEAR_MAG_MIP_POINT,
        (true, false, true) => D3D11_FILTER_MIN_LINEAR_MAG_POINT_MIP_LINEAR,
        (true, true, false) => D3D11_FILTER_MIN_MAG_LINEAR_MIP_POINT,
        (true, true, true) => D3D11_FILTER_MIN_MAG_MIP_LINEAR,
    };
    (filter, mip.is_some())
}

/// HLSL compile target (shader model 5.0)
pub fn shader_target(stage: ShaderStage) -> PCSTR {
    match stage {
        ShaderStage::Vertex => s!("vs_5_0"),
        ShaderStage::Fragment => s!("ps_5_0"),
    }
}

pub fn feature_level_name(level: D3D_FEATURE_LEVEL) -> &'static str {
    match level {
        D3D_FEATURE_LEVEL_11_1 => "11.1",
        D3D_FEATURE_LEVEL_11_0 => "11.0",
        D3D_FEATURE_LEVEL_10_1 => "10.1",
        D3D_FEATURE_LEVEL_10_0 => "10.0",
        _ => "unknown",
    }
}

/// Vendor name for a PCI vendor id
pub fn vendor_name(vendor_id: u32) -> String {
    match vendor_id {
        0x10DE => "NVIDIA".to_string(),
        0x1002 | 0x1022 => "AMD".to_string(),
        0x8086 => "Intel".to_string(),
        0x1414 => "Microsoft".to_string(),
        other => format!("0x{:04X}", other),
    }
}

#[cfg(test)]
#[path = "d3d11_format_tests.rs"]
mod tests;
