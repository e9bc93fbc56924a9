/// Data-type catalog: element structures, scalar types, texture and blend enums
///
/// Pure value types shared by every backend. Each backend maps them to its native
/// constants in its own format module.

use std::fmt;

// ===== ELEMENT STRUCTURE =====

/// Shape of one vertex attribute or uniform value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementStructure {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl ElementStructure {
    /// Number of scalar components (1, 2, 3, 4, 9, 16)
    pub fn component_count(&self) -> u32 {
        match self {
            ElementStructure::Scalar => 1,
            ElementStructure::Vec2 => 2,
            ElementStructure::Vec3 => 3,
            ElementStructure::Vec4 => 4,
            ElementStructure::Mat3 => 9,
            ElementStructure::Mat4 => 16,
        }
    }

    /// Number of vertex attribute locations the element occupies.
    /// Matrices take one location per column.
    pub fn location_span(&self) -> u32 {
        match self {
            ElementStructure::Mat3 => 3,
            ElementStructure::Mat4 => 4,
            _ => 1,
        }
    }

    /// Components fed through each attribute location
    pub fn column_component_count(&self) -> u32 {
        self.component_count() / self.location_span()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementStructure::Scalar => "Scalar",
            ElementStructure::Vec2 => "Vec2",
            ElementStructure::Vec3 => "Vec3",
            ElementStructure::Vec4 => "Vec4",
            ElementStructure::Mat3 => "Mat3",
            ElementStructure::Mat4 => "Mat4",
        }
    }
}

impl fmt::Display for ElementStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== DATA TYPE =====

/// Scalar data type of vertex attributes, index buffers and texel channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    Double,
}

impl DataType {
    /// Size in bytes of one scalar of this type
    pub fn byte_size(&self) -> u32 {
        match self {
            DataType::Byte | DataType::UnsignedByte => 1,
            DataType::Short | DataType::UnsignedShort => 2,
            DataType::Int | DataType::UnsignedInt | DataType::Float => 4,
            DataType::Double => 8,
        }
    }

    /// Size of an optional type tag; an unknown tag has size 0
    pub fn byte_size_of(data_type: Option<DataType>) -> u32 {
        data_type.map_or(0, |t| t.byte_size())
    }

    /// True for every non floating-point type
    pub fn is_integer(&self) -> bool {
        !matches!(self, DataType::Float | DataType::Double)
    }

    /// Index buffers accept unsigned byte, short and int only
    pub fn is_valid_index_type(&self) -> bool {
        matches!(
            self,
            DataType::UnsignedByte | DataType::UnsignedShort | DataType::UnsignedInt
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Byte => "Byte",
            DataType::UnsignedByte => "UnsignedByte",
            DataType::Short => "Short",
            DataType::UnsignedShort => "UnsignedShort",
            DataType::Int => "Int",
            DataType::UnsignedInt => "UnsignedInt",
            DataType::Float => "Float",
            DataType::Double => "Double",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== TEXTURE ENUMS =====

/// Pixel layout of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Red,
    Rg,
    Rgb,
    Rgba,
    Depth,
    DepthStencil,
}

impl TextureFormat {
    /// Channels per pixel in the CPU-side data
    pub fn channel_count(&self) -> u32 {
        match self {
            TextureFormat::Red | TextureFormat::Depth => 1,
            TextureFormat::Rg | TextureFormat::DepthStencil => 2,
            TextureFormat::Rgb => 3,
            TextureFormat::Rgba => 4,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth | TextureFormat::DepthStencil)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureFormat::Red => "Red",
            TextureFormat::Rg => "Rg",
            TextureFormat::Rgb => "Rgb",
            TextureFormat::Rgba => "Rgba",
            TextureFormat::Depth => "Depth",
            TextureFormat::DepthStencil => "DepthStencil",
        }
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrapMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

impl TextureWrapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextureWrapMode::Repeat => "Repeat",
            TextureWrapMode::MirroredRepeat => "MirroredRepeat",
            TextureWrapMode::ClampToEdge => "ClampToEdge",
            TextureWrapMode::ClampToBorder => "ClampToBorder",
        }
    }
}

impl fmt::Display for TextureWrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minification / magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    /// True when the filter samples between mip levels
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, TextureFilter::Nearest | TextureFilter::Linear)
    }

    /// Magnification never reads mip levels, so only Nearest and Linear apply
    pub fn is_valid_mag_filter(&self) -> bool {
        !self.uses_mipmaps()
    }

    /// True when texels are interpolated within one mip level
    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            TextureFilter::Linear
                | TextureFilter::LinearMipmapNearest
                | TextureFilter::LinearMipmapLinear
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextureFilter::Nearest => "Nearest",
            TextureFilter::Linear => "Linear",
            TextureFilter::NearestMipmapNearest => "NearestMipmapNearest",
            TextureFilter::LinearMipmapNearest => "LinearMipmapNearest",
            TextureFilter::NearestMipmapLinear => "NearestMipmapLinear",
            TextureFilter::LinearMipmapLinear => "LinearMipmapLinear",
        }
    }
}

impl fmt::Display for TextureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== BLEND ENUMS =====

/// Source / destination factor of the blend function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

impl BlendFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlendFactor::Zero => "Zero",
            BlendFactor::One => "One",
            BlendFactor::SrcColor => "SrcColor",
            BlendFactor::OneMinusSrcColor => "OneMinusSrcColor",
            BlendFactor::DstColor => "DstColor",
            BlendFactor::OneMinusDstColor => "OneMinusDstColor",
            BlendFactor::SrcAlpha => "SrcAlpha",
            BlendFactor::OneMinusSrcAlpha => "OneMinusSrcAlpha",
            BlendFactor::DstAlpha => "DstAlpha",
            BlendFactor::OneMinusDstAlpha => "OneMinusDstAlpha",
            BlendFactor::SrcAlphaSaturate => "SrcAlphaSaturate",
        }
    }
}

impl fmt::Display for BlendFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator combining the weighted source and destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendEquation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlendEquation::Add => "Add",
            BlendEquation::Subtract => "Subtract",
            BlendEquation::ReverseSubtract => "ReverseSubtract",
            BlendEquation::Min => "Min",
            BlendEquation::Max => "Max",
        }
    }
}

impl fmt::Display for BlendEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "data_type_tests.rs"]
mod tests;
