/// 2D texture descriptor, creation description and pixel-data validation

use crate::error::{Error, Result};
use crate::renderer::{
    downcast_handle, downcast_handle_mut, Backend, DataType, NativeHandle, TextureFilter,
    TextureFormat, TextureWrapMode,
};

// ===== TEXTURE DESC =====

/// Description of a 2D texture to create
///
/// `data` borrows the CPU pixels only for the duration of the create call.
/// Rows are read bottom-to-top with the renderer's current unpack alignment.
#[derive(Debug, Clone, Copy)]
pub struct Texture2DDesc<'a> {
    pub width: u32,
    pub height: u32,
    pub data: Option<&'a [u8]>,
    pub format: TextureFormat,
    pub data_type: DataType,
    pub wrap_x: TextureWrapMode,
    pub wrap_y: TextureWrapMode,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl<'a> Texture2DDesc<'a> {
    /// Repeat wrapping, trilinear minification, linear magnification, no data
    pub fn new(width: u32, height: u32, format: TextureFormat, data_type: DataType) -> Self {
        Self {
            width,
            height,
            data: None,
            format,
            data_type,
            wrap_x: TextureWrapMode::Repeat,
            wrap_y: TextureWrapMode::Repeat,
            min_filter: TextureFilter::LinearMipmapLinear,
            mag_filter: TextureFilter::Linear,
        }
    }

    pub fn with_data(mut self, data: &'a [u8]) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_wrap(mut self, x: TextureWrapMode, y: TextureWrapMode) -> Self {
        self.wrap_x = x;
        self.wrap_y = y;
        self
    }

    pub fn with_filter(mut self, min: TextureFilter, mag: TextureFilter) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self
    }

    /// Minimum byte length of `data` for the given unpack row alignment
    pub fn expected_data_len(&self, unpack_alignment: u32) -> usize {
        expected_data_len(
            self.width,
            self.height,
            bytes_per_pixel(self.format, self.data_type),
            unpack_alignment,
        )
    }

    /// Check dimensions, filters, format/type pairing and pixel data length
    pub fn validate(&self, unpack_alignment: u32) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidParameter(format!(
                "texture size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if !self.mag_filter.is_valid_mag_filter() {
            return Err(Error::InvalidParameter(format!(
                "{} is not a magnification filter",
                self.mag_filter
            )));
        }
        if !is_supported_pixel_type(self.format, self.data_type) {
            return Err(Error::UnsupportedFormat(format!(
                "{} texture with {} data",
                self.format, self.data_type
            )));
        }
        if let Some(data) = self.data {
            let expected = self.expected_data_len(unpack_alignment);
            if data.len() < expected {
                return Err(Error::InvalidParameter(format!(
                    "{}x{} {} {} texture needs {} bytes (unpack alignment {}), got {}",
                    self.width,
                    self.height,
                    self.format,
                    self.data_type,
                    expected,
                    unpack_alignment,
                    data.len()
                )));
            }
        }
        Ok(())
    }

    pub fn info(&self) -> Texture2DInfo {
        Texture2DInfo {
            width: self.width,
            height: self.height,
            format: self.format,
            data_type: self.data_type,
            wrap_x: self.wrap_x,
            wrap_y: self.wrap_y,
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
        }
    }
}

/// Bytes of one pixel in CPU memory. Packed depth-stencil is one 32-bit word.
pub fn bytes_per_pixel(format: TextureFormat, data_type: DataType) -> u32 {
    match format {
        TextureFormat::DepthStencil => 4,
        _ => format.channel_count() * data_type.byte_size(),
    }
}

/// Rows are padded to `alignment`, except the last one
pub fn expected_data_len(width: u32, height: u32, bytes_per_pixel: u32, alignment: u32) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    let alignment = alignment.max(1) as usize;
    let row = width as usize * bytes_per_pixel as usize;
    let padded_row = row.div_ceil(alignment) * alignment;
    padded_row * (height as usize - 1) + row
}

/// Format / data-type pairs every backend can upload
pub fn is_supported_pixel_type(format: TextureFormat, data_type: DataType) -> bool {
    match format {
        TextureFormat::Depth => matches!(
            data_type,
            DataType::UnsignedShort | DataType::UnsignedInt | DataType::Float
        ),
        TextureFormat::DepthStencil => data_type == DataType::UnsignedInt,
        // Colour data is sampled as normalized or float values
        _ => !matches!(data_type, DataType::Int | DataType::UnsignedInt | DataType::Double),
    }
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture2DInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data_type: DataType,
    pub wrap_x: TextureWrapMode,
    pub wrap_y: TextureWrapMode,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

// ===== TEXTURE =====

/// A GPU 2D image
///
/// Released when dropped or passed to `Renderer::delete_textures_2d`.
#[derive(Debug)]
pub struct Texture2D {
    info: Texture2DInfo,
    handle: Box<dyn NativeHandle>,
}

impl Texture2D {
    pub fn new(info: Texture2DInfo, handle: Box<dyn NativeHandle>) -> Self {
        Self { info, handle }
    }

    pub fn info(&self) -> &Texture2DInfo {
        &self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn backend(&self) -> Backend {
        self.handle.backend()
    }

    pub fn serial(&self) -> u64 {
        self.handle.serial()
    }

    pub fn native<T: 'static>(&self) -> Result<&T> {
        downcast_handle(self.handle.as_ref(), "Texture2D")
    }

    pub fn native_mut<T: 'static>(&mut self) -> Result<&mut T> {
        downcast_handle_mut(self.handle.as_mut(), "Texture2D")
    }

    /// Record wrap modes after the backend applied them to the driver object
    pub fn record_wrap_mode(&mut self, x: TextureWrapMode, y: TextureWrapMode) {
        self.info.wrap_x = x;
        self.info.wrap_y = y;
    }

    /// Record filters after the backend applied them to the driver object
    pub fn record_filter(&mut self, min: TextureFilter, mag: TextureFilter) {
        self.info.min_filter = min;
        self.info.mag_filter = mag;
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
