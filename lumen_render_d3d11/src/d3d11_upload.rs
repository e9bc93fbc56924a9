/// Upload repacking - pixel rows and index data rewritten for Direct3D 11
///
/// D3D11 has no unpack alignment, no 24-bit color formats and no 8-bit
/// indices, so source data is rewritten into tightly packed rows of a layout
/// the device accepts.

use lumen_render::lumen::render::{DataType, TextureFormat};

/// How each source pixel becomes a destination pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelConversion {
    /// Bytes copied unchanged
    Copy,
    /// RGB widened to RGBA, alpha filled with the first `channel_bytes` of `alpha`
    ExpandRgb { channel_bytes: usize, alpha: [u8; 4] },
    /// Unsigned 32-bit depth normalized to f32
    DepthToFloat,
    /// `depth << 8 | stencil` to `stencil << 24 | depth`
    DepthStencil,
}

/// Source/destination pixel sizes for one format and data-type pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLayout {
    pub conversion: PixelConversion,
    pub src_bytes_per_pixel: usize,
    pub dst_bytes_per_pixel: usize,
    /// Color textures get a generated mip chain, depth textures do not
    pub mipmaps: bool,
}

/// Alpha value of an opaque pixel in `data_type`, little-endian
fn opaque_alpha(data_type: DataType) -> [u8; 4] {
    match data_type {
        DataType::UnsignedByte => [0xFF, 0, 0, 0],
        DataType::Byte => [0x7F, 0, 0, 0],
        DataType::UnsignedShort => [0xFF, 0xFF, 0, 0],
        DataType::Short => [0xFF, 0x7F, 0, 0],
        _ => 1.0f32.to_le_bytes(),
    }
}

/// Layout used to upload `format` / `data_type` pixels, `None` when D3D11 has no
/// sampled equivalent (integer and double color data)
pub fn upload_layout(format: TextureFormat, data_type: DataType) -> Option<UploadLayout> {
    let depth = |conversion, bytes| UploadLayout {
        conversion,
        src_bytes_per_pixel: bytes,
        dst_bytes_per_pixel: bytes,
        mipmaps: false,
    };

    match (format, data_type) {
        (TextureFormat::Depth, DataType::UnsignedShort) => Some(depth(PixelConversion::Copy, 2)),
        (TextureFormat::Depth, DataType::UnsignedInt) => Some(depth(PixelConversion::DepthToFloat, 4)),
        (TextureFormat::Depth, DataType::Float) => Some(depth(PixelConversion::Copy, 4)),
        (TextureFormat::DepthStencil, DataType::UnsignedInt) => Some(depth(PixelConversion::DepthStencil, 4)),
        (TextureFormat::Depth | TextureFormat::DepthStencil, _) => None,
        (_, DataType::Int | DataType::UnsignedInt | DataType::Double) => None,
        (format, data_type) => {
            let channel_bytes = data_type.byte_size() as usize;
            let src_bytes_per_pixel = format.channel_count() as usize * channel_bytes;
            let (conversion, dst_bytes_per_pixel) = if format == TextureFormat::Rgb {
                let alpha = opaque_alpha(data_type);
                (PixelConversion::ExpandRgb { channel_bytes, alpha }, 4 * channel_bytes)
            } else {
                (PixelConversion::Copy, src_bytes_per_pixel)
            };
            Some(UploadLayout {
                conversion,
                src_bytes_per_pixel,
                dst_bytes_per_pixel,
                mipmaps: true,
            })
        }
    }
}

/// Repack `data` (rows padded to `unpack_alignment`) into tight destination rows
///
/// Returns the pixels and the destination row pitch. `data` must already hold
/// at least `expected_data_len` bytes.
pub fn repack_pixels(
    data: &[u8],
    width: u32,
    height: u32,
    unpack_alignment: u32,
    layout: &UploadLayout,
) -> (Vec<u8>, u32) {
    let width = width as usize;
    let alignment = unpack_alignment.max(1) as usize;
    let src_row = width * layout.src_bytes_per_pixel;
    let src_pitch = src_row.div_ceil(alignment) * alignment;
    let dst_pitch = width * layout.dst_bytes_per_pixel;

    let mut out = Vec::with_capacity(dst_pitch * height as usize);
    for y in 0..height as usize {
        let row = &data[y * src_pitch..y * src_pitch + src_row];
        for pixel in row.chunks_exact(layout.src_bytes_per_pixel) {
            convert_pixel(pixel, layout.conversion, &mut out);
        }
    }
    (out, dst_pitch as u32)
}

fn convert_pixel(pixel: &[u8], conversion: PixelConversion, out: &mut Vec<u8>) {
    match conversion {
        PixelConversion::Copy => out.extend_from_slice(pixel),
        PixelConversion::ExpandRgb { channel_bytes, alpha } => {
            out.extend_from_slice(pixel);
            out.extend_from_slice(&alpha[..channel_bytes]);
        }
        PixelConversion::DepthToFloat => {
            let depth = u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
            let normalized = (f64::from(depth) / f64::from(u32::MAX)) as f32;
            out.extend_from_slice(&normalized.to_le_bytes());
        }
        PixelConversion::DepthStencil => {
            let packed = u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
            let swizzled = (packed >> 8) | ((packed & 0xFF) << 24);
            out.extend_from_slice(&swizzled.to_le_bytes());
        }
    }
}

/// Widen 8-bit indices to 16-bit, little-endian
pub fn widen_u8_indices(data: &[u8]) -> Vec<u8> {
    data.iter().flat_map(|&index| u16::from(index).to_le_bytes()).collect()
}

#[cfg(test)]
#[path = "d3d11_upload_tests.rs"]
mod tests;
