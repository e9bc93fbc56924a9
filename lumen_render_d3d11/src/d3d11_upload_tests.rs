use super::*;

#[test]
fn test_color_layouts() {
    let rgba = upload_layout(TextureFormat::Rgba, DataType::UnsignedByte).unwrap();
    assert_eq!(rgba.conversion, PixelConversion::Copy);
    assert_eq!((rgba.src_bytes_per_pixel, rgba.dst_bytes_per_pixel), (4, 4));
    assert!(rgba.mipmaps);

    let rgb = upload_layout(TextureFormat::Rgb, DataType::Float).unwrap();
    assert_eq!((rgb.src_bytes_per_pixel, rgb.dst_bytes_per_pixel), (12, 16));

    assert!(upload_layout(TextureFormat::Rgba, DataType::UnsignedInt).is_none());
    assert!(upload_layout(TextureFormat::Red, DataType::Double).is_none());
}

#[test]
fn test_depth_layouts() {
    let depth = upload_layout(TextureFormat::Depth, DataType::UnsignedInt).unwrap();
    assert_eq!(depth.conversion, PixelConversion::DepthToFloat);
    assert!(!depth.mipmaps);

    assert!(upload_layout(TextureFormat::DepthStencil, DataType::UnsignedInt).is_some());
    assert!(upload_layout(TextureFormat::DepthStencil, DataType::Float).is_none());
    assert!(upload_layout(TextureFormat::Depth, DataType::Byte).is_none());
}

#[test]
fn test_rgb_rows_drop_padding_and_gain_alpha() {
    // 1x2 RGB with 4-byte unpack alignment: each row is 3 bytes + 1 padding
    let data = [10, 20, 30, 0xEE, 40, 50, 60];
    let layout = upload_layout(TextureFormat::Rgb, DataType::UnsignedByte).unwrap();

    let (pixels, pitch) = repack_pixels(&data, 1, 2, 4, &layout);

    assert_eq!(pitch, 4);
    assert_eq!(pixels, vec![10, 20, 30, 0xFF, 40, 50, 60, 0xFF]);
}

#[test]
fn test_short_rgb_alpha_is_max_signed() {
    let data: Vec<u8> = [1i16, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
    let layout = upload_layout(TextureFormat::Rgb, DataType::Short).unwrap();

    let (pixels, _) = repack_pixels(&data, 1, 1, 1, &layout);

    assert_eq!(&pixels[6..], &i16::MAX.to_le_bytes());
}

#[test]
fn test_tightly_packed_rows_are_copied() {
    let data: Vec<u8> = (0..16).collect();
    let layout = upload_layout(TextureFormat::Rg, DataType::UnsignedByte).unwrap();

    let (pixels, pitch) = repack_pixels(&data, 4, 2, 8, &layout);

    assert_eq!(pitch, 8);
    assert_eq!(pixels, data);
}

#[test]
fn test_depth_stencil_swizzle() {
    let gl_packed: u32 = (0x00ABCDEF << 8) | 0x7F;
    let layout = upload_layout(TextureFormat::DepthStencil, DataType::UnsignedInt).unwrap();

    let (pixels, _) = repack_pixels(&gl_packed.to_le_bytes(), 1, 1, 4, &layout);

    assert_eq!(u32::from_le_bytes([pixels[0], pixels[1], pixels[2], pixels[3]]), 0x7FAB_CDEF);
}

#[test]
fn test_depth_normalization() {
    let data: Vec<u8> = [0u32, u32::MAX].iter().flat_map(|v| v.to_le_bytes()).collect();
    let layout = upload_layout(TextureFormat::Depth, DataType::UnsignedInt).unwrap();

    let (pixels, _) = repack_pixels(&data, 2, 1, 4, &layout);

    assert_eq!(f32::from_le_bytes([pixels[0], pixels[1], pixels[2], pixels[3]]), 0.0);
    assert_eq!(f32::from_le_bytes([pixels[4], pixels[5], pixels[6], pixels[7]]), 1.0);
}

#[test]
fn test_widen_indices() {
    assert_eq!(widen_u8_indices(&[0, 1, 255]), vec![0, 0, 1, 0, 255, 0]);
    assert!(widen_u8_indices(&[]).is_empty());
}
