/// Constant buffers - HLSL packing of uniform values and buffer ranges
///
/// Register layout follows the HLSL cbuffer rules: 16-byte registers, matrices
/// column-major with one register per column.

use lumen_render::lumen::render::UniformValue;

/// Size of one constant register
pub const REGISTER_BYTES: u64 = 16;

/// Offset granularity of `*SetConstantBuffers1` ranges (16 registers)
pub const RANGE_ALIGNMENT: u64 = 256;

/// Byte width of a constant buffer able to hold `size` bytes
pub fn constant_buffer_width(size: u64) -> u64 {
    size.div_ceil(REGISTER_BYTES).max(1) * REGISTER_BYTES
}

/// First register and register count of a range binding
///
/// The count is rounded up to a multiple of 16 registers as the runtime requires.
pub fn constant_range(offset: u64, size: u64) -> (u32, u32) {
    let first = offset / REGISTER_BYTES;
    let count = size.div_ceil(RANGE_ALIGNMENT) * (RANGE_ALIGNMENT / REGISTER_BYTES);
    (first as u32, count as u32)
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// Bytes of `value` as laid out in a cbuffer
pub fn uniform_bytes(value: &UniformValue) -> Vec<u8> {
    match *value {
        UniformValue::Float(v) => v.to_le_bytes().to_vec(),
        UniformValue::UInt(v) => v.to_le_bytes().to_vec(),
        UniformValue::Int(v) => v.to_le_bytes().to_vec(),
        UniformValue::Vec2(v) => f32_bytes(&v.to_array()),
        UniformValue::Vec3(v) => f32_bytes(&v.to_array()),
        UniformValue::Vec4(v) => f32_bytes(&v.to_array()),
        UniformValue::Mat3(m) => {
            // float3x3: three registers, the last one not padded
            let cols = m.to_cols_array_2d();
            let mut bytes = Vec::with_capacity(44);
            for (index, col) in cols.iter().enumerate() {
                bytes.extend_from_slice(&f32_bytes(col));
                if index < 2 {
                    bytes.extend_from_slice(&[0u8; 4]);
                }
            }
            bytes
        }
        UniformValue::Mat4(m) => f32_bytes(&m.to_cols_array()),
    }
}

/// Write `value` into a cbuffer shadow copy at a reflected variable
///
/// Returns false when the value does not fit the variable or the buffer.
pub fn write_uniform(shadow: &mut [u8], offset: usize, size: usize, value: &UniformValue) -> bool {
    let bytes = uniform_bytes(value);
    let end = offset.checked_add(bytes.len());
    match end {
        Some(end) if bytes.len() <= size && end <= shadow.len() => {
            shadow[offset..end].copy_from_slice(&bytes);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "d3d11_constants_tests.rs"]
mod tests;
