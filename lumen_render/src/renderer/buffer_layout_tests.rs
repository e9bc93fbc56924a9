//! Unit tests for VertexBufferLayout
//!
//! Tests offset accumulation, stride computation and attribute location counting.

use crate::renderer::{DataType, ElementStructure, VertexBufferElement, VertexBufferLayout};

// ============================================================================
// OFFSETS AND STRIDE
// ============================================================================

#[test]
fn test_position_uv_normal_layout() {
    let layout = VertexBufferLayout::builder()
        .push(ElementStructure::Vec3, DataType::Float, false)
        .push(ElementStructure::Vec2, DataType::Float, false)
        .push(ElementStructure::Vec3, DataType::Float, false)
        .build();

    assert_eq!(layout.offsets(), &[0, 12, 20]);
    assert_eq!(layout.stride(), 32);
    assert_eq!(layout.len(), 3);
}

#[test]
fn test_mixed_types_have_no_padding() {
    // Vec3 float (12) + Vec4 ubyte normalized (4) + Scalar short (2) + Scalar double (8)
    let layout = VertexBufferLayout::builder()
        .push(ElementStructure::Vec3, DataType::Float, false)
        .push(ElementStructure::Vec4, DataType::UnsignedByte, true)
        .push(ElementStructure::Scalar, DataType::Short, false)
        .push(ElementStructure::Scalar, DataType::Double, false)
        .build();

    assert_eq!(layout.offsets(), &[0, 12, 16, 18]);
    assert_eq!(layout.stride(), 26);
    assert!(layout.elements()[1].normalized);
}

#[test]
fn test_stride_is_sum_of_element_sizes() {
    let elements = vec![
        VertexBufferElement::new(ElementStructure::Mat4, DataType::Float, false),
        VertexBufferElement::new(ElementStructure::Mat3, DataType::Double, false),
        VertexBufferElement::new(ElementStructure::Vec2, DataType::UnsignedShort, true),
    ];
    let expected: u32 = elements.iter().map(|e| e.byte_size()).sum();

    let layout = VertexBufferLayout::new(elements);

    assert_eq!(layout.stride(), expected);
    assert_eq!(layout.stride(), 64 + 72 + 4);
    assert_eq!(layout.offsets(), &[0, 64, 136]);
}

#[test]
fn test_offsets_are_monotonic() {
    let layout = VertexBufferLayout::builder()
        .push(ElementStructure::Scalar, DataType::Byte, false)
        .push(ElementStructure::Vec4, DataType::Int, false)
        .push(ElementStructure::Vec2, DataType::Double, false)
        .push(ElementStructure::Scalar, DataType::UnsignedByte, false)
        .build();

    let offsets = layout.offsets();
    assert_eq!(offsets[0], 0);
    for pair in offsets.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert!(*offsets.last().unwrap() < layout.stride());
}

#[test]
fn test_empty_layout_has_zero_stride() {
    let layout = VertexBufferLayout::new(Vec::new());
    assert!(layout.is_empty());
    assert_eq!(layout.stride(), 0);
    assert!(layout.offsets().is_empty());
    assert_eq!(layout.location_count(), 0);
}

// ============================================================================
// ITERATION AND LOCATIONS
// ============================================================================

#[test]
fn test_iter_pairs_elements_with_offsets() {
    let layout = VertexBufferLayout::builder()
        .push(ElementStructure::Vec2, DataType::Float, false)
        .push(ElementStructure::Vec4, DataType::Float, false)
        .build();

    let pairs: Vec<_> = layout.iter().map(|(e, offset)| (e.structure, offset)).collect();
    assert_eq!(pairs, vec![(ElementStructure::Vec2, 0), (ElementStructure::Vec4, 8)]);
}

#[test]
fn test_location_count_includes_matrix_columns() {
    // Per-instance model matrix after a position: 1 + 4 locations
    let layout = VertexBufferLayout::builder()
        .push(ElementStructure::Vec3, DataType::Float, false)
        .push(ElementStructure::Mat4, DataType::Float, false)
        .push(ElementStructure::Mat3, DataType::Float, false)
        .build();

    assert_eq!(layout.location_count(), 1 + 4 + 3);
}

#[test]
fn test_layout_equality() {
    let a = VertexBufferLayout::builder()
        .push(ElementStructure::Vec3, DataType::Float, false)
        .build();
    let b = VertexBufferLayout::new(vec![VertexBufferElement::new(
        ElementStructure::Vec3,
        DataType::Float,
        false,
    )]);
    assert_eq!(a, b);
    assert_eq!(a.clone(), b);
}
