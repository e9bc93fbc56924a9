/// Vertex buffer layout: per-element byte offsets and record stride

use crate::renderer::{DataType, ElementStructure};

/// One attribute of a vertex record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferElement {
    /// Shape of the attribute
    pub structure: ElementStructure,
    /// Scalar type of each component
    pub data_type: DataType,
    /// Integer data is normalized to [0,1] / [-1,1] when read as float
    pub normalized: bool,
}

impl VertexBufferElement {
    pub fn new(structure: ElementStructure, data_type: DataType, normalized: bool) -> Self {
        Self { structure, data_type, normalized }
    }

    /// Bytes occupied by this element inside one record
    pub fn byte_size(&self) -> u32 {
        self.data_type.byte_size() * self.structure.component_count()
    }
}

/// Byte layout of one vertex record
///
/// Offsets accumulate from zero in declaration order with no padding, and the
/// stride is the sum of every element's size. The layout is immutable once built.
///
/// # Example
///
/// ```
/// use lumen_render::lumen::render::{VertexBufferLayout, ElementStructure, DataType};
///
/// let layout = VertexBufferLayout::builder()
///     .push(ElementStructure::Vec3, DataType::Float, false)
///     .push(ElementStructure::Vec2, DataType::Float, false)
///     .push(ElementStructure::Vec3, DataType::Float, false)
///     .build();
///
/// assert_eq!(layout.offsets(), &[0, 12, 20]);
/// assert_eq!(layout.stride(), 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexBufferLayout {
    elements: Vec<VertexBufferElement>,
    offsets: Vec<u32>,
    stride: u32,
}

impl VertexBufferLayout {
    /// Compute offsets and stride for the given elements
    pub fn new(elements: Vec<VertexBufferElement>) -> Self {
        let mut offsets = Vec::with_capacity(elements.len());
        let mut stride = 0u32;
        for element in &elements {
            offsets.push(stride);
            stride += element.byte_size();
        }
        Self { elements, offsets, stride }
    }

    pub fn builder() -> VertexBufferLayoutBuilder {
        VertexBufferLayoutBuilder::default()
    }

    pub fn elements(&self) -> &[VertexBufferElement] {
        &self.elements
    }

    /// Byte offset of each element, parallel to `elements()`
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Bytes per vertex record
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements paired with their byte offset
    pub fn iter(&self) -> impl Iterator<Item = (&VertexBufferElement, u32)> + '_ {
        self.elements.iter().zip(self.offsets.iter().copied())
    }

    /// Attribute locations consumed by this layout (matrices span several)
    pub fn location_count(&self) -> u32 {
        self.elements.iter().map(|e| e.structure.location_span()).sum()
    }
}

/// Incremental builder for `VertexBufferLayout`
#[derive(Debug, Clone, Default)]
pub struct VertexBufferLayoutBuilder {
    elements: Vec<VertexBufferElement>,
}

impl VertexBufferLayoutBuilder {
    /// Append an element after the ones already declared
    pub fn push(mut self, structure: ElementStructure, data_type: DataType, normalized: bool) -> Self {
        self.elements.push(VertexBufferElement::new(structure, data_type, normalized));
        self
    }

    pub fn build(self) -> VertexBufferLayout {
        VertexBufferLayout::new(self.elements)
    }
}

#[cfg(test)]
#[path = "buffer_layout_tests.rs"]
mod tests;
