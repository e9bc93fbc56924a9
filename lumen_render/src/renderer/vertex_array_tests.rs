//! Unit tests for VertexArray ownership and draw planning

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::renderer::{ElementStructure, VertexBufferElement, VertexBufferLayout};

/// Handle that records its serial in a shared list when dropped
#[derive(Debug)]
struct DropRecorder {
    serial: u64,
    dropped: Rc<RefCell<Vec<u64>>>,
}

impl NativeHandle for DropRecorder {
    fn backend(&self) -> Backend {
        Backend::Mock
    }

    fn raw_id(&self) -> u64 {
        self.serial
    }

    fn serial(&self) -> u64 {
        self.serial
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for DropRecorder {
    fn drop(&mut self) {
        self.dropped.borrow_mut().push(self.serial);
    }
}

fn tracked_handle(serial: u64, dropped: &Rc<RefCell<Vec<u64>>>) -> Box<dyn NativeHandle> {
    Box::new(DropRecorder {
        serial,
        dropped: Rc::clone(dropped),
    })
}

fn position_layout() -> VertexBufferLayout {
    VertexBufferLayout::new(vec![VertexBufferElement::new(ElementStructure::Vec3, DataType::Float, false)])
}

#[test]
fn test_next_location_counts_matrix_columns() {
    let dropped = Rc::new(RefCell::new(Vec::new()));
    let mut array = VertexArray::new(tracked_handle(1, &dropped));
    assert_eq!(array.next_attribute_location(), 0);

    array.push_vertex_buffer(VertexBuffer::new(120, position_layout(), tracked_handle(2, &dropped)));
    let instance_layout = VertexBufferLayout::new(vec![
        VertexBufferElement::new(ElementStructure::Mat4, DataType::Float, false),
        VertexBufferElement::new(ElementStructure::Vec4, DataType::UnsignedByte, true),
    ]);
    array.push_vertex_buffer(VertexBuffer::new(68, instance_layout, tracked_handle(3, &dropped)));

    assert_eq!(array.next_attribute_location(), 1 + 4 + 1);
}

#[test]
fn test_draw_plan_prefers_index_buffer() {
    let dropped = Rc::new(RefCell::new(Vec::new()));
    let mut array = VertexArray::new(tracked_handle(1, &dropped));
    array.push_vertex_buffer(VertexBuffer::new(48, position_layout(), tracked_handle(2, &dropped)));
    assert_eq!(array.draw_plan().unwrap(), DrawPlan::Arrays { vertex_count: 4 });

    array.replace_index_buffer(IndexBuffer::new(6, DataType::UnsignedShort, tracked_handle(3, &dropped)));
    let plan = array.draw_plan().unwrap();
    assert_eq!(
        plan,
        DrawPlan::Indexed {
            count: 6,
            data_type: DataType::UnsignedShort
        }
    );
    assert_eq!(plan.triangle_count(), 2);
}

#[test]
fn test_draw_plan_rejects_empty_and_zero_stride() {
    let dropped = Rc::new(RefCell::new(Vec::new()));
    let mut array = VertexArray::new(tracked_handle(1, &dropped));
    assert!(matches!(array.draw_plan(), Err(Error::InvalidParameter(_))));

    array.push_vertex_buffer(VertexBuffer::new(16, VertexBufferLayout::new(Vec::new()), tracked_handle(2, &dropped)));
    assert!(matches!(array.draw_plan(), Err(Error::InvalidParameter(_))));
}

#[test]
fn test_replaced_index_buffer_is_returned() {
    let dropped = Rc::new(RefCell::new(Vec::new()));
    let mut array = VertexArray::new(tracked_handle(1, &dropped));

    assert!(array.replace_index_buffer(IndexBuffer::new(3, DataType::UnsignedInt, tracked_handle(2, &dropped))).is_none());
    let previous = array.replace_index_buffer(IndexBuffer::new(3, DataType::UnsignedByte, tracked_handle(3, &dropped)));
    assert_eq!(previous.map(|ib| ib.serial()), Some(2));
    assert_eq!(*dropped.borrow(), vec![2]);
}

#[test]
fn test_buffers_drop_before_array() {
    let dropped = Rc::new(RefCell::new(Vec::new()));
    let mut array = VertexArray::new(tracked_handle(1, &dropped));
    array.push_vertex_buffer(VertexBuffer::new(12, position_layout(), tracked_handle(2, &dropped)));
    array.replace_index_buffer(IndexBuffer::new(3, DataType::UnsignedShort, tracked_handle(3, &dropped)));

    drop(array);
    assert_eq!(*dropped.borrow(), vec![2, 3, 1]);
}
