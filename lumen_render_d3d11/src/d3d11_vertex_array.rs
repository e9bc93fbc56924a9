/// Vertex array - attribute description and per-shader input layouts
///
/// D3D11 has no vertex array object. The array records one input element per
/// attribute location (semantic `ATTRIB<location>`, one input slot per vertex
/// buffer) and builds an input layout lazily for each shader it is drawn with.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use lumen_render::lumen::render::{Backend, NativeHandle, ResourceKind, VertexBufferLayout};
use lumen_render::lumen::{Error, Result};
use lumen_render::{engine_err, engine_error};
use rustc_hash::FxHashMap;
use windows::core::s;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11InputLayout, D3D11_INPUT_ELEMENT_DESC, D3D11_INPUT_PER_VERTEX_DATA,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT;

use crate::d3d11_context::{driver_error, D3dContext};
use crate::d3d11_format::attribute_format;
use crate::d3d11_shader::D3dProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputElement {
    location: u32,
    format: DXGI_FORMAT,
    slot: u32,
    offset: u32,
}

/// Direct3D 11 vertex array
#[derive(Debug)]
pub struct D3dVertexArray {
    ctx: Rc<D3dContext>,
    serial: u64,
    elements: RefCell<Vec<InputElement>>,
    /// Input layouts keyed by shader serial
    layouts: RefCell<FxHashMap<u64, ID3D11InputLayout>>,
}

impl D3dVertexArray {
    pub fn create(ctx: &Rc<D3dContext>) -> Self {
        let serial = ctx.track(ResourceKind::VertexArray);
        Self {
            ctx: Rc::clone(ctx),
            serial,
            elements: RefCell::new(Vec::new()),
            layouts: RefCell::new(FxHashMap::default()),
        }
    }

    /// Describe the attributes of a buffer read from input `slot`
    ///
    /// Mat3/Mat4 elements take one location per column. Returns the next free
    /// location; nothing is recorded when an attribute has no DXGI format.
    pub fn add_buffer(&self, layout: &VertexBufferLayout, slot: u32, first_location: u32) -> Result<u32> {
        let mut added = Vec::new();
        let mut location = first_location;

        for (element, offset) in layout.iter() {
            let components = element.structure.column_component_count();
            let format = attribute_format(element.data_type, components, element.normalized).ok_or_else(|| {
                let err = Error::UnsupportedFormat(format!(
                    "{} x {} vertex attribute has no Direct3D 11 format",
                    components, element.data_type
                ));
                engine_error!("lumen::d3d11", "{}", err);
                err
            })?;
            let column_bytes = components * element.data_type.byte_size();

            for column in 0..element.structure.location_span() {
                added.push(InputElement {
                    location,
                    format,
                    slot,
                    offset: offset + column * column_bytes,
                });
                location += 1;
            }
        }

        self.elements.borrow_mut().extend(added);
        self.layouts.borrow_mut().clear();
        Ok(location)
    }

    /// Input layout matching `program`'s vertex signature
    pub fn input_layout(&self, program: &D3dProgram) -> Result<ID3D11InputLayout> {
        if let Some(layout) = self.layouts.borrow().get(&program.serial()) {
            return Ok(layout.clone());
        }

        let descs: Vec<D3D11_INPUT_ELEMENT_DESC> = self
            .elements
            .borrow()
            .iter()
            .map(|element| D3D11_INPUT_ELEMENT_DESC {
                SemanticName: s!("ATTRIB"),
                SemanticIndex: element.location,
                Format: element.format,
                InputSlot: element.slot,
                AlignedByteOffset: element.offset,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            })
            .collect();

        let mut layout = None;
        unsafe {
            self.ctx
                .device
                .CreateInputLayout(&descs, program.vertex_bytecode(), Some(&mut layout))
                .map_err(|e| {
                    driver_error(
                        &format!("Input layout of vertex array #{} rejected by shader #{}", self.serial, program.serial()),
                        e,
                    )
                })?;
        }
        let layout = layout.ok_or_else(|| engine_err!("lumen::d3d11", "CreateInputLayout returned no layout"))?;
        self.layouts.borrow_mut().insert(program.serial(), layout.clone());
        Ok(layout)
    }
}

impl NativeHandle for D3dVertexArray {
    fn backend(&self) -> Backend {
        Backend::D3D11
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

impl Drop for D3dVertexArray {
    fn drop(&mut self) {
        self.ctx.untrack(ResourceKind::VertexArray);
    }
}
