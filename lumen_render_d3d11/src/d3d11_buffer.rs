/// Buffer - Direct3D 11 buffer behind vertex, index and uniform buffers

use std::any::Any;
use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

use lumen_render::engine_err;
use lumen_render::lumen::render::{Backend, NativeHandle, ResourceKind};
use lumen_render::lumen::Result;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D11::{
    ID3D11Buffer, D3D11_BIND_CONSTANT_BUFFER, D3D11_BIND_FLAG, D3D11_BIND_INDEX_BUFFER,
    D3D11_BIND_VERTEX_BUFFER, D3D11_BOX, D3D11_BUFFER_DESC, D3D11_SUBRESOURCE_DATA, D3D11_USAGE_DEFAULT,
};

use crate::d3d11_constants::constant_buffer_width;
use crate::d3d11_context::{driver_error, D3dContext};

fn bind_flag(kind: ResourceKind) -> D3D11_BIND_FLAG {
    match kind {
        ResourceKind::IndexBuffer => D3D11_BIND_INDEX_BUFFER,
        ResourceKind::UniformBuffer => D3D11_BIND_CONSTANT_BUFFER,
        _ => D3D11_BIND_VERTEX_BUFFER,
    }
}

/// Direct3D 11 buffer
///
/// Constant buffers cannot be partially updated on 11.0 devices, so uniform
/// buffers keep a CPU copy that is uploaded whole on every write.
#[derive(Debug)]
pub struct D3dBuffer {
    ctx: Rc<D3dContext>,
    pub(crate) buffer: ID3D11Buffer,
    kind: ResourceKind,
    serial: u64,
    shadow: Option<RefCell<Vec<u8>>>,
}

impl D3dBuffer {
    /// Allocate `size` bytes, optionally filled with `data`
    pub fn create(ctx: &Rc<D3dContext>, kind: ResourceKind, size: u64, data: Option<&[u8]>) -> Result<Self> {
        let (width, shadow) = if kind == ResourceKind::UniformBuffer {
            let width = constant_buffer_width(size);
            let mut shadow = vec![0u8; width as usize];
            if let Some(bytes) = data {
                shadow[..bytes.len()].copy_from_slice(bytes);
            }
            (width, Some(shadow))
        } else {
            // Zero-sized buffers are not allowed
            (size.max(1), None)
        };
        let width = u32::try_from(width)
            .map_err(|_| engine_err!("lumen::d3d11", "{:?} of {} bytes exceeds the D3D11 size range", kind, size))?;

        let desc = D3D11_BUFFER_DESC {
            ByteWidth: width,
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: bind_flag(kind).0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        let initial_bytes = match (&shadow, data) {
            (Some(shadow), _) => Some(shadow.as_slice()),
            (None, Some(bytes)) if !bytes.is_empty() => Some(bytes),
            _ => None,
        };
        let initial = initial_bytes.map(|bytes| D3D11_SUBRESOURCE_DATA {
            pSysMem: bytes.as_ptr() as *const c_void,
            SysMemPitch: 0,
            SysMemSlicePitch: 0,
        });

        let mut buffer = None;
        unsafe {
            ctx.device
                .CreateBuffer(
                    &desc,
                    initial.as_ref().map(|init| init as *const D3D11_SUBRESOURCE_DATA),
                    Some(&mut buffer),
                )
                .map_err(|e| driver_error(&format!("Failed to create {:?}", kind), e))?;
        }
        let buffer = buffer.ok_or_else(|| engine_err!("lumen::d3d11", "CreateBuffer returned no {:?}", kind))?;

        let serial = ctx.track(kind);
        Ok(Self {
            ctx: Rc::clone(ctx),
            buffer,
            kind,
            serial,
            shadow: shadow.map(RefCell::new),
        })
    }

    /// Overwrite `data.len()` bytes at `offset`
    ///
    /// Callers validate the range against the declared size first.
    pub fn write(&self, offset: u64, data: &[u8]) {
        let context = &self.ctx.context;
        match &self.shadow {
            Some(shadow) => {
                let mut shadow = shadow.borrow_mut();
                let start = offset as usize;
                shadow[start..start + data.len()].copy_from_slice(data);
                unsafe {
                    context.UpdateSubresource(&self.buffer, 0, None, shadow.as_ptr() as *const c_void, 0, 0);
                }
            }
            None => {
                let region = D3D11_BOX {
                    left: offset as u32,
                    top: 0,
                    front: 0,
                    right: (offset + data.len() as u64) as u32,
                    bottom: 1,
                    back: 1,
                };
                unsafe {
                    context.UpdateSubresource(&self.buffer, 0, Some(&region as *const D3D11_BOX), data.as_ptr() as *const c_void, 0, 0);
                }
            }
        }
    }
}

impl NativeHandle for D3dBuffer {
    fn backend(&self) -> Backend {
        Backend::D3D11
    }

    fn raw_id(&self) -> u64 {
        self.buffer.as_raw() as u64
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

impl Drop for D3dBuffer {
    fn drop(&mut self) {
        // The COM reference is released with the field
        self.ctx.untrack(self.kind);
    }
}
