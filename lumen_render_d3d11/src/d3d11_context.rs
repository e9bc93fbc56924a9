/// D3dContext - Device and immediate context shared by all Direct3D 11 objects

use std::fmt;

use lumen_render::engine_err;
use lumen_render::engine_error;
use lumen_render::lumen::render::{ResourceCounter, ResourceKind};
use lumen_render::lumen::Error;
use windows::Win32::Foundation::E_OUTOFMEMORY;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D11::{ID3D11Device, ID3D11DeviceContext, ID3D11DeviceContext1};

/// Log a failed device call and convert it, keeping out-of-memory distinct
pub fn driver_error(what: &str, error: windows::core::Error) -> Error {
    if error.code() == E_OUTOFMEMORY {
        engine_error!("lumen::d3d11", "{}: out of memory", what);
        return Error::OutOfMemory;
    }
    engine_err!("lumen::d3d11", "{}: {}", what, error)
}

/// Shared Direct3D 11 device for all resources.
pub struct D3dContext {
    pub device: ID3D11Device,

    /// Immediate context; every call is made on the renderer's thread
    pub context: ID3D11DeviceContext,

    /// Direct3D 11.1 interface, needed for constant buffer ranges
    pub context1: Option<ID3D11DeviceContext1>,

    /// Live-object counts and resource serials
    pub counter: ResourceCounter,
}

impl D3dContext {
    pub fn new(device: ID3D11Device, context: ID3D11DeviceContext) -> Self {
        let context1 = context.cast::<ID3D11DeviceContext1>().ok();
        Self {
            device,
            context,
            context1,
            counter: ResourceCounter::default(),
        }
    }

    pub fn track(&self, kind: ResourceKind) -> u64 {
        self.counter.acquire(kind)
    }

    pub fn untrack(&self, kind: ResourceKind) {
        self.counter.release(kind);
    }
}

impl fmt::Debug for D3dContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("D3dContext")
            .field("live", &self.counter.snapshot())
            .finish_non_exhaustive()
    }
}
