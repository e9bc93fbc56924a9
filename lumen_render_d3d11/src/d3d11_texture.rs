/// Texture - Direct3D 11 2D texture, shader view and sampler

use std::any::Any;
use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

use lumen_render::lumen::render::{
    Backend, NativeHandle, ResourceKind, Texture2DDesc, TextureFilter, TextureWrapMode,
};
use lumen_render::lumen::{Error, Result};
use lumen_render::{engine_err, engine_error};
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D::D3D_SRV_DIMENSION_TEXTURE2D;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::DXGI_SAMPLE_DESC;

use crate::d3d11_context::{driver_error, D3dContext};
use crate::d3d11_format::{address_mode, sampler_filter, texture_formats};
use crate::d3d11_upload::{repack_pixels, upload_layout};

/// Sampler state for a wrap/filter combination
fn create_sampler(
    ctx: &D3dContext,
    wrap: (TextureWrapMode, TextureWrapMode),
    filter: (TextureFilter, TextureFilter),
) -> Result<ID3D11SamplerState> {
    let (d3d_filter, uses_mips) = sampler_filter(filter.0, filter.1);
    let desc = D3D11_SAMPLER_DESC {
        Filter: d3d_filter,
        AddressU: address_mode(wrap.0),
        AddressV: address_mode(wrap.1),
        AddressW: D3D11_TEXTURE_ADDRESS_WRAP,
        MipLODBias: 0.0,
        MaxAnisotropy: 1,
        ComparisonFunc: D3D11_COMPARISON_NEVER,
        BorderColor: [0.0; 4],
        MinLOD: 0.0,
        MaxLOD: if uses_mips { f32::MAX } else { 0.0 },
    };
    let mut sampler = None;
    unsafe {
        ctx.device
            .CreateSamplerState(&desc, Some(&mut sampler))
            .map_err(|e| driver_error("Failed to create sampler state", e))?;
    }
    sampler.ok_or_else(|| engine_err!("lumen::d3d11", "CreateSamplerState returned no sampler"))
}

/// Direct3D 11 texture
///
/// Each texture owns its sampler, rebuilt whenever wrap or filter state changes.
#[derive(Debug)]
pub struct D3dTexture {
    ctx: Rc<D3dContext>,
    texture: ID3D11Texture2D,
    pub(crate) view: ID3D11ShaderResourceView,
    sampler: RefCell<ID3D11SamplerState>,
    serial: u64,
}

impl D3dTexture {
    /// Upload a validated descriptor: level 0, generated mips, then the sampler
    pub fn create(ctx: &Rc<D3dContext>, desc: &Texture2DDesc<'_>, unpack_alignment: u32) -> Result<Self> {
        let unsupported = || {
            let err = Error::UnsupportedFormat(format!(
                "{} texture with {} data has no Direct3D 11 equivalent",
                desc.format, desc.data_type
            ));
            engine_error!("lumen::d3d11", "{}", err);
            err
        };
        let layout = upload_layout(desc.format, desc.data_type).ok_or_else(unsupported)?;
        let formats = texture_formats(desc.format, desc.data_type).ok_or_else(unsupported)?;

        let (mip_levels, bind_flags, misc_flags) = if layout.mipmaps {
            (
                0,
                D3D11_BIND_SHADER_RESOURCE.0 | D3D11_BIND_RENDER_TARGET.0,
                D3D11_RESOURCE_MISC_GENERATE_MIPS.0,
            )
        } else {
            (1, D3D11_BIND_SHADER_RESOURCE.0, 0)
        };
        let texture_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.width,
            Height: desc.height,
            MipLevels: mip_levels,
            ArraySize: 1,
            Format: formats.texture,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: bind_flags as u32,
            CPUAccessFlags: 0,
            MiscFlags: misc_flags as u32,
        };

        let mut texture = None;
        unsafe {
            ctx.device
                .CreateTexture2D(&texture_desc, None, Some(&mut texture))
                .map_err(|e| driver_error("Failed to create texture", e))?;
        }
        let texture = texture.ok_or_else(|| engine_err!("lumen::d3d11", "CreateTexture2D returned no texture"))?;

        let view_desc = D3D11_SHADER_RESOURCE_VIEW_DESC {
            Format: formats.view,
            ViewDimension: D3D_SRV_DIMENSION_TEXTURE2D,
            Anonymous: D3D11_SHADER_RESOURCE_VIEW_DESC_0 {
                Texture2D: D3D11_TEX2D_SRV {
                    MostDetailedMip: 0,
                    MipLevels: u32::MAX,
                },
            },
        };
        let mut view = None;
        unsafe {
            ctx.device
                .CreateShaderResourceView(&texture, Some(&view_desc as *const _), Some(&mut view))
                .map_err(|e| driver_error("Failed to create shader resource view", e))?;
        }
        let view = view.ok_or_else(|| engine_err!("lumen::d3d11", "CreateShaderResourceView returned no view"))?;

        if let Some(data) = desc.data {
            let (pixels, row_pitch) = repack_pixels(data, desc.width, desc.height, unpack_alignment, &layout);
            unsafe {
                ctx.context
                    .UpdateSubresource(&texture, 0, None, pixels.as_ptr() as *const c_void, row_pitch, 0);
                if layout.mipmaps {
                    ctx.context.GenerateMips(&view);
                }
            }
        }

        let sampler = create_sampler(ctx, (desc.wrap_x, desc.wrap_y), (desc.min_filter, desc.mag_filter))?;
        let serial = ctx.track(ResourceKind::Texture);
        Ok(Self {
            ctx: Rc::clone(ctx),
            texture,
            view,
            sampler: RefCell::new(sampler),
            serial,
        })
    }

    /// Bind view and sampler to pixel-shader slot `unit`
    pub fn bind(&self, unit: u32) {
        let context = &self.ctx.context;
        unsafe {
            context.PSSetShaderResources(unit, Some(&[Some(self.view.clone())]));
            context.PSSetSamplers(unit, Some(&[Some(self.sampler.borrow().clone())]));
        }
    }

    /// Replace the sampler with one for the given state
    pub fn rebuild_sampler(
        &self,
        wrap: (TextureWrapMode, TextureWrapMode),
        filter: (TextureFilter, TextureFilter),
    ) -> Result<()> {
        let sampler = create_sampler(&self.ctx, wrap, filter)?;
        *self.sampler.borrow_mut() = sampler;
        Ok(())
    }
}

impl NativeHandle for D3dTexture {
    fn backend(&self) -> Backend {
        Backend::D3D11
    }

    fn raw_id(&self) -> u64 {
        self.texture.as_raw() as u64
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

impl Drop for D3dTexture {
    fn drop(&mut self) {
        self.ctx.untrack(ResourceKind::Texture);
    }
}
