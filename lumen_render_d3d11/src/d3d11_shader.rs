/// Shader - HLSL compilation, reflection and `$Globals` constant buffers
///
/// Both stages use `main` as entry point. Loose uniforms of each stage live in
/// the compiler-generated `$Globals` cbuffer: the program reflects its layout,
/// keeps a CPU copy and uploads it before a draw when it changed. Named
/// cbuffers are uniform blocks, mapped to engine binding points.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::rc::Rc;

use lumen_render::lumen::render::{
    Backend, NativeHandle, ResourceKind, ShaderStage, UniformBinding, UniformId, UniformValue,
};
use lumen_render::lumen::{Error, Result};
use lumen_render::{engine_debug, engine_err, engine_error, engine_warn};
use rustc_hash::FxHashMap;
use windows::core::{s, Interface, PCSTR};
use windows::Win32::Graphics::Direct3D::Fxc::{
    D3DCompile, D3DReflect, D3DCOMPILE_DEBUG, D3DCOMPILE_ENABLE_STRICTNESS,
    D3DCOMPILE_OPTIMIZATION_LEVEL3, D3DCOMPILE_SKIP_OPTIMIZATION,
};
use windows::Win32::Graphics::Direct3D::{ID3DBlob, D3D_SIT_CBUFFER};
use windows::Win32::Graphics::Direct3D11::*;

use crate::d3d11_constants::{constant_range, write_uniform};
use crate::d3d11_context::{driver_error, D3dContext};
use crate::d3d11_format::shader_target;

const VERTEX: usize = 0;
const FRAGMENT: usize = 1;

fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()) }
}

// ===== STAGE =====

/// Compiled stage bytecode, alive only while the program is created
#[derive(Debug)]
pub struct D3dShaderStage {
    ctx: Rc<D3dContext>,
    blob: ID3DBlob,
}

impl D3dShaderStage {
    /// Compile one stage with `D3DCompile`, returning the error blob as the log
    pub fn compile(ctx: &Rc<D3dContext>, stage: ShaderStage, source: &str, debug: bool) -> Result<Self> {
        let flags = D3DCOMPILE_ENABLE_STRICTNESS
            | if debug {
                D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
            } else {
                D3DCOMPILE_OPTIMIZATION_LEVEL3
            };

        let mut code = None;
        let mut errors = None;
        let result = unsafe {
            D3DCompile(
                source.as_ptr() as *const c_void,
                source.len(),
                PCSTR::null(),
                None,
                None,
                s!("main"),
                shader_target(stage),
                flags,
                0,
                &mut code,
                Some(&mut errors),
            )
        };

        match (result, code) {
            (Ok(()), Some(blob)) => {
                ctx.track(ResourceKind::ShaderStage);
                Ok(Self {
                    ctx: Rc::clone(ctx),
                    blob,
                })
            }
            (result, _) => {
                let log = match (&errors, result) {
                    (Some(blob), _) => String::from_utf8_lossy(blob_bytes(blob)).into_owned(),
                    (None, Err(e)) => e.to_string(),
                    (None, Ok(())) => "compiler returned no bytecode".to_string(),
                };
                engine_error!("lumen::d3d11", "{} shader compilation failed:\n{}", stage, log.trim_end());
                Err(Error::ShaderCompilation { stage, log })
            }
        }
    }

    pub fn bytecode(&self) -> &[u8] {
        blob_bytes(&self.blob)
    }
}

impl Drop for D3dShaderStage {
    fn drop(&mut self) {
        self.ctx.untrack(ResourceKind::ShaderStage);
    }
}

// ===== REFLECTION =====

/// One loose uniform inside `$Globals`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariable {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

/// Constant buffers declared by one stage
#[derive(Debug, Clone, Default)]
pub struct StageReflection {
    /// Register of `$Globals`, when the stage has loose uniforms
    pub globals_slot: Option<u32>,
    pub globals: Vec<GlobalVariable>,
    /// Initial `$Globals` contents, with declared default values
    pub globals_defaults: Vec<u8>,
    /// Named cbuffers and their registers
    pub blocks: Vec<(String, u32)>,
}

impl StageReflection {
    fn global(&self, name: &str) -> Option<(usize, usize)> {
        self.globals
            .iter()
            .find(|variable| variable.name == name)
            .map(|variable| (variable.offset, variable.size))
    }

    fn block_slot(&self, name: &str) -> Option<u32> {
        self.blocks.iter().find(|(block, _)| block == name).map(|(_, slot)| *slot)
    }
}

fn reflect(bytecode: &[u8]) -> Result<StageReflection> {
    let reflection: ID3D11ShaderReflection = unsafe {
        let mut raw = std::ptr::null_mut();
        D3DReflect(
            bytecode.as_ptr() as *const c_void,
            bytecode.len(),
            &ID3D11ShaderReflection::IID,
            &mut raw,
        )
        .map_err(|e| driver_error("Failed to reflect shader", e))?;
        ID3D11ShaderReflection::from_raw(raw)
    };

    let mut result = StageReflection::default();
    unsafe {
        let mut shader_desc = D3D11_SHADER_DESC::default();
        reflection
            .GetDesc(&mut shader_desc)
            .map_err(|e| driver_error("Failed to read shader description", e))?;

        for index in 0..shader_desc.BoundResources {
            let mut bind_desc = D3D11_SHADER_INPUT_BIND_DESC::default();
            if reflection.GetResourceBindingDesc(index, &mut bind_desc).is_err()
                || bind_desc.Type != D3D_SIT_CBUFFER
            {
                continue;
            }
            let name = bind_desc.Name.to_string().unwrap_or_default();
            if name == "$Globals" {
                result.globals_slot = Some(bind_desc.BindPoint);
            } else {
                result.blocks.push((name, bind_desc.BindPoint));
            }
        }

        if result.globals_slot.is_some() {
            if let Some(globals) = reflection.GetConstantBufferByName(s!("$Globals")) {
                let mut buffer_desc = D3D11_SHADER_BUFFER_DESC::default();
                globals
                    .GetDesc(&mut buffer_desc)
                    .map_err(|e| driver_error("Failed to read $Globals", e))?;
                result.globals_defaults = vec![0u8; buffer_desc.Size as usize];

                for index in 0..buffer_desc.Variables {
                    let Some(variable) = globals.GetVariableByIndex(index) else {
                        continue;
                    };
                    let mut variable_desc = D3D11_SHADER_VARIABLE_DESC::default();
                    if variable.GetDesc(&mut variable_desc).is_err() {
                        continue;
                    }
                    let offset = variable_desc.StartOffset as usize;
                    let size = variable_desc.Size as usize;
                    if !variable_desc.DefaultValue.is_null() && offset + size <= result.globals_defaults.len() {
                        let defaults = std::slice::from_raw_parts(variable_desc.DefaultValue as *const u8, size);
                        result.globals_defaults[offset..offset + size].copy_from_slice(defaults);
                    }
                    result.globals.push(GlobalVariable {
                        name: variable_desc.Name.to_string().unwrap_or_default(),
                        offset,
                        size,
                    });
                }
            }
        }
    }
    Ok(result)
}

// ===== PROGRAM =====

/// Uniform buffer currently attached to a binding point
#[derive(Debug, Clone)]
pub struct BoundUniform {
    pub serial: u64,
    pub binding: UniformBinding,
    pub buffer: ID3D11Buffer,
    /// Byte width of the whole buffer
    pub width: u64,
}

#[derive(Debug)]
struct StageConstants {
    slot: u32,
    buffer: ID3D11Buffer,
    shadow: RefCell<Vec<u8>>,
    dirty: Cell<bool>,
}

#[derive(Debug, Clone)]
struct UniformSlot {
    name: String,
    /// (offset, size) in each stage's `$Globals`
    locations: [Option<(usize, usize)>; 2],
}

#[derive(Debug, Clone)]
struct BlockBinding {
    name: String,
    point: u32,
    slots: [Option<u32>; 2],
}

fn create_globals_buffer(ctx: &D3dContext, reflection: &StageReflection) -> Result<Option<StageConstants>> {
    let Some(slot) = reflection.globals_slot else {
        return Ok(None);
    };
    let shadow = reflection.globals_defaults.clone();
    let desc = D3D11_BUFFER_DESC {
        ByteWidth: shadow.len().max(16) as u32,
        Usage: D3D11_USAGE_DEFAULT,
        BindFlags: D3D11_BIND_CONSTANT_BUFFER.0 as u32,
        CPUAccessFlags: 0,
        MiscFlags: 0,
        StructureByteStride: 0,
    };
    let mut buffer = None;
    unsafe {
        ctx.device
            .CreateBuffer(&desc, None, Some(&mut buffer))
            .map_err(|e| driver_error("Failed to create $Globals buffer", e))?;
    }
    let buffer = buffer.ok_or_else(|| engine_err!("lumen::d3d11", "CreateBuffer returned no $Globals buffer"))?;
    Ok(Some(StageConstants {
        slot,
        buffer,
        shadow: RefCell::new(shadow),
        dirty: Cell::new(true),
    }))
}

/// Vertex + pixel shader pair with its reflected constant buffers
#[derive(Debug)]
pub struct D3dProgram {
    ctx: Rc<D3dContext>,
    vertex_shader: ID3D11VertexShader,
    pixel_shader: ID3D11PixelShader,
    /// Kept for input-layout validation
    vertex_bytecode: Vec<u8>,
    serial: u64,
    reflection: [StageReflection; 2],
    constants: [Option<StageConstants>; 2],
    uniforms: RefCell<Vec<UniformSlot>>,
    blocks: RefCell<Vec<BlockBinding>>,
}

impl D3dProgram {
    /// Create the shader objects and reflect both stages
    pub fn link(ctx: &Rc<D3dContext>, vertex: &D3dShaderStage, fragment: &D3dShaderStage) -> Result<Self> {
        let link_error = |what: &str, e: windows::core::Error| {
            let log = format!("{}: {}", what, e);
            engine_error!("lumen::d3d11", "Shader link failed:\n{}", log);
            Error::ShaderLink { log }
        };

        let mut vertex_shader = None;
        let mut pixel_shader = None;
        unsafe {
            ctx.device
                .CreateVertexShader(vertex.bytecode(), None, Some(&mut vertex_shader))
                .map_err(|e| link_error("CreateVertexShader", e))?;
            ctx.device
                .CreatePixelShader(fragment.bytecode(), None, Some(&mut pixel_shader))
                .map_err(|e| link_error("CreatePixelShader", e))?;
        }
        let (Some(vertex_shader), Some(pixel_shader)) = (vertex_shader, pixel_shader) else {
            return Err(engine_err!("lumen::d3d11", "Shader creation returned no object"));
        };

        let reflection = [reflect(vertex.bytecode())?, reflect(fragment.bytecode())?];
        let constants = [
            create_globals_buffer(ctx, &reflection[VERTEX])?,
            create_globals_buffer(ctx, &reflection[FRAGMENT])?,
        ];

        let serial = ctx.track(ResourceKind::Shader);
        engine_debug!(
            "lumen::d3d11",
            "Shader #{} created ({} + {} globals)",
            serial,
            reflection[VERTEX].globals.len(),
            reflection[FRAGMENT].globals.len()
        );
        Ok(Self {
            ctx: Rc::clone(ctx),
            vertex_shader,
            pixel_shader,
            vertex_bytecode: vertex.bytecode().to_vec(),
            serial,
            reflection,
            constants,
            uniforms: RefCell::new(Vec::new()),
            blocks: RefCell::new(Vec::new()),
        })
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn vertex_bytecode(&self) -> &[u8] {
        &self.vertex_bytecode
    }

    /// Make both stages current
    pub fn bind(&self) {
        let context = &self.ctx.context;
        unsafe {
            context.VSSetShader(&self.vertex_shader, None);
            context.PSSetShader(&self.pixel_shader, None);
        }
    }

    /// Resolve a loose uniform by name in either stage
    pub fn uniform_id(&self, name: &str) -> Option<UniformId> {
        let mut uniforms = self.uniforms.borrow_mut();
        if let Some(index) = uniforms.iter().position(|slot| slot.name == name) {
            return Some(UniformId::new(index as u64));
        }

        let locations = [self.reflection[VERTEX].global(name), self.reflection[FRAGMENT].global(name)];
        if locations.iter().all(Option::is_none) {
            engine_warn!("lumen::d3d11", "Uniform '{}' not found in shader #{}", name, self.serial);
            return None;
        }
        uniforms.push(UniformSlot {
            name: name.to_string(),
            locations,
        });
        Some(UniformId::new((uniforms.len() - 1) as u64))
    }

    /// Write a value into the CPU copy of every stage declaring the uniform
    pub fn set_uniform(&self, id: UniformId, value: &UniformValue) -> Result<()> {
        let uniforms = self.uniforms.borrow();
        let slot = uniforms.get(id.raw() as usize).ok_or_else(|| {
            let err = Error::InvalidParameter(format!("Uniform id {} out of range", id.raw()));
            engine_error!("lumen::d3d11", "{}", err);
            err
        })?;

        for (location, constants) in slot.locations.iter().zip(&self.constants) {
            let (Some((offset, size)), Some(constants)) = (location, constants) else {
                continue;
            };
            if !write_uniform(&mut constants.shadow.borrow_mut(), *offset, *size, value) {
                let err = Error::InvalidParameter(format!(
                    "{:?} does not fit uniform '{}' ({} bytes)",
                    value.structure(),
                    slot.name,
                    size
                ));
                engine_error!("lumen::d3d11", "{}", err);
                return Err(err);
            }
            constants.dirty.set(true);
        }
        Ok(())
    }

    /// Map a named cbuffer to an engine binding point
    pub fn bind_uniform_block(&self, block: &str, binding_point: u32) -> bool {
        let slots = [
            self.reflection[VERTEX].block_slot(block),
            self.reflection[FRAGMENT].block_slot(block),
        ];
        if slots.iter().all(Option::is_none) {
            engine_warn!("lumen::d3d11", "Uniform block '{}' not found in shader #{}", block, self.serial);
            return false;
        }

        let mut blocks = self.blocks.borrow_mut();
        blocks.retain(|binding| binding.name != block);
        blocks.push(BlockBinding {
            name: block.to_string(),
            point: binding_point,
            slots,
        });
        true
    }

    /// Upload changed `$Globals` and bind every constant buffer the stages read
    pub fn apply_constants(&self, bound: &FxHashMap<u32, BoundUniform>) {
        let context = &self.ctx.context;
        for (stage, constants) in self.constants.iter().enumerate() {
            let Some(constants) = constants else {
                continue;
            };
            if constants.dirty.replace(false) {
                let shadow = constants.shadow.borrow();
                unsafe {
                    context.UpdateSubresource(&constants.buffer, 0, None, shadow.as_ptr() as *const c_void, 0, 0);
                }
            }
            self.set_constant_buffer(stage, constants.slot, &constants.buffer, None);
        }

        for block in self.blocks.borrow().iter() {
            let Some(uniform) = bound.get(&block.point) else {
                continue;
            };
            let binding = uniform.binding;
            let range = (binding.offset != 0 || binding.size < uniform.width)
                .then(|| constant_range(binding.offset, binding.size));
            for (stage, slot) in block.slots.iter().enumerate() {
                if let Some(slot) = slot {
                    self.set_constant_buffer(stage, *slot, &uniform.buffer, range);
                }
            }
        }
    }

    fn set_constant_buffer(&self, stage: usize, slot: u32, buffer: &ID3D11Buffer, range: Option<(u32, u32)>) {
        let buffers = [Some(buffer.clone())];
        unsafe {
            match (range, &self.ctx.context1) {
                (Some((first, count)), Some(context1)) => {
                    let first = [first];
                    let count = [count];
                    if stage == VERTEX {
                        context1.VSSetConstantBuffers1(slot, 1, Some(buffers.as_ptr()), Some(first.as_ptr()), Some(count.as_ptr()));
                    } else {
                        context1.PSSetConstantBuffers1(slot, 1, Some(buffers.as_ptr()), Some(first.as_ptr()), Some(count.as_ptr()));
                    }
                }
                // Without 11.1 ranges fall back to the whole buffer
                _ => {
                    if stage == VERTEX {
                        self.ctx.context.VSSetConstantBuffers(slot, Some(&buffers));
                    } else {
                        self.ctx.context.PSSetConstantBuffers(slot, Some(&buffers));
                    }
                }
            }
        }
    }
}

/// Shader handle; the renderer keeps another reference while the program is current
#[derive(Debug)]
pub struct D3dShader {
    pub(crate) program: Rc<D3dProgram>,
}

impl NativeHandle for D3dShader {
    fn backend(&self) -> Backend {
        Backend::D3D11
    }

    fn raw_id(&self) -> u64 {
        self.program.vertex_shader.as_raw() as u64
    }

    fn serial(&self) -> u64 {
        self.program.serial
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for D3dProgram {
    fn drop(&mut self) {
        self.ctx.untrack(ResourceKind::Shader);
    }
}
