/// Shader program descriptor, uniform ids and uniform values

use std::fmt;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::error::Result;
use crate::renderer::{downcast_handle, Backend, ElementStructure, NativeHandle};

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// A linked GPU program (vertex + fragment stage)
///
/// Released when dropped or passed to `Renderer::delete_shaders`.
#[derive(Debug)]
pub struct Shader {
    handle: Box<dyn NativeHandle>,
}

impl Shader {
    /// Wrap a backend program handle
    pub fn new(handle: Box<dyn NativeHandle>) -> Self {
        Self { handle }
    }

    pub fn backend(&self) -> Backend {
        self.handle.backend()
    }

    pub fn serial(&self) -> u64 {
        self.handle.serial()
    }

    pub fn handle(&self) -> &dyn NativeHandle {
        self.handle.as_ref()
    }

    /// Backend-side program, or `InvalidResource` if it belongs to another backend
    pub fn native<T: 'static>(&self) -> Result<&T> {
        downcast_handle(self.handle.as_ref(), "Shader")
    }
}

/// Location of a named uniform inside one shader program
///
/// The raw value is backend-defined (GL uniform location, offset into the D3D11
/// `$Globals` buffer, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformId(u64);

impl UniformId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Value written to a plain (non-block) uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    UInt(u32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn structure(&self) -> ElementStructure {
        match self {
            UniformValue::Float(_) | UniformValue::UInt(_) | UniformValue::Int(_) => {
                ElementStructure::Scalar
            }
            UniformValue::Vec2(_) => ElementStructure::Vec2,
            UniformValue::Vec3(_) => ElementStructure::Vec3,
            UniformValue::Vec4(_) => ElementStructure::Vec4,
            UniformValue::Mat3(_) => ElementStructure::Mat3,
            UniformValue::Mat4(_) => ElementStructure::Mat4,
        }
    }

    /// Tightly packed bytes, matrices in column-major order
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::UInt(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Mat3(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
            UniformValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::UInt(_) => "uint",
            UniformValue::Int(_) => "int",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Mat3(_) => "mat3",
            UniformValue::Mat4(_) => "mat4",
        }
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
