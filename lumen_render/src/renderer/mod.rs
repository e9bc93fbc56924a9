/// Renderer module - all rendering-related types and traits

// Module declarations
pub mod data_type;
pub mod buffer_layout;
pub mod debug;
pub mod resource;
pub mod shader;
pub mod texture;
pub mod buffer;
pub mod vertex_array;
pub mod renderer;

#[cfg(any(test, feature = "mock"))]
pub mod mock_renderer;

// Re-export everything from renderer.rs
pub use renderer::*;

// Re-export from other modules
pub use data_type::*;
pub use buffer_layout::*;
pub use debug::*;
pub use resource::*;
pub use shader::*;
pub use texture::*;
pub use buffer::*;
pub use vertex_array::*;

#[cfg(any(test, feature = "mock"))]
pub use mock_renderer::{MockHandle, MockRenderer};
