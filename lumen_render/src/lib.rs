/*!
# Lumen Render

Core traits and types for the Lumen rendering layer.

This crate provides the backend-agnostic API: application code talks to the
[`Renderer`](lumen::Renderer) trait and never to a graphics driver directly.
Backend crates (`lumen_render_opengl`, `lumen_render_d3d11`) implement the trait.

## Architecture

- **Renderer**: one trait covering shaders, textures, buffers, vertex arrays and draws
- **Resource descriptors**: `Shader`, `Texture2D`, `VertexBuffer`, `IndexBuffer`,
  `UniformBuffer`, `VertexArray`, each wrapping an opaque backend handle
- **VertexBufferLayout**: byte offsets and stride of one vertex record
- **Engine**: renderer singleton and process-wide logger
- **MockRenderer** (feature `mock`): CPU-only backend for tests
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod renderer;

// Main lumen namespace module
pub mod lumen {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Backend contract
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{format_plain, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }
}

// Re-export math library at crate root
pub use glam;
