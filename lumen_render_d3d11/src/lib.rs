/*!
# Lumen Render - Direct3D 11 backend

Implements [`Renderer`](lumen_render::lumen::Renderer) on top of Direct3D 11
through the `windows` crate. Shaders are HLSL (Shader Model 5.0, entry point
`main`); vertex inputs use the semantic `ATTRIB` indexed by attribute location.

The backend only builds on Windows; on other targets the crate is empty apart
from its platform-independent upload helpers.

```no_run
# #[cfg(windows)]
# fn demo(window: &winit::window::Window) -> lumen_render::lumen::Result<()> {
use lumen_render::lumen::render::Config;
use lumen_render::lumen::{Engine, Renderer};
use lumen_render_d3d11::D3D11Renderer;

Engine::initialize()?;
let mut renderer = D3D11Renderer::new(window, Config::default())?;
renderer.initialize()?;
Engine::create_renderer(renderer)?;
# Ok(())
# }
```
*/

#[cfg_attr(not(windows), allow(dead_code))]
mod d3d11_constants;
#[cfg_attr(not(windows), allow(dead_code))]
mod d3d11_upload;

#[cfg(windows)]
mod d3d11;
#[cfg(windows)]
mod d3d11_buffer;
#[cfg(windows)]
mod d3d11_context;
#[cfg(windows)]
mod d3d11_format;
#[cfg(windows)]
mod d3d11_shader;
#[cfg(windows)]
mod d3d11_texture;
#[cfg(windows)]
mod d3d11_vertex_array;
#[cfg(windows)]
mod debug;

#[cfg(windows)]
pub use d3d11::D3D11Renderer;
#[cfg(windows)]
pub use debug::print_validation_stats_report;
