/*!
# Lumen - OpenGL Renderer Backend

OpenGL 3.3 core implementation of the lumen `Renderer` trait, built on glow.

The crate does not create windows or contexts: the application makes a GL
context current, hands its loader and a swap callback to `OpenGlRenderer`,
then registers the renderer with the engine.

```no_run
use lumen_render::lumen::render::Config;
use lumen_render::lumen::{Engine, Renderer};
use lumen_render_opengl::OpenGlRenderer;

# fn get_proc_address(_: &str) -> *const std::ffi::c_void { std::ptr::null() }
Engine::initialize()?;
let mut renderer = unsafe {
    OpenGlRenderer::from_loader(get_proc_address, Box::new(|| Ok(())), Config::default())
};
renderer.initialize()?;
Engine::create_renderer(renderer)?;
# Ok::<(), lumen_render::lumen::Error>(())
```
*/

mod opengl;
mod opengl_buffer;
mod opengl_context;
mod opengl_format;
mod opengl_shader;
mod opengl_texture;
mod opengl_vertex_array;
mod debug;

pub use opengl::{GlLimits, OpenGlRenderer, SwapFn};
pub use opengl_context::GlContext;

pub use debug::print_validation_stats_report;
