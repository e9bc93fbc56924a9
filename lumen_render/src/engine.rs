/// Lumen Engine - Singleton manager for the renderer and the logger
///
/// The renderer singleton is stored per thread: backends share an `Rc` to their
/// native context and never leave the thread that created them. The logger is
/// process-wide because driver debug callbacks may fire from any thread.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::renderer::Renderer;

const SOURCE: &str = "lumen::Engine";

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

thread_local! {
    /// Engine state of the rendering thread (`None` until `initialize`)
    static ENGINE_STATE: RefCell<Option<EngineState>> = const { RefCell::new(None) };
}

/// Internal state structure holding the engine singletons
#[derive(Default)]
struct EngineState {
    renderer: Option<Rc<RefCell<dyn Renderer>>>,
}

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use lumen_render::lumen::{Engine, Renderer};
/// use lumen_render::lumen::render::MockRenderer;
///
/// Engine::initialize()?;
/// Engine::create_renderer(MockRenderer::new())?;
///
/// let renderer = Engine::renderer()?;
/// renderer.borrow_mut().initialize()?;
///
/// Engine::shutdown();
/// # Ok::<(), lumen_render::lumen::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Log an engine error before handing it back to the caller
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!(SOURCE, "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!(SOURCE, "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!(SOURCE, "Engine error: {}", error);
            }
        }
        error
    }

    fn not_initialized() -> Error {
        Self::log_and_return_error(Error::InitializationFailed(
            "Engine not initialized. Call Engine::initialize() first.".to_string(),
        ))
    }

    /// Initialize the engine on the calling thread
    ///
    /// Idempotent: an existing state (and its renderer) is kept.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.with(|state| {
            let mut state = state.borrow_mut();
            if state.is_none() {
                *state = Some(EngineState::default());
                crate::engine_debug!(SOURCE, "Engine initialized");
            }
        });
        Ok(())
    }

    /// Whether `initialize` was called on this thread (and not undone by `shutdown`)
    pub fn is_initialized() -> bool {
        ENGINE_STATE.with(|state| state.borrow().is_some())
    }

    /// Shutdown the engine and destroy the renderer singleton
    ///
    /// After calling this, `initialize()` must be called again before creating a
    /// new renderer. Calling it twice is harmless.
    pub fn shutdown() {
        let state = ENGINE_STATE.with(|state| state.borrow_mut().take());
        if let Some(state) = state {
            // Renderer drops outside of the thread-local borrow
            drop(state);
            crate::engine_debug!(SOURCE, "Engine shut down");
        }
    }

    /// Create and register the renderer singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or a renderer already exists.
    pub fn create_renderer<R: Renderer + 'static>(renderer: R) -> Result<()> {
        let shared: Rc<RefCell<dyn Renderer>> = Rc::new(RefCell::new(renderer));
        let backend = shared.borrow().backend();
        Self::register_renderer(shared)?;
        crate::engine_info!(SOURCE, "Renderer singleton created ({})", backend);
        Ok(())
    }

    fn register_renderer(renderer: Rc<RefCell<dyn Renderer>>) -> Result<()> {
        ENGINE_STATE.with(|state| {
            let mut state = state.borrow_mut();
            let state = state.as_mut().ok_or_else(Self::not_initialized)?;
            if state.renderer.is_some() {
                return Err(Self::log_and_return_error(Error::InitializationFailed(
                    "Renderer already exists. Call Engine::destroy_renderer() first.".to_string(),
                )));
            }
            state.renderer = Some(renderer);
            Ok(())
        })
    }

    /// Get the renderer singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or no renderer was created.
    pub fn renderer() -> Result<Rc<RefCell<dyn Renderer>>> {
        ENGINE_STATE.with(|state| {
            let state = state.borrow();
            let state = state.as_ref().ok_or_else(Self::not_initialized)?;
            state.renderer.clone().ok_or_else(|| {
                Self::log_and_return_error(Error::InitializationFailed(
                    "Renderer not created. Call Engine::create_renderer() first.".to_string(),
                ))
            })
        })
    }

    /// Destroy the renderer singleton
    ///
    /// Clones handed out by `renderer()` stay valid until dropped.
    pub fn destroy_renderer() -> Result<()> {
        let renderer = ENGINE_STATE.with(|state| {
            let mut state = state.borrow_mut();
            let state = state.as_mut().ok_or_else(Self::not_initialized)?;
            Ok::<_, Error>(state.renderer.take())
        })?;

        if renderer.is_some() {
            drop(renderer);
            crate::engine_info!(SOURCE, "Renderer singleton destroyed");
        }
        Ok(())
    }

    /// Reset the engine state of the calling thread (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        Self::shutdown();
    }

    // ===== LOGGING API =====

    /// Replace the process-wide logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lumen_render::lumen::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = self::logger().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Log without source location
    ///
    /// Used by `engine_trace!` .. `engine_warn!`.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Log with file:line information
    ///
    /// Used by `engine_error!` and the `engine_err!` family.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
