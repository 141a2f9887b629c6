//! Fatal editor errors.
//!
//! Anything in here ends the session: the binary logs the error and exits with a
//! nonzero status. Recoverable failures (model import) have their own error type in
//! [`crate::importer`].

/// Errors that abort editor startup or the running session.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface has no supported formats")]
    NoSurfaceFormat,
    #[error("framebuffer '{label}' is incomplete: {reason}")]
    IncompleteFramebuffer { label: String, reason: String },
}

pub type Result<T> = std::result::Result<T, EditorError>;
