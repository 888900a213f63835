//! The seams between the level-of-detail engine and its host: an abstract
//! graphics backend, the view, and the per-frame draw context.

mod backend;
mod draw_context;
mod error;
mod recording;
mod view;

pub use backend::{BufferHandle, GraphicsBackend, PrimitiveType, TextureHandle, UniformValue};
pub use draw_context::DrawContext;
pub use error::RenderError;
pub use recording::{DrawRecord, RecordedCommand, RecordingBackend};
pub use view::{LookAtView, View, Viewport};
