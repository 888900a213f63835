//! Abstract graphics operations issued by terrain and imagery rendering.

use glam::{DVec3, Mat4, Vec2, Vec3, Vec4};

use crate::RenderError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveType {
    Triangles,
    TriangleStrip,
    Lines,
}

/// A value for a named shader uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v.to_array())
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v.to_array())
    }
}

/// Narrows to single precision; callers keep large magnitudes out of uniforms.
impl From<DVec3> for UniformValue {
    fn from(v: DVec3) -> Self {
        Self::Vec3(v.as_vec3().to_array())
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v.to_array())
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::Mat4(m.to_cols_array())
    }
}

/// Graphics calls the engine issues. Implementations own the actual API.
///
/// Vertex data arrives as raw bytes of tightly packed `f32` components.
pub trait GraphicsBackend {
    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferHandle, RenderError>;

    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> Result<BufferHandle, RenderError>;

    /// Upload an RGBA8 image.
    fn create_texture(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureHandle, RenderError>;

    /// Release a buffer. Unknown handles are ignored.
    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn delete_texture(&mut self, texture: TextureHandle);

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle) -> Result<(), RenderError>;

    fn bind_index_buffer(&mut self, buffer: BufferHandle) -> Result<(), RenderError>;

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> Result<(), RenderError>;

    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn draw_indexed(&mut self, primitive: PrimitiveType, count: u32) -> Result<(), RenderError>;
}
