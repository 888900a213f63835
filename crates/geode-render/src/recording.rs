//! A backend that records every call, for headless runs and tests.

use rustc_hash::FxHashMap;

use crate::{BufferHandle, GraphicsBackend, PrimitiveType, RenderError, TextureHandle, UniformValue};

/// One call issued against a [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCommand {
    CreateVertexBuffer { buffer: BufferHandle, bytes: usize },
    CreateIndexBuffer { buffer: BufferHandle, count: u32 },
    CreateTexture { texture: TextureHandle, width: u32, height: u32 },
    DeleteBuffer { buffer: BufferHandle },
    DeleteTexture { texture: TextureHandle },
    BindVertexBuffer { slot: u32, buffer: BufferHandle },
    BindIndexBuffer { buffer: BufferHandle },
    BindTexture { unit: u32, texture: TextureHandle },
    SetUniform { name: String, value: UniformValue },
    DrawIndexed { primitive: PrimitiveType, count: u32 },
}

/// Bound state captured when a draw was issued.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub primitive: PrimitiveType,
    pub count: u32,
    pub texture: Option<TextureHandle>,
    pub uniforms: FxHashMap<String, UniformValue>,
}

impl DrawRecord {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

#[derive(Debug)]
enum Resource {
    Vertex { bytes: usize },
    Index { count: u32 },
}

/// Validates handles like a real backend would and keeps a command log.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_handle: u64,
    buffers: FxHashMap<BufferHandle, Resource>,
    textures: FxHashMap<TextureHandle, (u32, u32)>,
    commands: Vec<RecordedCommand>,
    draws: Vec<DrawRecord>,
    bound_index: Option<(BufferHandle, u32)>,
    bound_texture: Option<TextureHandle>,
    uniforms: FxHashMap<String, UniformValue>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn vertex_buffer_bytes(&self, buffer: BufferHandle) -> Option<usize> {
        match self.buffers.get(&buffer) {
            Some(Resource::Vertex { bytes }) => Some(*bytes),
            _ => None,
        }
    }

    /// Drop the log of a finished frame. Resources and bindings persist.
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferHandle, RenderError> {
        let buffer = BufferHandle(self.allocate());
        self.buffers.insert(buffer, Resource::Vertex { bytes: data.len() });
        self.commands.push(RecordedCommand::CreateVertexBuffer {
            buffer,
            bytes: data.len(),
        });
        tracing::trace!(label, ?buffer, bytes = data.len(), "created vertex buffer");
        Ok(buffer)
    }

    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> Result<BufferHandle, RenderError> {
        let buffer = BufferHandle(self.allocate());
        let count = indices.len() as u32;
        self.buffers.insert(buffer, Resource::Index { count });
        self.commands.push(RecordedCommand::CreateIndexBuffer { buffer, count });
        tracing::trace!(label, ?buffer, count, "created index buffer");
        Ok(buffer)
    }

    fn create_texture(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureHandle, RenderError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RenderError::TextureSize {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        let texture = TextureHandle(self.allocate());
        self.textures.insert(texture, (width, height));
        self.commands.push(RecordedCommand::CreateTexture {
            texture,
            width,
            height,
        });
        tracing::trace!(label, ?texture, width, height, "created texture");
        Ok(texture)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            if self.bound_index.is_some_and(|(bound, _)| bound == buffer) {
                self.bound_index = None;
            }
            self.commands.push(RecordedCommand::DeleteBuffer { buffer });
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            if self.bound_texture == Some(texture) {
                self.bound_texture = None;
            }
            self.commands.push(RecordedCommand::DeleteTexture { texture });
        }
    }

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle) -> Result<(), RenderError> {
        match self.buffers.get(&buffer) {
            Some(Resource::Vertex { .. }) => {}
            _ => return Err(RenderError::UnknownBuffer(buffer)),
        }
        self.commands.push(RecordedCommand::BindVertexBuffer { slot, buffer });
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) -> Result<(), RenderError> {
        let Some(Resource::Index { count }) = self.buffers.get(&buffer) else {
            return Err(RenderError::UnknownBuffer(buffer));
        };
        self.bound_index = Some((buffer, *count));
        self.commands.push(RecordedCommand::BindIndexBuffer { buffer });
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> Result<(), RenderError> {
        if !self.textures.contains_key(&texture) {
            return Err(RenderError::UnknownTexture(texture));
        }
        self.bound_texture = Some(texture);
        self.commands.push(RecordedCommand::BindTexture { unit, texture });
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.uniforms.insert(name.to_owned(), value);
        self.commands.push(RecordedCommand::SetUniform {
            name: name.to_owned(),
            value,
        });
    }

    fn draw_indexed(&mut self, primitive: PrimitiveType, count: u32) -> Result<(), RenderError> {
        let (_, available) = self.bound_index.ok_or(RenderError::NoIndexBuffer)?;
        if count > available {
            return Err(RenderError::IndexRange {
                requested: count,
                available,
            });
        }
        self.commands.push(RecordedCommand::DrawIndexed { primitive, count });
        self.draws.push(DrawRecord {
            primitive,
            count,
            texture: self.bound_texture,
            uniforms: self.uniforms.clone(),
        });
        Ok(())
    }
}
