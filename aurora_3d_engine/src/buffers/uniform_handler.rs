/// UniformHandler - staging area for one shader uniform block
///
/// Accumulates named field writes in a CPU staging buffer and owns the
/// GPU uniform buffer backing the block. The buffer is valid for exactly
/// one block shape; `update` reallocates it when the shape changes and
/// never otherwise.

use std::sync::{Arc, Mutex};

use crate::error::{Result, Error};
use crate::renderer::{Renderer, Buffer, BufferDesc, BufferUsage, UniformBlock};
use crate::buffers::HandlerStatus;
use crate::engine_bail;

pub struct UniformHandler {
    renderer: Arc<Mutex<dyn Renderer>>,
    block: Option<UniformBlock>,
    staging: Vec<u8>,
    buffer: Option<Arc<dyn Buffer>>,
}

impl UniformHandler {
    /// Create a handler with no block bound yet
    ///
    /// The first `update` call with a block allocates the GPU buffer.
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>) -> Self {
        Self {
            renderer,
            block: None,
            staging: Vec::new(),
            buffer: None,
        }
    }

    /// The block this handler is currently built against
    pub fn block(&self) -> Option<&UniformBlock> {
        self.block.as_ref()
    }

    /// The GPU buffer backing the block, if one is allocated
    pub fn buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.buffer.as_ref()
    }

    /// Staging buffer contents (tests and debugging)
    pub fn staging(&self) -> &[u8] {
        &self.staging
    }

    /// Write one typed value at the named field's reflected offset
    ///
    /// # Errors
    ///
    /// Fails if no block is bound, the name is not a member of the block,
    /// or the value size does not match the reflected field size.
    pub fn push<T: bytemuck::Pod>(&mut self, name: &str, value: &T) -> Result<()> {
        self.push_bytes(name, bytemuck::bytes_of(value))
    }

    /// Write raw bytes at the named field's reflected offset
    ///
    /// The byte length may be smaller than the reflected field size
    /// (partial write of an array member) but never larger.
    pub fn push_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let block = match &self.block {
            Some(block) => block,
            None => {
                engine_bail!("aurora3d::UniformHandler",
                    "push(\"{}\"): no uniform block bound, call update first", name);
            }
        };

        let uniform = block.find_uniform(name).ok_or_else(|| {
            crate::engine_err!("aurora3d::UniformHandler",
                "Uniform \"{}\" not found in block", name)
        })?;

        if bytes.len() > uniform.size as usize {
            engine_bail!("aurora3d::UniformHandler",
                "push(\"{}\"): value size {} exceeds reflected field size {}",
                name, bytes.len(), uniform.size);
        }

        let offset = uniform.offset as usize;
        let end = offset + bytes.len();
        if end > self.staging.len() {
            engine_bail!("aurora3d::UniformHandler",
                "push(\"{}\"): field range {}..{} exceeds staging buffer size {}",
                name, offset, end, self.staging.len());
        }

        self.staging[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Rebuild the backing buffer if the block shape changed
    ///
    /// Returns `Rebuilt` when the passed block differs by value from the
    /// currently held one; the staging buffer is resized and zeroed and a
    /// fresh GPU buffer is allocated. Returns `Unchanged` otherwise with
    /// the buffer handle untouched.
    pub fn update(&mut self, block: Option<&UniformBlock>) -> Result<HandlerStatus> {
        if self.block.as_ref() == block {
            return Ok(HandlerStatus::Unchanged);
        }

        self.block = block.cloned();

        match &self.block {
            Some(block) => {
                let size = block.size as u64;
                self.staging = vec![0u8; block.size as usize];
                let mut renderer = self.renderer.lock().map_err(|_| {
                    Error::BackendError("Renderer lock poisoned".to_string())
                })?;
                self.buffer = Some(renderer.create_buffer(BufferDesc {
                    size,
                    usage: BufferUsage::Uniform,
                })?);
            }
            None => {
                self.staging.clear();
                self.buffer = None;
            }
        }

        Ok(HandlerStatus::Rebuilt)
    }

    /// Upload the staging buffer to the GPU buffer
    ///
    /// Called once per frame after all pushes, before the draw that reads
    /// the block.
    pub fn flush(&self) -> Result<()> {
        if let Some(buffer) = &self.buffer {
            buffer.update(0, &self.staging)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "uniform_handler_tests.rs"]
mod tests;
