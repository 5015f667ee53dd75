/// StorageHandler - staging area for variable-length per-frame arrays
///
/// Backed by a fixed-maximum storage buffer so that per-frame array
/// growth (instance transforms, glyph quads) never reallocates. A push
/// that would exceed the maximum fails before any byte is written.

use std::sync::{Arc, Mutex};

use crate::error::{Result, Error};
use crate::renderer::{Renderer, Buffer, BufferDesc, BufferUsage, UniformBlock};
use crate::buffers::HandlerStatus;
use crate::engine_bail;

pub struct StorageHandler {
    renderer: Arc<Mutex<dyn Renderer>>,
    block: Option<UniformBlock>,
    staging: Vec<u8>,
    buffer: Option<Arc<dyn Buffer>>,
}

impl StorageHandler {
    /// Fixed size of the backing storage buffer (64 KiB)
    pub const MAX_SIZE: usize = 64 * 1024;

    /// Create a handler with no block bound yet
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

    /// Number of staged bytes for this frame
    pub fn size_bytes(&self) -> usize {
        self.staging.len()
    }

    /// Replace the staged contents with an entire typed array
    ///
    /// # Errors
    ///
    /// Fails without writing anything if the array's byte size exceeds
    /// `MAX_SIZE`.
    pub fn push_slice<T: bytemuck::Pod>(&mut self, data: &[T]) -> Result<()> {
        let bytes = bytemuck::cast_slice::<T, u8>(data);
        if bytes.len() > Self::MAX_SIZE {
            engine_bail!("aurora3d::StorageHandler",
                "push_slice: {} bytes exceeds storage buffer maximum {}",
                bytes.len(), Self::MAX_SIZE);
        }
        self.staging.clear();
        self.staging.extend_from_slice(bytes);
        Ok(())
    }

    /// Rebuild the backing buffer if the block shape changed
    ///
    /// The buffer is always allocated at `MAX_SIZE`; a shape change still
    /// reallocates so descriptor handlers rebind the fresh handle, and
    /// clears staged contents.
    pub fn update(&mut self, block: Option<&UniformBlock>) -> Result<HandlerStatus> {
        if self.block.as_ref() == block {
            return Ok(HandlerStatus::Unchanged);
        }

        self.block = block.cloned();
        self.staging.clear();

        match &self.block {
            Some(_) => {
                let mut renderer = self.renderer.lock().map_err(|_| {
                    Error::BackendError("Renderer lock poisoned".to_string())
                })?;
                self.buffer = Some(renderer.create_buffer(BufferDesc {
                    size: Self::MAX_SIZE as u64,
                    usage: BufferUsage::Storage,
                })?);
            }
            None => {
                self.buffer = None;
            }
        }

        Ok(HandlerStatus::Rebuilt)
    }

    /// Upload the staged bytes to the GPU buffer
    pub fn flush(&self) -> Result<()> {
        if let Some(buffer) = &self.buffer {
            if !self.staging.is_empty() {
                buffer.update(0, &self.staging)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "storage_handler_tests.rs"]
mod tests;
