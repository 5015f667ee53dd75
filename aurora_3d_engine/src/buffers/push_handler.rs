/// PushHandler - staging area for a push constant block
///
/// Owns no GPU buffer. The staging buffer itself is the payload,
/// uploaded directly into command buffer state at draw time.

use crate::error::Result;
use crate::renderer::{CommandList, UniformBlock};
use crate::buffers::HandlerStatus;
use crate::engine_bail;

pub struct PushHandler {
    block: Option<UniformBlock>,
    data: Vec<u8>,
}

impl PushHandler {
    /// Create a handler with no block bound yet
    pub fn new() -> Self {
        Self {
            block: None,
            data: Vec::new(),
        }
    }

    /// The block this handler is currently built against
    pub fn block(&self) -> Option<&UniformBlock> {
        self.block.as_ref()
    }

    /// Staged payload bytes (tests and debugging)
    pub fn data(&self) -> &[u8] {
        &self.data
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
    pub fn push_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let block = match &self.block {
            Some(block) => block,
            None => {
                engine_bail!("aurora3d::PushHandler",
                    "push(\"{}\"): no push constant block bound, call update first", name);
            }
        };

        let uniform = block.find_uniform(name).ok_or_else(|| {
            crate::engine_err!("aurora3d::PushHandler",
                "Uniform \"{}\" not found in push constant block", name)
        })?;

        if bytes.len() > uniform.size as usize {
            engine_bail!("aurora3d::PushHandler",
                "push(\"{}\"): value size {} exceeds reflected field size {}",
                name, bytes.len(), uniform.size);
        }

        let offset = uniform.offset as usize;
        let end = offset + bytes.len();
        if end > self.data.len() {
            engine_bail!("aurora3d::PushHandler",
                "push(\"{}\"): field range {}..{} exceeds payload size {}",
                name, offset, end, self.data.len());
        }

        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Resize the payload if the block shape changed
    pub fn update(&mut self, block: Option<&UniformBlock>) -> Result<HandlerStatus> {
        if self.block.as_ref() == block {
            return Ok(HandlerStatus::Unchanged);
        }

        self.block = block.cloned();
        match &self.block {
            Some(block) => self.data = vec![0u8; block.size as usize],
            None => self.data.clear(),
        }

        Ok(HandlerStatus::Rebuilt)
    }

    /// Upload the payload as push constants
    ///
    /// Issued with the block's reflected stage flags and size. Must be
    /// recorded after the owning pipeline is bound.
    pub fn bind(&self, cmd: &mut dyn CommandList) -> Result<()> {
        let block = match &self.block {
            Some(block) => block,
            None => {
                engine_bail!("aurora3d::PushHandler",
                    "bind: no push constant block bound");
            }
        };

        cmd.push_constants(block.stage_flags, 0, &self.data)
    }
}

impl Default for PushHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "push_handler_tests.rs"]
mod tests;
