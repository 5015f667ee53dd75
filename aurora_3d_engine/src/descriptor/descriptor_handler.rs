/// DescriptorHandler - per-frame descriptor set state machine
///
/// Owns one descriptor set per frame in flight for a single set slot of a
/// pipeline. Resource pushes accumulate named writes and raise a dirty
/// flag per frame slot; `update` applies the pending writes for the
/// current frame only, so sets still read by in-flight GPU work are never
/// touched. A pipeline identity change tears down and reallocates every
/// frame's set.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::error::{Result, Error};
use crate::renderer::{
    Renderer, Pipeline, CommandList, DescriptorSet,
    WriteDescriptor, WritePayload, MAX_FRAMES_IN_FLIGHT,
};
use crate::buffers::{UniformHandler, StorageHandler, PushHandler};
use crate::descriptor::Descriptor;
use crate::engine_bail;

/// Outcome of one `update` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The current frame's set is written and ready to bind
    Ready,
    /// The pipeline changed; all frame sets were reallocated and the
    /// caller must skip drawing this frame
    Rebuilt,
}

impl UpdateStatus {
    pub fn is_rebuilt(&self) -> bool {
        matches!(self, UpdateStatus::Rebuilt)
    }
}

pub struct DescriptorHandler {
    renderer: Arc<Mutex<dyn Renderer>>,
    set_index: u32,
    pipeline: Option<Arc<dyn Pipeline>>,
    /// One set per frame in flight, allocated on pipeline bind
    descriptor_sets: Vec<Arc<dyn DescriptorSet>>,
    /// Current write per descriptor name
    descriptors: FxHashMap<String, WriteDescriptor>,
    /// Frame slots whose set still holds stale writes
    pending: [bool; MAX_FRAMES_IN_FLIGHT],
    updated_once: bool,
}

impl DescriptorHandler {
    /// Create a handler with no pipeline bound yet
    ///
    /// The first `update` call allocates the per-frame descriptor sets.
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, set_index: u32) -> Self {
        Self {
            renderer,
            set_index,
            pipeline: None,
            descriptor_sets: Vec::new(),
            descriptors: FxHashMap::default(),
            pending: [false; MAX_FRAMES_IN_FLIGHT],
            updated_once: false,
        }
    }

    /// The pipeline this handler is currently built against
    pub fn pipeline(&self) -> Option<&Arc<dyn Pipeline>> {
        self.pipeline.as_ref()
    }

    /// The descriptor set for one frame slot, if allocated
    pub fn descriptor_set(&self, frame: usize) -> Option<&Arc<dyn DescriptorSet>> {
        self.descriptor_sets.get(frame)
    }

    /// Stage a uniform handler's buffer at the named binding
    ///
    /// Drives the handler against the pipeline's reflected block for
    /// `name`, flushes its staging contents, and records the buffer
    /// write. All frame slots are marked pending when the handler
    /// rebuilt its buffer or the name is new.
    ///
    /// No-op until a pipeline is bound by `update`.
    ///
    /// # Errors
    ///
    /// Fails if the name is not a descriptor binding of the pipeline.
    pub fn push_uniform(&mut self, name: &str, handler: &mut UniformHandler) -> Result<()> {
        let Some(pipeline) = self.pipeline.clone() else {
            return Ok(());
        };

        let Some(block) = pipeline.reflection().block(name) else {
            engine_bail!("aurora3d::DescriptorHandler",
                "push(\"{}\"): pipeline has no uniform block with that name", name);
        };

        let status = handler.update(Some(block))?;
        handler.flush()?;

        let buffer = handler.buffer().ok_or_else(|| {
            crate::engine_err!("aurora3d::DescriptorHandler",
                "push(\"{}\"): handler has no backing buffer after update", name)
        })?.clone();

        let range = buffer.size();
        self.push_write(name, &pipeline, WritePayload::Buffer {
            buffer,
            offset: 0,
            range,
        }, status.is_rebuilt())
    }

    /// Stage a storage handler's buffer at the named binding
    ///
    /// Same contract as `push_uniform` for storage blocks.
    pub fn push_storage(&mut self, name: &str, handler: &mut StorageHandler) -> Result<()> {
        let Some(pipeline) = self.pipeline.clone() else {
            return Ok(());
        };

        let Some(block) = pipeline.reflection().block(name) else {
            engine_bail!("aurora3d::DescriptorHandler",
                "push(\"{}\"): pipeline has no storage block with that name", name);
        };

        let status = handler.update(Some(block))?;
        handler.flush()?;

        let buffer = handler.buffer().ok_or_else(|| {
            crate::engine_err!("aurora3d::DescriptorHandler",
                "push(\"{}\"): handler has no backing buffer after update", name)
        })?.clone();

        let range = buffer.size();
        self.push_write(name, &pipeline, WritePayload::Buffer {
            buffer,
            offset: 0,
            range,
        }, status.is_rebuilt())
    }

    /// Stage a standalone descriptor (sampled image) at the named binding
    ///
    /// Frame slots are marked pending when the name is new or the
    /// resource handle differs from the previous push.
    pub fn push_descriptor(&mut self, name: &str, descriptor: &dyn Descriptor) -> Result<()> {
        let Some(pipeline) = self.pipeline.clone() else {
            return Ok(());
        };

        let binding = Self::find_binding(&pipeline, name)?;
        let write = descriptor.write_descriptor(binding.0, binding.1);
        let payload = write.payload.clone();
        self.push_write(name, &pipeline, payload, false)?;
        Ok(())
    }

    /// Drive a push constant handler against the pipeline's push block
    ///
    /// Push constants live in command buffer state, not descriptor sets,
    /// so this never touches the pending flags.
    pub fn push_constants(&mut self, handler: &mut PushHandler) -> Result<()> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(());
        };

        handler.update(pipeline.reflection().push_constant())?;
        Ok(())
    }

    fn find_binding(
        pipeline: &Arc<dyn Pipeline>,
        name: &str,
    ) -> Result<(u32, crate::renderer::DescriptorType)> {
        let binding = pipeline.reflection().binding(name).ok_or_else(|| {
            crate::engine_err!("aurora3d::DescriptorHandler",
                "Descriptor binding \"{}\" not found in pipeline", name)
        })?;
        Ok((binding.binding, binding.descriptor_type))
    }

    fn push_write(
        &mut self,
        name: &str,
        pipeline: &Arc<dyn Pipeline>,
        payload: WritePayload,
        rebuilt: bool,
    ) -> Result<()> {
        let (binding, descriptor_type) = Self::find_binding(pipeline, name)?;

        let changed = rebuilt
            || match self.descriptors.get(name) {
                Some(existing) => !existing.payload.same_resources(&payload),
                None => true,
            };

        self.descriptors.insert(name.to_string(), WriteDescriptor {
            binding,
            descriptor_type,
            payload,
        });

        if changed {
            self.pending = [true; MAX_FRAMES_IN_FLIGHT];
        }

        Ok(())
    }

    /// Reconcile the handler with the pipeline for this frame
    ///
    /// A pipeline identity change (pointer inequality) clears all staged
    /// writes, reallocates one descriptor set per frame in flight, and
    /// returns `Rebuilt`; the caller must re-push its resources and skip
    /// drawing until the next frame. Otherwise, if this frame's slot has
    /// pending writes they are applied to its set in one batched backend
    /// call, and `Ready` is returned.
    pub fn update(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        frame: usize,
    ) -> Result<UpdateStatus> {
        debug_assert!(frame < MAX_FRAMES_IN_FLIGHT, "frame index out of range");
        self.updated_once = true;

        let same_pipeline = self
            .pipeline
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, pipeline));

        if !same_pipeline {
            self.pipeline = Some(pipeline.clone());
            self.descriptors.clear();

            let renderer = self.renderer.lock().map_err(|_| {
                Error::BackendError("Renderer lock poisoned".to_string())
            })?;
            let mut sets = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                sets.push(renderer.create_descriptor_set(pipeline, self.set_index)?);
            }
            self.descriptor_sets = sets;
            self.pending = [true; MAX_FRAMES_IN_FLIGHT];

            return Ok(UpdateStatus::Rebuilt);
        }

        if self.pending[frame] && !self.descriptors.is_empty() {
            let mut writes: Vec<WriteDescriptor> =
                self.descriptors.values().cloned().collect();
            writes.sort_by_key(|write| write.binding);

            let renderer = self.renderer.lock().map_err(|_| {
                Error::BackendError("Renderer lock poisoned".to_string())
            })?;
            renderer.update_descriptor_set(&self.descriptor_sets[frame], &writes)?;
            self.pending[frame] = false;
        }

        Ok(UpdateStatus::Ready)
    }

    /// Bind this frame's descriptor set for subsequent draws
    ///
    /// Must be preceded by `update` in the same frame.
    pub fn bind_descriptors(&self, cmd: &mut dyn CommandList, frame: usize) -> Result<()> {
        debug_assert!(self.updated_once, "bind_descriptors called before update");

        let Some(pipeline) = &self.pipeline else {
            engine_bail!("aurora3d::DescriptorHandler",
                "bind_descriptors: no pipeline bound");
        };
        let Some(set) = self.descriptor_sets.get(frame) else {
            engine_bail!("aurora3d::DescriptorHandler",
                "bind_descriptors: no descriptor set for frame {}", frame);
        };

        cmd.bind_descriptor_set(pipeline, set)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "descriptor_handler_tests.rs"]
mod tests;
