/// DescriptorSet trait and descriptor write payloads
///
/// A DescriptorSet is a mutable set of GPU resource bindings owned by a
/// DescriptorHandler. Unlike an immutable bind group, its contents are
/// rewritten in place between frames through
/// `Renderer::update_descriptor_set`, batched into one backend call.
/// One set is allocated per frame in flight so rewrites never race GPU
/// work that still reads the previous contents.

use std::sync::Arc;
use crate::renderer::{Buffer, Texture, SamplerType, DescriptorType};

/// A descriptor set allocated for one set slot of a pipeline
pub trait DescriptorSet: Send + Sync {
    /// The set index this descriptor set was allocated for
    fn set_index(&self) -> u32;
}

/// Resource payload for one descriptor write
#[derive(Clone)]
pub enum WritePayload {
    /// Buffer region binding (uniform or storage)
    Buffer {
        buffer: Arc<dyn Buffer>,
        offset: u64,
        range: u64,
    },
    /// Sampled image binding
    Image {
        texture: Arc<dyn Texture>,
        sampler: SamplerType,
    },
}

impl WritePayload {
    /// Returns true if both payloads reference the same GPU resources
    ///
    /// Identity is pointer equality on the resource handles; contents are
    /// not compared.
    pub fn same_resources(&self, other: &WritePayload) -> bool {
        match (self, other) {
            (
                WritePayload::Buffer { buffer: a, offset: ao, range: ar },
                WritePayload::Buffer { buffer: b, offset: bo, range: br },
            ) => Arc::ptr_eq(a, b) && ao == bo && ar == br,
            (
                WritePayload::Image { texture: a, sampler: sa },
                WritePayload::Image { texture: b, sampler: sb },
            ) => Arc::ptr_eq(a, b) && sa == sb,
            _ => false,
        }
    }
}

/// One resource binding to write into a descriptor set
#[derive(Clone)]
pub struct WriteDescriptor {
    /// Binding number within the set
    pub binding: u32,
    /// Descriptor type at this binding
    pub descriptor_type: DescriptorType,
    /// The resource to bind
    pub payload: WritePayload,
}
