/// Descriptor trait - resources bindable into a descriptor set
///
/// A descriptor produces the write payload for one binding. Buffer-backed
/// handlers implement their own write paths inside DescriptorHandler; this
/// trait covers standalone resources such as sampled images.

use std::sync::Arc;

use crate::renderer::{Texture, SamplerType, DescriptorType, WriteDescriptor, WritePayload};

/// A resource that can be written into one descriptor binding
pub trait Descriptor {
    /// Build the descriptor write for the given binding slot
    fn write_descriptor(&self, binding: u32, descriptor_type: DescriptorType) -> WriteDescriptor;
}

/// A texture sampled through a fixed sampler
pub struct SampledImage {
    texture: Arc<dyn Texture>,
    sampler: SamplerType,
}

impl SampledImage {
    pub fn new(texture: Arc<dyn Texture>, sampler: SamplerType) -> Self {
        Self { texture, sampler }
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    /// Swap the underlying texture, keeping the sampler
    pub fn set_texture(&mut self, texture: Arc<dyn Texture>) {
        self.texture = texture;
    }

    pub fn sampler(&self) -> SamplerType {
        self.sampler
    }
}

impl Descriptor for SampledImage {
    fn write_descriptor(&self, binding: u32, descriptor_type: DescriptorType) -> WriteDescriptor {
        WriteDescriptor {
            binding,
            descriptor_type,
            payload: WritePayload::Image {
                texture: self.texture.clone(),
                sampler: self.sampler,
            },
        }
    }
}
