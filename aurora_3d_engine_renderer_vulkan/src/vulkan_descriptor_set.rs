/// DescriptorSet - Vulkan implementation of the DescriptorSet trait

use aurora_3d_engine::aurora3d::render::DescriptorSet as RendererDescriptorSet;
use ash::vk;

/// Vulkan descriptor set implementation
///
/// Wraps a vk::DescriptorSet allocated from one of the renderer's pools.
/// The set is freed when its pool is destroyed; rewrites between frames
/// go through `Renderer::update_descriptor_set`.
pub struct DescriptorSet {
    /// Vulkan descriptor set handle
    pub(crate) descriptor_set: vk::DescriptorSet,
    /// The pipeline set slot this set was allocated for
    pub(crate) set_index: u32,
}

impl RendererDescriptorSet for DescriptorSet {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}
