/// Pipeline - Vulkan implementation of the Pipeline trait

use aurora_3d_engine::aurora3d::render::{Pipeline as RendererPipeline, PipelineReflection};
use ash::vk;

/// Vulkan pipeline implementation
///
/// Owns the pipeline, its layout, and the descriptor set layouts derived
/// from shader reflection. Descriptor set allocation downcasts to this
/// type to reach the layouts.
pub struct Pipeline {
    /// Vulkan graphics pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout (accessed internally for descriptor binding and push constants)
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// One descriptor set layout per set slot used by the shaders
    pub(crate) descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Vulkan device (for cleanup)
    pub(crate) device: ash::Device,
    /// Merged reflection data for all shader stages
    pub(crate) reflection: PipelineReflection,
}

impl RendererPipeline for Pipeline {
    fn reflection(&self) -> &PipelineReflection {
        &self.reflection
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
            for &layout in &self.descriptor_set_layouts {
                self.device.destroy_descriptor_set_layout(layout, None);
            }
        }
    }
}
