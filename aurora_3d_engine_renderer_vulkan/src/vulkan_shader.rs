/// Shader - Vulkan implementation of the Shader trait
///
/// Carries the per-stage SPIR-V reflection extracted at creation time.
/// `create_pipeline` merges the vertex and fragment reflections into the
/// pipeline's `PipelineReflection`.

use aurora_3d_engine::aurora3d::render::{
    Shader as RendererShader, UniformBlock, ReflectedBinding,
};
use ash::vk;
use rustc_hash::FxHashMap;

/// Vulkan shader implementation
pub struct Shader {
    /// Vulkan shader module
    pub(crate) module: vk::ShaderModule,
    /// Shader stage
    pub(crate) stage: vk::ShaderStageFlags,
    /// Entry point name
    pub(crate) entry_point: String,
    /// Vulkan device (for cleanup)
    pub(crate) device: ash::Device,

    /// Named buffer blocks (uniform and storage) declared by this stage
    pub(crate) blocks: FxHashMap<String, UniformBlock>,
    /// Named descriptor bindings declared by this stage
    pub(crate) bindings: FxHashMap<String, ReflectedBinding>,
    /// Push constant block, if this stage declares one
    pub(crate) push_constant: Option<UniformBlock>,
}

impl RendererShader for Shader {}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
