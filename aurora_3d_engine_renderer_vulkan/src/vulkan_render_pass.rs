/// RenderPass - Vulkan implementation of the RenderPass trait

use aurora_3d_engine::aurora3d::render::RenderPass as RendererRenderPass;
use ash::vk;

/// Vulkan render pass implementation
pub struct RenderPass {
    /// Vulkan render pass handle
    pub(crate) render_pass: vk::RenderPass,
    /// Number of color attachments written by each subpass.
    /// Pipeline creation needs this to size the blend attachment state.
    pub(crate) subpass_color_counts: Vec<u32>,
    /// Vulkan device (for cleanup)
    pub(crate) device: ash::Device,
}

impl RendererRenderPass for RenderPass {}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
