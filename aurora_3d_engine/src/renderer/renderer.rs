/// Renderer trait - main rendering factory interface

use std::sync::Arc;
use winit::window::Window;

use crate::error::Result;
use crate::renderer::{
    Buffer, Texture, Shader, Pipeline, CommandList, DescriptorSet,
    RenderPass, RenderTarget, Framebuffer, Swapchain,
    BufferDesc, TextureDesc, ShaderDesc, PipelineDesc,
    RenderPassDesc, FramebufferDesc, WriteDescriptor,
};

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Aurora3D Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct RendererStats {
    /// Number of draw calls this frame
    pub draw_calls: u32,
    /// Number of triangles drawn this frame
    pub triangles: u32,
    /// GPU memory used (bytes)
    pub gpu_memory_used: u64,
}

// ============================================================================
// Renderer trait
// ============================================================================

/// Main renderer trait
///
/// This is the central factory interface for creating GPU resources.
/// Implemented by backend-specific renderers (e.g., VulkanRenderer).
pub trait Renderer: Send + Sync {
    /// Create a texture
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a buffer
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a shader
    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a graphics pipeline
    ///
    /// The pipeline carries the merged shader reflection, which drives
    /// uniform and descriptor handler validation.
    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a command list for recording rendering commands
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Create a render pass from an abstract description
    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create a render target view over one layer/mip of a texture
    ///
    /// # Errors
    ///
    /// Fails if the texture usage is not renderable or the layer/mip is
    /// out of range.
    fn create_render_target_texture(
        &self,
        texture: &dyn Texture,
        layer: u32,
        mip_level: u32,
    ) -> Result<Arc<dyn RenderTarget>>;

    /// Create a framebuffer binding render targets to a render pass
    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Allocate a descriptor set for one set slot of a pipeline
    ///
    /// The set layout is taken from the pipeline reflection. The returned
    /// set is empty; fill it with `update_descriptor_set`.
    fn create_descriptor_set(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
    ) -> Result<Arc<dyn DescriptorSet>>;

    /// Write a batch of resource bindings into a descriptor set
    ///
    /// All writes are applied in one backend call. The set must not be
    /// in use by in-flight GPU work.
    fn update_descriptor_set(
        &self,
        set: &Arc<dyn DescriptorSet>,
        writes: &[WriteDescriptor],
    ) -> Result<()>;

    /// Create a swapchain for a window
    fn create_swapchain(&self, window: &Window) -> Result<Box<dyn Swapchain>>;

    /// Submit recorded command lists to the GPU
    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()>;

    /// Submit recorded command lists and present a swapchain image
    fn submit_with_swapchain(
        &self,
        commands: &[&dyn CommandList],
        swapchain: &dyn Swapchain,
        image_index: u32,
    ) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    /// Get statistics about the renderer
    fn stats(&self) -> RendererStats;

    /// Notify renderer that the window has been resized
    fn resize(&mut self, width: u32, height: u32);
}
