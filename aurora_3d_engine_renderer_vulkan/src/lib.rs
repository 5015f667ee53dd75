/*!
# Aurora 3D Engine - Vulkan Renderer Backend

Vulkan implementation of the Aurora 3D rendering traits.

Built on the Ash bindings with gpu-allocator for memory management and
spirq for SPIR-V reflection. Pipelines carry the merged reflection of
their shader stages, which the engine's uniform and descriptor handlers
consume to validate pushes and size GPU buffers.

Enable the `vulkan-validation` feature to compile in support for the
Khronos validation layers and the debug messenger callback.
*/

mod vulkan;
mod vulkan_context;
mod vulkan_texture;
mod vulkan_buffer;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_command_list;
mod vulkan_render_target;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_swapchain;
mod vulkan_descriptor_set;
mod vulkan_sampler;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan::VulkanRenderer;
pub use vulkan_swapchain::Swapchain as VulkanSwapchain;
pub use vulkan_pipeline::Pipeline as VulkanPipeline;
pub use vulkan_command_list::CommandList as VulkanCommandList;
pub use vulkan_texture::Texture as VulkanTexture;
