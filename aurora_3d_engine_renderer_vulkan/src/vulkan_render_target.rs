/// RenderTarget - Vulkan implementation of the RenderTarget trait

use aurora_3d_engine::aurora3d::render::{RenderTarget as RendererRenderTarget, TextureFormat};
use ash::vk;

/// Vulkan render target implementation
///
/// Wraps an image view over either one layer/mip of an offscreen texture
/// (owned, destroyed on drop) or a swapchain image (borrowed).
pub struct RenderTarget {
    width: u32,
    height: u32,
    format: TextureFormat,
    /// Vulkan image view
    pub(crate) image_view: vk::ImageView,
    /// Vulkan device for cleanup (None for swapchain targets)
    device: Option<ash::Device>,
    /// Whether this target owns the image view
    owns_image_view: bool,
}

impl RenderTarget {
    /// Render target over a swapchain image (image view not owned)
    pub(crate) fn new_swapchain_target(
        width: u32,
        height: u32,
        format: TextureFormat,
        image_view: vk::ImageView,
    ) -> Self {
        Self {
            width,
            height,
            format,
            image_view,
            device: None,
            owns_image_view: false,
        }
    }

    /// Render target over one layer/mip of an offscreen texture (image view owned)
    pub(crate) fn new_texture_target(
        width: u32,
        height: u32,
        format: TextureFormat,
        image_view: vk::ImageView,
        device: ash::Device,
    ) -> Self {
        Self {
            width,
            height,
            format,
            image_view,
            device: Some(device),
            owns_image_view: true,
        }
    }
}

impl RendererRenderTarget for RenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        if self.owns_image_view {
            if let Some(device) = &self.device {
                unsafe {
                    device.destroy_image_view(self.image_view, None);
                }
            }
        }
    }
}
