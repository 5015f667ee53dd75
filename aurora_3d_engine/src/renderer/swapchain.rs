/// Swapchain trait - window presentation

use crate::error::Result;
use crate::renderer::{CommandList, Texture, TextureFormat};

/// Swapchain abstraction for presenting rendered frames to a window
///
/// Stages never render directly into swapchain images. The stage that
/// feeds presentation renders into an offscreen texture, which is then
/// blitted to the acquired swapchain image via `record_present_blit`.
pub trait Swapchain: Send + Sync {
    /// Acquire the next swapchain image, returning its index
    fn acquire_next_image(&mut self) -> Result<u32>;

    /// Record a blit from an offscreen texture to a swapchain image
    ///
    /// # Arguments
    ///
    /// * `cmd` - Command list to record into (outside any render pass)
    /// * `src` - Source texture (must have PresentSource usage)
    /// * `image_index` - Swapchain image acquired this frame
    fn record_present_blit(
        &self,
        cmd: &mut dyn CommandList,
        src: &dyn Texture,
        image_index: u32,
    ) -> Result<()>;

    /// Present a swapchain image to the window
    fn present(&mut self, image_index: u32) -> Result<()>;

    /// Number of images in the swapchain
    fn image_count(&self) -> usize;

    /// Width of the swapchain images in pixels
    fn width(&self) -> u32;

    /// Height of the swapchain images in pixels
    fn height(&self) -> u32;

    /// Pixel format of the swapchain images
    fn format(&self) -> TextureFormat;

    /// Recreate the swapchain after a window resize
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;
}
