/// RenderPass, RenderTarget, and Framebuffer traits with their descriptors

use std::sync::Arc;
use crate::renderer::TextureFormat;

// ===== RENDER PASS =====

/// Description of one attachment slot of a render pass
#[derive(Debug, Clone)]
pub struct RenderPassAttachmentDesc {
    /// Pixel format of the attachment
    pub format: TextureFormat,
    /// Clear the attachment at pass start (false = load previous contents)
    pub clear: bool,
    /// Attachment will be sampled by later stages
    pub sampled: bool,
}

/// Description of one subpass within a render pass
#[derive(Debug, Clone, Default)]
pub struct SubpassDesc {
    /// Indices of color attachments written by this subpass
    pub color_attachments: Vec<u32>,
    /// Index of the depth attachment, if any
    pub depth_attachment: Option<u32>,
    /// Indices of attachments read as subpass inputs
    pub input_attachments: Vec<u32>,
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    /// Attachment slots, indexed by subpass references
    pub attachments: Vec<RenderPassAttachmentDesc>,
    /// Subpasses executed in order
    pub subpasses: Vec<SubpassDesc>,
}

/// Render pass resource trait
///
/// Implemented by backend-specific render pass types.
/// The render pass is automatically destroyed when dropped.
pub trait RenderPass: Send + Sync {}

// ===== RENDER TARGET =====

/// A render target view over one layer/mip of a texture
pub trait RenderTarget: Send + Sync {
    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// Pixel format
    fn format(&self) -> TextureFormat;
}

// ===== FRAMEBUFFER =====

/// Descriptor for creating a framebuffer
#[derive(Clone)]
pub struct FramebufferDesc {
    /// Render pass the framebuffer is compatible with
    pub render_pass: Arc<dyn RenderPass>,
    /// Render targets, in attachment order
    pub targets: Vec<Arc<dyn RenderTarget>>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Framebuffer resource trait
pub trait Framebuffer: Send + Sync {
    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;
}
