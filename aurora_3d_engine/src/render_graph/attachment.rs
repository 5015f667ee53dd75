/// Attachment - one render target slot declared by a render stage
///
/// Identifies the image a stage reads or writes by binding index, name,
/// kind, and format. The swapchain kind resolves to the active swapchain
/// image at draw time; its declared format is nominal.

use crate::renderer::{TextureFormat, ClearValue};

/// What backs an attachment slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// A named intermediate image, sampled by later stages
    Image,
    /// The stage's depth buffer
    Depth,
    /// The active swapchain image
    Swapchain,
}

#[derive(Debug, Clone)]
pub struct Attachment {
    /// Binding index within the owning stage
    pub binding: u32,
    /// Name other stages and subrenderers reference this attachment by
    pub name: String,
    pub kind: AttachmentKind,
    pub format: TextureFormat,
    /// Clear color applied at pass start (color attachments only)
    pub clear_color: [f32; 4],
}

impl Attachment {
    /// An intermediate color image attachment, cleared to opaque black
    pub fn image(binding: u32, name: &str, format: TextureFormat) -> Self {
        Self {
            binding,
            name: name.to_string(),
            kind: AttachmentKind::Image,
            format,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// A depth attachment, cleared to the far plane
    pub fn depth(binding: u32, name: &str) -> Self {
        Self {
            binding,
            name: name.to_string(),
            kind: AttachmentKind::Depth,
            format: TextureFormat::D32_FLOAT,
            clear_color: [0.0; 4],
        }
    }

    /// The swapchain attachment
    ///
    /// The concrete image and format are resolved against the active
    /// swapchain when the frame is recorded.
    pub fn swapchain(binding: u32, name: &str) -> Self {
        Self {
            binding,
            name: name.to_string(),
            kind: AttachmentKind::Swapchain,
            format: TextureFormat::B8G8R8A8_UNORM,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Override the clear color
    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    /// The clear value recorded for this attachment at pass start
    pub fn clear_value(&self) -> ClearValue {
        match self.kind {
            AttachmentKind::Depth => ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
            _ => ClearValue::Color(self.clear_color),
        }
    }
}
