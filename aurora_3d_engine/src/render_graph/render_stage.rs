/// RenderStage - attachments and subpass wiring for one render pass
///
/// A stage declares which attachments exist and which of them each
/// subpass touches. All referential integrity is validated at
/// construction; the frame loop never re-checks it.

use crate::error::Result;
use crate::renderer::{
    ClearValue, RenderPassDesc, RenderPassAttachmentDesc, SubpassDesc,
};
use crate::render_graph::{Attachment, AttachmentKind};
use crate::engine_bail;

/// Maps one subpass to the attachments it reads or writes
#[derive(Debug, Clone)]
pub struct SubpassBinding {
    /// Subpass index within the stage
    pub subpass: u32,
    /// Binding indices of the attachments this subpass uses
    pub attachment_bindings: Vec<u32>,
}

impl SubpassBinding {
    pub fn new(subpass: u32, attachment_bindings: Vec<u32>) -> Self {
        Self { subpass, attachment_bindings }
    }
}

/// Fixed viewport for a stage that does not track the swapchain extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageViewport {
    pub width: u32,
    pub height: u32,
}

pub struct RenderStage {
    attachments: Vec<Attachment>,
    subpass_bindings: Vec<SubpassBinding>,
    viewport: Option<StageViewport>,
}

impl RenderStage {
    /// Build a stage and validate its attachment references
    ///
    /// # Errors
    ///
    /// Fails if there is no subpass binding, an attachment binding index
    /// is duplicated, or a subpass references an attachment binding that
    /// does not exist or references it twice.
    pub fn new(
        attachments: Vec<Attachment>,
        subpass_bindings: Vec<SubpassBinding>,
        viewport: Option<StageViewport>,
    ) -> Result<Self> {
        if subpass_bindings.is_empty() {
            engine_bail!("aurora3d::RenderStage",
                "a render stage needs at least one subpass binding");
        }

        for (index, attachment) in attachments.iter().enumerate() {
            let duplicate = attachments[..index]
                .iter()
                .any(|other| other.binding == attachment.binding);
            if duplicate {
                engine_bail!("aurora3d::RenderStage",
                    "duplicate attachment binding {} (\"{}\")",
                    attachment.binding, attachment.name);
            }
        }

        for binding in &subpass_bindings {
            for (index, attachment_binding) in binding.attachment_bindings.iter().enumerate() {
                if !attachments.iter().any(|a| a.binding == *attachment_binding) {
                    engine_bail!("aurora3d::RenderStage",
                        "subpass {} references unknown attachment binding {}",
                        binding.subpass, attachment_binding);
                }
                if binding.attachment_bindings[..index].contains(attachment_binding) {
                    engine_bail!("aurora3d::RenderStage",
                        "subpass {} references attachment binding {} twice",
                        binding.subpass, attachment_binding);
                }
            }
        }

        Ok(Self { attachments, subpass_bindings, viewport })
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn subpass_bindings(&self) -> &[SubpassBinding] {
        &self.subpass_bindings
    }

    pub fn subpass_count(&self) -> usize {
        self.subpass_bindings.len()
    }

    /// Fixed viewport, or None to inherit the swapchain extent
    pub fn viewport(&self) -> Option<StageViewport> {
        self.viewport
    }

    /// Find an attachment by name
    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.name == name)
    }

    /// Find an attachment by binding index
    pub fn attachment_by_binding(&self, binding: u32) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.binding == binding)
    }

    /// True if this stage writes the swapchain image
    pub fn writes_swapchain(&self) -> bool {
        self.attachments
            .iter()
            .any(|a| a.kind == AttachmentKind::Swapchain)
    }

    /// Lower the stage declaration to a backend render pass description
    ///
    /// Attachment slots appear in declaration order; subpass references
    /// are rewritten from binding indices to slot indices. Intermediate
    /// images are marked sampled so later stages can read them.
    pub fn render_pass_desc(&self) -> RenderPassDesc {
        let attachments = self
            .attachments
            .iter()
            .map(|a| RenderPassAttachmentDesc {
                format: a.format,
                clear: true,
                sampled: a.kind == AttachmentKind::Image,
            })
            .collect();

        let subpasses = self
            .subpass_bindings
            .iter()
            .map(|binding| {
                let mut desc = SubpassDesc::default();
                for attachment_binding in &binding.attachment_bindings {
                    // Validated at construction
                    let slot = self
                        .attachments
                        .iter()
                        .position(|a| a.binding == *attachment_binding)
                        .unwrap_or_default() as u32;
                    let attachment = &self.attachments[slot as usize];
                    if attachment.kind == AttachmentKind::Depth {
                        desc.depth_attachment = Some(slot);
                    } else {
                        desc.color_attachments.push(slot);
                    }
                }
                desc
            })
            .collect();

        RenderPassDesc { attachments, subpasses }
    }

    /// Clear values in attachment slot order, for pass begin
    pub fn clear_values(&self) -> Vec<ClearValue> {
        self.attachments.iter().map(|a| a.clear_value()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "render_stage_tests.rs"]
mod tests;
