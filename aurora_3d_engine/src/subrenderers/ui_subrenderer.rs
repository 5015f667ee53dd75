/// UiSubrenderer - screen-space widget overlay
///
/// Shader contract: push constant block "widget" with a "transform"
/// matrix and a "color" vector, plus an optional "atlas" sampled image
/// for text and icon glyphs. Widgets are drawn as untextured or
/// atlas-textured quads, one push constant update per widget.

use std::sync::{Arc, Mutex};

use glam::{Mat4, Vec4};

use crate::error::Result;
use crate::renderer::{Renderer, Pipeline, CommandList, Texture, SamplerType};
use crate::buffers::PushHandler;
use crate::descriptor::{DescriptorHandler, SampledImage};
use crate::render_graph::Subrenderer;

/// One widget quad for the current frame
#[derive(Debug, Clone, Copy)]
pub struct UiWidget {
    /// Screen-space transform of the unit quad
    pub transform: Mat4,
    /// Tint color (RGBA)
    pub color: Vec4,
}

pub struct UiSubrenderer {
    pipeline: Arc<dyn Pipeline>,
    push_constants: PushHandler,
    descriptors: DescriptorHandler,
    atlas: Option<SampledImage>,
    widgets: Vec<UiWidget>,
}

impl UiSubrenderer {
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, pipeline: Arc<dyn Pipeline>) -> Result<Self> {
        let mut push_constants = PushHandler::new();
        push_constants.update(pipeline.reflection().push_constant())?;
        let descriptors = DescriptorHandler::new(renderer, 0);

        Ok(Self {
            pipeline,
            push_constants,
            descriptors,
            atlas: None,
            widgets: Vec::new(),
        })
    }

    /// Set the glyph atlas sampled by the fragment shader
    pub fn set_atlas(&mut self, texture: Arc<dyn Texture>, sampler: SamplerType) {
        match &mut self.atlas {
            Some(image) => image.set_texture(texture),
            None => self.atlas = Some(SampledImage::new(texture, sampler)),
        }
    }

    /// Replace the widget list for this frame
    pub fn set_widgets(&mut self, widgets: Vec<UiWidget>) {
        self.widgets = widgets;
    }
}

impl Subrenderer for UiSubrenderer {
    fn render(&mut self, cmd: &mut dyn CommandList, frame: usize) -> Result<()> {
        if self.widgets.is_empty() {
            return Ok(());
        }

        if let Some(atlas) = &self.atlas {
            self.descriptors.push_descriptor("atlas", atlas)?;
        }
        self.descriptors.push_constants(&mut self.push_constants)?;

        if self.descriptors.update(&self.pipeline, frame)?.is_rebuilt() {
            return Ok(());
        }

        cmd.bind_pipeline(&self.pipeline)?;
        self.descriptors.bind_descriptors(cmd, frame)?;

        for widget in &self.widgets {
            self.push_constants.push("transform", &widget.transform)?;
            self.push_constants.push("color", &widget.color)?;
            self.push_constants.bind(cmd)?;
            // Unit quad, two triangles
            cmd.draw(6, 0)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "ui_subrenderer_tests.rs"]
mod tests;
