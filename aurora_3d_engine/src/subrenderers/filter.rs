/// Post-process filter subrenderers
///
/// A filter samples one input attachment and writes a fullscreen
/// triangle into the current subpass. `FilterCore` carries the shared
/// resource lifecycle; each concrete filter adds its parameter block.
///
/// Shader contract: sampled image "source" plus the filter's own
/// uniform block, named per filter below.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::renderer::{Renderer, Pipeline, CommandList, Texture, SamplerType};
use crate::buffers::UniformHandler;
use crate::descriptor::{DescriptorHandler, SampledImage};
use crate::render_graph::Subrenderer;

// ============================================================================
// Filter core
// ============================================================================

/// Shared state and per-frame protocol for fullscreen filters
pub struct FilterCore {
    pipeline: Arc<dyn Pipeline>,
    descriptors: DescriptorHandler,
    input: Option<SampledImage>,
}

impl FilterCore {
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            pipeline,
            descriptors: DescriptorHandler::new(renderer, 0),
            input: None,
        }
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    /// Set the attachment this filter samples
    pub fn set_input(&mut self, texture: Arc<dyn Texture>, sampler: SamplerType) {
        match &mut self.input {
            Some(image) => image.set_texture(texture),
            None => self.input = Some(SampledImage::new(texture, sampler)),
        }
    }

    /// Run the filter protocol: push bindings, reconcile, draw fullscreen
    ///
    /// `params` is the filter's uniform handler with its fields already
    /// pushed, or None for parameterless filters. Skips the draw when
    /// the input is not set yet or the descriptor handler rebuilt.
    pub fn render(
        &mut self,
        cmd: &mut dyn CommandList,
        frame: usize,
        params: Option<(&str, &mut UniformHandler)>,
    ) -> Result<()> {
        let Some(input) = &self.input else {
            return Ok(());
        };

        self.descriptors.push_descriptor("source", input)?;
        if let Some((name, handler)) = params {
            self.descriptors.push_uniform(name, handler)?;
        }

        if self.descriptors.update(&self.pipeline, frame)?.is_rebuilt() {
            return Ok(());
        }

        cmd.bind_pipeline(&self.pipeline)?;
        self.descriptors.bind_descriptors(cmd, frame)?;
        // Fullscreen triangle
        cmd.draw(3, 0)
    }
}

// ============================================================================
// Blur
// ============================================================================

/// Separable gaussian blur pass
///
/// Uniform block "blur_params": "direction" (vec2) and "radius" (float).
/// Run twice with perpendicular directions for a full blur.
pub struct BlurFilter {
    core: FilterCore,
    params: UniformHandler,
    direction: [f32; 2],
    radius: f32,
}

impl BlurFilter {
    pub fn new(
        renderer: Arc<Mutex<dyn Renderer>>,
        pipeline: Arc<dyn Pipeline>,
        direction: [f32; 2],
    ) -> Result<Self> {
        let mut params = UniformHandler::new(renderer.clone());
        params.update(pipeline.reflection().block("blur_params"))?;

        Ok(Self {
            core: FilterCore::new(renderer, pipeline),
            params,
            direction,
            radius: 4.0,
        })
    }

    pub fn set_input(&mut self, texture: Arc<dyn Texture>) {
        self.core.set_input(texture, SamplerType::LinearClamp);
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }
}

impl Subrenderer for BlurFilter {
    fn render(&mut self, cmd: &mut dyn CommandList, frame: usize) -> Result<()> {
        self.params.push("direction", &self.direction)?;
        self.params.push("radius", &self.radius)?;
        self.core.render(cmd, frame, Some(("blur_params", &mut self.params)))
    }
}

// ============================================================================
// Tonemap
// ============================================================================

/// HDR to LDR tonemapping pass
///
/// Uniform block "tonemap_params": "exposure" (float).
pub struct TonemapFilter {
    core: FilterCore,
    params: UniformHandler,
    exposure: f32,
}

impl TonemapFilter {
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, pipeline: Arc<dyn Pipeline>) -> Result<Self> {
        let mut params = UniformHandler::new(renderer.clone());
        params.update(pipeline.reflection().block("tonemap_params"))?;

        Ok(Self {
            core: FilterCore::new(renderer, pipeline),
            params,
            exposure: 1.0,
        })
    }

    pub fn set_input(&mut self, texture: Arc<dyn Texture>) {
        self.core.set_input(texture, SamplerType::LinearClamp);
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
    }
}

impl Subrenderer for TonemapFilter {
    fn render(&mut self, cmd: &mut dyn CommandList, frame: usize) -> Result<()> {
        self.params.push("exposure", &self.exposure)?;
        self.core.render(cmd, frame, Some(("tonemap_params", &mut self.params)))
    }
}

// ============================================================================
// FXAA
// ============================================================================

/// Fast approximate anti-aliasing pass
///
/// Uniform block "fxaa_params": "threshold" (float).
pub struct FxaaFilter {
    core: FilterCore,
    params: UniformHandler,
    threshold: f32,
}

impl FxaaFilter {
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, pipeline: Arc<dyn Pipeline>) -> Result<Self> {
        let mut params = UniformHandler::new(renderer.clone());
        params.update(pipeline.reflection().block("fxaa_params"))?;

        Ok(Self {
            core: FilterCore::new(renderer, pipeline),
            params,
            threshold: 0.125,
        })
    }

    pub fn set_input(&mut self, texture: Arc<dyn Texture>) {
        self.core.set_input(texture, SamplerType::LinearClamp);
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }
}

impl Subrenderer for FxaaFilter {
    fn render(&mut self, cmd: &mut dyn CommandList, frame: usize) -> Result<()> {
        self.params.push("threshold", &self.threshold)?;
        self.core.render(cmd, frame, Some(("fxaa_params", &mut self.params)))
    }
}

// ============================================================================
// Resolve
// ============================================================================

/// Parameterless copy of an attachment into the current target
///
/// Used as the final pass writing the swapchain image.
pub struct ResolveFilter {
    core: FilterCore,
}

impl ResolveFilter {
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            core: FilterCore::new(renderer, pipeline),
        }
    }

    pub fn set_input(&mut self, texture: Arc<dyn Texture>) {
        self.core.set_input(texture, SamplerType::NearestClamp);
    }
}

impl Subrenderer for ResolveFilter {
    fn render(&mut self, cmd: &mut dyn CommandList, frame: usize) -> Result<()> {
        self.core.render(cmd, frame, None)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
