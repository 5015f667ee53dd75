/// RenderGraph - composition root dispatching subrenderers per stage
///
/// Owns the ordered render stages and a registry of subrenderers keyed
/// by (stage, subpass). Subrenderers registered at the same key execute
/// in registration order; later ones may depend on attachment contents
/// written by earlier ones.

use crate::error::Result;
use crate::renderer::CommandList;
use crate::render_graph::RenderStage;
use crate::engine_bail;

/// Where in the frame a subrenderer executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineStage {
    /// Index into the graph's render stage list
    pub stage: usize,
    /// Subpass index within that stage
    pub subpass: u32,
}

impl PipelineStage {
    pub fn new(stage: usize, subpass: u32) -> Self {
        Self { stage, subpass }
    }
}

/// One unit of per-pass draw logic
///
/// A subrenderer owns its pipeline, handlers, and descriptor handler,
/// and records its draws when the graph reaches its pipeline stage.
pub trait Subrenderer: Send {
    /// Record this subrenderer's commands for the given frame slot
    fn render(&mut self, cmd: &mut dyn CommandList, frame: usize) -> Result<()>;
}

struct RegisteredSubrenderer {
    stage: PipelineStage,
    name: String,
    subrenderer: Box<dyn Subrenderer>,
}

pub struct RenderGraph {
    stages: Vec<RenderStage>,
    /// Registration order is dispatch order
    subrenderers: Vec<RegisteredSubrenderer>,
}

impl RenderGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            subrenderers: Vec::new(),
        }
    }

    /// Append a render stage, returning its index
    pub fn add_render_stage(&mut self, stage: RenderStage) -> usize {
        self.stages.push(stage);
        self.stages.len() - 1
    }

    pub fn stage(&self, index: usize) -> Option<&RenderStage> {
        self.stages.get(index)
    }

    pub fn stages(&self) -> &[RenderStage] {
        &self.stages
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Register a named subrenderer at a pipeline stage
    ///
    /// # Errors
    ///
    /// Fails if the pipeline stage references a render stage or subpass
    /// that does not exist, or the name is already registered. Both are
    /// programming errors caught at registration, never at render time.
    pub fn add_subrenderer(
        &mut self,
        stage: PipelineStage,
        name: &str,
        subrenderer: Box<dyn Subrenderer>,
    ) -> Result<()> {
        let Some(render_stage) = self.stages.get(stage.stage) else {
            engine_bail!("aurora3d::RenderGraph",
                "add_subrenderer(\"{}\"): render stage {} does not exist",
                name, stage.stage);
        };
        if stage.subpass as usize >= render_stage.subpass_count() {
            engine_bail!("aurora3d::RenderGraph",
                "add_subrenderer(\"{}\"): stage {} has no subpass {}",
                name, stage.stage, stage.subpass);
        }
        if self.subrenderers.iter().any(|entry| entry.name == name) {
            engine_bail!("aurora3d::RenderGraph",
                "add_subrenderer(\"{}\"): name already registered", name);
        }

        self.subrenderers.push(RegisteredSubrenderer {
            stage,
            name: name.to_string(),
            subrenderer,
        });
        Ok(())
    }

    /// Names registered at a pipeline stage, in dispatch order
    pub fn subrenderer_names(&self, stage: PipelineStage) -> Vec<&str> {
        self.subrenderers
            .iter()
            .filter(|entry| entry.stage == stage)
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Dispatch every subrenderer registered at one pipeline stage
    pub fn render(
        &mut self,
        stage: PipelineStage,
        cmd: &mut dyn CommandList,
        frame: usize,
    ) -> Result<()> {
        for entry in &mut self.subrenderers {
            if entry.stage == stage {
                entry.subrenderer.render(cmd, frame)?;
            }
        }
        Ok(())
    }

    /// Record one render stage: every subpass in order, with subpass
    /// transitions between them
    ///
    /// The caller begins and ends the render pass around this; pass
    /// setup needs the stage's framebuffer, which lives above the graph.
    pub fn render_stage(
        &mut self,
        stage_index: usize,
        cmd: &mut dyn CommandList,
        frame: usize,
    ) -> Result<()> {
        let subpass_count = match self.stages.get(stage_index) {
            Some(stage) => stage.subpass_count(),
            None => {
                engine_bail!("aurora3d::RenderGraph",
                    "render_stage: render stage {} does not exist", stage_index);
            }
        };

        for subpass in 0..subpass_count {
            if subpass > 0 {
                cmd.next_subpass()?;
            }
            self.render(PipelineStage::new(stage_index, subpass as u32), cmd, frame)?;
        }
        Ok(())
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "render_graph_tests.rs"]
mod tests;
