/// ShadowSubrenderer - depth-only pass from the light's point of view
///
/// Shader contract: uniform block "scene" with a single "light_space"
/// matrix and storage block "instances" with per-instance transforms.
/// Renders into a fixed-size depth attachment sampled by later passes.

use std::sync::{Arc, Mutex};

use glam::Mat4;

use crate::error::Result;
use crate::renderer::{Renderer, Pipeline, CommandList, Buffer};
use crate::buffers::{UniformHandler, StorageHandler};
use crate::descriptor::DescriptorHandler;
use crate::render_graph::Subrenderer;

pub struct ShadowSubrenderer {
    pipeline: Arc<dyn Pipeline>,
    scene_uniforms: UniformHandler,
    instance_storage: StorageHandler,
    descriptors: DescriptorHandler,
    vertex_buffer: Option<Arc<dyn Buffer>>,
    vertex_count: u32,
    light_space: Mat4,
    instances: Vec<Mat4>,
}

impl ShadowSubrenderer {
    pub fn new(renderer: Arc<Mutex<dyn Renderer>>, pipeline: Arc<dyn Pipeline>) -> Result<Self> {
        let mut scene_uniforms = UniformHandler::new(renderer.clone());
        scene_uniforms.update(pipeline.reflection().block("scene"))?;
        let mut instance_storage = StorageHandler::new(renderer.clone());
        instance_storage.update(pipeline.reflection().block("instances"))?;
        let descriptors = DescriptorHandler::new(renderer, 0);

        Ok(Self {
            pipeline,
            scene_uniforms,
            instance_storage,
            descriptors,
            vertex_buffer: None,
            vertex_count: 0,
            light_space: Mat4::IDENTITY,
            instances: Vec::new(),
        })
    }

    /// Set the light's combined projection * view matrix
    pub fn set_light_space(&mut self, light_space: Mat4) {
        self.light_space = light_space;
    }

    pub fn set_mesh(&mut self, vertex_buffer: Arc<dyn Buffer>, vertex_count: u32) {
        self.vertex_buffer = Some(vertex_buffer);
        self.vertex_count = vertex_count;
    }

    pub fn set_instances(&mut self, instances: Vec<Mat4>) {
        self.instances = instances;
    }
}

impl Subrenderer for ShadowSubrenderer {
    fn render(&mut self, cmd: &mut dyn CommandList, frame: usize) -> Result<()> {
        let Some(vertex_buffer) = self.vertex_buffer.clone() else {
            return Ok(());
        };
        if self.instances.is_empty() {
            return Ok(());
        }

        self.scene_uniforms.push("light_space", &self.light_space)?;
        self.instance_storage.push_slice(&self.instances)?;

        self.descriptors.push_uniform("scene", &mut self.scene_uniforms)?;
        self.descriptors.push_storage("instances", &mut self.instance_storage)?;

        if self.descriptors.update(&self.pipeline, frame)?.is_rebuilt() {
            return Ok(());
        }

        cmd.bind_pipeline(&self.pipeline)?;
        self.descriptors.bind_descriptors(cmd, frame)?;
        cmd.bind_vertex_buffer(&vertex_buffer, 0)?;
        cmd.draw_instanced(self.vertex_count, self.instances.len() as u32, 0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "shadow_subrenderer_tests.rs"]
mod tests;
