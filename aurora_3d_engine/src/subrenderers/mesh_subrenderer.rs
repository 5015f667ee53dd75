/// MeshSubrenderer - instanced opaque geometry pass
///
/// Shader contract: uniform block "scene" with "projection" and "view"
/// matrices, storage block "instances" holding per-instance transforms,
/// and an optional "albedo" sampled image.

use std::sync::{Arc, Mutex};

use glam::Mat4;

use crate::error::Result;
use crate::renderer::{Renderer, Pipeline, CommandList, Buffer, Texture, SamplerType};
use crate::buffers::{UniformHandler, StorageHandler};
use crate::descriptor::{DescriptorHandler, SampledImage};
use crate::render_graph::Subrenderer;

pub struct MeshSubrenderer {
    pipeline: Arc<dyn Pipeline>,
    scene_uniforms: UniformHandler,
    instance_storage: StorageHandler,
    descriptors: DescriptorHandler,
    vertex_buffer: Option<Arc<dyn Buffer>>,
    vertex_count: u32,
    albedo: Option<SampledImage>,
    projection: Mat4,
    view: Mat4,
    instances: Vec<Mat4>,
}

impl MeshSubrenderer {
    /// Create a mesh subrenderer against its pipeline
    ///
    /// The handlers are primed from the pipeline reflection so named
    /// pushes are valid from the first frame.
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
            albedo: None,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            instances: Vec::new(),
        })
    }

    /// Set the camera matrices for this frame
    pub fn set_camera(&mut self, projection: Mat4, view: Mat4) {
        self.projection = projection;
        self.view = view;
    }

    /// Set the mesh geometry to draw
    pub fn set_mesh(&mut self, vertex_buffer: Arc<dyn Buffer>, vertex_count: u32) {
        self.vertex_buffer = Some(vertex_buffer);
        self.vertex_count = vertex_count;
    }

    /// Replace the per-instance transforms for this frame
    pub fn set_instances(&mut self, instances: Vec<Mat4>) {
        self.instances = instances;
    }

    /// Set the albedo texture sampled by the fragment shader
    pub fn set_albedo(&mut self, texture: Arc<dyn Texture>, sampler: SamplerType) {
        match &mut self.albedo {
            Some(image) => image.set_texture(texture),
            None => self.albedo = Some(SampledImage::new(texture, sampler)),
        }
    }
}

impl Subrenderer for MeshSubrenderer {
    fn render(&mut self, cmd: &mut dyn CommandList, frame: usize) -> Result<()> {
        let Some(vertex_buffer) = self.vertex_buffer.clone() else {
            return Ok(());
        };
        if self.instances.is_empty() {
            return Ok(());
        }

        self.scene_uniforms.push("projection", &self.projection)?;
        self.scene_uniforms.push("view", &self.view)?;
        self.instance_storage.push_slice(&self.instances)?;

        self.descriptors.push_uniform("scene", &mut self.scene_uniforms)?;
        self.descriptors.push_storage("instances", &mut self.instance_storage)?;
        if let Some(albedo) = &self.albedo {
            self.descriptors.push_descriptor("albedo", albedo)?;
        }

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
#[path = "mesh_subrenderer_tests.rs"]
mod tests;
