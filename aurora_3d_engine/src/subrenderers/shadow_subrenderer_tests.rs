//! Unit tests for ShadowSubrenderer
//!
//! Same protocol as the mesh pass but depth-only: a single light-space
//! matrix and the instance transforms, no sampled images.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::render_graph::Subrenderer;
use crate::renderer::mock_renderer::{MockRenderer, MockCommandList, MockPipeline};
use crate::renderer::{
    Renderer, Pipeline, Buffer, BufferDesc, BufferUsage,
    DescriptorType, ShaderStageFlags, BlockKind, Uniform, UniformBlock,
    ReflectedBinding, PipelineReflection,
};
use crate::subrenderers::ShadowSubrenderer;

fn shadow_reflection() -> PipelineReflection {
    let mut scene_uniforms = BTreeMap::new();
    scene_uniforms.insert("light_space".to_string(), Uniform { offset: 0, size: 64 });

    let mut instance_uniforms = BTreeMap::new();
    instance_uniforms.insert("transforms".to_string(), Uniform { offset: 0, size: 64 * 1024 });

    let mut blocks = FxHashMap::default();
    blocks.insert("scene".to_string(), UniformBlock {
        binding: 0,
        size: 64,
        stage_flags: ShaderStageFlags::VERTEX,
        kind: BlockKind::Uniform,
        uniforms: scene_uniforms,
    });
    blocks.insert("instances".to_string(), UniformBlock {
        binding: 1,
        size: 64 * 1024,
        stage_flags: ShaderStageFlags::VERTEX,
        kind: BlockKind::Storage,
        uniforms: instance_uniforms,
    });

    let mut bindings = FxHashMap::default();
    bindings.insert("scene".to_string(), ReflectedBinding {
        set: 0,
        binding: 0,
        descriptor_type: DescriptorType::UniformBuffer,
        count: 1,
        stage_flags: ShaderStageFlags::VERTEX,
    });
    bindings.insert("instances".to_string(), ReflectedBinding {
        set: 0,
        binding: 1,
        descriptor_type: DescriptorType::StorageBuffer,
        count: 1,
        stage_flags: ShaderStageFlags::VERTEX,
    });

    PipelineReflection {
        blocks,
        bindings,
        push_constant: None,
        set_count: 1,
    }
}

fn setup() -> (Arc<Mutex<dyn Renderer>>, Arc<dyn Pipeline>, Arc<dyn Buffer>) {
    let renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(MockRenderer::new()));
    let pipeline: Arc<dyn Pipeline> =
        Arc::new(MockPipeline::with_reflection("shadow".to_string(), shadow_reflection()));
    let vertices = renderer
        .lock()
        .unwrap()
        .create_buffer(BufferDesc { size: 36 * 12, usage: BufferUsage::Vertex })
        .unwrap();
    (renderer, pipeline, vertices)
}

fn caster_subrenderer() -> ShadowSubrenderer {
    let (renderer, pipeline, vertices) = setup();
    let mut subrenderer = ShadowSubrenderer::new(renderer, pipeline).unwrap();
    subrenderer.set_mesh(vertices, 36);
    subrenderer.set_light_space(Mat4::IDENTITY);
    subrenderer.set_instances(vec![Mat4::IDENTITY, Mat4::from_translation(glam::Vec3::X)]);
    subrenderer
}

#[test]
fn test_first_frame_rebuild_skips_draw() {
    let mut subrenderer = caster_subrenderer();
    let mut cmd = MockCommandList::new();

    subrenderer.render(&mut cmd, 0).unwrap();
    assert!(cmd.commands.is_empty());
}

#[test]
fn test_second_frame_draws() {
    let mut subrenderer = caster_subrenderer();
    let mut cmd = MockCommandList::new();

    subrenderer.render(&mut cmd, 0).unwrap();
    subrenderer.render(&mut cmd, 1).unwrap();

    assert_eq!(cmd.commands, vec![
        "bind_pipeline",
        "bind_descriptor_set(set=0)",
        "bind_vertex_buffer",
        "draw_instanced(36, 2, 0)",
    ]);
}

#[test]
fn test_no_casters_records_nothing() {
    let (renderer, pipeline, vertices) = setup();
    let mut subrenderer = ShadowSubrenderer::new(renderer, pipeline).unwrap();
    subrenderer.set_mesh(vertices, 36);

    let mut cmd = MockCommandList::new();
    subrenderer.render(&mut cmd, 0).unwrap();
    subrenderer.render(&mut cmd, 1).unwrap();
    assert!(cmd.commands.is_empty());
}
