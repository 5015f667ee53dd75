//! Unit tests for MeshSubrenderer
//!
//! Exercises the full per-frame protocol against the mock renderer,
//! including the skipped draw on the frame a rebuild happens.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::render_graph::Subrenderer;
use crate::renderer::mock_renderer::{MockRenderer, MockCommandList, MockPipeline, MockTexture};
use crate::renderer::{
    Renderer, Pipeline, Texture, Buffer, BufferDesc, BufferUsage, SamplerType,
    DescriptorType, ShaderStageFlags, BlockKind, Uniform, UniformBlock,
    ReflectedBinding, PipelineReflection,
};
use crate::subrenderers::MeshSubrenderer;

fn mesh_reflection() -> PipelineReflection {
    let mut scene_uniforms = BTreeMap::new();
    scene_uniforms.insert("projection".to_string(), Uniform { offset: 0, size: 64 });
    scene_uniforms.insert("view".to_string(), Uniform { offset: 64, size: 64 });

    let mut instance_uniforms = BTreeMap::new();
    instance_uniforms.insert("transforms".to_string(), Uniform { offset: 0, size: 64 * 1024 });

    let mut blocks = FxHashMap::default();
    blocks.insert("scene".to_string(), UniformBlock {
        binding: 0,
        size: 128,
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
    bindings.insert("albedo".to_string(), ReflectedBinding {
        set: 0,
        binding: 2,
        descriptor_type: DescriptorType::CombinedImageSampler,
        count: 1,
        stage_flags: ShaderStageFlags::FRAGMENT,
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
        Arc::new(MockPipeline::with_reflection("mesh".to_string(), mesh_reflection()));
    let vertices = renderer
        .lock()
        .unwrap()
        .create_buffer(BufferDesc { size: 36 * 32, usage: BufferUsage::Vertex })
        .unwrap();
    (renderer, pipeline, vertices)
}

fn cube_subrenderer() -> MeshSubrenderer {
    let (renderer, pipeline, vertices) = setup();
    let mut subrenderer = MeshSubrenderer::new(renderer, pipeline).unwrap();
    subrenderer.set_mesh(vertices, 36);
    subrenderer.set_camera(Mat4::IDENTITY, Mat4::IDENTITY);
    subrenderer.set_instances(vec![Mat4::IDENTITY, Mat4::from_translation(glam::Vec3::X)]);
    subrenderer
}

#[test]
fn test_first_frame_rebuild_skips_draw() {
    let mut subrenderer = cube_subrenderer();
    let mut cmd = MockCommandList::new();

    subrenderer.render(&mut cmd, 0).unwrap();
    assert!(cmd.commands.is_empty());
}

#[test]
fn test_second_frame_draws() {
    let mut subrenderer = cube_subrenderer();
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
fn test_no_mesh_records_nothing() {
    let (renderer, pipeline, _) = setup();
    let mut subrenderer = MeshSubrenderer::new(renderer, pipeline).unwrap();
    subrenderer.set_instances(vec![Mat4::IDENTITY]);

    let mut cmd = MockCommandList::new();
    subrenderer.render(&mut cmd, 0).unwrap();
    assert!(cmd.commands.is_empty());
}

#[test]
fn test_no_instances_records_nothing() {
    let (renderer, pipeline, vertices) = setup();
    let mut subrenderer = MeshSubrenderer::new(renderer, pipeline).unwrap();
    subrenderer.set_mesh(vertices, 36);

    let mut cmd = MockCommandList::new();
    subrenderer.render(&mut cmd, 0).unwrap();
    subrenderer.render(&mut cmd, 1).unwrap();
    assert!(cmd.commands.is_empty());
}

#[test]
fn test_albedo_swap_draws_next_frame() {
    let mut subrenderer = cube_subrenderer();
    let first: Arc<dyn Texture> = Arc::new(MockTexture::new(512, 512, 1, "first".to_string()));
    let second: Arc<dyn Texture> = Arc::new(MockTexture::new(512, 512, 1, "second".to_string()));
    subrenderer.set_albedo(first, SamplerType::LinearRepeat);

    let mut cmd = MockCommandList::new();
    subrenderer.render(&mut cmd, 0).unwrap();
    subrenderer.render(&mut cmd, 1).unwrap();
    let drawn_before = cmd.commands.len();
    assert!(drawn_before > 0);

    // A texture swap only rewrites the descriptor set; drawing continues
    subrenderer.set_albedo(second, SamplerType::LinearRepeat);
    subrenderer.render(&mut cmd, 0).unwrap();
    assert_eq!(cmd.commands.len(), drawn_before * 2);
}
