//! Unit tests for the post-process filters

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::render_graph::Subrenderer;
use crate::renderer::mock_renderer::{MockRenderer, MockDescriptorUpdate, MockCommandList, MockPipeline, MockTexture};
use crate::renderer::{
    Renderer, Pipeline, Texture, DescriptorType, ShaderStageFlags, BlockKind,
    Uniform, UniformBlock, ReflectedBinding, PipelineReflection,
};
use crate::subrenderers::{BlurFilter, ResolveFilter};

fn blur_reflection() -> PipelineReflection {
    let mut params = BTreeMap::new();
    params.insert("direction".to_string(), Uniform { offset: 0, size: 8 });
    params.insert("radius".to_string(), Uniform { offset: 8, size: 4 });

    let mut blocks = FxHashMap::default();
    blocks.insert("blur_params".to_string(), UniformBlock {
        binding: 0,
        size: 16,
        stage_flags: ShaderStageFlags::FRAGMENT,
        kind: BlockKind::Uniform,
        uniforms: params,
    });

    let mut bindings = FxHashMap::default();
    bindings.insert("blur_params".to_string(), ReflectedBinding {
        set: 0,
        binding: 0,
        descriptor_type: DescriptorType::UniformBuffer,
        count: 1,
        stage_flags: ShaderStageFlags::FRAGMENT,
    });
    bindings.insert("source".to_string(), ReflectedBinding {
        set: 0,
        binding: 1,
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

fn resolve_reflection() -> PipelineReflection {
    let mut bindings = FxHashMap::default();
    bindings.insert("source".to_string(), ReflectedBinding {
        set: 0,
        binding: 0,
        descriptor_type: DescriptorType::CombinedImageSampler,
        count: 1,
        stage_flags: ShaderStageFlags::FRAGMENT,
    });

    PipelineReflection {
        blocks: FxHashMap::default(),
        bindings,
        push_constant: None,
        set_count: 1,
    }
}

fn setup(reflection: PipelineReflection) -> (
    Arc<Mutex<dyn Renderer>>,
    Arc<dyn Pipeline>,
    Arc<Mutex<Vec<MockDescriptorUpdate>>>,
) {
    let renderer = MockRenderer::new();
    let updates = renderer.descriptor_updates.clone();
    let pipeline: Arc<dyn Pipeline> =
        Arc::new(MockPipeline::with_reflection("filter".to_string(), reflection));
    (Arc::new(Mutex::new(renderer)), pipeline, updates)
}

fn offscreen_texture(name: &str) -> Arc<dyn Texture> {
    Arc::new(MockTexture::new(1920, 1080, 1, name.to_string()))
}

#[test]
fn test_filter_without_input_records_nothing() {
    let (renderer, pipeline, _) = setup(blur_reflection());
    let mut blur = BlurFilter::new(renderer, pipeline, [1.0, 0.0]).unwrap();

    let mut cmd = MockCommandList::new();
    blur.render(&mut cmd, 0).unwrap();
    assert!(cmd.commands.is_empty());
}

#[test]
fn test_blur_draws_fullscreen_triangle_after_rebuild_frame() {
    let (renderer, pipeline, _) = setup(blur_reflection());
    let mut blur = BlurFilter::new(renderer, pipeline, [1.0, 0.0]).unwrap();
    blur.set_input(offscreen_texture("hdr"));

    let mut cmd = MockCommandList::new();
    blur.render(&mut cmd, 0).unwrap();
    assert!(cmd.commands.is_empty());

    blur.render(&mut cmd, 1).unwrap();
    assert_eq!(cmd.commands, vec![
        "bind_pipeline",
        "bind_descriptor_set(set=0)",
        "draw(3, 0)",
    ]);
}

#[test]
fn test_parameter_change_does_not_rewrite_descriptors() {
    let (renderer, pipeline, updates) = setup(blur_reflection());
    let mut blur = BlurFilter::new(renderer, pipeline, [0.0, 1.0]).unwrap();
    blur.set_input(offscreen_texture("hdr"));

    let mut cmd = MockCommandList::new();
    blur.render(&mut cmd, 0).unwrap();
    blur.render(&mut cmd, 0).unwrap();
    blur.render(&mut cmd, 1).unwrap();
    let count = updates.lock().unwrap().len();

    // Radius only touches the uniform buffer contents, not the bindings
    blur.set_radius(8.0);
    blur.render(&mut cmd, 0).unwrap();
    blur.render(&mut cmd, 1).unwrap();
    assert_eq!(updates.lock().unwrap().len(), count);
}

#[test]
fn test_input_swap_rewrites_descriptors() {
    let (renderer, pipeline, updates) = setup(blur_reflection());
    let mut blur = BlurFilter::new(renderer, pipeline, [1.0, 0.0]).unwrap();
    blur.set_input(offscreen_texture("hdr"));

    let mut cmd = MockCommandList::new();
    blur.render(&mut cmd, 0).unwrap();
    blur.render(&mut cmd, 0).unwrap();
    blur.render(&mut cmd, 1).unwrap();
    let count = updates.lock().unwrap().len();

    blur.set_input(offscreen_texture("hdr_resized"));
    blur.render(&mut cmd, 0).unwrap();
    assert_eq!(updates.lock().unwrap().len(), count + 1);
}

#[test]
fn test_resolve_filter_draws_without_params() {
    let (renderer, pipeline, _) = setup(resolve_reflection());
    let mut resolve = ResolveFilter::new(renderer, pipeline);
    resolve.set_input(offscreen_texture("ldr"));

    let mut cmd = MockCommandList::new();
    resolve.render(&mut cmd, 0).unwrap();
    resolve.render(&mut cmd, 1).unwrap();
    assert_eq!(cmd.commands, vec![
        "bind_pipeline",
        "bind_descriptor_set(set=0)",
        "draw(3, 0)",
    ]);
}
