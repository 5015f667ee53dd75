//! Unit tests for UiSubrenderer

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use glam::{Mat4, Vec4};
use rustc_hash::FxHashMap;

use crate::render_graph::Subrenderer;
use crate::renderer::mock_renderer::{MockRenderer, MockCommandList, MockPipeline};
use crate::renderer::{
    Renderer, Pipeline, DescriptorType, ShaderStageFlags, BlockKind,
    Uniform, UniformBlock, ReflectedBinding, PipelineReflection,
};
use crate::subrenderers::{UiSubrenderer, UiWidget};

fn ui_reflection() -> PipelineReflection {
    let mut widget_uniforms = BTreeMap::new();
    widget_uniforms.insert("transform".to_string(), Uniform { offset: 0, size: 64 });
    widget_uniforms.insert("color".to_string(), Uniform { offset: 64, size: 16 });

    let mut bindings = FxHashMap::default();
    bindings.insert("atlas".to_string(), ReflectedBinding {
        set: 0,
        binding: 0,
        descriptor_type: DescriptorType::CombinedImageSampler,
        count: 1,
        stage_flags: ShaderStageFlags::FRAGMENT,
    });

    PipelineReflection {
        blocks: FxHashMap::default(),
        bindings,
        push_constant: Some(UniformBlock {
            binding: 0,
            size: 80,
            stage_flags: ShaderStageFlags::VERTEX_FRAGMENT,
            kind: BlockKind::Push,
            uniforms: widget_uniforms,
        }),
        set_count: 1,
    }
}

fn setup() -> (Arc<Mutex<dyn Renderer>>, Arc<dyn Pipeline>) {
    let renderer: Arc<Mutex<dyn Renderer>> = Arc::new(Mutex::new(MockRenderer::new()));
    let pipeline: Arc<dyn Pipeline> =
        Arc::new(MockPipeline::with_reflection("ui".to_string(), ui_reflection()));
    (renderer, pipeline)
}

fn widget() -> UiWidget {
    UiWidget {
        transform: Mat4::IDENTITY,
        color: Vec4::new(1.0, 1.0, 1.0, 1.0),
    }
}

#[test]
fn test_no_widgets_records_nothing() {
    let (renderer, pipeline) = setup();
    let mut subrenderer = UiSubrenderer::new(renderer, pipeline).unwrap();

    let mut cmd = MockCommandList::new();
    subrenderer.render(&mut cmd, 0).unwrap();
    assert!(cmd.commands.is_empty());
}

#[test]
fn test_first_frame_rebuild_skips_draw() {
    let (renderer, pipeline) = setup();
    let mut subrenderer = UiSubrenderer::new(renderer, pipeline).unwrap();
    subrenderer.set_widgets(vec![widget()]);

    let mut cmd = MockCommandList::new();
    subrenderer.render(&mut cmd, 0).unwrap();
    assert!(cmd.commands.is_empty());
}

#[test]
fn test_one_push_and_draw_per_widget() {
    let (renderer, pipeline) = setup();
    let mut subrenderer = UiSubrenderer::new(renderer, pipeline).unwrap();
    subrenderer.set_widgets(vec![widget(), widget()]);

    let mut cmd = MockCommandList::new();
    subrenderer.render(&mut cmd, 0).unwrap();
    subrenderer.render(&mut cmd, 1).unwrap();

    assert_eq!(cmd.commands, vec![
        "bind_pipeline",
        "bind_descriptor_set(set=0)",
        "push_constants(offset=0, len=80)",
        "draw(6, 0)",
        "push_constants(offset=0, len=80)",
        "draw(6, 0)",
    ]);
}
