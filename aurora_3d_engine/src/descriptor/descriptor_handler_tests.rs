//! Unit tests for DescriptorHandler
//!
//! Covers pipeline rebinds, per-frame batched writes, and the dirty
//! tracking around handler rebuilds and resource swaps.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::buffers::{UniformHandler, StorageHandler, PushHandler};
use crate::descriptor::{DescriptorHandler, UpdateStatus, SampledImage};
use crate::renderer::mock_renderer::{MockRenderer, MockDescriptorUpdate, MockCommandList, MockPipeline, MockTexture};
use crate::renderer::{
    Renderer, Pipeline, Texture, SamplerType, DescriptorType,
    ShaderStageFlags, BlockKind, Uniform, UniformBlock,
    ReflectedBinding, PipelineReflection,
};

type SetLog = Arc<Mutex<Vec<usize>>>;
type UpdateLog = Arc<Mutex<Vec<MockDescriptorUpdate>>>;

fn test_renderer() -> (Arc<Mutex<dyn Renderer>>, SetLog, UpdateLog) {
    let renderer = MockRenderer::new();
    let sets = renderer.created_descriptor_sets.clone();
    let updates = renderer.descriptor_updates.clone();
    (Arc::new(Mutex::new(renderer)), sets, updates)
}

fn block(binding: u32, size: u32, kind: BlockKind, members: &[(&str, u32, u32)]) -> UniformBlock {
    let mut uniforms = BTreeMap::new();
    for (name, offset, member_size) in members {
        uniforms.insert(name.to_string(), Uniform { offset: *offset, size: *member_size });
    }
    UniformBlock {
        binding,
        size,
        stage_flags: ShaderStageFlags::VERTEX_FRAGMENT,
        kind,
        uniforms,
    }
}

/// Reflection with a uniform block, a storage block, a sampled image,
/// and a push constant block
fn reflection() -> PipelineReflection {
    let mut blocks = FxHashMap::default();
    blocks.insert(
        "scene".to_string(),
        block(0, 128, BlockKind::Uniform, &[("projection", 0, 64), ("view", 64, 64)]),
    );
    blocks.insert(
        "instances".to_string(),
        block(1, 64 * 1024, BlockKind::Storage, &[("transforms", 0, 64 * 1024)]),
    );

    let mut bindings = FxHashMap::default();
    bindings.insert("scene".to_string(), ReflectedBinding {
        set: 0,
        binding: 0,
        descriptor_type: DescriptorType::UniformBuffer,
        count: 1,
        stage_flags: ShaderStageFlags::VERTEX_FRAGMENT,
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
        push_constant: Some(block(0, 64, BlockKind::Push, &[("model", 0, 64)])),
        set_count: 1,
    }
}

fn pipeline(name: &str) -> Arc<dyn Pipeline> {
    Arc::new(MockPipeline::with_reflection(name.to_string(), reflection()))
}

// ============================================================================
// PIPELINE BINDING
// ============================================================================

#[test]
fn test_first_update_allocates_one_set_per_frame() {
    let (renderer, sets, _) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer, 0);
    let pipeline = pipeline("p");

    let status = handler.update(&pipeline, 0).unwrap();
    assert_eq!(status, UpdateStatus::Rebuilt);
    assert_eq!(sets.lock().unwrap().len(), crate::renderer::MAX_FRAMES_IN_FLIGHT);
    for frame in 0..crate::renderer::MAX_FRAMES_IN_FLIGHT {
        assert!(handler.descriptor_set(frame).is_some());
    }
}

#[test]
fn test_same_pipeline_does_not_reallocate() {
    let (renderer, sets, _) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer, 0);
    let pipeline = pipeline("p");

    handler.update(&pipeline, 0).unwrap();
    let status = handler.update(&pipeline, 0).unwrap();
    assert_eq!(status, UpdateStatus::Ready);
    assert_eq!(sets.lock().unwrap().len(), crate::renderer::MAX_FRAMES_IN_FLIGHT);
}

#[test]
fn test_pipeline_swap_reallocates_all_frame_sets() {
    let (renderer, sets, updates) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer.clone(), 0);
    let first = pipeline("first");
    let second = pipeline("second");

    handler.update(&first, 0).unwrap();
    let mut uniforms = UniformHandler::new(renderer.clone());
    handler.push_uniform("scene", &mut uniforms).unwrap();
    handler.update(&first, 0).unwrap();

    // Rebind to a different pipeline object
    let status = handler.update(&second, 0).unwrap();
    assert_eq!(status, UpdateStatus::Rebuilt);
    assert_eq!(sets.lock().unwrap().len(), 2 * crate::renderer::MAX_FRAMES_IN_FLIGHT);

    // Staged writes were dropped with the old sets; nothing to apply yet
    let count_before = updates.lock().unwrap().len();
    handler.update(&second, 0).unwrap();
    assert_eq!(updates.lock().unwrap().len(), count_before);

    // Re-pushing restores the write and it lands in the new set
    handler.push_uniform("scene", &mut uniforms).unwrap();
    handler.update(&second, 0).unwrap();
    let all = updates.lock().unwrap();
    let last = all.last().unwrap();
    assert_eq!(last.set_id, sets.lock().unwrap()[crate::renderer::MAX_FRAMES_IN_FLIGHT]);
}

// ============================================================================
// DIRTY TRACKING
// ============================================================================

#[test]
fn test_rebuilt_handler_marks_writes_pending() {
    let (renderer, _, updates) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer.clone(), 0);
    let pipeline = pipeline("p");
    let mut uniforms = UniformHandler::new(renderer);

    handler.update(&pipeline, 0).unwrap();
    handler.push_uniform("scene", &mut uniforms).unwrap();

    handler.update(&pipeline, 0).unwrap();
    assert_eq!(updates.lock().unwrap().len(), 1);
    assert_eq!(updates.lock().unwrap()[0].bindings, vec![0]);
}

#[test]
fn test_unchanged_handler_does_not_rewrite() {
    let (renderer, _, updates) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer.clone(), 0);
    let pipeline = pipeline("p");
    let mut uniforms = UniformHandler::new(renderer);

    handler.update(&pipeline, 0).unwrap();
    handler.push_uniform("scene", &mut uniforms).unwrap();
    handler.update(&pipeline, 0).unwrap();
    handler.update(&pipeline, 1).unwrap();
    let count = updates.lock().unwrap().len();

    // Same handler, same buffer: no pending writes raised
    handler.push_uniform("scene", &mut uniforms).unwrap();
    handler.update(&pipeline, 0).unwrap();
    handler.update(&pipeline, 1).unwrap();
    assert_eq!(updates.lock().unwrap().len(), count);
}

#[test]
fn test_new_name_marks_writes_pending() {
    let (renderer, _, updates) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer.clone(), 0);
    let pipeline = pipeline("p");
    let mut uniforms = UniformHandler::new(renderer.clone());
    let mut storage = StorageHandler::new(renderer);

    handler.update(&pipeline, 0).unwrap();
    handler.push_uniform("scene", &mut uniforms).unwrap();
    handler.update(&pipeline, 0).unwrap();

    handler.push_storage("instances", &mut storage).unwrap();
    handler.update(&pipeline, 0).unwrap();

    // The batch re-applies every staged write, sorted by binding
    let all = updates.lock().unwrap();
    assert_eq!(all.last().unwrap().bindings, vec![0, 1]);
}

#[test]
fn test_image_swap_marks_writes_pending() {
    let (renderer, _, updates) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer, 0);
    let pipeline = pipeline("p");

    let first: Arc<dyn Texture> = Arc::new(MockTexture::new(256, 256, 1, "first".to_string()));
    let second: Arc<dyn Texture> = Arc::new(MockTexture::new(256, 256, 1, "second".to_string()));
    let mut image = SampledImage::new(first, SamplerType::LinearRepeat);

    handler.update(&pipeline, 0).unwrap();
    handler.push_descriptor("albedo", &image).unwrap();
    handler.update(&pipeline, 0).unwrap();
    let count = updates.lock().unwrap().len();

    // Same texture again: nothing pending
    handler.push_descriptor("albedo", &image).unwrap();
    handler.update(&pipeline, 0).unwrap();
    assert_eq!(updates.lock().unwrap().len(), count);

    // Swapping the texture raises the pending flag
    image.set_texture(second);
    handler.push_descriptor("albedo", &image).unwrap();
    handler.update(&pipeline, 0).unwrap();
    assert_eq!(updates.lock().unwrap().len(), count + 1);
    assert_eq!(updates.lock().unwrap().last().unwrap().bindings, vec![2]);
}

// ============================================================================
// PER-FRAME ISOLATION
// ============================================================================

#[test]
fn test_update_touches_only_the_current_frame_set() {
    let (renderer, sets, updates) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer.clone(), 0);
    let pipeline = pipeline("p");
    let mut uniforms = UniformHandler::new(renderer);

    handler.update(&pipeline, 0).unwrap();
    handler.push_uniform("scene", &mut uniforms).unwrap();

    handler.update(&pipeline, 0).unwrap();
    let set_ids = sets.lock().unwrap().clone();
    {
        let all = updates.lock().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].set_id, set_ids[0]);
    }

    // Frame 1 catches up on its own turn
    handler.update(&pipeline, 1).unwrap();
    {
        let all = updates.lock().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].set_id, set_ids[1]);
    }

    // Both slots clean now
    handler.update(&pipeline, 0).unwrap();
    handler.update(&pipeline, 1).unwrap();
    assert_eq!(updates.lock().unwrap().len(), 2);
}

// ============================================================================
// ERRORS AND EDGE CASES
// ============================================================================

#[test]
fn test_push_unknown_name_fails_without_touching_handler() {
    let (renderer, _, _) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer.clone(), 0);
    let pipeline = pipeline("p");
    let mut uniforms = UniformHandler::new(renderer);

    handler.update(&pipeline, 0).unwrap();
    handler.push_uniform("scene", &mut uniforms).unwrap();
    let buffer = uniforms.buffer().unwrap().clone();

    assert!(handler.push_uniform("bogus", &mut uniforms).is_err());
    assert!(Arc::ptr_eq(&buffer, uniforms.buffer().unwrap()));
}

#[test]
fn test_push_unknown_image_name_fails() {
    let (renderer, _, _) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer, 0);
    let pipeline = pipeline("p");

    let texture: Arc<dyn Texture> = Arc::new(MockTexture::new(64, 64, 1, "t".to_string()));
    let image = SampledImage::new(texture, SamplerType::LinearClamp);

    handler.update(&pipeline, 0).unwrap();
    assert!(handler.push_descriptor("missing", &image).is_err());
}

#[test]
fn test_push_before_pipeline_bound_is_noop() {
    let (renderer, _, updates) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer.clone(), 0);
    let mut uniforms = UniformHandler::new(renderer);

    handler.push_uniform("scene", &mut uniforms).unwrap();
    assert!(uniforms.buffer().is_none());
    assert!(updates.lock().unwrap().is_empty());
}

#[test]
fn test_push_constants_sizes_handler_against_pipeline() {
    let (renderer, _, updates) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer, 0);
    let pipeline = pipeline("p");
    let mut push = PushHandler::new();

    handler.update(&pipeline, 0).unwrap();
    let count = updates.lock().unwrap().len();
    handler.push_constants(&mut push).unwrap();

    assert_eq!(push.data().len(), 64);
    // Push constants never dirty the descriptor sets
    handler.update(&pipeline, 0).unwrap();
    assert_eq!(updates.lock().unwrap().len(), count);
}

// ============================================================================
// BINDING
// ============================================================================

#[test]
fn test_bind_descriptors_records_current_frame_set() {
    let (renderer, _, _) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer.clone(), 0);
    let pipeline = pipeline("p");
    let mut uniforms = UniformHandler::new(renderer);

    handler.update(&pipeline, 0).unwrap();
    handler.push_uniform("scene", &mut uniforms).unwrap();
    handler.update(&pipeline, 0).unwrap();

    let mut cmd = MockCommandList::new();
    handler.bind_descriptors(&mut cmd, 0).unwrap();
    assert_eq!(cmd.commands, vec!["bind_descriptor_set(set=0)"]);
}

#[test]
fn test_bind_descriptors_out_of_range_frame_fails() {
    let (renderer, _, _) = test_renderer();
    let mut handler = DescriptorHandler::new(renderer, 1);
    let pipeline = pipeline("p");
    handler.update(&pipeline, 0).unwrap();

    let mut cmd = MockCommandList::new();
    assert!(handler.bind_descriptors(&mut cmd, 5).is_err());
    assert!(cmd.commands.is_empty());
}
