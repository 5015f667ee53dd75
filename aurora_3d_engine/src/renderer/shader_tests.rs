//! Unit tests for shader reflection metadata

use std::collections::BTreeMap;
use crate::renderer::{
    ShaderStage, ShaderStageFlags, BlockKind, DescriptorType,
    Uniform, UniformBlock, ReflectedBinding, PipelineReflection,
};

fn block_with(members: &[(&str, u32, u32)]) -> UniformBlock {
    let mut uniforms = BTreeMap::new();
    for (name, offset, size) in members {
        uniforms.insert(name.to_string(), Uniform { offset: *offset, size: *size });
    }
    UniformBlock {
        binding: 0,
        size: members.iter().map(|(_, o, s)| o + s).max().unwrap_or(0),
        stage_flags: ShaderStageFlags::VERTEX,
        kind: BlockKind::Uniform,
        uniforms,
    }
}

// ============================================================================
// STAGE FLAG TESTS
// ============================================================================

#[test]
fn test_stage_flags_from_stages() {
    let flags = ShaderStageFlags::from_stages(&[ShaderStage::Vertex, ShaderStage::Fragment]);
    assert!(flags.contains_vertex());
    assert!(flags.contains_fragment());
    assert!(!flags.contains_compute());
    assert_eq!(flags, ShaderStageFlags::VERTEX_FRAGMENT);
}

#[test]
fn test_stage_flags_union() {
    let flags = ShaderStageFlags::VERTEX.union(ShaderStageFlags::COMPUTE);
    assert!(flags.contains_vertex());
    assert!(flags.contains_compute());
    assert!(!flags.contains_fragment());
}

// ============================================================================
// UNIFORM BLOCK TESTS
// ============================================================================

#[test]
fn test_find_uniform() {
    let block = block_with(&[("projection", 0, 64), ("view", 64, 64)]);

    let view = block.find_uniform("view").unwrap();
    assert_eq!(view.offset, 64);
    assert_eq!(view.size, 64);

    assert!(block.find_uniform("model").is_none());
}

#[test]
fn test_block_equality_same_shape() {
    let a = block_with(&[("projection", 0, 64), ("view", 64, 64)]);
    let b = block_with(&[("view", 64, 64), ("projection", 0, 64)]);

    // Member insertion order must not affect equality
    assert_eq!(a, b);
}

#[test]
fn test_block_inequality_on_member_change() {
    let a = block_with(&[("projection", 0, 64)]);
    let b = block_with(&[("projection", 0, 64), ("view", 64, 64)]);
    assert_ne!(a, b);

    let c = block_with(&[("projection", 16, 64)]);
    assert_ne!(a, c);
}

#[test]
fn test_block_inequality_on_kind_change() {
    let a = block_with(&[("data", 0, 16)]);
    let mut b = a.clone();
    b.kind = BlockKind::Storage;
    assert_ne!(a, b);
}

#[test]
fn test_block_inequality_on_binding_change() {
    let a = block_with(&[("data", 0, 16)]);
    let mut b = a.clone();
    b.binding = 3;
    assert_ne!(a, b);
}

// ============================================================================
// PIPELINE REFLECTION TESTS
// ============================================================================

#[test]
fn test_empty_reflection() {
    let reflection = PipelineReflection::empty();
    assert!(reflection.block("scene").is_none());
    assert!(reflection.binding("scene").is_none());
    assert!(reflection.push_constant().is_none());
    assert_eq!(reflection.set_count, 0);
}

#[test]
fn test_reflection_lookup() {
    let mut reflection = PipelineReflection::empty();
    reflection.blocks.insert("scene".to_string(), block_with(&[("projection", 0, 64)]));
    reflection.bindings.insert("scene".to_string(), ReflectedBinding {
        set: 0,
        binding: 0,
        descriptor_type: DescriptorType::UniformBuffer,
        count: 1,
        stage_flags: ShaderStageFlags::VERTEX,
    });
    reflection.bindings.insert("albedo_map".to_string(), ReflectedBinding {
        set: 0,
        binding: 1,
        descriptor_type: DescriptorType::CombinedImageSampler,
        count: 1,
        stage_flags: ShaderStageFlags::FRAGMENT,
    });
    reflection.set_count = 1;

    assert!(reflection.block("scene").is_some());
    assert_eq!(
        reflection.binding("albedo_map").unwrap().descriptor_type,
        DescriptorType::CombinedImageSampler
    );
    assert!(reflection.block("albedo_map").is_none());
}

#[test]
fn test_reflection_push_constant() {
    let mut reflection = PipelineReflection::empty();
    let mut push = block_with(&[("model", 0, 64)]);
    push.kind = BlockKind::Push;
    reflection.push_constant = Some(push);

    let pc = reflection.push_constant().unwrap();
    assert_eq!(pc.kind, BlockKind::Push);
    assert_eq!(pc.size, 64);
}
