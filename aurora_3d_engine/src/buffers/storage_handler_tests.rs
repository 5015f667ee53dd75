//! Unit tests for StorageHandler
//!
//! Covers the fixed-maximum sizing, bulk array pushes, and overflow
//! rejection.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::buffers::{StorageHandler, HandlerStatus};
use crate::renderer::mock_renderer::MockRenderer;
use crate::renderer::{Renderer, ShaderStageFlags, BlockKind, Uniform, UniformBlock};

fn test_renderer() -> (Arc<Mutex<dyn Renderer>>, Arc<Mutex<Vec<String>>>) {
    let renderer = MockRenderer::new();
    let created_buffers = renderer.created_buffers.clone();
    (Arc::new(Mutex::new(renderer)), created_buffers)
}

fn storage_block() -> UniformBlock {
    let mut uniforms = BTreeMap::new();
    uniforms.insert("instances".to_string(), Uniform { offset: 0, size: 64 * 1024 });
    UniformBlock {
        binding: 1,
        size: 64 * 1024,
        stage_flags: ShaderStageFlags::VERTEX,
        kind: BlockKind::Storage,
        uniforms,
    }
}

#[test]
fn test_update_allocates_max_size_buffer() {
    let (renderer, created) = test_renderer();
    let mut handler = StorageHandler::new(renderer);

    let status = handler.update(Some(&storage_block())).unwrap();
    assert_eq!(status, HandlerStatus::Rebuilt);
    assert_eq!(created.lock().unwrap().len(), 1);
    assert_eq!(handler.buffer().unwrap().size(), StorageHandler::MAX_SIZE as u64);
}

#[test]
fn test_same_block_does_not_reallocate() {
    let (renderer, created) = test_renderer();
    let mut handler = StorageHandler::new(renderer);
    let block = storage_block();

    handler.update(Some(&block)).unwrap();
    let first_buffer = handler.buffer().unwrap().clone();

    let status = handler.update(Some(&block)).unwrap();
    assert_eq!(status, HandlerStatus::Unchanged);
    assert_eq!(created.lock().unwrap().len(), 1);
    assert!(Arc::ptr_eq(&first_buffer, handler.buffer().unwrap()));
}

#[test]
fn test_push_slice_stages_bytes() {
    let (renderer, _) = test_renderer();
    let mut handler = StorageHandler::new(renderer);
    handler.update(Some(&storage_block())).unwrap();

    let transforms = vec![[1.0f32; 16]; 8];
    handler.push_slice(&transforms).unwrap();
    assert_eq!(handler.size_bytes(), 8 * 64);
}

#[test]
fn test_push_slice_replaces_previous_contents() {
    let (renderer, _) = test_renderer();
    let mut handler = StorageHandler::new(renderer);
    handler.update(Some(&storage_block())).unwrap();

    handler.push_slice(&vec![[0.0f32; 16]; 100]).unwrap();
    handler.push_slice(&vec![[0.0f32; 16]; 3]).unwrap();
    assert_eq!(handler.size_bytes(), 3 * 64);
}

#[test]
fn test_push_slice_over_max_fails_without_partial_write() {
    let (renderer, _) = test_renderer();
    let mut handler = StorageHandler::new(renderer);
    handler.update(Some(&storage_block())).unwrap();

    handler.push_slice(&vec![[1.0f32; 16]; 4]).unwrap();
    let staged_before = handler.size_bytes();

    // 1025 mat4s = 65600 bytes, over the 65536 maximum
    let too_many = vec![[2.0f32; 16]; 1025];
    let result = handler.push_slice(&too_many);
    assert!(result.is_err());

    // Previous contents untouched
    assert_eq!(handler.size_bytes(), staged_before);
}

#[test]
fn test_push_slice_at_exact_max_succeeds() {
    let (renderer, _) = test_renderer();
    let mut handler = StorageHandler::new(renderer);
    handler.update(Some(&storage_block())).unwrap();

    // 1024 mat4s = exactly 65536 bytes
    let exact = vec![[1.0f32; 16]; 1024];
    handler.push_slice(&exact).unwrap();
    assert_eq!(handler.size_bytes(), StorageHandler::MAX_SIZE);
}

#[test]
fn test_shape_change_clears_staged_contents() {
    let (renderer, created) = test_renderer();
    let mut handler = StorageHandler::new(renderer);
    handler.update(Some(&storage_block())).unwrap();
    handler.push_slice(&vec![[1.0f32; 16]; 8]).unwrap();

    let mut changed = storage_block();
    changed.binding = 2;
    let status = handler.update(Some(&changed)).unwrap();
    assert_eq!(status, HandlerStatus::Rebuilt);
    assert_eq!(handler.size_bytes(), 0);
    assert_eq!(created.lock().unwrap().len(), 2);
}

#[test]
fn test_flush_empty_is_noop() {
    let (renderer, _) = test_renderer();
    let mut handler = StorageHandler::new(renderer);
    handler.update(Some(&storage_block())).unwrap();
    assert!(handler.flush().is_ok());
}
