/// Unit tests for MockRenderer and associated mock types.

use crate::renderer::mock_renderer::*;
use crate::renderer::{
    Renderer, Buffer, Texture, CommandList, DescriptorSet,
    RenderPass, RenderTarget, Framebuffer,
    BufferDesc, BufferUsage, TextureDesc, TextureFormat, TextureUsage,
    FramebufferDesc, Viewport, Rect2D, ClearValue,
    DescriptorType, WriteDescriptor, WritePayload,
};
use std::sync::Arc;

// ============================================================================
// MockBuffer Tests
// ============================================================================

#[test]
fn test_mock_buffer_creation() {
    let buffer = MockBuffer::new(1024, "test_buffer".to_string());
    assert_eq!(buffer.size(), 1024);
    assert_eq!(buffer.name, "test_buffer");
}

#[test]
fn test_mock_buffer_records_writes() {
    let buffer = MockBuffer::new(1024, "test_buffer".to_string());
    buffer.update(16, &[1u8, 2, 3, 4]).unwrap();

    let writes = buffer.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, 16);
    assert_eq!(writes[0].1, vec![1, 2, 3, 4]);
}

#[test]
fn test_mock_buffer_update_out_of_bounds_fails() {
    let buffer = MockBuffer::new(4, "small".to_string());
    let result = buffer.update(2, &[0u8; 4]);
    assert!(result.is_err());
}

// ============================================================================
// MockTexture Tests
// ============================================================================

#[test]
fn test_mock_texture_info() {
    let texture = MockTexture::new(512, 1024, 4, "array_texture".to_string());

    let info = texture.info();
    assert_eq!(info.width, 512);
    assert_eq!(info.height, 1024);
    assert_eq!(info.array_layers, 4);
    assert!(info.is_array());
}

// ============================================================================
// MockCommandList Tests
// ============================================================================

#[test]
fn test_mock_command_list_records_ordering() {
    let mut cmd = MockCommandList::new();
    let render_pass: Arc<dyn RenderPass> = Arc::new(MockRenderPass::new());
    let framebuffer: Arc<dyn Framebuffer> = Arc::new(MockFramebuffer::new(800, 600));

    cmd.begin().unwrap();
    cmd.begin_render_pass(&render_pass, &framebuffer, &[ClearValue::Color([0.0; 4])]).unwrap();
    cmd.next_subpass().unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();

    assert_eq!(cmd.commands, vec![
        "begin",
        "begin_render_pass(clears=1)",
        "next_subpass",
        "end_render_pass",
        "end",
    ]);
}

#[test]
fn test_mock_command_list_viewport_scissor_draw() {
    let mut cmd = MockCommandList::new();

    cmd.set_viewport(Viewport { x: 0.0, y: 0.0, width: 640.0, height: 480.0, min_depth: 0.0, max_depth: 1.0 }).unwrap();
    cmd.set_scissor(Rect2D { x: 0, y: 0, width: 640, height: 480 }).unwrap();
    cmd.draw(3, 0).unwrap();

    assert_eq!(cmd.commands[0], "set_viewport(640x480)");
    assert_eq!(cmd.commands[1], "set_scissor");
    assert_eq!(cmd.commands[2], "draw(3, 0)");
}

// ============================================================================
// MockRenderer factory tests
// ============================================================================

#[test]
fn test_mock_renderer_tracks_buffers() {
    let mut renderer = MockRenderer::new();

    renderer.create_buffer(BufferDesc { size: 256, usage: BufferUsage::Uniform }).unwrap();
    renderer.create_buffer(BufferDesc { size: 512, usage: BufferUsage::Storage }).unwrap();

    let buffers = renderer.get_created_buffers();
    assert_eq!(buffers, vec!["buffer_256", "buffer_512"]);
}

#[test]
fn test_mock_renderer_create_texture_honors_desc() {
    let mut renderer = MockRenderer::new();

    let texture = renderer.create_texture(TextureDesc {
        width: 128,
        height: 64,
        format: TextureFormat::D32_FLOAT,
        usage: TextureUsage::DepthStencil,
        array_layers: 1,
        mip_levels: 1,
        data: None,
    }).unwrap();

    let info = texture.info();
    assert_eq!(info.format, TextureFormat::D32_FLOAT);
    assert_eq!(info.usage, TextureUsage::DepthStencil);
}

#[test]
fn test_mock_renderer_render_target_validation() {
    let renderer = MockRenderer::new();

    let mut sampled_only = MockTexture::new(64, 64, 1, "sampled".to_string());
    sampled_only.info.usage = TextureUsage::Sampled;
    assert!(renderer.create_render_target_texture(&sampled_only, 0, 0).is_err());

    let renderable = MockTexture::new(64, 64, 2, "renderable".to_string());
    assert!(renderer.create_render_target_texture(&renderable, 1, 0).is_ok());
    assert!(renderer.create_render_target_texture(&renderable, 2, 0).is_err());
}

#[test]
fn test_mock_renderer_render_target_mip_dimensions() {
    let renderer = MockRenderer::new();
    let texture = MockTexture::new(64, 64, 1, "t".to_string());

    let target = renderer.create_render_target_texture(&texture, 0, 0).unwrap();
    assert_eq!(target.width(), 64);
    assert_eq!(target.height(), 64);
}

#[test]
fn test_mock_renderer_framebuffer() {
    let renderer = MockRenderer::new();
    let render_pass: Arc<dyn RenderPass> = Arc::new(MockRenderPass::new());

    let fb = renderer.create_framebuffer(&FramebufferDesc {
        render_pass,
        targets: vec![],
        width: 1920,
        height: 1080,
    }).unwrap();

    assert_eq!(fb.width(), 1920);
    assert_eq!(fb.height(), 1080);
}

// ============================================================================
// Descriptor set tracking tests
// ============================================================================

#[test]
fn test_mock_renderer_tracks_descriptor_sets() {
    let renderer = MockRenderer::new();
    let pipeline: Arc<dyn crate::renderer::Pipeline> =
        Arc::new(MockPipeline::new("p".to_string()));

    let set0 = renderer.create_descriptor_set(&pipeline, 0).unwrap();
    let set1 = renderer.create_descriptor_set(&pipeline, 0).unwrap();
    assert_eq!(renderer.descriptor_set_count(), 2);
    assert_eq!(set0.set_index(), 0);
    assert_eq!(set1.set_index(), 0);
}

#[test]
fn test_mock_renderer_records_descriptor_updates() {
    let mut renderer = MockRenderer::new();
    let pipeline: Arc<dyn crate::renderer::Pipeline> =
        Arc::new(MockPipeline::new("p".to_string()));
    let set = renderer.create_descriptor_set(&pipeline, 0).unwrap();
    let buffer = renderer.create_buffer(BufferDesc { size: 64, usage: BufferUsage::Uniform }).unwrap();

    renderer.update_descriptor_set(&set, &[
        WriteDescriptor {
            binding: 0,
            descriptor_type: DescriptorType::UniformBuffer,
            payload: WritePayload::Buffer { buffer: buffer.clone(), offset: 0, range: 64 },
        },
        WriteDescriptor {
            binding: 2,
            descriptor_type: DescriptorType::UniformBuffer,
            payload: WritePayload::Buffer { buffer, offset: 0, range: 64 },
        },
    ]).unwrap();

    let updates = renderer.get_descriptor_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].bindings, vec![0, 2]);
}

#[test]
fn test_write_payload_same_resources() {
    let mut renderer = MockRenderer::new();
    let a = renderer.create_buffer(BufferDesc { size: 64, usage: BufferUsage::Uniform }).unwrap();
    let b = renderer.create_buffer(BufferDesc { size: 64, usage: BufferUsage::Uniform }).unwrap();

    let pa = WritePayload::Buffer { buffer: a.clone(), offset: 0, range: 64 };
    let pa2 = WritePayload::Buffer { buffer: a, offset: 0, range: 64 };
    let pb = WritePayload::Buffer { buffer: b, offset: 0, range: 64 };

    assert!(pa.same_resources(&pa2));
    assert!(!pa.same_resources(&pb));
}
