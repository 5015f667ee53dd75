//! Unit tests for RenderStage
//!
//! Covers construction validation and the lowering to a backend render
//! pass description.

use crate::render_graph::{Attachment, AttachmentKind, RenderStage, SubpassBinding, StageViewport};
use crate::renderer::{TextureFormat, ClearValue};

fn gbuffer_attachments() -> Vec<Attachment> {
    vec![
        Attachment::image(0, "albedo", TextureFormat::R8G8B8A8_UNORM),
        Attachment::image(1, "normals", TextureFormat::R16G16B16A16_SFLOAT),
        Attachment::depth(2, "depth"),
    ]
}

#[test]
fn test_valid_stage_construction() {
    let stage = RenderStage::new(
        gbuffer_attachments(),
        vec![SubpassBinding::new(0, vec![0, 1, 2])],
        None,
    )
    .unwrap();

    assert_eq!(stage.attachments().len(), 3);
    assert_eq!(stage.subpass_count(), 1);
    assert!(stage.viewport().is_none());
    assert_eq!(stage.attachment("normals").unwrap().binding, 1);
    assert_eq!(stage.attachment_by_binding(2).unwrap().kind, AttachmentKind::Depth);
}

#[test]
fn test_stage_without_subpass_bindings_fails() {
    let result = RenderStage::new(gbuffer_attachments(), vec![], None);
    assert!(result.is_err());
}

#[test]
fn test_unknown_attachment_reference_fails() {
    let result = RenderStage::new(
        gbuffer_attachments(),
        vec![SubpassBinding::new(0, vec![0, 7])],
        None,
    );
    assert!(result.is_err());
}

#[test]
fn test_duplicate_attachment_binding_fails() {
    let attachments = vec![
        Attachment::image(0, "a", TextureFormat::R8G8B8A8_UNORM),
        Attachment::image(0, "b", TextureFormat::R8G8B8A8_UNORM),
    ];
    let result = RenderStage::new(attachments, vec![SubpassBinding::new(0, vec![0])], None);
    assert!(result.is_err());
}

#[test]
fn test_repeated_reference_within_subpass_fails() {
    let result = RenderStage::new(
        gbuffer_attachments(),
        vec![SubpassBinding::new(0, vec![1, 1])],
        None,
    );
    assert!(result.is_err());
}

#[test]
fn test_fixed_viewport_is_kept() {
    let stage = RenderStage::new(
        vec![Attachment::depth(0, "shadow_map")],
        vec![SubpassBinding::new(0, vec![0])],
        Some(StageViewport { width: 2048, height: 2048 }),
    )
    .unwrap();

    assert_eq!(stage.viewport(), Some(StageViewport { width: 2048, height: 2048 }));
    assert!(!stage.writes_swapchain());
}

#[test]
fn test_render_pass_desc_lowering() {
    let stage = RenderStage::new(
        gbuffer_attachments(),
        vec![
            SubpassBinding::new(0, vec![0, 1, 2]),
            SubpassBinding::new(1, vec![0]),
        ],
        None,
    )
    .unwrap();

    let desc = stage.render_pass_desc();
    assert_eq!(desc.attachments.len(), 3);
    assert!(desc.attachments[0].sampled);
    assert!(!desc.attachments[2].sampled);
    assert_eq!(desc.subpasses.len(), 2);
    assert_eq!(desc.subpasses[0].color_attachments, vec![0, 1]);
    assert_eq!(desc.subpasses[0].depth_attachment, Some(2));
    assert_eq!(desc.subpasses[1].color_attachments, vec![0]);
    assert_eq!(desc.subpasses[1].depth_attachment, None);
}

#[test]
fn test_clear_values_follow_attachment_order() {
    let attachments = vec![
        Attachment::swapchain(0, "backbuffer").with_clear_color([0.1, 0.2, 0.3, 1.0]),
        Attachment::depth(1, "depth"),
    ];
    let stage = RenderStage::new(
        attachments,
        vec![SubpassBinding::new(0, vec![0, 1])],
        None,
    )
    .unwrap();
    assert!(stage.writes_swapchain());

    let clears = stage.clear_values();
    assert_eq!(clears.len(), 2);
    match clears[0] {
        ClearValue::Color(color) => assert_eq!(color, [0.1, 0.2, 0.3, 1.0]),
        _ => panic!("expected color clear"),
    }
    match clears[1] {
        ClearValue::DepthStencil { depth, stencil } => {
            assert_eq!(depth, 1.0);
            assert_eq!(stencil, 0);
        }
        _ => panic!("expected depth clear"),
    }
}
