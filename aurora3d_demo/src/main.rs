//! Aurora3D demo application
//!
//! Renders a small scene through a three stage render graph:
//!
//! - Stage 0: shadow map, depth only, fixed 2048x2048 viewport
//! - Stage 1: scene pass writing an HDR color target and depth
//! - Stage 2: resolve filter sampling the scene color, then a UI overlay,
//!   written to an offscreen backbuffer that is blitted to the swapchain
//!
//! Shaders are loaded as SPIR-V from `shaders/*.spv`. Compile them with
//! `shaders/compile.sh` (requires glslc) before running.

use std::path::Path;
use std::sync::{Arc, Mutex};

use glam::{Mat4, Quat, Vec3, Vec4};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use aurora_3d_engine::aurora3d::{Engine, Error, Result};
use aurora_3d_engine::aurora3d::render::{
    BlendFactor, BlendOp, BufferDesc, BufferUsage, ColorBlendState, CompareOp,
    DepthBias, DepthStencilState, Framebuffer, FramebufferDesc, PipelineDesc,
    PrimitiveTopology, RasterizationState, Rect2D, RenderPass, Renderer,
    RendererConfig, SamplerType, Shader, ShaderDesc, ShaderStage, Swapchain,
    Texture, TextureDesc, TextureFormat, TextureUsage, VertexAttribute,
    VertexBinding, VertexInputRate, VertexLayout, Viewport,
    MAX_FRAMES_IN_FLIGHT,
};
use aurora_3d_engine::aurora3d::graph::{
    Attachment, PipelineStage, RenderGraph, RenderStage, StageViewport,
    SubpassBinding,
};
use aurora_3d_engine::aurora3d::subrenderers::{
    MeshSubrenderer, ResolveFilter, ShadowSubrenderer, UiSubrenderer, UiWidget,
};
use aurora_3d_engine_renderer_vulkan::VulkanRenderer;

const SHADOW_MAP_SIZE: u32 = 2048;

fn main() {
    Engine::initialize().expect("engine init failed");

    let event_loop = EventLoop::new().expect("event loop creation failed");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::default();
    event_loop.run_app(&mut app).expect("event loop failed");

    Engine::shutdown();
}

#[derive(Default)]
struct DemoApp {
    window: Option<Arc<Window>>,
    state: Option<RenderState>,
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("Aurora3D Demo")
                        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720)),
                )
                .expect("window creation failed"),
        );

        let renderer = VulkanRenderer::new(window.as_ref(), RendererConfig::default())
            .expect("Vulkan renderer creation failed");
        Engine::create_renderer(renderer).expect("renderer registration failed");

        let state = RenderState::new(&window).expect("render state setup failed");

        self.window = Some(window);
        self.state = Some(state);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(state) = &self.state {
                    state.renderer.lock().unwrap().wait_idle().ok();
                }
                self.state = None;
                Engine::destroy_renderer().ok();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    if size.width > 0 && size.height > 0 {
                        state
                            .handle_resize(size.width, size.height)
                            .expect("swapchain resize failed");
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(state) = &mut self.state {
                    state.render_frame().expect("frame render failed");
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

struct RenderState {
    renderer: Arc<Mutex<dyn Renderer>>,
    swapchain: Box<dyn Swapchain>,
    shaders: DemoShaders,
    resources: FrameResources,
    frame_counter: usize,
}

/// Everything sized to the swapchain, rebuilt on resize
struct FrameResources {
    graph: RenderGraph,
    /// Render pass and framebuffer per graph stage, in stage order
    render_passes: Vec<Arc<dyn RenderPass>>,
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    /// Offscreen target blitted to the swapchain each frame
    backbuffer: Arc<dyn Texture>,
}

struct DemoShaders {
    shadow_vert: Arc<dyn Shader>,
    shadow_frag: Arc<dyn Shader>,
    mesh_vert: Arc<dyn Shader>,
    mesh_frag: Arc<dyn Shader>,
    resolve_vert: Arc<dyn Shader>,
    resolve_frag: Arc<dyn Shader>,
    ui_vert: Arc<dyn Shader>,
    ui_frag: Arc<dyn Shader>,
}

impl RenderState {
    fn new(window: &Window) -> Result<Self> {
        let renderer = Engine::renderer()?;

        let swapchain = renderer.lock().unwrap().create_swapchain(window)?;

        let shaders = {
            let mut guard = renderer.lock().unwrap();
            DemoShaders {
                shadow_vert: load_shader(&mut *guard, "shadow.vert.spv", ShaderStage::Vertex)?,
                shadow_frag: load_shader(&mut *guard, "shadow.frag.spv", ShaderStage::Fragment)?,
                mesh_vert: load_shader(&mut *guard, "mesh.vert.spv", ShaderStage::Vertex)?,
                mesh_frag: load_shader(&mut *guard, "mesh.frag.spv", ShaderStage::Fragment)?,
                resolve_vert: load_shader(&mut *guard, "resolve.vert.spv", ShaderStage::Vertex)?,
                resolve_frag: load_shader(&mut *guard, "resolve.frag.spv", ShaderStage::Fragment)?,
                ui_vert: load_shader(&mut *guard, "ui.vert.spv", ShaderStage::Vertex)?,
                ui_frag: load_shader(&mut *guard, "ui.frag.spv", ShaderStage::Fragment)?,
            }
        };

        let resources = build_frame_resources(&renderer, swapchain.as_ref(), &shaders)?;

        Ok(Self {
            renderer,
            swapchain,
            shaders,
            resources,
            frame_counter: 0,
        })
    }

    fn handle_resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.renderer.lock().unwrap().wait_idle()?;
        self.swapchain.recreate(width, height)?;
        // Pipelines reference the stage render passes, so everything
        // downstream of the stage declarations is rebuilt together.
        self.resources =
            build_frame_resources(&self.renderer, self.swapchain.as_ref(), &self.shaders)?;
        Ok(())
    }

    fn render_frame(&mut self) -> Result<()> {
        let frame = self.frame_counter % MAX_FRAMES_IN_FLIGHT;
        let image_index = self.swapchain.acquire_next_image()?;

        let mut cmd = self.renderer.lock().unwrap().create_command_list()?;
        cmd.begin()?;

        for stage_index in 0..self.resources.graph.stage_count() {
            let stage = match self.resources.graph.stage(stage_index) {
                Some(stage) => stage,
                None => break,
            };
            let (viewport_width, viewport_height) = match stage.viewport() {
                Some(viewport) => (viewport.width, viewport.height),
                None => (self.swapchain.width(), self.swapchain.height()),
            };
            let clear_values = stage.clear_values();

            cmd.begin_render_pass(
                &self.resources.render_passes[stage_index],
                &self.resources.framebuffers[stage_index],
                &clear_values,
            )?;
            cmd.set_viewport(Viewport {
                x: 0.0,
                y: 0.0,
                width: viewport_width as f32,
                height: viewport_height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            })?;
            cmd.set_scissor(Rect2D {
                x: 0,
                y: 0,
                width: viewport_width,
                height: viewport_height,
            })?;

            self.resources.graph.render_stage(stage_index, cmd.as_mut(), frame)?;

            cmd.end_render_pass()?;
        }

        self.swapchain.record_present_blit(
            cmd.as_mut(),
            self.resources.backbuffer.as_ref(),
            image_index,
        )?;
        cmd.end()?;

        self.renderer.lock().unwrap().submit_with_swapchain(
            &[cmd.as_ref()],
            self.swapchain.as_ref(),
            image_index,
        )?;
        self.swapchain.present(image_index)?;

        // The command list drops at end of scope; idle before that so the
        // GPU is done reading it.
        self.renderer.lock().unwrap().wait_idle()?;

        self.frame_counter += 1;
        Ok(())
    }
}

/// Build stages, pipelines, subrenderers, and GPU targets
fn build_frame_resources(
    renderer_arc: &Arc<Mutex<dyn Renderer>>,
    swapchain: &dyn Swapchain,
    shaders: &DemoShaders,
) -> Result<FrameResources> {
    let width = swapchain.width();
    let height = swapchain.height();

    // ===== Stage declarations =====

    let shadow_stage = RenderStage::new(
        vec![Attachment::depth(0, "shadow_map")],
        vec![SubpassBinding::new(0, vec![0])],
        Some(StageViewport { width: SHADOW_MAP_SIZE, height: SHADOW_MAP_SIZE }),
    )?;

    let scene_stage = RenderStage::new(
        vec![
            Attachment::image(0, "scene_color", TextureFormat::R16G16B16A16_SFLOAT)
                .with_clear_color([0.05, 0.05, 0.08, 1.0]),
            Attachment::depth(1, "scene_depth"),
        ],
        vec![SubpassBinding::new(0, vec![0, 1])],
        None,
    )?;

    // The backbuffer attachment carries the real swapchain format so the
    // render pass matches the texture it is lowered onto.
    let mut backbuffer_attachment = Attachment::swapchain(0, "backbuffer");
    backbuffer_attachment.format = swapchain.format();
    let present_stage = RenderStage::new(
        vec![backbuffer_attachment],
        vec![SubpassBinding::new(0, vec![0])],
        None,
    )?;

    // ===== Render passes and attachment textures =====

    let mut renderer = renderer_arc.lock().unwrap();

    let shadow_pass = renderer.create_render_pass(&shadow_stage.render_pass_desc())?;
    let scene_pass = renderer.create_render_pass(&scene_stage.render_pass_desc())?;
    let present_pass = renderer.create_render_pass(&present_stage.render_pass_desc())?;

    let shadow_map = renderer.create_texture(TextureDesc {
        width: SHADOW_MAP_SIZE,
        height: SHADOW_MAP_SIZE,
        format: TextureFormat::D32_FLOAT,
        usage: TextureUsage::DepthStencil,
        array_layers: 1,
        mip_levels: 1,
        data: None,
    })?;
    let scene_color = renderer.create_texture(TextureDesc {
        width,
        height,
        format: TextureFormat::R16G16B16A16_SFLOAT,
        usage: TextureUsage::SampledAndRenderTarget,
        array_layers: 1,
        mip_levels: 1,
        data: None,
    })?;
    let scene_depth = renderer.create_texture(TextureDesc {
        width,
        height,
        format: TextureFormat::D32_FLOAT,
        usage: TextureUsage::DepthStencil,
        array_layers: 1,
        mip_levels: 1,
        data: None,
    })?;
    let backbuffer = renderer.create_texture(TextureDesc {
        width,
        height,
        format: swapchain.format(),
        usage: TextureUsage::PresentSource,
        array_layers: 1,
        mip_levels: 1,
        data: None,
    })?;

    let shadow_framebuffer = renderer.create_framebuffer(&FramebufferDesc {
        render_pass: Arc::clone(&shadow_pass),
        targets: vec![renderer.create_render_target_texture(shadow_map.as_ref(), 0, 0)?],
        width: SHADOW_MAP_SIZE,
        height: SHADOW_MAP_SIZE,
    })?;
    let scene_framebuffer = renderer.create_framebuffer(&FramebufferDesc {
        render_pass: Arc::clone(&scene_pass),
        targets: vec![
            renderer.create_render_target_texture(scene_color.as_ref(), 0, 0)?,
            renderer.create_render_target_texture(scene_depth.as_ref(), 0, 0)?,
        ],
        width,
        height,
    })?;
    let present_framebuffer = renderer.create_framebuffer(&FramebufferDesc {
        render_pass: Arc::clone(&present_pass),
        targets: vec![renderer.create_render_target_texture(backbuffer.as_ref(), 0, 0)?],
        width,
        height,
    })?;

    // ===== Pipelines =====

    let shadow_pipeline = renderer.create_pipeline(PipelineDesc {
        vertex_shader: Arc::clone(&shaders.shadow_vert),
        fragment_shader: Arc::clone(&shaders.shadow_frag),
        vertex_layout: position_only_layout(),
        topology: PrimitiveTopology::TriangleList,
        render_pass: Arc::clone(&shadow_pass),
        subpass: 0,
        rasterization: RasterizationState {
            depth_bias: Some(DepthBias {
                constant_factor: 1.25,
                slope_factor: 1.75,
                clamp: 0.0,
            }),
            ..Default::default()
        },
        depth_stencil: DepthStencilState::default(),
        color_blend: ColorBlendState::default(),
    })?;

    let mesh_pipeline = renderer.create_pipeline(PipelineDesc {
        vertex_shader: Arc::clone(&shaders.mesh_vert),
        fragment_shader: Arc::clone(&shaders.mesh_frag),
        vertex_layout: mesh_vertex_layout(),
        topology: PrimitiveTopology::TriangleList,
        render_pass: Arc::clone(&scene_pass),
        subpass: 0,
        rasterization: RasterizationState::default(),
        depth_stencil: DepthStencilState::default(),
        color_blend: ColorBlendState::default(),
    })?;

    let no_depth = DepthStencilState {
        depth_test_enable: false,
        depth_write_enable: false,
        depth_compare_op: CompareOp::Always,
    };

    let resolve_pipeline = renderer.create_pipeline(PipelineDesc {
        vertex_shader: Arc::clone(&shaders.resolve_vert),
        fragment_shader: Arc::clone(&shaders.resolve_frag),
        vertex_layout: VertexLayout::default(),
        topology: PrimitiveTopology::TriangleList,
        render_pass: Arc::clone(&present_pass),
        subpass: 0,
        rasterization: RasterizationState::default(),
        depth_stencil: no_depth,
        color_blend: ColorBlendState::default(),
    })?;

    let ui_pipeline = renderer.create_pipeline(PipelineDesc {
        vertex_shader: Arc::clone(&shaders.ui_vert),
        fragment_shader: Arc::clone(&shaders.ui_frag),
        vertex_layout: VertexLayout::default(),
        topology: PrimitiveTopology::TriangleList,
        render_pass: Arc::clone(&present_pass),
        subpass: 0,
        rasterization: RasterizationState::default(),
        depth_stencil: no_depth,
        color_blend: ColorBlendState {
            blend_enable: true,
            src_color_factor: BlendFactor::SrcAlpha,
            dst_color_factor: BlendFactor::OneMinusSrcAlpha,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
            alpha_blend_op: BlendOp::Add,
        },
    })?;

    // ===== Scene resources =====

    let cube = cube_vertices();
    let vertex_buffer = renderer.create_buffer(BufferDesc {
        size: std::mem::size_of_val(cube.as_slice()) as u64,
        usage: BufferUsage::Vertex,
    })?;
    vertex_buffer.update(0, bytemuck::cast_slice(&cube))?;
    let vertex_count = (cube.len() / 8) as u32;

    // 2x2 white albedo so the mesh pipeline's sampled binding is valid
    let white_texture = renderer.create_texture(TextureDesc {
        width: 2,
        height: 2,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::Sampled,
        array_layers: 1,
        mip_levels: 1,
        data: Some(vec![0xFF; 16]),
    })?;

    drop(renderer);

    // ===== Graph wiring =====

    let instances = cube_instances();
    let aspect = width as f32 / height as f32;

    let mut shadow = ShadowSubrenderer::new(Arc::clone(renderer_arc), shadow_pipeline)?;
    shadow.set_light_space(light_space_matrix());
    shadow.set_mesh(Arc::clone(&vertex_buffer), vertex_count);
    shadow.set_instances(instances.clone());

    let mut mesh = MeshSubrenderer::new(Arc::clone(renderer_arc), mesh_pipeline)?;
    mesh.set_camera(
        Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0),
        Mat4::look_at_rh(Vec3::new(4.0, 3.0, 6.0), Vec3::ZERO, Vec3::Y),
    );
    mesh.set_mesh(vertex_buffer, vertex_count);
    mesh.set_instances(instances);
    mesh.set_albedo(white_texture, SamplerType::LinearRepeat);

    let mut resolve = ResolveFilter::new(Arc::clone(renderer_arc), resolve_pipeline);
    resolve.set_input(Arc::clone(&scene_color));

    let mut ui = UiSubrenderer::new(Arc::clone(renderer_arc), ui_pipeline)?;
    ui.set_widgets(demo_widgets());

    let mut graph = RenderGraph::new();
    let shadow_index = graph.add_render_stage(shadow_stage);
    let scene_index = graph.add_render_stage(scene_stage);
    let present_index = graph.add_render_stage(present_stage);

    graph.add_subrenderer(PipelineStage::new(shadow_index, 0), "shadow", Box::new(shadow))?;
    graph.add_subrenderer(PipelineStage::new(scene_index, 0), "mesh", Box::new(mesh))?;
    graph.add_subrenderer(PipelineStage::new(present_index, 0), "resolve", Box::new(resolve))?;
    graph.add_subrenderer(PipelineStage::new(present_index, 0), "ui", Box::new(ui))?;

    Ok(FrameResources {
        graph,
        render_passes: vec![shadow_pass, scene_pass, present_pass],
        framebuffers: vec![shadow_framebuffer, scene_framebuffer, present_framebuffer],
        backbuffer,
    })
}

// ============================================================================
// Shader and geometry helpers
// ============================================================================

fn load_shader(
    renderer: &mut dyn Renderer,
    file: &str,
    stage: ShaderStage,
) -> Result<Arc<dyn Shader>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders").join(file);
    let code = std::fs::read(&path).map_err(|e| {
        Error::InvalidResource(format!(
            "failed to read shader {} (run shaders/compile.sh first): {}",
            path.display(),
            e
        ))
    })?;

    renderer.create_shader(ShaderDesc {
        code: &code,
        stage,
        entry_point: "main".to_string(),
    })
}

fn mesh_vertex_layout() -> VertexLayout {
    VertexLayout {
        bindings: vec![VertexBinding {
            binding: 0,
            stride: 32,
            input_rate: VertexInputRate::Vertex,
        }],
        attributes: vec![
            VertexAttribute { location: 0, binding: 0, format: TextureFormat::R32G32B32_SFLOAT, offset: 0 },
            VertexAttribute { location: 1, binding: 0, format: TextureFormat::R32G32B32_SFLOAT, offset: 12 },
            VertexAttribute { location: 2, binding: 0, format: TextureFormat::R32G32_SFLOAT, offset: 24 },
        ],
    }
}

/// Same vertex buffer as the mesh pass; the shadow shader only reads position
fn position_only_layout() -> VertexLayout {
    VertexLayout {
        bindings: vec![VertexBinding {
            binding: 0,
            stride: 32,
            input_rate: VertexInputRate::Vertex,
        }],
        attributes: vec![VertexAttribute {
            location: 0,
            binding: 0,
            format: TextureFormat::R32G32B32_SFLOAT,
            offset: 0,
        }],
    }
}

/// Unit cube, 36 vertices of position (3) + normal (3) + uv (2)
fn cube_vertices() -> Vec<f32> {
    // (normal, tangent u, tangent v) per face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    // Two triangles per face in (u, v) corner space
    let corners: [(f32, f32); 6] = [
        (-0.5, -0.5), (0.5, -0.5), (0.5, 0.5),
        (-0.5, -0.5), (0.5, 0.5), (-0.5, 0.5),
    ];

    let mut vertices = Vec::with_capacity(6 * 6 * 8);
    for (normal, tangent_u, tangent_v) in faces {
        for (u, v) in corners {
            for axis in 0..3 {
                vertices.push(normal[axis] * 0.5 + tangent_u[axis] * u + tangent_v[axis] * v);
            }
            vertices.extend_from_slice(&normal);
            vertices.push(u + 0.5);
            vertices.push(v + 0.5);
        }
    }
    vertices
}

fn cube_instances() -> Vec<Mat4> {
    (0..3)
        .map(|i| {
            let offset = (i as f32 - 1.0) * 2.0;
            Mat4::from_rotation_translation(
                Quat::from_rotation_y(i as f32 * 0.6),
                Vec3::new(offset, 0.0, 0.0),
            )
        })
        .collect()
}

fn light_space_matrix() -> Mat4 {
    let projection = Mat4::orthographic_rh(-8.0, 8.0, -8.0, 8.0, 0.1, 20.0);
    let view = Mat4::look_at_rh(Vec3::new(5.0, 8.0, 5.0), Vec3::ZERO, Vec3::Y);
    projection * view
}

fn demo_widgets() -> Vec<UiWidget> {
    vec![
        UiWidget {
            transform: Mat4::from_scale_rotation_translation(
                Vec3::new(0.3, 0.1, 1.0),
                Quat::IDENTITY,
                Vec3::new(-0.65, -0.85, 0.0),
            ),
            color: Vec4::new(0.1, 0.1, 0.1, 0.7),
        },
        UiWidget {
            transform: Mat4::from_scale_rotation_translation(
                Vec3::new(0.05, 0.05, 1.0),
                Quat::IDENTITY,
                Vec3::new(0.9, -0.9, 0.0),
            ),
            color: Vec4::new(0.9, 0.3, 0.2, 1.0),
        },
    ]
}
