/// VulkanRenderer - Vulkan implementation of the Renderer trait

use aurora_3d_engine::aurora3d::{Renderer, Result, Error};
use aurora_3d_engine::aurora3d::render::{
    CommandList as RendererCommandList, RenderTarget as RendererRenderTarget,
    RenderPass as RendererRenderPass, Swapchain as RendererSwapchain,
    Texture as RendererTexture, Buffer as RendererBuffer,
    Shader as RendererShader, Pipeline as RendererPipeline,
    DescriptorSet as RendererDescriptorSet,
    Framebuffer as RendererFramebuffer, FramebufferDesc,
    RenderPassDesc, WriteDescriptor, WritePayload,
    TextureDesc, TextureInfo, BufferDesc, ShaderDesc, PipelineDesc,
    DescriptorType, ShaderStageFlags, BlockKind,
    Uniform, UniformBlock, ReflectedBinding, PipelineReflection,
    TextureFormat, ShaderStage, BufferUsage, PrimitiveTopology,
    CullMode, FrontFace, PolygonMode, CompareOp, BlendFactor, BlendOp,
    VertexInputRate, TextureUsage, RendererConfig, RendererStats,
    MAX_FRAMES_IN_FLIGHT,
};
use ash::vk;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use winit::window::Window;
use aurora_3d_engine::{engine_info, engine_warn, engine_error, engine_bail, engine_err};

use crate::vulkan_texture::Texture;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_shader::Shader;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_render_target::RenderTarget;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_descriptor_set::DescriptorSet;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_context::GpuContext;

/// Vulkan renderer implementation
///
/// Central factory for GPU resources and command submission, separated
/// from swapchain and presentation logic.
pub struct VulkanRenderer {
    /// Vulkan entry (needed for swapchain surface creation)
    _entry: ash::Entry,
    /// Vulkan instance (also stored in GpuContext, kept here for swapchain creation)
    _instance: ash::Instance,
    /// Physical device
    physical_device: vk::PhysicalDevice,
    /// Logical device reference (also stored in GpuContext)
    device: Arc<ash::Device>,

    /// Graphics queue
    graphics_queue: vk::Queue,
    graphics_queue_family: u32,
    /// Present queue (may be same as graphics)
    present_queue: vk::Queue,
    #[allow(dead_code)]
    present_queue_family: u32,

    /// GPU memory allocator reference (also stored in GpuContext)
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Fences for submit synchronization
    submit_fences: Vec<vk::Fence>,
    current_submit_fence: usize,

    /// Descriptor pools (grows dynamically when exhausted)
    descriptor_pools: Mutex<Vec<vk::DescriptorPool>>,
    /// Internal sampler cache (behind Mutex for &self access)
    sampler_cache: Mutex<SamplerCache>,

    /// Shared GPU context for all resources
    gpu_context: Arc<GpuContext>,
}

// ============================================================================
// Format and state conversions
// ============================================================================

/// Convert TextureFormat (texture and vertex attribute formats) to Vulkan
pub(crate) fn format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::R32G32B32A32_SFLOAT_TEX => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        TextureFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        TextureFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        TextureFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
    }
}

/// Convert ShaderStage to Vulkan shader stage flags
pub(crate) fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
    }
}

/// Convert ShaderStageFlags to Vulkan shader stage flags
pub(crate) fn stage_flags_to_vk(flags: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut vk_flags = vk::ShaderStageFlags::empty();
    if flags.contains_vertex() { vk_flags |= vk::ShaderStageFlags::VERTEX; }
    if flags.contains_fragment() { vk_flags |= vk::ShaderStageFlags::FRAGMENT; }
    if flags.contains_compute() { vk_flags |= vk::ShaderStageFlags::COMPUTE; }
    vk_flags
}

/// Convert DescriptorType to Vulkan descriptor type
pub(crate) fn descriptor_type_to_vk(descriptor_type: DescriptorType) -> vk::DescriptorType {
    match descriptor_type {
        DescriptorType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        DescriptorType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

/// Convert PrimitiveTopology to Vulkan topology
pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub(crate) fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
    }
}

pub(crate) fn blend_op_to_vk(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

impl VulkanRenderer {
    /// Create a descriptor pool with fixed capacity (1024 sets).
    /// Called during init and when the current pool is exhausted.
    fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 2048,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1024,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: 1024,
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(1024);

        unsafe {
            device.create_descriptor_pool(&info, None)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to create descriptor pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
                })
        }
    }

    /// Create a new Vulkan renderer for a window
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: RendererConfig,
    ) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let app_name = CString::new(config.app_name.as_str())
                .unwrap_or_else(|_| CString::new("Aurora3D Application").unwrap());
            let (major, minor, patch) = config.app_version;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Aurora3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle()
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            #[cfg(not(feature = "vulkan-validation"))]
            if config.enable_validation {
                engine_warn!("aurora3d::vulkan",
                    "Validation requested but the vulkan-validation feature is not compiled in");
            }

            let layer_names: Vec<*const std::os::raw::c_char> =
                if cfg!(feature = "vulkan-validation") && config.enable_validation {
                    vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
                } else {
                    vec![]
                };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);

                crate::debug::init_debug_config();

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(
                        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    )
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| {
                        engine_error!("aurora3d::vulkan", "Failed to create debug messenger: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
                    })?;

                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            // Temporary surface for present queue selection
            let window_handle = window.window_handle()
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to get window handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get window handle: {}", e))
                })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("aurora3d::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to enumerate physical devices: {:?}", e);
                    Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
                })?;

            let physical_device = physical_devices
                .into_iter()
                .next()
                .ok_or_else(|| {
                    engine_error!("aurora3d::vulkan", "No Vulkan-capable GPU found");
                    Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
                })?;

            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let graphics_family_index = queue_families
                .iter()
                .enumerate()
                .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|(i, _)| i as u32)
                .ok_or_else(|| {
                    engine_error!("aurora3d::vulkan", "No graphics queue family found");
                    Error::InitializationFailed("No graphics queue family found".to_string())
                })?;

            let present_family_index = (0..queue_families.len() as u32)
                .find(|&i| {
                    surface_loader
                        .get_physical_device_surface_support(physical_device, i, surface)
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    engine_error!("aurora3d::vulkan", "No present queue family found");
                    Error::InitializationFailed("No present queue family found".to_string())
                })?;

            surface_loader.destroy_surface(surface, None);

            let queue_priorities = [1.0];
            let queue_create_infos = if graphics_family_index == present_family_index {
                vec![
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(graphics_family_index)
                        .queue_priorities(&queue_priorities),
                ]
            } else {
                vec![
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(graphics_family_index)
                        .queue_priorities(&queue_priorities),
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_family_index)
                        .queue_priorities(&queue_priorities),
                ]
            };

            let device_extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];

            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = Arc::new(
                instance
                    .create_device(physical_device, &device_create_info, None)
                    .map_err(|e| {
                        engine_error!("aurora3d::vulkan", "Failed to create logical device: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                    })?,
            );

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);
            let present_queue = device.get_device_queue(present_family_index, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: (*device).clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("aurora3d::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let fence_create_info = vk::FenceCreateInfo::default()
                .flags(vk::FenceCreateFlags::SIGNALED);

            let mut submit_fences = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                submit_fences.push(
                    device.create_fence(&fence_create_info, None)
                        .map_err(|e| {
                            engine_error!("aurora3d::vulkan", "Failed to create submit fence: {:?}", e);
                            Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                        })?
                );
            }

            let descriptor_pool = Self::create_descriptor_pool(&device)?;

            // Reusable one-shot upload pool (TRANSIENT + RESET)
            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = device.create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
                })?;

            let allocator_arc = Arc::new(Mutex::new(allocator));
            let gpu_context = Arc::new(GpuContext::new(
                (*device).clone(),
                Arc::clone(&allocator_arc),
                graphics_queue,
                graphics_family_index,
                upload_command_pool,
                instance.clone(),
                #[cfg(feature = "vulkan-validation")]
                debug_utils_loader,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            ));

            engine_info!("aurora3d::vulkan", "Vulkan renderer initialized");

            Ok(Self {
                _entry: entry,
                _instance: instance,
                physical_device,
                device,
                graphics_queue,
                graphics_queue_family: graphics_family_index,
                present_queue,
                present_queue_family: present_family_index,
                allocator: ManuallyDrop::new(allocator_arc),
                submit_fences,
                current_submit_fence: 0,
                descriptor_pools: Mutex::new(vec![descriptor_pool]),
                sampler_cache: Mutex::new(SamplerCache::new(Arc::clone(&gpu_context))),
                gpu_context,
            })
        }
    }

    // ===== SPIR-V reflection =====

    /// Parse SPIR-V bytecode and extract blocks, bindings, and push constants
    fn reflect_shader(
        code: &[u32],
        stage_flags: ShaderStageFlags,
    ) -> Result<(
        FxHashMap<String, UniformBlock>,
        FxHashMap<String, ReflectedBinding>,
        Option<UniformBlock>,
    )> {
        let entry_points = spirq::ReflectConfig::new()
            .spv(code)
            .ref_all_rscs(true)
            .reflect()
            .map_err(|e| engine_err!("aurora3d::vulkan",
                "SPIR-V reflection failed: {:?}", e))?;

        let mut blocks = FxHashMap::default();
        let mut bindings = FxHashMap::default();
        let mut push_constant = None;

        for entry_point in &entry_points {
            for var in entry_point.vars.iter() {
                match var {
                    spirq::var::Variable::Descriptor {
                        name, desc_bind, desc_ty, ty, nbind, ..
                    } => {
                        let name = name.clone().unwrap_or_default();
                        let descriptor_type = Self::spirq_desc_type_to_descriptor_type(desc_ty)?;

                        bindings.insert(name.clone(), ReflectedBinding {
                            set: desc_bind.set(),
                            binding: desc_bind.bind(),
                            descriptor_type,
                            count: *nbind,
                            stage_flags,
                        });

                        let kind = match descriptor_type {
                            DescriptorType::UniformBuffer => Some(BlockKind::Uniform),
                            DescriptorType::StorageBuffer => Some(BlockKind::Storage),
                            DescriptorType::CombinedImageSampler => None,
                        };
                        if let Some(kind) = kind {
                            blocks.insert(name, UniformBlock {
                                binding: desc_bind.bind(),
                                size: ty.nbyte().unwrap_or(0) as u32,
                                stage_flags,
                                kind,
                                uniforms: Self::spirq_struct_members(ty),
                            });
                        }
                    }
                    spirq::var::Variable::PushConstant { name, ty } => {
                        let _ = name;
                        push_constant = Some(UniformBlock {
                            binding: 0,
                            size: ty.nbyte().unwrap_or(0) as u32,
                            stage_flags,
                            kind: BlockKind::Push,
                            uniforms: Self::spirq_struct_members(ty),
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok((blocks, bindings, push_constant))
    }

    /// Convert spirq descriptor type to engine DescriptorType
    fn spirq_desc_type_to_descriptor_type(
        desc_ty: &spirq::ty::DescriptorType,
    ) -> Result<DescriptorType> {
        use spirq::ty::DescriptorType as SpirqType;
        match desc_ty {
            SpirqType::UniformBuffer() => Ok(DescriptorType::UniformBuffer),
            SpirqType::StorageBuffer(..) => Ok(DescriptorType::StorageBuffer),
            SpirqType::CombinedImageSampler() => Ok(DescriptorType::CombinedImageSampler),
            SpirqType::SampledImage() => Ok(DescriptorType::CombinedImageSampler),
            SpirqType::Sampler() => Ok(DescriptorType::CombinedImageSampler),
            other => {
                engine_bail!("aurora3d::vulkan",
                    "Unsupported SPIR-V descriptor type: {:?}", other);
            }
        }
    }

    /// Extract top-level struct members as named uniforms (UBO/SSBO/push blocks)
    fn spirq_struct_members(ty: &spirq::ty::Type) -> BTreeMap<String, Uniform> {
        let mut uniforms = BTreeMap::new();
        if let spirq::ty::Type::Struct(st) = ty {
            for member in &st.members {
                let name = member.name.clone().unwrap_or_default();
                uniforms.insert(name, Uniform {
                    offset: member.offset.unwrap_or(0) as u32,
                    size: member.ty.nbyte().unwrap_or(0) as u32,
                });
            }
        }
        uniforms
    }

    /// Merge vertex + fragment stage reflections into a PipelineReflection
    ///
    /// Entries declared by both stages are merged by name with their stage
    /// flags unioned. Conflicting shapes under the same name are an error.
    fn merge_shader_reflections(desc: &PipelineDesc) -> Result<PipelineReflection> {
        let vk_vs = unsafe { &*(Arc::as_ptr(&desc.vertex_shader) as *const Shader) };
        let vk_fs = unsafe { &*(Arc::as_ptr(&desc.fragment_shader) as *const Shader) };

        let mut blocks = vk_vs.blocks.clone();
        for (name, fs_block) in &vk_fs.blocks {
            if let Some(existing) = blocks.get_mut(name) {
                if existing.binding != fs_block.binding
                    || existing.size != fs_block.size
                    || existing.uniforms != fs_block.uniforms
                {
                    engine_bail!("aurora3d::vulkan",
                        "Block \"{}\" has different shapes in vertex and fragment stages", name);
                }
                existing.stage_flags = existing.stage_flags.union(fs_block.stage_flags);
            } else {
                blocks.insert(name.clone(), fs_block.clone());
            }
        }

        let mut bindings = vk_vs.bindings.clone();
        for (name, fs_binding) in &vk_fs.bindings {
            if let Some(existing) = bindings.get_mut(name) {
                if existing.set != fs_binding.set
                    || existing.binding != fs_binding.binding
                    || existing.descriptor_type != fs_binding.descriptor_type
                {
                    engine_bail!("aurora3d::vulkan",
                        "Binding \"{}\" has different shapes in vertex and fragment stages", name);
                }
                existing.stage_flags = existing.stage_flags.union(fs_binding.stage_flags);
            } else {
                bindings.insert(name.clone(), fs_binding.clone());
            }
        }

        let push_constant = match (&vk_vs.push_constant, &vk_fs.push_constant) {
            (Some(vs_pc), Some(fs_pc)) => {
                let mut merged = vs_pc.clone();
                merged.size = merged.size.max(fs_pc.size);
                merged.stage_flags = merged.stage_flags.union(fs_pc.stage_flags);
                merged.uniforms.extend(fs_pc.uniforms.clone());
                Some(merged)
            }
            (Some(pc), None) | (None, Some(pc)) => Some(pc.clone()),
            (None, None) => None,
        };

        let set_count = bindings
            .values()
            .map(|binding| binding.set + 1)
            .max()
            .unwrap_or(0);

        Ok(PipelineReflection {
            blocks,
            bindings,
            push_constant,
            set_count,
        })
    }

    /// Create a Vulkan swapchain (returns the concrete type)
    fn create_vulkan_swapchain(&self, window: &Window) -> Result<Swapchain> {
        let display_handle = window.display_handle()
            .map_err(|e| {
                engine_error!("aurora3d::vulkan", "Failed to get display handle for swapchain: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
        let window_handle = window.window_handle()
            .map_err(|e| {
                engine_error!("aurora3d::vulkan", "Failed to get window handle for swapchain: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

        let surface = unsafe {
            ash_window::create_surface(
                &self._entry,
                &self._instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("aurora3d::vulkan", "Failed to create surface for swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?
        };

        let surface_loader = ash::khr::surface::Instance::new(&self._entry, &self._instance);

        Swapchain::new(
            self.device.clone(),
            self.physical_device,
            &self._instance,
            surface,
            surface_loader,
            self.present_queue,
        )
    }

    /// Map TextureUsage to Vulkan image usage flags
    fn texture_usage_to_vk(usage: TextureUsage) -> vk::ImageUsageFlags {
        match usage {
            TextureUsage::Sampled => {
                vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST
            }
            TextureUsage::RenderTarget => {
                vk::ImageUsageFlags::COLOR_ATTACHMENT
                    | vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
            }
            TextureUsage::SampledAndRenderTarget => {
                vk::ImageUsageFlags::SAMPLED
                    | vk::ImageUsageFlags::COLOR_ATTACHMENT
                    | vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
            }
            TextureUsage::DepthStencil => {
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
            }
            TextureUsage::PresentSource => {
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC
            }
        }
    }

    /// Upload pixel data into layer 0 of a freshly created image
    ///
    /// Records a one-shot command buffer from the shared upload pool:
    /// barrier to TRANSFER_DST, copy from a staging buffer, barrier to
    /// SHADER_READ_ONLY. Blocks until the copy completes.
    fn upload_texture_data(
        &self,
        image: vk::Image,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<()> {
        unsafe {
            // Staging buffer
            let staging_create_info = vk::BufferCreateInfo::default()
                .size(data.len() as u64)
                .usage(vk::BufferUsageFlags::TRANSFER_SRC)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let staging_buffer = self.device.create_buffer(&staging_create_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to create staging buffer for texture upload: {:?}", e))?;

            let staging_requirements = self.device.get_buffer_memory_requirements(staging_buffer);

            let mut staging_allocation = self.allocator.lock().unwrap()
                .allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                    name: "texture_staging_buffer",
                    requirements: staging_requirements,
                    location: gpu_allocator::MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to allocate staging memory for texture upload: {:?}", e))?;

            self.device.bind_buffer_memory(
                staging_buffer,
                staging_allocation.memory(),
                staging_allocation.offset(),
            )
            .map_err(|e| engine_err!("aurora3d::vulkan",
                "Failed to bind staging buffer memory: {:?}", e))?;

            let mapped = staging_allocation.mapped_ptr()
                .ok_or_else(|| engine_err!("aurora3d::vulkan",
                    "Staging buffer is not CPU-accessible"))?
                .as_ptr() as *mut u8;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped, data.len());

            // One-shot command buffer from the shared upload pool
            let upload_pool = *self.gpu_context.upload_command_pool.lock().unwrap();
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(upload_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to allocate upload command buffer: {:?}", e))?;
            let command_buffer = command_buffers[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device.begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to begin upload command buffer: {:?}", e))?;

            let subresource_range = vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            };

            let barrier_to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            self.device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[], &[], &[barrier_to_transfer],
            );

            let region = vk::BufferImageCopy {
                buffer_offset: 0,
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                image_extent: vk::Extent3D { width, height, depth: 1 },
            };

            self.device.cmd_copy_buffer_to_image(
                command_buffer,
                staging_buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            let barrier_to_sampled = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            self.device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[], &[], &[barrier_to_sampled],
            );

            self.device.end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to end upload command buffer: {:?}", e))?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default()
                .command_buffers(&command_buffers);

            self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to submit texture upload: {:?}", e))?;
            self.device.queue_wait_idle(self.graphics_queue)
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to wait for texture upload: {:?}", e))?;

            self.device.free_command_buffers(upload_pool, &command_buffers);
            self.allocator.lock().unwrap().free(staging_allocation).ok();
            self.device.destroy_buffer(staging_buffer, None);

            Ok(())
        }
    }
}

impl Renderer for VulkanRenderer {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        unsafe {
            let format = format_to_vk(desc.format);
            let array_layers = desc.array_layers.max(1);
            let mip_levels = desc.mip_levels.max(1);

            let view_type = if array_layers > 1 {
                vk::ImageViewType::TYPE_2D_ARRAY
            } else {
                vk::ImageViewType::TYPE_2D
            };

            let usage_flags = Self::texture_usage_to_vk(desc.usage);

            let aspect_mask = if desc.format.is_depth() {
                vk::ImageAspectFlags::DEPTH
            } else {
                vk::ImageAspectFlags::COLOR
            };

            if desc.data.is_some() && desc.usage != TextureUsage::Sampled {
                engine_bail!("aurora3d::vulkan",
                    "Initial texture data is only supported for Sampled usage (got {:?})",
                    desc.usage);
            }

            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                })
                .mip_levels(mip_levels)
                .array_layers(array_layers)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage_flags)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = self.device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to create texture image: {:?}", e))?;

            let requirements = self.device.get_image_memory_requirements(image);

            let allocation = self.allocator.lock().unwrap()
                .allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                    name: "texture",
                    requirements,
                    location: gpu_allocator::MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_e| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("aurora3d::vulkan",
                        "Out of GPU memory for texture (size: {}x{}, layers: {}, {:.2} MB)",
                        desc.width, desc.height, array_layers, size_mb);
                    Error::OutOfMemory
                })?;

            self.device.bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to bind texture image memory: {:?}", e))?;

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(view_type)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: mip_levels,
                    base_array_layer: 0,
                    layer_count: array_layers,
                });

            let view = self.device.create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to create texture image view: {:?}", e))?;

            if let Some(data) = &desc.data {
                self.upload_texture_data(image, desc.width, desc.height, data)?;
            }

            let info = TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
                array_layers,
                mip_levels,
            };

            Ok(Arc::new(Texture::new(
                Arc::clone(&self.gpu_context),
                image,
                view,
                allocation,
                info,
            )))
        }
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        unsafe {
            let usage_flags = match desc.usage {
                BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
                BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
                BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
                BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
            };

            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(usage_flags)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to create buffer: {:?}", e))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);

            // Host-visible so Buffer::update writes through the mapped pointer
            let allocation = self.allocator.lock().unwrap()
                .allocate(&gpu_allocator::vulkan::AllocationCreateDesc {
                    name: "buffer",
                    requirements,
                    location: gpu_allocator::MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: gpu_allocator::vulkan::AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_e| {
                    engine_error!("aurora3d::vulkan",
                        "Out of GPU memory for buffer (size: {} bytes)", desc.size);
                    Error::OutOfMemory
                })?;

            self.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to bind buffer memory: {:?}", e))?;

            Ok(Arc::new(Buffer::new(
                Arc::clone(&self.gpu_context),
                buffer,
                allocation,
                desc.size,
            )))
        }
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn RendererShader>> {
        unsafe {
            if desc.code.len() % 4 != 0 {
                engine_bail!("aurora3d::vulkan",
                    "Shader code not 4-byte aligned (size: {} bytes)", desc.code.len());
            }

            let code_u32 = std::slice::from_raw_parts(
                desc.code.as_ptr() as *const u32,
                desc.code.len() / 4,
            );

            let create_info = vk::ShaderModuleCreateInfo::default()
                .code(code_u32);

            let module = self.device.create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to create shader module: {:?}", e))?;

            let stage_flags = ShaderStageFlags::from_stages(&[desc.stage]);
            let (blocks, bindings, push_constant) = Self::reflect_shader(code_u32, stage_flags)?;

            Ok(Arc::new(Shader {
                module,
                stage: shader_stage_to_vk(desc.stage),
                entry_point: desc.entry_point.clone(),
                device: (*self.device).clone(),
                blocks,
                bindings,
                push_constant,
            }))
        }
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        unsafe {
            let vk_render_pass = desc.render_pass.as_ref()
                as *const dyn RendererRenderPass
                as *const RenderPass;
            let vk_render_pass = &*vk_render_pass;

            if desc.subpass as usize >= vk_render_pass.subpass_color_counts.len() {
                engine_bail!("aurora3d::vulkan",
                    "create_pipeline: subpass {} out of range (render pass has {} subpasses)",
                    desc.subpass, vk_render_pass.subpass_color_counts.len());
            }

            let vertex_shader = desc.vertex_shader
                .as_ref() as *const dyn RendererShader as *const Shader;
            let vertex_shader = &*vertex_shader;

            let fragment_shader = desc.fragment_shader
                .as_ref() as *const dyn RendererShader as *const Shader;
            let fragment_shader = &*fragment_shader;

            let entry_point_vert = CString::new(vertex_shader.entry_point.as_str())
                .map_err(|_| engine_err!("aurora3d::vulkan", "Invalid vertex entry point name"))?;
            let entry_point_frag = CString::new(fragment_shader.entry_point.as_str())
                .map_err(|_| engine_err!("aurora3d::vulkan", "Invalid fragment entry point name"))?;

            let shader_stages = [
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vertex_shader.stage)
                    .module(vertex_shader.module)
                    .name(&entry_point_vert),
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(fragment_shader.stage)
                    .module(fragment_shader.module)
                    .name(&entry_point_frag),
            ];

            // Vertex input state
            let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc.vertex_layout.bindings
                .iter()
                .map(|binding| vk::VertexInputBindingDescription {
                    binding: binding.binding,
                    stride: binding.stride,
                    input_rate: match binding.input_rate {
                        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
                        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
                    },
                })
                .collect();

            let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc.vertex_layout.attributes
                .iter()
                .map(|attribute| vk::VertexInputAttributeDescription {
                    location: attribute.location,
                    binding: attribute.binding,
                    format: format_to_vk(attribute.format),
                    offset: attribute.offset,
                })
                .collect();

            let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&vertex_bindings)
                .vertex_attribute_descriptions(&vertex_attributes);

            let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(topology_to_vk(desc.topology))
                .primitive_restart_enable(false);

            // Viewport state (dynamic)
            let viewports = [vk::Viewport::default()];
            let scissors = [vk::Rect2D::default()];
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewports(&viewports)
                .scissors(&scissors);

            let rasterization_state = {
                let mut info = vk::PipelineRasterizationStateCreateInfo::default()
                    .depth_clamp_enable(false)
                    .rasterizer_discard_enable(false)
                    .polygon_mode(polygon_mode_to_vk(desc.rasterization.polygon_mode))
                    .line_width(1.0)
                    .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
                    .front_face(front_face_to_vk(desc.rasterization.front_face));
                if let Some(bias) = desc.rasterization.depth_bias {
                    info = info
                        .depth_bias_enable(true)
                        .depth_bias_constant_factor(bias.constant_factor)
                        .depth_bias_slope_factor(bias.slope_factor)
                        .depth_bias_clamp(bias.clamp);
                } else {
                    info = info.depth_bias_enable(false);
                }
                info
            };

            let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(desc.depth_stencil.depth_test_enable)
                .depth_write_enable(desc.depth_stencil.depth_write_enable)
                .depth_compare_op(compare_op_to_vk(desc.depth_stencil.depth_compare_op))
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false);

            let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
                .sample_shading_enable(false)
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            // One blend attachment per color attachment of the target subpass
            let color_blend_attachment = {
                let mut attachment = vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
                    .blend_enable(desc.color_blend.blend_enable);
                if desc.color_blend.blend_enable {
                    attachment = attachment
                        .src_color_blend_factor(blend_factor_to_vk(desc.color_blend.src_color_factor))
                        .dst_color_blend_factor(blend_factor_to_vk(desc.color_blend.dst_color_factor))
                        .color_blend_op(blend_op_to_vk(desc.color_blend.color_blend_op))
                        .src_alpha_blend_factor(blend_factor_to_vk(desc.color_blend.src_alpha_factor))
                        .dst_alpha_blend_factor(blend_factor_to_vk(desc.color_blend.dst_alpha_factor))
                        .alpha_blend_op(blend_op_to_vk(desc.color_blend.alpha_blend_op));
                }
                attachment
            };

            let color_attachment_count = vk_render_pass.subpass_color_counts[desc.subpass as usize];
            let color_blend_attachments =
                vec![color_blend_attachment; color_attachment_count as usize];

            let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(&color_blend_attachments);

            let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
                .dynamic_states(&dynamic_states);

            // Merge SPIR-V reflections from vertex + fragment stages.
            // Descriptor set layouts and push constant ranges derive from it.
            let reflection = Self::merge_shader_reflections(&desc)?;

            let mut set_bindings: Vec<Vec<vk::DescriptorSetLayoutBinding>> =
                vec![Vec::new(); reflection.set_count as usize];
            for binding in reflection.bindings.values() {
                set_bindings[binding.set as usize].push(
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(binding.binding)
                        .descriptor_type(descriptor_type_to_vk(binding.descriptor_type))
                        .descriptor_count(binding.count)
                        .stage_flags(stage_flags_to_vk(binding.stage_flags)),
                );
            }

            let mut descriptor_set_layouts: Vec<vk::DescriptorSetLayout> = Vec::new();
            for bindings in &set_bindings {
                let layout_create = vk::DescriptorSetLayoutCreateInfo::default()
                    .bindings(bindings);

                let ds_layout = self.device.create_descriptor_set_layout(&layout_create, None)
                    .map_err(|e| engine_err!("aurora3d::vulkan",
                        "Failed to create descriptor set layout: {:?}", e))?;

                descriptor_set_layouts.push(ds_layout);
            }

            let push_constant_ranges: Vec<vk::PushConstantRange> = reflection
                .push_constant
                .iter()
                .map(|block| vk::PushConstantRange {
                    stage_flags: stage_flags_to_vk(block.stage_flags),
                    offset: 0,
                    size: block.size,
                })
                .collect();

            let mut layout_create_info = vk::PipelineLayoutCreateInfo::default();

            if !descriptor_set_layouts.is_empty() {
                layout_create_info = layout_create_info.set_layouts(&descriptor_set_layouts);
            }
            if !push_constant_ranges.is_empty() {
                layout_create_info = layout_create_info.push_constant_ranges(&push_constant_ranges);
            }

            let layout = self.device.create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to create pipeline layout: {:?}", e))?;

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .depth_stencil_state(&depth_stencil_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .dynamic_state(&dynamic_state)
                .layout(layout)
                .render_pass(vk_render_pass.render_pass)
                .subpass(desc.subpass);

            let pipelines = self.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            )
            .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to create graphics pipeline: {:?}", e.1))?;

            let pipeline = pipelines[0];

            Ok(Arc::new(Pipeline {
                pipeline,
                pipeline_layout: layout,
                descriptor_set_layouts,
                device: (*self.device).clone(),
                reflection,
            }))
        }
    }

    fn create_command_list(&self) -> Result<Box<dyn RendererCommandList>> {
        let cmd_list = CommandList::new(
            self.device.clone(),
            self.graphics_queue_family,
        )?;
        Ok(Box::new(cmd_list))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RendererRenderPass>> {
        if desc.subpasses.is_empty() {
            engine_bail!("aurora3d::vulkan", "Render pass must have at least one subpass");
        }

        unsafe {
            let mut attachments = Vec::with_capacity(desc.attachments.len());
            for attachment in &desc.attachments {
                let is_depth = attachment.format.is_depth();
                let final_layout = if is_depth {
                    vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
                } else if attachment.sampled {
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
                } else {
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
                };

                let (load_op, initial_layout) = if attachment.clear {
                    (vk::AttachmentLoadOp::CLEAR, vk::ImageLayout::UNDEFINED)
                } else {
                    (vk::AttachmentLoadOp::LOAD, final_layout)
                };

                attachments.push(vk::AttachmentDescription::default()
                    .format(format_to_vk(attachment.format))
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(load_op)
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(initial_layout)
                    .final_layout(final_layout));
            }

            // Attachment references need stable storage while the subpass
            // descriptions borrow them.
            let mut color_refs: Vec<Vec<vk::AttachmentReference>> = Vec::new();
            let mut input_refs: Vec<Vec<vk::AttachmentReference>> = Vec::new();
            let mut depth_refs: Vec<Option<vk::AttachmentReference>> = Vec::new();

            for subpass in &desc.subpasses {
                for &index in subpass.color_attachments.iter().chain(
                    subpass.depth_attachment.iter()).chain(subpass.input_attachments.iter())
                {
                    if index as usize >= desc.attachments.len() {
                        engine_bail!("aurora3d::vulkan",
                            "Subpass references attachment {} but render pass has {} attachments",
                            index, desc.attachments.len());
                    }
                }

                color_refs.push(
                    subpass.color_attachments.iter()
                        .map(|&index| vk::AttachmentReference::default()
                            .attachment(index)
                            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL))
                        .collect(),
                );
                input_refs.push(
                    subpass.input_attachments.iter()
                        .map(|&index| vk::AttachmentReference::default()
                            .attachment(index)
                            .layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL))
                        .collect(),
                );
                depth_refs.push(subpass.depth_attachment.map(|index| {
                    vk::AttachmentReference::default()
                        .attachment(index)
                        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                }));
            }

            let mut subpasses = Vec::with_capacity(desc.subpasses.len());
            for i in 0..desc.subpasses.len() {
                let mut subpass = vk::SubpassDescription::default()
                    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                    .color_attachments(&color_refs[i])
                    .input_attachments(&input_refs[i]);

                if let Some(ref depth_ref) = depth_refs[i] {
                    subpass = subpass.depth_stencil_attachment(depth_ref);
                }

                subpasses.push(subpass);
            }

            let has_depth = depth_refs.iter().any(|depth| depth.is_some());
            let (stage_mask, access_mask) = if has_depth {
                (
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                    vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                )
            } else {
                (
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                    vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                )
            };

            let mut dependencies = vec![
                vk::SubpassDependency::default()
                    .src_subpass(vk::SUBPASS_EXTERNAL)
                    .dst_subpass(0)
                    .src_stage_mask(stage_mask)
                    .src_access_mask(vk::AccessFlags::empty())
                    .dst_stage_mask(stage_mask)
                    .dst_access_mask(access_mask),
            ];

            // Chain consecutive subpasses: later passes read earlier output
            // as input attachments in the fragment shader.
            for i in 1..desc.subpasses.len() as u32 {
                dependencies.push(
                    vk::SubpassDependency::default()
                        .src_subpass(i - 1)
                        .dst_subpass(i)
                        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                        .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                        .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
                        .dst_access_mask(vk::AccessFlags::INPUT_ATTACHMENT_READ)
                        .dependency_flags(vk::DependencyFlags::BY_REGION),
                );
            }

            let render_pass_info = vk::RenderPassCreateInfo::default()
                .attachments(&attachments)
                .subpasses(&subpasses)
                .dependencies(&dependencies);

            let render_pass = self.device.create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to create render pass: {:?}", e))?;

            let subpass_color_counts = desc.subpasses
                .iter()
                .map(|subpass| subpass.color_attachments.len() as u32)
                .collect();

            Ok(Arc::new(RenderPass {
                render_pass,
                subpass_color_counts,
                device: (*self.device).clone(),
            }))
        }
    }

    fn create_render_target_texture(
        &self,
        texture: &dyn RendererTexture,
        layer: u32,
        mip_level: u32,
    ) -> Result<Arc<dyn RendererRenderTarget>> {
        let info = texture.info();

        match info.usage {
            TextureUsage::RenderTarget
            | TextureUsage::SampledAndRenderTarget
            | TextureUsage::DepthStencil
            | TextureUsage::PresentSource => {}
            _ => {
                engine_bail!("aurora3d::vulkan",
                    "create_render_target_texture: texture usage {:?} is not renderable",
                    info.usage);
            }
        }

        if layer >= info.array_layers {
            engine_bail!("aurora3d::vulkan",
                "create_render_target_texture: layer {} out of range (array_layers = {})",
                layer, info.array_layers);
        }

        if mip_level >= info.mip_levels {
            engine_bail!("aurora3d::vulkan",
                "create_render_target_texture: mip_level {} out of range (mip_levels = {})",
                mip_level, info.mip_levels);
        }

        unsafe {
            let vk_texture = texture as *const dyn RendererTexture as *const Texture;
            let vk_texture = &*vk_texture;

            let format = format_to_vk(info.format);
            let aspect_mask = if info.format.is_depth() {
                vk::ImageAspectFlags::DEPTH
            } else {
                vk::ImageAspectFlags::COLOR
            };

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(vk_texture.image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: mip_level,
                    level_count: 1,
                    base_array_layer: layer,
                    layer_count: 1,
                });

            let view = self.device.create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to create image view for render target: {:?}", e))?;

            let mip_width = (info.width >> mip_level).max(1);
            let mip_height = (info.height >> mip_level).max(1);

            // RenderTarget owns the image view but NOT the VkImage
            Ok(Arc::new(RenderTarget::new_texture_target(
                mip_width,
                mip_height,
                info.format,
                view,
                (*self.device).clone(),
            )))
        }
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn RendererFramebuffer>> {
        unsafe {
            let vk_render_pass = desc.render_pass.as_ref()
                as *const dyn RendererRenderPass
                as *const RenderPass;
            let vk_render_pass = &*vk_render_pass;

            let attachments: Vec<vk::ImageView> = desc.targets
                .iter()
                .map(|target| {
                    let vk_target = target.as_ref()
                        as *const dyn RendererRenderTarget
                        as *const RenderTarget;
                    (*vk_target).image_view
                })
                .collect();

            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(vk_render_pass.render_pass)
                .attachments(&attachments)
                .width(desc.width)
                .height(desc.height)
                .layers(1);

            let framebuffer = self.device.create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!("aurora3d::vulkan",
                    "Failed to create framebuffer: {:?}", e))?;

            Ok(Arc::new(Framebuffer::new(
                framebuffer, desc.width, desc.height, (*self.device).clone(),
            )))
        }
    }

    fn create_descriptor_set(
        &self,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
    ) -> Result<Arc<dyn RendererDescriptorSet>> {
        unsafe {
            let vk_pipeline = pipeline.as_ref() as *const dyn RendererPipeline as *const Pipeline;
            let vk_pipeline = &*vk_pipeline;

            if set_index as usize >= vk_pipeline.descriptor_set_layouts.len() {
                engine_bail!("aurora3d::vulkan",
                    "create_descriptor_set: set_index {} out of range (pipeline has {} layouts)",
                    set_index, vk_pipeline.descriptor_set_layouts.len());
            }

            let layouts = [vk_pipeline.descriptor_set_layouts[set_index as usize]];

            // Allocate from the current pool, growing when exhausted
            let descriptor_sets = {
                let mut pools = self.descriptor_pools.lock()
                    .map_err(|_| Error::BackendError("Descriptor pool lock poisoned".to_string()))?;
                let current_pool = *pools.last()
                    .ok_or_else(|| Error::BackendError("No descriptor pool available".to_string()))?;
                let allocate_info = vk::DescriptorSetAllocateInfo::default()
                    .descriptor_pool(current_pool)
                    .set_layouts(&layouts);

                match self.device.allocate_descriptor_sets(&allocate_info) {
                    Ok(sets) => sets,
                    Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) => {
                        let new_pool = Self::create_descriptor_pool(&self.device)?;
                        pools.push(new_pool);
                        engine_info!("aurora3d::vulkan",
                            "Descriptor pool exhausted, created new pool (total: {})",
                            pools.len()
                        );
                        let retry_info = vk::DescriptorSetAllocateInfo::default()
                            .descriptor_pool(new_pool)
                            .set_layouts(&layouts);
                        self.device.allocate_descriptor_sets(&retry_info)
                            .map_err(|e| engine_err!("aurora3d::vulkan",
                                "Failed to allocate descriptor set after pool growth: {:?}", e))?
                    }
                    Err(e) => return Err(engine_err!("aurora3d::vulkan",
                        "Failed to allocate descriptor set: {:?}", e)),
                }
            };

            Ok(Arc::new(DescriptorSet {
                descriptor_set: descriptor_sets[0],
                set_index,
            }))
        }
    }

    fn update_descriptor_set(
        &self,
        set: &Arc<dyn RendererDescriptorSet>,
        writes: &[WriteDescriptor],
    ) -> Result<()> {
        unsafe {
            let vk_set = set.as_ref() as *const dyn RendererDescriptorSet as *const DescriptorSet;
            let descriptor_set = (*vk_set).descriptor_set;

            // Buffer/image infos must stay alive until the batched call,
            // so collect them all before building the writes.
            let mut buffer_infos: Vec<vk::DescriptorBufferInfo> = Vec::new();
            let mut image_infos: Vec<vk::DescriptorImageInfo> = Vec::new();

            for write in writes {
                match &write.payload {
                    WritePayload::Buffer { buffer, offset, range } => {
                        let vk_buffer = Arc::as_ptr(buffer) as *const Buffer;
                        let vk_buffer = &*vk_buffer;

                        buffer_infos.push(
                            vk::DescriptorBufferInfo::default()
                                .buffer(vk_buffer.buffer)
                                .offset(*offset)
                                .range(*range)
                        );
                    }
                    WritePayload::Image { texture, sampler } => {
                        let vk_texture = Arc::as_ptr(texture) as *const Texture;
                        let vk_texture = &*vk_texture;
                        let vk_sampler = self.sampler_cache.lock()
                            .map_err(|_| Error::BackendError("Sampler cache lock poisoned".to_string()))?
                            .get(*sampler);

                        image_infos.push(
                            vk::DescriptorImageInfo::default()
                                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                                .image_view(vk_texture.view)
                                .sampler(vk_sampler)
                        );
                    }
                }
            }

            let mut vk_writes: Vec<vk::WriteDescriptorSet> = Vec::with_capacity(writes.len());
            let mut buffer_idx = 0usize;
            let mut image_idx = 0usize;

            for write in writes {
                let vk_write = vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(write.binding)
                    .dst_array_element(0)
                    .descriptor_type(descriptor_type_to_vk(write.descriptor_type));

                match &write.payload {
                    WritePayload::Buffer { .. } => {
                        vk_writes.push(
                            vk_write.buffer_info(std::slice::from_ref(&buffer_infos[buffer_idx]))
                        );
                        buffer_idx += 1;
                    }
                    WritePayload::Image { .. } => {
                        vk_writes.push(
                            vk_write.image_info(std::slice::from_ref(&image_infos[image_idx]))
                        );
                        image_idx += 1;
                    }
                }
            }

            self.device.update_descriptor_sets(&vk_writes, &[]);

            Ok(())
        }
    }

    fn create_swapchain(&self, window: &Window) -> Result<Box<dyn RendererSwapchain>> {
        let swapchain = self.create_vulkan_swapchain(window)?;
        Ok(Box::new(swapchain))
    }

    fn submit(&self, commands: &[&dyn RendererCommandList]) -> Result<()> {
        unsafe {
            self.device
                .wait_for_fences(
                    &[self.submit_fences[self.current_submit_fence]],
                    true,
                    u64::MAX,
                )
                .map_err(|e| engine_err!("aurora3d::vulkan", "submit: failed to wait for fence: {:?}", e))?;

            self.device
                .reset_fences(&[self.submit_fences[self.current_submit_fence]])
                .map_err(|e| engine_err!("aurora3d::vulkan", "submit: failed to reset fence: {:?}", e))?;

            let command_buffers: Vec<vk::CommandBuffer> = commands
                .iter()
                .map(|cmd| {
                    let vk_cmd = *cmd as *const dyn RendererCommandList as *const CommandList;
                    (&*vk_cmd).command_buffer()
                })
                .collect();

            let submit_info = vk::SubmitInfo::default()
                .command_buffers(&command_buffers);

            self.device
                .queue_submit(
                    self.graphics_queue,
                    &[submit_info],
                    self.submit_fences[self.current_submit_fence],
                )
                .map_err(|e| engine_err!("aurora3d::vulkan", "submit: failed to submit queue: {:?}", e))?;

            Ok(())
        }
    }

    fn submit_with_swapchain(
        &self,
        commands: &[&dyn RendererCommandList],
        swapchain: &dyn RendererSwapchain,
        image_index: u32,
    ) -> Result<()> {
        let vk_swapchain = swapchain as *const dyn RendererSwapchain as *const Swapchain;
        let vk_swapchain = unsafe { &*vk_swapchain };

        let (wait_semaphore, signal_semaphore) = vk_swapchain.sync_info(image_index);

        unsafe {
            self.device
                .wait_for_fences(
                    &[self.submit_fences[self.current_submit_fence]],
                    true,
                    u64::MAX,
                )
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to wait for submit fence (swapchain): {:?}", e))?;

            self.device
                .reset_fences(&[self.submit_fences[self.current_submit_fence]])
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to reset submit fence (swapchain): {:?}", e))?;

            let command_buffers: Vec<vk::CommandBuffer> = commands
                .iter()
                .map(|cmd| {
                    let vk_cmd = *cmd as *const dyn RendererCommandList as *const CommandList;
                    (&*vk_cmd).command_buffer()
                })
                .collect();

            let wait_semaphores = [wait_semaphore];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [signal_semaphore];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.device
                .queue_submit(
                    self.graphics_queue,
                    &[submit_info],
                    self.submit_fences[self.current_submit_fence],
                )
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to submit commands to GPU queue (swapchain): {:?}", e))?;

            Ok(())
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to wait idle: {:?}", e))
        }
    }

    fn stats(&self) -> RendererStats {
        RendererStats::default()
    }

    fn resize(&mut self, _width: u32, _height: u32) {
        // Swapchain recreation is driven by the swapchain itself
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Shutdown sampler cache while the device is alive.
            //    After this, self.gpu_context is the sole Arc<GpuContext> owner.
            if let Ok(cache) = self.sampler_cache.get_mut() {
                cache.shutdown();
            }

            // 2. Destroy VulkanRenderer-owned Vulkan objects
            for &fence in &self.submit_fences {
                self.device.destroy_fence(fence, None);
            }
            if let Ok(pools) = self.descriptor_pools.get_mut() {
                for &pool in pools.iter() {
                    self.device.destroy_descriptor_pool(pool, None);
                }
            }

            // 3. Destroy the shared upload command pool
            {
                let mut pool = self.gpu_context.upload_command_pool.lock().unwrap();
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 4. Drop the allocator: VkDeviceMemory pages must go BEFORE the
            //    device. First this struct's Arc, then GpuContext's.
            ManuallyDrop::drop(&mut self.allocator);
            if let Some(ctx) = Arc::get_mut(&mut self.gpu_context) {
                ManuallyDrop::drop(&mut ctx.allocator);
            }

            // 5. Disarm the debug callback, then destroy the messenger
            //    BEFORE device and instance.
            #[cfg(feature = "vulkan-validation")]
            {
                crate::debug::cleanup_debug_config();
                if let (Some(debug_utils), Some(messenger)) = (
                    &self.gpu_context.debug_utils_loader,
                    &self.gpu_context.debug_messenger,
                ) {
                    debug_utils.destroy_debug_utils_messenger(*messenger, None);
                }
            }

            // 6. Destroy device and instance
            self.device.destroy_device(None);
            self._instance.destroy_instance(None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
