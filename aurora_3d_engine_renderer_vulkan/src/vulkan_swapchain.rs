/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Manages presentation to the window, separated from rendering logic.
/// Stages render into offscreen textures; the final image reaches the
/// window through `record_present_blit` into the acquired swapchain image.

use aurora_3d_engine::aurora3d::{Result, Error};
use aurora_3d_engine::aurora3d::render::{
    Swapchain as RendererSwapchain,
    CommandList as RendererCommandList,
    Texture as RendererTexture,
    TextureFormat, MAX_FRAMES_IN_FLIGHT,
};
use aurora_3d_engine::{engine_error, engine_err, engine_bail};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_command_list::CommandList as VulkanCommandList;
use crate::vulkan_texture::Texture as VulkanTexture;

const SWAPCHAIN_USAGE: vk::ImageUsageFlags = vk::ImageUsageFlags::from_raw(
    vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw() | vk::ImageUsageFlags::TRANSFER_DST.as_raw(),
);

/// Vulkan swapchain implementation
pub struct Swapchain {
    device: Arc<ash::Device>,
    /// Physical device for capabilities queries on recreate
    physical_device: vk::PhysicalDevice,
    present_queue: vk::Queue,

    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain_images: Vec<vk::Image>,
    swapchain_image_views: Vec<vk::ImageView>,
    swapchain_format: vk::Format,
    swapchain_extent: vk::Extent2D,

    /// One acquire semaphore per frame in flight
    image_available_semaphores: Vec<vk::Semaphore>,
    /// One present semaphore per swapchain image, resized on recreate
    render_finished_semaphores: Vec<vk::Semaphore>,

    /// Current frame in flight
    current_frame: usize,
}

impl Swapchain {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        device: Arc<ash::Device>,
        physical_device: vk::PhysicalDevice,
        instance: &ash::Instance,
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
        present_queue: vk::Queue,
    ) -> Result<Self> {
        unsafe {
            let surface_capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;

            let surface_format = surface_formats
                .iter()
                .find(|f| f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
                .unwrap_or(&surface_formats[0]);

            let swapchain_extent = surface_capabilities.current_extent;

            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(surface)
                .min_image_count(3.min(surface_capabilities.max_image_count))
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(swapchain_extent)
                .image_array_layers(1)
                .image_usage(SWAPCHAIN_USAGE)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(surface_capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO);

            let swapchain_loader = ash::khr::swapchain::Device::new(instance, &device);
            let swapchain = swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            let swapchain_images = swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to get swapchain images: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;

            let swapchain_image_views =
                Self::create_image_views(&device, &swapchain_images, surface_format.format)?;

            let image_available_semaphores =
                Self::create_semaphores(&device, MAX_FRAMES_IN_FLIGHT)?;
            let render_finished_semaphores =
                Self::create_semaphores(&device, swapchain_images.len())?;

            Ok(Self {
                device,
                physical_device,
                present_queue,
                surface,
                surface_loader,
                swapchain,
                swapchain_loader,
                swapchain_images,
                swapchain_image_views,
                swapchain_format: surface_format.format,
                swapchain_extent,
                image_available_semaphores,
                render_finished_semaphores,
                current_frame: 0,
            })
        }
    }

    /// Synchronization pair for submitting with this swapchain.
    ///
    /// Returns (wait_semaphore, signal_semaphore) for the current frame
    /// and the acquired image. Used by `submit_with_swapchain`.
    pub(crate) fn sync_info(&self, image_index: u32) -> (vk::Semaphore, vk::Semaphore) {
        (
            self.image_available_semaphores[self.current_frame],
            self.render_finished_semaphores[image_index as usize],
        )
    }

    fn create_image_views(
        device: &ash::Device,
        images: &[vk::Image],
        format: vk::Format,
    ) -> Result<Vec<vk::ImageView>> {
        images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                unsafe { device.create_image_view(&create_info, None) }
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                engine_error!("aurora3d::vulkan", "Failed to create swapchain image views: {:?}", e);
                Error::InitializationFailed(format!("Failed to create image views: {:?}", e))
            })
    }

    fn create_semaphores(device: &ash::Device, count: usize) -> Result<Vec<vk::Semaphore>> {
        let create_info = vk::SemaphoreCreateInfo::default();
        (0..count)
            .map(|_| unsafe { device.create_semaphore(&create_info, None) })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                engine_error!("aurora3d::vulkan", "Failed to create swapchain semaphores: {:?}", e);
                Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
            })
    }
}

impl RendererSwapchain for Swapchain {
    fn acquire_next_image(&mut self) -> Result<u32> {
        unsafe {
            let (image_index, _is_suboptimal) = self
                .swapchain_loader
                .acquire_next_image(
                    self.swapchain,
                    u64::MAX,
                    self.image_available_semaphores[self.current_frame],
                    vk::Fence::null(),
                )
                .map_err(|e| {
                    if e == vk::Result::ERROR_OUT_OF_DATE_KHR {
                        engine_err!("aurora3d::vulkan", "Swapchain out of date during acquire")
                    } else {
                        engine_err!("aurora3d::vulkan", "Failed to acquire next swapchain image: {:?}", e)
                    }
                })?;

            Ok(image_index)
        }
    }

    fn record_present_blit(
        &self,
        cmd: &mut dyn RendererCommandList,
        src: &dyn RendererTexture,
        image_index: u32,
    ) -> Result<()> {
        if image_index as usize >= self.swapchain_images.len() {
            engine_bail!("aurora3d::vulkan",
                "record_present_blit: image_index {} out of range (count: {})",
                image_index, self.swapchain_images.len());
        }

        unsafe {
            let vk_cmd = cmd as *mut dyn RendererCommandList as *mut VulkanCommandList;
            let vk_cmd = &*vk_cmd;

            let vk_texture = src as *const dyn RendererTexture as *const VulkanTexture;
            let vk_texture = &*vk_texture;

            let src_image = vk_texture.image;
            let dst_image = self.swapchain_images[image_index as usize];
            let cb = vk_cmd.command_buffer();

            let src_info = src.info();
            let dst_width = self.swapchain_extent.width;
            let dst_height = self.swapchain_extent.height;

            // src: COLOR_ATTACHMENT_OPTIMAL -> TRANSFER_SRC_OPTIMAL
            // dst: UNDEFINED -> TRANSFER_DST_OPTIMAL
            let barriers = [
                vk::ImageMemoryBarrier::default()
                    .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(src_image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                    .dst_access_mask(vk::AccessFlags::TRANSFER_READ),
                vk::ImageMemoryBarrier::default()
                    .old_layout(vk::ImageLayout::UNDEFINED)
                    .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(dst_image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .src_access_mask(vk::AccessFlags::empty())
                    .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE),
            ];

            self.device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[], &[], &barriers,
            );

            let region = vk::ImageBlit {
                src_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                src_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D {
                        x: src_info.width as i32,
                        y: src_info.height as i32,
                        z: 1,
                    },
                ],
                dst_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                dst_offsets: [
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D {
                        x: dst_width as i32,
                        y: dst_height as i32,
                        z: 1,
                    },
                ],
            };

            self.device.cmd_blit_image(
                cb,
                src_image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst_image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                vk::Filter::LINEAR,
            );

            // dst: TRANSFER_DST_OPTIMAL -> PRESENT_SRC_KHR
            let barrier_present = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(dst_image)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::empty());

            self.device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[], &[], &[barrier_present],
            );

            Ok(())
        }
    }

    fn present(&mut self, image_index: u32) -> Result<()> {
        unsafe {
            let swapchains = [self.swapchain];
            let image_indices = [image_index];
            let wait_semaphores = [self.render_finished_semaphores[image_index as usize]];

            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match self.swapchain_loader
                .queue_present(self.present_queue, &present_info) {
                    Ok(_) | Err(vk::Result::SUBOPTIMAL_KHR) => {
                        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
                        Ok(())
                    }
                    Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
                        Err(engine_err!("aurora3d::vulkan", "Swapchain out of date during present"))
                    }
                    Err(e) => {
                        Err(engine_err!("aurora3d::vulkan", "Failed to present swapchain image: {:?}", e))
                    }
                }
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()
                .map_err(|e| engine_err!("aurora3d::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e))?;

            for image_view in self.swapchain_image_views.drain(..) {
                self.device.destroy_image_view(image_view, None);
            }

            let surface_capabilities = self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to get surface capabilities during swapchain recreate: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let extent = if surface_capabilities.current_extent.width != u32::MAX {
                surface_capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: width.clamp(
                        surface_capabilities.min_image_extent.width,
                        surface_capabilities.max_image_extent.width,
                    ),
                    height: height.clamp(
                        surface_capabilities.min_image_extent.height,
                        surface_capabilities.max_image_extent.height,
                    ),
                }
            };

            let image_count = surface_capabilities.min_image_count + 1;
            let image_count = if surface_capabilities.max_image_count > 0 {
                image_count.min(surface_capabilities.max_image_count)
            } else {
                image_count
            };

            let old_swapchain = self.swapchain;
            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(image_count)
                .image_format(self.swapchain_format)
                .image_color_space(vk::ColorSpaceKHR::SRGB_NONLINEAR)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(SWAPCHAIN_USAGE)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(surface_capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self.swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to recreate swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to recreate swapchain: {:?}", e))
                })?;

            self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            self.swapchain = swapchain;
            self.swapchain_extent = extent;

            self.swapchain_images = self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    engine_error!("aurora3d::vulkan", "Failed to get swapchain images during recreate: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;

            self.swapchain_image_views =
                Self::create_image_views(&self.device, &self.swapchain_images, self.swapchain_format)?;

            // The image count may differ from the old swapchain's; the
            // per-image present semaphores must track it.
            if self.render_finished_semaphores.len() != self.swapchain_images.len() {
                for semaphore in self.render_finished_semaphores.drain(..) {
                    self.device.destroy_semaphore(semaphore, None);
                }
                self.render_finished_semaphores =
                    Self::create_semaphores(&self.device, self.swapchain_images.len())?;
            }

            Ok(())
        }
    }

    fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }

    fn width(&self) -> u32 {
        self.swapchain_extent.width
    }

    fn height(&self) -> u32 {
        self.swapchain_extent.height
    }

    fn format(&self) -> TextureFormat {
        vk_format_to_format(self.swapchain_format)
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            for &semaphore in &self.image_available_semaphores {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &semaphore in &self.render_finished_semaphores {
                self.device.destroy_semaphore(semaphore, None);
            }

            for &image_view in &self.swapchain_image_views {
                self.device.destroy_image_view(image_view, None);
            }

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

/// Convert a Vulkan surface format to the engine TextureFormat
fn vk_format_to_format(vk_format: vk::Format) -> TextureFormat {
    match vk_format {
        vk::Format::R8G8B8A8_SRGB => TextureFormat::R8G8B8A8_SRGB,
        vk::Format::R8G8B8A8_UNORM => TextureFormat::R8G8B8A8_UNORM,
        vk::Format::B8G8R8A8_SRGB => TextureFormat::B8G8R8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => TextureFormat::B8G8R8A8_UNORM,
        _ => TextureFormat::B8G8R8A8_UNORM,
    }
}
