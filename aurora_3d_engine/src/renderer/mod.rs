/// Renderer module - all rendering-related types and traits

// Module declarations
pub mod renderer;
pub mod buffer;
pub mod texture;
pub mod shader;
pub mod pipeline;
pub mod command_list;
pub mod descriptor_set;
pub mod render_pass;
pub mod swapchain;
pub mod mock_renderer;

// Re-export everything from renderer.rs
pub use renderer::*;

// Re-export from other modules
pub use buffer::*;
pub use texture::*;
pub use shader::*;
pub use pipeline::*;
pub use command_list::*;
pub use descriptor_set::*;
pub use render_pass::*;
pub use swapchain::*;

/// Number of frames the CPU may record ahead of the GPU.
///
/// Per-frame resources (descriptor sets, command lists) are allocated
/// once per slot and cycled with `frame_index % MAX_FRAMES_IN_FLIGHT`.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
