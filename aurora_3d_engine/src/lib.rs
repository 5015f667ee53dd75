/*!
# Aurora3D Engine

Core traits and types for the Aurora3D rendering engine.

This crate provides the platform-agnostic rendering composition layer:
render stages, subrenderers, uniform/storage/push handlers, and descriptor
management. GPU access goes through trait-based dynamic polymorphism;
backend implementations (Vulkan, etc.) provide the concrete types.

## Architecture

- **Renderer**: Factory trait for creating GPU resources
- **RenderGraph**: Ordered render stages + registered subrenderers
- **UniformHandler / StorageHandler / PushHandler**: CPU staging for
  shader parameter blocks with shape-change detection
- **DescriptorHandler**: Per-frame descriptor set state machine

Backend implementations provide concrete types that implement the
renderer traits.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod renderer;
pub mod buffers;
pub mod descriptor;
pub mod render_graph;
pub mod subrenderers;

// Main aurora3d namespace module
pub mod aurora3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Renderer factory trait
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Render sub-module with the GPU boundary types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Parameter handler sub-module
    pub mod buffers {
        pub use crate::buffers::*;
    }

    // Descriptor sub-module
    pub mod descriptor {
        pub use crate::descriptor::*;
    }

    // Render graph sub-module
    pub mod graph {
        pub use crate::render_graph::*;
    }

    // Built-in subrenderers
    pub mod subrenderers {
        pub use crate::subrenderers::*;
    }
}

// Re-export math library at crate root
pub use glam;
