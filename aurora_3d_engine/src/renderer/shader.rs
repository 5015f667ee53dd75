/// Shader trait, shader descriptor, and shader reflection metadata
///
/// Reflection is produced by the backend when shaders are compiled into a
/// pipeline (SPIR-V reflection on Vulkan). Handlers consume this metadata
/// to validate pushes and size GPU buffers.

use std::collections::BTreeMap;

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment/Pixel shader
    Fragment,
    /// Compute shader
    Compute,
}

/// Shader stage visibility flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderStageFlags(u32);

impl ShaderStageFlags {
    pub const VERTEX: Self = Self(0x01);
    pub const FRAGMENT: Self = Self(0x02);
    pub const COMPUTE: Self = Self(0x04);
    pub const VERTEX_FRAGMENT: Self = Self(0x03);
    pub const ALL: Self = Self(0x07);

    /// Create from a slice of ShaderStage
    pub fn from_stages(stages: &[ShaderStage]) -> Self {
        let mut flags = 0u32;
        for stage in stages {
            flags |= match stage {
                ShaderStage::Vertex => 0x01,
                ShaderStage::Fragment => 0x02,
                ShaderStage::Compute => 0x04,
            };
        }
        Self(flags)
    }

    /// Union of two stage sets
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains_vertex(&self) -> bool { self.0 & 0x01 != 0 }
    pub fn contains_fragment(&self) -> bool { self.0 & 0x02 != 0 }
    pub fn contains_compute(&self) -> bool { self.0 & 0x04 != 0 }
    pub fn bits(&self) -> u32 { self.0 }
}

/// Descriptor for creating a shader
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    /// Compiled shader bytecode (SPIR-V)
    pub code: &'a [u8],
    /// Shader stage
    pub stage: ShaderStage,
    /// Entry point function name
    pub entry_point: String,
}

/// Shader resource trait
///
/// Implemented by backend-specific shader types (e.g., VulkanShader).
/// The shader is automatically destroyed when dropped.
pub trait Shader: Send + Sync {}

// ============================================================================
// Reflection metadata
// ============================================================================

/// Type of resource at a descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorType {
    /// Uniform buffer (read-only structured data)
    UniformBuffer,
    /// Storage buffer (larger, read/write)
    StorageBuffer,
    /// Combined image sampler (texture + sampler in one binding)
    CombinedImageSampler,
}

/// How a parameter block is delivered to the shader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Backed by a uniform buffer descriptor
    Uniform,
    /// Backed by a storage buffer descriptor
    Storage,
    /// Delivered as push constants, no descriptor
    Push,
}

/// One member of a parameter block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uniform {
    /// Byte offset within the block
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

/// A named parameter block declared by shader code
///
/// Equality compares the full shape (binding, size, kind, stages, and the
/// member map). Handlers treat a value change as a structural change and
/// reallocate their GPU buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    /// Binding number within its set
    pub binding: u32,
    /// Total block size in bytes
    pub size: u32,
    /// Shader stages that access this block
    pub stage_flags: ShaderStageFlags,
    /// Delivery mechanism
    pub kind: BlockKind,
    /// Members by name, ordered for stable equality
    pub uniforms: BTreeMap<String, Uniform>,
}

impl UniformBlock {
    /// Look up a member by name
    pub fn find_uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.get(name)
    }
}

/// A named descriptor binding (buffer block or sampled image)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedBinding {
    /// Set index
    pub set: u32,
    /// Binding number within the set
    pub binding: u32,
    /// Descriptor type at this binding
    pub descriptor_type: DescriptorType,
    /// Number of descriptors (>1 for arrays)
    pub count: u32,
    /// Shader stages that access this binding
    pub stage_flags: ShaderStageFlags,
}

/// Merged reflection data for all shader stages of a pipeline
///
/// Built by the backend when the pipeline is created. Bindings from
/// multiple stages are merged by name with stage flags unioned.
#[derive(Debug, Clone, Default)]
pub struct PipelineReflection {
    /// Named buffer blocks (uniform and storage)
    pub blocks: rustc_hash::FxHashMap<String, UniformBlock>,
    /// Named descriptor bindings (buffer blocks and sampled images)
    pub bindings: rustc_hash::FxHashMap<String, ReflectedBinding>,
    /// Push constant block, if declared
    pub push_constant: Option<UniformBlock>,
    /// Number of descriptor sets used by the pipeline
    pub set_count: u32,
}

impl PipelineReflection {
    /// An empty reflection (no blocks, no bindings)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a buffer block by name
    pub fn block(&self, name: &str) -> Option<&UniformBlock> {
        self.blocks.get(name)
    }

    /// Look up a descriptor binding by name
    pub fn binding(&self, name: &str) -> Option<&ReflectedBinding> {
        self.bindings.get(name)
    }

    /// The push constant block, if the pipeline declares one
    pub fn push_constant(&self) -> Option<&UniformBlock> {
        self.push_constant.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
