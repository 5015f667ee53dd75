/// Mock Renderer for unit tests (no GPU required)
///
/// This mock renderer allows testing handlers, the descriptor state
/// machine, and render graph composition without a real GPU backend.
/// Resource creation and descriptor updates are recorded so tests can
/// assert on allocation and write patterns.

#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use winit::window::Window;

#[cfg(test)]
use crate::renderer::{
    Renderer, Buffer, Texture, Shader, Pipeline, CommandList, DescriptorSet,
    RenderPass, RenderTarget, Swapchain, Framebuffer,
    BufferDesc, TextureDesc, ShaderDesc, PipelineDesc,
    RenderPassDesc, FramebufferDesc, Viewport, Rect2D,
    ClearValue, IndexType, ShaderStageFlags, TextureInfo, TextureUsage,
    PipelineReflection, WriteDescriptor,
};
#[cfg(test)]
use crate::error::Result;
#[cfg(test)]
use crate::engine_bail;

// ============================================================================
// Mock Buffer
// ============================================================================

#[cfg(test)]
pub struct MockBuffer {
    pub size: u64,
    pub name: String,
    /// Recorded (offset, data) writes
    pub writes: Mutex<Vec<(u64, Vec<u8>)>>,
}

#[cfg(test)]
impl MockBuffer {
    pub fn new(size: u64, name: String) -> Self {
        Self { size, name, writes: Mutex::new(Vec::new()) }
    }
}

#[cfg(test)]
impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            engine_bail!("aurora3d::mock",
                "buffer update out of bounds: offset {} + len {} > size {}",
                offset, data.len(), self.size);
        }
        self.writes.lock().unwrap().push((offset, data.to_vec()));
        Ok(())
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

#[cfg(test)]
pub struct MockTexture {
    pub info: TextureInfo,
    pub name: String,
}

#[cfg(test)]
impl MockTexture {
    pub fn new(width: u32, height: u32, array_layers: u32, name: String) -> Self {
        Self {
            info: TextureInfo {
                width,
                height,
                format: crate::renderer::TextureFormat::R8G8B8A8_UNORM,
                usage: crate::renderer::TextureUsage::SampledAndRenderTarget,
                array_layers,
                mip_levels: 1,
            },
            name,
        }
    }
}

#[cfg(test)]
impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

// ============================================================================
// Mock Shader
// ============================================================================

#[cfg(test)]
pub struct MockShader {
    pub name: String,
}

#[cfg(test)]
impl MockShader {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

#[cfg(test)]
impl Shader for MockShader {}

// ============================================================================
// Mock Pipeline
// ============================================================================

#[cfg(test)]
pub struct MockPipeline {
    pub name: String,
    reflection: PipelineReflection,
}

#[cfg(test)]
impl MockPipeline {
    pub fn new(name: String) -> Self {
        Self { name, reflection: PipelineReflection::empty() }
    }

    /// Create a mock pipeline with a hand-built reflection
    pub fn with_reflection(name: String, reflection: PipelineReflection) -> Self {
        Self { name, reflection }
    }
}

#[cfg(test)]
impl Pipeline for MockPipeline {
    fn reflection(&self) -> &PipelineReflection {
        &self.reflection
    }
}

// ============================================================================
// Mock DescriptorSet
// ============================================================================

#[cfg(test)]
pub struct MockDescriptorSet {
    pub set_index: u32,
}

#[cfg(test)]
impl MockDescriptorSet {
    pub fn new(set_index: u32) -> Self {
        Self { set_index }
    }
}

#[cfg(test)]
impl DescriptorSet for MockDescriptorSet {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

/// Record of one update_descriptor_set call
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MockDescriptorUpdate {
    /// Allocation pointer of the set that was written
    pub set_id: usize,
    /// Bindings written, in call order
    pub bindings: Vec<u32>,
}

// ============================================================================
// Mock CommandList
// ============================================================================

#[cfg(test)]
pub struct MockCommandList {
    pub commands: Vec<String>,
}

#[cfg(test)]
impl MockCommandList {
    pub fn new() -> Self {
        Self { commands: Vec::new() }
    }
}

#[cfg(test)]
impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.commands.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.commands.push("end".to_string());
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: &Arc<dyn RenderPass>,
        _framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.commands.push(format!("begin_render_pass(clears={})", clear_values.len()));
        Ok(())
    }

    fn next_subpass(&mut self) -> Result<()> {
        self.commands.push("next_subpass".to_string());
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.commands.push("end_render_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.commands.push(format!("set_viewport({}x{})", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, _scissor: Rect2D) -> Result<()> {
        self.commands.push("set_scissor".to_string());
        Ok(())
    }

    fn bind_pipeline(&mut self, _pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.commands.push("bind_pipeline".to_string());
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set: &Arc<dyn DescriptorSet>,
    ) -> Result<()> {
        self.commands.push(format!("bind_descriptor_set(set={})", set.set_index()));
        Ok(())
    }

    fn push_constants(&mut self, _stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.commands.push(format!("push_constants(offset={}, len={})", offset, data.len()));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.commands.push("bind_vertex_buffer".to_string());
        Ok(())
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64, _index_type: IndexType) -> Result<()> {
        self.commands.push("bind_index_buffer".to_string());
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.commands.push(format!("draw({}, {})", vertex_count, first_vertex));
        Ok(())
    }

    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32) -> Result<()> {
        self.commands.push(format!(
            "draw_instanced({}, {}, {})",
            vertex_count, instance_count, first_vertex
        ));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.commands.push(format!("draw_indexed({})", index_count));
        Ok(())
    }
}

// ============================================================================
// Mock RenderPass / RenderTarget / Framebuffer
// ============================================================================

#[cfg(test)]
pub struct MockRenderPass;

#[cfg(test)]
impl MockRenderPass {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(test)]
impl RenderPass for MockRenderPass {}

#[cfg(test)]
pub struct MockRenderTarget {
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
impl MockRenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
impl RenderTarget for MockRenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> crate::renderer::TextureFormat {
        crate::renderer::TextureFormat::R8G8B8A8_UNORM
    }
}

#[cfg(test)]
pub struct MockFramebuffer {
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
impl MockFramebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

#[cfg(test)]
pub struct MockSwapchain {
    pub image_count: u32,
}

#[cfg(test)]
impl MockSwapchain {
    pub fn new(image_count: u32) -> Self {
        Self { image_count }
    }
}

#[cfg(test)]
impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self) -> Result<u32> {
        Ok(0)
    }

    fn record_present_blit(
        &self,
        _cmd: &mut dyn CommandList,
        _src: &dyn Texture,
        _image_index: u32,
    ) -> Result<()> {
        Ok(())
    }

    fn present(&mut self, _image_index: u32) -> Result<()> {
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.image_count as usize
    }

    fn width(&self) -> u32 {
        800
    }

    fn height(&self) -> u32 {
        600
    }

    fn format(&self) -> crate::renderer::TextureFormat {
        crate::renderer::TextureFormat::B8G8R8A8_UNORM
    }

    fn recreate(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

/// Mock Renderer that tracks created resources without GPU
#[cfg(test)]
pub struct MockRenderer {
    /// Track created buffers
    pub created_buffers: Arc<Mutex<Vec<String>>>,
    /// Track created textures
    pub created_textures: Arc<Mutex<Vec<String>>>,
    /// Track created shaders
    pub created_shaders: Arc<Mutex<Vec<String>>>,
    /// Track created pipelines
    pub created_pipelines: Arc<Mutex<Vec<String>>>,
    /// Ids of allocated descriptor sets, in allocation order
    pub created_descriptor_sets: Arc<Mutex<Vec<usize>>>,
    /// Recorded descriptor set updates
    pub descriptor_updates: Arc<Mutex<Vec<MockDescriptorUpdate>>>,
}

#[cfg(test)]
impl MockRenderer {
    /// Create a new mock renderer
    pub fn new() -> Self {
        Self {
            created_buffers: Arc::new(Mutex::new(Vec::new())),
            created_textures: Arc::new(Mutex::new(Vec::new())),
            created_shaders: Arc::new(Mutex::new(Vec::new())),
            created_pipelines: Arc::new(Mutex::new(Vec::new())),
            created_descriptor_sets: Arc::new(Mutex::new(Vec::new())),
            descriptor_updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get names of created buffers
    pub fn get_created_buffers(&self) -> Vec<String> {
        self.created_buffers.lock().unwrap().clone()
    }

    /// Get names of created textures
    pub fn get_created_textures(&self) -> Vec<String> {
        self.created_textures.lock().unwrap().clone()
    }

    /// Number of descriptor sets allocated so far
    pub fn descriptor_set_count(&self) -> usize {
        self.created_descriptor_sets.lock().unwrap().len()
    }

    /// Recorded descriptor set updates
    pub fn get_descriptor_updates(&self) -> Vec<MockDescriptorUpdate> {
        self.descriptor_updates.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Renderer for MockRenderer {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        let name = format!("texture_{}x{}", desc.width, desc.height);
        self.created_textures.lock().unwrap().push(name.clone());
        let mut texture = MockTexture::new(desc.width, desc.height, desc.array_layers, name);
        texture.info.format = desc.format;
        texture.info.usage = desc.usage;
        Ok(Arc::new(texture))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        let name = format!("buffer_{}", desc.size);
        self.created_buffers.lock().unwrap().push(name.clone());
        Ok(Arc::new(MockBuffer::new(desc.size, name)))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        let name = format!("shader_{:?}", desc.stage);
        self.created_shaders.lock().unwrap().push(name.clone());
        Ok(Arc::new(MockShader::new(name)))
    }

    fn create_pipeline(&mut self, _desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        let name = "pipeline".to_string();
        self.created_pipelines.lock().unwrap().push(name.clone());
        Ok(Arc::new(MockPipeline::new(name)))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList::new()))
    }

    fn create_render_pass(&self, _desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(MockRenderPass::new()))
    }

    fn create_render_target_texture(
        &self,
        texture: &dyn Texture,
        layer: u32,
        mip_level: u32,
    ) -> Result<Arc<dyn RenderTarget>> {
        let info = texture.info();
        match info.usage {
            TextureUsage::RenderTarget
            | TextureUsage::SampledAndRenderTarget
            | TextureUsage::DepthStencil
            | TextureUsage::PresentSource => {}
            _ => {
                engine_bail!("aurora3d::mock",
                    "create_render_target_texture: incompatible texture usage {:?}",
                    info.usage);
            }
        }
        if layer >= info.array_layers {
            engine_bail!("aurora3d::mock",
                "create_render_target_texture: layer {} out of range (array_layers = {})",
                layer, info.array_layers);
        }
        if mip_level >= info.mip_levels {
            engine_bail!("aurora3d::mock",
                "create_render_target_texture: mip_level {} out of range (mip_levels = {})",
                mip_level, info.mip_levels);
        }
        let w = (info.width >> mip_level).max(1);
        let h = (info.height >> mip_level).max(1);
        Ok(Arc::new(MockRenderTarget::new(w, h)))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        Ok(Arc::new(MockFramebuffer::new(desc.width, desc.height)))
    }

    fn create_descriptor_set(
        &self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
    ) -> Result<Arc<dyn DescriptorSet>> {
        let set: Arc<dyn DescriptorSet> = Arc::new(MockDescriptorSet::new(set_index));
        self.created_descriptor_sets
            .lock()
            .unwrap()
            .push(Arc::as_ptr(&set) as *const () as usize);
        Ok(set)
    }

    fn update_descriptor_set(
        &self,
        set: &Arc<dyn DescriptorSet>,
        writes: &[WriteDescriptor],
    ) -> Result<()> {
        // Identify the set by its allocation pointer
        let set_ptr = Arc::as_ptr(set) as *const () as usize;
        self.descriptor_updates.lock().unwrap().push(MockDescriptorUpdate {
            set_id: set_ptr,
            bindings: writes.iter().map(|w| w.binding).collect(),
        });
        Ok(())
    }

    fn create_swapchain(&self, _window: &Window) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(MockSwapchain::new(3)))
    }

    fn submit(&self, _commands: &[&dyn CommandList]) -> Result<()> {
        Ok(())
    }

    fn submit_with_swapchain(
        &self,
        _commands: &[&dyn CommandList],
        _swapchain: &dyn Swapchain,
        _image_index: u32,
    ) -> Result<()> {
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> crate::renderer::RendererStats {
        crate::renderer::RendererStats::default()
    }

    fn resize(&mut self, _width: u32, _height: u32) {
        // No-op for mock
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_renderer_tests.rs"]
mod tests;
