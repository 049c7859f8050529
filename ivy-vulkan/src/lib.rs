//! Low level Vulkan 1.3 abstractions: instance/device setup, buffers,
//! textures, descriptor management, pipelines and the higher level
//! resource-binder and acceleration structure plumbing built on top of them.

pub mod accel;
pub mod buffer;
pub mod buffer_manager;
pub mod commands;
pub mod context;
pub mod debug_utils;
pub mod descriptors;
pub mod device;
mod entry;
pub mod error;
pub mod fence;
pub mod framebuffer;
mod instance;
pub mod pipeline;
pub mod renderpass;
pub mod resource_binder;
pub mod sampler;
pub mod semaphore;
mod surface;
pub mod swapchain;
pub mod texture;
pub mod traits;
pub mod vertex;

mod shaderpass;

pub use ash::vk;

pub use accel::{AccelError, BvhEvent, BlasHandle, TlasHandle, TopLevelAccel};
pub use buffer::{Buffer, BufferAccess, BufferType};
pub use buffer_manager::{BufferConfig, BufferManager, BufferStrategy, ManagedBuffer};
pub use commands::{CommandBuffer, CommandPool};
pub use context::{SharedVulkanContext, VulkanContext};
pub use descriptors::{
    DescriptorAllocator, DescriptorBuilder, DescriptorLayoutCache, DescriptorLayoutInfo,
    DescriptorSetBinding,
};
pub use error::{Error, Result};
pub use fence::Fence;
pub use framebuffer::Framebuffer;
pub use ivy_base::Extent;
pub use pipeline::{PassInfo, Pipeline, PipelineInfo, ShaderModuleInfo};
pub use renderpass::{
    AttachmentDescription, AttachmentReference, ClearValue, ImageLayout, LoadOp, RenderPass,
    RenderPassInfo, StoreOp, SubpassDependency, SubpassInfo,
};
pub use resource_binder::{BindingError, BindingName, ResourceBinder};
pub use sampler::{Sampler, SamplerInfo};
pub use shaderpass::ShaderPass;
pub use swapchain::{Swapchain, SwapchainInfo};
pub use texture::{CombinedImageSampler, InputAttachment, Texture, TextureInfo};
pub use traits::Backend;
pub use vertex::VertexDesc;

/// Vulkan's `BufferUsageFlags` used directly as the "what is this buffer for"
/// half of buffer creation; `BufferAccess` carries the "how is it updated".
pub use ash::vk::BufferUsageFlags as BufferUsage;

/// Ring size for deferred GPU resource destruction and per-frame descriptor
/// rebinding. Matches the simulation/render hand-off's double buffering plus
/// one extra frame of presentation slack.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;
