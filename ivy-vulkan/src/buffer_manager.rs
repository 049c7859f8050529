//! Owns every GPU buffer the engine allocates and defers their destruction
//! until it is safe relative to the frames-in-flight ring, the same pattern
//! [`context::VulkanContext`] uses for its descriptor pools.
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use thiserror::Error;

use crate::buffer::{create_bound_buffer, destroy_buffer};
use crate::context::VulkanContext;
use crate::MAX_FRAMES_IN_FLIGHT;

#[derive(Error, Debug)]
pub enum Error {
    #[error("buffer allocation failed")]
    AllocationFailed(#[from] crate::Error),
    #[error("invalid buffer configuration")]
    InvalidArgument,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Governs how a buffer's backing memory is allocated and kept up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStrategy {
    /// Device-local memory only; all writes go through a staging buffer.
    /// Best for large, read-mostly data such as material buffers and
    /// instance SSBOs.
    DeviceLocal,
    /// Host-visible and coherent, mapped once at creation. Best for small
    /// per-frame UBOs the CPU writes every frame.
    HostVisible,
    /// Host-visible but not guaranteed coherent; writers must flush at
    /// range granularity. Approximated with `gpu_allocator`'s `GpuToCpu`
    /// location, which prefers cached memory types where available.
    HostCached,
}

fn memory_location(strategy: BufferStrategy) -> MemoryLocation {
    match strategy {
        BufferStrategy::DeviceLocal => MemoryLocation::GpuOnly,
        BufferStrategy::HostVisible => MemoryLocation::CpuToGpu,
        BufferStrategy::HostCached => MemoryLocation::GpuToCpu,
    }
}

pub struct BufferConfig<'a> {
    pub name: &'a str,
    pub size: vk::DeviceSize,
    pub strategy: BufferStrategy,
    pub usage: vk::BufferUsageFlags,
}

/// A buffer owned by a [`BufferManager`]. Its `VkBuffer` handle is stable
/// for the object's lifetime; `generation` starts at 1 and only changes when
/// the manager hands back a *new* `ManagedBuffer` replacing this one, never
/// for in-place data updates.
pub struct ManagedBuffer {
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    strategy: BufferStrategy,
    generation: u64,
    debug_name: String,
    created_frame: u64,
}

impl ManagedBuffer {
    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    pub fn strategy(&self) -> BufferStrategy {
        self.strategy
    }

    fn mapped_ptr(&self) -> Option<*mut u8> {
        self.allocation
            .as_ref()
            .and_then(|a| a.mapped_ptr())
            .map(|p| p.as_ptr() as *mut u8)
    }
}

struct Pending {
    buffer: vk::Buffer,
    allocation: Allocation,
}

pub struct BufferManager {
    context: Arc<VulkanContext>,
    deferred: [Vec<Pending>; MAX_FRAMES_IN_FLIGHT],
}

impl BufferManager {
    pub fn new(context: Arc<VulkanContext>) -> Self {
        Self {
            context,
            deferred: Default::default(),
        }
    }

    /// Creates an uninitialized buffer with the given strategy and usage.
    pub fn create_buffer(&mut self, config: BufferConfig, frame_idx: u64) -> Result<ManagedBuffer> {
        if config.size == 0 {
            return Err(Error::InvalidArgument);
        }

        let (buffer, allocation) = create_bound_buffer(
            &self.context,
            config.name,
            config.size,
            config.usage,
            memory_location(config.strategy),
        )?;

        Ok(ManagedBuffer {
            buffer,
            allocation: Some(allocation),
            size: config.size,
            strategy: config.strategy,
            generation: 1,
            debug_name: config.name.to_string(),
            created_frame: frame_idx,
        })
    }

    /// Creates a buffer and immediately fills it with `data`. For
    /// `DeviceLocal` buffers, the data is staged through a transient
    /// CPU-visible buffer and copied with a blocking one-time command.
    pub fn create_and_upload(
        &mut self,
        name: &str,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        strategy: BufferStrategy,
        frame_idx: u64,
    ) -> Result<ManagedBuffer> {
        if data.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let mut managed = self.create_buffer(
            BufferConfig {
                name,
                size: data.len() as vk::DeviceSize,
                strategy,
                usage: usage | vk::BufferUsageFlags::TRANSFER_DST,
            },
            frame_idx,
        )?;

        match strategy {
            BufferStrategy::DeviceLocal => {
                let (staging_buffer, mut staging_allocation) = create_bound_buffer(
                    &self.context,
                    "staging",
                    data.len() as vk::DeviceSize,
                    vk::BufferUsageFlags::TRANSFER_SRC,
                    MemoryLocation::CpuToGpu,
                )?;

                let mapped = staging_allocation
                    .mapped_ptr()
                    .expect("staging allocation is always host-visible")
                    .as_ptr() as *mut u8;
                unsafe {
                    std::ptr::copy_nonoverlapping(data.as_ptr(), mapped, data.len());
                }

                crate::buffer::copy(
                    self.context.transfer_pool(),
                    self.context.graphics_queue(),
                    staging_buffer,
                    managed.buffer,
                    data.len() as vk::DeviceSize,
                    0,
                )
                .map_err(Error::AllocationFailed)?;

                destroy_buffer(&self.context, staging_buffer, staging_allocation)
                    .map_err(Error::AllocationFailed)?;
            }
            BufferStrategy::HostVisible | BufferStrategy::HostCached => {
                let mapped = managed.mapped_ptr().expect("host-visible buffer is mapped");
                unsafe {
                    std::ptr::copy_nonoverlapping(data.as_ptr(), mapped, data.len());
                }
            }
        }

        managed.generation = 1;
        Ok(managed)
    }

    /// Updates an existing buffer's contents in place. Never changes
    /// `generation` — callers rebind only when they swap to a different
    /// `ManagedBuffer`, not on every data update.
    pub fn update_buffer(&mut self, buf: &mut ManagedBuffer, data: &[u8]) -> Result<()> {
        if data.len() as vk::DeviceSize > buf.size {
            return Err(Error::InvalidArgument);
        }

        match buf.strategy {
            BufferStrategy::HostVisible | BufferStrategy::HostCached => {
                let mapped = buf.mapped_ptr().expect("host-visible buffer is mapped");
                unsafe {
                    std::ptr::copy_nonoverlapping(data.as_ptr(), mapped, data.len());
                }
            }
            BufferStrategy::DeviceLocal => {
                let (staging_buffer, mut staging_allocation) = create_bound_buffer(
                    &self.context,
                    "staging-update",
                    data.len() as vk::DeviceSize,
                    vk::BufferUsageFlags::TRANSFER_SRC,
                    MemoryLocation::CpuToGpu,
                )?;

                let mapped = staging_allocation
                    .mapped_ptr()
                    .expect("staging allocation is always host-visible")
                    .as_ptr() as *mut u8;
                unsafe {
                    std::ptr::copy_nonoverlapping(data.as_ptr(), mapped, data.len());
                }

                crate::buffer::copy(
                    self.context.transfer_pool(),
                    self.context.graphics_queue(),
                    staging_buffer,
                    buf.buffer,
                    data.len() as vk::DeviceSize,
                    0,
                )
                .map_err(Error::AllocationFailed)?;

                destroy_buffer(&self.context, staging_buffer, staging_allocation)
                    .map_err(Error::AllocationFailed)?;
            }
        }

        Ok(())
    }

    /// Appends `buf` to the destruction ring for `frame_idx`. It is actually
    /// destroyed the next time `begin_frame` is called with the same slot,
    /// `MAX_FRAMES_IN_FLIGHT` frames later.
    pub fn queue_destruction(&mut self, buf: ManagedBuffer, frame_idx: u64) {
        if let Some(allocation) = buf.allocation {
            let slot = (frame_idx as usize) % MAX_FRAMES_IN_FLIGHT;
            self.deferred[slot].push(Pending {
                buffer: buf.buffer,
                allocation,
            });
        }
    }

    /// Destroys every buffer queued for the current ring slot. Safe to call
    /// because `MAX_FRAMES_IN_FLIGHT` frames have elapsed since enqueue.
    pub fn begin_frame(&mut self, frame_idx: u64) {
        let slot = (frame_idx as usize) % MAX_FRAMES_IN_FLIGHT;
        for pending in self.deferred[slot].drain(..) {
            destroy_buffer(&self.context, pending.buffer, pending.allocation).ok();
        }
    }
}
