//! A buffer represents a piece of memory that can be accessed by the GPU and used to store and
//! write data. Buffers
use crate::Result;
use std::{mem, sync::Arc};

use ash::vk;
use vk::DeviceSize;

use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, Allocator};
use gpu_allocator::MemoryLocation;

use super::{commands::*, context::VulkanContext, Error, Extent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
// Defines the type of a buffer
pub enum BufferType {
    /// Vertex buffer
    Vertex,
    /// 16 bit index buffer
    Index16,
    /// 32 bit index buffer
    Index32,
    /// Uniform buffer
    Uniform,

    /// Dynamically offsetted uniform buffer
    UniformDynamic,

    /// Storage buffer
    Storage,

    /// Indirect draw command buffer
    Indirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
// Defines the expected access pattern of a buffer
pub enum BufferAccess {
    /// Buffer data will be set once or rarely and frequently times
    /// Uses temporary staging buffers and optimizes for GPU read access
    Staged,
    /// Buffer data will seldom be set but frequently times
    /// Uses a persistent staging buffer and optimizes for GPU read access
    StagedPersistent,

    /// Buffer data is often updated and frequently used
    /// Uses temporarily mapped host memory
    Mapped,

    /// Buffer data is very often updated and frequently used
    /// Uses persistently mapped memory
    MappedPersistent,
}

/// Higher level construct abstracting buffer and buffer memory for index,
/// vertex and uniform use
/// buffer access
pub struct Buffer {
    context: Arc<VulkanContext>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,

    // Maximum allocated size of the buffer
    size: DeviceSize,
    ty: BufferType,
    access: BufferAccess,

    // If a staging buffer is persisted
    staging_buffer: Option<(vk::Buffer, Allocation)>,
}

impl Buffer {
    /// Creates a new buffer with size and uninitialized contents.
    pub fn new_uninit(
        context: Arc<VulkanContext>,
        ty: BufferType,
        access: BufferAccess,
        size: DeviceSize,
    ) -> Result<Self> {
        // Calculate the buffer access flags
        let vk_usage = match ty {
            BufferType::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferType::Index16 | BufferType::Index32 => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferType::Uniform | BufferType::UniformDynamic => {
                vk::BufferUsageFlags::UNIFORM_BUFFER
            }
            BufferType::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
            BufferType::Indirect => vk::BufferUsageFlags::INDIRECT_BUFFER,
        } | match access {
            BufferAccess::Mapped | BufferAccess::MappedPersistent => {
                vk::BufferUsageFlags::default()
            }
            BufferAccess::Staged | BufferAccess::StagedPersistent => {
                vk::BufferUsageFlags::TRANSFER_DST
            }
        };

        let location = match access {
            BufferAccess::Staged | BufferAccess::StagedPersistent => MemoryLocation::GpuOnly,
            BufferAccess::Mapped | BufferAccess::MappedPersistent => MemoryLocation::CpuToGpu,
        };

        let (buffer, allocation) =
            create_bound_buffer(&context, "buffer", size, vk_usage, location)?;

        Ok(Self {
            size,
            context,
            buffer,
            allocation: Some(allocation),
            ty,
            access,
            staging_buffer: None,
        })
    }
    /// Creates a new buffer and fills it with vertex data using staging
    /// buffer. Buffer will be the same size as provided data.
    pub fn new<T>(
        context: Arc<VulkanContext>,
        ty: BufferType,
        access: BufferAccess,
        data: &[T],
    ) -> Result<Self> {
        let size = (mem::size_of::<T>() * data.len()) as DeviceSize;

        let mut buffer = Self::new_uninit(context, ty, access, size)?;
        // Fill the buffer with provided data
        buffer.fill(0, data)?;
        Ok(buffer)
    }

    /// Update the buffer data by mapping memory and filling it using the
    /// provided closure.
    /// `len`: Specifies the number of items of T to map into slice. (is ignored with persistent
    /// access).
    /// `offset`: Specifies the offset in items T into buffer to map.
    pub fn write_slice<T, F, R>(
        &mut self,
        len: DeviceSize,
        offset: DeviceSize,
        write_func: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut [T]) -> R,
    {
        let size = len * mem::size_of::<T>() as u64;
        self.write(size, offset * mem::size_of::<T>() as u64, |ptr| {
            write_func(unsafe { std::slice::from_raw_parts_mut(ptr as *mut T, len as usize) })
        })
    }

    /// Update the buffer data by mapping memory and filling it using the
    /// provided closure
    /// `size`: Specifies the number of bytes to map (is ignored with persistent
    /// access)
    /// `offset`: Specifies the offset in bytes into buffer to map
    pub fn write<F, R>(&mut self, size: DeviceSize, offset: DeviceSize, write_func: F) -> Result<()>
    where
        F: FnOnce(*mut u8) -> R,
    {
        if size > self.size {
            return Err(Error::BufferOverflow {
                size,
                max_size: self.size,
            });
        }
        match self.access {
            BufferAccess::Staged => self.write_staged(size, offset, write_func),
            BufferAccess::StagedPersistent => self.write_staged_persistent(offset, write_func),
            BufferAccess::Mapped => self.write_mapped(offset, write_func),
            BufferAccess::MappedPersistent => {
                self.write_mapped_persistent(offset, write_func)
            }
        }
    }

    // Writes through the buffer's own persistent mapping.
    fn write_mapped_persistent<F, R>(&self, offset: DeviceSize, write_func: F) -> Result<()>
    where
        F: FnOnce(*mut u8) -> R,
    {
        let allocation = self.allocation.as_ref().expect("allocation dropped");
        let mapped = allocation
            .mapped_ptr()
            .expect("mapped-persistent buffer has no mapped pointer")
            .as_ptr() as *mut u8;

        unsafe {
            write_func(mapped.add(offset as usize));
        }

        Ok(())
    }

    // Maps and unmaps the whole allocation for the duration of the write.
    fn write_mapped<F, R>(&self, offset: DeviceSize, write_func: F) -> Result<()>
    where
        F: FnOnce(*mut u8) -> R,
    {
        let allocation = self.allocation.as_ref().expect("allocation dropped");
        let mapped = allocation
            .mapped_ptr()
            .expect("host-visible allocation has no mapped pointer")
            .as_ptr() as *mut u8;

        unsafe {
            write_func(mapped.add(offset as usize));
        }

        Ok(())
    }

    fn write_staged<F, R>(&self, size: DeviceSize, offset: DeviceSize, write_func: F) -> Result<()>
    where
        F: FnOnce(*mut u8) -> R,
    {
        // Create a transient staging buffer, fill it, copy to GPU memory, destroy it.
        let (staging_buffer, mut staging_allocation) = create_bound_buffer(
            &self.context,
            "staging",
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )?;

        let mapped = staging_allocation
            .mapped_ptr()
            .expect("staging allocation is always host-visible")
            .as_ptr() as *mut u8;

        write_func(mapped);

        copy(
            self.context.transfer_pool(),
            self.context.graphics_queue(),
            staging_buffer,
            self.buffer,
            size,
            offset,
        )?;

        destroy_buffer(&self.context, staging_buffer, staging_allocation)?;

        Ok(())
    }

    fn write_staged_persistent<F, R>(&mut self, offset: DeviceSize, write_func: F) -> Result<()>
    where
        F: FnOnce(*mut u8) -> R,
    {
        if self.staging_buffer.is_none() {
            let (buffer, allocation) = create_bound_buffer(
                &self.context,
                "staging-persistent",
                self.size,
                vk::BufferUsageFlags::TRANSFER_SRC,
                MemoryLocation::CpuToGpu,
            )?;
            self.staging_buffer = Some((buffer, allocation));
        }

        let (staging_buffer, staging_allocation) = self.staging_buffer.as_ref().unwrap();

        let mapped = staging_allocation
            .mapped_ptr()
            .expect("staging allocation is always host-visible")
            .as_ptr() as *mut u8;

        write_func(mapped);

        copy(
            self.context.transfer_pool(),
            self.context.graphics_queue(),
            *staging_buffer,
            self.buffer,
            self.size,
            offset,
        )?;

        Ok(())
    }

    /// Fills the buffer  with provided data
    /// Uses write internally
    /// data cannot be larger in size than maximum buffer size
    pub fn fill<T: Sized>(&mut self, offset: DeviceSize, data: &[T]) -> Result<()> {
        let size = mem::size_of::<T>() * data.len();

        self.write(size as _, offset, |mapped| unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr() as *const T as *const u8, mapped, size)
        })
    }

    pub fn size(&self) -> DeviceSize {
        self.size
    }

    /// Returns the raw vk buffer
    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    /// Returns the buffer type
    pub fn access(&self) -> BufferAccess {
        self.access
    }

    /// Returns the buffer type
    pub fn ty(&self) -> BufferType {
        self.ty
    }
}

impl AsRef<vk::Buffer> for Buffer {
    fn as_ref(&self) -> &vk::Buffer {
        &self.buffer
    }
}

impl From<&Buffer> for vk::Buffer {
    fn from(buffer: &Buffer) -> vk::Buffer {
        buffer.buffer
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            destroy_buffer(&self.context, self.buffer, allocation).ok();
        }

        if let Some((buffer, allocation)) = self.staging_buffer.take() {
            destroy_buffer(&self.context, buffer, allocation).ok();
        }
    }
}

/// Creates a buffer and binds a fresh allocation of `location` memory to it.
pub(crate) fn create_bound_buffer(
    context: &VulkanContext,
    name: &str,
    size: DeviceSize,
    usage: vk::BufferUsageFlags,
    location: MemoryLocation,
) -> Result<(vk::Buffer, Allocation)> {
    let buffer_info = vk::BufferCreateInfo::builder()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = unsafe { context.device().create_buffer(&buffer_info, None)? };
    let requirements = unsafe { context.device().get_buffer_memory_requirements(buffer) };

    let allocation = context.allocator().write().allocate(&AllocationCreateDesc {
        name,
        requirements,
        location,
        linear: true,
    })?;

    unsafe {
        context
            .device()
            .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
    }

    Ok((buffer, allocation))
}

pub(crate) fn destroy_buffer(
    context: &VulkanContext,
    buffer: vk::Buffer,
    allocation: Allocation,
) -> Result<()> {
    context.allocator().write().free(allocation)?;
    unsafe { context.device().destroy_buffer(buffer, None) };
    Ok(())
}

/// Copies the contents of one buffer to another
/// `commandpool`: pool to allocate transfer command buffer
/// Does not wait for operation to complete
pub fn copy(
    commandpool: &CommandPool,
    queue: vk::Queue,
    src_buffer: vk::Buffer,
    dst_buffer: vk::Buffer,
    size: DeviceSize,
    offset: DeviceSize,
) -> Result<()> {
    let region = vk::BufferCopy {
        src_offset: 0,
        dst_offset: offset,
        size,
    };

    commandpool.single_time_command(queue, |commandbuffer| {
        commandbuffer.copy_buffer(src_buffer, dst_buffer, &[region]);
    })
}

pub fn copy_to_image(
    commandpool: &CommandPool,
    queue: vk::Queue,
    buffer: vk::Buffer,
    image: vk::Image,
    layout: vk::ImageLayout,
    extent: Extent,
) -> Result<()> {
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
        image_extent: vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        },
    };

    commandpool.single_time_command(queue, |commandbuffer| {
        commandbuffer.copy_buffer_image(buffer, image, layout, &[region])
    })
}
