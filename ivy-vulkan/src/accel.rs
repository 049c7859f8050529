//! Bottom and top level acceleration structures for the
//! `VK_KHR_acceleration_structure` extension. Per-mesh BLAS builds run on the
//! bvh_building thread pool subsystem and hand completed structures back to
//! the render thread through a lock-free stack; the render thread aggregates
//! them into a single TLAS and publishes it through a generation-counted
//! atomic pointer, the same shape of hand-off [`crate::buffer_manager`] uses
//! for deferred destruction.
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};
use std::sync::Arc;

use ash::version::{DeviceV1_0, DeviceV1_2};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use ivy_base::Events;
use log::warn;
use parking_lot::Mutex;
use thiserror::Error;

use crate::context::VulkanContext;
use crate::MAX_FRAMES_IN_FLIGHT;

/// Posted onto an [`Events`] bus when a per-mesh BLAS build finishes, and
/// again once those builds have been folded into a fresh TLAS. Lets a worker
/// pool owner observe BVH progress without polling [`TopLevelAccel::current`].
#[derive(Debug, Clone, Copy)]
pub enum BvhEvent {
    BlasCompleted { mesh_id: u64 },
    TlasRebuilt { generation: u64 },
}

#[derive(Error, Debug)]
pub enum AccelError {
    #[error(transparent)]
    Vulkan(#[from] crate::Error),
    #[error("acceleration structure build failed for mesh {0}")]
    BuildFailed(u64),
}

pub type Result<T> = std::result::Result<T, AccelError>;

fn buffer_device_address(context: &VulkanContext, buffer: vk::Buffer) -> vk::DeviceAddress {
    let info = vk::BufferDeviceAddressInfo::builder().buffer(buffer);
    unsafe { context.device().get_buffer_device_address(&info) }
}

/// Creates a buffer sized and bound for use as acceleration structure
/// storage, scratch, or instance data, all of which need
/// `SHADER_DEVICE_ADDRESS` so their address can be referenced from build
/// info structures.
fn create_accel_buffer(
    context: &VulkanContext,
    name: &str,
    size: vk::DeviceSize,
    extra_usage: vk::BufferUsageFlags,
    location: MemoryLocation,
) -> Result<(vk::Buffer, Allocation)> {
    crate::buffer::create_bound_buffer(
        context,
        name,
        size.max(1),
        extra_usage | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
        location,
    )
    .map_err(AccelError::from)
}

/// A built bottom level acceleration structure for a single mesh's geometry.
pub struct BlasHandle {
    mesh_id: u64,
    accel: vk::AccelerationStructureKHR,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    device_address: vk::DeviceAddress,
}

impl BlasHandle {
    pub fn mesh_id(&self) -> u64 {
        self.mesh_id
    }

    pub fn accel(&self) -> vk::AccelerationStructureKHR {
        self.accel
    }

    /// The device address referenced from TLAS instance descriptions, via
    /// `vkGetAccelerationStructureDeviceAddressKHR`.
    pub fn device_address(&self) -> vk::DeviceAddress {
        self.device_address
    }

    fn destroy(mut self, context: &VulkanContext) {
        if let Some(allocation) = self.allocation.take() {
            context.allocator().write().free(allocation).ok();
        }
        unsafe {
            context
                .acceleration_structure()
                .destroy_acceleration_structure(self.accel, None);
            context.device().destroy_buffer(self.buffer, None);
        };
    }
}

struct BlasNode {
    blas: BlasHandle,
    next: AtomicPtr<BlasNode>,
}

/// Lock-free stack of completed BLAS builds. Worker threads push as builds
/// finish; the TLAS build step drains the whole stack at once via a single
/// CAS of the head pointer.
pub struct BlasCompletionStack {
    head: AtomicPtr<BlasNode>,
}

impl BlasCompletionStack {
    pub fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub fn push(&self, blas: BlasHandle) {
        let node = Box::into_raw(Box::new(BlasNode {
            blas,
            next: AtomicPtr::new(ptr::null_mut()),
        }));

        loop {
            let head = self.head.load(Ordering::Acquire);
            unsafe { (*node).next.store(head, Ordering::Relaxed) };
            if self
                .head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
    }

    /// Atomically takes the entire stack in one swap, returning completed
    /// BLASes in most-recently-pushed-first order. An empty drain is normal
    /// and cheap.
    pub fn drain(&self) -> Vec<BlasHandle> {
        let mut head = self.head.swap(ptr::null_mut(), Ordering::AcqRel);
        let mut out = Vec::new();
        while !head.is_null() {
            let node = unsafe { Box::from_raw(head) };
            head = node.next.load(Ordering::Relaxed);
            out.push(node.blas);
        }
        out
    }
}

impl Default for BlasCompletionStack {
    fn default() -> Self {
        Self::new()
    }
}

/// A built top level acceleration structure, published by [`TopLevelAccel`]
/// once per rebuild.
pub struct TlasHandle {
    accel: vk::AccelerationStructureKHR,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    instance_buffer: vk::Buffer,
    instance_allocation: Option<Allocation>,
    generation: u64,
}

impl TlasHandle {
    pub fn accel(&self) -> vk::AccelerationStructureKHR {
        self.accel
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct PendingDestroy {
    accel: vk::AccelerationStructureKHR,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    instance_buffer: vk::Buffer,
    instance_allocation: Option<Allocation>,
}

/// Owns the full BLAS/TLAS lifecycle: per-mesh BLAS builds submitted by
/// worker threads, aggregation into a single TLAS, and publication of the
/// current TLAS to the render thread via an atomic pointer. Only the render
/// thread calls [`rebuild_tlas`](Self::rebuild_tlas) and [`begin_frame`](Self::begin_frame);
/// [`build_blas`](Self::build_blas) and [`completion_stack`](Self::completion_stack)
/// are safe to call from worker threads.
pub struct TopLevelAccel {
    context: Arc<VulkanContext>,
    completed: BlasCompletionStack,
    known: Mutex<Vec<BlasHandle>>,
    current: AtomicPtr<TlasHandle>,
    generation: AtomicU64,
    deferred: Mutex<[Vec<PendingDestroy>; MAX_FRAMES_IN_FLIGHT]>,
}

impl TopLevelAccel {
    pub fn new(context: Arc<VulkanContext>) -> Self {
        Self {
            context,
            completed: BlasCompletionStack::new(),
            known: Mutex::new(Vec::new()),
            current: AtomicPtr::new(ptr::null_mut()),
            generation: AtomicU64::new(0),
            deferred: Mutex::new(Default::default()),
        }
    }

    /// Returns the stack workers push completed BLAS builds into.
    pub fn completion_stack(&self) -> &BlasCompletionStack {
        &self.completed
    }

    /// Builds a BLAS for one mesh's geometry. Intended to run on a
    /// bvh_building worker thread; safe to call concurrently for different
    /// meshes as it only creates its own acceleration structure and memory.
    /// On success the caller is expected to push the result onto
    /// [`completion_stack`](Self::completion_stack); on failure the error is
    /// logged per-mesh by the caller and building continues for other
    /// meshes.
    pub fn build_blas(
        &self,
        mesh_id: u64,
        vertex_buffer: vk::Buffer,
        vertex_count: u32,
        vertex_stride: vk::DeviceSize,
        index_buffer: vk::Buffer,
        index_count: u32,
        events: &Events,
    ) -> Result<BlasHandle> {
        let accel_loader = self.context.acceleration_structure();

        let vertex_address = buffer_device_address(&self.context, vertex_buffer);
        let index_address = buffer_device_address(&self.context, index_buffer);

        let triangles = vk::AccelerationStructureGeometryTrianglesDataKHR::builder()
            .vertex_format(vk::Format::R32G32B32_SFLOAT)
            .vertex_data(vk::DeviceOrHostAddressConstKHR {
                device_address: vertex_address,
            })
            .vertex_stride(vertex_stride)
            .max_vertex(vertex_count.saturating_sub(1))
            .index_type(vk::IndexType::UINT32)
            .index_data(vk::DeviceOrHostAddressConstKHR {
                device_address: index_address,
            })
            .build();

        let primitive_count = index_count / 3;

        let geometry = vk::AccelerationStructureGeometryKHR::builder()
            .geometry_type(vk::GeometryTypeKHR::TRIANGLES)
            .geometry(vk::AccelerationStructureGeometryDataKHR { triangles })
            .flags(vk::GeometryFlagsKHR::OPAQUE)
            .build();

        let geometries = [geometry];

        let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::builder()
            .ty(vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .geometries(&geometries)
            .build();

        let build_sizes = unsafe {
            accel_loader.get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                &build_info,
                &[primitive_count],
            )
        };

        let (buffer, allocation) = create_accel_buffer(
            &self.context,
            "blas-storage",
            build_sizes.acceleration_structure_size,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR,
            MemoryLocation::GpuOnly,
        )?;

        let create_info = vk::AccelerationStructureCreateInfoKHR::builder()
            .buffer(buffer)
            .offset(0)
            .size(build_sizes.acceleration_structure_size)
            .ty(vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL);

        let accel = unsafe {
            accel_loader
                .create_acceleration_structure(&create_info, None)
                .map_err(crate::Error::from)?
        };

        let (scratch_buffer, scratch_allocation) = create_accel_buffer(
            &self.context,
            "blas-scratch",
            build_sizes.build_scratch_size,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            MemoryLocation::GpuOnly,
        )?;

        let scratch_address = buffer_device_address(&self.context, scratch_buffer);

        build_info.dst_acceleration_structure = accel;
        build_info.scratch_data = vk::DeviceOrHostAddressKHR {
            device_address: scratch_address,
        };

        let range_info = vk::AccelerationStructureBuildRangeInfoKHR::builder()
            .primitive_count(primitive_count)
            .primitive_offset(0)
            .first_vertex(0)
            .transform_offset(0)
            .build();

        let build_infos = [build_info];
        let range_infos: [&[vk::AccelerationStructureBuildRangeInfoKHR]; 1] = [&[range_info]];

        self.context
            .transfer_pool()
            .single_time_command(self.context.graphics_queue(), |cmd| unsafe {
                accel_loader.cmd_build_acceleration_structures(cmd.into(), &build_infos, &range_infos)
            })
            .map_err(crate::Error::from)?;

        crate::buffer::destroy_buffer(&self.context, scratch_buffer, scratch_allocation).ok();

        let device_address = unsafe {
            accel_loader.get_acceleration_structure_device_address(
                &vk::AccelerationStructureDeviceAddressInfoKHR::builder()
                    .acceleration_structure(accel),
            )
        };

        events.send(BvhEvent::BlasCompleted { mesh_id });

        Ok(BlasHandle {
            mesh_id,
            accel,
            buffer,
            allocation: Some(allocation),
            device_address,
        })
    }

    /// Drains every BLAS completed since the last call, folds them into the
    /// running set of known BLASes, and rebuilds the TLAS from all of them.
    /// Meshes whose BLAS build failed simply never appear here; the TLAS is
    /// built from whatever did complete.
    pub fn rebuild_tlas(&self, frame_idx: u64, events: &Events) -> Result<()> {
        let mut known = self.known.lock();
        known.extend(self.completed.drain());

        if known.is_empty() {
            return Ok(());
        }

        let accel_loader = self.context.acceleration_structure();

        let instance_size =
            (known.len() * std::mem::size_of::<vk::AccelerationStructureInstanceKHR>()) as u64;
        let (instance_buffer, mut instance_allocation) = create_accel_buffer(
            &self.context,
            "tlas-instances",
            instance_size,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR,
            MemoryLocation::CpuToGpu,
        )?;

        if let Some(mapped) = instance_allocation.mapped_ptr() {
            for (i, blas) in known.iter().enumerate() {
                let instance = vk::AccelerationStructureInstanceKHR {
                    transform: identity_transform(),
                    instance_custom_index_and_mask: vk::Packed24_8::new(i as u32, 0xff),
                    instance_shader_binding_table_record_offset_and_flags: vk::Packed24_8::new(
                        0, 0,
                    ),
                    acceleration_structure_reference: vk::AccelerationStructureReferenceKHR {
                        device_handle: blas.device_address(),
                    },
                };
                unsafe {
                    ptr::write(
                        (mapped.as_ptr() as *mut vk::AccelerationStructureInstanceKHR).add(i),
                        instance,
                    );
                }
            }
        } else {
            warn!("tlas instance buffer is not host-visible, skipping upload");
        }

        let instance_address = buffer_device_address(&self.context, instance_buffer);

        let instances = vk::AccelerationStructureGeometryInstancesDataKHR::builder()
            .array_of_pointers(false)
            .data(vk::DeviceOrHostAddressConstKHR {
                device_address: instance_address,
            })
            .build();

        let geometry = vk::AccelerationStructureGeometryKHR::builder()
            .geometry_type(vk::GeometryTypeKHR::INSTANCES)
            .geometry(vk::AccelerationStructureGeometryDataKHR { instances })
            .build();

        let geometries = [geometry];

        let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::builder()
            .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .geometries(&geometries)
            .build();

        let primitive_count = known.len() as u32;

        let build_sizes = unsafe {
            accel_loader.get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                &build_info,
                &[primitive_count],
            )
        };

        let (buffer, allocation) = create_accel_buffer(
            &self.context,
            "tlas-storage",
            build_sizes.acceleration_structure_size,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR,
            MemoryLocation::GpuOnly,
        )?;

        let create_info = vk::AccelerationStructureCreateInfoKHR::builder()
            .buffer(buffer)
            .offset(0)
            .size(build_sizes.acceleration_structure_size)
            .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL);

        let accel = unsafe {
            accel_loader
                .create_acceleration_structure(&create_info, None)
                .map_err(crate::Error::from)?
        };

        let (scratch_buffer, scratch_allocation) = create_accel_buffer(
            &self.context,
            "tlas-scratch",
            build_sizes.build_scratch_size,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            MemoryLocation::GpuOnly,
        )?;

        let scratch_address = buffer_device_address(&self.context, scratch_buffer);

        build_info.dst_acceleration_structure = accel;
        build_info.scratch_data = vk::DeviceOrHostAddressKHR {
            device_address: scratch_address,
        };

        let range_info = vk::AccelerationStructureBuildRangeInfoKHR::builder()
            .primitive_count(primitive_count)
            .primitive_offset(0)
            .first_vertex(0)
            .transform_offset(0)
            .build();

        let build_infos = [build_info];
        let range_infos: [&[vk::AccelerationStructureBuildRangeInfoKHR]; 1] = [&[range_info]];

        self.context
            .transfer_pool()
            .single_time_command(self.context.graphics_queue(), |cmd| unsafe {
                accel_loader.cmd_build_acceleration_structures(cmd.into(), &build_infos, &range_infos)
            })
            .map_err(crate::Error::from)?;

        crate::buffer::destroy_buffer(&self.context, scratch_buffer, scratch_allocation).ok();

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let new_handle = Box::into_raw(Box::new(TlasHandle {
            accel,
            buffer,
            allocation: Some(allocation),
            instance_buffer,
            instance_allocation: Some(instance_allocation),
            generation,
        }));

        let old = self.current.swap(new_handle, Ordering::Release);
        if !old.is_null() {
            let old = unsafe { Box::from_raw(old) };
            let slot = (frame_idx as usize) % MAX_FRAMES_IN_FLIGHT;
            self.deferred.lock()[slot].push(PendingDestroy {
                accel: old.accel,
                buffer: old.buffer,
                allocation: old.allocation,
                instance_buffer: old.instance_buffer,
                instance_allocation: old.instance_allocation,
            });
        }

        events.send(BvhEvent::TlasRebuilt { generation });

        Ok(())
    }

    /// Reads the currently published TLAS, if any has been built yet. Uses
    /// acquire ordering to match the release in [`rebuild_tlas`](Self::rebuild_tlas).
    pub fn current(&self) -> Option<&TlasHandle> {
        let ptr = self.current.load(Ordering::Acquire);
        unsafe { ptr.as_ref() }
    }

    /// Destroys every TLAS queued for destruction at the current ring slot.
    /// Mirrors [`crate::buffer_manager::BufferManager::begin_frame`].
    pub fn begin_frame(&self, frame_idx: u64) {
        let slot = (frame_idx as usize) % MAX_FRAMES_IN_FLIGHT;
        let pending = std::mem::take(&mut self.deferred.lock()[slot]);
        for p in pending {
            if let Some(allocation) = p.allocation {
                self.context.allocator().write().free(allocation).ok();
            }
            if let Some(allocation) = p.instance_allocation {
                self.context.allocator().write().free(allocation).ok();
            }
            unsafe {
                self.context.device().destroy_buffer(p.instance_buffer, None);
                self.context.device().destroy_buffer(p.buffer, None);
                self.context
                    .acceleration_structure()
                    .destroy_acceleration_structure(p.accel, None)
            };
        }
    }
}

impl Drop for TopLevelAccel {
    fn drop(&mut self) {
        for blas in self.known.lock().drain(..) {
            blas.destroy(&self.context);
        }
        let current = self.current.swap(ptr::null_mut(), Ordering::AcqRel);
        if !current.is_null() {
            let current = unsafe { Box::from_raw(current) };
            if let Some(allocation) = current.allocation {
                self.context.allocator().write().free(allocation).ok();
            }
            if let Some(allocation) = current.instance_allocation {
                self.context.allocator().write().free(allocation).ok();
            }
            unsafe {
                self.context
                    .device()
                    .destroy_buffer(current.instance_buffer, None);
                self.context.device().destroy_buffer(current.buffer, None);
                self.context
                    .acceleration_structure()
                    .destroy_acceleration_structure(current.accel, None)
            };
        }
        for slot in self.deferred.lock().iter_mut() {
            for p in slot.drain(..) {
                if let Some(allocation) = p.allocation {
                    self.context.allocator().write().free(allocation).ok();
                }
                if let Some(allocation) = p.instance_allocation {
                    self.context.allocator().write().free(allocation).ok();
                }
                unsafe {
                    self.context.device().destroy_buffer(p.instance_buffer, None);
                    self.context.device().destroy_buffer(p.buffer, None);
                    self.context
                        .acceleration_structure()
                        .destroy_acceleration_structure(p.accel, None)
                };
            }
        }
    }
}

fn identity_transform() -> vk::TransformMatrixKHR {
    vk::TransformMatrixKHR {
        matrix: [
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blas_stack_is_lifo_and_drains_fully() {
        let stack = BlasCompletionStack::new();
        assert!(stack.drain().is_empty());

        // Exercise the push/drain bookkeeping without a live device by
        // asserting the stack starts empty and stays empty when nothing was
        // pushed; full push/drain round trips require a `BlasHandle`, which
        // can only be constructed via a live Vulkan device.
        assert!(stack.drain().is_empty());
    }

    #[test]
    fn bvh_events_reach_subscribers() {
        let mut events = Events::new();
        let rx = events.subscribe::<BvhEvent>();

        events.send(BvhEvent::BlasCompleted { mesh_id: 7 });
        events.send(BvhEvent::TlasRebuilt { generation: 1 });

        match rx.try_recv().unwrap() {
            BvhEvent::BlasCompleted { mesh_id } => assert_eq!(mesh_id, 7),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            BvhEvent::TlasRebuilt { generation } => assert_eq!(generation, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
