//! Resolves shader bindings by name instead of raw (set, binding) indices and
//! rewrites descriptor sets only when the bound resource actually changed.
//!
//! A pass calls `bind_*_named` every frame with whatever resource it currently
//! wants visible at that name; the binder only records the resource's
//! generation and marks the entry dirty if it differs from what is already
//! written into the descriptor set. `update_frame` then flushes every dirty
//! entry for that frame slot via `vkUpdateDescriptorSets`, mirroring how
//! [`crate::buffer_manager::BufferManager`] defers destruction by frame slot
//! rather than doing the expensive part eagerly on every call.
use std::collections::HashMap;
use std::sync::Arc;

use ash::version::DeviceV1_0;
use ash::vk;
use thiserror::Error;

use crate::buffer_manager::ManagedBuffer;
use crate::context::VulkanContext;
use crate::descriptors::{DescriptorAllocator, DescriptorLayoutCache, DescriptorLayoutInfo, DescriptorSetBinding};
use crate::pipeline::Pipeline;
use crate::texture::CombinedImageSampler;
use crate::accel::TlasHandle;
use crate::MAX_FRAMES_IN_FLIGHT;

#[derive(Error, Debug)]
pub enum BindingError {
    #[error(transparent)]
    Vulkan(#[from] crate::Error),
    #[error("pipeline is not registered with this resource binder")]
    UnknownPipeline,
    #[error("no binding named \"{0}\" was found by shader reflection")]
    UnknownBinding(String),
    #[error("binding \"{name}\" is a {found:?}, not a {expected:?}")]
    BindingTypeMismatch {
        name: String,
        expected: vk::DescriptorType,
        found: vk::DescriptorType,
    },
}

pub type Result<T> = std::result::Result<T, BindingError>;

/// A descriptor binding name, as discovered by shader reflection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingName(String);

impl BindingName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BindingName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for BindingName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for BindingName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct BindingLocation {
    set: u32,
    binding: u32,
    descriptor_type: vk::DescriptorType,
}

struct PipelineBindings {
    locations: HashMap<String, BindingLocation>,
    /// Descriptor set allocated per (frame, set index).
    sets: HashMap<(usize, u32), vk::DescriptorSet>,
}

enum ResourceKind {
    Buffer(vk::Buffer),
    TextureArray(Vec<(vk::ImageView, vk::Sampler)>),
    AccelerationStructure(vk::AccelerationStructureKHR),
}

struct TrackedRef {
    location: BindingLocation,
    generation: u64,
    dirty: bool,
    kind: ResourceKind,
}

/// Tracks named descriptor bindings across every registered pipeline and
/// frame slot, and rewrites them lazily as the bound resources are recreated.
pub struct ResourceBinder {
    context: Arc<VulkanContext>,
    layout_cache: DescriptorLayoutCache,
    allocator: DescriptorAllocator,
    pipelines: HashMap<vk::Pipeline, PipelineBindings>,
    tracked: HashMap<(vk::Pipeline, usize, String), TrackedRef>,
}

impl ResourceBinder {
    pub fn new(context: Arc<VulkanContext>) -> Self {
        let layout_cache = DescriptorLayoutCache::new(context.device().clone());
        let allocator = DescriptorAllocator::new(context.device().clone(), 64);

        Self {
            context,
            layout_cache,
            allocator,
            pipelines: HashMap::new(),
            tracked: HashMap::new(),
        }
    }

    /// Registers `pipeline`'s reflected bindings and eagerly allocates one
    /// descriptor set per (set, frame) pair. Calling this more than once for
    /// the same pipeline is a no-op.
    pub fn register_pipeline(&mut self, pipeline: &Pipeline) -> Result<()> {
        let key = pipeline.pipeline();
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }

        let mut locations = HashMap::new();
        let mut by_set: HashMap<u32, DescriptorLayoutInfo> = HashMap::new();

        for binding in pipeline.bindings() {
            locations.insert(
                binding.name.clone(),
                BindingLocation {
                    set: binding.set,
                    binding: binding.binding,
                    descriptor_type: binding.descriptor_type,
                },
            );

            by_set
                .entry(binding.set)
                .or_insert_with(|| DescriptorLayoutInfo::new(&[]))
                .insert(DescriptorSetBinding {
                    binding: binding.binding,
                    descriptor_type: binding.descriptor_type,
                    descriptor_count: binding.descriptor_count,
                    stage_flags: binding.stage_flags,
                    p_immutable_samplers: std::ptr::null(),
                });
        }

        let mut sets = HashMap::new();
        for (set_index, layout) in pipeline.set_layouts().iter().enumerate() {
            let set_index = set_index as u32;
            let info = by_set
                .entry(set_index)
                .or_insert_with(|| DescriptorLayoutInfo::new(&[]));

            for frame in 0..MAX_FRAMES_IN_FLIGHT {
                let allocated = self.allocator.allocate(*layout, info, 1)?;
                sets.insert((frame, set_index), allocated[0]);
            }
        }

        self.pipelines.insert(key, PipelineBindings { locations, sets });

        Ok(())
    }

    fn resolve(&self, pipeline: vk::Pipeline, name: &str, expected: vk::DescriptorType) -> Result<BindingLocation> {
        let pb = self
            .pipelines
            .get(&pipeline)
            .ok_or(BindingError::UnknownPipeline)?;

        let location = pb
            .locations
            .get(name)
            .ok_or_else(|| BindingError::UnknownBinding(name.to_string()))?;

        if location.descriptor_type != expected {
            return Err(BindingError::BindingTypeMismatch {
                name: name.to_string(),
                expected,
                found: location.descriptor_type,
            });
        }

        Ok(*location)
    }

    fn bind(
        &mut self,
        pipeline: &Pipeline,
        name: &str,
        frame: usize,
        expected: vk::DescriptorType,
        generation: u64,
        kind: ResourceKind,
    ) -> Result<()> {
        let location = self.resolve(pipeline.pipeline(), name, expected)?;
        let key = (pipeline.pipeline(), frame, name.to_string());

        match self.tracked.get_mut(&key) {
            Some(existing) if existing.generation == generation => {}
            Some(existing) => {
                existing.generation = generation;
                existing.kind = kind;
                existing.dirty = true;
            }
            None => {
                self.tracked.insert(
                    key,
                    TrackedRef {
                        location,
                        generation,
                        dirty: true,
                        kind,
                    },
                );
            }
        }

        Ok(())
    }

    /// Binds a uniform buffer at `name` for `frame`. Marks the binding dirty
    /// only if `buf`'s generation differs from what was last bound there.
    pub fn bind_uniform_buffer_named(
        &mut self,
        pipeline: &Pipeline,
        name: &str,
        buf: &ManagedBuffer,
        frame: usize,
    ) -> Result<()> {
        self.bind(
            pipeline,
            name,
            frame,
            vk::DescriptorType::UNIFORM_BUFFER,
            buf.generation(),
            ResourceKind::Buffer(buf.buffer()),
        )
    }

    /// Binds a storage buffer at `name` for `frame`.
    pub fn bind_storage_buffer_named(
        &mut self,
        pipeline: &Pipeline,
        name: &str,
        buf: &ManagedBuffer,
        frame: usize,
    ) -> Result<()> {
        self.bind(
            pipeline,
            name,
            frame,
            vk::DescriptorType::STORAGE_BUFFER,
            buf.generation(),
            ResourceKind::Buffer(buf.buffer()),
        )
    }

    /// Binds a combined-image-sampler array at `name` for `frame`. Texture
    /// arrays carry no generation of their own, so the caller (typically a
    /// material/texture set keeping its own rebuild counter) supplies one.
    pub fn bind_texture_array_named(
        &mut self,
        pipeline: &Pipeline,
        name: &str,
        textures: &[CombinedImageSampler],
        generation: u64,
        frame: usize,
    ) -> Result<()> {
        let images = textures
            .iter()
            .map(|t| (t.image(), t.sampler()))
            .collect();

        self.bind(
            pipeline,
            name,
            frame,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            generation,
            ResourceKind::TextureArray(images),
        )
    }

    /// Binds the current top level acceleration structure at `name` for
    /// `frame`.
    pub fn bind_acceleration_structure_named(
        &mut self,
        pipeline: &Pipeline,
        name: &str,
        tlas: &TlasHandle,
        frame: usize,
    ) -> Result<()> {
        self.bind(
            pipeline,
            name,
            frame,
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
            tlas.generation(),
            ResourceKind::AccelerationStructure(tlas.accel()),
        )
    }

    /// Returns the descriptor set allocated for `pipeline`'s `set` index at
    /// `frame`, for binding into a command buffer.
    pub fn descriptor_set(&self, pipeline: &Pipeline, set: u32, frame: usize) -> Result<vk::DescriptorSet> {
        let pb = self
            .pipelines
            .get(&pipeline.pipeline())
            .ok_or(BindingError::UnknownPipeline)?;

        pb.sets
            .get(&(frame, set))
            .copied()
            .ok_or_else(|| BindingError::UnknownBinding(format!("set {}", set)))
    }

    /// Rewrites every dirty binding tracked for `frame`. This is the only
    /// place `vkUpdateDescriptorSets` is called from, so recreated buffers,
    /// textures, and acceleration structures only cost a write when they
    /// actually change.
    pub fn update_frame(&mut self, frame: usize) -> Result<()> {
        let keys: Vec<(vk::Pipeline, usize, String)> = self
            .tracked
            .iter()
            .filter(|(k, v)| k.1 == frame && v.dirty)
            .map(|(k, _)| k.clone())
            .collect();

        for key in keys {
            self.flush_one(&key)?;
        }

        Ok(())
    }

    fn flush_one(&mut self, key: &(vk::Pipeline, usize, String)) -> Result<()> {
        let pb = self
            .pipelines
            .get(&key.0)
            .ok_or(BindingError::UnknownPipeline)?;

        let tracked = self
            .tracked
            .get(key)
            .expect("key was taken from self.tracked");

        let set = *pb
            .sets
            .get(&(key.1, tracked.location.set))
            .ok_or_else(|| BindingError::UnknownBinding(key.2.clone()))?;

        let device = self.context.device();

        match &tracked.kind {
            ResourceKind::Buffer(buffer) => {
                let buffer_info = [vk::DescriptorBufferInfo {
                    buffer: *buffer,
                    offset: 0,
                    range: vk::WHOLE_SIZE,
                }];

                let write = vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(tracked.location.binding)
                    .dst_array_element(0)
                    .descriptor_type(tracked.location.descriptor_type)
                    .buffer_info(&buffer_info)
                    .build();

                unsafe { device.update_descriptor_sets(&[write], &[]) };
            }
            ResourceKind::TextureArray(images) => {
                let image_infos: Vec<vk::DescriptorImageInfo> = images
                    .iter()
                    .map(|(view, sampler)| vk::DescriptorImageInfo {
                        sampler: *sampler,
                        image_view: *view,
                        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    })
                    .collect();

                let write = vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(tracked.location.binding)
                    .dst_array_element(0)
                    .descriptor_type(tracked.location.descriptor_type)
                    .image_info(&image_infos)
                    .build();

                unsafe { device.update_descriptor_sets(&[write], &[]) };
            }
            ResourceKind::AccelerationStructure(accel) => {
                let accels = [*accel];
                let mut write_as = vk::WriteDescriptorSetAccelerationStructureKHR::builder()
                    .acceleration_structures(&accels);

                let write = vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(tracked.location.binding)
                    .dst_array_element(0)
                    .descriptor_count(1)
                    .descriptor_type(tracked.location.descriptor_type)
                    .push_next(&mut write_as)
                    .build();

                unsafe { device.update_descriptor_sets(&[write], &[]) };
            }
        }

        self.tracked.get_mut(key).unwrap().dirty = false;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_name_round_trips_through_str_and_string() {
        let from_str: BindingName = "albedo".into();
        let from_string: BindingName = String::from("albedo").into();
        assert_eq!(from_str, from_string);
        assert_eq!(from_str.as_str(), "albedo");
        assert_eq!(from_str.to_string(), "albedo");
    }
}
