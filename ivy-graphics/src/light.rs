use crate::Result;
use ash::vk::{DescriptorSet, ShaderStageFlags};
use glam::Vec3;
use ivy_snapshot::LightRecord;
use ivy_vulkan::{
    context::SharedVulkanContext,
    descriptors::{DescriptorAllocator, DescriptorBuilder, DescriptorLayoutCache, IntoSet},
    Buffer,
};
use ordered_float::OrderedFloat;

/// Uploads the snapshot's lights to the GPU each frame, keeping only the
/// `max_lights` most significant ones as seen from a reference point (usually
/// the active camera position).
pub struct LightManager {
    scene_buffers: Vec<Buffer>,
    light_buffers: Vec<Buffer>,
    sets: Vec<DescriptorSet>,
    layout_cache: DescriptorLayoutCache,
    allocator: DescriptorAllocator,

    // Scratch buffer reused every update to avoid reallocating each frame.
    scratch: Vec<LightData>,

    max_lights: u64,
    ambient_radience: Vec3,
}

impl LightManager {
    pub fn new(
        context: SharedVulkanContext,
        max_lights: u64,
        ambient_radience: Vec3,
        frames_in_flight: usize,
    ) -> Result<Self> {
        let scene_buffers = (0..frames_in_flight)
            .map(|_| -> Result<_> {
                Buffer::new_uninit::<LightSceneData>(
                    context.clone(),
                    ivy_vulkan::BufferUsage::UNIFORM_BUFFER,
                    ivy_vulkan::BufferAccess::Mapped,
                    1,
                )
                .map_err(|e| e.into())
            })
            .collect::<Result<Vec<_>>>()?;

        let light_buffers = (0..frames_in_flight)
            .map(|_| -> Result<_> {
                Buffer::new_uninit::<LightData>(
                    context.clone(),
                    ivy_vulkan::BufferUsage::STORAGE_BUFFER,
                    ivy_vulkan::BufferAccess::Mapped,
                    max_lights,
                )
                .map_err(|e| e.into())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut layout_cache = DescriptorLayoutCache::new(context.device().clone());
        let mut allocator = DescriptorAllocator::new(context.device().clone(), frames_in_flight);

        let sets = scene_buffers
            .iter()
            .zip(&light_buffers)
            .map(|(scene, lights)| {
                DescriptorBuilder::new()
                    .bind_uniform_buffer(0, ShaderStageFlags::FRAGMENT, scene)
                    .bind_storage_buffer(1, ShaderStageFlags::FRAGMENT, lights)
                    .build_one(context.device(), &mut layout_cache, &mut allocator)
                    .map_err(|e| e.into())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            scene_buffers,
            light_buffers,
            sets,
            layout_cache,
            allocator,
            scratch: Vec::new(),
            max_lights,
            ambient_radience,
        })
    }

    /// Refills the light storage buffer from the snapshot's lights, keeping
    /// the `max_lights` closest to `reference` (usually the camera position).
    pub fn update(
        &mut self,
        lights: &[LightRecord],
        reference: Vec3,
        current_frame: usize,
    ) -> Result<()> {
        self.scratch.clear();
        self.scratch.extend(lights.iter().map(|light| {
            let dist_sq = (reference - light.position).length_squared().max(f32::EPSILON);
            let radiance = light.color * light.intensity;
            LightData {
                position: light.position,
                reference_illuminance: radiance.length_squared() / dist_sq,
                radiance,
                radius: light.range,
            }
        }));

        self.scratch
            .sort_unstable_by_key(|val| -OrderedFloat(val.reference_illuminance));
        self.scratch.truncate(self.max_lights as usize);

        self.light_buffers[current_frame].fill(0, &self.scratch)?;

        self.scene_buffers[current_frame].fill(
            0,
            &[LightSceneData {
                num_lights: self.scratch.len() as u32,
                ambient_radience: self.ambient_radience,
            }],
        )?;

        Ok(())
    }

    pub fn scene_buffers(&self) -> &[Buffer] {
        &self.scene_buffers
    }

    pub fn light_buffers(&self) -> &[Buffer] {
        &self.light_buffers
    }

    pub fn scene_buffer(&self, current_frame: usize) -> &Buffer {
        &self.scene_buffers[current_frame]
    }

    pub fn light_buffer(&self, current_frame: usize) -> &Buffer {
        &self.light_buffers[current_frame]
    }
}

impl IntoSet for LightManager {
    fn set(&self, current_frame: usize) -> DescriptorSet {
        self.sets[current_frame]
    }

    fn sets(&self) -> &[DescriptorSet] {
        &self.sets
    }
}

/// Per light data, matching the GPU-side storage buffer layout.
#[repr(C, align(16))]
#[derive(Default, Clone, Copy, PartialEq)]
struct LightData {
    position: Vec3,
    reference_illuminance: f32,
    radiance: Vec3,
    radius: f32,
}

#[repr(C)]
struct LightSceneData {
    ambient_radience: Vec3,
    num_lights: u32,
}
