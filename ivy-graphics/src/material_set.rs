use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use ivy_resources::Handle;
use ivy_vulkan::buffer_manager::{BufferManager, BufferStrategy, ManagedBuffer};
use ivy_vulkan::{BufferUsage, Texture};

use crate::texture_set::TextureSetRegistry;
use crate::{Error, Result};

/// Packed per-material record matching the `MaterialData` std430 SSBO layout
/// a material set's buffer is rebuilt into.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MaterialData {
    albedo_index: u32,
    _pad: [u32; 3],
}

/// A named group of materials sharing one linked [`TextureSet`]. Materials in
/// a set may only reference textures belonging to that texture set; the
/// material's `albedo_texture_index` is resolved against it every rebuild, so
/// reordering or growing the texture set never invalidates an index.
///
/// [`TextureSet`]: crate::TextureSet
pub struct MaterialSet {
    texture_set: Arc<str>,
    materials: Vec<Handle<Texture>>,
    buffer: Option<ManagedBuffer>,
    generation: u64,
    dirty: bool,
}

impl MaterialSet {
    pub fn new(texture_set: impl Into<Arc<str>>) -> Self {
        Self {
            texture_set: texture_set.into(),
            materials: Vec::new(),
            buffer: None,
            generation: 0,
            dirty: true,
        }
    }

    pub fn texture_set_name(&self) -> &str {
        &self.texture_set
    }

    /// Adds a material referencing `albedo`, registering the texture with
    /// the linked texture set if it isn't already a member. Returns the
    /// material's per-set buffer index (`EntityRenderRecord::material_buffer_index`).
    pub fn add_material(
        &mut self,
        albedo: Handle<Texture>,
        texture_sets: &mut TextureSetRegistry,
    ) -> Result<u32> {
        texture_sets.add_texture_to_set(&self.texture_set, albedo)?;

        let index = self.materials.len() as u32;
        self.materials.push(albedo);
        self.dirty = true;
        Ok(index)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn buffer(&self) -> Option<&ManagedBuffer> {
        self.buffer.as_ref()
    }

    /// Re-encodes the packed material buffer if dirty, refusing to run while
    /// the linked texture set still has generation 0 (its array has never
    /// been confirmed resident, so indices into it would be meaningless).
    /// On success, replaces `buffer` and queues the previous one for
    /// deferred destruction.
    pub fn rebuild(
        &mut self,
        debug_name: &str,
        texture_sets: &TextureSetRegistry,
        buffers: &mut BufferManager,
        frame_idx: u64,
    ) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        let texture_set = texture_sets.get(&self.texture_set)?;
        if texture_set.generation() == 0 {
            return Err(Error::TextureSetNotReady(self.texture_set.to_string()));
        }

        let packed: Vec<MaterialData> = self
            .materials
            .iter()
            .map(|&albedo| MaterialData {
                albedo_index: texture_set.index_of(albedo).unwrap_or(0),
                _pad: [0; 3],
            })
            .collect();

        let new_buffer = buffers.create_and_upload(
            debug_name,
            bytemuck::cast_slice(&packed),
            BufferUsage::STORAGE_BUFFER,
            BufferStrategy::DeviceLocal,
            frame_idx,
        )?;

        if let Some(old) = self.buffer.replace(new_buffer) {
            buffers.queue_destruction(old, frame_idx);
        }

        self.generation += 1;
        self.dirty = false;
        Ok(true)
    }
}

/// Named registry of [`MaterialSet`]s.
#[derive(Default)]
pub struct MaterialSetRegistry {
    sets: HashMap<Arc<str>, MaterialSet>,
}

impl MaterialSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_set(
        &mut self,
        name: impl Into<Arc<str>>,
        texture_set: impl Into<Arc<str>>,
    ) -> &mut MaterialSet {
        let texture_set = texture_set.into();
        self.sets
            .entry(name.into())
            .or_insert_with(|| MaterialSet::new(texture_set))
    }

    pub fn get(&self, name: &str) -> Result<&MaterialSet> {
        self.sets
            .get(name)
            .ok_or_else(|| Error::UnknownMaterialSet(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut MaterialSet> {
        self.sets
            .get_mut(name)
            .ok_or_else(|| Error::UnknownMaterialSet(name.to_string()))
    }

    pub fn add_material_to_set(
        &mut self,
        name: &str,
        albedo: Handle<Texture>,
        texture_sets: &mut TextureSetRegistry,
    ) -> Result<u32> {
        self.get_mut(name)?.add_material(albedo, texture_sets)
    }

    pub fn rebuild_set(
        &mut self,
        name: &str,
        texture_sets: &TextureSetRegistry,
        buffers: &mut BufferManager,
        frame_idx: u64,
    ) -> Result<bool> {
        let set = self.get_mut(name)?;
        set.rebuild(name, texture_sets, buffers, frame_idx)
    }
}
