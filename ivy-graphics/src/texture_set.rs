use std::collections::HashMap;
use std::sync::Arc;

use ivy_base::Events;
use ivy_resources::{Handle, ResourceCache};
use ivy_vulkan::texture::CombinedImageSampler;
use ivy_vulkan::{Sampler, Texture};

use crate::{Error, Result};

/// Posted onto an [`Events`] bus whenever a [`TextureSet`] finishes a
/// rebuild, i.e. an asset load completed and is now reflected in the
/// descriptor-backing array.
#[derive(Debug, Clone)]
pub struct TextureSetRebuilt {
    pub name: Arc<str>,
    pub generation: u64,
}

/// A named, growable array of textures bound together as one
/// combined-image-sampler descriptor. Index 0 is always bound to the set's
/// fallback texture (typically 1x1 white), so a material referencing an
/// index before its real texture has rebuilt in still renders something.
pub struct TextureSet {
    textures: Vec<Handle<Texture>>,
    sampler: Handle<Sampler>,
    combined: Vec<CombinedImageSampler>,
    generation: u64,
    dirty: bool,
}

impl TextureSet {
    pub fn new(fallback: Handle<Texture>, sampler: Handle<Sampler>) -> Self {
        Self {
            textures: vec![fallback],
            sampler,
            combined: Vec::new(),
            generation: 0,
            dirty: true,
        }
    }

    /// Appends `texture` to the set, marking it dirty. Returns the index the
    /// texture will occupy once `rebuild` runs.
    pub fn add_texture(&mut self, texture: Handle<Texture>) -> u32 {
        if let Some(index) = self.index_of(texture) {
            return index;
        }

        let index = self.textures.len() as u32;
        self.textures.push(texture);
        self.dirty = true;
        index
    }

    pub fn index_of(&self, texture: Handle<Texture>) -> Option<u32> {
        self.textures
            .iter()
            .position(|&t| t == texture)
            .map(|i| i as u32)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The descriptor-info slice backing this set's texture array binding.
    /// Empty until the first successful `rebuild`.
    pub fn combined_samplers(&self) -> &[CombinedImageSampler] {
        &self.combined
    }

    /// Rebuilds the descriptor-info slice if dirty and every member texture
    /// resolves. Bumps `generation` on success; leaves the set unchanged (and
    /// still dirty) if a texture handle is not yet valid.
    pub fn rebuild(
        &mut self,
        textures: &ResourceCache<Texture>,
        samplers: &ResourceCache<Sampler>,
    ) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        let sampler = samplers.get(self.sampler)?;
        let combined = self
            .textures
            .iter()
            .map(|&handle| -> Result<_> {
                let texture = textures.get(handle)?;
                Ok(CombinedImageSampler::new(texture, sampler))
            })
            .collect::<Result<Vec<_>>>()?;

        self.combined = combined;
        self.generation += 1;
        self.dirty = false;
        Ok(true)
    }
}

/// Named registry of [`TextureSet`]s, one per shader pass that draws from a
/// bindless texture array.
#[derive(Default)]
pub struct TextureSetRegistry {
    sets: HashMap<Arc<str>, TextureSet>,
}

impl TextureSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_set(
        &mut self,
        name: impl Into<Arc<str>>,
        fallback: Handle<Texture>,
        sampler: Handle<Sampler>,
    ) -> &mut TextureSet {
        self.sets
            .entry(name.into())
            .or_insert_with(|| TextureSet::new(fallback, sampler))
    }

    pub fn get(&self, name: &str) -> Result<&TextureSet> {
        self.sets
            .get(name)
            .ok_or_else(|| Error::UnknownTextureSet(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut TextureSet> {
        self.sets
            .get_mut(name)
            .ok_or_else(|| Error::UnknownTextureSet(name.to_string()))
    }

    pub fn add_texture_to_set(&mut self, name: &str, texture: Handle<Texture>) -> Result<u32> {
        Ok(self.get_mut(name)?.add_texture(texture))
    }

    /// Rebuilds the named set and, if the rebuild actually ran, posts a
    /// [`TextureSetRebuilt`] event onto `events` so subscribers (e.g. an
    /// asset-load progress log) learn about it without polling generations
    /// themselves.
    pub fn rebuild_set(
        &mut self,
        name: &str,
        textures: &ResourceCache<Texture>,
        samplers: &ResourceCache<Sampler>,
        events: &Events,
    ) -> Result<bool> {
        let set_name: Arc<str> = Arc::from(name);
        let set = self.get_mut(name)?;
        let rebuilt = set.rebuild(textures, samplers)?;

        if rebuilt {
            events.send(TextureSetRebuilt {
                name: set_name,
                generation: set.generation(),
            });
        }

        Ok(rebuilt)
    }

    pub fn get_texture_index(&self, name: &str, texture: Handle<Texture>) -> Option<u32> {
        self.sets.get(name).and_then(|set| set.index_of(texture))
    }
}
