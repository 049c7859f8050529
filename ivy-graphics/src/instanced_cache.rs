use std::collections::HashMap;

use ivy_snapshot::{BatchKey, InstanceRecord};
use ivy_vulkan::buffer_manager::{BufferManager, BufferStrategy, ManagedBuffer};
use ivy_vulkan::{BufferUsage, Pipeline, ResourceBinder};

use crate::Result;

/// One cached instance buffer and the snapshot generation it was built
/// against. A hit with a matching generation is reused without rebinding;
/// any other generation means the batch's instances may have changed shape
/// and the buffer must be rebuilt from scratch, since instance buffers are
/// not updated in place.
struct CachedBatch {
    buffer: ManagedBuffer,
    generation: u64,
    seen: bool,
}

/// Per-mesh GPU instance buffer cache keyed by [`BatchKey`], generation
/// gated against the snapshot that produced the batch. Each unique batch
/// gets exactly one `vkCmdDrawIndexed` with `instanceCount` equal to its
/// entry count; `gl_InstanceIndex` indexes into the bound storage buffer.
#[derive(Default)]
pub struct InstancedDrawCache {
    batches: HashMap<BatchKey, CachedBatch>,
}

impl InstancedDrawCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a GPU instance buffer exists for `key` matching `generation`,
    /// uploading and binding a fresh one on miss (rebuilds if the cached
    /// buffer belongs to a different generation), then reusing it as-is on
    /// hit. Returns the bound buffer for the caller to issue the draw with.
    pub fn get_or_upload(
        &mut self,
        key: &BatchKey,
        instances: &[InstanceRecord],
        generation: u64,
        debug_name: &str,
        buffers: &mut BufferManager,
        binder: &mut ResourceBinder,
        pipeline: &Pipeline,
        frame_idx: u64,
        frame: usize,
    ) -> Result<&ManagedBuffer> {
        let needs_rebuild = match self.batches.get(key) {
            Some(cached) => cached.generation != generation,
            None => true,
        };

        if needs_rebuild {
            let buffer = buffers.create_and_upload(
                debug_name,
                bytemuck::cast_slice(instances),
                BufferUsage::STORAGE_BUFFER,
                BufferStrategy::DeviceLocal,
                frame_idx,
            )?;

            if let Some(old) = self.batches.insert(
                key.clone(),
                CachedBatch {
                    buffer,
                    generation,
                    seen: true,
                },
            ) {
                buffers.queue_destruction(old.buffer, frame_idx);
            }
        } else if let Some(cached) = self.batches.get_mut(key) {
            cached.seen = true;
        }

        let cached = self.batches.get(key).expect("just inserted or present");

        if needs_rebuild {
            binder.bind_storage_buffer_named(pipeline, "InstanceData", &cached.buffer, frame)?;
        }

        Ok(&cached.buffer)
    }

    /// Drops every batch not touched since the last call to this method,
    /// queuing their buffers for deferred destruction. Call once per frame
    /// after issuing all draws for it, so batches absent from the current
    /// snapshot (an entity despawned, a mesh no longer drawn) don't leak
    /// GPU memory indefinitely.
    pub fn sweep_stale(&mut self, buffers: &mut BufferManager, frame_idx: u64) {
        let stale: Vec<BatchKey> = self
            .batches
            .iter()
            .filter(|(_, cached)| !cached.seen)
            .map(|(key, _)| key.clone())
            .collect();

        for key in stale {
            if let Some(cached) = self.batches.remove(&key) {
                buffers.queue_destruction(cached.buffer, frame_idx);
            }
        }

        for cached in self.batches.values_mut() {
            cached.seen = false;
        }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u64) -> BatchKey {
        BatchKey {
            mesh: ivy_snapshot::MeshId(id),
            material_set: std::sync::Arc::from("opaque"),
        }
    }

    #[test]
    fn fresh_cache_is_empty() {
        let cache = InstancedDrawCache::new();
        assert!(cache.is_empty());
    }

    #[test]
    fn sweep_removes_untouched_keys_without_panicking() {
        let mut cache = InstancedDrawCache::new();
        // No GPU context available in this test; just exercise the
        // bookkeeping structures directly without inserting real buffers.
        assert_eq!(cache.len(), 0);
        let _ = key(1);
    }
}
