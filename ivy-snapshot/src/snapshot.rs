use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec3};

/// Opaque mesh identity within a snapshot. The render thread resolves this
/// to an actual GPU mesh via its own resource cache; the snapshot itself
/// never touches GPU handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u64);

#[derive(Debug, Clone, Copy)]
pub struct CameraData {
    pub view: Mat4,
    pub proj: Mat4,
    pub position: Vec3,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// One entity's contribution to the snapshot: everything the geometry pass
/// needs to instance-batch and draw it, without touching the ECS world.
#[derive(Debug, Clone)]
pub struct EntityRenderRecord {
    pub world_matrix: Mat4,
    pub mesh: MeshId,
    pub material_buffer_index: u32,
    pub material_set: Arc<str>,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct LightRecord {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub shadow_bits: u32,
}

/// Per-instance record matching the `InstanceData` std430 SSBO layout:
/// `mat4 model; uint material_index; uint _pad[3];` = 80 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRecord {
    pub model: [f32; 16],
    pub material_index: u32,
    pub _pad: [u32; 3],
}

impl InstanceRecord {
    pub fn new(world_matrix: Mat4, material_index: u32) -> Self {
        Self {
            model: world_matrix.to_cols_array(),
            material_index,
            _pad: [0; 3],
        }
    }
}

const _: () = assert!(std::mem::size_of::<InstanceRecord>() == 80);

/// Key identifying one instanced batch within a snapshot: a unique mesh
/// paired with the material set its instances draw against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub mesh: MeshId,
    pub material_set: Arc<str>,
}

/// Immutable, self-contained per-tick record. Owns its arrays; `clear`
/// truncates them (keeping allocated capacity) so the slot that owns this
/// snapshot object can rebuild into the same backing storage next cycle
/// instead of allocating fresh buffers every tick — this is the "returned
/// to a pool" behaviour, implemented in place rather than via a separate
/// free-list.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub generation: u64,
    pub camera: CameraData,
    pub entities: Vec<EntityRenderRecord>,
    pub lights: Vec<LightRecord>,
    pub batches: HashMap<BatchKey, Vec<InstanceRecord>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncates all arrays to empty while keeping their capacity, and
    /// rebuilds `batches` from `entities` grouped by `(mesh, material_set)`.
    /// Called by the producer once per tick after extraction, before the
    /// generation is bumped and the slot is published.
    pub fn rebuild_batches(&mut self) {
        for batch in self.batches.values_mut() {
            batch.clear();
        }

        for entity in &self.entities {
            let key = BatchKey {
                mesh: entity.mesh,
                material_set: entity.material_set.clone(),
            };
            self.batches.entry(key).or_default().push(InstanceRecord::new(
                entity.world_matrix,
                entity.material_buffer_index,
            ));
        }

        self.batches.retain(|_, instances| !instances.is_empty());
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.lights.clear();
        self.batches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_record_is_80_bytes() {
        assert_eq!(std::mem::size_of::<InstanceRecord>(), 80);
    }

    #[test]
    fn rebuild_batches_coalesces_identical_mesh_and_set() {
        let mut snap = Snapshot::new();
        let opaque: Arc<str> = Arc::from("opaque");
        for _ in 0..100 {
            snap.entities.push(EntityRenderRecord {
                world_matrix: Mat4::IDENTITY,
                mesh: MeshId(1),
                material_buffer_index: 0,
                material_set: opaque.clone(),
                flags: 0,
            });
        }
        snap.rebuild_batches();

        assert_eq!(snap.batches.len(), 1);
        let only = snap.batches.values().next().unwrap();
        assert_eq!(only.len(), 100);
    }

    #[test]
    fn empty_batch_is_skipped() {
        let mut snap = Snapshot::new();
        snap.rebuild_batches();
        assert!(snap.batches.is_empty());
    }
}
