use std::collections::HashMap;

use ash::vk::{DescriptorSet, IndexType};
use ivy_base::Events;
use ivy_graphics::{InstancedDrawCache, MaterialSetRegistry, Mesh, TextureSetRegistry};
use ivy_resources::{Handle, ResourceCache, Resources};
use ivy_snapshot::{MeshId, Snapshot};
use ivy_vulkan::buffer_manager::BufferManager;
use ivy_vulkan::commands::CommandBuffer;
use ivy_vulkan::{PassInfo, Pipeline, ResourceBinder, Texture};

use crate::{AttachmentInfo, Node, NodeKind, Result};

/// Draws every batch in the snapshot with one `vkCmdDrawIndexed` per unique
/// `(mesh, material_set)` pair, instanced over its entry count.
/// `gl_InstanceIndex` indexes the instance-data storage buffer bound by
/// [`InstancedDrawCache`]; per-material data and the bindless texture array
/// are bound from the linked [`MaterialSetRegistry`]/[`TextureSetRegistry`]
/// entries.
pub struct GeometryNode {
    pipeline: Pipeline,
    color_attachment: AttachmentInfo,
    depth_attachment: AttachmentInfo,
    clear_values: [ash::vk::ClearValue; 2],
    meshes: ResourceCache<Mesh>,
    mesh_ids: HashMap<MeshId, Handle<Mesh>>,
    material_sets: MaterialSetRegistry,
    texture_sets: TextureSetRegistry,
    instances: InstancedDrawCache,
    buffers: BufferManager,
    /// Descriptor sets bound ahead of the per-batch ones, e.g. the camera
    /// uniform (set 0) and light list (set 1). Owned by the caller since
    /// their lifetime spans the whole frame, not just this node.
    leading_sets: Vec<DescriptorSet>,
}

const MATERIAL_DATA_BINDING: &str = "MaterialData";
const TEXTURES_BINDING: &str = "Textures";

impl GeometryNode {
    /// `color_target` is the texture this node renders into; downstream
    /// nodes (e.g. a swapchain present node) declare it as a read
    /// attachment so the graph can order the passes correctly. `depth_target`
    /// backs the depth test the pipeline always enables.
    pub fn new(
        pipeline: Pipeline,
        color_target: Handle<Texture>,
        depth_target: Handle<Texture>,
        buffers: BufferManager,
    ) -> Self {
        let color_attachment = AttachmentInfo::color(color_target);
        let depth_attachment = AttachmentInfo::depth_discard(depth_target);
        let clear_values = [color_attachment.clear_value, depth_attachment.clear_value];

        Self {
            pipeline,
            color_attachment,
            depth_attachment,
            clear_values,
            meshes: ResourceCache::new(),
            mesh_ids: HashMap::new(),
            material_sets: MaterialSetRegistry::new(),
            texture_sets: TextureSetRegistry::new(),
            instances: InstancedDrawCache::new(),
            buffers,
            leading_sets: Vec::new(),
        }
    }

    pub fn set_leading_sets(&mut self, sets: Vec<DescriptorSet>) {
        self.leading_sets = sets;
    }

    pub fn register_mesh(&mut self, id: MeshId, mesh: Mesh) -> Handle<Mesh> {
        let handle = self.meshes.insert(mesh);
        self.mesh_ids.insert(id, handle);
        handle
    }

    pub fn material_sets(&mut self) -> &mut MaterialSetRegistry {
        &mut self.material_sets
    }

    pub fn texture_sets(&mut self) -> &mut TextureSetRegistry {
        &mut self.texture_sets
    }

    pub fn buffers(&mut self) -> &mut BufferManager {
        &mut self.buffers
    }

    /// Rebuilds a texture set's descriptor-info slice against the given
    /// caches. See [`TextureSet::rebuild`](ivy_graphics::TextureSet::rebuild).
    pub fn rebuild_texture_set(
        &mut self,
        name: &str,
        textures: &ivy_resources::ResourceCache<ivy_vulkan::Texture>,
        samplers: &ivy_resources::ResourceCache<ivy_vulkan::Sampler>,
        events: &Events,
    ) -> Result<bool> {
        Ok(self.texture_sets.rebuild_set(name, textures, samplers, events)?)
    }

    /// Re-encodes a material set's packed buffer against its linked texture
    /// set. Exposed as one call since the two registries and the buffer
    /// manager are disjoint fields of this node but private to callers
    /// outside this module.
    pub fn rebuild_material_set(&mut self, name: &str, frame_idx: u64) -> Result<bool> {
        Ok(self
            .material_sets
            .rebuild_set(name, &self.texture_sets, &mut self.buffers, frame_idx)?)
    }

    /// Adds a material to `name`, registering `albedo` with its linked
    /// texture set. See [`MaterialSetRegistry::add_material_to_set`].
    pub fn add_material_to_set(
        &mut self,
        name: &str,
        albedo: Handle<Texture>,
    ) -> Result<u32> {
        Ok(self
            .material_sets
            .add_material_to_set(name, albedo, &mut self.texture_sets)?)
    }
}

impl Node for GeometryNode {
    fn color_attachments(&self) -> &[AttachmentInfo] {
        std::slice::from_ref(&self.color_attachment)
    }

    fn depth_attachment(&self) -> Option<&AttachmentInfo> {
        Some(&self.depth_attachment)
    }

    fn clear_values(&self) -> &[ash::vk::ClearValue] {
        // Renderpass attachment order is color then depth; see `color_attachments`/`depth_attachment`.
        &self.clear_values
    }

    fn node_kind(&self) -> NodeKind {
        NodeKind::Graphics
    }

    fn debug_name(&self) -> &'static str {
        "Geometry Node"
    }

    fn execute(
        &mut self,
        snapshot: &Snapshot,
        _resources: &Resources,
        binder: &mut ResourceBinder,
        cmd: &CommandBuffer,
        _pass_info: &PassInfo,
        current_frame: usize,
    ) -> Result<()> {
        self.buffers.begin_frame(current_frame as u64);

        cmd.bind_pipeline(self.pipeline.pipeline());

        if !self.leading_sets.is_empty() {
            cmd.bind_descriptor_sets(self.pipeline.layout(), 0, &self.leading_sets, &[]);
        }

        for (key, instances) in snapshot.batches.iter() {
            if instances.is_empty() {
                continue;
            }

            let mesh_handle = match self.mesh_ids.get(&key.mesh) {
                Some(handle) => *handle,
                None => continue,
            };
            let mesh = self.meshes.get(mesh_handle)?;

            let material_set = match self.material_sets.get(&key.material_set) {
                Ok(set) => set,
                Err(_) => continue,
            };
            let material_buffer = match material_set.buffer() {
                Some(buf) => buf,
                None => continue,
            };
            let texture_set = self.texture_sets.get(material_set.texture_set_name())?;

            binder.bind_storage_buffer_named(
                &self.pipeline,
                MATERIAL_DATA_BINDING,
                material_buffer,
                current_frame,
            )?;
            binder.bind_texture_array_named(
                &self.pipeline,
                TEXTURES_BINDING,
                texture_set.combined_samplers(),
                texture_set.generation(),
                current_frame,
            )?;

            self.instances.get_or_upload(
                key,
                instances,
                snapshot.generation,
                &key.material_set,
                &mut self.buffers,
                binder,
                &self.pipeline,
                current_frame as u64,
                current_frame,
            )?;

            binder.update_frame(current_frame)?;

            let geometry_set = binder.descriptor_set(&self.pipeline, 1, current_frame)?;
            cmd.bind_descriptor_sets(
                self.pipeline.layout(),
                self.leading_sets.len() as u32,
                &[geometry_set],
                &[],
            );

            cmd.bind_vertexbuffer(0, mesh.vertex_buffer());
            cmd.bind_indexbuffer(mesh.index_buffer(), IndexType::UINT32, 0);
            cmd.draw_indexed(mesh.index_count(), instances.len() as u32, 0, 0, 0);
        }

        self.instances.sweep_stale(&mut self.buffers, current_frame as u64);

        Ok(())
    }
}
