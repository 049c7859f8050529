use ivy_resources::{Handle, Resources};
use ivy_snapshot::Snapshot;
use ivy_vulkan::{
    commands::CommandBuffer,
    vk::{self, Buffer},
    ImageLayout, LoadOp, PassInfo, ResourceBinder, StoreOp, Texture,
};

/// One node in the render graph. A node declares which textures/buffers it
/// reads and writes so [`crate::RenderGraph::build`] can derive subpass
/// dependencies and renderpass layout automatically; `execute` then records
/// the actual draw/transfer commands against the frame's immutable
/// [`Snapshot`].
pub trait Node: 'static + Send + Sync {
    /// Returns the color attachments for this node. Should not be execution heavy function
    fn color_attachments(&self) -> &[AttachmentInfo] {
        &[]
    }

    fn output_attachments(&self) -> &[Handle<Texture>] {
        &[]
    }
    /// Returns the read attachments for this node. Should not be execution heavy function
    fn read_attachments(&self) -> &[Handle<Texture>] {
        &[]
    }
    /// Partially sampled input attachments. Read from the same pixel coord we write to
    fn input_attachments(&self) -> &[Handle<Texture>] {
        &[]
    }
    /// Returns the optional depth attachment for this node. Should not be execution heavy function
    fn depth_attachment(&self) -> Option<&AttachmentInfo> {
        None
    }

    fn buffer_reads(&self) -> &[Buffer] {
        &[]
    }

    fn buffer_writes(&self) -> &[Buffer] {
        &[]
    }

    /// Returns the clear values to initiate this renderpass
    fn clear_values(&self) -> &[vk::ClearValue] {
        &[]
    }

    fn node_kind(&self) -> NodeKind;

    // Optional name, can be empty string
    fn debug_name(&self) -> &'static str;

    /// Execute this node inside a compatible renderpass. `binder` has
    /// already had [`ResourceBinder::update_frame`] called for
    /// `current_frame` by the owning [`crate::Pass`] before any node in that
    /// pass runs, so every descriptor set returned by
    /// `binder.descriptor_set(..)` is current.
    fn execute(
        &mut self,
        snapshot: &Snapshot,
        resources: &Resources,
        binder: &mut ResourceBinder,
        cmd: &CommandBuffer,
        pass_info: &PassInfo,
        current_frame: usize,
    ) -> crate::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    // A graphics rendering node. Renderpass and framebuffer will automatically be created.
    Graphics,
    // execution
    // A node that will be executed on the transfer queue. Appropriate pipeline barriers will
    // be inserted
    Transfer,
    // Compute,
}

#[derive(Clone)]
pub struct AttachmentInfo {
    pub store_op: StoreOp,
    pub load_op: LoadOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
    pub resource: Handle<Texture>,
    pub clear_value: vk::ClearValue,
}

fn color_clear(r: f32, g: f32, b: f32, a: f32) -> vk::ClearValue {
    vk::ClearValue {
        color: vk::ClearColorValue {
            float32: [r, g, b, a],
        },
    }
}

fn depth_stencil_clear(depth: f32, stencil: u32) -> vk::ClearValue {
    vk::ClearValue {
        depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
    }
}

impl AttachmentInfo {
    pub fn color(resource: Handle<Texture>) -> Self {
        Self {
            store_op: StoreOp::STORE,
            load_op: LoadOp::CLEAR,
            initial_layout: ImageLayout::UNDEFINED,
            final_layout: ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            clear_value: color_clear(0.0, 0.0, 0.0, 1.0),
            resource,
        }
    }

    pub fn depth_discard(resource: Handle<Texture>) -> Self {
        Self {
            store_op: StoreOp::DONT_CARE,
            load_op: LoadOp::CLEAR,
            initial_layout: ImageLayout::UNDEFINED,
            final_layout: ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            clear_value: depth_stencil_clear(1.0, 0),
            resource,
        }
    }

    pub fn depth_store(resource: Handle<Texture>) -> Self {
        Self {
            store_op: StoreOp::STORE,
            load_op: LoadOp::CLEAR,
            initial_layout: ImageLayout::UNDEFINED,
            final_layout: ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            clear_value: depth_stencil_clear(1.0, 0),
            resource,
        }
    }
}
