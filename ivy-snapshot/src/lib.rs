//! Double-buffered simulation/render snapshot hand-off.
//!
//! The simulation thread builds a [`Snapshot`] into one slot of a
//! [`Handoff`] while the render thread borrows the other; an atomic index
//! plus a pair of semaphores keep exactly one slot owned by each side at any
//! time.

mod handoff;
mod semaphore;
mod snapshot;

pub use handoff::Handoff;
pub use snapshot::{
    BatchKey, CameraData, EntityRenderRecord, InstanceRecord, LightRecord, MeshId, Snapshot,
};
