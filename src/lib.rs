//! # Ivy
//!
//! A real-time Vulkan rendering engine core: an ECS world and parallel
//! extraction stage produce an immutable per-frame snapshot, handed off
//! across a double-buffered sim/render boundary to a render graph that
//! compiles passes into a DAG and manages GPU resources through a
//! generation-tracked binding registry.
//!
//! This crate re-exports every engine crate; each can also be depended on
//! directly.
//!
//! - [`base`] — clock, logging, config, extent and other small shared types.
//! - [`resources`] — generational `Handle<T>`/`ResourceCache<T>` storage.
//! - [`ecs`] — the ECS world.
//! - [`scheduler`] — the system scheduler running ECS stages on the thread pool.
//! - [`threadpool`] — the per-subsystem priority thread pool.
//! - [`snapshot`] — the per-frame game-state snapshot and sim/render hand-off.
//! - [`vulkan`] — Vulkan device/swapchain/buffer/descriptor plumbing.
//! - [`rendergraph`] — the render graph and its built-in nodes.
//! - [`graphics`] — material/texture sets, meshes, camera, the geometry pass.

pub use ivy_base as base;
pub use ivy_ecs as ecs;
pub use ivy_graphics as graphics;
pub use ivy_rendergraph as rendergraph;
pub use ivy_resources as resources;
pub use ivy_scheduler as scheduler;
pub use ivy_snapshot as snapshot;
pub use ivy_threadpool as threadpool;
pub use ivy_vulkan as vulkan;
