//! Dense-set entity-component-system world.
//!
//! Entities are generational handles; components live in packed per-type
//! arrays so iteration is cache-friendly and add/remove/get are O(1).

mod entity;
mod error;
mod storage;
mod world;

pub use entity::{Entities, Entity};
pub use error::{Error, Result};
pub use storage::DenseSet;
pub use world::{View, ViewQuery, World};
