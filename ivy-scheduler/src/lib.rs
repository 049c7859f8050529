//! Multi-stage parallel system scheduler.
//!
//! Systems declare read/write type-id access sets; the scheduler infers
//! which same-stage systems may run concurrently on the ECS thread-pool
//! subsystem, refusing to register systems whose writes conflict with an
//! already-registered same-stage system.
//!
//! Known limitation (tracked, not detected): two systems in the same stage
//! with overlapping writes that are not registered as conflicting — e.g. by
//! declaring different component types that happen to alias the same
//! underlying data — are not caught here. The scheduler only reasons about
//! declared `TypeId` access sets.

mod access;
mod error;
mod scheduler;
mod shared_ptr;

pub use access::AccessSet;
pub use error::{Error, Result};
pub use scheduler::{Scheduler, SystemError};
