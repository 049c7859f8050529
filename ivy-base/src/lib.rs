//! Ivy-base
//!
//! Cross-cutting types depended on by nearly every other crate: the
//! [`Events`]/[`AppEvent`] pattern for broadcasting cross-thread
//! notifications (BVH completion, asset loads, shutdown requests),
//! [`Logger`]/tracing installation, time/[`Clock`], color and [`Extent`],
//! and [`EngineConfig`] for the values threaded through startup.

mod app_event;
mod color;
mod config;
mod dir;
mod events;
mod extent;
mod logger;
mod math;
mod time;

use std::f32::consts::PI;

pub use app_event::AppEvent;
pub use color::*;
pub use config::*;
pub use dir::*;
pub use events::{Event, EventSender, Events};
pub use extent::*;
pub use logger::{install_tracing, Logger};
pub use math::Inverse;
pub use time::{Clock, FromDuration, IntoDuration, TimedScope};

/// 45 degrees in radians
pub const DEG_45: f32 = PI * 0.25;
/// 90 degrees in radians
pub const DEG_90: f32 = PI * 0.5;
/// 180 degrees in radians
pub const DEG_180: f32 = PI;
