mod error;
mod geometry_node;
pub mod multi_node;
mod node;
pub(crate) mod pass;
mod rendergraph;
mod swapchain_node;
mod transfer_node;

pub use error::*;
pub use geometry_node::*;
pub use node::*;
pub use rendergraph::*;
pub use swapchain_node::*;
pub use transfer_node::*;
