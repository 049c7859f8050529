use thiserror::Error;

use crate::{NodeIndex, NodeKind, ResourceKind};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Vulkan(#[from] ivy_vulkan::Error),

    #[error(transparent)]
    Binding(#[from] ivy_vulkan::BindingError),

    #[error(transparent)]
    Graphics(#[from] ivy_graphics::Error),

    #[error("Dependency cycle in rendergraph")]
    DependencyCycle,

    #[error("Node {1} ({0:?}) reads a resource with no prior write: {2:?}")]
    MissingWrite(NodeIndex, &'static str, ResourceKind),

    #[error("Resource acquisition error {0}")]
    Resource(#[from] ivy_resources::Error),

    #[error("Invalid node index {0:?}")]
    InvalidNodeIndex(NodeIndex),

    #[error("Specified node {0:?} is not the correct kind. Expected {1:?}, found {2:?}")]
    InvalidNodeKind(NodeIndex, NodeKind, NodeKind),
}
