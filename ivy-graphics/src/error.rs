use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Graphics vulkan error")]
    Vulkan(#[from] ivy_vulkan::Error),

    #[error(transparent)]
    Binding(#[from] ivy_vulkan::BindingError),

    #[error(transparent)]
    Buffer(#[from] ivy_vulkan::buffer_manager::Error),

    #[error("Graphics resource error")]
    ResourceError(#[from] ivy_resources::Error),

    #[error("Attempt to create mesh with no vertices")]
    EmptyMesh,

    #[error("No texture set named \"{0}\"")]
    UnknownTextureSet(String),

    #[error("No material set named \"{0}\"")]
    UnknownMaterialSet(String),

    #[error("Texture set \"{0}\" has no texture at asset id {1}")]
    UnknownTexture(String, u64),

    #[error(
        "Material set \"{0}\" cannot rebuild while its linked texture set has generation 0"
    )]
    TextureSetNotReady(String),
}
