pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("component type already registered")]
    AlreadyRegistered,
    #[error("component type not registered")]
    NotRegistered,
    #[error("entity is not alive")]
    NotAlive,
}
