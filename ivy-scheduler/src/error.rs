pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("system '{new}' writes a type already accessed by '{existing}' in the same stage")]
    ConflictingAccess {
        new: &'static str,
        existing: &'static str,
    },
    #[error("stage index {0} does not exist")]
    UnknownStage(usize),
}
