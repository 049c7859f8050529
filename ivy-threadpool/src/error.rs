pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("subsystem queue is at capacity")]
    QueueFull,
    #[error("unknown subsystem")]
    UnknownSubsystem,
}
