/// Top-level application control events, broadcast through [`crate::Events`]
/// rather than returned from a layer, so any layer (or an external signal
/// handler) can request shutdown without owning the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Exit,
}
