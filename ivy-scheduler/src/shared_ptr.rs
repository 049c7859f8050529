/// Grants `Send + Sync` to a raw pointer so it can be captured by worker
/// closures dispatched onto the thread pool for the duration of a single
/// stage.
///
/// Safety contract: the scheduler only ever dispatches systems within a
/// stage whose declared access sets are pairwise non-conflicting (see
/// [`crate::access::conflicts`]), so no two systems holding a `SharedMut` to
/// the same `World` within that stage ever touch overlapping component
/// storages at the same time. Holding this type outside of that guarantee
/// is unsound.
pub(crate) struct SharedMut<T>(*mut T);

unsafe impl<T> Send for SharedMut<T> {}
unsafe impl<T> Sync for SharedMut<T> {}

impl<T> SharedMut<T> {
    pub(crate) fn new(value: &mut T) -> Self {
        Self(value as *mut T)
    }

    /// # Safety
    /// Caller must uphold the non-aliasing contract documented on the type.
    pub(crate) unsafe fn get(&self) -> &mut T {
        &mut *self.0
    }
}

impl<T> Clone for SharedMut<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SharedMut<T> {}
