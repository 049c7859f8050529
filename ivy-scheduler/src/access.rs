use std::any::TypeId;

use smallvec::SmallVec;

/// A system's declared read/write type-id sets, used by the scheduler to
/// infer which same-stage systems may run concurrently.
#[derive(Default, Clone)]
pub struct AccessSet {
    pub(crate) reads: SmallVec<[TypeId; 8]>,
    pub(crate) writes: SmallVec<[TypeId; 8]>,
}

impl AccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads<T: 'static>(mut self) -> Self {
        self.reads.push(TypeId::of::<T>());
        self
    }

    pub fn writes<T: 'static>(mut self) -> Self {
        self.writes.push(TypeId::of::<T>());
        self
    }
}

/// Two systems conflict iff one writes a type the other reads or writes.
pub(crate) fn conflicts(a: &AccessSet, b: &AccessSet) -> bool {
    a.writes
        .iter()
        .any(|t| b.reads.contains(t) || b.writes.contains(t))
        || b.writes
            .iter()
            .any(|t| a.reads.contains(t) || a.writes.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    #[test]
    fn read_read_does_not_conflict() {
        let a = AccessSet::new().reads::<A>();
        let b = AccessSet::new().reads::<A>();
        assert!(!conflicts(&a, &b));
    }

    #[test]
    fn write_read_same_type_conflicts() {
        let a = AccessSet::new().writes::<A>();
        let b = AccessSet::new().reads::<A>();
        assert!(conflicts(&a, &b));
    }

    #[test]
    fn disjoint_types_do_not_conflict() {
        let a = AccessSet::new().writes::<A>();
        let b = AccessSet::new().writes::<B>();
        assert!(!conflicts(&a, &b));
    }
}
