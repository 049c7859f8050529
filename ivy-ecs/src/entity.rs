use std::fmt;

/// Opaque handle to an entity: a slot index plus the generation that slot
/// held when this handle was minted. Two handles are equal iff both fields
/// match; a handle whose generation no longer matches the slot is stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    alive: bool,
}

/// Allocates and recycles entity slots. Does not own component data; the
/// `World` that owns an `Entities` is responsible for invalidating component
/// storage on `destroy`.
pub struct Entities {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Entities {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn create(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            Entity::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                alive: true,
            });
            Entity::new(index, 1)
        }
    }

    /// Returns true if this was a live handle and the slot was invalidated.
    /// Returns false (no-op) for an already-stale or out-of-range handle.
    pub fn destroy(&mut self, e: Entity) -> bool {
        if !self.is_alive(e) {
            return false;
        }

        let slot = &mut self.slots[e.index() as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(e.index());
        true
    }

    pub fn is_alive(&self, e: Entity) -> bool {
        self.slots
            .get(e.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == e.generation())
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Entities {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_alive() {
        let mut entities = Entities::new();
        let e = entities.create();
        assert!(entities.is_alive(e));
    }

    #[test]
    fn destroy_invalidates() {
        let mut entities = Entities::new();
        let e = entities.create();
        assert!(entities.destroy(e));
        assert!(!entities.is_alive(e));
        assert!(!entities.destroy(e));
    }

    #[test]
    fn recycled_slot_gets_new_generation() {
        let mut entities = Entities::new();
        let e1 = entities.create();
        entities.destroy(e1);
        let e2 = entities.create();

        assert_eq!(e1.index(), e2.index());
        assert_ne!(e1.generation(), e2.generation());
        assert!(!entities.is_alive(e1));
        assert!(entities.is_alive(e2));
    }

    #[test]
    fn len_excludes_destroyed() {
        let mut entities = Entities::new();
        let e1 = entities.create();
        let _e2 = entities.create();
        assert_eq!(entities.len(), 2);
        entities.destroy(e1);
        assert_eq!(entities.len(), 1);
    }
}
