use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::entity::{Entities, Entity};
use crate::error::{Error, Result};
use crate::storage::DenseSet;

trait AnyStorage: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove_dyn(&mut self, e: Entity);
}

impl<T: 'static> AnyStorage for DenseSet<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_dyn(&mut self, e: Entity) {
        self.remove(e);
    }
}

/// The dense-set ECS world: owns entity slots and one `DenseSet<T>` per
/// registered component type `T`.
pub struct World {
    entities: Entities,
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: Entities::new(),
            storages: HashMap::new(),
        }
    }

    pub fn create_entity(&mut self) -> Entity {
        self.entities.create()
    }

    /// Invalidates the entity and removes its component from every
    /// registered storage. No-op (returns `Error::NotAlive`) for an
    /// already-stale handle, matching "operating on a destroyed handle
    /// returns None/error" for the ECS core's failure modes.
    pub fn destroy_entity(&mut self, e: Entity) -> Result<()> {
        if !self.entities.is_alive(e) {
            return Err(Error::NotAlive);
        }

        for storage in self.storages.values_mut() {
            storage.remove_dyn(e);
        }

        self.entities.destroy(e);
        Ok(())
    }

    pub fn is_alive(&self, e: Entity) -> bool {
        self.entities.is_alive(e)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn register_component<T: 'static>(&mut self) -> Result<()> {
        if self.storages.contains_key(&TypeId::of::<T>()) {
            return Err(Error::AlreadyRegistered);
        }

        self.storages
            .insert(TypeId::of::<T>(), Box::new(DenseSet::<T>::new()));
        Ok(())
    }

    fn storage<T: 'static>(&self) -> Result<&DenseSet<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .ok_or(Error::NotRegistered)
            .map(|s| s.as_any().downcast_ref::<DenseSet<T>>().unwrap())
    }

    fn storage_mut<T: 'static>(&mut self) -> Result<&mut DenseSet<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .ok_or(Error::NotRegistered)
            .map(|s| s.as_any_mut().downcast_mut::<DenseSet<T>>().unwrap())
    }

    /// Adds (or replaces) `value` on `e`. Returns `Error::NotAlive` for a
    /// stale handle so callers cannot attach components to dead entities.
    pub fn add<T: 'static>(&mut self, e: Entity, value: T) -> Result<()> {
        if !self.entities.is_alive(e) {
            return Err(Error::NotAlive);
        }

        self.storage_mut::<T>()?.insert(e, value);
        Ok(())
    }

    pub fn remove<T: 'static>(&mut self, e: Entity) -> Result<Option<T>> {
        Ok(self.storage_mut::<T>()?.remove(e))
    }

    pub fn get<T: 'static>(&self, e: Entity) -> Result<Option<&T>> {
        if !self.entities.is_alive(e) {
            return Ok(None);
        }
        Ok(self.storage::<T>()?.get(e))
    }

    pub fn get_mut<T: 'static>(&mut self, e: Entity) -> Result<Option<&mut T>> {
        if !self.entities.is_alive(e) {
            return Ok(None);
        }
        self.storage_mut::<T>().map(|s| s.get_mut(e))
    }

    pub fn view<Q: ViewQuery>(&self) -> Result<View<'_, Q>> {
        Q::check(self)?;
        Ok(View {
            world: self,
            _marker: std::marker::PhantomData,
        })
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Yielded by [`World::view`]; iterates the intersection of the queried
/// component types' owners, shortest dense set first.
pub struct View<'w, Q> {
    world: &'w World,
    _marker: std::marker::PhantomData<Q>,
}

impl<'w, Q: ViewQuery> View<'w, Q> {
    pub fn iter(&self) -> impl Iterator<Item = (Entity, Q::Item<'w>)> + 'w {
        Q::iter(self.world)
    }
}

/// Implemented for tuples of component-access markers. `check` validates
/// every member type is registered; `iter` drives the intersection scan.
pub trait ViewQuery: Sized {
    type Item<'w>;

    fn check(world: &World) -> Result<()>;
    fn iter(world: &World) -> Box<dyn Iterator<Item = (Entity, Self::Item<'_>)> + '_>;
}

impl<A: 'static> ViewQuery for (A,) {
    type Item<'w> = &'w A;

    fn check(world: &World) -> Result<()> {
        world.storage::<A>().map(|_| ())
    }

    fn iter(world: &World) -> Box<dyn Iterator<Item = (Entity, Self::Item<'_>)> + '_> {
        Box::new(world.storage::<A>().unwrap().iter())
    }
}

impl<A: 'static, B: 'static> ViewQuery for (A, B) {
    type Item<'w> = (&'w A, &'w B);

    fn check(world: &World) -> Result<()> {
        world.storage::<A>()?;
        world.storage::<B>()?;
        Ok(())
    }

    fn iter(world: &World) -> Box<dyn Iterator<Item = (Entity, Self::Item<'_>)> + '_> {
        let a = world.storage::<A>().unwrap();
        let b = world.storage::<B>().unwrap();
        Box::new(a.iter().filter_map(move |(e, va)| Some((e, (va, b.get(e)?)))))
    }
}

impl<A: 'static, B: 'static, C: 'static> ViewQuery for (A, B, C) {
    type Item<'w> = (&'w A, &'w B, &'w C);

    fn check(world: &World) -> Result<()> {
        world.storage::<A>()?;
        world.storage::<B>()?;
        world.storage::<C>()?;
        Ok(())
    }

    fn iter(world: &World) -> Box<dyn Iterator<Item = (Entity, Self::Item<'_>)> + '_> {
        let a = world.storage::<A>().unwrap();
        let b = world.storage::<B>().unwrap();
        let c = world.storage::<C>().unwrap();
        Box::new(
            a.iter()
                .filter_map(move |(e, va)| Some((e, (va, b.get(e)?, c.get(e)?)))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pos(f32);
    struct Vel(f32);

    #[test]
    fn destroyed_entity_get_returns_none() {
        let mut world = World::new();
        world.register_component::<Pos>().unwrap();
        let e = world.create_entity();
        world.add(e, Pos(1.0)).unwrap();
        world.destroy_entity(e).unwrap();
        assert_eq!(world.get::<Pos>(e).unwrap(), None);
    }

    #[test]
    fn double_register_errors() {
        let mut world = World::new();
        world.register_component::<Pos>().unwrap();
        assert!(matches!(
            world.register_component::<Pos>(),
            Err(Error::AlreadyRegistered)
        ));
    }

    #[test]
    fn view_intersection() {
        let mut world = World::new();
        world.register_component::<Pos>().unwrap();
        world.register_component::<Vel>().unwrap();

        let e1 = world.create_entity();
        world.add(e1, Pos(0.0)).unwrap();
        world.add(e1, Vel(1.0)).unwrap();

        let e2 = world.create_entity();
        world.add(e2, Pos(0.0)).unwrap();
        // e2 has no Vel: excluded from the (Pos, Vel) view.

        let view = world.view::<(Pos, Vel)>().unwrap();
        let matched: Vec<_> = view.iter().map(|(e, _)| e).collect();
        assert_eq!(matched, vec![e1]);
    }

    #[test]
    fn empty_view_allocates_nothing_observable() {
        let mut world = World::new();
        world.register_component::<Pos>().unwrap();
        let view = world.view::<(Pos,)>().unwrap();
        assert_eq!(view.iter().count(), 0);
    }
}
