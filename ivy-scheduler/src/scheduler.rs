use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ivy_ecs::World;
use ivy_threadpool::{Priority as PoolPriority, Subsystem, ThreadPool};
use parking_lot::Mutex;

use crate::access::{conflicts, AccessSet};
use crate::error::{Error, Result};
use crate::shared_ptr::SharedMut;

type SystemFn = dyn Fn(&mut World, f32) -> anyhow::Result<()> + Send + Sync;

struct SystemEntry {
    name: &'static str,
    access: AccessSet,
    priority: PoolPriority,
    run: Arc<SystemFn>,
}

/// An error produced by one system during a stage. The stage keeps running
/// the other systems; these are surfaced to the caller as a per-frame error
/// list rather than unwinding.
#[derive(Debug)]
pub struct SystemError {
    pub stage: usize,
    pub system: &'static str,
    pub error: anyhow::Error,
}

/// Ordered stages of systems, each system carrying a declared `{reads,
/// writes}` type-id access set. Systems in the same stage whose access sets
/// do not conflict run concurrently on the thread pool's `ecs_update`
/// subsystem.
pub struct Scheduler {
    systems: Vec<SystemEntry>,
    stages: Vec<Vec<usize>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// Appends a new, empty stage and returns its index.
    pub fn add_stage(&mut self) -> usize {
        self.stages.push(Vec::new());
        self.stages.len() - 1
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Registers a system into `stage`. Refuses registration
    /// (`Error::ConflictingAccess`) if the system's access set conflicts
    /// with one already registered in the same stage, per the scheduler's
    /// "must be split into stages" rule.
    pub fn register_system<F>(
        &mut self,
        stage: usize,
        name: &'static str,
        access: AccessSet,
        priority: PoolPriority,
        run: F,
    ) -> Result<()>
    where
        F: Fn(&mut World, f32) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let stage_systems = self
            .stages
            .get(stage)
            .ok_or(Error::UnknownStage(stage))?
            .clone();

        for idx in stage_systems {
            let existing = &self.systems[idx];
            if conflicts(&access, &existing.access) {
                return Err(Error::ConflictingAccess {
                    new: name,
                    existing: existing.name,
                });
            }
        }

        let idx = self.systems.len();
        self.systems.push(SystemEntry {
            name,
            access,
            priority,
            run: Arc::new(run),
        });
        self.stages[stage].push(idx);
        Ok(())
    }

    /// Runs every stage in order against `world`, blocking the calling
    /// thread until each stage's systems have all completed before the next
    /// stage starts. Returns every system error collected across all
    /// stages; the caller decides whether/how to surface them (end-of-frame
    /// logging, typically).
    pub fn run(&self, pool: &ThreadPool, world: &mut World, dt: f32) -> Vec<SystemError> {
        let mut errors = Vec::new();
        for stage_idx in 0..self.stages.len() {
            errors.extend(self.run_stage(pool, stage_idx, world, dt));
        }
        errors
    }

    fn run_stage(
        &self,
        pool: &ThreadPool,
        stage_idx: usize,
        world: &mut World,
        dt: f32,
    ) -> Vec<SystemError> {
        let stage = &self.stages[stage_idx];
        if stage.is_empty() {
            return Vec::new();
        }

        let completion = Arc::new(AtomicUsize::new(stage.len()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let shared_world: SharedMut<World> = SharedMut::new(world);

        for &idx in stage {
            let entry = &self.systems[idx];
            let run = entry.run.clone();
            let name = entry.name;
            let completion = completion.clone();
            let errors = errors.clone();
            let world = shared_world;

            let submitted = pool.submit_work(Subsystem::EcsUpdate, entry.priority, move || {
                // Safety: systems within a stage are registered only if their
                // declared access sets are pairwise non-conflicting.
                let world = unsafe { world.get() };
                if let Err(error) = run(world, dt) {
                    log::warn!("system '{name}' returned an error: {error:#}");
                    errors.lock().push(SystemError {
                        stage: stage_idx,
                        system: name,
                        error,
                    });
                }
                completion.fetch_sub(1, Ordering::Release);
            });

            if submitted.is_err() {
                // Queue full: run inline so the stage still completes.
                let world = unsafe { shared_world.get() };
                if let Err(error) = (self.systems[idx].run)(world, dt) {
                    errors.lock().push(SystemError {
                        stage: stage_idx,
                        system: self.systems[idx].name,
                        error,
                    });
                }
                completion.fetch_sub(1, Ordering::Release);
            }
        }

        while completion.load(Ordering::Acquire) > 0 {
            std::thread::yield_now();
        }

        Arc::try_unwrap(errors).unwrap().into_inner()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(Scheduler: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use ivy_threadpool::SubsystemConfig;

    struct Position(f32);
    struct Velocity(f32);

    fn pool() -> ThreadPool {
        ThreadPool::new([(Subsystem::EcsUpdate, SubsystemConfig::default())])
    }

    #[test]
    fn conflicting_same_stage_registration_rejected() {
        let mut scheduler = Scheduler::new();
        let stage = scheduler.add_stage();
        scheduler
            .register_system(
                stage,
                "move",
                AccessSet::new().writes::<Position>().reads::<Velocity>(),
                PoolPriority::Normal,
                |_, _| Ok(()),
            )
            .unwrap();

        let err = scheduler
            .register_system(
                stage,
                "also_moves",
                AccessSet::new().writes::<Position>(),
                PoolPriority::Normal,
                |_, _| Ok(()),
            )
            .unwrap_err();

        assert!(matches!(err, Error::ConflictingAccess { .. }));
    }

    #[test]
    fn stages_run_in_order() {
        let mut world = World::new();
        world.register_component::<Position>().unwrap();
        let e = world.create_entity();
        world.add(e, Position(0.0)).unwrap();

        let mut scheduler = Scheduler::new();
        let s0 = scheduler.add_stage();
        let s1 = scheduler.add_stage();

        scheduler
            .register_system(
                s0,
                "set_one",
                AccessSet::new().writes::<Position>(),
                PoolPriority::Normal,
                |world, _| {
                    let e = world.view::<(Position,)>()?.iter().next().unwrap().0;
                    *world.get_mut::<Position>(e)?.unwrap() = Position(1.0);
                    Ok(())
                },
            )
            .unwrap();

        scheduler
            .register_system(
                s1,
                "read_and_double",
                AccessSet::new().writes::<Position>(),
                PoolPriority::Normal,
                |world, _| {
                    let e = world.view::<(Position,)>()?.iter().next().unwrap().0;
                    let value = world.get::<Position>(e)?.unwrap().0;
                    world.get_mut::<Position>(e)?.unwrap().0 = value * 2.0;
                    Ok(())
                },
            )
            .unwrap();

        let pool = pool();
        let errors = scheduler.run(&pool, &mut world, 1.0 / 60.0);
        assert!(errors.is_empty());
        assert_eq!(world.get::<Position>(e).unwrap().unwrap().0, 2.0);
        pool.shutdown();
        pool.join();
    }

    #[test]
    fn system_error_does_not_abort_stage() {
        let mut world = World::new();
        world.register_component::<Position>().unwrap();
        let e = world.create_entity();
        world.add(e, Position(0.0)).unwrap();

        let mut scheduler = Scheduler::new();
        let stage = scheduler.add_stage();
        scheduler
            .register_system(
                stage,
                "fails",
                AccessSet::new().writes::<Velocity>(),
                PoolPriority::Normal,
                |_, _| anyhow::bail!("boom"),
            )
            .unwrap();
        scheduler
            .register_system(
                stage,
                "succeeds",
                AccessSet::new().writes::<Position>(),
                PoolPriority::Normal,
                |world, _| {
                    let e = world.view::<(Position,)>()?.iter().next().unwrap().0;
                    world.get_mut::<Position>(e)?.unwrap().0 = 9.0;
                    Ok(())
                },
            )
            .unwrap();

        let pool = pool();
        let errors = scheduler.run(&pool, &mut world, 1.0 / 60.0);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].system, "fails");
        assert_eq!(world.get::<Position>(e).unwrap().unwrap().0, 9.0);
        pool.shutdown();
        pool.join();
    }
}
