use glam::Vec3;
use ivy_engine::ecs::World;

struct Position(Vec3);
struct Velocity(Vec3);

#[test]
fn spawn_and_query_through_reexport() {
    let mut world = World::new();
    world.register_component::<Position>().unwrap();
    world.register_component::<Velocity>().unwrap();

    let e = world.create_entity();
    world.add(e, Position(Vec3::ZERO)).unwrap();
    world.add(e, Velocity(Vec3::new(1.0, 0.0, 0.0))).unwrap();

    let (_, (position, velocity)) = world
        .view::<(Position, Velocity)>()
        .unwrap()
        .iter()
        .next()
        .unwrap();

    assert_eq!(position.0, Vec3::ZERO);
    assert_eq!(velocity.0, Vec3::new(1.0, 0.0, 0.0));
}
