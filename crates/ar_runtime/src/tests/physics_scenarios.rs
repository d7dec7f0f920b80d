//! Physics scenarios: head-on elastic collision, static versus dynamic
//! resolution, run-to-run determinism

use crate::core::PhysicsConfig;
use crate::foundation::collections::{BodyHandle, EntityId, SlotMap};
use crate::foundation::math::{Quat, Vec3};
use crate::physics::{CollisionShape, PhysicsEvent, PhysicsWorld, RigidBodyDesc};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn owners(count: usize) -> Vec<EntityId> {
        let mut entities: SlotMap<EntityId, ()> = SlotMap::with_key();
        (0..count).map(|_| entities.insert(())).collect()
    }

    fn sphere(position: Vec3, velocity: Vec3, restitution: f32) -> RigidBodyDesc {
        RigidBodyDesc::dynamic()
            .with_shape(CollisionShape::sphere(0.5))
            .with_position(position)
            .with_linear_velocity(velocity)
            .with_damping(0.0, 0.0)
            .with_mass(1.0)
            .with_restitution(restitution)
    }

    #[test]
    fn test_equal_spheres_exchange_velocities_head_on() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default().with_gravity(Vec3::zeros()));
        let ids = owners(2);
        let left = world.add_body(ids[0], sphere(Vec3::new(-0.45, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 1.0));
        let right = world.add_body(ids[1], sphere(Vec3::new(0.45, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 1.0));

        world.step(DT);

        let left_body = world.body(left).expect("left");
        let right_body = world.body(right).expect("right");
        assert!(left_body.position.x < -0.45);
        assert!(right_body.position.x > 0.45);
        assert_relative_eq!(left_body.linear_velocity, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(right_body.linear_velocity, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);

        let began = world
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, PhysicsEvent::CollisionBegan(_)))
            .count();
        assert_eq!(began, 2);

        // Moving apart from here on
        let gap_before = world.body(right).expect("right").position.x - world.body(left).expect("left").position.x;
        world.step(DT);
        let gap_after = world.body(right).expect("right").position.x - world.body(left).expect("left").position.x;
        assert!(gap_after > gap_before);
    }

    #[test]
    fn test_only_dynamic_body_moves_out_of_static_overlap() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let ids = owners(2);
        let pillar = world.add_body(
            ids[0],
            RigidBodyDesc::fixed()
                .with_shape(CollisionShape::cuboid(Vec3::new(0.5, 0.5, 0.5)))
                .with_position(Vec3::new(0.0, 0.0, 0.0)),
        );
        let crate_body = world.add_body(ids[1], sphere(Vec3::new(0.0, 0.7, 0.0), Vec3::zeros(), 0.2));

        for _ in 0..10 {
            world.step(DT);
        }

        let pillar_body = world.body(pillar).expect("pillar");
        assert_eq!(pillar_body.position, Vec3::zeros());
        assert_eq!(pillar_body.rotation, Quat::identity());
        assert!(world.body(crate_body).expect("crate").position.y >= 0.99 - 1e-3);
    }

    #[test]
    fn test_scattered_scene_is_reproducible() {
        let run = || {
            let mut world = PhysicsWorld::new(PhysicsConfig::default());
            let ids = owners(7);
            world.add_body(
                ids[0],
                RigidBodyDesc::fixed()
                    .with_shape(CollisionShape::sphere(3.0))
                    .with_position(Vec3::new(0.0, -3.0, 0.0)),
            );
            let handles: Vec<BodyHandle> = ids[1..]
                .iter()
                .enumerate()
                .map(|(i, &owner)| {
                    let offset = i as f32;
                    world.add_body(
                        owner,
                        sphere(
                            Vec3::new(offset * 0.3 - 0.75, 1.0 + offset * 0.6, offset * 0.1),
                            Vec3::new(0.2, 0.0, -0.1),
                            0.4,
                        ),
                    )
                })
                .collect();
            world.simulate(0.5);
            for _ in 0..90 {
                world.simulate(DT);
            }
            handles
                .iter()
                .map(|&handle| world.body(handle).map(|body| (body.position, body.linear_velocity)))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }
}
