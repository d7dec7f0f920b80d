//! Animation scenarios: controller-driven playback writing into a live
//! entity graph

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::animation::{Animation, AnimationController, Easing, PlaybackState};
use crate::core::AnimationConfig;
use crate::foundation::math::Vec3;
use crate::scene::EntityGraph;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn position(graph: &EntityGraph, entity: crate::foundation::collections::EntityId) -> Vec3 {
        graph.local_transform(entity).expect("live entity").position
    }

    #[test]
    fn test_infinite_loop_keeps_playing() {
        let mut graph = EntityGraph::new();
        let mut controller = AnimationController::new(&AnimationConfig::default());
        let cube = graph.create_entity("cube");
        let id = controller.play(Animation::move_to(cube, Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 1.0).with_loop(0));

        for _ in 0..4 {
            assert_eq!(controller.update(0.5, &mut graph), 0);
        }

        let animation = controller.get(id).expect("still owned");
        assert_eq!(animation.loops_completed(), 2);
        assert_eq!(animation.state(), PlaybackState::Playing);
        assert_relative_eq!(position(&graph, cube), Vec3::zeros(), epsilon = 1e-5);

        controller.update(0.25, &mut graph);
        assert_relative_eq!(position(&graph, cube), Vec3::new(0.25, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_ping_pong_runs_requested_cycles_then_completes_once() {
        let mut graph = EntityGraph::new();
        let mut controller = AnimationController::new(&AnimationConfig::default());
        let lamp = graph.create_entity("lamp");
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();

        let id = controller.play(
            Animation::scale_to(lamp, Vec3::repeat(1.0), Vec3::repeat(2.0), 1.0)
                .with_loop(2)
                .with_auto_reverse(true)
                .on_complete(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        );

        controller.update(0.5, &mut graph);
        assert_relative_eq!(graph.local_transform(lamp).expect("live").scale, Vec3::repeat(1.5), epsilon = 1e-5);
        controller.update(0.5, &mut graph);
        assert!(controller.get(id).expect("playing").is_reversing());

        let mut completed = 0;
        for _ in 0..6 {
            completed += controller.update(0.5, &mut graph);
        }

        assert_eq!(completed, 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!controller.contains(id));
        assert_relative_eq!(graph.local_transform(lamp).expect("live").scale, Vec3::repeat(1.0), epsilon = 1e-5);

        controller.update(0.5, &mut graph);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_target_destroyed_mid_animation() {
        let mut graph = EntityGraph::new();
        let mut controller = AnimationController::new(&AnimationConfig::default());
        let root = graph.root();
        let parent = graph.spawn(root, "parent").expect("root exists");
        let child = graph.spawn(parent, "child").expect("parent exists");
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();

        controller.play(
            Animation::move_to(child, Vec3::zeros(), Vec3::new(0.0, 2.0, 0.0), 1.0)
                .with_delay(0.2)
                .with_easing(Easing::QuadInOut)
                .on_complete(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        );

        controller.update(0.1, &mut graph);
        assert_relative_eq!(position(&graph, child), Vec3::zeros());

        graph.destroy(parent);
        for _ in 0..15 {
            controller.update(0.1, &mut graph);
        }

        assert!(controller.is_empty());
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_global_and_per_animation_speed_combine() {
        let mut graph = EntityGraph::new();
        let mut controller = AnimationController::new(&AnimationConfig::default().with_global_speed(2.0));
        let a = graph.create_entity("a");
        let b = graph.create_entity("b");

        controller.play(Animation::move_to(a, Vec3::zeros(), Vec3::new(4.0, 0.0, 0.0), 4.0));
        controller.play(Animation::move_to(b, Vec3::zeros(), Vec3::new(0.0, 0.0, 4.0), 4.0).with_speed(0.5));

        controller.update(1.0, &mut graph);

        assert_relative_eq!(position(&graph, a), Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(position(&graph, b), Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
    }
}
