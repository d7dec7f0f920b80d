//! Headless scene demo
//!
//! Runs a short AR session without a tracking backend: a floor anchor is
//! faked, a handful of balls is scattered above a table and dropped, and a
//! scripted tap and drag are injected. Interactions are logged.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ar_runtime::config::Config;
use ar_runtime::foundation::logging;
use ar_runtime::prelude::*;
use rand::Rng;

const DT: f32 = 1.0 / 60.0;
const BALL_COUNT: usize = 8;
const TICKS: u32 = 240;

struct SceneDemo {
    coordinator: Coordinator,
    balls: Vec<EntityId>,
    table: Option<EntityId>,
    taps: Arc<AtomicUsize>,
}

impl SceneDemo {
    fn new(config: RuntimeConfig) -> Self {
        Self {
            coordinator: Coordinator::new(config),
            balls: Vec::new(),
            table: None,
            taps: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn start(&mut self) -> Result<(), CoordinatorError> {
        self.coordinator.request_start()?;
        self.coordinator.session_ready();

        // Camera 1.5m up, looking down at the floor 2m ahead
        let pitch = Quat::from_axis_angle(&Vec3::x_axis(), -(0.75_f32).atan());
        self.coordinator.set_camera_frame(CameraFrame::new(
            0.0,
            Transform::from_position_rotation(Vec3::new(0.0, 1.5, 0.0), pitch),
            60f32.to_radians(),
            Viewport::default(),
        ));

        self.coordinator.update_anchor(&AnchorUpdate::tracking(
            "floor",
            AnchorKind::Plane {
                extent: Vec2::new(3.0, 3.0),
            },
            &Transform::from_position(Vec3::new(0.0, 0.0, -2.0)),
        ));
        Ok(())
    }

    fn build_scene(&mut self) {
        let graph = self.coordinator.graph().clone();

        let table = graph.spawn(graph.root(), "table");
        if let Some(table) = table {
            self.coordinator.attach_to_anchor("floor", table);
            graph.with(|graph| graph.set_local_transform(table, Transform::from_position(Vec3::new(0.0, -0.5, 0.0))));
            self.coordinator
                .add_physics_body(table, RigidBodyDesc::fixed().with_shape(CollisionShape::sphere(0.5)));
        }
        self.table = table;

        let mut rng = rand::thread_rng();
        for i in 0..BALL_COUNT {
            let Some(ball) = graph.spawn(graph.root(), format!("ball-{}", i)) else {
                continue;
            };
            self.coordinator.attach_to_anchor("floor", ball);

            let position = Vec3::new(
                rng.gen_range(-0.3..0.3),
                rng.gen_range(0.3..1.2),
                rng.gen_range(-0.3..0.3),
            );
            let radius = rng.gen_range(0.05..0.12);
            graph.with(|graph| graph.set_local_transform(ball, Transform::from_position(position)));

            let taps = self.taps.clone();
            graph.add_component(
                ball,
                InteractionComponent::new()
                    .with_radius(radius)
                    .with_draggable(true)
                    .with_callback(move |event| {
                        if let InteractionEvent::Tap { hit, .. } = event {
                            taps.fetch_add(1, Ordering::Relaxed);
                            log::info!("Ball {:?} tapped at {:?}", hit.entity, hit.point);
                        }
                    }),
            );
            self.coordinator.add_physics_body(
                ball,
                RigidBodyDesc::dynamic()
                    .with_shape(CollisionShape::sphere(radius))
                    .with_restitution(rng.gen_range(0.2..0.8)),
            );
            self.balls.push(ball);
        }

        if let Some(&first) = self.balls.first() {
            self.coordinator.play_animation(
                Animation::scale_to(first, Vec3::repeat(1.0), Vec3::repeat(1.5), 0.4)
                    .with_easing(Easing::QuadInOut)
                    .with_auto_reverse(true)
                    .with_loop(3)
                    .on_complete(|| log::info!("Pulse finished")),
            );
        }
        log::info!("Scattered {} balls", self.balls.len());
    }

    fn register_handlers(&mut self) {
        self.coordinator
            .register_handler(InteractionKind::CollisionBegan, |event: &InteractionEvent| {
                if let InteractionEvent::CollisionBegan(contact) = event {
                    log::debug!(
                        "Contact {:?} -> {:?} at {:?}",
                        contact.entity,
                        contact.other_entity,
                        contact.point
                    );
                }
                true
            });
        for kind in [
            InteractionKind::Tap,
            InteractionKind::BackgroundTap,
            InteractionKind::DragStarted,
            InteractionKind::DragEnded,
        ] {
            self.coordinator.register_handler(kind, |event: &InteractionEvent| {
                log::info!("Interaction {:?}", event);
                true
            });
        }
    }

    /// Scripted touches, timestamped on the session clock
    fn inject_input(&self, tick: u32) {
        let t = self.coordinator.clock();
        let center = Vec2::new(195.0, 422.0);
        match tick {
            90 => {
                self.coordinator.touches_began(&[TouchPoint::new(1, center, t)]);
                self.coordinator.touches_ended(&[TouchPoint::new(1, center, t + 0.08)]);
            }
            150 => self.coordinator.touches_began(&[TouchPoint::new(2, center, t)]),
            155..=175 => {
                let offset = (tick - 150) as f32 * 8.0;
                self.coordinator
                    .touches_moved(&[TouchPoint::new(2, center + Vec2::new(offset, offset * 0.5), t)]);
            }
            180 => self
                .coordinator
                .touches_ended(&[TouchPoint::new(2, center + Vec2::new(200.0, 100.0), t)]),
            _ => {}
        }
    }

    fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.start()?;
        self.register_handlers();
        self.build_scene();

        for tick in 0..TICKS {
            self.inject_input(tick);
            self.coordinator.tick(DT);
        }

        for event in self.coordinator.drain_events() {
            log::debug!("Unhandled {:?}", event.kind());
        }
        let graph = self.coordinator.graph().clone();
        for &ball in &self.balls {
            if let Some(world) = graph.world_transform(ball) {
                log::info!("{:?} rests at {:?}", ball, world.position);
            }
        }
        if let Some(table) = self.table {
            log::info!("Table at {:?}", graph.world_transform(table).map(|t| t.position));
        }

        let saved = self.coordinator.save_scene().to_ron_string()?;
        log::info!(
            "Saved {} entities ({} bytes), {} ball taps, {:.1} fps",
            self.coordinator.save_scene().entities.len(),
            saved.len(),
            self.taps.load(Ordering::Relaxed),
            self.coordinator.frame_rate()
        );

        self.coordinator.cleanup();
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load_from_file(path)?,
        None => RuntimeConfig::default(),
    };
    logging::init_with_level(&config.coordinator.log_level);

    log::info!("Starting scene demo");
    let mut demo = SceneDemo::new(config);
    match demo.run() {
        Ok(()) => {
            log::info!("Scene demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Scene demo failed: {:?}", e);
            Err(e)
        }
    }
}
