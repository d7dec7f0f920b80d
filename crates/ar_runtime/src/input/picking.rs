//! Screen-space picking
//!
//! Converts touch locations to Normalized Device Coordinates (NDC) and then
//! to world-space rays through the camera of the latest frame.

use crate::foundation::math::{Transform, Vec2, Vec3};
use crate::physics::Ray;

/// Size of the view in screen points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
}

impl Viewport {
    /// Create a new viewport
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width over height, 1 for a degenerate viewport
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Convert screen coordinates to NDC
    ///
    /// NDC range: [-1, 1] where:
    /// - X: -1 = left, +1 = right
    /// - Y: -1 = top, +1 = bottom (screen convention, Y grows downwards)
    pub fn screen_to_ndc(&self, point: Vec2) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            point.x / self.width * 2.0 - 1.0,
            point.y / self.height * 2.0 - 1.0,
        ))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(390.0, 844.0)
    }
}

/// Camera state delivered by the tracking subsystem every frame
///
/// The camera looks down its local -Z axis with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    /// Capture time in seconds
    pub timestamp: f64,
    /// Camera-to-world pose
    pub pose: Transform,
    /// Vertical field of view in radians
    pub vertical_fov: f32,
    /// View size used to interpret touch locations
    pub viewport: Viewport,
}

impl Default for CameraFrame {
    fn default() -> Self {
        Self {
            timestamp: 0.0,
            pose: Transform::identity(),
            vertical_fov: 60f32.to_radians(),
            viewport: Viewport::default(),
        }
    }
}

impl CameraFrame {
    /// Create a frame
    pub fn new(timestamp: f64, pose: Transform, vertical_fov: f32, viewport: Viewport) -> Self {
        Self {
            timestamp,
            pose,
            vertical_fov,
            viewport,
        }
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    /// World-space ray through a point given in NDC
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let half_height = (self.vertical_fov.clamp(1e-3, 3.1) * 0.5).tan();
        let half_width = half_height * self.viewport.aspect_ratio();
        // Screen Y grows downwards, camera Y upwards
        let local = Vec3::new(ndc.x * half_width, -ndc.y * half_height, -1.0);
        let direction = self.pose.normalized_rotation() * local;
        Ray::new(self.pose.position, direction)
    }

    /// World-space ray through a screen point
    pub fn ray_from_screen(&self, point: Vec2) -> Option<Ray> {
        self.viewport
            .screen_to_ndc(point)
            .and_then(|ndc| self.ray_from_ndc(ndc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    #[test]
    fn test_screen_to_ndc_center() {
        let viewport = Viewport::new(1920.0, 1080.0);

        let ndc = viewport.screen_to_ndc(Vec2::new(960.0, 540.0)).expect("ndc");
        assert!((ndc.x - 0.0).abs() < 0.001);
        assert!((ndc.y - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_screen_to_ndc_corners() {
        let viewport = Viewport::new(1920.0, 1080.0);

        let ndc = viewport.screen_to_ndc(Vec2::new(0.0, 0.0)).expect("ndc");
        assert!((ndc.x - (-1.0)).abs() < 0.001); // Left edge
        assert!((ndc.y - (-1.0)).abs() < 0.001); // Top edge
        assert!(Viewport::new(0.0, 100.0).screen_to_ndc(Vec2::zeros()).is_none());
    }

    #[test]
    fn test_center_ray_follows_camera_forward() {
        let frame = CameraFrame::new(
            0.0,
            Transform::from_position_rotation(
                Vec3::new(0.0, 1.5, 0.0),
                Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2),
            ),
            60f32.to_radians(),
            Viewport::new(400.0, 800.0),
        );

        let ray = frame.ray_from_screen(Vec2::new(200.0, 400.0)).expect("ray");

        assert_relative_eq!(ray.origin, Vec3::new(0.0, 1.5, 0.0));
        assert_relative_eq!(ray.direction, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_top_of_screen_points_up() {
        let frame = CameraFrame::default();

        let ray = frame.ray_from_screen(Vec2::new(195.0, 0.0)).expect("ray");

        assert!(ray.direction.y > 0.0);
        assert_relative_eq!(ray.direction.y.atan2(-ray.direction.z), 30f32.to_radians(), epsilon = 1e-4);
    }
}
