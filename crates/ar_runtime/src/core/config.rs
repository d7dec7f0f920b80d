//! # Runtime Configuration
//!
//! Every tunable of the scene runtime lives here, grouped by subsystem:
//!
//! - **Physics**: gravity, fixed timestep, substep cap, sleep thresholds
//! - **Gestures**: tap/long-press timing, movement thresholds, pinch/rotation gates
//! - **Animation**: global playback speed
//! - **Coordinator**: tick rate, frame-rate window, raycast reach, log level
//!
//! Validation never fails fast. [`RuntimeConfig::validate`] collects every
//! problem it finds and leaves the decision to the caller; the coordinator
//! only refuses to start on [`Severity::Error`] issues.

use serde::{Deserialize, Serialize};

use crate::animation::Easing;
use crate::foundation::math::Vec3;

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// How serious a configuration problem is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Suspicious but usable
    Warning,
    /// The runtime cannot operate with this value
    Error,
}

/// One problem found by a `validate` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the offending field, e.g. `physics.fixed_timestep`
    pub field: String,
    /// Human readable description
    pub message: String,
    /// How serious the problem is
    pub severity: Severity,
}

impl ConfigIssue {
    /// Create an error-level issue
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Create a warning-level issue
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} in {}: {}", self.severity, self.field, self.message)
    }
}

/// Whether any issue in the list is an error
pub fn has_errors(issues: &[ConfigIssue]) -> bool {
    issues.iter().any(|issue| issue.severity == Severity::Error)
}

fn require_positive(issues: &mut Vec<ConfigIssue>, field: &str, value: f32) {
    if !(value.is_finite() && value > 0.0) {
        issues.push(ConfigIssue::error(field, format!("must be positive, got {value}")));
    }
}

fn require_non_negative(issues: &mut Vec<ConfigIssue>, field: &str, value: f32) {
    if !(value.is_finite() && value >= 0.0) {
        issues.push(ConfigIssue::error(field, format!("must not be negative, got {value}")));
    }
}

/// # Physics Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// World gravity in m/s²
    pub gravity: Vec3,
    /// Size of one simulation step in seconds
    pub fixed_timestep: f32,
    /// Maximum steps run by a single `simulate` call
    pub max_substeps: u32,
    /// Multiplier applied to every incoming frame delta
    pub time_scale: f32,
    /// Linear speed below which a dynamic body may fall asleep
    pub linear_sleep_threshold: f32,
    /// Angular speed below which a dynamic body may fall asleep
    pub angular_sleep_threshold: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            time_scale: 1.0,
            linear_sleep_threshold: 0.05,
            angular_sleep_threshold: 0.05,
        }
    }
}

impl PhysicsConfig {
    /// Set gravity
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the fixed step size
    pub fn with_fixed_timestep(mut self, fixed_timestep: f32) -> Self {
        self.fixed_timestep = fixed_timestep;
        self
    }

    /// Set the substep cap
    pub fn with_max_substeps(mut self, max_substeps: u32) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    /// Set the global time multiplier
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Set both sleep thresholds
    pub fn with_sleep_thresholds(mut self, linear: f32, angular: f32) -> Self {
        self.linear_sleep_threshold = linear;
        self.angular_sleep_threshold = angular;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.gravity.iter().any(|g| !g.is_finite()) {
            issues.push(ConfigIssue::error("physics.gravity", "must be finite"));
        }
        require_positive(&mut issues, "physics.fixed_timestep", self.fixed_timestep);
        if self.max_substeps == 0 {
            issues.push(ConfigIssue::error("physics.max_substeps", "must be at least 1"));
        }
        require_non_negative(&mut issues, "physics.time_scale", self.time_scale);
        require_non_negative(&mut issues, "physics.linear_sleep_threshold", self.linear_sleep_threshold);
        require_non_negative(&mut issues, "physics.angular_sleep_threshold", self.angular_sleep_threshold);
        if self.fixed_timestep > 0.1 {
            issues.push(ConfigIssue::warning(
                "physics.fixed_timestep",
                "steps longer than 100 ms make collisions unreliable",
            ));
        }
        issues
    }
}

/// # Gesture Configuration
///
/// Distances are in screen points, times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Movement allowed before a touch stops being a tap candidate
    pub max_tap_movement: f32,
    /// Longest press still counted as a tap
    pub max_tap_duration: f32,
    /// Maximum time between two taps forming a double tap
    pub double_tap_interval: f32,
    /// Maximum distance between two taps forming a double tap
    pub double_tap_distance: f32,
    /// Stillness required before a long press fires
    pub long_press_duration: f32,
    /// Number of per-frame deltas averaged into pan velocity
    pub velocity_window: usize,
    /// Deviation of the pinch scale from 1 required before reporting
    pub min_pinch_scale_delta: f32,
    /// Rotation in radians required before reporting
    pub min_rotation_angle: f32,
    /// Smoothed speed a pan must end with to count as a swipe
    pub swipe_min_velocity: f32,
    /// Longest pan that may still count as a swipe
    pub swipe_max_duration: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            max_tap_movement: 10.0,
            max_tap_duration: 0.3,
            double_tap_interval: 0.3,
            double_tap_distance: 40.0,
            long_press_duration: 0.5,
            velocity_window: 5,
            min_pinch_scale_delta: 0.05,
            min_rotation_angle: 0.1,
            swipe_min_velocity: 500.0,
            swipe_max_duration: 0.5,
        }
    }
}

impl GestureConfig {
    /// Set the tap thresholds
    pub fn with_tap_limits(mut self, max_movement: f32, max_duration: f32) -> Self {
        self.max_tap_movement = max_movement;
        self.max_tap_duration = max_duration;
        self
    }

    /// Set the double-tap window
    pub fn with_double_tap(mut self, interval: f32, distance: f32) -> Self {
        self.double_tap_interval = interval;
        self.double_tap_distance = distance;
        self
    }

    /// Set the long-press duration
    pub fn with_long_press_duration(mut self, duration: f32) -> Self {
        self.long_press_duration = duration;
        self
    }

    /// Set the pinch and rotation gates
    pub fn with_two_finger_thresholds(mut self, min_scale_delta: f32, min_rotation: f32) -> Self {
        self.min_pinch_scale_delta = min_scale_delta;
        self.min_rotation_angle = min_rotation;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        require_non_negative(&mut issues, "gestures.max_tap_movement", self.max_tap_movement);
        require_positive(&mut issues, "gestures.max_tap_duration", self.max_tap_duration);
        require_non_negative(&mut issues, "gestures.double_tap_interval", self.double_tap_interval);
        require_non_negative(&mut issues, "gestures.double_tap_distance", self.double_tap_distance);
        require_positive(&mut issues, "gestures.long_press_duration", self.long_press_duration);
        require_non_negative(&mut issues, "gestures.min_pinch_scale_delta", self.min_pinch_scale_delta);
        require_non_negative(&mut issues, "gestures.min_rotation_angle", self.min_rotation_angle);
        require_non_negative(&mut issues, "gestures.swipe_min_velocity", self.swipe_min_velocity);
        require_positive(&mut issues, "gestures.swipe_max_duration", self.swipe_max_duration);
        if self.velocity_window == 0 {
            issues.push(ConfigIssue::error("gestures.velocity_window", "must hold at least one sample"));
        }
        if self.long_press_duration <= self.max_tap_duration {
            issues.push(ConfigIssue::warning(
                "gestures.long_press_duration",
                "not longer than max_tap_duration; long presses will preempt taps",
            ));
        }
        issues
    }
}

/// # Animation Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Multiplier applied to every animation's own speed
    pub global_speed: f32,
    /// Curve used by animations that do not pick one
    pub default_easing: Easing,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            global_speed: 1.0,
            default_easing: Easing::Linear,
        }
    }
}

impl AnimationConfig {
    /// Set the global playback speed
    pub fn with_global_speed(mut self, speed: f32) -> Self {
        self.global_speed = speed;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        require_non_negative(&mut issues, "animation.global_speed", self.global_speed);
        issues
    }
}

/// # Coordinator Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Expected update rate in Hz
    pub tick_rate: f32,
    /// Window over which the frame-rate counter averages
    pub frame_rate_interval: f32,
    /// Furthest distance a tap ray reaches into the scene
    pub max_raycast_distance: f32,
    /// Log filter used when the runtime initializes logging itself
    pub log_level: String,
    /// Whether physics is stepped at all
    pub enable_physics: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            frame_rate_interval: 1.0,
            max_raycast_distance: 100.0,
            log_level: "info".to_string(),
            enable_physics: true,
        }
    }
}

impl CoordinatorConfig {
    /// Set the tick rate
    pub fn with_tick_rate(mut self, tick_rate: f32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable physics stepping
    pub fn with_physics(mut self, enabled: bool) -> Self {
        self.enable_physics = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        require_positive(&mut issues, "coordinator.tick_rate", self.tick_rate);
        require_positive(&mut issues, "coordinator.frame_rate_interval", self.frame_rate_interval);
        require_positive(&mut issues, "coordinator.max_raycast_distance", self.max_raycast_distance);
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            issues.push(ConfigIssue::warning(
                "coordinator.log_level",
                format!("unknown level '{}', falling back to info", self.log_level),
            ));
        }
        issues
    }
}

/// # Runtime Configuration
///
/// Top-level configuration handed to the coordinator.
///
/// ```
/// use ar_runtime::core::config::{RuntimeConfig, PhysicsConfig};
/// use ar_runtime::foundation::math::Vec3;
///
/// let config = RuntimeConfig::default()
///     .with_physics(PhysicsConfig::default().with_gravity(Vec3::zeros()));
/// assert!(config.validate().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Physics world settings
    pub physics: PhysicsConfig,
    /// Gesture recognizer settings
    pub gestures: GestureConfig,
    /// Animation controller settings
    pub animation: AnimationConfig,
    /// Coordinator settings
    pub coordinator: CoordinatorConfig,
}

impl RuntimeConfig {
    /// Replace the physics section
    pub fn with_physics(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    /// Replace the gesture section
    pub fn with_gestures(mut self, gestures: GestureConfig) -> Self {
        self.gestures = gestures;
        self
    }

    /// Replace the animation section
    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    /// Replace the coordinator section
    pub fn with_coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Collect the issues of every section
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.physics.validate();
        issues.extend(self.gestures.validate());
        issues.extend(self.animation.validate());
        issues.extend(self.coordinator.validate());
        issues
    }
}

impl Config for RuntimeConfig {}
