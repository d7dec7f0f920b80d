//! Easing functions for smooth interpolation
//!
//! Each curve maps normalized time in `[0, 1]` to normalized progress, with
//! `f(0) = 0` and `f(1) = 1`. Input outside the unit range is clamped first.
//! Back, elastic and bounce curves overshoot or oscillate in between.

use serde::{Deserialize, Serialize};

use crate::foundation::math::constants::{PI, TAU};

const BACK_C1: f32 = 1.701_58;
const BACK_C2: f32 = BACK_C1 * 1.525;
const BACK_C3: f32 = BACK_C1 + 1.0;
const ELASTIC_C4: f32 = TAU / 3.0;
const ELASTIC_C5: f32 = TAU / 4.5;
const BOUNCE_N1: f32 = 7.5625;
const BOUNCE_D1: f32 = 2.75;

/// Easing curve identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed
    #[default]
    Linear,
    /// Starts slow (sine)
    EaseIn,
    /// Ends slow (sine)
    EaseOut,
    /// Slow start and end (sine)
    EaseInOut,
    /// Starts slow, accelerates (quadratic)
    QuadIn,
    /// Starts fast, decelerates (quadratic)
    QuadOut,
    /// Slow start and end (quadratic)
    QuadInOut,
    /// Starts slow, accelerates (cubic)
    CubicIn,
    /// Starts fast, decelerates (cubic)
    CubicOut,
    /// Slow start and end (cubic)
    CubicInOut,
    /// Exponential acceleration
    ExpoIn,
    /// Exponential deceleration
    ExpoOut,
    /// Exponential in and out
    ExpoInOut,
    /// Pulls back before moving forward
    BackIn,
    /// Overshoots the target, then settles
    BackOut,
    /// Pulls back and overshoots
    BackInOut,
    /// Spring-like oscillation at the start
    ElasticIn,
    /// Spring-like oscillation at the end
    ElasticOut,
    /// Spring-like oscillation at both ends
    ElasticInOut,
    /// Bounces at the start
    BounceIn,
    /// Bounces at the end
    BounceOut,
    /// Bounces at both ends
    BounceInOut,
}

impl Easing {
    /// Every curve, in declaration order
    pub const ALL: [Easing; 22] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::QuadIn,
        Easing::QuadOut,
        Easing::QuadInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
        Easing::ExpoIn,
        Easing::ExpoOut,
        Easing::ExpoInOut,
        Easing::BackIn,
        Easing::BackOut,
        Easing::BackInOut,
        Easing::ElasticIn,
        Easing::ElasticOut,
        Easing::ElasticInOut,
        Easing::BounceIn,
        Easing::BounceOut,
        Easing::BounceInOut,
    ];

    /// Evaluate the curve at normalized time `t`
    pub fn apply(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,

            Easing::EaseIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::EaseOut => (t * PI / 2.0).sin(),
            Easing::EaseInOut => -((PI * t).cos() - 1.0) / 2.0,

            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }

            Easing::CubicIn => t * t * t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }

            // The exponential curves never reach their end points on their
            // own; the ends are pinned.
            Easing::ExpoIn => {
                if t <= 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * t - 10.0)
                }
            }
            Easing::ExpoOut => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
            Easing::ExpoInOut => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    2f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }

            Easing::BackIn => BACK_C3 * t * t * t - BACK_C1 * t * t,
            Easing::BackOut => 1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2),
            Easing::BackInOut => {
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2) + 2.0) / 2.0
                }
            }

            Easing::ElasticIn => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    -(2f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            Easing::ElasticOut => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            Easing::ElasticInOut => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    -(2f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                } else {
                    (2f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0 + 1.0
                }
            }

            Easing::BounceIn => 1.0 - bounce_out(1.0 - t),
            Easing::BounceOut => bounce_out(t),
            Easing::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }

    /// Whether the curve never decreases
    ///
    /// Back, elastic and bounce curves are not monotonic.
    pub fn is_monotonic(self) -> bool {
        !matches!(
            self,
            Easing::BackIn
                | Easing::BackOut
                | Easing::BackInOut
                | Easing::ElasticIn
                | Easing::ElasticOut
                | Easing::ElasticInOut
                | Easing::BounceIn
                | Easing::BounceOut
                | Easing::BounceInOut
        )
    }
}

fn bounce_out(t: f32) -> f32 {
    if t < 1.0 / BOUNCE_D1 {
        BOUNCE_N1 * t * t
    } else if t < 2.0 / BOUNCE_D1 {
        let t = t - 1.5 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.75
    } else if t < 2.5 / BOUNCE_D1 {
        let t = t - 2.25 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.984_375
    }
}
