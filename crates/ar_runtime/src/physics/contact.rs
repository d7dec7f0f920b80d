//! Contacts and physics events
//!
//! Contacts are transient, rebuilt every step. Only the set of active pairs
//! survives between steps, which is what begin/stay/end events are derived
//! from.

use crate::foundation::collections::{BodyHandle, EntityId};
use crate::foundation::math::Vec3;

/// One body's view of a contact with another body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionContact {
    /// Body this contact is reported to
    pub body: BodyHandle,
    /// Entity owning `body`
    pub entity: EntityId,
    /// Body on the other side of the contact
    pub other: BodyHandle,
    /// Entity owning `other`
    pub other_entity: EntityId,
    /// World-space contact point
    pub point: Vec3,
    /// Unit normal pointing from `body` towards `other`
    pub normal: Vec3,
    /// Overlap depth before correction
    pub penetration: f32,
    /// Velocity of `other` relative to `body`
    pub relative_velocity: Vec3,
}

impl CollisionContact {
    /// The same contact as seen from the other body
    pub fn mirrored(&self) -> Self {
        Self {
            body: self.other,
            entity: self.other_entity,
            other: self.body,
            other_entity: self.entity,
            point: self.point,
            normal: -self.normal,
            penetration: self.penetration,
            relative_velocity: -self.relative_velocity,
        }
    }

    /// Speed at which the bodies approach each other along the normal
    ///
    /// Negative while closing.
    pub fn normal_velocity(&self) -> f32 {
        self.relative_velocity.dot(&self.normal)
    }
}

/// Trigger overlap notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOverlap {
    /// Trigger body
    pub trigger: BodyHandle,
    /// Entity owning the trigger
    pub trigger_entity: EntityId,
    /// Body inside the trigger
    pub other: BodyHandle,
    /// Entity owning `other`
    pub other_entity: EntityId,
}

/// Events produced by a simulation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsEvent {
    /// First step two bodies touch
    CollisionBegan(CollisionContact),
    /// Bodies still touching
    CollisionStay(CollisionContact),
    /// Bodies stopped touching; carries the last known contact
    CollisionEnded(CollisionContact),
    /// A body started overlapping a trigger
    TriggerEntered(TriggerOverlap),
    /// A body stopped overlapping a trigger
    TriggerExited(TriggerOverlap),
}

impl PhysicsEvent {
    /// Body the event is reported to
    pub fn body(&self) -> BodyHandle {
        match self {
            Self::CollisionBegan(contact) | Self::CollisionStay(contact) | Self::CollisionEnded(contact) => {
                contact.body
            }
            Self::TriggerEntered(overlap) | Self::TriggerExited(overlap) => overlap.trigger,
        }
    }

    /// Entity the event is reported to
    pub fn entity(&self) -> EntityId {
        match self {
            Self::CollisionBegan(contact) | Self::CollisionStay(contact) | Self::CollisionEnded(contact) => {
                contact.entity
            }
            Self::TriggerEntered(overlap) | Self::TriggerExited(overlap) => overlap.trigger_entity,
        }
    }
}

/// Stored state of an active pair, oriented from the pair's first body
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ActivePair {
    pub contact: CollisionContact,
    pub is_trigger: bool,
}
