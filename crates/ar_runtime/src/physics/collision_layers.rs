//! Collision groups for filtering collision detection
//!
//! Every body has a category (what it is) and a mask (what it collides
//! with). Two bodies interact only when each one's category is in the
//! other's mask.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Collision category / mask bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CollisionGroups: u32 {
        /// Ordinary scene content
        const DEFAULT = 1 << 0;
        /// Static geometry such as detected planes
        const ENVIRONMENT = 1 << 1;
        /// Content placed by the user
        const CONTENT = 1 << 2;
        /// Trigger volumes (no physical response)
        const TRIGGER = 1 << 3;
        /// Small debris that should not block raycasts
        const DEBRIS = 1 << 4;
        /// First bit free for application use
        const USER_0 = 1 << 8;
        /// Second bit free for application use
        const USER_1 = 1 << 9;
        /// Third bit free for application use
        const USER_2 = 1 << 10;
        /// Fourth bit free for application use
        const USER_3 = 1 << 11;
    }
}

impl Default for CollisionGroups {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Category and mask of one body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionFilter {
    /// Groups this body belongs to
    pub category: CollisionGroups,
    /// Groups this body collides with
    pub mask: CollisionGroups,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: CollisionGroups::DEFAULT,
            mask: CollisionGroups::all(),
        }
    }
}

impl CollisionFilter {
    /// Create a new filter
    pub fn new(category: CollisionGroups, mask: CollisionGroups) -> Self {
        Self { category, mask }
    }

    /// Whether two filters allow their bodies to interact
    ///
    /// # Example
    /// ```
    /// use ar_runtime::physics::{CollisionFilter, CollisionGroups};
    ///
    /// let content = CollisionFilter::new(CollisionGroups::CONTENT, CollisionGroups::ENVIRONMENT);
    /// let floor = CollisionFilter::new(CollisionGroups::ENVIRONMENT, CollisionGroups::all());
    /// assert!(content.collides_with(&floor));
    /// ```
    pub fn collides_with(&self, other: &Self) -> bool {
        should_collide(self.category, self.mask, other.category, other.mask)
    }
}

/// Check if two bodies should collide based on their categories and masks
///
/// A's category must be in B's mask AND B's category must be in A's mask.
pub fn should_collide(
    category_a: CollisionGroups,
    mask_a: CollisionGroups,
    category_b: CollisionGroups,
    mask_b: CollisionGroups,
) -> bool {
    category_a.intersects(mask_b) && category_b.intersects(mask_a)
}
