//! Handle types and specialized collections
//!
//! Every table in the runtime is an arena (`SlotMap`) addressed by a typed,
//! generation-checked key. A stale key simply fails to resolve, which is what
//! lets the entity graph hold non-owning parent links without reference cycles.

pub use slotmap::{SlotMap, SecondaryMap, Key};

slotmap::new_key_type! {
    /// Handle to an entity stored in an [`EntityGraph`](crate::scene::EntityGraph)
    pub struct EntityId;

    /// Handle to a rigid body registered in a [`PhysicsWorld`](crate::physics::PhysicsWorld)
    pub struct BodyHandle;

    /// Handle to an animation owned by an [`AnimationController`](crate::animation::AnimationController)
    pub struct AnimationId;
}

/// Ordered pair of keys, smaller key first
///
/// Used wherever a symmetric relation (A touches B) has to be stored once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPair<K: Key + Ord> {
    /// Smaller key of the pair
    pub first: K,
    /// Larger key of the pair
    pub second: K,
}

impl<K: Key + Ord> KeyPair<K> {
    /// Create a new pair (always stores the smaller key first for consistency)
    pub fn new(a: K, b: K) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Whether `key` is one side of this pair
    pub fn contains(&self, key: K) -> bool {
        self.first == key || self.second == key
    }

    /// The side of the pair that is not `key`
    pub fn other(&self, key: K) -> Option<K> {
        if self.first == key {
            Some(self.second)
        } else if self.second == key {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Fixed-capacity rolling window of samples
///
/// Keeps the most recent `capacity` values and exposes their mean; used for
/// smoothing gesture velocity.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    samples: std::collections::VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> RollingWindow<T> {
    /// Create an empty window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a sample, evicting the oldest one when full
    pub fn push(&mut self, sample: T) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate over the samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_orders_keys() {
        let mut map: SlotMap<BodyHandle, ()> = SlotMap::with_key();
        let a = map.insert(());
        let b = map.insert(());

        let forward = KeyPair::new(a, b);
        let backward = KeyPair::new(b, a);

        assert_eq!(forward, backward);
        assert!(forward.contains(a));
        assert_eq!(forward.other(a), Some(b));
        assert_eq!(forward.other(b), Some(a));
    }

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        for value in [1, 2, 3, 4] {
            window.push(value);
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);

        window.clear();
        assert!(window.is_empty());
    }
}
