//! Collision layers, layer masks, and query filters.
//!
//! Every collider lives on exactly one [`Layer`] (0..=31). Queries select colliders with a
//! [`LayerMask`], a 32-bit bitmask over layers, plus a [`TriggerPolicy`] deciding whether
//! trigger (sensor) colliders take part.

use num_traits::{One, PrimInt};
use serde::{Deserialize, Serialize};

/// Trait implemented by anything that names a single bit of a mask.
pub trait FlagBitmask {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        // NOTE: `bit_index()` must be < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// A plain bitmask container over a primitive integer.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitmaskFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> BitmaskFlags<T> {
    pub const fn new(bits: T) -> Self {
        Self { bits }
    }

    pub fn add<U: FlagBitmask<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits | flag.mask();
    }

    pub fn remove<U: FlagBitmask<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits & !flag.mask();
    }

    pub fn has<U: FlagBitmask<Storage = T>>(&self, flag: U) -> bool {
        (self.bits & flag.mask()) != T::zero()
    }

    pub fn has_any<U: FlagBitmask<Storage = T> + Copy>(&self, flags: &[U]) -> bool {
        let combined = flags.iter().fold(T::zero(), |acc, f| acc | f.mask());
        (self.bits & combined) != T::zero()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == T::zero()
    }

    pub fn clear(&mut self) {
        self.bits = T::zero();
    }
}

/// A collision layer index in `0..=31`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer(pub u8);

impl Layer {
    /// Layer assigned to colliders that don't ask for one.
    pub const DEFAULT: Layer = Layer(0);
    /// Highest usable layer index.
    pub const MAX_INDEX: u8 = 31;

    /// Returns `None` for indices outside `0..=31`.
    pub fn new(index: u8) -> Option<Self> {
        (index <= Self::MAX_INDEX).then_some(Layer(index))
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FlagBitmask for Layer {
    type Storage = u32;

    fn bit_index(&self) -> u8 {
        self.0.min(Self::MAX_INDEX)
    }
}

/// Set of layers a query is allowed to see.
pub type LayerMask = BitmaskFlags<u32>;

impl LayerMask {
    pub const ALL: LayerMask = LayerMask::new(u32::MAX);
    pub const NONE: LayerMask = LayerMask::new(0);

    /// Mask selecting exactly one layer.
    pub fn only(layer: Layer) -> Self {
        let mut mask = LayerMask::NONE;
        mask.add(layer);
        mask
    }

    /// Mask selecting every layer in `layers`.
    pub fn from_layers(layers: &[Layer]) -> Self {
        let mut mask = LayerMask::NONE;
        for &layer in layers {
            mask.add(layer);
        }
        mask
    }

    /// Whether a collider on `layer` passes this mask.
    #[inline]
    pub fn contains(&self, layer: Layer) -> bool {
        self.has(layer)
    }
}

impl Serialize for LayerMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits)
    }
}

impl<'de> Deserialize<'de> for LayerMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(LayerMask::new)
    }
}

/// Whether trigger colliders take part in a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerPolicy {
    /// Trigger colliders are invisible to the query.
    #[default]
    Ignore,
    /// Trigger colliders are reported like solid ones.
    Collide,
}

/// Filter applied to every physics world query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryFilter {
    pub mask: LayerMask,
    pub triggers: TriggerPolicy,
}

impl QueryFilter {
    pub fn new(mask: LayerMask, triggers: TriggerPolicy) -> Self {
        Self { mask, triggers }
    }

    /// Filter that only sees colliders on `layer`, triggers included.
    ///
    /// Used for scratch-layer queries, which target one specific collider regardless of
    /// whether it is a trigger.
    pub fn only(layer: Layer) -> Self {
        Self::new(LayerMask::only(layer), TriggerPolicy::Collide)
    }

    /// Whether a collider with the given layer and trigger flag passes this filter.
    #[inline]
    pub fn accepts(&self, layer: Layer, is_trigger: bool) -> bool {
        if is_trigger && self.triggers == TriggerPolicy::Ignore {
            return false;
        }
        self.mask.contains(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_new_rejects_out_of_range() {
        assert_eq!(Layer::new(31), Some(Layer(31)));
        assert_eq!(Layer::new(32), None);
    }

    #[test]
    fn mask_add_remove_has() {
        let mut mask = LayerMask::NONE;
        mask.add(Layer(3));
        mask.add(Layer(31));
        assert!(mask.contains(Layer(3)));
        assert!(mask.contains(Layer(31)));
        assert!(!mask.contains(Layer(0)));
        assert_eq!(mask.bits, (1 << 3) | (1 << 31));

        mask.remove(Layer(3));
        assert!(!mask.contains(Layer(3)));
        assert!(mask.has_any(&[Layer(0), Layer(31)]));

        mask.clear();
        assert!(mask.is_empty());
    }

    #[test]
    fn from_layers_matches_only() {
        assert_eq!(LayerMask::from_layers(&[Layer(7)]), LayerMask::only(Layer(7)));
        assert_eq!(
            LayerMask::from_layers(&[Layer(0), Layer(1)]).bits,
            0b11
        );
    }

    #[test]
    fn filter_respects_trigger_policy() {
        let ignore = QueryFilter::new(LayerMask::ALL, TriggerPolicy::Ignore);
        let collide = QueryFilter::new(LayerMask::ALL, TriggerPolicy::Collide);

        assert!(ignore.accepts(Layer(2), false));
        assert!(!ignore.accepts(Layer(2), true));
        assert!(collide.accepts(Layer(2), true));

        let scratch = QueryFilter::only(Layer(30));
        assert!(scratch.accepts(Layer(30), true));
        assert!(!scratch.accepts(Layer(0), false));
    }

    #[test]
    fn mask_serializes_as_bits() {
        let mask = LayerMask::from_layers(&[Layer(0), Layer(4)]);
        let text = ron::to_string(&mask).unwrap();
        assert_eq!(text, "17");
        let back: LayerMask = ron::from_str(&text).unwrap();
        assert_eq!(back, mask);
    }
}
