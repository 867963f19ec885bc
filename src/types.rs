//! The static float-type lattice used by the [`crate::tracker::StaticTypeTracker`]
//! and, at runtime, to tag every [`crate::value::ShadowValue`].

/// What could live at a given location, as far as static analysis of one
/// block can tell.
///
/// Ordered `NonFloat ⊑ Unshadowed ⊑ {Single, Double} ⊑ Unknown`; `Single`
/// and `Double` are incomparable with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FloatType {
    /// Known not to hold a float this block.
    NonFloat,
    /// Holds a float, but no shadow is attached (entered cold).
    Unshadowed,
    /// Asserts presence of a single-precision shadow.
    Single,
    /// Asserts presence of a double-precision shadow.
    Double,
    /// Either shadowed or not; resolve dynamically.
    Unknown,
}

impl FloatType {
    /// Width of the concrete value in 4-byte words, if statically known.
    pub const fn size_words(&self) -> Option<u8> {
        match self {
            Self::NonFloat | Self::Unshadowed | Self::Unknown => None,
            Self::Single => Some(1),
            Self::Double => Some(2),
        }
    }

    /// True if this classification asserts a shadow is present.
    pub const fn has_static_shadow(&self) -> bool {
        matches!(self, Self::Single | Self::Double)
    }

    /// Least upper bound of two classifications under the lattice.
    ///
    /// Used when a static type must be derived from two incoming edges
    /// (e.g. both arms of an `ITE`) without assuming either edge was taken.
    pub const fn join(self, other: Self) -> Self {
        use FloatType::*;

        match (self, other) {
            (a, b) if matches!((a, b), (NonFloat, NonFloat)) => NonFloat,
            (Unshadowed, Unshadowed) => Unshadowed,
            (Single, Single) => Single,
            (Double, Double) => Double,
            _ => Unknown,
        }
    }
}

/// Number of SIMD lanes a shadow temp or thread-state slot can carry.
///
/// The translator only ever hands us 32-, 64-, or 128-bit float-bearing
/// quantities, so a temp holds at most 4 single-precision lanes.
pub const VALID_LANE_COUNTS: [usize; 3] = [1, 2, 4];

/// True if `n` is a width this engine can represent in a [`crate::value::ShadowTemp`].
pub const fn is_valid_lane_count(n: usize) -> bool {
    n == 1 || n == 2 || n == 4
}
