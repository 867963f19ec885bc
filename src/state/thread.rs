//! Byte-addressed, 4-byte-granular thread-state shadow table.
//!
//! One instance models a single host thread's guest-state area; this
//! engine assumes a single host thread throughout (see the design's
//! non-goals), so there is exactly one live [`ThreadStateTable`] per run.

use crate::value::{ShadowValueId, ValueStore};

/// Byte offset into the host's guest-state area, 4-byte aligned.
pub type Offset = u16;

/// `offset -> Option<ShadowValueId>`, 4-byte granularity.
///
/// A double occupies two adjacent 4-byte slots; by convention the
/// lower-offset slot owns the [`ShadowValueId`] and the upper slot is left
/// `None`, matching how the design describes "lower-offset bytes own the
/// value for a double".
#[derive(Default)]
pub struct ThreadStateTable {
    slots: Vec<Option<ShadowValueId>>,
}

impl ThreadStateTable {
    /// A table sized to the host's guest-state area, in 4-byte words.
    pub fn with_capacity(words: usize) -> Self {
        Self {
            slots: vec![None; words],
        }
    }

    fn word_index(offset: Offset) -> usize {
        (offset / 4) as usize
    }

    /// Shadow at `offset`, if any.
    pub fn get(&self, offset: Offset) -> Option<ShadowValueId> {
        self.slots.get(Self::word_index(offset)).copied().flatten()
    }

    /// Install a shadow at `offset`, disowning whatever was there first.
    pub fn set(&mut self, offset: Offset, value: Option<ShadowValueId>, store: &mut ValueStore) {
        let idx = Self::word_index(offset);
        if let Some(prior) = self.slots[idx].take() {
            store.disown(prior);
        }
        self.slots[idx] = value;
    }

    /// Disown and clear every occupied slot; used by a flush/teardown path,
    /// analogous to the temp table's end-of-block ledger sweep but scoped
    /// to thread-state teardown on engine shutdown.
    pub fn clear_all(&mut self, store: &mut ValueStore) {
        for slot in &mut self.slots {
            if let Some(v) = slot.take() {
                store.disown(v);
            }
        }
    }
}

/// Widen a concrete host float, read from thread state or memory where no
/// shadow was present, into a fresh [`ShadowValue`] at the inferred type of
/// the enclosing unit.
///
/// This is the tie-break described in §4.3: a location with no shadow,
/// read as part of a wider quantity, is synthesised from the concrete host
/// bits rather than treated as an error.
pub fn synthesize_shadow(
    store: &mut ValueStore,
    ty: crate::types::FloatType,
    concrete_bits: u64,
    precision: u32,
) -> ShadowValueId {
    use crate::types::FloatType;

    let real = match ty {
        FloatType::Single => crate::real::Real::from_f32(f32::from_bits(concrete_bits as u32), precision),
        _ => crate::real::Real::from_f64(f64::from_bits(concrete_bits), precision),
    };

    store.new_value(ty, real, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real::Real;
    use crate::types::FloatType;

    #[test]
    fn set_disowns_prior_occupant() {
        let mut table = ThreadStateTable::with_capacity(16);
        let mut store = ValueStore::new();
        let a = store.new_value(FloatType::Double, Real::from_f64(1.0, 64), None);
        let b = store.new_value(FloatType::Double, Real::from_f64(2.0, 64), None);

        table.set(0, Some(a), &mut store);
        assert_eq!(store.get(a).ref_count(), 1);
        table.set(0, Some(b), &mut store);
        assert_eq!(store.live_count(), 1, "a should have been disowned and freed");
        assert_eq!(table.get(0), Some(b));
    }

    #[test]
    fn synthesize_single_promotes_exactly() {
        let mut store = ValueStore::new();
        let bits = 1.5f32.to_bits() as u64;
        let id = synthesize_shadow(&mut store, FloatType::Single, bits, 64);
        assert_eq!(store.get(id).real().to_f64(), 1.5);
    }
}
