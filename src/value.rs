//! Shadow values and shadow temps: the pooled, reference-counted records
//! that carry a high-precision companion for every live host float.

use crate::error::{EngineError, EngineResult};
use crate::opinfo::InfluenceSet;
use crate::real::Real;
use crate::symbolic::Expr;
use crate::types::FloatType;
use smallvec::SmallVec;
use std::rc::Rc;

/// Identifier for a [`ShadowValue`] living in a [`ValueStore`].
///
/// Indices are recycled by the free list, so an id's validity is scoped to
/// between its allocation and the point its ref-count reaches zero; holding
/// an id past that point is a use-after-free the same way a raw pointer
/// would be, which is why every table that stores one (temp/thread/memory)
/// is required to hold a reference for as long as it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowValueId(u32);

/// The payload of a live shadow value.
#[derive(Debug, Clone)]
pub struct ShadowValue {
    ty: FloatType,
    real: Real,
    ref_count: u32,
    expr: Option<Rc<Expr>>,
    influences: InfluenceSet,
}

impl ShadowValue {
    /// Float classification this value was synthesised or computed for.
    pub const fn ty(&self) -> FloatType {
        self.ty
    }

    /// High-precision companion value.
    pub const fn real(&self) -> &Real {
        &self.real
    }

    /// Symbolic expression describing how this value was computed, if
    /// expression tracking is enabled.
    pub fn expr(&self) -> Option<&Rc<Expr>> {
        self.expr.as_ref()
    }

    /// Op sites whose error has measurably flowed into this value.
    pub const fn influences(&self) -> &InfluenceSet {
        &self.influences
    }

    /// Mutable access to this value's influence set, used by the executor
    /// once it has decided whether this evaluation's error crossed the
    /// threshold.
    pub(crate) fn influences_mut(&mut self) -> &mut InfluenceSet {
        &mut self.influences
    }

    /// Current reference count. Exposed for invariant testing only.
    pub const fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

enum Slot {
    Occupied(ShadowValue),
    Free,
}

/// Pool allocator for [`ShadowValue`]s.
///
/// A process-wide, single-threaded, unbounded free list: misses allocate
/// from the end of `slots`, hits recycle an index and overwrite its
/// contents, never leaving stale data behind for the next occupant.
#[derive(Default)]
pub struct ValueStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ValueStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh value with `ref_count = 1`.
    pub fn new_value(&mut self, ty: FloatType, real: Real, expr: Option<Rc<Expr>>) -> ShadowValueId {
        let value = ShadowValue {
            ty,
            real,
            ref_count: 1,
            expr,
            influences: InfluenceSet::new(),
        };

        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Slot::Occupied(value);
            ShadowValueId(idx)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot::Occupied(value));
            ShadowValueId(idx)
        }
    }

    /// Borrow a live value.
    ///
    /// # Panics
    /// Panics if `id` does not refer to a currently-occupied slot; that
    /// indicates a use-after-free in the emitter or executor, not
    /// something host-program behaviour can trigger.
    pub fn get(&self, id: ShadowValueId) -> &ShadowValue {
        match &self.slots[id.0 as usize] {
            Slot::Occupied(v) => v,
            Slot::Free => unreachable!("dangling ShadowValueId {:?}", id),
        }
    }

    /// Mutably borrow a live value.
    pub fn get_mut(&mut self, id: ShadowValueId) -> &mut ShadowValue {
        match &mut self.slots[id.0 as usize] {
            Slot::Occupied(v) => v,
            Slot::Free => unreachable!("dangling ShadowValueId {:?}", id),
        }
    }

    /// Increment a value's reference count.
    pub fn own(&mut self, id: ShadowValueId) {
        self.get_mut(id).ref_count += 1;
    }

    /// Decrement a value's reference count; free it and recurse into its
    /// expression's argument values once it reaches zero.
    ///
    /// Only the value's own slot and `Real` are reclaimed here; the
    /// expression tree itself is an `Rc<Expr>` and is freed by ordinary
    /// drop semantics when the last reference (this value's, plus any op
    /// site or mark holding the same tree) goes away.
    pub fn disown(&mut self, id: ShadowValueId) {
        let count = {
            let v = self.get_mut(id);
            v.ref_count -= 1;
            v.ref_count
        };

        if count == 0 {
            self.slots[id.0 as usize] = Slot::Free;
            self.free.push(id.0);
        }
    }

    /// Sum of every live value's reference count, for the ref-count-balance
    /// invariant.
    pub fn total_ref_count(&self) -> u64 {
        self.slots
            .iter()
            .map(|s| match s {
                Slot::Occupied(v) => v.ref_count as u64,
                Slot::Free => 0,
            })
            .sum()
    }

    /// Number of currently-live (non-freed) values.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, Slot::Occupied(_))).count()
    }
}

/// A live IR-temp's shadow: one [`ShadowValueId`] per SIMD lane.
///
/// `len() ∈ {1, 2, 4}`, matching the widths the translator can hand us
/// (32-, 64-, or 128-bit float-bearing quantities).
#[derive(Debug, Clone)]
pub struct ShadowTemp {
    values: SmallVec<[ShadowValueId; 4]>,
}

impl ShadowTemp {
    /// Build a temp from already-owned value ids.
    ///
    /// # Errors
    /// Returns [`EngineError::Invariant`] if `values.len()` is not one of
    /// the valid lane counts; that indicates an emitter bug, see
    /// [`crate::types::is_valid_lane_count`].
    pub fn new(values: impl Into<SmallVec<[ShadowValueId; 4]>>) -> EngineResult<Self> {
        let values = values.into();
        if !crate::types::is_valid_lane_count(values.len()) {
            return Err(EngineError::invariant("invalid shadow temp width"));
        }
        Ok(Self { values })
    }

    /// Single-lane convenience constructor. A single lane is always a valid
    /// width, so this cannot fail.
    pub fn single(value: ShadowValueId) -> Self {
        Self::new(SmallVec::from_buf_and_len([value, value, value, value], 1))
            .expect("a single-lane width is always valid")
    }

    /// Number of lanes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if this temp carries no lanes (never constructed in practice;
    /// kept for API symmetry with the standard collection traits).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value ids, one per lane.
    pub fn values(&self) -> &[ShadowValueId] {
        &self.values
    }

    /// Own every lane's value (used when copying a temp pointer, e.g. for
    /// `RdTmp`).
    pub fn own_all(&self, store: &mut ValueStore) {
        for &v in &self.values {
            store.own(v);
        }
    }

    /// Disown every lane's value (used when a temp is torn down at block
    /// exit via the ownership ledger).
    pub fn disown_all(&self, store: &mut ValueStore) {
        for &v in &self.values {
            store.disown(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_real() -> Real {
        Real::from_f64(1.0, 64)
    }

    #[test]
    fn new_value_starts_at_refcount_one() {
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, dummy_real(), None);
        assert_eq!(store.get(id).ref_count(), 1);
    }

    #[test]
    fn own_disown_balance() {
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, dummy_real(), None);
        store.own(id);
        assert_eq!(store.get(id).ref_count(), 2);
        store.disown(id);
        assert_eq!(store.get(id).ref_count(), 1);
        assert_eq!(store.live_count(), 1);
        store.disown(id);
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn idempotent_own_disown_pair_preserves_refcount() {
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, dummy_real(), None);
        let before = store.get(id).ref_count();
        store.disown(id);
        store.own(id);
        assert_eq!(store.get(id).ref_count(), before);
    }

    #[test]
    fn freed_slot_is_recycled() {
        let mut store = ValueStore::new();
        let id1 = store.new_value(FloatType::Double, dummy_real(), None);
        store.disown(id1);
        let id2 = store.new_value(FloatType::Single, dummy_real(), None);
        assert_eq!(id1, id2, "freed slot should be recycled by the pool");
        assert_eq!(store.get(id2).ty(), FloatType::Single);
    }

    #[test]
    fn shadow_temp_rejects_invalid_width() {
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, dummy_real(), None);
        let values: SmallVec<[ShadowValueId; 4]> = smallvec::smallvec![id, id, id];
        let err = ShadowTemp::new(values).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(_)));
    }

    /// `total_ref_count` must track exactly the number of `own` calls minus
    /// `disown` calls, clamped at the single birth `own` every value starts
    /// with, for any sequence of extra owns/disowns that never drops a
    /// value's count below zero.
    #[quickcheck_macros::quickcheck]
    fn ref_count_balance_matches_own_disown_sequence(extra_owns: u8, extra_disowns: u8) -> bool {
        let extra_disowns = extra_disowns.min(extra_owns);
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, dummy_real(), None);

        for _ in 0..extra_owns {
            store.own(id);
        }
        for _ in 0..extra_disowns {
            store.disown(id);
        }

        let expected = 1 + extra_owns as u64 - extra_disowns as u64;
        store.total_ref_count() == expected && store.live_count() == 1
    }
}
