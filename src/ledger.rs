//! Per-block bookkeeping of which temps carry a live shadow, so block exit
//! can disown exactly those and nothing else.

use crate::state::{IrTemp, ShadowState};
use crate::value::ValueStore;

/// The set of temps registered as holding a shadow in the block currently
/// being emitted.
///
/// Distinct from [`crate::state::TempTable`] itself: the table holds the
/// actual `ShadowTemp`s, the ledger is the ordered registry the emitted
/// teardown call walks. Kept separate because a guarded exit (early abort,
/// conditional jump out of the block) needs to know "what's been written
/// so far" without re-deriving it from the table's occupancy, which would
/// also see carry-over state from table reuse between blocks.
#[derive(Default)]
pub struct OwnershipLedger {
    registered: Vec<IrTemp>,
}

impl OwnershipLedger {
    /// An empty ledger, as at block entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the ledger for a new block.
    pub fn reset(&mut self) {
        self.registered.clear();
    }

    /// Record that `t` now holds a live shadow. Idempotent: registering the
    /// same temp twice (e.g. a temp written, read, then overwritten within
    /// one block never happens under SSA-form IR, but defensive dedup costs
    /// nothing) only disowns it once at teardown.
    pub fn register(&mut self, t: IrTemp) {
        if !self.registered.contains(&t) {
            self.registered.push(t);
        }
    }

    /// Temps registered so far, in registration order.
    pub fn registered(&self) -> &[IrTemp] {
        &self.registered
    }

    /// Disown every registered temp's shadow via the owning state and
    /// value store, then clear the ledger. Called once at normal block
    /// exit.
    pub fn teardown(&mut self, state: &mut ShadowState, store: &mut ValueStore) {
        for &t in &self.registered {
            if let Some(temp) = state.temps.load(t) {
                temp.disown_all(store);
            }
        }
        self.registered.clear();
    }

    /// Same as [`Self::teardown`], but only disowns temps in `surviving`
    /// (e.g. on a conditional early exit where some registrations happened
    /// after the branch point and are provably dead on this path. Kept as
    /// a distinct entry point from `teardown` because the guarded case
    /// needs to leave the ledger's remaining entries intact for the
    /// fallthrough path to tear down normally.
    pub fn guarded_teardown(&mut self, surviving: &[IrTemp], state: &mut ShadowState, store: &mut ValueStore) {
        for &t in surviving {
            if let Some(temp) = state.temps.load(t) {
                temp.disown_all(store);
            }
            self.registered.retain(|&r| r != t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real::Real;
    use crate::types::FloatType;
    use crate::value::ShadowTemp;

    #[test]
    fn register_is_idempotent() {
        let mut ledger = OwnershipLedger::new();
        ledger.register(3);
        ledger.register(3);
        assert_eq!(ledger.registered(), &[3]);
    }

    #[test]
    fn teardown_disowns_every_registered_temp_and_clears() {
        let mut state = ShadowState::new(16, 4);
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, Real::from_f64(1.0, 64), None);
        state.temps.store(0, ShadowTemp::single(id)).unwrap();

        let mut ledger = OwnershipLedger::new();
        ledger.register(0);
        ledger.teardown(&mut state, &mut store);

        assert!(ledger.registered().is_empty());
        assert_eq!(store.live_count(), 0, "teardown disowns every registered temp's shadow");
    }

    #[test]
    fn guarded_teardown_leaves_other_registrations_intact() {
        let mut state = ShadowState::new(16, 4);
        let mut store = ValueStore::new();
        let a = store.new_value(FloatType::Double, Real::from_f64(1.0, 64), None);
        let b = store.new_value(FloatType::Double, Real::from_f64(2.0, 64), None);
        state.temps.store(0, ShadowTemp::single(a)).unwrap();
        state.temps.store(1, ShadowTemp::single(b)).unwrap();

        let mut ledger = OwnershipLedger::new();
        ledger.register(0);
        ledger.register(1);
        ledger.guarded_teardown(&[0], &mut state, &mut store);

        assert_eq!(ledger.registered(), &[1]);
    }
}
