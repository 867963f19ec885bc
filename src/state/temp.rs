//! Dense per-block temp table: `IRTemp -> Option<ShadowTemp>`.

use crate::error::{EngineError, EngineResult};
use crate::value::{ShadowTemp, ValueStore};

/// Index of an IR temp within one block, as handed to us by the translator.
pub type IrTemp = u32;

/// The temp table. Lifetime is exactly one IR block; every live entry is
/// torn down at block exit via the ownership ledger (see
/// [`crate::ledger::OwnershipLedger`]), restoring the table to all-`None`
/// before the next block reuses it.
#[derive(Default)]
pub struct TempTable {
    slots: Vec<Option<ShadowTemp>>,
}

impl TempTable {
    /// A table sized for `max_temps` IR temps, as reported by the
    /// translator for the block about to execute.
    pub fn with_capacity(max_temps: usize) -> Self {
        Self {
            slots: vec![None; max_temps],
        }
    }

    /// Resize and clear for a new block, reusing the backing allocation
    /// when possible.
    pub fn reset_for_block(&mut self, max_temps: usize) {
        self.slots.clear();
        self.slots.resize(max_temps, None);
    }

    /// Current shadow for a temp, if any.
    pub fn load(&self, t: IrTemp) -> Option<&ShadowTemp> {
        self.slots.get(t as usize).and_then(Option::as_ref)
    }

    /// Install a shadow for a temp.
    ///
    /// # Errors
    /// Returns [`EngineError::Invariant`] if the slot is already occupied:
    /// the static tracker is required to prove a temp is written at most
    /// once per IR temp number before the emitter calls this, so a
    /// double-store indicates an instrumentation bug rather than anything a
    /// host program could trigger.
    pub fn store(&mut self, t: IrTemp, temp: ShadowTemp) -> EngineResult<()> {
        let slot = &mut self.slots[t as usize];
        if slot.is_some() {
            return Err(EngineError::invariant("temp already has a live shadow"));
        }
        *slot = Some(temp);
        Ok(())
    }

    /// Iterate the temps currently carrying a live shadow, in index order.
    pub fn live_temps(&self) -> impl Iterator<Item = IrTemp> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_some().then_some(i as IrTemp))
    }

    /// Disown and clear every live temp, via `store`'s owning [`ValueStore`].
    /// Called once per block by the ownership ledger at block exit.
    pub fn disown_all(&mut self, store: &mut ValueStore) {
        for slot in &mut self.slots {
            if let Some(temp) = slot.take() {
                temp.disown_all(store);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real::Real;
    use crate::types::FloatType;

    #[test]
    fn store_then_load_round_trips() {
        let mut table = TempTable::with_capacity(8);
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, Real::from_f64(1.0, 64), None);
        table.store(3, ShadowTemp::single(id)).unwrap();
        assert!(table.load(3).is_some());
        assert!(table.load(2).is_none());
    }

    #[test]
    fn double_store_returns_invariant_error() {
        let mut table = TempTable::with_capacity(4);
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, Real::from_f64(1.0, 64), None);
        table.store(0, ShadowTemp::single(id)).unwrap();
        let err = table.store(0, ShadowTemp::single(id)).unwrap_err();
        assert!(matches!(err, EngineError::Invariant(_)));
    }

    #[test]
    fn disown_all_clears_table_and_drops_refs() {
        let mut table = TempTable::with_capacity(4);
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, Real::from_f64(1.0, 64), None);
        table.store(1, ShadowTemp::single(id)).unwrap();
        table.disown_all(&mut store);
        assert!(table.load(1).is_none());
        assert_eq!(store.live_count(), 0);
    }
}
