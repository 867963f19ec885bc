//! The three shadow state stores that mirror host state: per-block temps,
//! thread (register) state, and memory.

mod memory;
mod temp;
mod thread;

pub use memory::{Addr as MemAddr, MemoryTable};
pub use temp::{IrTemp, TempTable};
pub use thread::{synthesize_shadow, Offset, ThreadStateTable};

use crate::value::ValueStore;

/// The three host-mirroring stores, bundled for convenient ownership by
/// [`crate::engine::Engine`].
pub struct ShadowState {
    pub temps: TempTable,
    pub thread: ThreadStateTable,
    pub memory: MemoryTable,
}

impl ShadowState {
    /// A fresh state for a host thread with `thread_words` words of guest
    /// state and `max_temps` temps in its first block.
    pub fn new(thread_words: usize, max_temps: usize) -> Self {
        Self {
            temps: TempTable::with_capacity(max_temps),
            thread: ThreadStateTable::with_capacity(thread_words),
            memory: MemoryTable::new(),
        }
    }

    /// Reset the temp table for a new IR block, leaving thread and memory
    /// state untouched (they persist across blocks).
    pub fn enter_block(&mut self, max_temps: usize) {
        self.temps.reset_for_block(max_temps);
    }

    /// Disown every live temp at block exit.
    pub fn exit_block(&mut self, store: &mut ValueStore) {
        self.temps.disown_all(store);
    }

    /// Disown all thread and temp state; called on engine teardown. Memory
    /// is left as-is since the host address space outlives any one run's
    /// bookkeeping in the same way the original program's heap does.
    pub fn teardown(&mut self, store: &mut ValueStore) {
        self.temps.disown_all(store);
        self.thread.clear_all(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::real::Real;
    use crate::types::FloatType;

    #[test]
    fn enter_block_drops_prior_block_temps() {
        let mut state = ShadowState::new(64, 8);
        let mut store = ValueStore::new();
        let id = store.new_value(FloatType::Double, Real::from_f64(1.0, 64), None);
        state.temps.store(0, crate::value::ShadowTemp::single(id)).unwrap();
        state.exit_block(&mut store);
        state.enter_block(8);
        assert!(state.temps.load(0).is_none());
        assert_eq!(store.live_count(), 0);
    }
}
