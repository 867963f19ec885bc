//! Open-addressed-by-chaining memory shadow table.
//!
//! Bucket index is `addr mod LARGE_PRIME`; this is the one table sized
//! independently of anything the translator tells us, since the host
//! address space is effectively unbounded. Degradation under heavy use is
//! algorithmic (long chains), never fatal, matching §5's resource-cap
//! policy.

use crate::error::EngineResult;
use crate::types::FloatType;
use crate::value::{ShadowTemp, ShadowValueId, ValueStore};
use smallvec::SmallVec;

/// Bucket count. A prime comfortably larger than typical working-set sizes
/// keeps chains short without chasing a resize policy the design
/// explicitly says isn't worth it yet (see the design's open question on
/// sharding).
const LARGE_PRIME: usize = 100_003;

/// Host memory address, 4-byte aligned at the granularity this table
/// tracks.
pub type Addr = u64;

struct Entry {
    addr: Addr,
    value: ShadowValueId,
    ty: FloatType,
}

/// The memory shadow table: `addr -> Option<(ShadowValueId, FloatType)>`,
/// 4-byte granular, chained on collision.
#[derive(Default)]
pub struct MemoryTable {
    buckets: Vec<Vec<Entry>>,
}

impl MemoryTable {
    /// An empty table with `LARGE_PRIME` buckets pre-allocated.
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(LARGE_PRIME);
        buckets.resize_with(LARGE_PRIME, Vec::new);
        Self { buckets }
    }

    fn bucket_index(addr: Addr) -> usize {
        (addr as usize) % LARGE_PRIME
    }

    fn find(&self, addr: Addr) -> Option<(usize, &Entry)> {
        let bucket = &self.buckets[Self::bucket_index(addr)];
        bucket.iter().enumerate().find(|(_, e)| e.addr == addr)
    }

    fn find_mut(&mut self, addr: Addr) -> Option<&mut Entry> {
        let bucket = &mut self.buckets[Self::bucket_index(addr)];
        bucket.iter_mut().find(|e| e.addr == addr)
    }

    /// Raw single-slot lookup, 4 bytes at `addr`.
    pub fn get_slot(&self, addr: Addr) -> Option<(ShadowValueId, FloatType)> {
        self.find(addr).map(|(_, e)| (e.value, e.ty))
    }

    /// Insert or overwrite the 4-byte slot at `addr`, disowning whatever
    /// was there first.
    pub fn set_slot(&mut self, addr: Addr, value: ShadowValueId, ty: FloatType, store: &mut ValueStore) {
        if let Some(entry) = self.find_mut(addr) {
            store.disown(entry.value);
            entry.value = value;
            entry.ty = ty;
            return;
        }
        self.buckets[Self::bucket_index(addr)].push(Entry { addr, value, ty });
    }

    /// Disown and remove the 4-byte slot at `addr`, if present.
    pub fn clear_slot(&mut self, addr: Addr, store: &mut ValueStore) {
        let bucket = &mut self.buckets[Self::bucket_index(addr)];
        if let Some(pos) = bucket.iter().position(|e| e.addr == addr) {
            let entry = bucket.swap_remove(pos);
            store.disown(entry.value);
        }
    }

    /// Read a shadow temp aggregating up to 4 adjacent 4-byte slots
    /// starting at `addr`, falling back to "no shadow" for any slot that
    /// isn't present and can't be widened.
    ///
    /// `n_words` is the number of 4-byte slots to aggregate (1, 2, or 4).
    /// Slots without a shadow are synthesised from `concrete_words`
    /// (the host's raw bits for each word, same length as `n_words`) at
    /// `synth_ty`, which the caller derives from whatever static or
    /// dynamic width information it has for the enclosing access.
    pub fn get_mem(
        &self,
        addr: Addr,
        n_words: usize,
        concrete_words: &[u32],
        synth_ty: FloatType,
        precision: u32,
        store: &mut ValueStore,
    ) -> EngineResult<ShadowTemp> {
        assert_eq!(concrete_words.len(), n_words);
        let mut ids: SmallVec<[ShadowValueId; 4]> = SmallVec::new();

        for i in 0..n_words {
            let word_addr = addr + (i as u64) * 4;
            let id = match self.get_slot(word_addr) {
                Some((id, _)) => {
                    store.own(id);
                    id
                }
                None => {
                    let bits = concrete_words[i] as u64;
                    crate::state::thread::synthesize_shadow(store, synth_ty, bits, precision)
                }
            };
            ids.push(id);
        }

        ShadowTemp::new(ids)
    }

    /// Insert or overwrite every 4-byte slot covered by `temp`, starting at
    /// `addr`, disowning prior occupants.
    pub fn set_mem(&mut self, addr: Addr, temp: &ShadowTemp, ty: FloatType, store: &mut ValueStore) {
        for (i, &id) in temp.values().iter().enumerate() {
            store.own(id);
            self.set_slot(addr + (i as u64) * 4, id, ty, store);
        }
    }

    /// Disown every 4-byte slot covered by `[addr, addr + 4*n_words)`
    /// without inserting a replacement.
    pub fn clear_mem(&mut self, addr: Addr, n_words: usize, store: &mut ValueStore) {
        for i in 0..n_words {
            self.clear_slot(addr + (i as u64) * 4, store);
        }
    }

    /// Total number of occupied slots, for invariant testing.
    pub fn occupied_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}
