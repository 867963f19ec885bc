//! Static type tracking: an abstract-interpretation pass that predicts
//! which IR temps and thread-state slots can possibly carry a shadow,
//! so the emitter can skip instrumentation it can statically prove is dead.
//!
//! Per-block only: no knowledge survives a block boundary. A temp or
//! thread-state slot with no entry is conservatively [`FloatType::Unknown`]
//! at block entry.

use crate::state::{IrTemp, Offset};
use crate::types::FloatType;
use std::collections::HashMap;

/// Per-block abstract type state for temps and thread-state offsets.
#[derive(Default)]
pub struct StaticTypeTracker {
    temp_context: HashMap<IrTemp, FloatType>,
    ts_context: HashMap<Offset, FloatType>,
}

impl StaticTypeTracker {
    /// A tracker with no recorded knowledge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all recorded knowledge; called at every block entry, since the
    /// translator may reorder or reuse blocks in ways that invalidate
    /// whatever was true last time this address ran.
    pub fn reset(&mut self) {
        self.temp_context.clear();
        self.ts_context.clear();
    }

    /// Statically known type of a temp, [`FloatType::Unknown`] if
    /// unrecorded.
    pub fn temp_type(&self, t: IrTemp) -> FloatType {
        self.temp_context.get(&t).copied().unwrap_or(FloatType::Unknown)
    }

    /// Record a temp's type, overwriting any prior record for the same
    /// temp: IR temps are assigned exactly once per dynamic execution of a
    /// block, so a fresh write always reflects the whole truth, not a
    /// partial one to merge with. Callers that genuinely need a merge
    /// across two incoming values (e.g. `emit_ite`'s two arms) join before
    /// calling this.
    pub fn set_temp_type(&mut self, t: IrTemp, ty: FloatType) {
        self.temp_context.insert(t, ty);
    }

    /// Statically known type of a thread-state slot, [`FloatType::Unknown`]
    /// if unrecorded.
    pub fn thread_type(&self, offset: Offset) -> FloatType {
        self.ts_context.get(&offset).copied().unwrap_or(FloatType::Unknown)
    }

    /// Record a thread-state slot's type, overwriting any prior record:
    /// the slot's static type at any point in the block is whatever was
    /// last written to it, not a merge with whatever used to be there.
    pub fn set_thread_type(&mut self, offset: Offset, ty: FloatType) {
        self.ts_context.insert(offset, ty);
    }

    /// True if a value of this static type could ever carry a shadow.
    pub fn can_have_shadow(ty: FloatType) -> bool {
        ty.has_static_shadow() || matches!(ty, FloatType::Unknown)
    }

    /// True if a write of this static type is worth instrumenting: either
    /// it's statically known to carry a shadow, or the tracker can't rule
    /// it out.
    pub fn can_store_shadow(ty: FloatType) -> bool {
        Self::can_have_shadow(ty)
    }

    /// True if a value could possibly be float-typed at runtime, used to
    /// decide whether an unconditional-but-unprovable site still needs a
    /// dynamic check.
    pub fn can_be_float(ty: FloatType) -> bool {
        !matches!(ty, FloatType::NonFloat)
    }

    /// Size in 4-byte words of a statically-typed quantity, `None` when the
    /// width itself is unknown.
    pub fn size_of_in_words(ty: FloatType) -> Option<usize> {
        ty.size_words().map(|w| w as usize)
    }

    /// True if `ty` is definitely float-bearing and definitely shadow-free
    /// (e.g. proven unshadowed by a prior dynamic escape), letting the
    /// emitter skip instrumentation entirely rather than emit a no-op
    /// guard.
    pub fn is_float(ty: FloatType) -> bool {
        matches!(ty, FloatType::Single | FloatType::Double)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecorded_temp_is_unknown() {
        let tracker = StaticTypeTracker::new();
        assert_eq!(tracker.temp_type(5), FloatType::Unknown);
    }

    #[test]
    fn a_later_write_overwrites_an_earlier_one() {
        let mut tracker = StaticTypeTracker::new();
        tracker.set_temp_type(1, FloatType::Single);
        tracker.set_temp_type(1, FloatType::Double);
        assert_eq!(tracker.temp_type(1), FloatType::Double);
    }

    #[test]
    fn first_write_is_recorded_verbatim_not_joined_against_the_unknown_default() {
        let mut tracker = StaticTypeTracker::new();
        tracker.set_temp_type(0, FloatType::NonFloat);
        assert_eq!(tracker.temp_type(0), FloatType::NonFloat);
    }

    #[test]
    fn reset_drops_all_knowledge() {
        let mut tracker = StaticTypeTracker::new();
        tracker.set_temp_type(1, FloatType::Double);
        tracker.set_thread_type(0, FloatType::Single);
        tracker.reset();
        assert_eq!(tracker.temp_type(1), FloatType::Unknown);
        assert_eq!(tracker.thread_type(0), FloatType::Unknown);
    }

    #[test]
    fn non_float_is_not_float() {
        assert!(!StaticTypeTracker::is_float(FloatType::NonFloat));
        assert!(StaticTypeTracker::is_float(FloatType::Double));
    }
}
