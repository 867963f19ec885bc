//! Translates IR statements into the additional shadow-updating IR that
//! will execute alongside them.
//!
//! | Statement | Shadow action |
//! |---|---|
//! | `t2 = RdTmp t1` | if `t1` shadowable, copy the shadow-temp pointer with a ref-count increment |
//! | `t = Const c` | static `NonFloat`; no shadow |
//! | `t = ITE(c, a, b)` | select a shadow at runtime; if both arms have the same static type, propagate it, else `Unknown` |
//! | `Put off ← e` | disown any existing shadow overlapping the write, then write lane-wise |
//! | `PutI` | array-relative `Put` |
//! | `t = Get off` / `GetI` | direct table read when statically resolvable, else a dynamic helper |
//! | `t = Load addr` / `LoadG` | always a dynamic memory lookup |
//! | `Store addr ← e` / `StoreG` | dynamic set or clear |
//! | `Cas` | no-op, explicit non-goal |
//! | arithmetic `Op` | call into the executor with operand shadow-temp pointers |
//!
//! Whenever the static tracker proves a classification the minimal
//! unconditional helper is emitted; otherwise a guarded dynamic helper runs
//! the check at runtime. This is the tracker's only reason to exist.

use crate::ir::{Effect, IrExpr, IrSink, IrStmt};
use crate::ledger::OwnershipLedger;
use crate::state::IrTemp;
use crate::tracker::StaticTypeTracker;
use crate::types::FloatType;

/// Translates one block's worth of [`IrStmt`]s into instrumentation,
/// driving a [`StaticTypeTracker`] and [`OwnershipLedger`] as it goes.
pub struct InstrumentationEmitter<'a> {
    tracker: &'a mut StaticTypeTracker,
    ledger: &'a mut OwnershipLedger,
}

impl<'a> InstrumentationEmitter<'a> {
    pub fn new(tracker: &'a mut StaticTypeTracker, ledger: &'a mut OwnershipLedger) -> Self {
        Self { tracker, ledger }
    }

    /// Call at the start of each block, before emitting any statement.
    pub fn enter_block(&mut self) {
        self.tracker.reset();
        self.ledger.reset();
    }

    /// Emit instrumentation for one statement into `sink`.
    pub fn emit(&mut self, stmt: &IrStmt, sink: &mut impl IrSink) {
        match stmt {
            IrStmt::RdTmp { dst, src } => self.emit_rdtmp(*dst, *src, sink),
            IrStmt::WrConst { dst, .. } => self.emit_wrconst(*dst),
            IrStmt::Ite { dst, cond, a, b } => self.emit_ite(*dst, cond.clone(), *a, *b, sink),
            IrStmt::Put { offset, src } => self.emit_put(*offset, *src, sink),
            IrStmt::PutI { base_offset, index, elem_words, src } => {
                self.emit_puti(*base_offset, index.clone(), *elem_words, *src, sink)
            }
            IrStmt::Get { dst, offset } => self.emit_get(*dst, *offset, sink),
            IrStmt::GetI { dst, base_offset, index, elem_words } => {
                self.emit_geti(*dst, *base_offset, index.clone(), *elem_words, sink)
            }
            IrStmt::Load { dst, addr, n_words } => self.emit_load(*dst, addr.clone(), *n_words, sink),
            IrStmt::LoadG { dst, addr, guard, alt, n_words } => {
                self.emit_loadg(*dst, addr.clone(), guard.clone(), *alt, *n_words, sink)
            }
            IrStmt::Store { addr, src, n_words } => self.emit_store(addr.clone(), *src, *n_words, sink),
            IrStmt::StoreG { addr, guard, src, n_words } => {
                self.emit_storeg(addr.clone(), guard.clone(), *src, *n_words, sink)
            }
            IrStmt::Cas { .. } => {
                // explicit non-goal: no instrumentation.
            }
            IrStmt::Op { dst, op_name, op_addr, args } => self.emit_op(*dst, *op_name, *op_addr, args, sink),
        }
    }

    /// Emit the end-of-block teardown call and hand back every temp that
    /// was registered, for the caller to actually disown via the value
    /// store (the emitter only knows about IR, not the runtime store).
    pub fn exit_block(&mut self, sink: &mut impl IrSink) -> Vec<IrTemp> {
        let registered = self.ledger.registered().to_vec();
        if !registered.is_empty() {
            sink.dirty_call("shadow_block_teardown", &registered, Effect::WritesThreadState);
        }
        registered
    }

    fn emit_rdtmp(&mut self, dst: IrTemp, src: IrTemp, sink: &mut impl IrSink) {
        let ty = self.tracker.temp_type(src);
        if StaticTypeTracker::can_have_shadow(ty) {
            sink.dirty_call("shadow_copy_temp", &[dst, src], Effect::None);
            self.ledger.register(dst);
        }
        self.tracker.set_temp_type(dst, ty);
    }

    fn emit_wrconst(&mut self, dst: IrTemp) {
        self.tracker.set_temp_type(dst, FloatType::NonFloat);
    }

    fn emit_ite(&mut self, dst: IrTemp, cond: IrExpr, a: IrTemp, b: IrTemp, sink: &mut impl IrSink) {
        let ty = self.tracker.temp_type(a).join(self.tracker.temp_type(b));
        if StaticTypeTracker::can_have_shadow(ty) {
            sink.ite(cond, a, b);
            sink.dirty_call("shadow_select_temp", &[dst, a, b], Effect::None);
            self.ledger.register(dst);
        }
        self.tracker.set_temp_type(dst, ty);
    }

    fn emit_put(&mut self, offset: u16, src: IrTemp, sink: &mut impl IrSink) {
        let ty = self.tracker.temp_type(src);
        let name = match ty {
            FloatType::Single | FloatType::Double => "shadow_put_static",
            _ => "dynamic_put64",
        };
        sink.dirty_call(name, &[src], Effect::WritesThreadState);
        self.tracker.set_thread_type(offset, ty);
    }

    fn emit_puti(&mut self, base_offset: u16, _index: IrExpr, _elem_words: u8, src: IrTemp, sink: &mut impl IrSink) {
        sink.dirty_call("dynamic_puti", &[src], Effect::WritesThreadState);
        // array-relative: the static tracker can't resolve the dynamic
        // index, so the slot this lane would occupy is left `Unknown`.
        self.tracker.set_thread_type(base_offset, FloatType::Unknown);
    }

    fn emit_get(&mut self, dst: IrTemp, offset: u16, sink: &mut impl IrSink) {
        let ty = self.tracker.thread_type(offset);
        if ty.has_static_shadow() {
            sink.dirty_call("shadow_get_static", &[dst], Effect::ReadsThreadState);
        } else if StaticTypeTracker::can_have_shadow(ty) {
            sink.dirty_call("dynamic_get", &[dst], Effect::ReadsThreadState);
        }
        self.tracker.set_temp_type(dst, ty);
        if StaticTypeTracker::can_have_shadow(ty) {
            self.ledger.register(dst);
        }
    }

    fn emit_geti(&mut self, dst: IrTemp, _base_offset: u16, _index: IrExpr, _elem_words: u8, sink: &mut impl IrSink) {
        sink.dirty_call("dynamic_geti", &[dst], Effect::ReadsThreadState);
        self.tracker.set_temp_type(dst, FloatType::Unknown);
        self.ledger.register(dst);
    }

    fn emit_load(&mut self, dst: IrTemp, _addr: IrExpr, _n_words: u8, sink: &mut impl IrSink) {
        sink.dirty_call("dynamic_load", &[dst], Effect::ReadsMemory);
        self.tracker.set_temp_type(dst, FloatType::Unknown);
        self.ledger.register(dst);
    }

    fn emit_loadg(&mut self, dst: IrTemp, _addr: IrExpr, _guard: IrExpr, alt: IrTemp, _n_words: u8, sink: &mut impl IrSink) {
        sink.dirty_call("dynamic_loadg", &[dst, alt], Effect::ReadsMemory);
        self.tracker.set_temp_type(dst, FloatType::Unknown);
        self.ledger.register(dst);
    }

    fn emit_store(&mut self, _addr: IrExpr, src: IrTemp, _n_words: u8, sink: &mut impl IrSink) {
        sink.dirty_call("dynamic_store", &[src], Effect::WritesMemory);
    }

    fn emit_storeg(&mut self, _addr: IrExpr, _guard: IrExpr, src: IrTemp, _n_words: u8, sink: &mut impl IrSink) {
        sink.dirty_call("dynamic_storeg", &[src], Effect::WritesMemory);
    }

    fn emit_op(&mut self, dst: IrTemp, op_name: &'static str, _op_addr: u64, args: &[IrTemp], sink: &mut impl IrSink) {
        sink.dirty_call(op_name, args, Effect::None);
        self.tracker.set_temp_type(dst, FloatType::Unknown);
        self.ledger.register(dst);
    }
}
