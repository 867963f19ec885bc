//! The translator's IR surface, as this engine sees it.
//!
//! The translator itself is out of scope; everything here models the shape
//! of what it hands us (a block of [`IrStmt`]s) and the hook surface it
//! expects us to call back into ([`IrSink`]).

use crate::state::{IrTemp, Offset};
use crate::opinfo::Addr;

/// Either a temp reference or an immediate, as an IR statement's operand.
#[derive(Debug, Clone, PartialEq)]
pub enum IrExpr {
    RdTmp(IrTemp),
    Const(u64),
}

/// One lifted IR statement, in the shape this engine needs to see to
/// decide what instrumentation to emit. Anything the translator emits that
/// isn't listed here (control flow exits, non-float-bearing ops) passes
/// through untouched and never reaches the emitter.
#[derive(Debug, Clone, PartialEq)]
pub enum IrStmt {
    /// `t = RdTmp(t')`: copy a temp's value (and shadow) to a new temp.
    RdTmp { dst: IrTemp, src: IrTemp },
    /// `t = Const(bits)`: a temp takes a known-concrete constant, never a
    /// float shadow candidate coming from host memory.
    WrConst { dst: IrTemp, bits: u64 },
    /// `t = ITE(cond, a, b)`: conditional temp select; shadow-wise this
    /// joins the static types of both arms (§4.4's `join`).
    Ite { dst: IrTemp, cond: IrExpr, a: IrTemp, b: IrTemp },
    /// `PUT(offset) = t`: write a temp into thread state.
    Put { offset: Offset, src: IrTemp },
    /// `PUT(offset + i*size) = t` for an array/indexed register file.
    PutI { base_offset: Offset, index: IrExpr, elem_words: u8, src: IrTemp },
    /// `t = GET(offset)`: read thread state into a temp.
    Get { dst: IrTemp, offset: Offset },
    /// `t = GETI(offset + i*size)`.
    GetI { dst: IrTemp, base_offset: Offset, index: IrExpr, elem_words: u8 },
    /// `t = LOAD(addr)`: read memory into a temp.
    Load { dst: IrTemp, addr: IrExpr, n_words: u8 },
    /// `t = LOADG(addr, guard, alt)`: guarded load, falls back to `alt` when
    /// the guard is false.
    LoadG { dst: IrTemp, addr: IrExpr, guard: IrExpr, alt: IrTemp, n_words: u8 },
    /// `STORE(addr) = t`: write a temp to memory.
    Store { addr: IrExpr, src: IrTemp, n_words: u8 },
    /// `STOREG(addr, guard) = t`: guarded store, no-op when the guard is
    /// false.
    StoreG { addr: IrExpr, guard: IrExpr, src: IrTemp, n_words: u8 },
    /// `t = CAS(addr, expected, new)`: atomic compare-and-swap. Explicit
    /// non-goal: never instrumented.
    Cas { dst: IrTemp, addr: IrExpr, expected: IrTemp, new: IrTemp },
    /// `t = OP(op_name, args)`: a floating-point (or not) arithmetic
    /// operation. `op_addr` is the static address the resulting op site is
    /// keyed by.
    Op { dst: IrTemp, op_name: &'static str, op_addr: Addr, args: Vec<IrTemp> },
}

/// A side effect an emitted dirty call may declare, so the translator's
/// scheduler knows what it must not reorder across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ReadsMemory,
    WritesMemory,
    ReadsThreadState,
    WritesThreadState,
    None,
}

/// The translator's hook surface, as consumed by [`crate::emitter::InstrumentationEmitter`].
///
/// A real translator implements this by lowering each call into its own
/// IR; the test suite instead exercises the emitter against
/// [`RecordingSink`], which just records what was asked for.
pub trait IrSink {
    /// Append a (possibly instrumentation-only) statement to the block
    /// currently being emitted.
    fn append(&mut self, stmt: IrStmt);

    /// Allocate a fresh temp of the given word width within the block
    /// currently being emitted.
    fn new_temp(&mut self, words: u8) -> IrTemp;

    /// Emit a call to a named runtime helper with the given argument temps,
    /// declaring `effects` so the translator's scheduler can place it
    /// correctly; returns the temp holding the call's result, if any.
    fn dirty_call(&mut self, name: &'static str, args: &[IrTemp], effects: Effect) -> Option<IrTemp>;

    /// Emit `cond ? a : b` as a new temp.
    fn ite(&mut self, cond: IrExpr, a: IrTemp, b: IrTemp) -> IrTemp;
}

/// A call recorded by [`RecordingSink`], for assertions in emitter tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub name: &'static str,
    pub args: Vec<IrTemp>,
    pub effects: Effect,
}

/// A no-op [`IrSink`] that just records every call it receives, for testing
/// [`crate::emitter::InstrumentationEmitter`] without a real translator.
#[derive(Default)]
pub struct RecordingSink {
    pub statements: Vec<IrStmt>,
    pub calls: Vec<RecordedCall>,
    next_temp: IrTemp,
}

impl RecordingSink {
    /// A sink whose first freshly allocated temp is numbered `first_temp`
    /// (so tests can keep synthetic temps from colliding with the block's
    /// own).
    pub fn starting_at(first_temp: IrTemp) -> Self {
        Self {
            next_temp: first_temp,
            ..Self::default()
        }
    }
}

impl IrSink for RecordingSink {
    fn append(&mut self, stmt: IrStmt) {
        self.statements.push(stmt);
    }

    fn new_temp(&mut self, _words: u8) -> IrTemp {
        let t = self.next_temp;
        self.next_temp += 1;
        t
    }

    fn dirty_call(&mut self, name: &'static str, args: &[IrTemp], effects: Effect) -> Option<IrTemp> {
        self.calls.push(RecordedCall {
            name,
            args: args.to_vec(),
            effects,
        });
        Some(self.new_temp(1))
    }

    fn ite(&mut self, cond: IrExpr, a: IrTemp, b: IrTemp) -> IrTemp {
        let dst = self.new_temp(1);
        self.append(IrStmt::Ite { dst, cond, a, b });
        dst
    }
}
