//! A block that does only integer arithmetic: every temp is written from
//! a constant or copied from another constant-typed temp, with no `Op`
//! (shadowed arithmetic) statement anywhere. The emitter should leave
//! every temp `NonFloat` and never call into the shadow runtime.

use shadowfp::prelude::*;
use shadowfp::tracker::StaticTypeTracker;

#[test]
fn integer_only_block_never_touches_the_shadow_runtime() {
    let mut tracker = StaticTypeTracker::new();
    let mut ledger = shadowfp::ledger::OwnershipLedger::new();
    let mut emitter = InstrumentationEmitter::new(&mut tracker, &mut ledger);
    let mut sink = RecordingSink::default();

    emitter.enter_block();
    // t0 = 5; t1 = t0; t2 = t1 (a chain of integer moves)
    emitter.emit(&IrStmt::WrConst { dst: 0, bits: 5 }, &mut sink);
    emitter.emit(&IrStmt::RdTmp { dst: 1, src: 0 }, &mut sink);
    emitter.emit(&IrStmt::RdTmp { dst: 2, src: 1 }, &mut sink);
    let registered = emitter.exit_block(&mut sink);

    assert!(sink.calls.is_empty(), "no dirty call should be emitted for an all-integer block");
    assert!(registered.is_empty(), "nothing should have been registered in the ownership ledger");

    for t in 0..3u32 {
        assert_eq!(tracker.temp_type(t), shadowfp::types::FloatType::NonFloat);
    }
}

#[test]
fn engine_report_is_empty_when_nothing_was_ever_shadowed() {
    let config = Config::default();
    let engine = Engine::new(config, 64);
    let report = engine.report();
    assert!(report.trim().is_empty());
}
