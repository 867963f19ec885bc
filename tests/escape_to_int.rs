//! `int n = (int) floor(x);` reported via `HERBGRIND_ESCAPE("floor->int",
//! mismatch, 1, {shadow(x)})`. The int-mark site should record one hit
//! per call, with its influence set only growing when `mismatch` is set
//! and the observed error crosses the threshold.

use shadowfp::prelude::*;

#[test]
fn escape_site_records_one_hit_per_call_and_only_influences_on_mismatch() {
    let mut config = Config::default();
    config.error_threshold = 1;
    let mut engine = Engine::new(config, 64);
    engine.handle_request(ClientRequest::Begin);

    let p = engine.config().precision;

    // floor(2.4) truncates identically in both host and shadow: no mismatch.
    let x = engine.new_value(FloatType::Double, Real::from_f64(2.4, p), None);
    engine.escape_from_float(0x5000, EscapeKind::ToInt, false, &[x], &[2.4]);
    engine.disown(x);

    // a case engineered to disagree: shadow says floor(y) == 3, host
    // truncated a value that rounds to 2 (mismatch = true).
    let y = engine.new_value(FloatType::Double, Real::from_f64(3.0, p), None);
    engine.escape_from_float(0x5000, EscapeKind::ToInt, true, &[y], &[2.0]);
    engine.disown(y);

    let report = engine.report();
    assert!(report.contains("0x5000"));
    assert!(report.contains("escape"));
}
