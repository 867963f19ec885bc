//! `z=5; x = add(4, 5); y = add(6, z+6);` bracketed by begin/end.
//!
//! The two `add` calls land at the same call-site address and should
//! generalise to a two-variable expression; the unrelated `z+6` addition
//! is a separate site entirely.

use shadowfp::prelude::*;

fn operand<'a>(real: &'a Real, influences: &'a InfluenceSet) -> Operand<'a> {
    Operand { real, host: real.to_f64(), expr: None, influences }
}

#[test]
fn two_calls_to_the_same_add_site_generalise_and_a_third_site_stays_separate() {
    let config = Config::default();
    let mut engine = Engine::new(config, 64);
    engine.handle_request(ClientRequest::Begin);

    let p = engine.config().precision;
    let no_influences = InfluenceSet::new();

    // add(4, 5) at 0x1000
    let four = Real::from_f64(4.0, p);
    let five = Real::from_f64(5.0, p);
    let ops = vec![operand(&four, &no_influences), operand(&five, &no_influences)];
    engine.execute_op("add", 0x1000, 0x1000, FloatType::Double, &ops, 9.0, |r, prec| Real::add(r[0], r[1], prec));

    // add(6, z + 6) at the same address 0x1000, z = 11
    let six = Real::from_f64(6.0, p);
    let seventeen = Real::from_f64(17.0, p);
    let ops = vec![operand(&six, &no_influences), operand(&seventeen, &no_influences)];
    engine.execute_op("add", 0x1000, 0x1000, FloatType::Double, &ops, 23.0, |r, prec| Real::add(r[0], r[1], prec));

    // z + 6 itself, a distinct site at 0x2000
    let z = Real::from_f64(11.0, p);
    let ops = vec![operand(&z, &no_influences), operand(&six, &no_influences)];
    engine.execute_op("add", 0x2000, 0x1000, FloatType::Double, &ops, 17.0, |r, prec| Real::add(r[0], r[1], prec));

    let report = engine.report();
    assert!(report.contains("0x1000"));
    assert!(report.contains("0x2000"));
    assert_eq!(report.matches("add").count(), 2, "two distinct op-site records, add(4,5)/add(6,z+6) merged by address");
}
