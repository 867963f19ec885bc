//! `add(x, x)` evaluated twice with different concrete `x` each time: both
//! operand positions hold the same value within a single call, so they
//! should be folded as one variable, leaving the site's final var-map with
//! a single group spanning both leaves.

use shadowfp::executor::{OpSiteTable, ShadowOpExecutor};
use shadowfp::prelude::*;

#[test]
fn self_addition_generalises_to_a_single_shared_variable() {
    let config = Config::default();
    let p = config.precision;
    let mut store = ValueStore::new();
    let mut sites = OpSiteTable::new();
    let executor = ShadowOpExecutor::new(&config);
    let no_influences = InfluenceSet::new();

    let x1 = Real::from_f64(3.0, p);
    executor.execute(
        &mut sites,
        &mut store,
        "add",
        0x6000,
        0x6000,
        FloatType::Double,
        &[
            Operand { real: &x1, host: 3.0, expr: None, influences: &no_influences },
            Operand { real: &x1, host: 3.0, expr: None, influences: &no_influences },
        ],
        6.0,
        |r, prec| Real::add(r[0], r[1], prec),
    );

    let x2 = Real::from_f64(7.0, p);
    executor.execute(
        &mut sites,
        &mut store,
        "add",
        0x6000,
        0x6000,
        FloatType::Double,
        &[
            Operand { real: &x2, host: 7.0, expr: None, influences: &no_influences },
            Operand { real: &x2, host: 7.0, expr: None, influences: &no_influences },
        ],
        14.0,
        |r, prec| Real::add(r[0], r[1], prec),
    );

    let site = sites.iter().next().expect("one op site at 0x6000");
    let generalised = site.expr.current().expect("at least one value folded in");
    assert_eq!(generalised.var_map.num_leaves(), 2);
    assert_eq!(
        generalised.var_map.group_of(0),
        generalised.var_map.group_of(1),
        "both operands of add(x, x) share the same variable"
    );
}
