//! A 128-bit load of two doubles, a lane-wise add, and a 128-bit store:
//! the memory table should end up with independent entries at `addr` and
//! `addr+8`, and the two lanes should carry independent shadow values and
//! independent op-site error bookkeeping.

use shadowfp::executor::{OpSiteTable, ShadowOpExecutor};
use shadowfp::prelude::*;
use shadowfp::state::MemoryTable;
use shadowfp::value::ShadowTemp;

#[test]
fn two_independent_lanes_round_trip_through_memory_and_add() {
    let config = Config::default();
    let p = config.precision;
    let mut store = ValueStore::new();
    let mut memory = MemoryTable::new();

    let lane0 = store.new_value(FloatType::Double, Real::from_f64(1.5, p), None);
    let lane1 = store.new_value(FloatType::Double, Real::from_f64(2.5, p), None);
    let loaded = ShadowTemp::new(smallvec_of(lane0, lane1)).unwrap();
    memory.set_mem(0x8000, &loaded, FloatType::Double, &mut store);
    store.disown(lane0);
    store.disown(lane1);

    assert_eq!(memory.get_slot(0x8000).map(|(_, ty)| ty), Some(FloatType::Double));
    assert_eq!(memory.get_slot(0x8008).map(|(_, ty)| ty), Some(FloatType::Double));
    assert_eq!(memory.occupied_count(), 4, "a double occupies two 4-byte slots, two doubles occupy four");

    // read back a 4-word (two doubles) region and add 1.0 lane-wise
    let concrete_words = [0u32; 4];
    let temp = memory.get_mem(0x8000, 4, &concrete_words, FloatType::Double, p, &mut store).unwrap();
    assert_eq!(temp.len(), 4, "aggregated read spans all four 4-byte words of the two doubles");

    let one = Real::from_f64(1.0, p);
    let no_influences = InfluenceSet::new();
    let mut sites = OpSiteTable::new();
    let executor = ShadowOpExecutor::new(&config);

    let lane0_real = store.get(temp.values()[0]).real().clone();
    let lane0_influences = store.get(temp.values()[0]).influences().clone();
    let lane1_real = store.get(temp.values()[2]).real().clone();
    let lane1_influences = store.get(temp.values()[2]).influences().clone();

    let result0 = executor.execute(
        &mut sites,
        &mut store,
        "add",
        0x9000,
        0x9000,
        FloatType::Double,
        &[Operand { real: &lane0_real, host: 1.5, expr: None, influences: &lane0_influences }, Operand { real: &one, host: 1.0, expr: None, influences: &no_influences }],
        2.5,
        |r, prec| Real::add(r[0], r[1], prec),
    );
    let result1 = executor.execute(
        &mut sites,
        &mut store,
        "add",
        0x9000,
        0x9000,
        FloatType::Double,
        &[Operand { real: &lane1_real, host: 2.5, expr: None, influences: &lane1_influences }, Operand { real: &one, host: 1.0, expr: None, influences: &no_influences }],
        3.5,
        |r, prec| Real::add(r[0], r[1], prec),
    );

    assert_ne!(result0, result1, "each lane gets its own shadow value");
    assert_eq!(store.get(result0).real().to_f64(), 2.5);
    assert_eq!(store.get(result1).real().to_f64(), 3.5);
    // both additions folded into the same op-site's error aggregate
    assert_eq!(sites.iter().next().unwrap().eagg.num_evals, 2);
}

fn smallvec_of(a: shadowfp::value::ShadowValueId, b: shadowfp::value::ShadowValueId) -> smallvec::SmallVec<[shadowfp::value::ShadowValueId; 4]> {
    smallvec::smallvec![a, a, b, b]
}
