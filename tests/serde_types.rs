//! `FloatType` round-trips through JSON when the `serde` feature is on,
//! the same shape of check the upstream profiler runs for its own
//! serialisable report types.
#![cfg(feature = "serde")]

use shadowfp::types::FloatType;

#[test]
fn float_type_round_trips_through_json() {
    for ty in [FloatType::NonFloat, FloatType::Unshadowed, FloatType::Single, FloatType::Double, FloatType::Unknown] {
        let json = serde_json::to_vec(&ty).expect("serialisation failed");
        let decoded: FloatType = serde_json::from_slice(&json).expect("deserialisation failed");
        assert_eq!(decoded, ty);
    }
}
