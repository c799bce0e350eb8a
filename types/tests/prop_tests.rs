use proptest::prelude::*;

use coffer_types::{DecimalValue, MultiSignatureDescriptor, PublicKey, Timestamp};

fn key_list() -> impl Strategy<Value = Vec<PublicKey>> {
    prop::collection::vec("[a-f0-9]{4}", 0..6)
        .prop_map(|v| v.into_iter().map(PublicKey::from).collect())
}

proptest! {
    /// Scaling down then up returns the original raw integer.
    #[test]
    fn raw_scaling_is_lossless(raw in 0u128..10u128.pow(27), decimals in 0u32..=18) {
        let value = DecimalValue::from_raw(raw, decimals).unwrap();
        prop_assert_eq!(value.to_raw(decimals).unwrap(), raw);
    }

    /// Adding scaled values matches scaling the integer sum.
    #[test]
    fn scaled_addition_matches_raw_addition(
        a in 0u128..1_000_000_000_000,
        b in 0u128..1_000_000_000_000,
    ) {
        let sum = DecimalValue::from_raw(a, 8).unwrap() + DecimalValue::from_raw(b, 8).unwrap();
        prop_assert_eq!(sum, DecimalValue::from_raw(a + b, 8).unwrap());
    }

    /// Subtraction goes negative exactly when the subtrahend is larger.
    #[test]
    fn subtraction_is_exact(a in 0u128..1_000_000_000, b in 0u128..1_000_000_000) {
        let diff = DecimalValue::from_raw(a, 8).unwrap() - DecimalValue::from_raw(b, 8).unwrap();
        prop_assert_eq!(diff.is_negative(), b > a);
        prop_assert_eq!(diff + DecimalValue::from_raw(b, 8).unwrap(), DecimalValue::from_raw(a, 8).unwrap());
    }

    /// Raw strings of any length survive scaling down and back up.
    #[test]
    fn long_raw_strings_round_trip(raw in "[1-9][0-9]{0,80}", decimals in 0u32..=36) {
        let value = DecimalValue::from_raw_str(&raw, decimals).unwrap();
        prop_assert_eq!(value.to_raw_string(decimals).unwrap(), raw);
    }

    /// Advanced descriptors flatten to mandatory ++ optional.
    #[test]
    fn advanced_flattening_is_concatenation(
        mandatory in key_list(),
        optional in key_list(),
        n in 1u32..6,
    ) {
        let descriptor = MultiSignatureDescriptor::Advanced {
            mandatory_keys: mandatory.clone(),
            optional_keys: optional.clone(),
            number_of_signatures: n,
        };
        let mut expected = mandatory;
        expected.extend(optional);
        prop_assert_eq!(descriptor.public_keys(), expected);
    }

    /// Simple descriptors flatten verbatim.
    #[test]
    fn simple_flattening_is_identity(keys in key_list(), min in 1u32..6) {
        let descriptor = MultiSignatureDescriptor::Simple { min, public_keys: keys.clone() };
        prop_assert_eq!(descriptor.public_keys(), keys);
    }

    /// start_of_day never moves forward and stays within one day.
    #[test]
    fn start_of_day_bounds(secs in 0u64..u64::MAX / 2) {
        let t = Timestamp::new(secs);
        let day = t.start_of_day();
        prop_assert!(day <= t);
        prop_assert!(t.as_secs() - day.as_secs() < coffer_types::time::SECS_PER_DAY);
    }
}
