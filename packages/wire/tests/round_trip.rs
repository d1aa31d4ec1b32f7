//! Round-trip properties of the three wire layouts.

use offload_wire::{decode, encode, float64, int32, opaque, CodecKind, Values};
use proptest::prelude::*;
use serde_json::{json, Value};

proptest! {
    #[test]
    fn int32_round_trip_is_exact(values in proptest::collection::vec(any::<i32>(), 0..64)) {
        let bytes = int32::encode(&values);
        prop_assert_eq!(bytes.len(), values.len() * 4);
        prop_assert_eq!(int32::decode(&bytes).unwrap(), values);
    }

    #[test]
    fn float64_round_trip_is_bit_exact(bits in proptest::collection::vec(any::<u64>(), 0..64)) {
        let values: Vec<f64> = bits.iter().map(|b| f64::from_bits(*b)).collect();
        let decoded = float64::decode(&float64::encode(&values)).unwrap();
        let decoded_bits: Vec<u64> = decoded.iter().map(|v| v.to_bits()).collect();
        prop_assert_eq!(decoded_bits, bits);
    }

    #[test]
    fn opaque_round_trip_below_u0100(text in "[\\x20-\\x{ff}]{0,32}", n in any::<i32>()) {
        let value = json!([text, n]);
        let bytes = opaque::encode(&value).unwrap();
        prop_assert_eq!(opaque::decode(&bytes).unwrap(), Some(value));
    }

    #[test]
    fn vector_buffers_with_ragged_length_are_rejected(len in 1usize..64) {
        let buf = vec![0u8; len];
        prop_assert_eq!(int32::decode(&buf).is_ok(), len % 4 == 0);
        prop_assert_eq!(float64::decode(&buf).is_ok(), len % 8 == 0);
    }
}

#[test]
fn opaque_truncates_above_latin1_instead_of_round_tripping() {
    let original = json!(["\u{0161}"]);
    let bytes = encode(&Values::from(original.clone())).unwrap();
    let decoded = decode(CodecKind::Opaque, &bytes).unwrap();

    // U+0161 keeps only its low byte 0x61, which is 'a'.
    assert_eq!(decoded, Values::Opaque(Some(json!(["a"]))));
    assert_ne!(decoded, Values::Opaque(Some(original)));
}

#[test]
fn opaque_truncation_can_corrupt_structure() {
    // U+0122 narrows to 0x22, a quote, which ends the string early.
    let bytes = opaque::encode(&json!(["\u{0122}"])).unwrap();
    assert_eq!(&bytes[..], b"[\"\"\"]");
    assert!(opaque::decode(&bytes).is_err());
}

#[test]
fn scalar_and_single_element_int32_encode_identically() {
    assert_eq!(int32::encode(&[5]), encode(&Values::Int32(vec![5])).unwrap());
}

#[test]
fn empty_opaque_buffer_is_not_an_error() {
    assert_eq!(decode(CodecKind::Opaque, &[]).unwrap(), Values::Opaque(None));
    let _: Option<Value> = opaque::decode(&[]).unwrap();
}
