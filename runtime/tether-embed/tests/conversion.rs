//! Round-trip and mismatch coverage for the conversion layer.

use std::collections::{HashMap, VecDeque};

use tether_embed::{decode, encode, encode_bytes_prefix, runtime_init, ByteBuf};
use tether_obj_model::TetherObject;
use tether_runtime as rt;

#[test]
fn test_scalar_round_trips() {
    runtime_init();
    let handle = encode(&true);
    let mut flag = false;
    assert!(decode(handle.bits(), &mut flag));
    assert!(flag);

    let handle = encode(&-123456789i64);
    let mut int_out = 0i64;
    assert!(decode(handle.bits(), &mut int_out));
    assert_eq!(int_out, -123456789);

    let handle = encode(&1.25f64);
    let mut float_out = 0.0f64;
    assert!(decode(handle.bits(), &mut float_out));
    assert_eq!(float_out, 1.25);

    let handle = encode("round trip");
    let mut text = String::new();
    assert!(decode(handle.bits(), &mut text));
    assert_eq!(text, "round trip");
}

#[test]
fn test_bytes_lengths() {
    runtime_init();
    for payload in [vec![], vec![0xABu8], vec![1, 2, 3, 4, 5, 6, 7]] {
        let handle = encode(&ByteBuf(payload.clone()));
        let mut out = ByteBuf::default();
        assert!(decode(handle.bits(), &mut out));
        assert_eq!(out.into_vec(), payload);
    }
}

#[test]
fn test_bytes_prefix_takes_leading_slice() {
    runtime_init();
    let handle = encode_bytes_prefix(&[9, 8, 7, 6], 2);
    let mut out = ByteBuf::default();
    assert!(decode(handle.bits(), &mut out));
    assert_eq!(&*out, &[9, 8]);
}

#[test]
fn test_empty_containers() {
    runtime_init();
    let handle = encode(&Vec::<i64>::new());
    let mut list_out: Vec<i64> = Vec::new();
    assert!(decode(handle.bits(), &mut list_out));
    assert!(list_out.is_empty());

    let handle = encode(&HashMap::<String, i64>::new());
    let mut map_out: HashMap<String, i64> = HashMap::new();
    assert!(decode(handle.bits(), &mut map_out));
    assert!(map_out.is_empty());
}

#[test]
fn test_nested_containers_round_trip() {
    runtime_init();
    let mut inner_a = HashMap::new();
    inner_a.insert("one".to_string(), 1i64);
    inner_a.insert("two".to_string(), 2i64);
    let mut inner_b = HashMap::new();
    inner_b.insert("ten".to_string(), 10i64);
    let value: Vec<(i64, HashMap<String, i64>)> = vec![(7, inner_a), (8, inner_b)];

    let handle = encode(&value);
    let mut out: Vec<(i64, HashMap<String, i64>)> = Vec::new();
    assert!(decode(handle.bits(), &mut out));
    assert_eq!(out, value);
}

#[test]
fn test_deque_round_trip() {
    runtime_init();
    let value: VecDeque<i64> = [3, 1, 4, 1, 5].into_iter().collect();
    let handle = encode(&value);
    let mut out: VecDeque<i64> = VecDeque::new();
    assert!(decode(handle.bits(), &mut out));
    assert_eq!(out, value);
}

#[test]
fn test_tuple_arity_must_match_exactly() {
    runtime_init();
    let handle = encode(&(1i64, 2i64, 3i64));
    let mut narrow = (0i64, 0i64);
    assert!(!decode(handle.bits(), &mut narrow));
    let mut wide = (0i64, 0i64, 0i64, 0i64);
    assert!(!decode(handle.bits(), &mut wide));
    let mut exact = (0i64, 0i64, 0i64);
    assert!(decode(handle.bits(), &mut exact));
    assert_eq!(exact, (1, 2, 3));
}

#[test]
fn test_tuple_decode_fails_fast_keeping_earlier_elements() {
    runtime_init();
    let handle = encode(&(11i64, "not an int".to_string(), 33i64));
    let mut out = (0i64, 0i64, 0i64);
    assert!(!decode(handle.bits(), &mut out));
    // First element decoded in place before the mismatch; the rest did not.
    assert_eq!(out, (11, 0, 0));
}

#[test]
fn test_list_decode_is_partial_on_element_mismatch() {
    runtime_init();
    let list = rt::list_new(3);
    rt::list_append(list, TetherObject::from_int(1).bits());
    rt::list_append(list, rt::str_new("x"));
    rt::list_append(list, TetherObject::from_int(3).bits());

    let mut out: Vec<i64> = Vec::new();
    assert!(!decode(list, &mut out));
    assert_eq!(out, vec![1]);
    rt::dec_ref_bits(list);
}

#[test]
fn test_container_type_mismatch() {
    runtime_init();
    let handle = encode(&vec![1i64, 2]);
    let mut map_out: HashMap<String, i64> = HashMap::new();
    assert!(!decode(handle.bits(), &mut map_out));
    assert!(map_out.is_empty());

    let mut tuple_out = (0i64, 0i64);
    assert!(!decode(handle.bits(), &mut tuple_out));
    assert_eq!(tuple_out, (0, 0));
}

#[test]
fn test_map_round_trip_ignores_entry_order() {
    runtime_init();
    // Unique keys, with a duplicated value among them.
    let mut value = HashMap::new();
    value.insert(1i64, "a".to_string());
    value.insert(2i64, "b".to_string());
    value.insert(3i64, "a".to_string());
    let handle = encode(&value);
    let mut out: HashMap<i64, String> = HashMap::new();
    assert!(decode(handle.bits(), &mut out));
    assert_eq!(out, value);
}
