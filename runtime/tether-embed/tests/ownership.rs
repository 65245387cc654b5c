//! Reference accounting across the ownership handles and the object facade.

use tether_embed::{encode, runtime_init, CallArg, IntoRuntime, Object, OwnedRef, SharedRef};
use tether_runtime as rt;

#[test]
fn test_shared_handles_cost_one_runtime_reference() {
    runtime_init();
    let bits = rt::str_new("shared payload");
    rt::inc_ref_bits(bits); // probe reference held by the test
    let shared = SharedRef::from_owned(bits);

    let clones: Vec<SharedRef> = (0..8).map(|_| shared.clone()).collect();
    assert_eq!(rt::ref_count(bits), Some(2));

    drop(clones);
    assert_eq!(rt::ref_count(bits), Some(2));
    drop(shared);
    assert_eq!(rt::ref_count(bits), Some(1));
    rt::dec_ref_bits(bits);
}

#[test]
fn test_object_clones_share_one_reference() {
    runtime_init();
    let bits = rt::str_new("object payload");
    rt::inc_ref_bits(bits);
    let object = Object::from_raw(bits);
    let twin = object.clone();
    assert_eq!(object, twin);
    assert_eq!(rt::ref_count(bits), Some(2));

    drop(object);
    assert_eq!(rt::ref_count(bits), Some(2));
    drop(twin);
    assert_eq!(rt::ref_count(bits), Some(1));
    rt::dec_ref_bits(bits);
}

#[test]
fn test_owned_release_and_transfer() {
    runtime_init();
    let bits = rt::str_new("exclusive");
    rt::inc_ref_bits(bits);
    let mut handle = OwnedRef::from_owned(bits);
    handle.release();
    handle.release();
    assert_eq!(rt::ref_count(bits), Some(1));

    rt::inc_ref_bits(bits);
    let handle = OwnedRef::from_owned(bits);
    let transferred = handle.into_bits();
    assert_eq!(rt::ref_count(bits), Some(2));
    rt::dec_ref_bits(transferred);
    rt::dec_ref_bits(bits);
}

#[test]
fn test_encoding_an_object_adds_a_reference() {
    runtime_init();
    let bits = rt::str_new("encoded object");
    rt::inc_ref_bits(bits);
    let object = Object::from_raw(bits);

    let encoded = object.encode_value();
    assert_eq!(rt::ref_count(bits), Some(3));
    drop(encoded);
    assert_eq!(rt::ref_count(bits), Some(2));

    drop(object);
    assert_eq!(rt::ref_count(bits), Some(1));
    rt::dec_ref_bits(bits);
}

#[test]
fn test_owned_argument_is_stolen_not_duplicated() {
    runtime_init();
    let handle = encode("argument payload");
    let bits = handle.bits();
    rt::inc_ref_bits(bits); // probe reference
    assert_eq!(rt::ref_count(bits), Some(2));

    let arg = handle.into_arg();
    assert_eq!(rt::ref_count(bits), Some(2));
    drop(arg);
    assert_eq!(rt::ref_count(bits), Some(1));
    rt::dec_ref_bits(bits);
}
