//! Bidirectional value conversion between native types and runtime handles.
//!
//! Decoding is partial: [`decode`] returns `false` on a shape or type
//! mismatch and leaves scalar outputs untouched. Container outputs keep
//! whatever elements decoded before the failure; callers that need
//! all-or-nothing decode into a scratch value first. Encoding is total:
//! [`encode`] always produces a fresh owned handle.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

use tether_obj_model::{TetherObject, INT_MAX, INT_MIN};
use tether_runtime as rt;

use crate::handle::OwnedRef;

/// Decode a runtime handle into `Self`, reporting success. Implementations
/// must leave `out` unmodified when they return `false`; container
/// implementations may have appended already-decoded elements.
pub trait FromRuntime: Sized {
    fn decode_from(bits: u64, out: &mut Self) -> bool;
}

/// Encode `self` as a fresh owned runtime object.
pub trait IntoRuntime {
    fn encode_value(&self) -> OwnedRef;
}

/// Decode borrowed handle bits into `out`. The handle keeps its reference.
pub fn decode<T: FromRuntime>(bits: u64, out: &mut T) -> bool {
    T::decode_from(bits, out)
}

/// Encode a native value into a new owned handle.
pub fn encode<T: IntoRuntime + ?Sized>(value: &T) -> OwnedRef {
    value.encode_value()
}

impl FromRuntime for bool {
    fn decode_from(bits: u64, out: &mut Self) -> bool {
        match TetherObject::from_bits(bits).as_bool() {
            Some(val) => {
                *out = val;
                true
            }
            None => false,
        }
    }
}

impl IntoRuntime for bool {
    fn encode_value(&self) -> OwnedRef {
        OwnedRef::from_owned(TetherObject::from_bool(*self).bits())
    }
}

// Integers decode from the int tag only; a float holding a whole number is
// still a mismatch. Out-of-range values for the target width are mismatches
// too, not truncations. Encoding asserts the immediate range: values
// outside [INT_MIN, INT_MAX] panic rather than wrap.
macro_rules! int_impls {
    ($($t:ty),+ $(,)?) => {$(
        impl FromRuntime for $t {
            fn decode_from(bits: u64, out: &mut Self) -> bool {
                let Some(val) = TetherObject::from_bits(bits).as_int() else {
                    return false;
                };
                match <$t>::try_from(val) {
                    Ok(val) => {
                        *out = val;
                        true
                    }
                    Err(_) => false,
                }
            }
        }

        impl IntoRuntime for $t {
            fn encode_value(&self) -> OwnedRef {
                match i64::try_from(*self) {
                    Ok(val) if (INT_MIN..=INT_MAX).contains(&val) => {
                        OwnedRef::from_owned(TetherObject::from_int(val).bits())
                    }
                    _ => panic!("integer exceeds the 47-bit immediate range"),
                }
            }
        }
    )+};
}

int_impls!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromRuntime for f64 {
    fn decode_from(bits: u64, out: &mut Self) -> bool {
        match TetherObject::from_bits(bits).as_float() {
            Some(val) => {
                *out = val;
                true
            }
            None => false,
        }
    }
}

impl IntoRuntime for f64 {
    fn encode_value(&self) -> OwnedRef {
        OwnedRef::from_owned(TetherObject::from_float(*self).bits())
    }
}

impl FromRuntime for f32 {
    fn decode_from(bits: u64, out: &mut Self) -> bool {
        match TetherObject::from_bits(bits).as_float() {
            Some(val) => {
                *out = val as f32;
                true
            }
            None => false,
        }
    }
}

impl IntoRuntime for f32 {
    fn encode_value(&self) -> OwnedRef {
        OwnedRef::from_owned(TetherObject::from_float(f64::from(*self)).bits())
    }
}

impl FromRuntime for String {
    fn decode_from(bits: u64, out: &mut Self) -> bool {
        match rt::string_obj_to_owned(bits) {
            Some(val) => {
                *out = val;
                true
            }
            None => false,
        }
    }
}

impl IntoRuntime for String {
    fn encode_value(&self) -> OwnedRef {
        OwnedRef::from_owned(rt::str_new(self))
    }
}

impl IntoRuntime for str {
    fn encode_value(&self) -> OwnedRef {
        OwnedRef::from_owned(rt::str_new(self))
    }
}

/// Byte buffer that converts to and from the runtime's bytes object.
///
/// A distinct type rather than `Vec<u8>`, so byte payloads and integer
/// lists stay separate conversions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteBuf(pub Vec<u8>);

impl ByteBuf {
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(bytes: Vec<u8>) -> Self {
        ByteBuf(bytes)
    }
}

impl Deref for ByteBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for ByteBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl FromRuntime for ByteBuf {
    fn decode_from(bits: u64, out: &mut Self) -> bool {
        match rt::bytes_obj_to_owned(bits) {
            Some(val) => {
                out.0 = val;
                true
            }
            None => false,
        }
    }
}

impl IntoRuntime for ByteBuf {
    fn encode_value(&self) -> OwnedRef {
        OwnedRef::from_owned(rt::bytes_new(&self.0))
    }
}

/// Encode only the first `len` bytes of `bytes` as a bytes object, clamped
/// to the slice length.
pub fn encode_bytes_prefix(bytes: &[u8], len: usize) -> OwnedRef {
    let len = len.min(bytes.len());
    OwnedRef::from_owned(rt::bytes_new(&bytes[..len]))
}

// Tuples decode positionally with an exact arity match, failing fast on the
// first mismatched element; earlier elements stay decoded in place.
macro_rules! tuple_impls {
    ($(($len:expr => $($t:ident . $idx:tt),+))+) => {$(
        impl<$($t: FromRuntime),+> FromRuntime for ($($t,)+) {
            fn decode_from(bits: u64, out: &mut Self) -> bool {
                if rt::tuple_len(bits) != Some($len) {
                    return false;
                }
                $(
                    match rt::tuple_get(bits, $idx) {
                        Some(slot) => {
                            if !$t::decode_from(slot, &mut out.$idx) {
                                return false;
                            }
                        }
                        None => return false,
                    }
                )+
                true
            }
        }

        impl<$($t: IntoRuntime),+> IntoRuntime for ($($t,)+) {
            fn encode_value(&self) -> OwnedRef {
                let tup = rt::tuple_new($len);
                $(
                    rt::tuple_set(tup, $idx, self.$idx.encode_value().into_bits());
                )+
                OwnedRef::from_owned(tup)
            }
        }
    )+};
}

tuple_impls! {
    (1 => A.0)
    (2 => A.0, B.1)
    (3 => A.0, B.1, C.2)
    (4 => A.0, B.1, C.2, D.3)
    (5 => A.0, B.1, C.2, D.3, E.4)
    (6 => A.0, B.1, C.2, D.3, E.4, F.5)
    (7 => A.0, B.1, C.2, D.3, E.4, F.5, G.6)
    (8 => A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7)
}

impl<T: FromRuntime + Default> FromRuntime for Vec<T> {
    fn decode_from(bits: u64, out: &mut Self) -> bool {
        let Some(len) = rt::list_len(bits) else {
            return false;
        };
        for idx in 0..len {
            let Some(elem) = rt::list_get(bits, idx) else {
                return false;
            };
            let mut item = T::default();
            if !T::decode_from(elem, &mut item) {
                return false;
            }
            out.push(item);
        }
        true
    }
}

impl<T: IntoRuntime> IntoRuntime for Vec<T> {
    fn encode_value(&self) -> OwnedRef {
        self.as_slice().encode_value()
    }
}

impl<T: IntoRuntime> IntoRuntime for [T] {
    fn encode_value(&self) -> OwnedRef {
        let list = rt::list_new(self.len());
        for item in self {
            rt::list_append(list, item.encode_value().into_bits());
        }
        OwnedRef::from_owned(list)
    }
}

impl<T: FromRuntime + Default> FromRuntime for VecDeque<T> {
    fn decode_from(bits: u64, out: &mut Self) -> bool {
        let Some(len) = rt::list_len(bits) else {
            return false;
        };
        for idx in 0..len {
            let Some(elem) = rt::list_get(bits, idx) else {
                return false;
            };
            let mut item = T::default();
            if !T::decode_from(elem, &mut item) {
                return false;
            }
            out.push_back(item);
        }
        true
    }
}

impl<T: IntoRuntime> IntoRuntime for VecDeque<T> {
    fn encode_value(&self) -> OwnedRef {
        let list = rt::list_new(self.len());
        for item in self {
            rt::list_append(list, item.encode_value().into_bits());
        }
        OwnedRef::from_owned(list)
    }
}

impl<K, V> FromRuntime for HashMap<K, V>
where
    K: FromRuntime + Default + Eq + Hash,
    V: FromRuntime + Default,
{
    fn decode_from(bits: u64, out: &mut Self) -> bool {
        let Some(len) = rt::dict_len(bits) else {
            return false;
        };
        for idx in 0..len {
            let Some((key_bits, val_bits)) = rt::dict_entry(bits, idx) else {
                return false;
            };
            let mut key = K::default();
            if !K::decode_from(key_bits, &mut key) {
                return false;
            }
            let mut val = V::default();
            if !V::decode_from(val_bits, &mut val) {
                return false;
            }
            out.insert(key, val);
        }
        true
    }
}

impl<K: IntoRuntime, V: IntoRuntime> IntoRuntime for HashMap<K, V> {
    fn encode_value(&self) -> OwnedRef {
        let dict = rt::dict_new();
        for (key, val) in self {
            rt::dict_insert(
                dict,
                key.encode_value().into_bits(),
                val.encode_value().into_bits(),
            );
        }
        OwnedRef::from_owned(dict)
    }
}
