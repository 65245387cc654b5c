//! Object constructors and construction-time mutators.
//!
//! Every `*_new` returns owned bits: the caller holds the object's initial
//! reference. Slot writers (`tuple_set`, `list_append`, `dict_insert`,
//! `module_set_attr`) steal the references passed to them, matching the
//! calling convention of compiled code: the container becomes the owner and
//! the caller must not release the value again.

use tether_obj_model::TetherObject;

use super::accessors::{
    dict_entries_ptr, list_vec_ptr, obj_eq, object_type_id, tuple_len_raw, tuple_slot_ptr,
};
use super::{alloc_object, dec_ref_bits, obj_from_bits, TetherHeader};
use crate::{
    TYPE_ID_BYTES, TYPE_ID_DICT, TYPE_ID_FUNCTION, TYPE_ID_LIST, TYPE_ID_MODULE, TYPE_ID_STRING,
    TYPE_ID_TUPLE,
};

fn alloc_bytes_like(bytes: &[u8], type_id: u32) -> u64 {
    let total = std::mem::size_of::<TetherHeader>() + std::mem::size_of::<usize>() + bytes.len();
    let ptr = alloc_object(total, type_id);
    if ptr.is_null() {
        return TetherObject::none().bits();
    }
    unsafe {
        *(ptr as *mut usize) = bytes.len();
        let data_ptr = ptr.add(std::mem::size_of::<usize>());
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), data_ptr, bytes.len());
    }
    TetherObject::from_ptr(ptr).bits()
}

/// New string object. Owned by the caller.
pub fn str_new(s: &str) -> u64 {
    alloc_bytes_like(s.as_bytes(), TYPE_ID_STRING)
}

/// New bytes object. Owned by the caller.
pub fn bytes_new(bytes: &[u8]) -> u64 {
    alloc_bytes_like(bytes, TYPE_ID_BYTES)
}

/// New tuple of `len` slots, all initialized to none. Owned by the caller.
pub fn tuple_new(len: usize) -> u64 {
    let total = std::mem::size_of::<TetherHeader>()
        + std::mem::size_of::<usize>()
        + len * std::mem::size_of::<u64>();
    let ptr = alloc_object(total, TYPE_ID_TUPLE);
    if ptr.is_null() {
        return TetherObject::none().bits();
    }
    unsafe {
        *(ptr as *mut usize) = len;
        for idx in 0..len {
            *tuple_slot_ptr(ptr, idx) = TetherObject::none().bits();
        }
    }
    TetherObject::from_ptr(ptr).bits()
}

/// Write `val_bits` into slot `idx`, stealing the reference. The previous
/// slot value is released. Out-of-range writes release `val_bits` and are
/// otherwise ignored.
pub fn tuple_set(tuple_bits: u64, idx: usize, val_bits: u64) {
    let Some(ptr) = obj_from_bits(tuple_bits).as_ptr() else {
        dec_ref_bits(val_bits);
        return;
    };
    unsafe {
        if object_type_id(ptr) != TYPE_ID_TUPLE || idx >= tuple_len_raw(ptr) {
            dec_ref_bits(val_bits);
            return;
        }
        let slot = tuple_slot_ptr(ptr, idx);
        let prev = *slot;
        *slot = val_bits;
        dec_ref_bits(prev);
    }
}

/// New empty list with room for `capacity` elements. Owned by the caller.
pub fn list_new(capacity: usize) -> u64 {
    let total = std::mem::size_of::<TetherHeader>() + std::mem::size_of::<*mut Vec<u64>>();
    let ptr = alloc_object(total, TYPE_ID_LIST);
    if ptr.is_null() {
        return TetherObject::none().bits();
    }
    unsafe {
        let vec_ptr = Box::into_raw(Box::new(Vec::<u64>::with_capacity(capacity)));
        *(ptr as *mut *mut Vec<u64>) = vec_ptr;
    }
    TetherObject::from_ptr(ptr).bits()
}

/// Append `val_bits`, stealing the reference.
pub fn list_append(list_bits: u64, val_bits: u64) {
    let Some(ptr) = obj_from_bits(list_bits).as_ptr() else {
        dec_ref_bits(val_bits);
        return;
    };
    unsafe {
        if object_type_id(ptr) != TYPE_ID_LIST {
            dec_ref_bits(val_bits);
            return;
        }
        let vec_ptr = list_vec_ptr(ptr);
        if vec_ptr.is_null() {
            dec_ref_bits(val_bits);
            return;
        }
        (*vec_ptr).push(val_bits);
    }
}

/// New empty dict. Owned by the caller.
pub fn dict_new() -> u64 {
    let total = std::mem::size_of::<TetherHeader>() + std::mem::size_of::<*mut Vec<(u64, u64)>>();
    let ptr = alloc_object(total, TYPE_ID_DICT);
    if ptr.is_null() {
        return TetherObject::none().bits();
    }
    unsafe {
        let entries_ptr = Box::into_raw(Box::new(Vec::<(u64, u64)>::new()));
        *(ptr as *mut *mut Vec<(u64, u64)>) = entries_ptr;
    }
    TetherObject::from_ptr(ptr).bits()
}

/// Insert a key/value pair, stealing both references. Keys are unique under
/// value equality; inserting an existing key replaces its value (last write
/// wins) and releases the redundant key reference.
pub fn dict_insert(dict_bits: u64, key_bits: u64, val_bits: u64) {
    let Some(ptr) = obj_from_bits(dict_bits).as_ptr() else {
        dec_ref_bits(key_bits);
        dec_ref_bits(val_bits);
        return;
    };
    unsafe {
        if object_type_id(ptr) != TYPE_ID_DICT {
            dec_ref_bits(key_bits);
            dec_ref_bits(val_bits);
            return;
        }
        let entries_ptr = dict_entries_ptr(ptr);
        if entries_ptr.is_null() {
            dec_ref_bits(key_bits);
            dec_ref_bits(val_bits);
            return;
        }
        let entries = &mut *entries_ptr;
        for (existing_key, existing_val) in entries.iter_mut() {
            if obj_eq(*existing_key, key_bits) {
                let prev_val = *existing_val;
                *existing_val = val_bits;
                dec_ref_bits(prev_val);
                dec_ref_bits(key_bits);
                return;
            }
        }
        entries.push((key_bits, val_bits));
    }
}

/// New module object with an empty attribute dict. Owned by the caller.
pub fn module_new(name: &str) -> u64 {
    let name_bits = str_new(name);
    let dict_bits = dict_new();
    let total = std::mem::size_of::<TetherHeader>() + 2 * std::mem::size_of::<u64>();
    let ptr = alloc_object(total, TYPE_ID_MODULE);
    if ptr.is_null() {
        dec_ref_bits(name_bits);
        dec_ref_bits(dict_bits);
        return TetherObject::none().bits();
    }
    unsafe {
        *(ptr as *mut u64) = name_bits;
        *(ptr.add(std::mem::size_of::<u64>()) as *mut u64) = dict_bits;
    }
    TetherObject::from_ptr(ptr).bits()
}

/// Native callable signature: a positional-argument tuple in, an owned
/// result (or the error marker, with the error state set) out.
pub type NativeFn = extern "C" fn(args_bits: u64) -> u64;

/// New function object wrapping a native callable. Owned by the caller.
pub fn function_new(name: &str, func: NativeFn) -> u64 {
    let name_bits = str_new(name);
    let total = std::mem::size_of::<TetherHeader>() + 2 * std::mem::size_of::<u64>();
    let ptr = alloc_object(total, TYPE_ID_FUNCTION);
    if ptr.is_null() {
        dec_ref_bits(name_bits);
        return TetherObject::none().bits();
    }
    unsafe {
        *(ptr as *mut u64) = name_bits;
        *(ptr.add(std::mem::size_of::<u64>()) as *mut u64) = func as usize as u64;
    }
    TetherObject::from_ptr(ptr).bits()
}
