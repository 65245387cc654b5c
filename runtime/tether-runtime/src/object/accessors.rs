//! Borrowed views into heap object payloads.
//!
//! The `*_bits` / `*_ptr` functions are raw payload reads; the bits-based
//! functions re-check the type tag and return `None` on any shape mismatch,
//! so the conversion layer can probe without faulting. Getters that return
//! handle bits return borrowed references: the container keeps ownership.

use super::{header_from_obj_ptr, obj_from_bits};
use crate::{
    TYPE_ID_BYTES, TYPE_ID_DICT, TYPE_ID_FUNCTION, TYPE_ID_LIST, TYPE_ID_MODULE, TYPE_ID_STRING,
    TYPE_ID_TUPLE,
};

pub(crate) unsafe fn object_type_id(ptr: *mut u8) -> u32 {
    unsafe { (*header_from_obj_ptr(ptr)).type_id }
}

// String and bytes payloads share one layout: length then raw data.

pub(crate) unsafe fn string_len(ptr: *mut u8) -> usize {
    unsafe { *(ptr as *const usize) }
}

pub(crate) unsafe fn string_bytes(ptr: *mut u8) -> *const u8 {
    unsafe { ptr.add(std::mem::size_of::<usize>()) }
}

// Tuple payload: length then that many inline slots.

pub(crate) unsafe fn tuple_len_raw(ptr: *mut u8) -> usize {
    unsafe { *(ptr as *const usize) }
}

pub(crate) unsafe fn tuple_slot_ptr(ptr: *mut u8, idx: usize) -> *mut u64 {
    unsafe { (ptr.add(std::mem::size_of::<usize>()) as *mut u64).add(idx) }
}

pub(crate) unsafe fn tuple_slots(ptr: *mut u8) -> &'static [u64] {
    unsafe { std::slice::from_raw_parts(tuple_slot_ptr(ptr, 0), tuple_len_raw(ptr)) }
}

pub(crate) unsafe fn list_vec_ptr(ptr: *mut u8) -> *mut Vec<u64> {
    unsafe { *(ptr as *const *mut Vec<u64>) }
}

pub(crate) unsafe fn dict_entries_ptr(ptr: *mut u8) -> *mut Vec<(u64, u64)> {
    unsafe { *(ptr as *const *mut Vec<(u64, u64)>) }
}

pub(crate) unsafe fn module_name_bits(ptr: *mut u8) -> u64 {
    unsafe { *(ptr as *const u64) }
}

pub(crate) unsafe fn module_dict_bits(ptr: *mut u8) -> u64 {
    unsafe { *(ptr.add(std::mem::size_of::<u64>()) as *const u64) }
}

pub(crate) unsafe fn function_name_bits(ptr: *mut u8) -> u64 {
    unsafe { *(ptr as *const u64) }
}

pub(crate) unsafe fn function_addr(ptr: *mut u8) -> u64 {
    unsafe { *(ptr.add(std::mem::size_of::<u64>()) as *const u64) }
}

fn typed_ptr(bits: u64, type_id: u32) -> Option<*mut u8> {
    let ptr = obj_from_bits(bits).as_ptr()?;
    unsafe {
        if object_type_id(ptr) == type_id {
            Some(ptr)
        } else {
            None
        }
    }
}

pub fn is_str(bits: u64) -> bool {
    typed_ptr(bits, TYPE_ID_STRING).is_some()
}

pub fn is_bytes(bits: u64) -> bool {
    typed_ptr(bits, TYPE_ID_BYTES).is_some()
}

pub fn is_tuple(bits: u64) -> bool {
    typed_ptr(bits, TYPE_ID_TUPLE).is_some()
}

pub fn is_list(bits: u64) -> bool {
    typed_ptr(bits, TYPE_ID_LIST).is_some()
}

pub fn is_dict(bits: u64) -> bool {
    typed_ptr(bits, TYPE_ID_DICT).is_some()
}

pub fn is_module(bits: u64) -> bool {
    typed_ptr(bits, TYPE_ID_MODULE).is_some()
}

pub fn is_function(bits: u64) -> bool {
    typed_ptr(bits, TYPE_ID_FUNCTION).is_some()
}

/// Copy of the string payload, if `bits` is a string object.
pub fn string_obj_to_owned(bits: u64) -> Option<String> {
    let ptr = typed_ptr(bits, TYPE_ID_STRING)?;
    unsafe {
        let slice = std::slice::from_raw_parts(string_bytes(ptr), string_len(ptr));
        Some(String::from_utf8_lossy(slice).into_owned())
    }
}

/// Copy of the bytes payload, sized by the object's stored length.
pub fn bytes_obj_to_owned(bits: u64) -> Option<Vec<u8>> {
    let ptr = typed_ptr(bits, TYPE_ID_BYTES)?;
    unsafe {
        let slice = std::slice::from_raw_parts(string_bytes(ptr), string_len(ptr));
        Some(slice.to_vec())
    }
}

pub fn tuple_len(bits: u64) -> Option<usize> {
    let ptr = typed_ptr(bits, TYPE_ID_TUPLE)?;
    unsafe { Some(tuple_len_raw(ptr)) }
}

/// Borrowed element of a tuple. The tuple keeps its reference.
pub fn tuple_get(bits: u64, idx: usize) -> Option<u64> {
    let ptr = typed_ptr(bits, TYPE_ID_TUPLE)?;
    unsafe {
        if idx >= tuple_len_raw(ptr) {
            return None;
        }
        Some(*tuple_slot_ptr(ptr, idx))
    }
}

pub fn list_len(bits: u64) -> Option<usize> {
    let ptr = typed_ptr(bits, TYPE_ID_LIST)?;
    unsafe {
        let vec_ptr = list_vec_ptr(ptr);
        if vec_ptr.is_null() {
            return Some(0);
        }
        Some((*vec_ptr).len())
    }
}

/// Borrowed element of a list. The list keeps its reference.
pub fn list_get(bits: u64, idx: usize) -> Option<u64> {
    let ptr = typed_ptr(bits, TYPE_ID_LIST)?;
    unsafe {
        let vec_ptr = list_vec_ptr(ptr);
        if vec_ptr.is_null() {
            return None;
        }
        (&*vec_ptr).get(idx).copied()
    }
}

pub fn dict_len(bits: u64) -> Option<usize> {
    let ptr = typed_ptr(bits, TYPE_ID_DICT)?;
    unsafe {
        let entries_ptr = dict_entries_ptr(ptr);
        if entries_ptr.is_null() {
            return Some(0);
        }
        Some((*entries_ptr).len())
    }
}

/// Borrowed (key, value) pair at position `idx` in the dict's own entry
/// order. That order is an implementation detail, not a contract.
pub fn dict_entry(bits: u64, idx: usize) -> Option<(u64, u64)> {
    let ptr = typed_ptr(bits, TYPE_ID_DICT)?;
    unsafe {
        let entries_ptr = dict_entries_ptr(ptr);
        if entries_ptr.is_null() {
            return None;
        }
        (&*entries_ptr).get(idx).copied()
    }
}

/// Value equality across immediates and heap objects. Containers compare
/// recursively; dicts, modules, and functions compare by identity.
pub fn obj_eq(a_bits: u64, b_bits: u64) -> bool {
    if a_bits == b_bits {
        // Covers identical pointers, identical immediates, and none.
        // NaN floats share bits too, which is fine for key probing.
        return true;
    }
    let a = obj_from_bits(a_bits);
    let b = obj_from_bits(b_bits);
    if a.is_float() && b.is_float() {
        return a.as_float() == b.as_float();
    }
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_bool(), b.as_bool()) {
        return x == y;
    }
    let (Some(a_ptr), Some(b_ptr)) = (a.as_ptr(), b.as_ptr()) else {
        return false;
    };
    unsafe {
        let type_id = object_type_id(a_ptr);
        if object_type_id(b_ptr) != type_id {
            return false;
        }
        match type_id {
            TYPE_ID_STRING | TYPE_ID_BYTES => {
                let a_slice = std::slice::from_raw_parts(string_bytes(a_ptr), string_len(a_ptr));
                let b_slice = std::slice::from_raw_parts(string_bytes(b_ptr), string_len(b_ptr));
                a_slice == b_slice
            }
            TYPE_ID_TUPLE => {
                let a_slots = tuple_slots(a_ptr);
                let b_slots = tuple_slots(b_ptr);
                a_slots.len() == b_slots.len()
                    && a_slots
                        .iter()
                        .zip(b_slots)
                        .all(|(x, y)| obj_eq(*x, *y))
            }
            TYPE_ID_LIST => {
                let a_vec = list_vec_ptr(a_ptr);
                let b_vec = list_vec_ptr(b_ptr);
                if a_vec.is_null() || b_vec.is_null() {
                    return a_vec.is_null() && b_vec.is_null();
                }
                (*a_vec).len() == (*b_vec).len()
                    && (*a_vec)
                        .iter()
                        .zip((*b_vec).iter())
                        .all(|(x, y)| obj_eq(*x, *y))
            }
            _ => false,
        }
    }
}

/// Readable type name for error messages.
pub fn type_name(bits: u64) -> &'static str {
    let obj = obj_from_bits(bits);
    if obj.is_float() {
        return "float";
    }
    if obj.is_int() {
        return "int";
    }
    if obj.is_bool() {
        return "bool";
    }
    if obj.is_none() {
        return "none";
    }
    let Some(ptr) = obj.as_ptr() else {
        return "<invalid>";
    };
    unsafe {
        match object_type_id(ptr) {
            TYPE_ID_STRING => "str",
            TYPE_ID_BYTES => "bytes",
            TYPE_ID_TUPLE => "tuple",
            TYPE_ID_LIST => "list",
            TYPE_ID_DICT => "dict",
            TYPE_ID_MODULE => "module",
            TYPE_ID_FUNCTION => "function",
            _ => "<unknown>",
        }
    }
}
