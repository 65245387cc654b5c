//! Heap object layout and reference counting.
//!
//! Every heap object is a single allocation: a `TetherHeader` followed by a
//! type-specific payload. Handles point at the payload; the header sits at a
//! fixed negative offset, as in the runtime's compiled-code ABI. Containers
//! own references to their children and drop them in `tether_dec_ref`.

use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use tether_obj_model::TetherObject;

pub(crate) mod accessors;
pub(crate) mod builders;

use crate::{
    TYPE_ID_BYTES, TYPE_ID_DICT, TYPE_ID_FUNCTION, TYPE_ID_LIST, TYPE_ID_MODULE, TYPE_ID_STRING,
    TYPE_ID_TUPLE,
};
use accessors::{
    dict_entries_ptr, function_name_bits, list_vec_ptr, module_dict_bits, module_name_bits,
    object_type_id, tuple_slots,
};

#[repr(C)]
pub struct TetherHeader {
    pub type_id: u32,
    pub ref_count: AtomicU32,
    pub size: usize, // Total size of allocation, header included
}

pub(crate) fn obj_from_bits(bits: u64) -> TetherObject {
    TetherObject::from_bits(bits)
}

/// Increment the reference count behind `bits`. Immediates are untouched.
pub fn inc_ref_bits(bits: u64) {
    let obj = obj_from_bits(bits);
    if let Some(ptr) = obj.as_ptr() {
        unsafe { tether_inc_ref(ptr) };
    }
}

/// Decrement the reference count behind `bits`, freeing the object (and
/// dropping its children) when the count reaches zero.
pub fn dec_ref_bits(bits: u64) {
    let obj = obj_from_bits(bits);
    if let Some(ptr) = obj.as_ptr() {
        unsafe { tether_dec_ref(ptr) };
    }
}

/// Current reference count of the heap object behind `bits`, if it is one.
pub fn ref_count(bits: u64) -> Option<u32> {
    let ptr = obj_from_bits(bits).as_ptr()?;
    unsafe {
        let header = header_from_obj_ptr(ptr);
        Some((*header).ref_count.load(AtomicOrdering::Acquire))
    }
}

pub(crate) fn alloc_object(total_size: usize, type_id: u32) -> *mut u8 {
    let layout = std::alloc::Layout::from_size_align(total_size, 8).unwrap();
    unsafe {
        let ptr = std::alloc::alloc_zeroed(layout);
        if ptr.is_null() {
            return std::ptr::null_mut();
        }
        let header = ptr as *mut TetherHeader;
        (*header).type_id = type_id;
        (*header).ref_count.store(1, AtomicOrdering::Relaxed);
        (*header).size = total_size;
        ptr.add(std::mem::size_of::<TetherHeader>())
    }
}

pub(crate) unsafe fn header_from_obj_ptr(ptr: *mut u8) -> *mut TetherHeader {
    unsafe { ptr.sub(std::mem::size_of::<TetherHeader>()) as *mut TetherHeader }
}

/// # Safety
/// `ptr` must be a payload pointer produced by `alloc_object` that has not
/// been freed.
pub unsafe extern "C" fn tether_inc_ref(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let header = header_from_obj_ptr(ptr);
        (*header).ref_count.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

/// # Safety
/// `ptr` must be a payload pointer produced by `alloc_object` that has not
/// been freed. After the count reaches zero the pointer is dangling.
pub unsafe extern "C" fn tether_dec_ref(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let header_ptr = header_from_obj_ptr(ptr);
        let header = &mut *header_ptr;
        if header.ref_count.fetch_sub(1, AtomicOrdering::AcqRel) != 1 {
            return;
        }
        std::sync::atomic::fence(AtomicOrdering::Acquire);
        match header.type_id {
            TYPE_ID_STRING | TYPE_ID_BYTES => {}
            TYPE_ID_TUPLE => {
                for bits in tuple_slots(ptr) {
                    dec_ref_bits(*bits);
                }
            }
            TYPE_ID_LIST => {
                let vec_ptr = list_vec_ptr(ptr);
                if !vec_ptr.is_null() {
                    let vec = Box::from_raw(vec_ptr);
                    for bits in vec.iter() {
                        dec_ref_bits(*bits);
                    }
                }
            }
            TYPE_ID_DICT => {
                let entries_ptr = dict_entries_ptr(ptr);
                if !entries_ptr.is_null() {
                    let entries = Box::from_raw(entries_ptr);
                    for (key_bits, val_bits) in entries.iter() {
                        dec_ref_bits(*key_bits);
                        dec_ref_bits(*val_bits);
                    }
                }
            }
            TYPE_ID_MODULE => {
                let name_bits = module_name_bits(ptr);
                let dict_bits = module_dict_bits(ptr);
                dec_ref_bits(name_bits);
                dec_ref_bits(dict_bits);
            }
            TYPE_ID_FUNCTION => {
                let name_bits = function_name_bits(ptr);
                dec_ref_bits(name_bits);
            }
            _ => {}
        }
        let size = header.size;
        let layout = std::alloc::Layout::from_size_align(size, 8).unwrap();
        std::alloc::dealloc(header_ptr as *mut u8, layout);
    }
}

/// Type id of the heap object behind `bits`, if it is one.
pub fn heap_type_id(bits: u64) -> Option<u32> {
    let ptr = obj_from_bits(bits).as_ptr()?;
    unsafe { Some(object_type_id(ptr)) }
}

// Payload must stay 8-aligned behind the header.
const _: () = assert!(std::mem::size_of::<TetherHeader>() % 8 == 0);
