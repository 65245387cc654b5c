//! Ownership handles over runtime references.
//!
//! A runtime handle is just bits; these wrappers pin down who owes the
//! decrement. [`OwnedRef`] owes exactly one, [`SharedRef`] lets any number
//! of native clones share one. Neither is `Send`: handles stay on the
//! thread that serializes runtime access.

use std::rc::Rc;

use tether_obj_model::TetherObject;
use tether_runtime as rt;

/// Exclusive owner of one runtime reference. Dropping it (or calling
/// [`release`](OwnedRef::release)) performs the decrement; moving the bits
/// out with [`into_bits`](OwnedRef::into_bits) transfers the debt instead.
#[derive(Debug)]
pub struct OwnedRef {
    bits: u64,
}

impl OwnedRef {
    /// Take ownership of already-owned bits. No increment happens; the
    /// caller's reference debt moves into the handle.
    pub fn from_owned(bits: u64) -> Self {
        OwnedRef { bits }
    }

    /// A handle that owns nothing.
    pub fn empty() -> Self {
        OwnedRef {
            bits: TetherObject::none().bits(),
        }
    }

    /// Borrow the underlying bits. Ownership stays with the handle.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        TetherObject::from_bits(self.bits).is_none()
    }

    /// Decrement now and leave the handle empty. Safe to call repeatedly;
    /// only the first call performs the decrement.
    pub fn release(&mut self) {
        let bits = std::mem::replace(&mut self.bits, TetherObject::none().bits());
        rt::dec_ref_bits(bits);
    }

    /// Give up ownership without decrementing. The caller now owes the
    /// runtime one release for the returned bits.
    pub fn into_bits(mut self) -> u64 {
        std::mem::replace(&mut self.bits, TetherObject::none().bits())
    }
}

impl Drop for OwnedRef {
    fn drop(&mut self) {
        self.release();
    }
}

impl Default for OwnedRef {
    fn default() -> Self {
        OwnedRef::empty()
    }
}

/// Shared owner of one runtime reference. Clones count natively; the
/// runtime sees a single reference, decremented when the last clone drops.
#[derive(Clone, Debug, Default)]
pub struct SharedRef {
    inner: Option<Rc<OwnedRef>>,
}

impl SharedRef {
    pub fn empty() -> Self {
        SharedRef { inner: None }
    }

    /// Take ownership of already-owned bits, shared from here on.
    pub fn from_owned(bits: u64) -> Self {
        if TetherObject::from_bits(bits).is_none() {
            return SharedRef::empty();
        }
        SharedRef {
            inner: Some(Rc::new(OwnedRef::from_owned(bits))),
        }
    }

    pub fn bits(&self) -> u64 {
        match &self.inner {
            Some(owned) => owned.bits(),
            None => TetherObject::none().bits(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Number of native clones sharing the underlying reference.
    pub fn holders(&self) -> usize {
        self.inner.as_ref().map_or(0, Rc::strong_count)
    }
}

impl PartialEq for SharedRef {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_release_is_idempotent() {
        rt::runtime_init();
        let bits = rt::str_new("owned");
        rt::inc_ref_bits(bits); // probe reference
        let mut handle = OwnedRef::from_owned(bits);
        handle.release();
        assert!(handle.is_empty());
        assert_eq!(rt::ref_count(bits), Some(1));
        handle.release(); // no second decrement
        assert_eq!(rt::ref_count(bits), Some(1));
        rt::dec_ref_bits(bits);
    }

    #[test]
    fn test_into_bits_transfers_ownership() {
        rt::runtime_init();
        let bits = rt::str_new("transfer");
        let handle = OwnedRef::from_owned(bits);
        let out = handle.into_bits();
        assert_eq!(out, bits);
        assert_eq!(rt::ref_count(bits), Some(1));
        rt::dec_ref_bits(out);
    }

    #[test]
    fn test_shared_clones_count_natively() {
        rt::runtime_init();
        let bits = rt::str_new("shared");
        rt::inc_ref_bits(bits); // probe reference
        let shared = SharedRef::from_owned(bits);
        let clones: Vec<SharedRef> = (0..4).map(|_| shared.clone()).collect();
        assert_eq!(shared.holders(), 5);
        assert_eq!(rt::ref_count(bits), Some(2));
        drop(clones);
        assert_eq!(rt::ref_count(bits), Some(2));
        drop(shared);
        assert_eq!(rt::ref_count(bits), Some(1));
        rt::dec_ref_bits(bits);
    }
}
