//! Scripted-object facade: load, attribute access, and calls.
//!
//! An [`Object`] wraps a shared runtime reference; clones share one
//! underlying reference. Every fallible operation drains the runtime's
//! error state into an [`EmbedError`], so a failed call never leaves a
//! stale state behind for the next one.

use tether_obj_model::TetherObject;
use tether_runtime as rt;

use crate::convert::{decode, FromRuntime, IntoRuntime};
use crate::error::EmbedError;
use crate::handle::{OwnedRef, SharedRef};

/// Handle to a runtime object: a loaded script module, an attribute, or a
/// call result. Equality is identity of the underlying handle, not value
/// equality.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object {
    handle: SharedRef,
}

impl Object {
    /// An empty object holding no runtime reference.
    pub fn new() -> Self {
        Object {
            handle: SharedRef::empty(),
        }
    }

    /// Wrap already-owned handle bits. The object takes over the caller's
    /// reference debt.
    pub fn from_raw(bits: u64) -> Self {
        Object {
            handle: SharedRef::from_owned(bits),
        }
    }

    /// Load the script at `path` and return its module object. Repeated
    /// loads of the same script return handles to the same module.
    pub fn from_script(path: &str) -> Result<Self, EmbedError> {
        let bits = rt::load_module(path);
        if TetherObject::from_bits(bits).is_error_marker() {
            return Err(EmbedError::load(path, rt::error_take()));
        }
        Ok(Object::from_raw(bits))
    }

    /// Borrow the underlying handle bits. Ownership stays with the object.
    pub fn bits(&self) -> u64 {
        self.handle.bits()
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    /// Look up attribute `name` as a new object.
    pub fn get_attr(&self, name: &str) -> Result<Object, EmbedError> {
        let bits = rt::get_attr(self.bits(), name);
        if TetherObject::from_bits(bits).is_error_marker() {
            return Err(EmbedError::attribute(name, rt::error_take()));
        }
        Ok(Object::from_raw(bits))
    }

    /// Attribute-presence probe. Never reports or leaves an error.
    pub fn has_attr(&self, name: &str) -> bool {
        rt::has_attr(self.bits(), name)
    }

    /// Resolve attribute `name` to a callable and invoke it with `args`
    /// packed into a positional tuple, left to right. Pass `()` for no
    /// arguments and `(x,)` for one. A missing attribute is an attribute
    /// error; only the call itself failing is an invocation error.
    pub fn call_function<A: CallArgs>(&self, name: &str, args: A) -> Result<Object, EmbedError> {
        let func = self.get_attr(name)?;
        let packed = args.pack();
        let result = rt::call_object(func.bits(), packed.bits());
        if TetherObject::from_bits(result).is_error_marker() {
            return Err(EmbedError::invocation(name, rt::error_take()));
        }
        Ok(Object::from_raw(result))
    }

    /// Decode this object's value into `out`. See [`decode`] for the
    /// partial-decode contract.
    pub fn convert<T: FromRuntime>(&self, out: &mut T) -> bool {
        decode(self.bits(), out)
    }
}

impl IntoRuntime for Object {
    fn encode_value(&self) -> OwnedRef {
        rt::inc_ref_bits(self.bits());
        OwnedRef::from_owned(self.bits())
    }
}

/// One positional argument of a call. Encodable values build a fresh
/// object; handle types pass their reference through instead.
pub trait CallArg {
    fn into_arg(self) -> OwnedRef;
}

/// Ownership transfer: the argument tuple takes over the handle's
/// reference, with no extra increment.
impl CallArg for OwnedRef {
    fn into_arg(self) -> OwnedRef {
        self
    }
}

impl CallArg for Object {
    fn into_arg(self) -> OwnedRef {
        self.encode_value()
    }
}

impl CallArg for &Object {
    fn into_arg(self) -> OwnedRef {
        self.encode_value()
    }
}

impl CallArg for &str {
    fn into_arg(self) -> OwnedRef {
        self.encode_value()
    }
}

macro_rules! call_arg_by_encode {
    ($($t:ty),+ $(,)?) => {$(
        impl CallArg for $t {
            fn into_arg(self) -> OwnedRef {
                self.encode_value()
            }
        }
    )+};
}

call_arg_by_encode!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String,
    crate::convert::ByteBuf,
);

impl<T: IntoRuntime> CallArg for Vec<T> {
    fn into_arg(self) -> OwnedRef {
        self.encode_value()
    }
}

impl<T: IntoRuntime> CallArg for &[T] {
    fn into_arg(self) -> OwnedRef {
        self.encode_value()
    }
}

impl<K: IntoRuntime, V: IntoRuntime> CallArg for std::collections::HashMap<K, V> {
    fn into_arg(self) -> OwnedRef {
        self.encode_value()
    }
}

/// A call's full positional argument pack: the unit type for zero
/// arguments, otherwise a tuple of [`CallArg`] values.
pub trait CallArgs {
    /// Pack the arguments into an owned argument tuple, in declaration
    /// order.
    fn pack(self) -> OwnedRef;
}

impl CallArgs for () {
    fn pack(self) -> OwnedRef {
        OwnedRef::from_owned(rt::tuple_new(0))
    }
}

macro_rules! call_args_impls {
    ($(($len:expr => $($t:ident . $idx:tt),+))+) => {$(
        impl<$($t: CallArg),+> CallArgs for ($($t,)+) {
            fn pack(self) -> OwnedRef {
                let tup = rt::tuple_new($len);
                $(
                    rt::tuple_set(tup, $idx, self.$idx.into_arg().into_bits());
                )+
                OwnedRef::from_owned(tup)
            }
        }
    )+};
}

call_args_impls! {
    (1 => A.0)
    (2 => A.0, B.1)
    (3 => A.0, B.1, C.2)
    (4 => A.0, B.1, C.2, D.3)
    (5 => A.0, B.1, C.2, D.3, E.4)
    (6 => A.0, B.1, C.2, D.3, E.4, F.5)
    (7 => A.0, B.1, C.2, D.3, E.4, F.5, G.6)
    (8 => A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7)
}
