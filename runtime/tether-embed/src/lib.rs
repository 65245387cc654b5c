//! Embedding kernel for the Tether runtime.
//!
//! Three layers over raw runtime handles:
//!
//! - [`handle`]: ownership wrappers ([`OwnedRef`], [`SharedRef`]) that pin
//!   down who performs each reference decrement.
//! - [`convert`]: bidirectional value conversion between native types and
//!   runtime objects ([`decode`] / [`encode`]).
//! - [`object`]: the scripted-object facade ([`Object`]) for loading
//!   scripts, reading attributes, and calling functions.
//!
//! Bring the runtime up with [`runtime_init`] before creating any handle,
//! and call [`runtime_teardown`] only after every handle has dropped.

pub mod convert;
pub mod error;
pub mod handle;
pub mod object;

pub use convert::{decode, encode, encode_bytes_prefix, ByteBuf, FromRuntime, IntoRuntime};
pub use error::EmbedError;
pub use handle::{OwnedRef, SharedRef};
pub use object::{CallArg, CallArgs, Object};
pub use tether_runtime::{register_module, runtime_init, runtime_teardown};
