//! Tether runtime core.
//!
//! The process-wide, single-instance dynamic runtime the embedding kernel
//! calls into: reference-counted heap objects, a thread-local error state,
//! a native-module registry with a load-by-path front end, module attribute
//! lookup, and positional-tuple call dispatch.
//!
//! Failure convention: an operation that fails records an error state
//! (kind + message) and returns the error-marker handle. Callers check the
//! marker, then drain the state with [`error_take`]. Nothing here prints.
//!
//! Lifecycle: [`runtime_init`] before any object is created,
//! [`runtime_teardown`] after every handle has been released. Teardown with
//! handles still live is a usage error the runtime does not detect. None of
//! the operations lock around object access; callers that share handles
//! across threads serialize externally.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tether_obj_model::TetherObject;

mod object;

pub use object::accessors::{
    bytes_obj_to_owned, dict_entry, dict_len, is_bytes, is_dict, is_function, is_list, is_module,
    is_str, is_tuple, list_get, list_len, obj_eq, string_obj_to_owned, tuple_get, tuple_len,
    type_name,
};
pub use object::builders::{
    bytes_new, dict_insert, dict_new, function_new, list_append, list_new, module_new, str_new,
    tuple_new, tuple_set, NativeFn,
};
pub use object::{
    dec_ref_bits, heap_type_id, inc_ref_bits, ref_count, tether_dec_ref, tether_inc_ref,
    TetherHeader,
};

pub(crate) const TYPE_ID_STRING: u32 = 200;
pub(crate) const TYPE_ID_BYTES: u32 = 201;
pub(crate) const TYPE_ID_TUPLE: u32 = 202;
pub(crate) const TYPE_ID_LIST: u32 = 203;
pub(crate) const TYPE_ID_DICT: u32 = 204;
pub(crate) const TYPE_ID_MODULE: u32 = 205;
pub(crate) const TYPE_ID_FUNCTION: u32 = 206;

/// Pending error of the current thread: kind plus human-readable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorState {
    pub kind: String,
    pub message: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<ErrorState>> = const { RefCell::new(None) };
}

/// Record an error state, replacing any pending one.
pub fn error_set(kind: &str, message: &str) {
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = Some(ErrorState {
            kind: kind.to_string(),
            message: message.to_string(),
        });
    });
}

pub fn error_pending() -> bool {
    LAST_ERROR.with(|slot| slot.borrow().is_some())
}

/// Read and clear the pending error state in one step.
pub fn error_take() -> Option<ErrorState> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

pub fn error_clear() {
    LAST_ERROR.with(|slot| {
        slot.borrow_mut().take();
    });
}

/// Descriptive text of the pending error without clearing it.
pub fn error_report() -> Option<String> {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|err| format!("{}: {}", err.kind, err.message))
    })
}

macro_rules! fail {
    ($kind:expr, $message:expr $(,)?) => {{
        crate::error_set($kind, &$message);
        return TetherObject::error_marker().bits();
    }};
}

/// Builds a module object and returns owned bits. Registered per module
/// name; run at most once, on first load.
pub type ModuleInit = fn() -> u64;

static MODULE_REGISTRY: Lazy<Mutex<HashMap<String, ModuleInit>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static MODULE_CACHE: Lazy<Mutex<HashMap<String, u64>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Bring the runtime up. Cheap and idempotent; must precede any object
/// construction.
pub fn runtime_init() {
    Lazy::force(&MODULE_REGISTRY);
    Lazy::force(&MODULE_CACHE);
}

/// Tear the runtime down, releasing every cached module. All other handles
/// must already be released.
pub fn runtime_teardown() {
    let mut cache = MODULE_CACHE.lock().unwrap();
    for (_, bits) in cache.drain() {
        dec_ref_bits(bits);
    }
}

/// Register a native module under `name`. Loading `<dir>/<name>.<ext>`
/// resolves to it. Later registrations under the same name win.
pub fn register_module(name: &str, init: ModuleInit) {
    MODULE_REGISTRY
        .lock()
        .unwrap()
        .insert(name.to_string(), init);
}

/// Resolve a script path to its module object. The path's file stem is
/// looked up in the registry; the constructed module is cached so repeated
/// loads return the same object. Returns owned bits, or the error marker
/// with an ImportError state.
pub fn load_module(path: &str) -> u64 {
    let Some(stem) = Path::new(path).file_stem().and_then(|s| s.to_str()) else {
        fail!("ImportError", format!("invalid module path '{path}'"));
    };
    {
        let cache = MODULE_CACHE.lock().unwrap();
        if let Some(&bits) = cache.get(stem) {
            inc_ref_bits(bits);
            return bits;
        }
    }
    let Some(init) = MODULE_REGISTRY.lock().unwrap().get(stem).copied() else {
        fail!("ImportError", format!("no module named '{stem}'"));
    };
    let module_bits = init();
    if !is_module(module_bits) {
        dec_ref_bits(module_bits);
        fail!("ImportError", format!("module '{stem}' failed to initialize"));
    }
    let mut cache = MODULE_CACHE.lock().unwrap();
    let bits = *cache.entry(stem.to_string()).or_insert(module_bits);
    if bits != module_bits {
        // Another thread initialized first; drop ours.
        dec_ref_bits(module_bits);
    }
    inc_ref_bits(bits);
    bits
}

fn module_dict(module_bits: u64) -> Option<u64> {
    if !is_module(module_bits) {
        return None;
    }
    let ptr = TetherObject::from_bits(module_bits).as_ptr()?;
    unsafe { Some(object::accessors::module_dict_bits(ptr)) }
}

fn dict_get(dict_bits: u64, key_bits: u64) -> Option<u64> {
    let len = dict_len(dict_bits)?;
    for idx in 0..len {
        let (entry_key, entry_val) = dict_entry(dict_bits, idx)?;
        if obj_eq(entry_key, key_bits) {
            return Some(entry_val);
        }
    }
    None
}

/// Bind `val_bits` as attribute `name` of a module, stealing the value
/// reference.
pub fn module_set_attr(module_bits: u64, name: &str, val_bits: u64) {
    let Some(dict_bits) = module_dict(module_bits) else {
        dec_ref_bits(val_bits);
        return;
    };
    let key_bits = str_new(name);
    dict_insert(dict_bits, key_bits, val_bits);
}

/// Look up attribute `name`. Returns owned bits, or the error marker with
/// an AttributeError state when the attribute is absent or the target has
/// no attribute surface.
pub fn get_attr(target_bits: u64, name: &str) -> u64 {
    if let Some(dict_bits) = module_dict(target_bits) {
        let key_bits = str_new(name);
        let found = dict_get(dict_bits, key_bits);
        dec_ref_bits(key_bits);
        if let Some(val_bits) = found {
            inc_ref_bits(val_bits);
            return val_bits;
        }
        let module_name = TetherObject::from_bits(target_bits)
            .as_ptr()
            .and_then(|ptr| unsafe {
                string_obj_to_owned(object::accessors::module_name_bits(ptr))
            })
            .unwrap_or_default();
        fail!(
            "AttributeError",
            format!("module '{module_name}' has no attribute '{name}'"),
        );
    }
    fail!(
        "AttributeError",
        format!("{} object has no attribute '{name}'", type_name(target_bits)),
    );
}

/// Attribute-presence probe. Never touches the error state.
pub fn has_attr(target_bits: u64, name: &str) -> bool {
    let Some(dict_bits) = module_dict(target_bits) else {
        return false;
    };
    let key_bits = str_new(name);
    let found = dict_get(dict_bits, key_bits).is_some();
    dec_ref_bits(key_bits);
    found
}

/// Invoke a callable with a positional-argument tuple. Both arguments are
/// borrowed. Returns the callee's owned result, or the error marker: either
/// the callee's own failure (state already set by it) or a TypeError when
/// the target is not callable or the arguments are not a tuple.
pub fn call_object(callable_bits: u64, args_bits: u64) -> u64 {
    if !is_function(callable_bits) {
        fail!(
            "TypeError",
            format!("{} object is not callable", type_name(callable_bits)),
        );
    }
    if !is_tuple(args_bits) {
        fail!("TypeError", "argument pack must be a tuple");
    }
    let Some(ptr) = TetherObject::from_bits(callable_bits).as_ptr() else {
        fail!("TypeError", "callable handle is not an object");
    };
    let addr = unsafe { object::accessors::function_addr(ptr) };
    let func = unsafe { std::mem::transmute::<usize, NativeFn>(addr as usize) };
    func(args_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn double_first(args_bits: u64) -> u64 {
        let Some(val) = tuple_get(args_bits, 0).and_then(|b| TetherObject::from_bits(b).as_int())
        else {
            error_set("TypeError", "double_first expects an int");
            return TetherObject::error_marker().bits();
        };
        TetherObject::from_int(val * 2).bits()
    }

    fn demo_module() -> u64 {
        let module = module_new("demo_runtime");
        module_set_attr(module, "double_first", function_new("double_first", double_first));
        module
    }

    #[test]
    fn test_module_attr_roundtrip() {
        runtime_init();
        let module = demo_module();
        assert!(has_attr(module, "double_first"));
        assert!(!has_attr(module, "missing"));
        let func = get_attr(module, "double_first");
        assert!(is_function(func));
        dec_ref_bits(func);
        dec_ref_bits(module);
    }

    #[test]
    fn test_get_attr_missing_sets_state() {
        runtime_init();
        let module = demo_module();
        let res = get_attr(module, "missing");
        assert!(TetherObject::from_bits(res).is_error_marker());
        let err = error_take().expect("state recorded");
        assert_eq!(err.kind, "AttributeError");
        assert!(err.message.contains("missing"));
        dec_ref_bits(module);
    }

    #[test]
    fn test_call_dispatch() {
        runtime_init();
        let module = demo_module();
        let func = get_attr(module, "double_first");
        let args = tuple_new(1);
        tuple_set(args, 0, TetherObject::from_int(21).bits());
        let res = call_object(func, args);
        assert_eq!(TetherObject::from_bits(res).as_int(), Some(42));
        dec_ref_bits(args);
        dec_ref_bits(func);
        dec_ref_bits(module);
    }

    #[test]
    fn test_call_non_callable() {
        runtime_init();
        let target = str_new("not a function");
        let args = tuple_new(0);
        let res = call_object(target, args);
        assert!(TetherObject::from_bits(res).is_error_marker());
        assert_eq!(error_take().unwrap().kind, "TypeError");
        dec_ref_bits(args);
        dec_ref_bits(target);
    }

    #[test]
    fn test_load_module_registry() {
        runtime_init();
        register_module("demo_runtime_load", || {
            let module = module_new("demo_runtime_load");
            module_set_attr(
                module,
                "double_first",
                function_new("double_first", double_first),
            );
            module
        });
        let first = load_module("scripts/demo_runtime_load.py");
        assert!(is_module(first));
        let second = load_module("demo_runtime_load.py");
        assert_eq!(first, second);
        dec_ref_bits(first);
        dec_ref_bits(second);

        let missing = load_module("scripts/nope.py");
        assert!(TetherObject::from_bits(missing).is_error_marker());
        assert_eq!(error_take().unwrap().kind, "ImportError");
    }

    #[test]
    fn test_dict_last_write_wins() {
        runtime_init();
        let dict = dict_new();
        dict_insert(dict, str_new("k"), TetherObject::from_int(1).bits());
        dict_insert(dict, str_new("k"), TetherObject::from_int(2).bits());
        assert_eq!(dict_len(dict), Some(1));
        let (_, val) = dict_entry(dict, 0).unwrap();
        assert_eq!(TetherObject::from_bits(val).as_int(), Some(2));
        dec_ref_bits(dict);
    }

    #[test]
    fn test_tuple_slot_steals_reference() {
        runtime_init();
        let elem = str_new("stolen");
        inc_ref_bits(elem); // keep a probe reference
        let tup = tuple_new(1);
        tuple_set(tup, 0, elem);
        assert_eq!(ref_count(elem), Some(2));
        dec_ref_bits(tup);
        assert_eq!(ref_count(elem), Some(1));
        dec_ref_bits(elem);
    }
}
