//! Converter registry: custom exporters, importers and factories keyed by
//! native type identity.
//!
//! Exporters and importers are keyed by the type hash, the same `i32` that
//! is stamped into `@TypeHash` on export, so an importer can be found from a
//! JSON object alone.  Factories are keyed by `TypeId` since they are only
//! ever looked up from a statically known target type.
//!
//! Registration is first-wins: registering again for the same type is a
//! no-op until the first entry is unregistered.  A `Registry` is plain data
//! owned by a `Mapper`; mutation needs `&mut`, lookups are shared.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::*;
use crate::value::JsonValue;

pub(crate) type ExportFn =
    Box<dyn Fn(&dyn Any) -> Result<Option<JsonValue>, JsonError> + Send + Sync>;
pub(crate) type ImportFn =
    Box<dyn Fn(&JsonValue) -> Result<Option<Box<dyn Any>>, JsonError> + Send + Sync>;
type FactoryFn = Box<dyn Fn() -> Box<dyn Any> + Send + Sync>;

/// Type-identity hash: the first four bytes of SHA-256 over the type name,
/// read as a big-endian `i32`.  Stable for a given build of a program.
pub fn type_hash<T: ?Sized + 'static>() -> i32 {
    type_name_hash(type_name::<T>())
}

/// Hash of an arbitrary type name, as used by [`type_hash`].
pub fn type_name_hash(name: &str) -> i32 {
    let digest = Sha256::digest(name.as_bytes());
    i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

struct Registered<F> {
    type_name: &'static str,
    func: F,
}

#[derive(Default)]
pub struct Registry {
    exporters: HashMap<i32, Registered<ExportFn>>,
    importers: HashMap<i32, Registered<ImportFn>>,
    factories: HashMap<TypeId, Registered<FactoryFn>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Exporters ────────────────────────────────────────────

    /// Register a custom exporter for `T`.  Returns `false` (and changes
    /// nothing) if one is already registered under `T`'s hash.
    pub fn register_exporter<T, F>(&mut self, exporter: F) -> bool
    where
        T: Any,
        F: Fn(&T) -> Result<Option<JsonValue>, JsonError> + Send + Sync + 'static,
    {
        let name = type_name::<T>();
        let func: ExportFn = Box::new(move |obj: &dyn Any| match obj.downcast_ref::<T>() {
            Some(value) => exporter(value),
            None => Err(JsonError::type_mismatch(name, "a different exported type")),
        });
        insert_first(&mut self.exporters, type_hash::<T>(), name, func, "exporter")
    }

    pub fn unregister_exporter<T: Any>(&mut self) -> bool {
        remove_logged(&mut self.exporters, &type_hash::<T>(), type_name::<T>(), "exporter")
    }

    pub fn has_exporter<T: Any>(&self) -> bool {
        self.exporter_for::<T>().is_some()
    }

    pub(crate) fn exporter_for<T: Any>(&self) -> Option<&ExportFn> {
        self.exporters
            .get(&type_hash::<T>())
            .filter(|entry| entry.type_name == type_name::<T>())
            .map(|entry| &entry.func)
    }

    // ── Importers ────────────────────────────────────────────

    /// Register a custom importer producing `T`.  Objects carrying `T`'s
    /// hash in `@TypeHash` are handed to it whole.
    pub fn register_importer<T, F>(&mut self, importer: F) -> bool
    where
        T: Any,
        F: Fn(&JsonValue) -> Result<Option<T>, JsonError> + Send + Sync + 'static,
    {
        let func: ImportFn = Box::new(move |value: &JsonValue| {
            Ok(importer(value)?.map(|obj| Box::new(obj) as Box<dyn Any>))
        });
        insert_first(
            &mut self.importers,
            type_hash::<T>(),
            type_name::<T>(),
            func,
            "importer",
        )
    }

    pub fn unregister_importer<T: Any>(&mut self) -> bool {
        remove_logged(&mut self.importers, &type_hash::<T>(), type_name::<T>(), "importer")
    }

    pub fn has_importer<T: Any>(&self) -> bool {
        self.importers.contains_key(&type_hash::<T>())
    }

    /// Importer registered under a wire hash, with the name of the type it
    /// produces.
    pub(crate) fn importer_for(&self, hash: i32) -> Option<(&'static str, &ImportFn)> {
        self.importers
            .get(&hash)
            .map(|entry| (entry.type_name, &entry.func))
    }

    // ── Factories ────────────────────────────────────────────

    /// Register how to instantiate `T` before its fields are imported.
    pub fn register_factory<T, F>(&mut self, factory: F) -> bool
    where
        T: Any,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let func: FactoryFn = Box::new(move || Box::new(factory()) as Box<dyn Any>);
        insert_first(
            &mut self.factories,
            TypeId::of::<T>(),
            type_name::<T>(),
            func,
            "factory",
        )
    }

    pub fn unregister_factory<T: Any>(&mut self) -> bool {
        remove_logged(&mut self.factories, &TypeId::of::<T>(), type_name::<T>(), "factory")
    }

    pub fn has_factory<T: Any>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<T>())
    }

    /// Build a `T` with its registered factory, if any.
    pub(crate) fn instantiate<T: Any>(&self) -> Option<T> {
        let entry = self.factories.get(&TypeId::of::<T>())?;
        (entry.func)().downcast::<T>().ok().map(|boxed| *boxed)
    }
}

fn insert_first<K, F>(
    table: &mut HashMap<K, Registered<F>>,
    key: K,
    type_name: &'static str,
    func: F,
    what: &str,
) -> bool
where
    K: std::hash::Hash + Eq,
{
    if let Some(existing) = table.get(&key) {
        if existing.type_name == type_name {
            debug!(type_name, "{} already registered, keeping the first", what);
        } else {
            warn!(
                type_name,
                existing = existing.type_name,
                "{} type hash collision, registration ignored",
                what
            );
        }
        return false;
    }
    debug!(type_name, "registered {}", what);
    table.insert(key, Registered { type_name, func });
    true
}

fn remove_logged<K, F>(
    table: &mut HashMap<K, Registered<F>>,
    key: &K,
    type_name: &'static str,
    what: &str,
) -> bool
where
    K: std::hash::Hash + Eq,
{
    match table.get(key) {
        Some(entry) if entry.type_name == type_name => {
            table.remove(key);
            debug!(type_name, "unregistered {}", what);
            true
        }
        _ => false,
    }
}
