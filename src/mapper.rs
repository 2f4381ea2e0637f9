//! Object mapper: converts native values to and from [`JsonValue`] trees.
//!
//! Export order for a value of type `T`:
//!   1. a custom exporter registered for `T` (object results are stamped
//!      with `@TypeHash`);
//!   2. otherwise `T`'s own [`Mappable::export_value`]: primitives normalize
//!      to the four scalar kinds, enumerations to their variant name,
//!      sequences to arrays, maps to objects, records field by field.
//!
//! Import order for a requested type `T`:
//!   1. an object carrying a `@TypeHash` with a registered importer is
//!      handed to that importer whole;
//!   2. otherwise `T`'s own [`Mappable::import_value`], which dispatches on
//!      the JSON variant (object → map or record, array → sequence,
//!      scalar → conversion table).
//!
//! Absent values and `Unknown` import as nothing.  Empty sequences and maps
//! export as nothing, while empty arrays and objects import as empty
//! collections.

use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::*;
use crate::convert::{self, unsupported};
use crate::decode;
use crate::encode;
use crate::errors::*;
use crate::registry::{type_hash, Registry};
use crate::value::{JsonKey, JsonValue};

// ── Configuration ────────────────────────────────────────────

/// What a record import does when an eligible field has no key in the
/// source object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// The whole record imports as nothing.
    #[default]
    Strict,
    /// The field keeps the value the new instance was built with.
    Lenient,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    pub missing_fields: MissingFieldPolicy,
}

// ── Traits ───────────────────────────────────────────────────

/// A native type the mapper can export and import.
///
/// Implemented here for primitives, text, `Option`, `Box`, sequences and
/// maps; [`record!`](crate::record!) and
/// [`enumeration!`](crate::enumeration!) implement it for user types.
/// Nested values must go back through the [`Mapper`] rather than calling
/// these methods directly, so that registered converters apply at every
/// level.
pub trait Mappable: Sized + 'static {
    /// Whether objects tagged with `@TypeHash` are routed to a registered
    /// importer when this type is requested.  Wrappers that defer to an
    /// inner type turn it off.
    const ROUTES_TYPE_HASH: bool = true;

    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError>;

    fn import_value(value: &JsonValue, mapper: &Mapper, force: bool)
        -> Result<Option<Self>, JsonError>;

    /// Result of importing an absent value.
    fn import_absent() -> Option<Self> {
        None
    }

    /// Canonical form of a map key when `Self` is the map's value type.
    /// Records with a `#[key]` field read the key as that field's type.
    fn key_field_value(key: &JsonValue, _mapper: &Mapper) -> Result<JsonValue, JsonError> {
        Ok(key.clone())
    }
}

/// A type usable as a native map key.  The key is kept typed inside the
/// exported object and only projected to text when written.
pub trait MapKey: Mappable + Eq {
    fn to_json_key(&self) -> JsonKey;
}

// ── Mapper ───────────────────────────────────────────────────

/// Owns the converter registry and mapping options.  Register converters
/// up front through `&mut`, then share the mapper for conversions.
#[derive(Default)]
pub struct Mapper {
    registry: Registry,
    options: MapperOptions,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MapperOptions) -> Self {
        Self {
            registry: Registry::new(),
            options,
        }
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn register_exporter<T, F>(&mut self, exporter: F) -> bool
    where
        T: 'static,
        F: Fn(&T) -> Result<Option<JsonValue>, JsonError> + Send + Sync + 'static,
    {
        self.registry.register_exporter(exporter)
    }

    pub fn unregister_exporter<T: 'static>(&mut self) -> bool {
        self.registry.unregister_exporter::<T>()
    }

    pub fn register_importer<T, F>(&mut self, importer: F) -> bool
    where
        T: 'static,
        F: Fn(&JsonValue) -> Result<Option<T>, JsonError> + Send + Sync + 'static,
    {
        self.registry.register_importer(importer)
    }

    pub fn unregister_importer<T: 'static>(&mut self) -> bool {
        self.registry.unregister_importer::<T>()
    }

    pub fn register_factory<T, F>(&mut self, factory: F) -> bool
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.registry.register_factory(factory)
    }

    pub fn unregister_factory<T: 'static>(&mut self) -> bool {
        self.registry.unregister_factory::<T>()
    }

    /// Export `value`.  `force` treats every record as serializable.
    pub fn to_json_data<T: Mappable>(
        &self,
        value: &T,
        force: bool,
    ) -> Result<Option<JsonValue>, JsonError> {
        if let Some(exporter) = self.registry.exporter_for::<T>() {
            let mut data = exporter(value as &dyn Any)?;
            if let Some(object @ JsonValue::Object(_)) = data.as_mut() {
                object.set_entry(TYPE_HASH_FIELD, JsonValue::Int(type_hash::<T>()))?;
            }
            return Ok(data);
        }
        value.export_value(self, force)
    }

    /// Import a `T` from `value`.
    pub fn to_object<T: Mappable>(
        &self,
        value: Option<&JsonValue>,
        force: bool,
    ) -> Result<Option<T>, JsonError> {
        let value = match value {
            Some(value) if !value.is_null() => value,
            _ => return Ok(T::import_absent()),
        };
        if T::ROUTES_TYPE_HASH {
            if let Some(imported) = self.import_tagged::<T>(value)? {
                return Ok(imported);
            }
        }
        T::import_value(value, self, force)
    }

    /// Export and serialize in one step.
    pub fn to_json<T: Mappable>(&self, value: &T, force: bool) -> Result<String, JsonError> {
        Ok(encode::encode_value(self.to_json_data(value, force)?.as_ref()))
    }

    /// Parse and import in one step.
    pub fn from_json<T: Mappable>(&self, text: &str, force: bool) -> Result<Option<T>, JsonError> {
        let data = decode::parse_str(text)?;
        self.to_object(data.as_ref(), force)
    }

    /// Route a `@TypeHash`-tagged object to its registered importer.
    /// `Ok(None)` means no importer applies.
    fn import_tagged<T: Mappable>(&self, value: &JsonValue) -> Result<Option<Option<T>>, JsonError> {
        let hash = match value.get(TYPE_HASH_FIELD) {
            Ok(Some(JsonValue::Int(hash))) => *hash,
            _ => return Ok(None),
        };
        let Some((produced, importer)) = self.registry.importer_for(hash) else {
            return Ok(None);
        };
        debug!(hash, produced, requested = type_name::<T>(), "custom importer");
        match importer(value)? {
            None => Ok(Some(None)),
            Some(boxed) => match boxed.downcast::<T>() {
                Ok(imported) => Ok(Some(Some(*imported))),
                Err(_) => Err(JsonError::type_mismatch(type_name::<T>(), produced)),
            },
        }
    }
}

// ── Scalars ──────────────────────────────────────────────────

impl Mappable for bool {
    fn export_value(&self, _: &Mapper, _: bool) -> Result<Option<JsonValue>, JsonError> {
        Ok(Some(JsonValue::Boolean(*self)))
    }

    fn import_value(value: &JsonValue, _: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
        convert::to_bool(value).map(Some)
    }
}

impl Mappable for String {
    fn export_value(&self, _: &Mapper, _: bool) -> Result<Option<JsonValue>, JsonError> {
        Ok(Some(JsonValue::String(self.clone())))
    }

    fn import_value(value: &JsonValue, _: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
        convert::to_text(value).map(Some)
    }
}

/// Characters travel as their code point.
impl Mappable for char {
    fn export_value(&self, _: &Mapper, _: bool) -> Result<Option<JsonValue>, JsonError> {
        Ok(Some(JsonValue::Int(*self as i32)))
    }

    fn import_value(value: &JsonValue, _: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
        convert::to_char(value).map(Some)
    }
}

// Integers no wider than 16 bits export as Int.
macro_rules! narrow_integer {
    ($($t:ty),*) => {$(
        impl Mappable for $t {
            fn export_value(&self, _: &Mapper, _: bool) -> Result<Option<JsonValue>, JsonError> {
                Ok(Some(JsonValue::Int(i32::from(*self))))
            }

            fn import_value(value: &JsonValue, _: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
                convert::to_integer(value).map(Some)
            }
        }
    )*};
}

// i32 stays Int; everything wider, or unsigned 32-bit, exports as Long.
macro_rules! wide_integer {
    ($($t:ty),*) => {$(
        impl Mappable for $t {
            fn export_value(&self, _: &Mapper, _: bool) -> Result<Option<JsonValue>, JsonError> {
                let long = i64::try_from(*self).map_err(|_| {
                    JsonError::new(ERR_OVERFLOW, format!("{} does not fit a long", self))
                })?;
                Ok(Some(JsonValue::Long(long)))
            }

            fn import_value(value: &JsonValue, _: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
                convert::to_integer(value).map(Some)
            }
        }
    )*};
}

narrow_integer!(i8, i16, i32, u8, u16);
wide_integer!(u32, i64, u64, isize, usize);

macro_rules! float {
    ($($t:ty),*) => {$(
        impl Mappable for $t {
            fn export_value(&self, _: &Mapper, _: bool) -> Result<Option<JsonValue>, JsonError> {
                Ok(Some(JsonValue::Double(f64::from(*self))))
            }

            fn import_value(value: &JsonValue, _: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
                convert::to_float(value).map(Some)
            }
        }
    )*};
}

float!(f32, f64);

macro_rules! signed_key {
    ($($t:ty),*) => {$(
        impl MapKey for $t {
            fn to_json_key(&self) -> JsonKey {
                // Lossless: no signed key type is wider than 64 bits.
                JsonKey::Int(*self as i64)
            }
        }
    )*};
}

macro_rules! unsigned_key {
    ($($t:ty),*) => {$(
        impl MapKey for $t {
            fn to_json_key(&self) -> JsonKey {
                JsonKey::UInt(*self as u64)
            }
        }
    )*};
}

signed_key!(i8, i16, i32, i64, isize);
unsigned_key!(u8, u16, u32, u64, usize);

impl MapKey for bool {
    fn to_json_key(&self) -> JsonKey {
        JsonKey::Bool(*self)
    }
}

impl MapKey for char {
    fn to_json_key(&self) -> JsonKey {
        JsonKey::Char(*self)
    }
}

impl MapKey for String {
    fn to_json_key(&self) -> JsonKey {
        JsonKey::Str(self.clone())
    }
}

// ── Dynamic values ───────────────────────────────────────────

/// Passthrough: the tree is copied as is, tags included.
impl Mappable for JsonValue {
    const ROUTES_TYPE_HASH: bool = false;

    fn export_value(&self, _: &Mapper, _: bool) -> Result<Option<JsonValue>, JsonError> {
        Ok(match self {
            JsonValue::Unknown => None,
            other => Some(other.clone()),
        })
    }

    fn import_value(value: &JsonValue, _: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
        Ok(Some(value.clone()))
    }
}

impl Mappable for JsonKey {
    fn export_value(&self, _: &Mapper, _: bool) -> Result<Option<JsonValue>, JsonError> {
        Ok(Some(self.to_value()))
    }

    fn import_value(value: &JsonValue, _: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
        match value {
            JsonValue::String(s) => Ok(Some(JsonKey::Str(s.clone()))),
            JsonValue::Int(i) => Ok(Some(JsonKey::Int(i64::from(*i)))),
            JsonValue::Long(l) => Ok(Some(JsonKey::Int(*l))),
            JsonValue::Boolean(b) => Ok(Some(JsonKey::Bool(*b))),
            other => Err(unsupported("key", other)),
        }
    }
}

impl MapKey for JsonKey {
    fn to_json_key(&self) -> JsonKey {
        self.clone()
    }
}

// ── Wrappers ─────────────────────────────────────────────────

/// `None` exports as absent; an absent value imports as `Some(None)`.
impl<T: Mappable> Mappable for Option<T> {
    const ROUTES_TYPE_HASH: bool = false;

    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError> {
        match self {
            Some(inner) => mapper.to_json_data(inner, force),
            None => Ok(None),
        }
    }

    fn import_value(value: &JsonValue, mapper: &Mapper, force: bool) -> Result<Option<Self>, JsonError> {
        Ok(Some(mapper.to_object::<T>(Some(value), force)?))
    }

    fn import_absent() -> Option<Self> {
        Some(None)
    }

    fn key_field_value(key: &JsonValue, mapper: &Mapper) -> Result<JsonValue, JsonError> {
        T::key_field_value(key, mapper)
    }
}

impl<T: Mappable> Mappable for Box<T> {
    const ROUTES_TYPE_HASH: bool = false;

    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError> {
        mapper.to_json_data(&**self, force)
    }

    fn import_value(value: &JsonValue, mapper: &Mapper, force: bool) -> Result<Option<Self>, JsonError> {
        Ok(mapper.to_object::<T>(Some(value), force)?.map(Box::new))
    }

    fn key_field_value(key: &JsonValue, mapper: &Mapper) -> Result<JsonValue, JsonError> {
        T::key_field_value(key, mapper)
    }
}

// ── Sequences ────────────────────────────────────────────────

fn export_sequence<'a, T: Mappable>(
    items: impl IntoIterator<Item = &'a T>,
    mapper: &Mapper,
    force: bool,
) -> Result<Option<JsonValue>, JsonError> {
    let mut data: Option<JsonValue> = None;
    for item in items {
        let exported = mapper.to_json_data(item, force)?;
        data.get_or_insert_with(JsonValue::array).push(exported)?;
    }
    Ok(data)
}

/// Elements that import as nothing are dropped; use `Option<T>` elements to
/// keep nulls in place.
fn import_sequence<T: Mappable>(
    value: &JsonValue,
    mapper: &Mapper,
    force: bool,
    target: &str,
) -> Result<Vec<T>, JsonError> {
    let JsonValue::Array(items) = value else {
        return Err(unsupported(target, value));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if let Some(imported) = mapper.to_object::<T>(item.as_ref(), force)? {
            out.push(imported);
        }
    }
    Ok(out)
}

impl<T: Mappable> Mappable for Vec<T> {
    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError> {
        export_sequence(self, mapper, force)
    }

    fn import_value(value: &JsonValue, mapper: &Mapper, force: bool) -> Result<Option<Self>, JsonError> {
        import_sequence(value, mapper, force, type_name::<Self>()).map(Some)
    }
}

impl<T: Mappable> Mappable for Box<[T]> {
    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError> {
        export_sequence(self.iter(), mapper, force)
    }

    fn import_value(value: &JsonValue, mapper: &Mapper, force: bool) -> Result<Option<Self>, JsonError> {
        import_sequence(value, mapper, force, type_name::<Self>()).map(|items| Some(items.into_boxed_slice()))
    }
}

/// Fixed-size arrays require exactly `N` importable elements.
impl<T: Mappable, const N: usize> Mappable for [T; N] {
    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError> {
        export_sequence(self.iter(), mapper, force)
    }

    fn import_value(value: &JsonValue, mapper: &Mapper, force: bool) -> Result<Option<Self>, JsonError> {
        let items: Vec<T> = import_sequence(value, mapper, force, type_name::<Self>())?;
        let len = items.len();
        <[T; N]>::try_from(items).map(Some).map_err(|_| {
            JsonError::new(
                ERR_FORMAT,
                format!("expected {} elements for {}, found {}", N, type_name::<Self>(), len),
            )
        })
    }
}

// ── Maps ─────────────────────────────────────────────────────

fn export_map<'a, K: MapKey, V: Mappable>(
    entries: impl IntoIterator<Item = (&'a K, &'a V)>,
    mapper: &Mapper,
    force: bool,
) -> Result<Option<JsonValue>, JsonError> {
    let mut data: Option<JsonValue> = None;
    for (key, value) in entries {
        let exported = mapper.to_json_data(value, force)?;
        data.get_or_insert_with(JsonValue::object)
            .insert(key.to_json_key(), exported)?;
    }
    Ok(data)
}

/// A native map that refuses to overwrite on import.
trait ImportMap<K, V>: Default {
    /// Insert unless `key` is already present.  Returns whether it was.
    fn insert_new(&mut self, key: K, value: V) -> bool;
}

impl<K: Eq + Hash, V> ImportMap<K, V> for HashMap<K, V> {
    fn insert_new(&mut self, key: K, value: V) -> bool {
        use std::collections::hash_map::Entry;
        match self.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }
}

impl<K: Ord, V> ImportMap<K, V> for BTreeMap<K, V> {
    fn insert_new(&mut self, key: K, value: V) -> bool {
        use std::collections::btree_map::Entry;
        match self.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }
}

impl<K: Eq + Hash, V> ImportMap<K, V> for IndexMap<K, V> {
    fn insert_new(&mut self, key: K, value: V) -> bool {
        use indexmap::map::Entry;
        match self.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }
}

/// Map entries in source order.  Keys go through the value type's key field
/// (if any) before conversion to `K`; the `@TypeHash` tag is skipped.
/// Contents are always imported forced.  Two source keys converting to the
/// same native key is `ERR_DUP_KEY`.
fn import_map<K: MapKey, V: Mappable, M: ImportMap<K, V>>(
    value: &JsonValue,
    mapper: &Mapper,
    target: &str,
) -> Result<M, JsonError> {
    let JsonValue::Object(map) = value else {
        return Err(unsupported(target, value));
    };
    let mut out = M::default();
    for (key, slot) in map {
        if key.as_str() == Some(TYPE_HASH_FIELD) {
            continue;
        }
        let key_value = V::key_field_value(&key.to_value(), mapper)?;
        let native_key = mapper.to_object::<K>(Some(&key_value), true)?.ok_or_else(|| {
            JsonError::new(
                ERR_FORMAT,
                format!("map key {:?} is not a {}", key.to_string(), type_name::<K>()),
            )
        })?;
        if let Some(imported) = mapper.to_object::<V>(slot.as_ref(), true)? {
            if !out.insert_new(native_key, imported) {
                return Err(JsonError::new(
                    ERR_DUP_KEY,
                    format!("map key {:?} repeats an earlier key of {}", key.to_string(), target),
                ));
            }
        }
    }
    Ok(out)
}

impl<K: MapKey + Hash, V: Mappable> Mappable for HashMap<K, V> {
    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError> {
        export_map(self, mapper, force)
    }

    fn import_value(value: &JsonValue, mapper: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
        import_map::<K, V, Self>(value, mapper, type_name::<Self>()).map(Some)
    }
}

impl<K: MapKey + Ord, V: Mappable> Mappable for BTreeMap<K, V> {
    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError> {
        export_map(self, mapper, force)
    }

    fn import_value(value: &JsonValue, mapper: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
        import_map::<K, V, Self>(value, mapper, type_name::<Self>()).map(Some)
    }
}

impl<K: MapKey + Hash, V: Mappable> Mappable for IndexMap<K, V> {
    fn export_value(&self, mapper: &Mapper, force: bool) -> Result<Option<JsonValue>, JsonError> {
        export_map(self, mapper, force)
    }

    fn import_value(value: &JsonValue, mapper: &Mapper, _: bool) -> Result<Option<Self>, JsonError> {
        import_map::<K, V, Self>(value, mapper, type_name::<Self>()).map(Some)
    }
}
