//! Structured-type descriptors.
//!
//! Rust has no runtime field reflection, so a structured type describes
//! itself through [`Record`]: a type-level marker set and a static list of
//! [`Field`]s, each with its own markers.  The [`record!`](crate::record!)
//! macro generates the descriptor and the [`Mappable`] impl for an ordinary
//! struct:
//!
//! ```
//! use easymap::{record, Mapper};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Profile {
//!     name: String,
//!     height: f64,
//!     scratch: Vec<u8>,
//! }
//!
//! record!(#[serialize] Profile { name, height, #[exclude] scratch });
//!
//! let mapper = Mapper::new();
//! let profile = Profile { name: "p1".into(), height: 1.8, scratch: vec![1] };
//! let data = mapper.to_json_data(&profile, false).unwrap().unwrap();
//! assert!(data.contains_key("name"));
//! assert!(!data.contains_key("scratch"));
//! ```
//!
//! Markers:
//!   `#[serialize]` on the type makes every field eligible by default.
//!   `#[exclude]` on a field opts it out of a serializable type.
//!   `#[include]` on a field opts it in when the type is not serializable.
//!   `#[key]` marks the field whose type map keys are read as when this
//!   record is the value type of a map.
//!
//! Forcing (`force = true` on the mapper entry points) treats every record
//! as if it carried `#[serialize]`.

use std::any::type_name;

use tracing::debug;

use crate::constants::*;
use crate::convert::unsupported;
use crate::errors::*;
use crate::mapper::{Mappable, Mapper, MissingFieldPolicy};
use crate::registry::type_hash;
use crate::value::{JsonKey, JsonValue};

/// Type-level markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeMarkers {
    pub serializable: bool,
}

impl TypeMarkers {
    pub const fn new() -> Self {
        Self {
            serializable: false,
        }
    }

    pub const fn serialize(mut self) -> Self {
        self.serializable = true;
        self
    }
}

/// One field of a structured type and its markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub included: bool,
    pub excluded: bool,
    pub map_key: bool,
}

impl Field {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            included: false,
            excluded: false,
            map_key: false,
        }
    }

    pub const fn include(mut self) -> Self {
        self.included = true;
        self
    }

    pub const fn exclude(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub const fn key(mut self) -> Self {
        self.map_key = true;
        self
    }

    /// Whether the field is exported and imported for a type whose
    /// effective serializable flag is `serializable`.  Field markers win
    /// over the type default; container bookkeeping fields never qualify.
    pub fn is_eligible(&self, serializable: bool) -> bool {
        if INFRASTRUCTURE_FIELDS.contains(&self.name) {
            return false;
        }
        (serializable && !self.excluded) || (!serializable && self.included)
    }
}

/// Descriptor of a structured type.  Usually generated by
/// [`record!`](crate::record!).
pub trait Record: Default + Sized + 'static {
    const MARKERS: TypeMarkers;
    const FIELDS: &'static [Field];

    /// Export the field called `name`.
    fn export_field(
        &self,
        name: &str,
        mapper: &Mapper,
        force: bool,
    ) -> Result<Option<JsonValue>, JsonError>;

    /// Import `value` into the field called `name`.  A field whose value
    /// imports as nothing keeps its current contents.
    fn import_field(
        &mut self,
        name: &str,
        value: &JsonValue,
        mapper: &Mapper,
        force: bool,
    ) -> Result<(), JsonError>;

    fn eligible_fields(force: bool) -> impl Iterator<Item = &'static Field> {
        let serializable = force || Self::MARKERS.serializable;
        Self::FIELDS
            .iter()
            .filter(move |field| field.is_eligible(serializable))
    }

    /// Name of the field carrying `#[key]`, if any.
    fn key_field() -> Option<&'static str> {
        Self::FIELDS
            .iter()
            .find(|field| field.map_key)
            .map(|field| field.name)
    }
}

/// Export every eligible field into an object stamped with `@TypeHash`.
/// A record with no eligible fields exports as absent.
pub fn export_record<R: Record>(
    record: &R,
    mapper: &Mapper,
    force: bool,
) -> Result<Option<JsonValue>, JsonError> {
    let mut data: Option<JsonValue> = None;
    for field in R::eligible_fields(force) {
        let value = record.export_field(field.name, mapper, force)?;
        data.get_or_insert_with(JsonValue::object)
            .insert(field.name, value)?;
    }
    if let Some(object) = data.as_mut() {
        object.set_entry(TYPE_HASH_FIELD, JsonValue::Int(type_hash::<R>()))?;
    }
    Ok(data)
}

/// Build a record from an object: instantiate through the registered
/// factory (or `Default`) and import each eligible field present in the
/// source.  A field whose key is absent follows the mapper's
/// [`MissingFieldPolicy`]; an explicit `null` leaves the field untouched.
pub fn import_record<R: Record>(
    value: &JsonValue,
    mapper: &Mapper,
    force: bool,
) -> Result<Option<R>, JsonError> {
    let JsonValue::Object(map) = value else {
        return Err(unsupported(type_name::<R>(), value));
    };

    let mut record = mapper.registry().instantiate::<R>().unwrap_or_default();
    for field in R::eligible_fields(force) {
        match map.get(&JsonKey::from(field.name)) {
            Some(Some(field_value)) => record.import_field(field.name, field_value, mapper, force)?,
            Some(None) => {}
            None => match mapper.options().missing_fields {
                MissingFieldPolicy::Strict => {
                    debug!(
                        record = type_name::<R>(),
                        field = field.name,
                        "field missing, record not imported"
                    );
                    return Ok(None);
                }
                MissingFieldPolicy::Lenient => {
                    debug!(
                        record = type_name::<R>(),
                        field = field.name,
                        "field missing, keeping default"
                    );
                }
            },
        }
    }
    Ok(Some(record))
}

/// Read a map key as the type of a record's `#[key]` field and hand back
/// its canonical JSON form.  `field` only pins the field type.
pub fn key_through<R, F, A>(_field: A, key: &JsonValue, mapper: &Mapper) -> Result<JsonValue, JsonError>
where
    F: Mappable,
    A: Fn(&R) -> &F,
{
    let parsed = mapper
        .to_object::<F>(Some(key), true)?
        .ok_or_else(|| JsonError::new(ERR_FORMAT, format!("map key {} is not a {}", key, type_name::<F>())))?;
    Ok(mapper.to_json_data(&parsed, true)?.unwrap_or_else(|| key.clone()))
}

/// Variant name carried by an enumeration value.
#[doc(hidden)]
pub fn variant_name<'a>(value: &'a JsonValue, enumeration: &str) -> Result<&'a str, JsonError> {
    match value {
        JsonValue::String(name) => Ok(name),
        other => Err(unsupported(enumeration, other)),
    }
}

#[doc(hidden)]
pub fn unknown_variant(name: &str, enumeration: &str) -> JsonError {
    JsonError::new(
        ERR_FORMAT,
        format!("{:?} is not a variant of {}", name, enumeration),
    )
}

/// Implement [`Record`] and [`Mappable`] for a struct with `Default`.
///
/// ```text
/// record!( [#[serialize]] Type { [#[include|exclude|key]] field, ... } );
/// ```
///
/// Every listed field's type must itself be [`Mappable`].  Fields left out
/// of the list are invisible to the mapper.
#[macro_export]
macro_rules! record {
    (
        $(#[$marker:ident])*
        $ty:ty {
            $( $(#[$field_marker:ident])* $field:ident ),* $(,)?
        }
    ) => {
        impl $crate::record::Record for $ty {
            const MARKERS: $crate::record::TypeMarkers =
                $crate::record::TypeMarkers::new() $( .$marker() )*;
            const FIELDS: &'static [$crate::record::Field] = &[
                $( $crate::record::Field::new(stringify!($field)) $( .$field_marker() )* ),*
            ];

            #[allow(unused_variables)]
            fn export_field(
                &self,
                name: &str,
                mapper: &$crate::Mapper,
                force: bool,
            ) -> ::std::result::Result<Option<$crate::JsonValue>, $crate::JsonError> {
                match name {
                    $( stringify!($field) => mapper.to_json_data(&self.$field, force), )*
                    _ => Ok(None),
                }
            }

            #[allow(unused_variables)]
            fn import_field(
                &mut self,
                name: &str,
                value: &$crate::JsonValue,
                mapper: &$crate::Mapper,
                force: bool,
            ) -> ::std::result::Result<(), $crate::JsonError> {
                match name {
                    $(
                        stringify!($field) => {
                            if let Some(imported) = mapper.to_object(Some(value), force)? {
                                self.$field = imported;
                            }
                            Ok(())
                        }
                    )*
                    _ => Ok(()),
                }
            }
        }

        impl $crate::Mappable for $ty {
            fn export_value(
                &self,
                mapper: &$crate::Mapper,
                force: bool,
            ) -> ::std::result::Result<Option<$crate::JsonValue>, $crate::JsonError> {
                $crate::record::export_record(self, mapper, force)
            }

            fn import_value(
                value: &$crate::JsonValue,
                mapper: &$crate::Mapper,
                force: bool,
            ) -> ::std::result::Result<Option<Self>, $crate::JsonError> {
                $crate::record::import_record(value, mapper, force)
            }

            fn key_field_value(
                key: &$crate::JsonValue,
                mapper: &$crate::Mapper,
            ) -> ::std::result::Result<$crate::JsonValue, $crate::JsonError> {
                match <Self as $crate::record::Record>::key_field() {
                    $(
                        Some(stringify!($field)) => {
                            $crate::record::key_through(|record: &Self| &record.$field, key, mapper)
                        }
                    )*
                    _ => Ok(key.clone()),
                }
            }
        }
    };
}

/// Implement [`Mappable`] and [`MapKey`](crate::MapKey) for a fieldless
/// enum.  Variants travel as their names.
#[macro_export]
macro_rules! enumeration {
    ( $ty:ty { $( $variant:ident ),* $(,)? } ) => {
        impl $ty {
            #[doc(hidden)]
            fn variant_text(&self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($variant), )*
                }
            }
        }

        impl $crate::Mappable for $ty {
            fn export_value(
                &self,
                _mapper: &$crate::Mapper,
                _force: bool,
            ) -> ::std::result::Result<Option<$crate::JsonValue>, $crate::JsonError> {
                Ok(Some($crate::JsonValue::from(self.variant_text())))
            }

            fn import_value(
                value: &$crate::JsonValue,
                _mapper: &$crate::Mapper,
                _force: bool,
            ) -> ::std::result::Result<Option<Self>, $crate::JsonError> {
                let enumeration = ::std::any::type_name::<Self>();
                match $crate::record::variant_name(value, enumeration)? {
                    $( stringify!($variant) => Ok(Some(Self::$variant)), )*
                    other => Err($crate::record::unknown_variant(other, enumeration)),
                }
            }
        }

        impl $crate::MapKey for $ty {
            fn to_json_key(&self) -> $crate::JsonKey {
                $crate::JsonKey::from(self.variant_text())
            }
        }
    };
}
