//! Fields and the Update Primitive
//!
//! A `Field<S, V>` names one field of a record type `S` that holds a `V`.
//! It is the path segment that child stores descend through, and the key
//! that `update` replaces.
//!
//! # Why a typed field
//!
//! A field can only be built against a concrete record type, so a key that
//! does not belong to the record is rejected by the compiler rather than at
//! run time. The `field!` macro builds one from a field name:
//!
//! ```rust
//! use canopy_core::{field, update};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Counter {
//!     value: i32,
//!     label: String,
//! }
//!
//! let value = field!(Counter, value: i32);
//! let before = Counter { value: 1, label: "clicks".into() };
//! let after = update(&before, &value, 2);
//!
//! assert_eq!(after.value, 2);
//! assert_eq!(before.value, 1);
//! ```
//!
//! # Structural sharing
//!
//! `update` is a shallow copy: it clones the outer record and overwrites one
//! field. Nested records that should be shared between successive states are
//! held behind `Arc`. For such records use the `Arc<Record>` form of the
//! macro, whose setter copies the record on write instead of editing a value
//! older states still point to.

use std::fmt;

/// A typed reference to one field of a record.
pub struct Field<S, V> {
    name: &'static str,
    get: fn(&S) -> &V,
    set: fn(&mut S, V),
}

impl<S, V> Field<S, V> {
    /// Create a field from its name, getter and setter.
    ///
    /// Prefer the `field!` macro, which derives all three from the field name.
    pub const fn new(name: &'static str, get: fn(&S) -> &V, set: fn(&mut S, V)) -> Self {
        Self { name, get, set }
    }

    /// The field's name, used in diagnostic labels.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Borrow the field's value out of a record.
    pub fn get<'a>(&self, record: &'a S) -> &'a V {
        (self.get)(record)
    }

    /// Return a copy of `record` with this field replaced by `value`.
    ///
    /// The input record is left untouched.
    pub fn replace(&self, record: &S, value: V) -> S
    where
        S: Clone,
    {
        let mut next = record.clone();
        (self.set)(&mut next, value);
        next
    }
}

impl<S, V> Clone for Field<S, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, V> Copy for Field<S, V> {}

impl<S, V> fmt::Debug for Field<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

/// Produce a shallow copy of `record` with `field` set to `value`.
pub fn update<S: Clone, V>(record: &S, field: &Field<S, V>, value: V) -> S {
    field.replace(record, value)
}

/// Build a `Field` from a record type and a field name.
///
/// - `field!(Record, name: Type)` for a field of a plain record.
/// - `field!(Arc<Record>, name: Type)` for a field of a record that is shared
///   behind an `Arc`. Writing through it copies the record first, leaving
///   every other holder of the `Arc` unchanged.
#[macro_export]
macro_rules! field {
    (Arc<$record:ty>, $name:ident : $value:ty) => {
        $crate::Field::<::std::sync::Arc<$record>, $value>::new(
            ::std::stringify!($name),
            |record| &record.$name,
            |record, value| ::std::sync::Arc::make_mut(record).$name = value,
        )
    };
    ($record:ty, $name:ident : $value:ty) => {
        $crate::Field::<$record, $value>::new(
            ::std::stringify!($name),
            |record| &record.$name,
            |record, value| record.$name = value,
        )
    };
}
