//! Record shapes: the field-descriptor table and the `record!` macro.
//!
//! A record declares its shape once: [`Record::fields`] returns a
//! descriptor per field (name, declared type tag, writer), cached per
//! record type so repeated executions reuse the same table. The
//! [`record!`](crate::record!) macro generates the whole impl from a plain
//! struct declaration.

use rowcast_types::{TypeTag, Value};

/// One field of a record shape.
///
/// `write` receives a value already coerced toward `ty` and stores it on
/// the record, leaving the field untouched when the value does not narrow
/// to the field's concrete type.
pub struct FieldDescriptor<R> {
    /// Field name as declared, matched against column labels after
    /// normalization.
    pub name: &'static str,
    /// Declared type tag, the coercion target for this field.
    pub ty: TypeTag,
    /// Store a coerced value on the record.
    pub write: fn(&mut R, Value),
}

impl<R> std::fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// A structured output shape with named, typed fields.
///
/// Fields start from `Default` and are written per matched column; a field
/// with no matching column keeps its default value.
pub trait Record: Default + 'static {
    /// The descriptor table for this shape, built once and cached.
    fn fields() -> &'static [FieldDescriptor<Self>];
}

/// Narrowing from a coerced [`Value`] into a concrete field type.
///
/// `from_value` returns `None` when the value does not fit; the writer then
/// leaves the field at its default. Numeric narrowing truncates.
pub trait FromValue: Sized {
    /// The coercion target tag for fields of this type.
    const TAG: TypeTag;

    /// Narrow a coerced value, or `None` when it does not fit.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! int_from_value {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const TAG: TypeTag = TypeTag::$tag;

                #[allow(clippy::cast_possible_truncation, clippy::unnecessary_cast)]
                fn from_value(value: Value) -> Option<Self> {
                    value.as_integer().map(|i| i as $ty)
                }
            }
        )*
    };
}

int_from_value! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
}

impl FromValue for f32 {
    const TAG: TypeTag = TypeTag::Float32;

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Option<Self> {
        value.as_float().map(|f| f as f32)
    }
}

impl FromValue for f64 {
    const TAG: TypeTag = TypeTag::Float64;

    fn from_value(value: Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for bool {
    const TAG: TypeTag = TypeTag::Bool;

    fn from_value(value: Value) -> Option<Self> {
        value.as_integer().map(|i| i != 0)
    }
}

impl FromValue for String {
    const TAG: TypeTag = TypeTag::Text;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    const TAG: TypeTag = TypeTag::Blob;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl FromValue for Value {
    const TAG: TypeTag = TypeTag::Any;

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const TAG: TypeTag = T::TAG;

    fn from_value(value: Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// Declare a record struct together with its [`Record`] impl.
///
/// ```
/// rowcast_core::record! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Person {
///         pub id: i64,
///         pub first_name: String,
///         pub age: i32,
///     }
/// }
/// ```
///
/// Every field type must implement [`FromValue`]. The descriptor table is
/// built on first use and cached for the lifetime of the program.
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field : $fty, )*
        }

        impl $crate::record::Record for $name {
            fn fields() -> &'static [$crate::record::FieldDescriptor<Self>] {
                static FIELDS: ::std::sync::OnceLock<
                    Vec<$crate::record::FieldDescriptor<$name>>,
                > = ::std::sync::OnceLock::new();
                FIELDS.get_or_init(|| {
                    vec![
                        $(
                            $crate::record::FieldDescriptor {
                                name: stringify!($field),
                                ty: <$fty as $crate::record::FromValue>::TAG,
                                write: |record, value| {
                                    if let Some(v) =
                                        <$fty as $crate::record::FromValue>::from_value(value)
                                    {
                                        record.$field = v;
                                    }
                                },
                            },
                        )*
                    ]
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        #[derive(Debug, Default, PartialEq)]
        struct Sample {
            id: i64,
            name: String,
            score: Option<f64>,
            active: bool,
        }
    }

    #[test]
    fn descriptor_table_shape() {
        let fields = Sample::fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].name, "id");
        assert_eq!(fields[0].ty, TypeTag::Int64);
        assert_eq!(fields[1].ty, TypeTag::Text);
        assert_eq!(fields[2].ty, TypeTag::Float64);
        assert_eq!(fields[3].ty, TypeTag::Bool);
    }

    #[test]
    fn descriptor_table_is_cached() {
        let a: *const _ = Sample::fields().as_ptr();
        let b: *const _ = Sample::fields().as_ptr();
        assert_eq!(a, b);
    }

    #[test]
    fn writers_narrow_and_skip() {
        let fields = Sample::fields();
        let mut sample = Sample::default();
        (fields[0].write)(&mut sample, Value::Integer(7));
        (fields[1].write)(&mut sample, Value::Text("ada".into()));
        (fields[2].write)(&mut sample, Value::Float(0.5));
        (fields[3].write)(&mut sample, Value::Integer(1));
        assert_eq!(sample.id, 7);
        assert_eq!(sample.name, "ada");
        assert_eq!(sample.score, Some(0.5));
        assert!(sample.active);

        // A value that does not narrow leaves the field untouched.
        (fields[0].write)(&mut sample, Value::Text("not a number".into()));
        assert_eq!(sample.id, 7);
    }

    #[test]
    fn narrowing_truncates() {
        assert_eq!(i8::from_value(Value::Integer(300)), Some(44));
        assert_eq!(i32::from_value(Value::Integer(5)), Some(5));
        assert_eq!(bool::from_value(Value::Integer(0)), Some(false));
        assert_eq!(String::from_value(Value::Integer(5)), None);
        assert_eq!(Option::<i64>::from_value(Value::Null), Some(None));
    }
}
