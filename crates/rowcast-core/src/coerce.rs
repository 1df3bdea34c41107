//! Pluggable value coercion toward a field's declared type.
//!
//! A chain of [`PropertyHandler`]s is consulted in registration order and
//! the first handler whose `matches` returns true performs the conversion.
//! A handler that cannot actually convert must return the original value
//! unchanged rather than fail; coercion is best-effort and never aborts a
//! row. When no handler claims the value, the built-in default applies:
//! numeric widening/narrowing between the primitive kinds, string
//! representation for text targets, and NULL passing through untouched so
//! the target field keeps its default value.
//!
//! Precedence is strictly first-match-wins. Keep chains short and register
//! the most specific handlers first; a broad `matches` early in the chain
//! shadows everything behind it.

use std::sync::Arc;

use rowcast_error::{Result, RowcastError};
use rowcast_types::{TypeTag, Value};

/// One pluggable coercion step.
pub trait PropertyHandler: Send + Sync {
    /// Whether this handler wants to convert `value` toward `target`.
    fn matches(&self, target: TypeTag, value: &Value) -> bool;

    /// Convert `value` toward `target`. Must return the original value
    /// unchanged when conversion is not possible.
    fn apply(&self, target: TypeTag, value: Value) -> Value;
}

/// Ordered handler chain with the built-in default as final fallback.
#[derive(Clone)]
pub struct CoercionChain {
    handlers: Vec<Arc<dyn PropertyHandler>>,
    /// Collapse an array-typed value to its first element before coercing
    /// toward a concrete target. Legacy convenience; disable for strict
    /// behavior.
    collapse_lists: bool,
}

impl std::fmt::Debug for CoercionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoercionChain")
            .field("handlers", &self.handlers.len())
            .field("collapse_lists", &self.collapse_lists)
            .finish()
    }
}

impl Default for CoercionChain {
    fn default() -> Self {
        Self::new()
    }
}

impl CoercionChain {
    /// An empty chain (default coercion only) with list collapsing on.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            collapse_lists: true,
        }
    }

    /// Append a handler to the end of the chain.
    pub fn register(&mut self, handler: Arc<dyn PropertyHandler>) {
        self.handlers.push(handler);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn PropertyHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Toggle the array-to-scalar collapse quirk.
    #[must_use]
    pub fn collapse_lists(mut self, enabled: bool) -> Self {
        self.collapse_lists = enabled;
        self
    }

    /// Coerce `value` toward `target`, best effort.
    ///
    /// The returned value is either canonical for the target kind or the
    /// original value when nothing applied; the typed field writer decides
    /// what an unconverted leftover means (usually: keep the default).
    #[must_use]
    pub fn convert(&self, target: TypeTag, value: Value) -> Value {
        for handler in &self.handlers {
            if handler.matches(target, &value) {
                return handler.apply(target, value);
            }
        }
        self.default_convert(target, value)
    }

    /// Coerce with no fallback value available: failure to produce a value
    /// of the target kind is an error. Used for scalar/column extraction,
    /// where there is no record default to degrade to.
    pub fn convert_checked(&self, target: TypeTag, value: Value) -> Result<Value> {
        let value_type = value.type_name();
        let converted = self.convert(target, value);
        let ok = match target {
            TypeTag::Any => true,
            TypeTag::Text => matches!(converted, Value::Text(_)),
            TypeTag::Blob => matches!(converted, Value::Blob(_)),
            _ if target.is_integer() => matches!(converted, Value::Integer(_)),
            _ => matches!(converted, Value::Float(_)),
        };
        if ok || converted.is_null() {
            Ok(converted)
        } else {
            Err(RowcastError::Conversion {
                value_type,
                target: target.name(),
            })
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn default_convert(&self, target: TypeTag, value: Value) -> Value {
        let value = match value {
            Value::List(items) if self.collapse_lists && target != TypeTag::Any => {
                items.into_iter().next().unwrap_or(Value::Null)
            }
            other => other,
        };
        if value.is_null() || target == TypeTag::Any {
            return value;
        }
        match target {
            TypeTag::Text => Value::Text(value.to_text()),
            t if t.is_integer() => match value {
                Value::Integer(i) => Value::Integer(i),
                Value::Float(f) => Value::Integer(f as i64),
                other => other,
            },
            t if t.is_float() => match value {
                #[allow(clippy::cast_precision_loss)]
                Value::Integer(i) => Value::Float(i as f64),
                Value::Float(f) => Value::Float(f),
                other => other,
            },
            // Blob target: no conversion.
            _ => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn null_passes_through() {
        let chain = CoercionChain::new();
        assert!(chain.convert(TypeTag::Int64, Value::Null).is_null());
        assert!(chain.convert(TypeTag::Text, Value::Null).is_null());
    }

    #[test]
    fn numeric_widening_and_narrowing() {
        let chain = CoercionChain::new();
        assert_eq!(
            chain.convert(TypeTag::Float64, Value::Integer(3)),
            Value::Float(3.0)
        );
        assert_eq!(
            chain.convert(TypeTag::Int32, Value::Float(3.9)),
            Value::Integer(3)
        );
    }

    #[test]
    fn text_target_takes_string_representation() {
        let chain = CoercionChain::new();
        assert_eq!(
            chain.convert(TypeTag::Text, Value::Integer(42)),
            Value::Text("42".into())
        );
        assert_eq!(
            chain.convert(TypeTag::Text, Value::Float(1.0)),
            Value::Text("1.0".into())
        );
    }

    #[test]
    fn text_is_not_parsed_for_numeric_targets() {
        let chain = CoercionChain::new();
        // Best effort: the unconverted text survives, and the typed writer
        // will leave the field at its default.
        assert_eq!(
            chain.convert(TypeTag::Int64, Value::Text("17".into())),
            Value::Text("17".into())
        );
    }

    #[test]
    fn list_collapses_to_first_element() {
        let chain = CoercionChain::new();
        let list = Value::List(vec![Value::Integer(9), Value::Integer(8)]);
        assert_eq!(chain.convert(TypeTag::Int64, list), Value::Integer(9));
        assert!(chain
            .convert(TypeTag::Int64, Value::List(vec![]))
            .is_null());
    }

    #[test]
    fn list_collapse_can_be_disabled() {
        let chain = CoercionChain::new().collapse_lists(false);
        let list = Value::List(vec![Value::Integer(9)]);
        assert_eq!(chain.convert(TypeTag::Int64, list.clone()), list);
    }

    #[test]
    fn custom_handler_first_match_wins() {
        struct UppercaseText;
        impl PropertyHandler for UppercaseText {
            fn matches(&self, target: TypeTag, value: &Value) -> bool {
                target == TypeTag::Text && matches!(value, Value::Text(_))
            }
            fn apply(&self, _target: TypeTag, value: Value) -> Value {
                match value {
                    Value::Text(s) => Value::Text(s.to_uppercase()),
                    other => other,
                }
            }
        }
        struct NeverRuns;
        impl PropertyHandler for NeverRuns {
            fn matches(&self, target: TypeTag, value: &Value) -> bool {
                target == TypeTag::Text && matches!(value, Value::Text(_))
            }
            fn apply(&self, _target: TypeTag, _value: Value) -> Value {
                Value::Text("shadowed".into())
            }
        }
        let chain = CoercionChain::new()
            .with_handler(Arc::new(UppercaseText))
            .with_handler(Arc::new(NeverRuns));
        assert_eq!(
            chain.convert(TypeTag::Text, Value::Text("abc".into())),
            Value::Text("ABC".into())
        );
    }

    #[test]
    fn checked_conversion_rejects_leftovers() {
        let chain = CoercionChain::new();
        let err = chain
            .convert_checked(TypeTag::Int64, Value::Blob(vec![1, 2]))
            .unwrap_err();
        assert!(matches!(err, RowcastError::Conversion { .. }));
        assert_eq!(
            chain
                .convert_checked(TypeTag::Int64, Value::Integer(4))
                .unwrap(),
            Value::Integer(4)
        );
        // NULL is always acceptable; the caller maps it to "absent".
        assert!(chain
            .convert_checked(TypeTag::Int64, Value::Null)
            .unwrap()
            .is_null());
    }

    proptest! {
        /// Widening an integer to float and narrowing back is lossless for
        /// values exactly representable in an f64 mantissa.
        #[test]
        fn widen_narrow_round_trip(i in -(1_i64 << 52)..(1_i64 << 52)) {
            let chain = CoercionChain::new();
            let widened = chain.convert(TypeTag::Float64, Value::Integer(i));
            let narrowed = chain.convert(TypeTag::Int64, widened);
            prop_assert_eq!(narrowed, Value::Integer(i));
        }
    }
}
