use crate::error::NodeError;
use serde_yaml::{Mapping, Sequence, Value};

/// The shapes a decoded YAML value can take, as far as property validation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
    Sequence,
    Mapping,
    Null,
}

impl ValueType {
    pub fn of(value: &Value) -> ValueType {
        match value {
            Value::String(_) => ValueType::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
            Value::Number(_) => ValueType::Number,
            Value::Bool(_) => ValueType::Boolean,
            Value::Sequence(_) => ValueType::Sequence,
            Value::Mapping(_) => ValueType::Mapping,
            Value::Null => ValueType::Null,
            Value::Tagged(tagged) => ValueType::of(&tagged.value),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "a string",
            ValueType::Integer => "an integer",
            ValueType::Number => "a number",
            ValueType::Boolean => "a boolean",
            ValueType::Sequence => "an array",
            ValueType::Mapping => "a mapping",
            ValueType::Null => "null",
        }
    }

    /// Integers are numbers too.
    fn accepts(self, actual: ValueType) -> bool {
        self == actual || (self == ValueType::Number && actual == ValueType::Integer)
    }
}

fn expected(allowed: &[ValueType]) -> String {
    allowed
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(" or ")
}

fn invalid(property: &str, reason: String) -> NodeError {
    NodeError::InvalidProperty {
        property: property.to_string(),
        reason,
    }
}

/// Checks that `value` is one of the `allowed` types.
pub fn validate_type(property: &str, value: &Value, allowed: &[ValueType]) -> Result<(), NodeError> {
    let actual = ValueType::of(value);
    if allowed.iter().any(|t| t.accepts(actual)) {
        Ok(())
    } else {
        Err(invalid(
            property,
            format!("expected {}, found {}", expected(allowed), actual.name()),
        ))
    }
}

pub fn validate_string<'a>(property: &str, value: &'a Value) -> Result<&'a str, NodeError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(invalid(
            property,
            format!("expected a string, found {}", ValueType::of(other).name()),
        )),
    }
}

pub fn validate_non_empty_string<'a>(
    property: &str,
    value: &'a Value,
) -> Result<&'a str, NodeError> {
    let s = validate_string(property, value)?;
    if s.trim().is_empty() {
        return Err(invalid(property, "must not be empty".to_string()));
    }
    Ok(s)
}

/// Checks that `value` is an array, optionally with every element of one of `element_types`.
pub fn validate_array<'a>(
    property: &str,
    value: &'a Value,
    element_types: Option<&[ValueType]>,
) -> Result<&'a Sequence, NodeError> {
    let Value::Sequence(items) = value else {
        return Err(invalid(
            property,
            format!("expected an array, found {}", ValueType::of(value).name()),
        ));
    };
    if let Some(allowed) = element_types {
        for item in items {
            let actual = ValueType::of(item);
            if !allowed.iter().any(|t| t.accepts(actual)) {
                return Err(invalid(
                    property,
                    format!(
                        "array elements must be {}, found {}",
                        expected(allowed),
                        actual.name()
                    ),
                ));
            }
        }
    }
    Ok(items)
}

/// Checks that `value` is a mapping, optionally constraining its key and value types.
pub fn validate_mapping<'a>(
    property: &str,
    value: &'a Value,
    key_types: Option<&[ValueType]>,
    value_types: Option<&[ValueType]>,
) -> Result<&'a Mapping, NodeError> {
    let Value::Mapping(map) = value else {
        return Err(invalid(
            property,
            format!("expected a mapping, found {}", ValueType::of(value).name()),
        ));
    };
    for (k, v) in map {
        if let Some(allowed) = key_types {
            let actual = ValueType::of(k);
            if !allowed.iter().any(|t| t.accepts(actual)) {
                return Err(invalid(
                    property,
                    format!("keys must be {}, found {}", expected(allowed), actual.name()),
                ));
            }
        }
        if let Some(allowed) = value_types {
            let actual = ValueType::of(v);
            if !allowed.iter().any(|t| t.accepts(actual)) {
                return Err(invalid(
                    property,
                    format!("values must be {}, found {}", expected(allowed), actual.name()),
                ));
            }
        }
    }
    Ok(map)
}

/// Renders a scalar as the string a template parameter is bound to.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

/// Returns the entries of a mapping with string keys, failing on any other key type.
pub fn string_entries<'a>(
    property: &str,
    value: &'a Value,
) -> Result<Vec<(&'a str, &'a Value)>, NodeError> {
    let map = validate_mapping(property, value, Some(&[ValueType::String]), None)?;
    Ok(map
        .iter()
        .filter_map(|(k, v)| k.as_str().map(|k| (k, v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_integers_are_numbers() {
        assert!(validate_type("minimum", &yaml("3"), &[ValueType::Number]).is_ok());
        assert!(validate_type("minimum", &yaml("3.5"), &[ValueType::Integer]).is_err());
    }

    #[test]
    fn test_non_empty_string() {
        assert!(validate_non_empty_string("title", &yaml("\"  \"")).is_err());
        assert_eq!(validate_non_empty_string("title", &yaml("API")).unwrap(), "API");
        let err = validate_non_empty_string("title", &yaml("12")).unwrap_err();
        assert!(matches!(err, NodeError::InvalidProperty { property, .. } if property == "title"));
    }

    #[test]
    fn test_homogeneous_array() {
        let value = yaml("[a, b, 1]");
        assert!(validate_array("enum", &value, None).is_ok());
        assert!(validate_array("enum", &value, Some(&[ValueType::String])).is_err());
    }

    #[test]
    fn test_mapping_key_and_value_types() {
        let value = yaml("{a: 1, b: 2}");
        assert!(validate_mapping("p", &value, Some(&[ValueType::String]), Some(&[ValueType::Integer])).is_ok());
        assert!(validate_mapping("p", &value, None, Some(&[ValueType::String])).is_err());
        assert!(validate_mapping("p", &yaml("[1]"), None, None).is_err());
    }

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&yaml("10")), Some("10".to_string()));
        assert_eq!(scalar_to_string(&yaml("true")), Some("true".to_string()));
        assert_eq!(scalar_to_string(&yaml("[1]")), None);
    }
}
