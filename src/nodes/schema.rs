use super::{Node, Optionality, ParseContext};
use crate::error::NodeError;
use crate::validation::{self, ValueType};
use regex::Regex;
use serde_yaml::Value;

/// Checks a scalar property and returns the value to store.
pub(crate) type ScalarFn = fn(&str, &Value) -> Result<Value, NodeError>;

/// Parses a non-scalar property into child nodes. Receives the external key, the raw value and the
/// context of the node being built (with that node as the parent).
pub(crate) type ParseFn = fn(&str, &Value, &ParseContext<'_>) -> Result<Vec<Node>, NodeError>;

pub(crate) struct ScalarProperty {
    pub name: &'static str,
    pub check: ScalarFn,
}

pub(crate) struct NonScalarProperty {
    pub name: &'static str,
    pub parse: ParseFn,
    /// What a `?` suffix on this key marks the produced children as.
    pub optional: Optionality,
}

/// A property whose key is data, such as a nested resource path.
#[derive(Clone, Copy)]
pub(crate) struct PatternProperty {
    pub pattern: fn() -> &'static Regex,
    pub parse: ParseFn,
}

impl PatternProperty {
    pub fn matches(&self, key: &str) -> bool {
        (self.pattern)().is_match(key)
    }
}

/// The static property table of one node kind. A table may compose a `base` table whose
/// properties it inherits.
pub(crate) struct NodeSchema {
    pub base: Option<&'static NodeSchema>,
    pub scalars: &'static [ScalarProperty],
    pub non_scalars: &'static [NonScalarProperty],
    pub pattern: Option<PatternProperty>,
}

impl NodeSchema {
    pub const EMPTY: NodeSchema = NodeSchema {
        base: None,
        scalars: &[],
        non_scalars: &[],
        pattern: None,
    };

    pub fn scalar(&'static self, name: &str) -> Option<&'static ScalarProperty> {
        self.scalars
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.base.and_then(|base| base.scalar(name)))
    }

    pub fn non_scalar(&'static self, name: &str) -> Option<&'static NonScalarProperty> {
        self.non_scalars
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.base.and_then(|base| base.non_scalar(name)))
    }

    pub fn pattern(&'static self) -> Option<PatternProperty> {
        self.pattern.or_else(|| self.base.and_then(|base| base.pattern()))
    }

    /// Whether `key` (external form, `?` already stripped) is claimed by any property of this table.
    pub fn accepts(&'static self, key: &str) -> bool {
        let name = crate::utils::underscore(key);
        self.scalar(&name).is_some()
            || self.non_scalar(&name).is_some()
            || self.pattern().is_some_and(|p| p.matches(key))
    }

    /// Declared scalar names, base table first.
    pub fn scalar_names(&'static self) -> Vec<&'static str> {
        let mut names = self.base.map(|b| b.scalar_names()).unwrap_or_default();
        names.extend(self.scalars.iter().map(|p| p.name));
        names
    }
}

// Scalar checks shared by the per-kind tables.

pub(crate) fn string(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_string(key, value)?;
    Ok(value.clone())
}

pub(crate) fn non_empty_string(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_non_empty_string(key, value)?;
    Ok(value.clone())
}

pub(crate) fn boolean(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_type(key, value, &[ValueType::Boolean])?;
    Ok(value.clone())
}

pub(crate) fn integer(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_type(key, value, &[ValueType::Integer])?;
    Ok(value.clone())
}

pub(crate) fn number(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_type(key, value, &[ValueType::Number])?;
    Ok(value.clone())
}

/// Any single scalar: string, number or boolean.
pub(crate) fn scalar(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_type(
        key,
        value,
        &[ValueType::String, ValueType::Number, ValueType::Boolean],
    )?;
    Ok(value.clone())
}

pub(crate) fn string_or_number(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_type(key, value, &[ValueType::String, ValueType::Number])?;
    Ok(value.clone())
}

pub(crate) fn string_array(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_array(key, value, Some(&[ValueType::String]))?;
    Ok(value.clone())
}

pub(crate) fn mapping(key: &str, value: &Value) -> Result<Value, NodeError> {
    validation::validate_mapping(key, value, Some(&[ValueType::String]), None)?;
    Ok(value.clone())
}

/// `protocols` is stored uppercased and may only name HTTP and HTTPS.
pub(crate) fn protocols(key: &str, value: &Value) -> Result<Value, NodeError> {
    let items = validation::validate_array(key, value, Some(&[ValueType::String]))?;
    let mut normalized = Vec::with_capacity(items.len());
    for item in items {
        let protocol = item.as_str().unwrap_or_default().to_uppercase();
        if protocol != "HTTP" && protocol != "HTTPS" {
            return Err(NodeError::InvalidProperty {
                property: key.to_string(),
                reason: format!("`{protocol}` is not a supported protocol, use HTTP or HTTPS"),
            });
        }
        normalized.push(Value::String(protocol));
    }
    Ok(Value::Sequence(normalized))
}
