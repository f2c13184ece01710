use super::schema::{self, NodeSchema, ScalarProperty};
use super::{ensure_unique, strip_optional, Node, NodeKind, NodeName, Optionality, ParseContext};
use crate::error::NodeError;
use crate::validation::{self, ValueType};
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeSet;

pub const PARAMETER_TYPES: &[&str] = &["string", "number", "integer", "date", "boolean", "file"];

const STRING_ATTRIBUTES: &[(&str, &str)] = &[
    ("enum", "enum"),
    ("pattern", "pattern"),
    ("min_length", "minLength"),
    ("max_length", "maxLength"),
];

const NUMBER_ATTRIBUTES: &[(&str, &str)] = &[("minimum", "minimum"), ("maximum", "maximum")];

pub(crate) static SCHEMA: NodeSchema = NodeSchema {
    base: None,
    scalars: &[
        ScalarProperty {
            name: "display_name",
            check: schema::string,
        },
        ScalarProperty {
            name: "description",
            check: schema::string,
        },
        ScalarProperty {
            name: "type",
            check: schema::string,
        },
        ScalarProperty {
            name: "enum",
            check: schema::string_array,
        },
        ScalarProperty {
            name: "pattern",
            check: schema::string,
        },
        ScalarProperty {
            name: "min_length",
            check: schema::integer,
        },
        ScalarProperty {
            name: "max_length",
            check: schema::integer,
        },
        ScalarProperty {
            name: "minimum",
            check: schema::number,
        },
        ScalarProperty {
            name: "maximum",
            check: schema::number,
        },
        ScalarProperty {
            name: "example",
            check: schema::scalar,
        },
        ScalarProperty {
            name: "default",
            check: schema::scalar,
        },
        ScalarProperty {
            name: "required",
            check: schema::boolean,
        },
        ScalarProperty {
            name: "repeat",
            check: schema::boolean,
        },
    ],
    non_scalars: &[],
    pattern: None,
};

pub(crate) fn parse_headers(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    parse_parameters(NodeKind::Header, key, value, ctx)
}

pub(crate) fn parse_query_parameters(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    parse_parameters(NodeKind::QueryParameter, key, value, ctx)
}

pub(crate) fn parse_uri_parameters(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    parse_parameters(NodeKind::UriParameter, key, value, ctx)
}

pub(crate) fn parse_base_uri_parameters(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    parse_parameters(NodeKind::BaseUriParameter, key, value, ctx)
}

pub(crate) fn parse_form_parameters(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    parse_parameters(NodeKind::FormParameter, key, value, ctx)
}

fn parse_parameters(
    kind: NodeKind,
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let mut seen = BTreeSet::new();
    let mut parameters = Vec::new();
    for (raw_name, properties) in validation::string_entries(key, value)? {
        let (name, optional) = strip_optional(raw_name, ctx.templated);
        ensure_unique(&mut seen, key, name)?;
        if kind == NodeKind::BaseUriParameter && name == "version" {
            return Err(NodeError::InvalidProperty {
                property: key.to_string(),
                reason: "`version` is bound from the root `version` property and cannot be a base URI parameter"
                    .to_string(),
            });
        }
        let mut parameter = match properties {
            Value::Sequence(alternatives) => parse_alternatives(kind, name, alternatives, ctx)?,
            other => Node::build(kind, NodeName::from(name), other, ctx)?,
        };
        if optional {
            parameter.mark_optional(Optionality::Entry);
        }
        parameters.push(parameter);
    }
    Ok(parameters)
}

/// A parameter given as an array: one alternative per type, each a complete parameter of its own.
fn parse_alternatives(
    kind: NodeKind,
    name: &str,
    alternatives: &[Value],
    ctx: &ParseContext<'_>,
) -> Result<Node, NodeError> {
    if alternatives.is_empty() {
        return Err(NodeError::InvalidProperty {
            property: name.to_string(),
            reason: "a parameter with multiple types needs at least one alternative".to_string(),
        });
    }
    let mut parameter = Node::empty(kind, NodeName::from(name));
    let mut types = BTreeSet::new();
    for properties in alternatives {
        let alternative = Node::build(kind, NodeName::from(name), properties, ctx)?;
        let declared = alternative.parameter_type().unwrap_or("string").to_string();
        if !types.insert(declared.clone()) {
            return Err(NodeError::InvalidParameterAttribute {
                parameter: name.to_string(),
                attribute: "type".to_string(),
                reason: format!("type `{declared}` is declared by more than one alternative"),
            });
        }
        parameter.children.push(alternative);
    }
    Ok(parameter)
}

fn attribute_error(node: &Node, attribute: &str, reason: impl Into<String>) -> NodeError {
    NodeError::InvalidParameterAttribute {
        parameter: node.name.to_string(),
        attribute: attribute.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn validate(node: &mut Node) -> Result<(), NodeError> {
    let declared = node.str_property("type").unwrap_or("string");
    if !PARAMETER_TYPES.contains(&declared) {
        return Err(attribute_error(
            node,
            "type",
            format!("`{declared}` is not one of {}", PARAMETER_TYPES.join(", ")),
        ));
    }
    if declared == "file" && node.kind != NodeKind::FormParameter {
        return Err(attribute_error(
            node,
            "type",
            "`file` is only allowed for form parameters",
        ));
    }

    let is_string = declared == "string";
    let is_number = matches!(declared, "number" | "integer");
    for (name, external) in STRING_ATTRIBUTES {
        if !is_string && node.scalars.contains_key(name) {
            return Err(attribute_error(
                node,
                external,
                format!("only valid for string parameters, not `{declared}`"),
            ));
        }
    }
    for (name, external) in NUMBER_ATTRIBUTES {
        if !is_number && node.scalars.contains_key(name) {
            return Err(attribute_error(
                node,
                external,
                format!("only valid for number and integer parameters, not `{declared}`"),
            ));
        }
    }

    if let Some(pattern) = node.str_property("pattern") {
        Regex::new(pattern).map_err(|e| attribute_error(node, "pattern", e.to_string()))?;
    }
    if let Some(Value::Sequence(values)) = node.scalar("enum") {
        if values.is_empty() {
            return Err(attribute_error(node, "enum", "must list at least one value"));
        }
    }
    validate_lengths(node)?;
    validate_range(node)?;

    for (name, external) in [("example", "example"), ("default", "default")] {
        if let Some(value) = node.scalar(name) {
            if !matches_type(declared, value) {
                return Err(attribute_error(
                    node,
                    external,
                    format!(
                        "{} does not match the parameter type `{declared}`",
                        ValueType::of(value).name()
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn validate_lengths(node: &Node) -> Result<(), NodeError> {
    let min = node.scalar("min_length").and_then(Value::as_i64);
    let max = node.scalar("max_length").and_then(Value::as_i64);
    for (value, external) in [(min, "minLength"), (max, "maxLength")] {
        if value.is_some_and(|v| v < 0) {
            return Err(attribute_error(node, external, "must not be negative"));
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(attribute_error(
                node,
                "minLength",
                format!("{min} is greater than maxLength {max}"),
            ));
        }
    }
    Ok(())
}

fn validate_range(node: &Node) -> Result<(), NodeError> {
    let min = node.scalar("minimum").and_then(Value::as_f64);
    let max = node.scalar("maximum").and_then(Value::as_f64);
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(attribute_error(
                node,
                "minimum",
                format!("{min} is greater than maximum {max}"),
            ));
        }
    }
    Ok(())
}

/// Whether `value` is the native representation of a parameter of type `declared`.
fn matches_type(declared: &str, value: &Value) -> bool {
    let actual = ValueType::of(value);
    match declared {
        "string" | "date" => actual == ValueType::String,
        "integer" => actual == ValueType::Integer,
        "number" => matches!(actual, ValueType::Integer | ValueType::Number),
        "boolean" => actual == ValueType::Boolean,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Declarations;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    fn query(src: &str) -> Result<Node, NodeError> {
        Node::parse(NodeKind::QueryParameter, "q", &yaml(src), Some(NodeKind::Method))
    }

    #[test]
    fn test_defaults_are_reported_not_stored() {
        let uri = Node::parse(NodeKind::UriParameter, "id", &Value::Null, Some(NodeKind::Resource))
            .unwrap();
        assert!(uri.is_required());
        assert!(!uri.is_repeat());
        assert_eq!(uri.parameter_type(), Some("string"));
        assert!(uri.scalar("required").is_none());

        let header = Node::parse(NodeKind::Header, "X-Id", &Value::Null, Some(NodeKind::Method))
            .unwrap();
        assert!(!header.is_required());
    }

    #[test]
    fn test_unknown_type() {
        let err = query("{ type: uuid }").unwrap_err();
        assert!(matches!(
            err,
            NodeError::InvalidParameterAttribute { attribute, .. } if attribute == "type"
        ));
    }

    #[test]
    fn test_file_only_for_form_parameters() {
        assert!(query("{ type: file }").is_err());
        assert!(Node::parse(
            NodeKind::FormParameter,
            "upload",
            &yaml("{ type: file }"),
            Some(NodeKind::Body)
        )
        .is_ok());
    }

    #[test]
    fn test_attributes_restricted_by_type() {
        assert!(query("{ type: integer, pattern: '^a' }").is_err());
        assert!(query("{ type: string, minimum: 3 }").is_err());
        assert!(query("{ type: integer, minimum: 1, maximum: 10 }").is_ok());
        assert!(query("{ enum: [a, b], minLength: 1, maxLength: 3 }").is_ok());
    }

    #[test]
    fn test_bounds() {
        assert!(query("{ minLength: 5, maxLength: 2 }").is_err());
        assert!(query("{ minLength: -1 }").is_err());
        assert!(query("{ type: number, minimum: 5, maximum: 1.5 }").is_err());
        assert!(query("{ enum: [] }").is_err());
        assert!(query("{ pattern: '[a-' }").is_err());
    }

    #[test]
    fn test_example_and_default_types() {
        assert!(query("{ type: integer, example: 3, default: 1 }").is_ok());
        assert!(query("{ type: integer, example: '3' }").is_err());
        assert!(query("{ type: number, default: 2 }").is_ok());
        assert!(query("{ type: boolean, default: 'yes' }").is_err());
        assert!(query("{ example: 3 }").is_err());
    }

    #[test]
    fn test_multiple_types() {
        let declarations = Declarations::default();
        let ctx = ParseContext::new(&declarations).child(NodeKind::Method);
        let nodes = parse_query_parameters(
            "queryParameters",
            &yaml(
                r#"
                id:
                  - type: integer
                  - type: string
                    pattern: "^[a-z]+$"
                "#,
            ),
            &ctx,
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
        let id = &nodes[0];
        assert!(id.has_multiple_types());
        assert_eq!(id.parameter_type(), None);
        let types: Vec<_> = id
            .type_alternatives()
            .iter()
            .filter_map(|a| a.parameter_type())
            .collect();
        assert_eq!(types, vec!["integer", "string"]);
    }

    #[test]
    fn test_duplicate_alternative_types() {
        let declarations = Declarations::default();
        let ctx = ParseContext::new(&declarations).child(NodeKind::Method);
        let err = parse_query_parameters(
            "queryParameters",
            &yaml("id: [{ type: string }, { description: other }]"),
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidParameterAttribute { .. }));
    }

    #[test]
    fn test_version_is_not_a_base_uri_parameter() {
        let declarations = Declarations::default();
        let ctx = ParseContext::new(&declarations).child(NodeKind::Root);
        let err = parse_base_uri_parameters("baseUriParameters", &yaml("version: {}"), &ctx)
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidProperty { .. }));
    }

    #[test]
    fn test_optional_entries_in_templates() {
        let declarations = Declarations::default();
        let ctx = ParseContext {
            templated: true,
            ..ParseContext::new(&declarations).child(NodeKind::AbstractMethod)
        };
        let nodes = parse_query_parameters(
            "queryParameters",
            &yaml("page?: { type: integer }\nlimit: {}"),
            &ctx,
        )
        .unwrap();
        assert_eq!(nodes[0].name, "page");
        assert_eq!(nodes[0].optionality(), Some(Optionality::Entry));
        assert!(!nodes[1].is_optional());
    }
}
