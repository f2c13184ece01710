use super::schema::{self, NodeSchema, NonScalarProperty, ScalarProperty};
use super::{body, ensure_unique, Node, NodeKind, NodeName, Optionality, ParseContext, Payload};
use crate::error::NodeError;
use crate::validation::{self, ValueType};
use serde_yaml::Value;
use std::collections::BTreeSet;

pub const SECURITY_SCHEME_TYPES: &[&str] = &[
    "OAuth 1.0",
    "OAuth 2.0",
    "Basic Authentication",
    "Digest Authentication",
];

pub(crate) static SECURITY_SCHEME: NodeSchema = NodeSchema {
    base: None,
    scalars: &[
        ScalarProperty {
            name: "description",
            check: schema::string,
        },
        ScalarProperty {
            name: "type",
            check: schema::non_empty_string,
        },
        ScalarProperty {
            name: "settings",
            check: schema::mapping,
        },
    ],
    non_scalars: &[NonScalarProperty {
        name: "described_by",
        parse: parse_described_by,
        optional: Optionality::Collection,
    }],
    pattern: None,
};

pub(crate) static DOCUMENTATION: NodeSchema = NodeSchema {
    base: None,
    scalars: &[
        ScalarProperty {
            name: "title",
            check: schema::non_empty_string,
        },
        ScalarProperty {
            name: "content",
            check: schema::non_empty_string,
        },
    ],
    non_scalars: &[],
    pattern: None,
};

/// Named entries of a declaration collection. RAML 0.8 writes them as a list of single-key
/// mappings; a plain mapping is accepted as well.
fn declaration_entries<'a>(key: &str, value: &'a Value) -> Result<Vec<(&'a str, &'a Value)>, NodeError> {
    let entries = match value {
        Value::Null => Vec::new(),
        Value::Mapping(_) => validation::string_entries(key, value)?,
        Value::Sequence(items) => {
            let mut entries = Vec::new();
            for item in items {
                entries.extend(validation::string_entries(key, item)?);
            }
            entries
        }
        other => {
            return Err(NodeError::InvalidProperty {
                property: key.to_string(),
                reason: format!(
                    "expected a list of mappings, found {}",
                    ValueType::of(other).name()
                ),
            })
        }
    };
    let mut seen = BTreeSet::new();
    for (name, _) in &entries {
        ensure_unique(&mut seen, key, name)?;
    }
    Ok(entries)
}

/// A trait or resource type keeps its body uninterpolated until it is applied.
pub(crate) fn template_node(kind: NodeKind, name: &str, value: &Value) -> Result<Node, NodeError> {
    let mut node = Node::empty(kind, NodeName::from(name));
    match value {
        Value::Null => {}
        Value::Mapping(map) => {
            if let Some(usage) = map.get("usage") {
                validation::validate_string("usage", usage)?;
                node.scalars.insert("usage", usage.clone());
            }
        }
        other => {
            return Err(NodeError::InvalidProperty {
                property: name.to_string(),
                reason: format!(
                    "a {kind} must be a mapping, found {}",
                    ValueType::of(other).name()
                ),
            })
        }
    }
    node.payload = Payload::Template(value.clone());
    Ok(node)
}

pub(crate) fn parse_schemas(
    key: &str,
    value: &Value,
    _ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    declaration_entries(key, value)?
        .into_iter()
        .map(|(name, text)| {
            let text = validation::validate_string(name, text)?;
            Ok(body::schema_node(name, text))
        })
        .collect()
}

pub(crate) fn parse_traits(
    key: &str,
    value: &Value,
    _ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    declaration_entries(key, value)?
        .into_iter()
        .map(|(name, body)| template_node(NodeKind::Trait, name, body))
        .collect()
}

pub(crate) fn parse_resource_types(
    key: &str,
    value: &Value,
    _ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    declaration_entries(key, value)?
        .into_iter()
        .map(|(name, body)| template_node(NodeKind::ResourceType, name, body))
        .collect()
}

/// Security schemes are validated up front but also keep their raw body, since `describedBy` may
/// carry `<<parameters>>` bound by each `securedBy` entry.
pub(crate) fn parse_security_schemes(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    declaration_entries(key, value)?
        .into_iter()
        .map(|(name, properties)| {
            let mut node =
                Node::build(NodeKind::SecurityScheme, NodeName::from(name), properties, ctx)?;
            node.payload = Payload::Template(properties.clone());
            Ok(node)
        })
        .collect()
}

pub(crate) fn parse_documentation(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    validation::validate_array(key, value, Some(&[ValueType::Mapping]))?
        .iter()
        .map(|section| {
            let title = section
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("documentation");
            Node::build(NodeKind::Documentation, NodeName::from(title), section, ctx)
        })
        .collect()
}

fn parse_described_by(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    Ok(vec![Node::build(
        NodeKind::AbstractMethod,
        NodeName::from(key),
        value,
        ctx,
    )?])
}

pub(crate) fn validate_security_scheme(node: &mut Node) -> Result<(), NodeError> {
    let Some(scheme_type) = node.str_property("type") else {
        return Err(NodeError::RequiredPropertyMissing {
            node: format!("security scheme `{}`", node.name),
            property: "type".to_string(),
        });
    };
    if !SECURITY_SCHEME_TYPES.contains(&scheme_type) && !scheme_type.starts_with("x-") {
        return Err(NodeError::InvalidProperty {
            property: "type".to_string(),
            reason: format!(
                "`{scheme_type}` is not one of {} or an `x-` custom type",
                SECURITY_SCHEME_TYPES.join(", ")
            ),
        });
    }
    Ok(())
}

pub(crate) fn validate_documentation(node: &mut Node) -> Result<(), NodeError> {
    for property in ["title", "content"] {
        if node.scalar(property).is_none() {
            return Err(NodeError::RequiredPropertyMissing {
                node: "documentation".to_string(),
                property: property.to_string(),
            });
        }
    }
    Ok(())
}
