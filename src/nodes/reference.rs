use super::{declaration, method, resource, Node, NodeKind, ParseContext};
use crate::error::NodeError;
use crate::validation::{self, ValueType};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A pointer from the tree to a declaration at the root: a trait, a resource type, a security
/// scheme or a schema. Expansion swaps an unresolved reference for one holding the declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Unresolved {
        name: String,
        parameters: BTreeMap<String, Value>,
    },
    Resolved {
        name: String,
        parameters: BTreeMap<String, Value>,
        target: Box<Node>,
    },
}

impl Reference {
    pub fn name(&self) -> &str {
        match self {
            Reference::Unresolved { name, .. } | Reference::Resolved { name, .. } => name,
        }
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        match self {
            Reference::Unresolved { parameters, .. } | Reference::Resolved { parameters, .. } => {
                parameters
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved { .. })
    }

    pub fn target(&self) -> Option<&Node> {
        match self {
            Reference::Resolved { target, .. } => Some(target),
            Reference::Unresolved { .. } => None,
        }
    }

    pub(crate) fn resolve(&self, target: Node) -> Reference {
        Reference::Resolved {
            name: self.name().to_string(),
            parameters: self.parameters().clone(),
            target: Box::new(target),
        }
    }
}

/// The single entry of a `{ name: { param: value } }` mapping.
fn single_entry(item: &Mapping) -> Option<(&str, &Value)> {
    let mut entries = item.iter();
    match (entries.next(), entries.next()) {
        (Some((Value::String(name), params)), None) => Some((name.as_str(), params)),
        _ => None,
    }
}

/// Template parameters bound by `is:` and `type:` are scalars, rendered as strings later.
fn template_parameters(name: &str, params: &Value) -> Result<BTreeMap<String, Value>, NodeError> {
    if params.is_null() {
        return Ok(BTreeMap::new());
    }
    let entries = validation::string_entries(name, params)?;
    let mut bound = BTreeMap::new();
    for (key, value) in entries {
        validation::validate_type(
            key,
            value,
            &[ValueType::String, ValueType::Number, ValueType::Boolean],
        )?;
        bound.insert(key.to_string(), value.clone());
    }
    Ok(bound)
}

/// Shared by `is:` items and `type:`: a name, a parameterized name or an inline template.
fn template_reference(
    item: &Value,
    reference: NodeKind,
    inline: NodeKind,
    declared: &BTreeSet<String>,
    is_property: impl Fn(&str) -> bool,
) -> Result<Node, NodeError> {
    match item {
        Value::String(name) => Ok(Node::unresolved_reference(reference, name, BTreeMap::new())),
        Value::Mapping(map) => match single_entry(map) {
            Some((name, params)) if declared.contains(name) || !is_property(name) => {
                let parameters = template_parameters(name, params)?;
                Ok(Node::unresolved_reference(reference, name, parameters))
            }
            _ => declaration::template_node(inline, "inline", item),
        },
        other => Err(NodeError::InvalidProperty {
            property: reference.label().to_string(),
            reason: format!(
                "expected a name or a mapping, found {}",
                ValueType::of(other).name()
            ),
        }),
    }
}

pub(crate) fn parse_is(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    validation::validate_array(key, value, None)?
        .iter()
        .map(|item| {
            template_reference(
                item,
                NodeKind::TraitReference,
                NodeKind::Trait,
                &ctx.declarations.traits,
                |name| method::ABSTRACT_METHOD.accepts(name),
            )
        })
        .collect()
}

pub(crate) fn parse_type(
    _key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    Ok(vec![template_reference(
        value,
        NodeKind::ResourceTypeReference,
        NodeKind::ResourceType,
        &ctx.declarations.resource_types,
        |name| resource::SCHEMA.accepts(name),
    )?])
}

/// `securedBy` items are a scheme name, `null` for anonymous access, or a name with settings.
pub(crate) fn parse_secured_by(
    key: &str,
    value: &Value,
    _ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let mut references = Vec::new();
    for item in validation::validate_array(key, value, None)? {
        let reference = match item {
            Value::Null => {
                Node::unresolved_reference(NodeKind::SecuritySchemeReference, "null", BTreeMap::new())
            }
            Value::String(name) => {
                Node::unresolved_reference(NodeKind::SecuritySchemeReference, name, BTreeMap::new())
            }
            Value::Mapping(map) => {
                let Some((name, params)) = single_entry(map) else {
                    return Err(NodeError::InvalidProperty {
                        property: key.to_string(),
                        reason: "a parameterized scheme is a mapping with exactly one key".to_string(),
                    });
                };
                let parameters = match params {
                    Value::Null => BTreeMap::new(),
                    other => validation::string_entries(name, other)?
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .collect(),
                };
                Node::unresolved_reference(NodeKind::SecuritySchemeReference, name, parameters)
            }
            other => {
                return Err(NodeError::InvalidProperty {
                    property: key.to_string(),
                    reason: format!(
                        "expected a scheme name, null or a mapping, found {}",
                        ValueType::of(other).name()
                    ),
                })
            }
        };
        references.push(reference);
    }
    Ok(references)
}
