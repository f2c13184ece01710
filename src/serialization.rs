use crate::nodes::{Node, NodeKind};
use crate::utils::camelize;
use crate::validation::scalar_to_string;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Null,
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl From<&serde_yaml::Value> for Value {
    fn from(value: &serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::String(s) => Value::String(s.clone()),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Number(n.as_f64().unwrap_or_default()),
            },
            serde_yaml::Value::Bool(b) => Value::Boolean(*b),
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Sequence(items) => Value::Array(items.iter().map(Value::from).collect()),
            serde_yaml::Value::Mapping(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (scalar_to_string(k).unwrap_or_default(), Value::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(&tagged.value),
        }
    }
}

/// Renders a node as RAML-shaped data: camelCase keys, children grouped under the property that
/// declares them, and references written the way they appear in a document.
pub(crate) fn to_value(node: &Node) -> Value {
    if node.has_multiple_types() {
        return Value::Array(node.type_alternatives().into_iter().map(to_value).collect());
    }
    match node.kind() {
        NodeKind::Schema => {
            return node
                .scalar("value")
                .map(Value::from)
                .unwrap_or(Value::Null)
        }
        NodeKind::Trait | NodeKind::ResourceType => {
            return node.template().map(Value::from).unwrap_or(Value::Null)
        }
        NodeKind::TraitReference
        | NodeKind::ResourceTypeReference
        | NodeKind::SecuritySchemeReference
        | NodeKind::SchemaReference => return reference_value(node),
        _ => {}
    }

    let mut map = BTreeMap::new();
    for (name, value) in node.scalars() {
        map.insert(camelize(name), Value::from(value));
    }

    let declaring_root = node.kind() == NodeKind::Root;
    for child in node.children() {
        let name = child.name().to_string();
        let value = to_value(child);
        match child.kind() {
            NodeKind::Resource | NodeKind::Method => {
                map.insert(name, value);
            }
            NodeKind::Header => insert_keyed(&mut map, "headers", name, value),
            NodeKind::QueryParameter => insert_keyed(&mut map, "queryParameters", name, value),
            NodeKind::UriParameter => insert_keyed(&mut map, "uriParameters", name, value),
            NodeKind::BaseUriParameter => insert_keyed(&mut map, "baseUriParameters", name, value),
            NodeKind::FormParameter => insert_keyed(&mut map, "formParameters", name, value),
            NodeKind::Body => insert_keyed(&mut map, "body", name, value),
            NodeKind::Response => insert_keyed(&mut map, "responses", name, value),
            NodeKind::Schema if declaring_root => push_named(&mut map, "schemas", name, value),
            NodeKind::Schema | NodeKind::SchemaReference => {
                map.insert("schema".to_string(), value);
            }
            NodeKind::Trait if declaring_root => push_named(&mut map, "traits", name, value),
            NodeKind::Trait | NodeKind::TraitReference => push_listed(&mut map, "is", value),
            NodeKind::ResourceType if declaring_root => {
                push_named(&mut map, "resourceTypes", name, value)
            }
            NodeKind::ResourceType | NodeKind::ResourceTypeReference => {
                map.insert("type".to_string(), value);
            }
            NodeKind::SecurityScheme => push_named(&mut map, "securitySchemes", name, value),
            NodeKind::SecuritySchemeReference => push_listed(&mut map, "securedBy", value),
            NodeKind::Documentation => push_listed(&mut map, "documentation", value),
            NodeKind::AbstractMethod => {
                map.insert("describedBy".to_string(), value);
            }
            NodeKind::Root => {}
        }
    }
    Value::Object(map)
}

/// `name`, `{ name: { parameters } }`, or `null` for anonymous security.
fn reference_value(node: &Node) -> Value {
    let Some(reference) = node.reference() else {
        return Value::Null;
    };
    if node.kind() == NodeKind::SecuritySchemeReference && reference.name() == "null" {
        return Value::Null;
    }
    if reference.parameters().is_empty() {
        return Value::String(reference.name().to_string());
    }
    let parameters = reference
        .parameters()
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(v)))
        .collect();
    Value::Object(BTreeMap::from([(
        reference.name().to_string(),
        Value::Object(parameters),
    )]))
}

fn insert_keyed(map: &mut BTreeMap<String, Value>, group: &str, name: String, value: Value) {
    let entry = map
        .entry(group.to_string())
        .or_insert_with(|| Value::Object(BTreeMap::new()));
    if let Value::Object(members) = entry {
        members.insert(name, value);
    }
}

fn push_listed(map: &mut BTreeMap<String, Value>, group: &str, value: Value) {
    let entry = map
        .entry(group.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(items) = entry {
        items.push(value);
    }
}

/// Declarations are written as a list of single-key mappings.
fn push_named(map: &mut BTreeMap<String, Value>, group: &str, name: String, value: Value) {
    push_listed(map, group, Value::Object(BTreeMap::from([(name, value)])));
}
