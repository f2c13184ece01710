use super::schema::{self, NodeSchema, NonScalarProperty, PatternProperty, ScalarProperty};
use super::{method, parameter, reference, Node, NodeKind, NodeName, Optionality, ParseContext};
use crate::error::NodeError;
use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;

macro_rules! method_property {
    ($verb:literal) => {
        NonScalarProperty {
            name: $verb,
            parse: method::parse_method,
            optional: Optionality::Entry,
        }
    };
}

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
    ],
    non_scalars: &[
        method_property!("options"),
        method_property!("get"),
        method_property!("head"),
        method_property!("post"),
        method_property!("put"),
        method_property!("delete"),
        method_property!("trace"),
        method_property!("connect"),
        method_property!("patch"),
        NonScalarProperty {
            name: "uri_parameters",
            parse: parameter::parse_uri_parameters,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "base_uri_parameters",
            parse: parameter::parse_base_uri_parameters,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "is",
            parse: reference::parse_is,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "type",
            parse: reference::parse_type,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "secured_by",
            parse: reference::parse_secured_by,
            optional: Optionality::Collection,
        },
    ],
    pattern: Some(PatternProperty {
        pattern: resource_key,
        parse: parse_resource,
    }),
};

/// Nested resources are the keys that start with a slash.
pub(crate) fn resource_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/").expect("resource key pattern is valid"))
}

pub(crate) fn parse_resource(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    Ok(vec![Node::build(
        NodeKind::Resource,
        NodeName::from(key),
        value,
        ctx,
    )?])
}

pub(crate) fn validate(node: &mut Node, ctx: &ParseContext<'_>) -> Result<(), NodeError> {
    if ctx.parent.is_none() {
        return Err(NodeError::MissingParent {
            node: "resource".to_string(),
            name: node.name.to_string(),
        });
    }
    // Resource type instances carry the name of their resource type.
    if !ctx.templated && !node.name.as_str().is_some_and(|n| n.starts_with('/')) {
        return Err(NodeError::InvalidProperty {
            property: node.name.to_string(),
            reason: "resource paths must start with `/`".to_string(),
        });
    }
    Ok(())
}

/// The rightmost path segment that contains no URI parameter: `users` for `/users/{id}`.
pub fn resource_path_name(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && !segment.contains('{'))
        .last()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_path_name() {
        assert_eq!(resource_path_name("/users"), "users");
        assert_eq!(resource_path_name("/users/{userId}"), "users");
        assert_eq!(resource_path_name("/users/{userId}/comments"), "comments");
        assert_eq!(resource_path_name("/{id}"), "");
    }

    #[test]
    fn test_nested_resources_and_methods() {
        let value: Value = serde_yaml::from_str(
            r#"
            displayName: Users
            get:
            post:
              description: create
            /{userId}:
              get:
            "#,
        )
        .unwrap();
        let node = Node::parse(NodeKind::Resource, "/users", &value, Some(NodeKind::Root)).unwrap();
        assert_eq!(node.display_name(), Some("Users"));
        assert_eq!(node.methods().len(), 2);
        let nested = node.resources();
        assert!(nested["/{userId}"].methods().contains_key("get"));
    }

    #[test]
    fn test_resource_requires_parent() {
        let err = Node::parse(NodeKind::Resource, "/users", &Value::Null, None).unwrap_err();
        assert!(matches!(err, NodeError::MissingParent { .. }));
    }

    #[test]
    fn test_unknown_method_key_is_rejected() {
        let value: Value = serde_yaml::from_str("fetch: {}").unwrap();
        let err = Node::parse(NodeKind::Resource, "/users", &value, Some(NodeKind::Root)).unwrap_err();
        assert!(matches!(err, NodeError::UnknownProperty { property, .. } if property == "fetch"));
    }
}
