use super::schema::{self, NodeSchema, NonScalarProperty, ScalarProperty};
use super::{body, parameter, reference, Node, NodeKind, NodeName, Optionality, ParseContext};
use crate::error::NodeError;
use serde_yaml::Value;

pub const METHOD_NAMES: &[&str] = &[
    "options", "get", "head", "post", "put", "delete", "trace", "connect", "patch",
];

/// Shared by methods, trait instances and security scheme `describedBy` blocks.
pub(crate) static ABSTRACT_METHOD: NodeSchema = NodeSchema {
    base: None,
    scalars: &[
        ScalarProperty {
            name: "description",
            check: schema::string,
        },
        ScalarProperty {
            name: "protocols",
            check: schema::protocols,
        },
    ],
    non_scalars: &[
        NonScalarProperty {
            name: "headers",
            parse: parameter::parse_headers,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "query_parameters",
            parse: parameter::parse_query_parameters,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "base_uri_parameters",
            parse: parameter::parse_base_uri_parameters,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "body",
            parse: body::parse_body,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "responses",
            parse: body::parse_responses,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "is",
            parse: reference::parse_is,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "secured_by",
            parse: reference::parse_secured_by,
            optional: Optionality::Collection,
        },
    ],
    pattern: None,
};

/// A method adds nothing to the abstract method's properties; its verb is checked in `validate`.
pub(crate) static METHOD: NodeSchema = NodeSchema {
    base: Some(&ABSTRACT_METHOD),
    scalars: &[],
    non_scalars: &[],
    pattern: None,
};

pub(crate) fn parse_method(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    Ok(vec![Node::build(
        NodeKind::Method,
        NodeName::from(key),
        value,
        ctx,
    )?])
}

pub(crate) fn validate(node: &mut Node, ctx: &ParseContext<'_>) -> Result<(), NodeError> {
    if !node.name.as_str().is_some_and(|n| METHOD_NAMES.contains(&n)) {
        return Err(NodeError::InvalidMethod {
            name: node.name.to_string(),
        });
    }
    if ctx.parent.is_none() {
        return Err(NodeError::MissingParent {
            node: "method".to_string(),
            name: node.name.to_string(),
        });
    }
    Ok(())
}
