use super::schema::{self, NodeSchema, NonScalarProperty, ScalarProperty};
use super::{
    ensure_unique, parameter, strip_optional, Node, NodeKind, NodeName, Optionality, ParseContext,
};
use crate::error::NodeError;
use crate::validation;
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const WEB_FORM_MEDIA_TYPES: &[&str] =
    &["application/x-www-form-urlencoded", "multipart/form-data"];

pub(crate) static BODY: NodeSchema = NodeSchema {
    base: None,
    scalars: &[ScalarProperty {
        name: "example",
        check: schema::string,
    }],
    non_scalars: &[
        NonScalarProperty {
            name: "schema",
            parse: parse_schema,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "form_parameters",
            parse: parameter::parse_form_parameters,
            optional: Optionality::Collection,
        },
    ],
    pattern: None,
};

pub(crate) static RESPONSE: NodeSchema = NodeSchema {
    base: None,
    scalars: &[ScalarProperty {
        name: "description",
        check: schema::string,
    }],
    non_scalars: &[
        NonScalarProperty {
            name: "headers",
            parse: parameter::parse_headers,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "body",
            parse: parse_body,
            optional: Optionality::Collection,
        },
    ],
    pattern: None,
};

fn media_type_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\w!#$&^.+*-]+/[\w!#$&^.+*-]+(\s*;.*)?$").expect("media type pattern is valid")
    })
}

pub fn is_media_type(value: &str) -> bool {
    media_type_pattern().is_match(value)
}

pub fn is_web_form(media_type: &str) -> bool {
    WEB_FORM_MEDIA_TYPES.contains(&media_type)
}

/// Scalar check for the root `mediaType`.
pub(crate) fn media_type(key: &str, value: &Value) -> Result<Value, NodeError> {
    let media_type = validation::validate_string(key, value)?;
    if !is_media_type(media_type) {
        return Err(NodeError::InvalidMediaType {
            media_type: media_type.to_string(),
        });
    }
    Ok(value.clone())
}

/// `body:` is either keyed by media type or, without any media type key, a single body for the
/// document's default media type.
pub(crate) fn parse_body(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let entries = validation::string_entries(key, value)?;
    let keyed = entries
        .iter()
        .any(|(k, _)| is_media_type(strip_optional(k, ctx.templated).0));

    if !keyed {
        let Some(default) = &ctx.declarations.media_type else {
            return Err(NodeError::RequiredPropertyMissing {
                node: "root".to_string(),
                property: "mediaType".to_string(),
            });
        };
        return Ok(vec![Node::build(
            NodeKind::Body,
            NodeName::from(default.as_str()),
            value,
            ctx,
        )?]);
    }

    let mut seen = BTreeSet::new();
    let mut bodies = Vec::with_capacity(entries.len());
    for (raw_key, properties) in entries {
        let (media_type, optional) = strip_optional(raw_key, ctx.templated);
        ensure_unique(&mut seen, key, media_type)?;
        let mut body = Node::build(NodeKind::Body, NodeName::from(media_type), properties, ctx)?;
        if optional {
            body.mark_optional(Optionality::Entry);
        }
        bodies.push(body);
    }
    Ok(bodies)
}

/// A schema name declared at the root becomes a reference; anything else is the schema text itself.
fn parse_schema(key: &str, value: &Value, ctx: &ParseContext<'_>) -> Result<Vec<Node>, NodeError> {
    let text = validation::validate_string(key, value)?;
    if ctx.declarations.schemas.contains(text) {
        return Ok(vec![Node::unresolved_reference(
            NodeKind::SchemaReference,
            text,
            Default::default(),
        )]);
    }
    Ok(vec![schema_node("schema", text)])
}

pub(crate) fn schema_node(name: &str, text: &str) -> Node {
    let mut node = Node::empty(NodeKind::Schema, NodeName::from(name));
    node.scalars.insert("value", Value::String(text.to_string()));
    node
}

pub(crate) fn parse_responses(
    key: &str,
    value: &Value,
    ctx: &ParseContext<'_>,
) -> Result<Vec<Node>, NodeError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let map = validation::validate_mapping(key, value, None, None)?;
    let mut seen = BTreeSet::new();
    let mut responses = Vec::with_capacity(map.len());
    for (code, properties) in map {
        let (status, optional) = status_code(code, ctx.templated)?;
        ensure_unique(&mut seen, key, &status.to_string())?;
        let mut response = Node::build(NodeKind::Response, NodeName::Status(status), properties, ctx)?;
        if optional {
            response.mark_optional(Optionality::Entry);
        }
        responses.push(response);
    }
    Ok(responses)
}

/// Response keys are integer status codes; `200?` is the only string form, and only in templates.
fn status_code(key: &Value, templated: bool) -> Result<(u16, bool), NodeError> {
    let invalid = |reason: &str| NodeError::InvalidProperty {
        property: "responses".to_string(),
        reason: format!("`{}` {reason}", validation::scalar_to_string(key).unwrap_or_default()),
    };
    let (code, optional) = match key {
        Value::Number(n) => (n.as_u64(), false),
        Value::String(s) if templated && s.ends_with('?') => {
            (s.trim_end_matches('?').parse::<u64>().ok(), true)
        }
        _ => return Err(invalid("is not an integer status code")),
    };
    match code {
        Some(code @ 100..=599) => Ok((code as u16, optional)),
        _ => Err(invalid("is not a status code between 100 and 599")),
    }
}

pub(crate) fn validate_body(node: &mut Node) -> Result<(), NodeError> {
    let media_type = node.name.to_string();
    if !is_media_type(&media_type) {
        return Err(NodeError::InvalidMediaType { media_type });
    }
    let has_form_parameters = node.children_of(NodeKind::FormParameter).next().is_some();
    if is_web_form(&media_type) {
        if node.schema().is_some() {
            return Err(NodeError::InvalidProperty {
                property: "schema".to_string(),
                reason: format!("`{media_type}` bodies cannot declare a schema"),
            });
        }
        if !has_form_parameters {
            return Err(NodeError::RequiredPropertyMissing {
                node: format!("body `{media_type}`"),
                property: "formParameters".to_string(),
            });
        }
    } else if has_form_parameters {
        return Err(NodeError::InvalidProperty {
            property: "formParameters".to_string(),
            reason: format!("only web form bodies accept form parameters, not `{media_type}`"),
        });
    }
    Ok(())
}

pub(crate) fn validate_response(node: &mut Node) -> Result<(), NodeError> {
    match node.name.status() {
        Some(100..=599) => Ok(()),
        _ => Err(NodeError::InvalidProperty {
            property: "responses".to_string(),
            reason: format!("`{}` is not a status code between 100 and 599", node.name),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Declarations;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_media_types() {
        assert!(is_media_type("application/json"));
        assert!(is_media_type("application/vnd.api+json"));
        assert!(is_media_type("text/plain; charset=utf-8"));
        assert!(!is_media_type("json"));
        assert!(!is_media_type("formParameters"));
    }

    #[test]
    fn test_web_form_requires_form_parameters() {
        let err = Node::parse(
            NodeKind::Body,
            "multipart/form-data",
            &Value::Null,
            Some(NodeKind::Method),
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::RequiredPropertyMissing { property, .. } if property == "formParameters"));

        let err = Node::parse(
            NodeKind::Body,
            "application/x-www-form-urlencoded",
            &yaml("{ schema: '{}', formParameters: { name: {} } }"),
            Some(NodeKind::Method),
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidProperty { property, .. } if property == "schema"));

        assert!(Node::parse(
            NodeKind::Body,
            "application/x-www-form-urlencoded",
            &yaml("formParameters: { name: {} }"),
            Some(NodeKind::Method),
        )
        .is_ok());
    }

    #[test]
    fn test_form_parameters_only_on_web_forms() {
        let err = Node::parse(
            NodeKind::Body,
            "application/json",
            &yaml("formParameters: { name: {} }"),
            Some(NodeKind::Method),
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidProperty { .. }));
    }

    #[test]
    fn test_invalid_media_type() {
        let err = Node::parse(NodeKind::Body, "json", &Value::Null, Some(NodeKind::Method))
            .unwrap_err();
        assert_eq!(
            err,
            NodeError::InvalidMediaType {
                media_type: "json".to_string()
            }
        );
    }

    #[test]
    fn test_unkeyed_body_uses_default_media_type() {
        let declarations = Declarations {
            media_type: Some("application/json".to_string()),
            ..Default::default()
        };
        let ctx = ParseContext::new(&declarations).child(NodeKind::Method);
        let bodies = parse_body("body", &yaml("example: '{}'"), &ctx).unwrap();
        assert_eq!(bodies[0].name, "application/json");

        let declarations = Declarations::default();
        let ctx = ParseContext::new(&declarations).child(NodeKind::Method);
        let err = parse_body("body", &yaml("example: '{}'"), &ctx).unwrap_err();
        assert!(matches!(err, NodeError::RequiredPropertyMissing { .. }));
    }

    #[test]
    fn test_schema_reference_or_inline() {
        let declarations = Declarations {
            schemas: ["User".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let ctx = ParseContext::new(&declarations).child(NodeKind::Method);
        let bodies = parse_body(
            "body",
            &yaml("application/json: { schema: User }\ntext/xml: { schema: '<xs:schema/>' }"),
            &ctx,
        )
        .unwrap();
        let json = bodies[0].schema().unwrap();
        assert_eq!(json.kind(), NodeKind::SchemaReference);
        assert_eq!(json.reference().map(|r| r.name()), Some("User"));
        let xml = bodies[1].schema().unwrap();
        assert_eq!(xml.kind(), NodeKind::Schema);
        assert_eq!(xml.str_property("value"), Some("<xs:schema/>"));
    }

    #[test]
    fn test_responses() {
        let declarations = Declarations::default();
        let ctx = ParseContext::new(&declarations).child(NodeKind::Method);
        let responses = parse_responses("responses", &yaml("200:\n404: { description: gone }"), &ctx)
            .unwrap();
        assert_eq!(responses[0].name, 200u16);
        assert!(responses[0].children().is_empty());
        assert_eq!(responses[1].description(), Some("gone"));

        assert!(parse_responses("responses", &yaml("'200': {}"), &ctx).is_err());
        assert!(parse_responses("responses", &yaml("700: {}"), &ctx).is_err());
        assert!(parse_responses("responses", &yaml("'200?': {}"), &ctx).is_err());

        let templated = ParseContext {
            templated: true,
            ..ctx
        };
        let responses = parse_responses("responses", &yaml("'200?': {}"), &templated).unwrap();
        assert_eq!(responses[0].name, 200u16);
        assert_eq!(responses[0].optionality(), Some(Optionality::Entry));
    }
}
