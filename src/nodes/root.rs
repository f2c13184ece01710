use super::schema::{self, NodeSchema, NonScalarProperty, PatternProperty, ScalarProperty};
use super::{body, declaration, parameter, reference, resource, Node, Optionality};
use crate::error::NodeError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub(crate) static SCHEMA: NodeSchema = NodeSchema {
    base: None,
    scalars: &[
        ScalarProperty {
            name: "title",
            check: schema::non_empty_string,
        },
        ScalarProperty {
            name: "version",
            check: schema::string_or_number,
        },
        ScalarProperty {
            name: "base_uri",
            check: schema::non_empty_string,
        },
        ScalarProperty {
            name: "protocols",
            check: schema::protocols,
        },
        ScalarProperty {
            name: "media_type",
            check: body::media_type,
        },
    ],
    non_scalars: &[
        NonScalarProperty {
            name: "base_uri_parameters",
            parse: parameter::parse_base_uri_parameters,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "documentation",
            parse: declaration::parse_documentation,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "schemas",
            parse: declaration::parse_schemas,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "traits",
            parse: declaration::parse_traits,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "resource_types",
            parse: declaration::parse_resource_types,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "security_schemes",
            parse: declaration::parse_security_schemes,
            optional: Optionality::Collection,
        },
        NonScalarProperty {
            name: "secured_by",
            parse: reference::parse_secured_by,
            optional: Optionality::Collection,
        },
    ],
    pattern: Some(PatternProperty {
        pattern: resource::resource_key,
        parse: resource::parse_resource,
    }),
};

fn template_variable() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("template variable pattern is valid"))
}

/// Names of the `{variables}` in a URI template, in order of appearance.
pub fn uri_template_variables(uri: &str) -> Vec<String> {
    template_variable()
        .captures_iter(uri)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn missing(property: &str) -> NodeError {
    NodeError::RequiredPropertyMissing {
        node: "root".to_string(),
        property: property.to_string(),
    }
}

pub(crate) fn validate(node: &mut Node) -> Result<(), NodeError> {
    if node.str_property("title").is_none() {
        return Err(missing("title"));
    }
    let Some(base_uri) = node.str_property("base_uri") else {
        return Err(missing("baseUri"));
    };
    validate_base_uri(base_uri, node.scalar("version").is_some())
}

/// A base URI is an absolute URL once its template variables are filled in; a `{version}`
/// variable is bound from the root `version` property, so that property must exist.
fn validate_base_uri(uri: &str, has_version: bool) -> Result<(), NodeError> {
    if uri_template_variables(uri).iter().any(|v| v == "version") && !has_version {
        return Err(missing("version"));
    }
    let concrete = template_variable().replace_all(uri, "placeholder");
    Url::parse(&concrete).map_err(|e| NodeError::InvalidProperty {
        property: "baseUri".to_string(),
        reason: format!("`{uri}` is not a valid URL: {e}"),
    })?;
    Ok(())
}
