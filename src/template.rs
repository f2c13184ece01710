//! `<<parameter>>` interpolation for traits and resource types.
//!
//! A placeholder is `<<name>>` or `<<name | !function>>`, where the function is `singularize` or
//! `pluralize`. Placeholders are replaced in mapping keys and in string values at any depth. The
//! template data itself is never modified; every application produces a fresh copy.

use crate::error::ExpansionError;
use crate::utils;
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Parameter values bound to a template application, already rendered as strings.
pub type Parameters = BTreeMap<String, String>;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<<\s*([^\s|>]+)\s*(?:\|\s*(!?)\s*([^\s>]+)\s*)?>>")
            .expect("placeholder pattern is valid")
    })
}

/// Produces a fresh `(name, data)` pair from a template, with every placeholder substituted.
pub fn instantiate(
    name: &str,
    data: &Value,
    parameters: &Parameters,
) -> Result<(String, Value), ExpansionError> {
    let interpolated_name = interpolate_str(name, name, parameters)?;
    let interpolated = interpolate(name, data, parameters)?;
    Ok((interpolated_name, interpolated))
}

/// Like [`instantiate`] but drops the template's `usage` documentation from the result.
pub fn instance_body(
    name: &str,
    data: &Value,
    parameters: &Parameters,
) -> Result<Value, ExpansionError> {
    let (_, body) = instantiate(name, data, parameters)?;
    Ok(match body {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .filter(|(key, _)| key.as_str() != Some("usage"))
                .collect(),
        ),
        other => other,
    })
}

pub fn interpolate(
    template: &str,
    value: &Value,
    parameters: &Parameters,
) -> Result<Value, ExpansionError> {
    Ok(match value {
        Value::String(s) => Value::String(interpolate_str(template, s, parameters)?),
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| interpolate(template, item, parameters))
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(map) => {
            let mut interpolated = Mapping::with_capacity(map.len());
            for (key, item) in map {
                interpolated.insert(
                    interpolate(template, key, parameters)?,
                    interpolate(template, item, parameters)?,
                );
            }
            Value::Mapping(interpolated)
        }
        Value::Tagged(tagged) => {
            let mut tagged = tagged.clone();
            tagged.value = interpolate(template, &tagged.value, parameters)?;
            Value::Tagged(tagged)
        }
        other => other.clone(),
    })
}

pub fn interpolate_str(
    template: &str,
    text: &str,
    parameters: &Parameters,
) -> Result<String, ExpansionError> {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for caps in placeholder().captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        result.push_str(&text[last..whole.start]);
        result.push_str(&substitute(template, &caps, parameters)?);
        last = whole.end;
    }
    result.push_str(&text[last..]);
    Ok(result)
}

fn substitute(
    template: &str,
    caps: &Captures<'_>,
    parameters: &Parameters,
) -> Result<String, ExpansionError> {
    let parameter = &caps[1];
    let Some(value) = parameters.get(parameter) else {
        return Err(ExpansionError::UnknownTemplateParameter {
            template: template.to_string(),
            parameter: parameter.to_string(),
        });
    };
    let Some(function) = caps.get(3).map(|m| m.as_str()) else {
        return Ok(value.clone());
    };
    match (&caps[2], function) {
        ("!", "singularize") => Ok(utils::singularize(value)),
        ("!", "pluralize") => Ok(utils::pluralize(value)),
        _ => Err(ExpansionError::UnknownTemplateFunction {
            template: template.to_string(),
            function: function.to_string(),
        }),
    }
}
