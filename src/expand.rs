//! Resolution of resource types, traits, security schemes and schema references.
//!
//! Expansion walks every resource depth first. A resource first receives its resource type (and,
//! through it, the chain of types that type inherits from); then every method receives the traits
//! listed on its resource followed by its own, applied right to left so that the rightmost trait
//! has the highest precedence after the method itself.

use crate::error::{ExpansionError, RamlError};
use crate::nodes::resource::resource_path_name;
use crate::nodes::{Declarations, Node, NodeKind, NodeName, ParseContext, Payload};
use crate::template::{self, Parameters};
use crate::validation;
use log::debug;
use std::collections::BTreeMap;

/// Declarations of the root, looked up by name while expanding.
struct Catalog<'a> {
    traits: BTreeMap<String, Node>,
    resource_types: BTreeMap<String, Node>,
    security_schemes: BTreeMap<String, Node>,
    schemas: BTreeMap<String, Node>,
    declarations: &'a Declarations,
}

impl<'a> Catalog<'a> {
    fn new(root: &Node, declarations: &'a Declarations) -> Self {
        let collect = |kind: NodeKind| -> BTreeMap<String, Node> {
            root.children_of(kind)
                .map(|n| (n.name().to_string(), n.clone()))
                .collect()
        };
        Catalog {
            traits: collect(NodeKind::Trait),
            resource_types: collect(NodeKind::ResourceType),
            security_schemes: collect(NodeKind::SecurityScheme),
            schemas: collect(NodeKind::Schema),
            declarations,
        }
    }

    fn template_context(&self, parent: NodeKind) -> ParseContext<'a> {
        ParseContext {
            templated: true,
            ..ParseContext::new(self.declarations).child(parent)
        }
    }
}

/// Expands `root` in place. Callers guard against running this twice.
pub(crate) fn expand(root: &mut Node, declarations: &Declarations) -> Result<(), RamlError> {
    let catalog = Catalog::new(root, declarations);
    for resource in root
        .children
        .iter_mut()
        .filter(|c| c.kind == NodeKind::Resource)
    {
        expand_resource(resource, "", &catalog)?;
    }
    resolve_security_schemes(root, &catalog)?;
    splice_schemas(root, &catalog)?;
    Ok(())
}

fn expand_resource(resource: &mut Node, parent_path: &str, catalog: &Catalog<'_>) -> Result<(), RamlError> {
    let path = format!("{parent_path}{}", resource.name);
    apply_resource_type(resource, &path, catalog)?;
    apply_traits(resource, &path, catalog)?;
    for nested in resource
        .children
        .iter_mut()
        .filter(|c| c.kind == NodeKind::Resource)
    {
        expand_resource(nested, &path, catalog)?;
    }
    Ok(())
}

/// Template parameters bound where a template is applied, plus the reserved ones. Non-scalar
/// values, such as OAuth scopes, are not bound.
fn bind_parameters(applied: &Node, reserved: &[(&str, &str)]) -> Parameters {
    let mut parameters: Parameters = applied
        .reference()
        .map(|r| {
            r.parameters()
                .iter()
                .filter_map(|(k, v)| validation::scalar_to_string(v).map(|v| (k.clone(), v)))
                .collect()
        })
        .unwrap_or_default();
    for (name, value) in reserved {
        parameters.insert(name.to_string(), value.to_string());
    }
    parameters
}

/// The declaration a reference or inline template stands for, and the name to report it by.
fn lookup<'n>(
    applied: &'n Node,
    declared: &'n BTreeMap<String, Node>,
    unknown: impl Fn(&str) -> ExpansionError,
) -> Result<(&'n str, &'n Node), ExpansionError> {
    match applied.reference() {
        Some(reference) => declared
            .get(reference.name())
            .map(|declaration| (reference.name(), declaration))
            .ok_or_else(|| unknown(reference.name())),
        None => Ok(("inline", applied)),
    }
}

fn apply_resource_type(resource: &mut Node, path: &str, catalog: &Catalog<'_>) -> Result<(), RamlError> {
    let Some(applied) = resource.resource_type().cloned() else {
        return Ok(());
    };
    let mut chain = Vec::new();
    let instance = resource_type_instance(&applied, path, catalog, &mut chain)?;
    resource.merge(&instance)?;
    mark_resolved(resource, NodeKind::ResourceTypeReference, &catalog.resource_types);
    Ok(())
}

/// Builds the resource described by `applied`, with the types it inherits from already merged in.
fn resource_type_instance(
    applied: &Node,
    path: &str,
    catalog: &Catalog<'_>,
    chain: &mut Vec<String>,
) -> Result<Node, RamlError> {
    let (name, declaration) = lookup(applied, &catalog.resource_types, |name| {
        ExpansionError::UnknownResourceType {
            name: name.to_string(),
        }
    })?;
    if chain.iter().any(|n| n == name) {
        chain.push(name.to_string());
        return Err(ExpansionError::ResourceTypeCycle {
            chain: chain.join(" -> "),
        }
        .into());
    }
    chain.push(name.to_string());
    debug!("applying resource type `{name}` to `{path}`");

    let path_name = resource_path_name(path);
    let parameters = bind_parameters(
        applied,
        &[("resourcePath", path), ("resourcePathName", path_name.as_str())],
    );
    let data = declaration.template().cloned().unwrap_or_default();
    let body = template::instance_body(name, &data, &parameters)?;
    let mut instance = Node::build(
        NodeKind::Resource,
        NodeName::from(name),
        &body,
        &catalog.template_context(NodeKind::Root),
    )?;

    if let Some(inherited) = instance.resource_type().cloned() {
        let base = resource_type_instance(&inherited, path, catalog, chain)?;
        instance.merge(&base)?;
        mark_resolved(&mut instance, NodeKind::ResourceTypeReference, &catalog.resource_types);
    }
    chain.pop();
    Ok(instance)
}

fn unknown_trait(name: &str) -> ExpansionError {
    ExpansionError::UnknownTrait {
        name: name.to_string(),
    }
}

fn apply_traits(resource: &mut Node, path: &str, catalog: &Catalog<'_>) -> Result<(), RamlError> {
    let resource_traits: Vec<Node> = resource.applied_traits().into_iter().cloned().collect();
    for applied in &resource_traits {
        lookup(applied, &catalog.traits, unknown_trait)?;
    }
    let path_name = resource_path_name(path);

    for method in resource
        .children
        .iter_mut()
        .filter(|c| c.kind == NodeKind::Method)
    {
        let method_name = method.name.to_string();
        let mut traits = resource_traits.clone();
        traits.extend(method.applied_traits().into_iter().cloned());

        for applied in traits.iter().rev() {
            let (name, declaration) = lookup(applied, &catalog.traits, unknown_trait)?;
            debug!("applying trait `{name}` to {method_name} `{path}`");
            let parameters = bind_parameters(
                applied,
                &[
                    ("resourcePath", path),
                    ("resourcePathName", path_name.as_str()),
                    ("methodName", method_name.as_str()),
                ],
            );
            let data = declaration.template().cloned().unwrap_or_default();
            let body = template::instance_body(name, &data, &parameters)?;
            let instance = Node::build(
                NodeKind::AbstractMethod,
                NodeName::from(name),
                &body,
                &catalog.template_context(NodeKind::Resource),
            )?;
            method.merge(&instance)?;
        }
        mark_resolved(method, NodeKind::TraitReference, &catalog.traits);
    }
    mark_resolved(resource, NodeKind::TraitReference, &catalog.traits);
    Ok(())
}

/// Swaps the unresolved references of `kind` among the children of `node` for resolved ones.
fn mark_resolved(node: &mut Node, kind: NodeKind, declared: &BTreeMap<String, Node>) {
    for child in node.children.iter_mut().filter(|c| c.kind == kind) {
        if let Payload::Reference(reference) = &child.payload {
            if let (false, Some(target)) = (reference.is_resolved(), declared.get(reference.name())) {
                child.payload = Payload::Reference(reference.resolve(target.clone()));
            }
        }
    }
}

/// Resolves every `securedBy` entry to the scheme it names, with the entry's parameters
/// substituted into the scheme's body.
fn resolve_security_schemes(node: &mut Node, catalog: &Catalog<'_>) -> Result<(), RamlError> {
    for child in node.children.iter_mut() {
        if child.kind == NodeKind::SecuritySchemeReference {
            let Payload::Reference(reference) = &child.payload else {
                continue;
            };
            if reference.name() == "null" || reference.is_resolved() {
                continue;
            }
            let name = reference.name();
            let Some(scheme) = catalog.security_schemes.get(name) else {
                return Err(ExpansionError::UnknownSecurityScheme {
                    name: name.to_string(),
                }
                .into());
            };
            let target = match scheme.template() {
                Some(data) => {
                    let body = template::instance_body(name, data, &bind_parameters(child, &[]))?;
                    Node::build(
                        NodeKind::SecurityScheme,
                        NodeName::from(name),
                        &body,
                        &catalog.template_context(NodeKind::Root),
                    )?
                }
                None => scheme.clone(),
            };
            child.payload = Payload::Reference(reference.resolve(target));
        } else {
            resolve_security_schemes(child, catalog)?;
        }
    }
    Ok(())
}

/// Replaces every schema reference by a copy of the schema it names.
fn splice_schemas(node: &mut Node, catalog: &Catalog<'_>) -> Result<(), ExpansionError> {
    for child in node.children.iter_mut() {
        if child.kind == NodeKind::SchemaReference {
            let name = child.reference().map(|r| r.name().to_string()).unwrap_or_default();
            let Some(schema) = catalog.schemas.get(&name) else {
                return Err(ExpansionError::UnknownSchema { name });
            };
            *child = schema.clone();
        } else {
            splice_schemas(child, catalog)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    #[test]
    fn test_reserved_parameters_win() {
        let mut bound = BTreeMap::new();
        bound.insert("resourcePath".to_string(), Value::String("/spoofed".to_string()));
        bound.insert("size".to_string(), serde_yaml::from_str::<Value>("10").unwrap());
        let applied = Node::unresolved_reference(NodeKind::TraitReference, "paged", bound);
        let parameters = bind_parameters(&applied, &[("resourcePath", "/users")]);
        assert_eq!(parameters["resourcePath"], "/users");
        assert_eq!(parameters["size"], "10");
    }

    #[test]
    fn test_inline_templates_need_no_lookup() {
        let inline = crate::nodes::declaration::template_node(
            NodeKind::Trait,
            "inline",
            &serde_yaml::from_str::<Value>("description: x").unwrap(),
        )
        .unwrap();
        let declared = BTreeMap::new();
        let (name, declaration) = lookup(&inline, &declared, |name| ExpansionError::UnknownTrait {
            name: name.to_string(),
        })
        .unwrap();
        assert_eq!(name, "inline");
        assert_eq!(declaration, &inline);
    }
}
