//! The RAML document object model.
//!
//! Every element of a document is a [`Node`]: a kind, a name, the scalar properties it was declared
//! with, and an ordered list of owned children. What a node of a given kind may contain is described
//! by a static property table (see `schema`), and building a node walks the raw YAML mapping against
//! that table, dispatching each key to a scalar check, a child parser or the pattern property.

pub(crate) mod body;
pub(crate) mod declaration;
pub(crate) mod method;
pub(crate) mod parameter;
pub(crate) mod reference;
pub(crate) mod resource;
pub(crate) mod root;
pub(crate) mod schema;

pub use method::METHOD_NAMES;
pub use parameter::PARAMETER_TYPES;
pub use reference::Reference;

use crate::error::NodeError;
use crate::utils;
use crate::validation;
use schema::NodeSchema;
use serde_yaml::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Root,
    Resource,
    Method,
    /// A method-shaped fragment without a verb: trait instances and `describedBy`.
    AbstractMethod,
    Body,
    Response,
    Header,
    UriParameter,
    BaseUriParameter,
    QueryParameter,
    FormParameter,
    Schema,
    SchemaReference,
    Trait,
    TraitReference,
    ResourceType,
    ResourceTypeReference,
    SecurityScheme,
    SecuritySchemeReference,
    Documentation,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Resource => "resource",
            NodeKind::Method => "method",
            NodeKind::AbstractMethod => "abstract method",
            NodeKind::Body => "body",
            NodeKind::Response => "response",
            NodeKind::Header => "header",
            NodeKind::UriParameter => "URI parameter",
            NodeKind::BaseUriParameter => "base URI parameter",
            NodeKind::QueryParameter => "query parameter",
            NodeKind::FormParameter => "form parameter",
            NodeKind::Schema => "schema",
            NodeKind::SchemaReference => "schema reference",
            NodeKind::Trait => "trait",
            NodeKind::TraitReference => "trait reference",
            NodeKind::ResourceType => "resource type",
            NodeKind::ResourceTypeReference => "resource type reference",
            NodeKind::SecurityScheme => "security scheme",
            NodeKind::SecuritySchemeReference => "security scheme reference",
            NodeKind::Documentation => "documentation",
        }
    }

    pub fn is_parameter(self) -> bool {
        matches!(
            self,
            NodeKind::Header
                | NodeKind::UriParameter
                | NodeKind::BaseUriParameter
                | NodeKind::QueryParameter
                | NodeKind::FormParameter
        )
    }

    /// Kinds that live in name-keyed sibling collections and merge by key.
    pub fn is_keyed(self) -> bool {
        self.is_parameter()
            || matches!(
                self,
                NodeKind::Resource | NodeKind::Method | NodeKind::Body | NodeKind::Response
            )
    }

    pub(crate) fn schema(self) -> &'static NodeSchema {
        match self {
            NodeKind::Root => &root::SCHEMA,
            NodeKind::Resource => &resource::SCHEMA,
            NodeKind::Method => &method::METHOD,
            NodeKind::AbstractMethod => &method::ABSTRACT_METHOD,
            NodeKind::Body => &body::BODY,
            NodeKind::Response => &body::RESPONSE,
            NodeKind::Header
            | NodeKind::UriParameter
            | NodeKind::BaseUriParameter
            | NodeKind::QueryParameter
            | NodeKind::FormParameter => &parameter::SCHEMA,
            NodeKind::SecurityScheme => &declaration::SECURITY_SCHEME,
            NodeKind::Documentation => &declaration::DOCUMENTATION,
            NodeKind::Schema
            | NodeKind::SchemaReference
            | NodeKind::Trait
            | NodeKind::TraitReference
            | NodeKind::ResourceType
            | NodeKind::ResourceTypeReference
            | NodeKind::SecuritySchemeReference => &NodeSchema::EMPTY,
        }
    }

    /// The value an unset scalar property reports.
    pub fn scalar_default(self, name: &str) -> Option<Value> {
        if !self.is_parameter() {
            return None;
        }
        match name {
            "type" => Some(Value::String("string".to_string())),
            "required" => Some(Value::Bool(matches!(
                self,
                NodeKind::UriParameter | NodeKind::BaseUriParameter
            ))),
            "repeat" => Some(Value::Bool(false)),
            _ => None,
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A node's identity: a string for everything except responses, which are keyed by status code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeName {
    Text(String),
    Status(u16),
}

impl NodeName {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeName::Text(s) => Some(s),
            NodeName::Status(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            NodeName::Status(code) => Some(*code),
            NodeName::Text(_) => None,
        }
    }
}

impl Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeName::Text(s) => f.write_str(s),
            NodeName::Status(code) => write!(f, "{code}"),
        }
    }
}

impl From<&str> for NodeName {
    fn from(value: &str) -> Self {
        NodeName::Text(value.to_string())
    }
}

impl From<String> for NodeName {
    fn from(value: String) -> Self {
        NodeName::Text(value)
    }
}

impl From<u16> for NodeName {
    fn from(value: u16) -> Self {
        NodeName::Status(value)
    }
}

impl PartialEq<str> for NodeName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for NodeName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<u16> for NodeName {
    fn eq(&self, other: &u16) -> bool {
        self.status() == Some(*other)
    }
}

/// How a `?`-suffixed key inside a template limits what a merge may add to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optionality {
    /// `get?`, `page?`, `200?`: applies only when the target has the same entry.
    Entry,
    /// `queryParameters?`, `body?`: applies only when the target already has that collection.
    Collection,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Empty,
    /// Raw, uninterpolated body of a trait or resource type.
    Template(Value),
    Reference(Reference),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) name: NodeName,
    pub(crate) scalars: BTreeMap<&'static str, Value>,
    pub(crate) children: Vec<Node>,
    /// Scalar properties declared with a `?` suffix.
    pub(crate) optionals: BTreeSet<&'static str>,
    pub(crate) optional: Option<Optionality>,
    pub(crate) payload: Payload,
}

/// Names declared at the root that decide how ambiguous values are read while building the tree:
/// whether `schema: User` is a reference, whether `is: [paged: {}]` names a trait, and which media
/// type an unkeyed body gets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    pub traits: BTreeSet<String>,
    pub resource_types: BTreeSet<String>,
    pub schemas: BTreeSet<String>,
    pub media_type: Option<String>,
}

impl Declarations {
    /// Collects declared names from the raw root mapping. Shape errors are left for the real parse.
    pub fn from_document(document: &Value) -> Declarations {
        let names = |key: &str| -> BTreeSet<String> {
            let Some(value) = document.get(key) else {
                return BTreeSet::new();
            };
            let maps: Vec<&Value> = match value {
                Value::Sequence(items) => items.iter().collect(),
                Value::Mapping(_) => vec![value],
                _ => Vec::new(),
            };
            maps.into_iter()
                .filter_map(Value::as_mapping)
                .flat_map(|m| m.keys().filter_map(Value::as_str).map(str::to_string))
                .collect()
        };
        Declarations {
            traits: names("traits"),
            resource_types: names("resourceTypes"),
            schemas: names("schemas"),
            media_type: document
                .get("mediaType")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseContext<'a> {
    pub parent: Option<NodeKind>,
    pub declarations: &'a Declarations,
    /// Set while building trait and resource type instances, where `?` keys are allowed.
    pub templated: bool,
}

impl<'a> ParseContext<'a> {
    pub fn new(declarations: &'a Declarations) -> Self {
        ParseContext {
            parent: None,
            declarations,
            templated: false,
        }
    }

    pub fn child(self, parent: NodeKind) -> Self {
        ParseContext {
            parent: Some(parent),
            ..self
        }
    }
}

/// Splits the optional marker off a key; only templates may use it.
pub(crate) fn strip_optional(key: &str, templated: bool) -> (&str, bool) {
    match key.strip_suffix('?') {
        Some(stripped) if templated && !stripped.is_empty() => (stripped, true),
        _ => (key, false),
    }
}

/// Fails when `name` was already produced in the same collection.
pub(crate) fn ensure_unique(
    seen: &mut BTreeSet<String>,
    collection: &str,
    name: &str,
) -> Result<(), NodeError> {
    if !seen.insert(name.to_string()) {
        return Err(NodeError::DuplicateName {
            collection: collection.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

impl Node {
    pub(crate) fn empty(kind: NodeKind, name: NodeName) -> Node {
        Node {
            kind,
            name,
            scalars: BTreeMap::new(),
            children: Vec::new(),
            optionals: BTreeSet::new(),
            optional: None,
            payload: Payload::Empty,
        }
    }

    pub(crate) fn unresolved_reference(
        kind: NodeKind,
        name: &str,
        parameters: BTreeMap<String, Value>,
    ) -> Node {
        let mut node = Node::empty(kind, NodeName::from(name));
        node.payload = Payload::Reference(Reference::Unresolved {
            name: name.to_string(),
            parameters,
        });
        node
    }

    /// Builds a node of `kind` from its raw properties, outside of any document.
    ///
    /// `parent` is the kind of the node this one is declared in; methods and resources require one.
    ///
    /// # Errors
    /// Returns a `NodeError` for unknown keys, malformed values and failed validations.
    pub fn parse(
        kind: NodeKind,
        name: impl Into<NodeName>,
        properties: &Value,
        parent: Option<NodeKind>,
    ) -> Result<Node, NodeError> {
        let declarations = Declarations::default();
        let ctx = ParseContext {
            parent,
            ..ParseContext::new(&declarations)
        };
        Node::build(kind, name.into(), properties, &ctx)
    }

    pub(crate) fn build(
        kind: NodeKind,
        name: NodeName,
        properties: &Value,
        ctx: &ParseContext<'_>,
    ) -> Result<Node, NodeError> {
        let mut node = Node::empty(kind, name);
        let schema = kind.schema();
        let child_ctx = ctx.child(kind);

        let entries = match properties {
            Value::Null => Vec::new(),
            other => validation::string_entries(&node.name.to_string(), other)?,
        };

        for (raw_key, value) in entries {
            let (key, optional) = strip_optional(raw_key, ctx.templated);
            let name = utils::underscore(key);

            if let Some(property) = schema.scalar(&name) {
                if node.scalars.contains_key(property.name) {
                    return Err(NodeError::InvalidProperty {
                        property: key.to_string(),
                        reason: "declared more than once".to_string(),
                    });
                }
                let stored = (property.check)(key, value)?;
                node.scalars.insert(property.name, stored);
                if optional {
                    node.optionals.insert(property.name);
                }
            } else if let Some(property) = schema.non_scalar(&name) {
                let mut children = (property.parse)(key, value, &child_ctx)?;
                if optional {
                    children
                        .iter_mut()
                        .for_each(|c| c.mark_optional(property.optional));
                }
                node.children.append(&mut children);
            } else if let Some(pattern) = schema.pattern().filter(|p| p.matches(key)) {
                let mut children = (pattern.parse)(key, value, &child_ctx)?;
                if optional {
                    children
                        .iter_mut()
                        .for_each(|c| c.mark_optional(Optionality::Entry));
                }
                node.children.append(&mut children);
            } else {
                return Err(NodeError::UnknownProperty {
                    node: format!("{} `{}`", kind, node.name),
                    property: raw_key.to_string(),
                });
            }
        }

        node.ensure_unique_children()?;
        node.validate(ctx)?;
        Ok(node)
    }

    fn ensure_unique_children(&self) -> Result<(), NodeError> {
        let mut seen = BTreeSet::new();
        for child in self.children.iter().filter(|c| c.kind.is_keyed()) {
            if !seen.insert((child.kind, &child.name)) {
                return Err(NodeError::DuplicateName {
                    collection: format!("{} `{}`", self.kind, self.name),
                    name: child.name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate(&mut self, ctx: &ParseContext<'_>) -> Result<(), NodeError> {
        match self.kind {
            NodeKind::Root => root::validate(self),
            NodeKind::Resource => resource::validate(self, ctx),
            NodeKind::Method => method::validate(self, ctx),
            NodeKind::Body => body::validate_body(self),
            NodeKind::Response => body::validate_response(self),
            NodeKind::SecurityScheme => declaration::validate_security_scheme(self),
            NodeKind::Documentation => declaration::validate_documentation(self),
            kind if kind.is_parameter() => parameter::validate(self),
            _ => Ok(()),
        }
    }

    /// Marks this node (and its type alternatives) optional unless a key-level marker is already set.
    pub(crate) fn mark_optional(&mut self, optionality: Optionality) {
        if self.optional.is_none() {
            self.optional = Some(optionality);
        }
        let kind = self.kind;
        if kind.is_parameter() {
            for alternative in self.children.iter_mut().filter(|c| c.kind == kind) {
                alternative.mark_optional(optionality);
            }
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> &NodeName {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// The stored value of a scalar property, by internal (snake_case) name.
    pub fn scalar(&self, name: &str) -> Option<&Value> {
        self.scalars.get(name)
    }

    /// The stored value of a scalar property, falling back to the kind's default.
    pub fn property(&self, name: &str) -> Option<Cow<'_, Value>> {
        match self.scalars.get(name) {
            Some(value) => Some(Cow::Borrowed(value)),
            None => self.kind.scalar_default(name).map(Cow::Owned),
        }
    }

    pub fn str_property(&self, name: &str) -> Option<&str> {
        self.scalar(name).and_then(Value::as_str)
    }

    /// Iterates stored scalars in declaration order of the kind's table.
    pub fn scalars(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.kind
            .schema()
            .scalar_names()
            .into_iter()
            .filter_map(move |name| self.scalars.get(name).map(|v| (name, v)))
    }

    pub fn description(&self) -> Option<&str> {
        self.str_property("description")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.str_property("display_name")
    }

    pub fn optionality(&self) -> Option<Optionality> {
        self.optional
    }

    pub fn is_optional(&self) -> bool {
        self.optional.is_some()
    }

    pub fn reference(&self) -> Option<&Reference> {
        match &self.payload {
            Payload::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    /// The raw body of a trait or resource type declaration.
    pub fn template(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Template(data) => Some(data),
            _ => None,
        }
    }

    fn keyed(&self, kind: NodeKind) -> BTreeMap<String, &Node> {
        self.children_of(kind)
            .map(|c| (c.name.to_string(), c))
            .collect()
    }

    pub fn resources(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::Resource)
    }

    pub fn methods(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::Method)
    }

    pub fn headers(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::Header)
    }

    pub fn query_parameters(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::QueryParameter)
    }

    pub fn uri_parameters(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::UriParameter)
    }

    pub fn base_uri_parameters(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::BaseUriParameter)
    }

    pub fn form_parameters(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::FormParameter)
    }

    pub fn bodies(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::Body)
    }

    pub fn responses(&self) -> BTreeMap<u16, &Node> {
        self.children_of(NodeKind::Response)
            .filter_map(|c| c.name.status().map(|code| (code, c)))
            .collect()
    }

    pub fn schemas(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::Schema)
    }

    pub fn traits(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::Trait)
    }

    pub fn resource_types(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::ResourceType)
    }

    pub fn security_schemes(&self) -> BTreeMap<String, &Node> {
        self.keyed(NodeKind::SecurityScheme)
    }

    pub fn documentation(&self) -> Vec<&Node> {
        self.children_of(NodeKind::Documentation).collect()
    }

    /// The `is:` list in order: trait references and inline traits.
    pub fn applied_traits(&self) -> Vec<&Node> {
        self.children
            .iter()
            .filter(|c| matches!(c.kind, NodeKind::TraitReference | NodeKind::Trait))
            .collect()
    }

    /// The `type:` of a resource: a reference or an inline resource type.
    pub fn resource_type(&self) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| matches!(c.kind, NodeKind::ResourceTypeReference | NodeKind::ResourceType))
    }

    pub fn secured_by(&self) -> Vec<&Node> {
        self.children_of(NodeKind::SecuritySchemeReference).collect()
    }

    /// The schema of a body, inline or referenced.
    pub fn schema(&self) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| matches!(c.kind, NodeKind::Schema | NodeKind::SchemaReference))
    }

    pub fn described_by(&self) -> Option<&Node> {
        self.children_of(NodeKind::AbstractMethod).next()
    }

    /// True for a parameter declared as an array of alternatives, one per type.
    pub fn has_multiple_types(&self) -> bool {
        self.kind.is_parameter() && self.children_of(self.kind).next().is_some()
    }

    pub fn type_alternatives(&self) -> Vec<&Node> {
        if self.kind.is_parameter() {
            self.children_of(self.kind).collect()
        } else {
            Vec::new()
        }
    }

    /// The declared type of a single-type parameter, `"string"` when unset.
    pub fn parameter_type(&self) -> Option<&str> {
        if !self.kind.is_parameter() || self.has_multiple_types() {
            return None;
        }
        Some(self.str_property("type").unwrap_or("string"))
    }

    pub fn is_required(&self) -> bool {
        self.property("required")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn is_repeat(&self) -> bool {
        self.property("repeat")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}
