use crate::error::{LoaderError, RamlError};
use crate::expand;
use crate::loader::{self, Loader};
use crate::nodes::{Declarations, Node, NodeKind, NodeName, ParseContext};
use crate::serialization::{to_value, Value};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use url::Url;

/// A parsed RAML document.
///
/// The root node owns the whole tree. Right after parsing, traits and resource types are still
/// references; [`Root::expand`] applies them.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    node: Node,
    declarations: Declarations,
    expanded: bool,
}

impl Serialize for Root {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = self.to_value();
        value.serialize(serializer)
    }
}

impl Root {
    /// Builds the tree from an already loaded document, with includes resolved.
    ///
    /// # Errors
    /// Returns a `RamlError` when the document is not a mapping or any node fails validation.
    pub fn from_value(document: &serde_yaml::Value) -> Result<Root, RamlError> {
        if !document.is_mapping() {
            return Err(LoaderError::InvalidDocument {
                reason: "the top level is not a mapping".to_string(),
            }
            .into());
        }
        let declarations = Declarations::from_document(document);
        let ctx = ParseContext::new(&declarations);
        let node = Node::build(NodeKind::Root, NodeName::from("root"), document, &ctx)?;
        Ok(Root {
            node,
            declarations,
            expanded: false,
        })
    }

    /// Applies resource types and traits, and resolves security scheme and schema references.
    /// Running it again does nothing. On error the tree is left exactly as it was.
    ///
    /// # Errors
    /// Returns a `RamlError` for unknown references, unbound template parameters, instances that do
    /// not validate and merges between incompatible nodes.
    pub fn expand(&mut self) -> Result<(), RamlError> {
        if self.expanded {
            return Ok(());
        }
        let mut node = self.node.clone();
        expand::expand(&mut node, &self.declarations)?;
        self.node = node;
        self.expanded = true;
        Ok(())
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    #[must_use]
    pub fn node(&self) -> &Node {
        &self.node
    }

    #[must_use]
    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.node.str_property("title").unwrap_or_default()
    }

    #[must_use]
    pub fn base_uri(&self) -> &str {
        self.node.str_property("base_uri").unwrap_or_default()
    }

    /// The version, rendered as a string when written as a number.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.node
            .scalar("version")
            .and_then(crate::validation::scalar_to_string)
    }

    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.node.str_property("media_type")
    }

    /// The declared protocols, or the scheme of the base URI when none are declared.
    #[must_use]
    pub fn protocols(&self) -> Vec<String> {
        if let Some(serde_yaml::Value::Sequence(items)) = self.node.scalar("protocols") {
            return items
                .iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect();
        }
        let concrete = self.base_uri().replace(['{', '}'], "");
        Url::parse(&concrete)
            .map(|url| vec![url.scheme().to_uppercase()])
            .unwrap_or_default()
    }

    /// Looks a resource up by its full path, e.g. `/users/{userId}`.
    #[must_use]
    pub fn resource(&self, path: &str) -> Option<&Node> {
        find_resource(&self.node, path)
    }

    /// Serializes the tree into a generic, serializable `Value`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        to_value(&self.node)
    }

    /// Serializes the tree into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the tree into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

fn find_resource<'a>(node: &'a Node, path: &str) -> Option<&'a Node> {
    node.children_of(NodeKind::Resource).find_map(|child| {
        let name = child.name().to_string();
        if name == path {
            Some(child)
        } else {
            path.strip_prefix(name.as_str())
                .filter(|rest| rest.starts_with('/'))
                .and_then(|rest| find_resource(child, rest))
        }
    })
}

/// Parses a RAML source string into a [`Root`]. The document is not expanded.
///
/// # Arguments
///
/// * `source` - The RAML document, starting with the `#%RAML 0.8` header.
/// * `file_name` - Where the document lives; `!include` paths are resolved against its directory.
///
/// # Errors
///
/// Returns a `RamlError` if loading, decoding or validation fails.
pub fn parse(source: &str, file_name: &str) -> Result<Root, RamlError> {
    let mut path = PathBuf::from(file_name);
    if path.is_relative() {
        if let Ok(current_dir) = std::env::current_dir() {
            path = current_dir.join(path);
        }
    }
    let document = Loader::new().load(source, &path)?;
    Root::from_value(&document)
}

/// Reads and parses the RAML file at `path`.
///
/// # Errors
///
/// Returns a `RamlError` if the file cannot be read or [`parse`] fails.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Root, RamlError> {
    let document = loader::load_file(path.as_ref())?;
    Root::from_value(&document)
}
