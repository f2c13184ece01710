use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum RamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expansion(#[from] ExpansionError),
}

/// Errors raised before any node is built: the version header, the YAML layer and `!include`.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum LoaderError {
    #[error("Unsupported RAML version: `{found}`")]
    #[diagnostic(
        code(loader::unsupported_version),
        help("The first line of the document must be exactly `#%RAML 0.8`.")
    )]
    UnsupportedVersion { found: String },

    #[error("Invalid YAML: {message}")]
    #[diagnostic(code(loader::yaml))]
    Yaml { message: String },

    #[error("Invalid document: {reason}")]
    #[diagnostic(
        code(loader::invalid_document),
        help("A RAML document must decode to a mapping at the top level.")
    )]
    InvalidDocument { reason: String },

    #[error("Cannot include file `{path}`: {reason}")]
    #[diagnostic(
        code(loader::cannot_include_file),
        help("Include paths are resolved relative to the directory of the including file.")
    )]
    CannotIncludeFile { path: String, reason: String },

    #[error("Circular include detected: {cycle}")]
    #[diagnostic(
        code(loader::circular_include),
        help("An included file directly or indirectly includes itself.")
    )]
    CircularInclude { cycle: String },
}

/// Errors raised while building and validating the node tree.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum NodeError {
    #[error("Unknown property `{property}` on {node}")]
    #[diagnostic(
        code(node::unknown_property),
        help("The key does not match any property this node accepts.")
    )]
    UnknownProperty { node: String, property: String },

    #[error("Invalid property `{property}`: {reason}")]
    #[diagnostic(code(node::invalid_property))]
    InvalidProperty { property: String, reason: String },

    #[error("Invalid attribute `{attribute}` on parameter `{parameter}`: {reason}")]
    #[diagnostic(code(node::invalid_parameter_attribute))]
    InvalidParameterAttribute {
        parameter: String,
        attribute: String,
        reason: String,
    },

    #[error("Invalid media type `{media_type}`")]
    #[diagnostic(
        code(node::invalid_media_type),
        help("Media types look like `type/subtype`, for example `application/json`.")
    )]
    InvalidMediaType { media_type: String },

    #[error("Invalid method `{name}`")]
    #[diagnostic(
        code(node::invalid_method),
        help("Methods must be one of options, get, head, post, put, delete, trace, connect or patch.")
    )]
    InvalidMethod { name: String },

    #[error("Missing required property `{property}` on {node}")]
    #[diagnostic(code(node::required_property_missing))]
    RequiredPropertyMissing { node: String, property: String },

    #[error("Duplicate name `{name}` in `{collection}`")]
    #[diagnostic(
        code(node::duplicate_name),
        help("Names must be unique within their declaring collection.")
    )]
    DuplicateName { collection: String, name: String },

    #[error("{node} `{name}` must be declared inside a parent node")]
    #[diagnostic(code(node::missing_parent))]
    MissingParent { node: String, name: String },
}

/// Errors raised by `Root::expand`: reference lookups, template interpolation and merges.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ExpansionError {
    #[error("Unknown trait `{name}`")]
    #[diagnostic(
        code(expansion::unknown_trait),
        help("Traits used with `is:` must be declared under the root `traits` property.")
    )]
    UnknownTrait { name: String },

    #[error("Unknown resource type `{name}`")]
    #[diagnostic(
        code(expansion::unknown_resource_type),
        help("Resource types used with `type:` must be declared under the root `resourceTypes` property.")
    )]
    UnknownResourceType { name: String },

    #[error("Unknown security scheme `{name}`")]
    #[diagnostic(
        code(expansion::unknown_security_scheme),
        help("Schemes used with `securedBy:` must be declared under the root `securitySchemes` property.")
    )]
    UnknownSecurityScheme { name: String },

    #[error("Unknown schema `{name}`")]
    #[diagnostic(code(expansion::unknown_schema))]
    UnknownSchema { name: String },

    #[error("Unknown parameter `{parameter}` in template `{template}`")]
    #[diagnostic(
        code(expansion::unknown_template_parameter),
        help("Every `<<parameter>>` used by a trait or resource type must be bound where it is applied.")
    )]
    UnknownTemplateParameter { template: String, parameter: String },

    #[error("Unknown function `{function}` in template `{template}`")]
    #[diagnostic(
        code(expansion::unknown_template_function),
        help("Only `!singularize` and `!pluralize` are supported.")
    )]
    UnknownTemplateFunction { template: String, function: String },

    #[error("Cannot merge {source_node} into {target}: {reason}")]
    #[diagnostic(code(expansion::merge))]
    Merge {
        target: String,
        source_node: String,
        reason: String,
    },

    #[error("Resource type cycle: {chain}")]
    #[diagnostic(code(expansion::resource_type_cycle))]
    ResourceTypeCycle { chain: String },
}
