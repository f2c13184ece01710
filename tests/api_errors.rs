// API error path tests
// These check that each failure surfaces through `parse`/`expand` as the right error layer and variant

use raml_core::{parse, ExpansionError, LoaderError, NodeError, RamlError};

fn parse_err(source: &str) -> RamlError {
    match parse(source, "api.raml") {
        Ok(_) => panic!("expected an error for:\n{source}"),
        Err(e) => e,
    }
}

fn expand_err(source: &str) -> RamlError {
    let mut root = parse(source, "api.raml").unwrap_or_else(|e| panic!("{:?}", miette::Report::new(e)));
    match root.expand() {
        Ok(()) => panic!("expected an expansion error for:\n{source}"),
        Err(e) => e,
    }
}

const HEADER: &str = "#%RAML 0.8\ntitle: Example\nbaseUri: http://example.com\n";

fn with_header(rest: &str) -> String {
    format!("{HEADER}{rest}")
}

#[test]
fn test_wrong_version_header() {
    let err = parse_err("#%RAML 1.0\ntitle: x\nbaseUri: http://x.com\n");
    assert!(matches!(
        err,
        RamlError::Loader(LoaderError::UnsupportedVersion { found }) if found == "#%RAML 1.0"
    ));
}

#[test]
fn test_missing_header() {
    let err = parse_err("title: x\nbaseUri: http://x.com\n");
    assert!(matches!(
        err,
        RamlError::Loader(LoaderError::UnsupportedVersion { .. })
    ));
}

#[test]
fn test_title_required() {
    let err = parse_err("#%RAML 0.8\nbaseUri: http://x.com\n");
    assert_eq!(
        err,
        RamlError::Node(NodeError::RequiredPropertyMissing {
            node: "root".to_string(),
            property: "title".to_string()
        })
    );
}

#[test]
fn test_base_uri_required() {
    let err = parse_err("#%RAML 0.8\ntitle: x\n");
    assert!(matches!(
        err,
        RamlError::Node(NodeError::RequiredPropertyMissing { property, .. }) if property == "baseUri"
    ));
}

#[test]
fn test_empty_title() {
    let err = parse_err("#%RAML 0.8\ntitle: ''\nbaseUri: http://x.com\n");
    assert!(matches!(err, RamlError::Node(NodeError::InvalidProperty { .. })));
}

#[test]
fn test_version_required_by_base_uri() {
    let err = parse_err("#%RAML 0.8\ntitle: x\nbaseUri: http://x.com/{version}\n");
    assert!(matches!(
        err,
        RamlError::Node(NodeError::RequiredPropertyMissing { property, .. }) if property == "version"
    ));
}

#[test]
fn test_unknown_root_property() {
    let err = parse_err(&with_header("titel: typo\n"));
    assert!(matches!(
        err,
        RamlError::Node(NodeError::UnknownProperty { property, .. }) if property == "titel"
    ));
}

#[test]
fn test_invalid_method() {
    let err = parse_err(&with_header("/users:\n  fetch:\n"));
    assert!(matches!(err, RamlError::Node(NodeError::UnknownProperty { .. })));
}

#[test]
fn test_invalid_protocol() {
    let err = parse_err(&with_header("protocols: [FTP]\n"));
    assert!(matches!(err, RamlError::Node(NodeError::InvalidProperty { .. })));
}

#[test]
fn test_invalid_root_media_type() {
    let err = parse_err(&with_header("mediaType: json\n"));
    assert!(matches!(err, RamlError::Node(NodeError::InvalidMediaType { .. })));
}

#[test]
fn test_duplicate_declarations() {
    let err = parse_err(&with_header("traits:\n  - paged: {}\n  - paged: {}\n"));
    assert!(matches!(err, RamlError::Node(NodeError::DuplicateName { .. })));
}

#[test]
fn test_version_as_base_uri_parameter() {
    let err = parse_err(&with_header("baseUriParameters:\n  version: {}\n"));
    assert!(matches!(err, RamlError::Node(NodeError::InvalidProperty { .. })));
}

#[test]
fn test_unknown_resource_type() {
    let err = expand_err(&with_header("/users:\n  type: collection\n"));
    assert_eq!(
        err,
        RamlError::Expansion(ExpansionError::UnknownResourceType {
            name: "collection".to_string()
        })
    );
}

#[test]
fn test_unknown_trait() {
    let err = expand_err(&with_header("/users:\n  get:\n    is: [paged]\n"));
    assert!(matches!(
        err,
        RamlError::Expansion(ExpansionError::UnknownTrait { name }) if name == "paged"
    ));
}

#[test]
fn test_unknown_trait_on_resource_without_methods() {
    let err = expand_err(&with_header("/users:\n  is: [nope]\n"));
    assert_eq!(
        err,
        RamlError::Expansion(ExpansionError::UnknownTrait {
            name: "nope".to_string()
        })
    );
}

#[test]
fn test_failed_expand_leaves_tree_untouched() {
    let source = with_header(
        "resourceTypes:\n  - coll: { description: from type }\n/a:\n  type: coll\n/b:\n  type: missing\n",
    );
    let mut root = parse(&source, "api.raml").unwrap_or_else(|e| panic!("{:?}", miette::Report::new(e)));
    let before = root.clone();
    let err = root.expand().unwrap_err();
    assert!(matches!(
        err,
        RamlError::Expansion(ExpansionError::UnknownResourceType { name }) if name == "missing"
    ));
    assert_eq!(root, before);
    assert!(!root.is_expanded());
    assert_eq!(root.resource("/a").unwrap().description(), None);
}

#[test]
fn test_unknown_security_scheme() {
    let err = expand_err(&with_header("securedBy: [oauth]\n"));
    assert!(matches!(
        err,
        RamlError::Expansion(ExpansionError::UnknownSecurityScheme { name }) if name == "oauth"
    ));
}

#[test]
fn test_unbound_template_parameter() {
    let err = expand_err(&with_header(
        "traits:\n  - paged:\n      queryParameters:\n        <<sizeName>>: {}\n/users:\n  get:\n    is: [paged]\n",
    ));
    assert!(matches!(
        err,
        RamlError::Expansion(ExpansionError::UnknownTemplateParameter { template, parameter })
            if template == "paged" && parameter == "sizeName"
    ));
}

#[test]
fn test_unknown_template_function() {
    let err = expand_err(&with_header(
        "resourceTypes:\n  - collection:\n      description: <<resourcePathName | !shout>>\n/users:\n  type: collection\n",
    ));
    assert!(matches!(
        err,
        RamlError::Expansion(ExpansionError::UnknownTemplateFunction { function, .. }) if function == "shout"
    ));
}

#[test]
fn test_invalid_trait_instance() {
    let err = expand_err(&with_header(
        "traits:\n  - broken:\n      queryParameters:\n        page: { type: <<kind>> }\n/users:\n  get:\n    is: [broken: { kind: uuid }]\n",
    ));
    assert!(matches!(
        err,
        RamlError::Node(NodeError::InvalidParameterAttribute { .. })
    ));
}

#[test]
fn test_resource_type_cycle() {
    let err = expand_err(&with_header(
        "resourceTypes:\n  - a:\n      type: b\n  - b:\n      type: a\n/users:\n  type: a\n",
    ));
    assert!(matches!(
        err,
        RamlError::Expansion(ExpansionError::ResourceTypeCycle { chain }) if chain == "a -> b -> a"
    ));
}

#[test]
fn test_errors_render_as_diagnostics() {
    let err = parse_err("#%RAML 0.8\nbaseUri: http://x.com\n");
    let report = miette::Report::new(err);
    assert!(format!("{report:?}").contains("title"));
}
