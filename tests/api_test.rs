use raml_core::{parse, NodeKind, Root};

fn parse_ok(source: &str) -> Root {
    parse(source, "api.raml").unwrap_or_else(|e| panic!("{:?}", miette::Report::new(e)))
}

#[test]
fn test_minimal_document_to_json() {
    let source = r#"#%RAML 0.8
title: World Music API
baseUri: http://example.api.com/{version}
version: v1
"#;

    let expected_json = serde_json::json!({
        "title": "World Music API",
        "baseUri": "http://example.api.com/{version}",
        "version": "v1",
    });

    let root = parse_ok(source);
    let result = root.to_json().unwrap();
    let result_json: serde_json::Value = serde_json::from_str(&result).unwrap();

    assert_eq!(result_json, expected_json);
}

#[test]
fn test_document_to_yaml() {
    let source = r#"#%RAML 0.8
title: Jukebox
baseUri: https://jukebox.example.com
protocols: [https]
mediaType: application/json
/songs:
  get:
    queryParameters:
      genre:
        enum: [rock, jazz]
    responses:
      200:
        body:
          example: '[]'
"#;

    let root = parse_ok(source);
    let yaml = root.to_yaml().unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

    assert_eq!(value["protocols"], serde_yaml::from_str::<serde_yaml::Value>("[HTTPS]").unwrap());
    let get = &value["/songs"]["get"];
    assert_eq!(
        get["queryParameters"]["genre"]["enum"],
        serde_yaml::from_str::<serde_yaml::Value>("[rock, jazz]").unwrap()
    );
    assert_eq!(
        get["responses"]["200"]["body"]["application/json"]["example"],
        serde_yaml::Value::String("[]".to_string())
    );
}

#[test]
fn test_navigating_the_tree() {
    let source = r#"#%RAML 0.8
title: Users
baseUri: https://api.example.com
documentation:
  - title: Overview
    content: Manage users.
/users:
  displayName: Users
  post:
    headers:
      X-Request-Id:
        required: true
    body:
      application/json:
        example: '{"name": "ada"}'
    responses:
      201:
  /{userId}:
    uriParameters:
      userId:
        type: integer
    get:
    delete:
"#;

    let root = parse_ok(source);
    let node = root.node();
    assert_eq!(node.documentation().len(), 1);

    let users = node.resources()["/users"];
    assert_eq!(users.display_name(), Some("Users"));
    let post = users.methods()["post"];
    assert!(post.headers()["X-Request-Id"].is_required());
    assert!(post.bodies().contains_key("application/json"));

    let created = post.responses()[&201];
    assert_eq!(created.name(), &201u16);
    assert!(created.bodies().is_empty());
    assert!(created.headers().is_empty());

    let item = users.resources()["/{userId}"];
    let user_id = item.uri_parameters()["userId"];
    assert_eq!(user_id.kind(), NodeKind::UriParameter);
    assert!(user_id.is_required());
    assert_eq!(user_id.parameter_type(), Some("integer"));
    assert_eq!(
        item.methods().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["delete", "get"]
    );
}

#[test]
fn test_response_200_with_nothing_declared() {
    let source = "#%RAML 0.8\ntitle: x\nbaseUri: http://x.com\n/a:\n  get:\n    responses:\n      200:\n";
    let root = parse_ok(source);
    let ok = root.resource("/a").unwrap().methods()["get"].responses()[&200];
    assert_eq!(ok.name().status(), Some(200));
    assert!(ok.children().is_empty());
}

#[test]
fn test_base_uri_parameters_and_protocols() {
    let source = r#"#%RAML 0.8
title: Regional
baseUri: https://{region}.example.com
baseUriParameters:
  region:
    enum: [eu, us]
"#;
    let root = parse_ok(source);
    let region = root.node().base_uri_parameters()["region"];
    assert!(region.is_required());
    assert_eq!(root.protocols(), vec!["HTTPS".to_string()]);
}

#[test]
fn test_security_schemes_and_secured_by() {
    let source = r#"#%RAML 0.8
title: Secure
baseUri: https://api.example.com
securitySchemes:
  - oauth_2_0:
      type: OAuth 2.0
      settings:
        authorizationUri: https://example.com/oauth/authorize
        accessTokenUri: https://example.com/oauth/token
securedBy: [null, oauth_2_0]
/me:
  get:
    securedBy: [oauth_2_0: { scopes: [profile] }]
"#;
    let mut root = parse_ok(source);
    root.expand().unwrap();

    let secured: Vec<_> = root.node().secured_by();
    assert_eq!(secured.len(), 2);
    assert!(!secured[0].reference().unwrap().is_resolved());
    let oauth = secured[1].reference().unwrap();
    assert!(oauth.is_resolved());
    assert_eq!(
        oauth.target().unwrap().str_property("type"),
        Some("OAuth 2.0")
    );

    let get = root.resource("/me").unwrap().methods()["get"];
    assert!(get.secured_by()[0].reference().unwrap().is_resolved());

    let json: serde_json::Value = serde_json::from_str(&root.to_json().unwrap()).unwrap();
    assert_eq!(json["securedBy"], serde_json::json!([null, "oauth_2_0"]));
    assert_eq!(
        json["/me"]["get"]["securedBy"],
        serde_json::json!([{ "oauth_2_0": { "scopes": ["profile"] } }])
    );
}

#[test]
fn test_secured_by_parameters_fill_the_scheme() {
    let source = r#"#%RAML 0.8
title: Secure
baseUri: https://api.example.com
securitySchemes:
  - oauth:
      type: OAuth 2.0
      describedBy:
        headers:
          <<tokenName>>:
            description: carries the token
/me:
  get:
    securedBy: [oauth: { tokenName: Authorization }]
"#;
    let mut root = parse_ok(source);
    root.expand().unwrap();

    let get = root.resource("/me").unwrap().methods()["get"];
    let target = get.secured_by()[0].reference().unwrap().target().unwrap();
    let headers = target.described_by().unwrap().headers();
    assert!(headers.contains_key("Authorization"));
    assert!(!headers.contains_key("<<tokenName>>"));

    let declared = root.node().security_schemes()["oauth"];
    assert!(declared.template().is_some());
}

#[test]
fn test_parse_relative_and_absolute_file_names() {
    let source = "#%RAML 0.8\ntitle: x\nbaseUri: http://x.com\n";
    assert!(parse(source, "relative/path/api.raml").is_ok());
    assert!(parse(source, "/absolute/path/api.raml").is_ok());
    assert!(parse(source, "").is_ok());
}
