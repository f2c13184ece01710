use raml_core::parse;

fn main() {
    let raml_data = r#"#%RAML 0.8
title: Users API
baseUri: https://api.example.com/{version}
version: v1
traits:
  - paged:
      queryParameters:
        page: { type: integer, minimum: 1 }
resourceTypes:
  - collection:
      description: All <<resourcePathName>>
      get:
        is: [paged]
/users:
  type: collection
  get:
"#;

    let mut root = match parse(raml_data, "example.raml") {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Failed to parse RAML: {:?}", miette::Report::new(e));
            return;
        }
    };

    match root.expand() {
        Ok(()) => {
            let json_output = root.to_json().unwrap();
            println!("Successfully expanded RAML to JSON:\n{json_output}");
        }
        Err(e) => {
            eprintln!("Failed to expand RAML: {:?}", miette::Report::new(e));
        }
    }
}
