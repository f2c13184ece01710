use crate::error::LoaderError;
use log::debug;
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

pub const RAML_HEADER: &str = "#%RAML 0.8";

const YAML_EXTENSIONS: &[&str] = &["yaml", "yml", "raml"];

/// Reads RAML source into a decoded YAML value with every `!include` replaced by the file it names.
pub struct Loader {
    // Files currently being decoded, outermost first
    resolving_stack: Vec<PathBuf>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        Loader {
            resolving_stack: Vec::new(),
        }
    }

    /// Loads a whole document. `file_path` locates the document for relative includes.
    ///
    /// # Errors
    /// Returns a `LoaderError` for a missing or wrong version header, invalid YAML, a document that
    /// is not a mapping, or an include that cannot be read or includes itself.
    pub fn load(&mut self, source: &str, file_path: &Path) -> Result<Value, LoaderError> {
        check_header(source)?;
        let document = decode(source)?;
        if !document.is_mapping() {
            return Err(LoaderError::InvalidDocument {
                reason: "the top level is not a mapping".to_string(),
            });
        }
        let file_path = normalize(file_path);
        self.resolving_stack.push(file_path.clone());
        let resolved = self.resolve_value(document, parent_dir(&file_path));
        self.resolving_stack.pop();
        resolved
    }

    fn resolve_value(&mut self, value: Value, current_dir: &Path) -> Result<Value, LoaderError> {
        match value {
            Value::Tagged(tagged) if is_include(&tagged) => self.include(&tagged.value, current_dir),
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                Ok(Value::Tagged(Box::new(TaggedValue {
                    tag,
                    value: self.resolve_value(value, current_dir)?,
                })))
            }
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, item) in map {
                    resolved.insert(key, self.resolve_value(item, current_dir)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.resolve_value(item, current_dir))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            other => Ok(other),
        }
    }

    fn include(&mut self, target: &Value, current_dir: &Path) -> Result<Value, LoaderError> {
        let Some(name) = target.as_str().map(str::trim) else {
            return Err(LoaderError::CannotIncludeFile {
                path: format!("{target:?}"),
                reason: "the include target must be a file name".to_string(),
            });
        };
        let path = normalize(&current_dir.join(name));

        if self.resolving_stack.contains(&path) {
            let cycle = self
                .resolving_stack
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.to_string_lossy().to_string())
                .collect::<Vec<String>>()
                .join(" -> ");
            return Err(LoaderError::CircularInclude { cycle });
        }

        let text = std::fs::read_to_string(&path).map_err(|e| LoaderError::CannotIncludeFile {
            path: name.to_string(),
            reason: e.to_string(),
        })?;
        debug!("including `{}`", path.display());

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| YAML_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !is_yaml {
            return Ok(Value::String(text));
        }

        self.resolving_stack.push(path.clone());
        let resolved = decode(&text).and_then(|value| self.resolve_value(value, parent_dir(&path)));
        self.resolving_stack.pop();
        resolved
    }
}

/// Loads the file at `path`.
///
/// # Errors
/// Returns `CannotIncludeFile` when the file cannot be read, otherwise as [`Loader::load`].
pub fn load_file(path: &Path) -> Result<Value, LoaderError> {
    let source = std::fs::read_to_string(path).map_err(|e| LoaderError::CannotIncludeFile {
        path: path.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;
    Loader::new().load(&source, path)
}

pub fn check_header(source: &str) -> Result<(), LoaderError> {
    let first_line = source.lines().next().unwrap_or_default().trim_end();
    if first_line != RAML_HEADER {
        return Err(LoaderError::UnsupportedVersion {
            found: first_line.to_string(),
        });
    }
    Ok(())
}

fn decode(text: &str) -> Result<Value, LoaderError> {
    serde_yaml::from_str(text).map_err(|e| LoaderError::Yaml {
        message: e.to_string(),
    })
}

fn is_include(tagged: &TaggedValue) -> bool {
    tagged.tag.to_string().trim_start_matches('!') == "include"
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header() {
        assert!(check_header("#%RAML 0.8\ntitle: x").is_ok());
        assert!(check_header("#%RAML 0.8   \ntitle: x").is_ok());
        assert_eq!(
            check_header("#%RAML 1.0\ntitle: x"),
            Err(LoaderError::UnsupportedVersion {
                found: "#%RAML 1.0".to_string()
            })
        );
        assert!(check_header("").is_err());
    }

    #[test]
    fn test_document_must_be_a_mapping() {
        let err = Loader::new()
            .load("#%RAML 0.8\n- a\n- b", Path::new("api.raml"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::InvalidDocument { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Loader::new()
            .load("#%RAML 0.8\ntitle: [unclosed", Path::new("api.raml"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::Yaml { .. }));
    }

    #[test]
    fn test_missing_include() {
        let err = Loader::new()
            .load(
                "#%RAML 0.8\ntitle: !include does-not-exist.md",
                Path::new("/nonexistent/api.raml"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            LoaderError::CannotIncludeFile { path, .. } if path == "does-not-exist.md"
        ));
    }

    #[test]
    fn test_other_tags_are_kept() {
        let value = Loader::new()
            .load("#%RAML 0.8\ntitle: !custom x", Path::new("api.raml"))
            .unwrap();
        assert!(matches!(value["title"], Value::Tagged(_)));
    }
}
