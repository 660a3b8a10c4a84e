//! Checklist file reading.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::checklist::Checklist;
use crate::error::{SpecError, SpecResult};

/// Reader for checklist files.
pub struct ChecklistReader;

impl ChecklistReader {
    /// Read a checklist from a `.json`, `.yaml` or `.yml` file.
    ///
    /// A file may contain either the bare checklist or the request envelope
    /// `{"checklist": {...}}` posted by the web form.
    pub fn read(path: impl AsRef<Path>) -> SpecResult<Checklist> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SpecError::NotFound(path.to_path_buf()));
        }
        debug!("Reading checklist from {:?}", path);

        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let value: serde_json::Value = match extension.as_str() {
            "json" => serde_json::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => return Err(SpecError::UnsupportedFormat(path.to_path_buf())),
        };

        Self::from_value(value)
    }

    /// Parse a checklist from a JSON string.
    pub fn from_json(content: &str) -> SpecResult<Checklist> {
        Self::from_value(serde_json::from_str(content)?)
    }

    fn from_value(value: serde_json::Value) -> SpecResult<Checklist> {
        let inner = match value {
            serde_json::Value::Object(mut map) if map.contains_key("checklist") => map
                .remove("checklist")
                .unwrap_or(serde_json::Value::Null),
            other => other,
        };
        Ok(serde_json::from_value(inner)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_request_envelope() {
        let checklist = ChecklistReader::from_json(
            r#"{"checklist": {"pages": [{"name": "Home", "path": "/"}]}}"#,
        )
        .unwrap();
        assert_eq!(checklist.pages[0].name, "Home");
    }

    #[test]
    fn test_read_yaml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("site.yaml");
        fs::write(
            &path,
            "branding:\n  colors:\n    primary: '#123456'\npages:\n  - name: Home\n    path: /\n    sections:\n      - component: Hero\n",
        )
        .unwrap();

        let checklist = ChecklistReader::read(&path).unwrap();
        assert_eq!(checklist.branding.primary_color(), "#123456");
        assert_eq!(checklist.pages[0].sections[0].component, "Hero");
    }

    #[test]
    fn test_unsupported_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("site.txt");
        fs::write(&path, "pages: []").unwrap();
        assert!(matches!(
            ChecklistReader::read(&path),
            Err(SpecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ChecklistReader::read("/definitely/not/here.json"),
            Err(SpecError::NotFound(_))
        ));
    }
}
