use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Manifest file read from the package directory
pub const MANIFEST_FILE: &str = "package.json";

/// A `package.json` document. Unknown fields are kept as-is so the
/// registry receives the manifest unchanged apart from the version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PackageManifest(Map<String, Value>);

impl PackageManifest {
    /// Read `package.json` from a package directory
    pub fn load(dir: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        match serde_json::from_str(contents)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(Error::InvalidResponse(format!(
                "{} must contain a JSON object",
                MANIFEST_FILE
            ))),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }

    pub fn set_version(&mut self, version: &str) {
        self.0.insert("version".to_string(), Value::String(version.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_accessors() {
        let mut manifest = PackageManifest::parse(
            r#"{"name":"as-json","version":"1.0.2","ascMain":"assembly/index.ts"}"#,
        )
        .unwrap();
        assert_eq!(manifest.name(), Some("as-json"));
        assert_eq!(manifest.version(), Some("1.0.2"));

        manifest.set_version("1.1.0");
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["version"], "1.1.0");
        assert_eq!(value["ascMain"], "assembly/index.ts");
    }

    #[test]
    fn test_manifest_must_be_object() {
        assert!(PackageManifest::parse("[1, 2]").is_err());
        assert!(PackageManifest::parse("not json").is_err());
    }
}
