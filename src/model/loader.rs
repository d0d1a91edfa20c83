//! Input spec loader
//!
//! Reads `*.json` input spec documents from a directory into an in-memory
//! registry keyed by file stem. Every field is structure-checked on load; a
//! malformed document fails the whole load.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::document::InputSpec;
use super::errors::{ModelError, ModelResult};
use super::types::FieldSpec;

/// Registry of input spec documents loaded from disk or registered directly.
pub struct InputSpecLoader {
    /// Directory containing document files
    spec_dir: PathBuf,
    /// Loaded documents indexed by name
    specs: BTreeMap<String, InputSpec>,
}

impl InputSpecLoader {
    /// Creates a loader reading from `spec_dir`.
    pub fn new(spec_dir: &Path) -> Self {
        Self {
            spec_dir: spec_dir.to_path_buf(),
            specs: BTreeMap::new(),
        }
    }

    /// Returns the document directory path.
    pub fn spec_dir(&self) -> &Path {
        &self.spec_dir
    }

    /// Loads all document files from the directory.
    ///
    /// A missing directory loads nothing. Non-JSON files are skipped.
    pub fn load_all(&mut self) -> ModelResult<usize> {
        if !self.spec_dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.spec_dir).map_err(|e| ModelError::Io {
            path: self.spec_dir.display().to_string(),
            source: e,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModelError::Io {
                path: self.spec_dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        // Directory order is platform dependent
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }

        Ok(paths.len())
    }

    /// Loads a single document file, registering it under its file stem.
    fn load_file(&mut self, path: &Path) -> ModelResult<()> {
        let content = fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let spec: InputSpec = serde_json::from_str(&content).map_err(|e| {
            ModelError::malformed(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        spec.validate_structure()
            .map_err(|e| ModelError::malformed(path.display().to_string(), e.to_string()))?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| ModelError::malformed(path.display().to_string(), "No file name"))?;

        debug!(name = %name, fields = spec.fields.len(), "loaded input spec");
        self.insert(name, spec)
    }

    /// Registers a document directly.
    pub fn register(&mut self, name: impl Into<String>, spec: InputSpec) -> ModelResult<()> {
        let name = name.into();
        spec.validate_structure()
            .map_err(|e| ModelError::malformed("<in-memory>", e.to_string()))?;
        self.insert(name, spec)
    }

    fn insert(&mut self, name: String, spec: InputSpec) -> ModelResult<()> {
        if self.specs.contains_key(&name) {
            return Err(ModelError::DuplicateDocument(name));
        }
        self.specs.insert(name, spec);
        Ok(())
    }

    /// Returns a document by name.
    pub fn get(&self, name: &str) -> Option<&InputSpec> {
        self.specs.get(name)
    }

    /// Returns a field of a document by display name.
    pub fn field(&self, name: &str, display_name: &str) -> Option<&FieldSpec> {
        self.get(name).and_then(|spec| spec.field(display_name))
    }

    /// Returns the registered document names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::constraint::ConstraintDescriptor;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_all_from_directory() {
        let tmp = TempDir::new().unwrap();
        let doc = json!({
            "protocolVersion": "2.0",
            "fields": [
                {"displayName": "Name", "dataType": "STRING", "required": true, "constraints": []},
                {"displayName": "Age", "dataType": "NUMBER", "constraints": [
                    {"name": "min", "type": "minValue", "params": {"value": 0}}
                ]}
            ]
        });
        write(tmp.path(), "users.json", &doc.to_string());
        write(tmp.path(), "notes.txt", "ignored");

        let mut loader = InputSpecLoader::new(tmp.path());
        assert_eq!(loader.load_all().unwrap(), 1);
        assert_eq!(loader.names().collect::<Vec<_>>(), vec!["users"]);
        assert!(loader.field("users", "Age").is_some());
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut loader = InputSpecLoader::new(&tmp.path().join("absent"));
        assert_eq!(loader.load_all().unwrap(), 0);
        assert!(loader.is_empty());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "broken.json", "{ not json");

        let mut loader = InputSpecLoader::new(tmp.path());
        let err = loader.load_all().unwrap_err();
        assert_eq!(err.code(), "MALFORMED_DOCUMENT");
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_duplicate_constraint_names_fail_load() {
        let tmp = TempDir::new().unwrap();
        let doc = json!({
            "fields": [
                {"displayName": "Code", "dataType": "STRING", "constraints": [
                    {"name": "len", "type": "minLength", "params": {"value": 1}},
                    {"name": "len", "type": "maxLength", "params": {"value": 9}}
                ]}
            ]
        });
        write(tmp.path(), "codes.json", &doc.to_string());

        let mut loader = InputSpecLoader::new(tmp.path());
        let err = loader.load_all().unwrap_err();
        assert!(err.to_string().contains("Duplicate constraint name"));
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let tmp = TempDir::new().unwrap();
        let mut loader = InputSpecLoader::new(tmp.path());
        let spec = InputSpec::new(vec![FieldSpec::string("Code")
            .with_constraint(ConstraintDescriptor::max_length("max", 4))]);

        loader.register("codes", spec.clone()).unwrap();
        let err = loader.register("codes", spec).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_DOCUMENT");
    }
}
