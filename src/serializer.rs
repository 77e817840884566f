//! Serialization module for converting OpenAPI documents to YAML or JSON.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!(
        "Successfully wrote {} bytes to {}",
        content.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthStatus, EndpointRecord, HttpVerb, ResolvedEndpoint, SourceLocation};
    use crate::openapi_builder::{BuildOptions, OpenApiBuilder};
    use tempfile::TempDir;

    fn create_test_document() -> OpenApiDocument {
        let mut builder = OpenApiBuilder::new(BuildOptions::default()).with_info(
            "Test API".to_string(),
            "1.0.0".to_string(),
            Some("A test API".to_string()),
        );
        builder.add_endpoint(&ResolvedEndpoint {
            record: EndpointRecord::new(
                HttpVerb::Get,
                "/users/:id",
                "UsersController",
                "show",
                SourceLocation::new("config/routes.rb", 3),
            ),
            auth_status: AuthStatus::Authenticated,
            effective_filters: vec!["authenticate_user!".to_string()],
            request_schema: None,
        });
        builder.build()
    }

    #[test]
    fn test_serialize_yaml() {
        let doc = create_test_document();
        let yaml = serialize_yaml(&doc).unwrap();

        assert!(yaml.contains("openapi:"));
        assert!(yaml.contains("3.0.3"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("paths:"));
        assert!(yaml.contains("/users/{id}"));
        assert!(yaml.contains("x-auth-status: authenticated"));
    }

    #[test]
    fn test_serialize_json() {
        let doc = create_test_document();
        let json = serialize_json(&doc).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.3");
        assert_eq!(parsed["info"]["title"], "Test API");
        assert!(parsed["paths"]["/users/{id}"]["get"].is_object());
        assert_eq!(
            parsed["paths"]["/users/{id}"]["get"]["x-auth-status"],
            "authenticated"
        );
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let doc = create_test_document();
        let json = serialize_json(&doc).unwrap();

        assert!(json.contains('\n'));
        assert!(json.contains("  "));
    }

    #[test]
    fn test_roundtrip_yaml_serialization() {
        let doc = create_test_document();
        let yaml = serialize_yaml(&doc).unwrap();

        let deserialized: OpenApiDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(deserialized.openapi, doc.openapi);
        assert_eq!(deserialized.info.title, doc.info.title);
        assert_eq!(deserialized.paths.len(), doc.paths.len());
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let a = serialize_yaml(&create_test_document()).unwrap();
        let b = serialize_yaml(&create_test_document()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert!(file_path.exists());
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("dir").join("spec.yaml");

        write_to_file("content", &file_path).unwrap();

        assert!(file_path.exists());
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("spec.yaml");

        write_to_file("initial", &file_path).unwrap();
        write_to_file("updated", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
    }
}
