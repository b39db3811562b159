//! Model Document Loading
//!
//! Deserializes the JSON declaration stream an external parser produces and
//! feeds it through `ModelBuilder`. Line and column are optional in the
//! document; declarations without them come through at an unknown position.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diag::Location;
use crate::error::{ModelError, Result};
use crate::model::{Model, ModelBuilder};

// =============================================================================
// Document Types
// =============================================================================

/// Root document: one model as a list of schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDoc {
    #[serde(default)]
    pub schemas: Vec<SchemaDoc>,
}

/// One namespace worth of declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDoc {
    pub namespace: String,
    #[serde(default)]
    pub types: Vec<StructuredTypeDoc>,
    #[serde(default)]
    pub terms: Vec<TermDoc>,
    #[serde(default)]
    pub containers: Vec<ContainerDoc>,
    #[serde(default)]
    pub operations: Vec<OperationDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredTypeDoc {
    pub name: String,
    pub kind: String, // "entity" or "complex"
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub key: Option<Vec<String>>,
    #[serde(default)]
    pub properties: Vec<PropertyDoc>,
    #[serde(default)]
    pub navigations: Vec<NavigationDoc>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationDoc {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub contains: bool,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDoc {
    pub name: String,
    #[serde(default)]
    pub entity_sets: Vec<EntitySetDoc>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySetDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDoc {
    pub name: String,
    #[serde(default)]
    pub bound: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterDoc>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

// =============================================================================
// Loaders
// =============================================================================

/// Parse a model document and freeze it, with no referenced models.
pub fn from_str(text: &str, source: &str) -> Result<Arc<Model>> {
    from_str_with_references(text, source, Vec::new())
}

/// Parse a model document and freeze it against already-built references.
pub fn from_str_with_references(
    text: &str,
    source: &str,
    references: Vec<Arc<Model>>,
) -> Result<Arc<Model>> {
    let doc: ModelDoc = serde_json::from_str(text)?;
    build_model(doc, source, references)
}

/// Load a model document from a `.json` file.
pub fn from_path(path: impl AsRef<Path>) -> Result<Arc<Model>> {
    from_path_with_references(path, Vec::new())
}

pub fn from_path_with_references(
    path: impl AsRef<Path>,
    references: Vec<Arc<Model>>,
) -> Result<Arc<Model>> {
    let path = path.as_ref();
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(ModelError::UnsupportedFormat(path.display().to_string()));
    }
    let text = fs::read_to_string(path)?;
    let source = path.file_name().and_then(|n| n.to_str()).unwrap_or("model");
    from_str_with_references(&text, source, references)
}

fn build_model(doc: ModelDoc, source: &str, references: Vec<Arc<Model>>) -> Result<Arc<Model>> {
    let source: Arc<str> = Arc::from(source);
    let mut builder = ModelBuilder::new();
    for reference in references {
        builder.add_reference(reference);
    }

    for schema in &doc.schemas {
        for ty in &schema.types {
            let id = match ty.kind.as_str() {
                "entity" => builder.entity_type(
                    &schema.namespace,
                    &ty.name,
                    at(ty.line, ty.column, &source),
                ),
                "complex" => builder.complex_type(
                    &schema.namespace,
                    &ty.name,
                    at(ty.line, ty.column, &source),
                ),
                other => {
                    return Err(ModelError::InvalidDocument(format!(
                        "unknown type kind '{}' on '{}'",
                        other, ty.name
                    )))
                }
            };
            if ty.is_abstract {
                builder.set_abstract(id, true);
            }
            if let Some(base) = &ty.base {
                builder.set_base_type(id, base);
            }
            if let Some(key) = &ty.key {
                builder.declare_key(id, key.iter().cloned());
            }
            for property in &ty.properties {
                builder.property(
                    id,
                    &property.name,
                    &property.type_name,
                    at(property.line, property.column, &source),
                );
            }
            for navigation in &ty.navigations {
                builder.navigation(
                    id,
                    &navigation.name,
                    &navigation.target,
                    navigation.contains,
                    at(navigation.line, navigation.column, &source),
                );
            }
        }
        for term in &schema.terms {
            builder.term(
                &schema.namespace,
                &term.name,
                &term.type_name,
                at(term.line, term.column, &source),
            );
        }
        for container in &schema.containers {
            let id = builder.container(
                &schema.namespace,
                &container.name,
                at(container.line, container.column, &source),
            );
            for set in &container.entity_sets {
                builder.entity_set(
                    id,
                    &set.name,
                    &set.type_name,
                    at(set.line, set.column, &source),
                );
            }
        }
        for operation in &schema.operations {
            let id = builder.operation(
                &schema.namespace,
                &operation.name,
                operation.bound,
                at(operation.line, operation.column, &source),
            );
            for parameter in &operation.parameters {
                builder.parameter(
                    id,
                    &parameter.name,
                    &parameter.type_name,
                    at(parameter.line, parameter.column, &source),
                );
            }
            if let Some(return_type) = &operation.return_type {
                builder.set_return_type(id, return_type);
            }
        }
    }

    debug!(source = %source, schemas = doc.schemas.len(), "model document loaded");
    Ok(builder.freeze())
}

fn at(line: u32, column: u32, source: &Arc<str>) -> Location {
    if line == 0 && column == 0 {
        Location::unknown()
    } else {
        Location::in_source(line, column, source.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "schemas": [{
            "namespace": "Shop",
            "types": [
                {
                    "name": "Customer",
                    "kind": "entity",
                    "key": ["Id"],
                    "properties": [
                        { "name": "Id", "type": "Edm.Int32", "line": 4, "column": 9 },
                        { "name": "Name", "type": "Edm.String", "line": 5, "column": 9 }
                    ],
                    "line": 3,
                    "column": 5
                },
                {
                    "name": "Address",
                    "kind": "complex",
                    "properties": [
                        { "name": "City", "type": "Edm.String" }
                    ]
                }
            ],
            "terms": [
                { "name": "Description", "type": "Edm.String", "line": 20 }
            ],
            "containers": [
                {
                    "name": "Main",
                    "entity_sets": [
                        { "name": "Customers", "type": "Shop.Customer", "line": 24 }
                    ],
                    "line": 23
                }
            ],
            "operations": [
                {
                    "name": "TopCustomer",
                    "parameters": [{ "name": "count", "type": "Edm.Int32" }],
                    "return_type": "Shop.Customer",
                    "line": 30
                }
            ]
        }]
    }"#;

    #[test]
    fn test_document_loads_and_validates_clean() {
        let model = from_str(DOC, "shop.json").unwrap();
        assert_eq!(model.type_count(), 2);
        assert_eq!(model.term_count(), 1);
        assert_eq!(model.container_count(), 1);
        assert_eq!(model.operation_count(), 1);

        let customer = model.find_type("Shop.Customer").found().unwrap();
        assert_eq!(customer.location().line, 3);
        assert_eq!(customer.location().source.as_deref(), Some("shop.json"));

        assert!(model.validate().is_empty());
    }

    #[test]
    fn test_missing_positions_come_through_unknown() {
        let model = from_str(DOC, "shop.json").unwrap();
        let address = model.find_type("Shop.Address").found().unwrap();
        assert!(!address.location().is_known());
    }

    #[test]
    fn test_unknown_type_kind_is_rejected() {
        let text = r#"{ "schemas": [{ "namespace": "NS", "types": [{ "name": "X", "kind": "association" }] }] }"#;
        let err = from_str(text, "bad.json").unwrap_err();
        assert!(matches!(err, ModelError::InvalidDocument(_)));
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        let err = from_str("{ not json", "bad.json").unwrap_err();
        assert!(matches!(err, ModelError::Json(_)));
    }

    #[test]
    fn test_non_json_extension_is_rejected() {
        let err = from_path("model.yaml").unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedFormat(_)));
    }
}
