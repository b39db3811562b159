//! End-to-end tests over JSON model documents: loading, structural
//! validation, cross-model references, and reference graph analysis.

use std::collections::HashSet;

use edmgraph::model::{ContainerLookup, ElementKind};
use edmgraph::{import, ErrorCode, ModelError, ReferenceGraph, StructuralError, TypeRef};

const SHOP: &str = include_str!("fixtures/shop.json");
const BROKEN: &str = include_str!("fixtures/broken.json");
const CORE: &str = include_str!("fixtures/core.json");
const APP: &str = include_str!("fixtures/app.json");

fn count(report: &[StructuralError], code: ErrorCode) -> usize {
    report.iter().filter(|e| e.code == code).count()
}

// =============================================================================
// Clean Model
// =============================================================================

#[test]
fn test_shop_document_validates_clean() {
    let model = import::from_str(SHOP, "shop.json").unwrap();

    assert_eq!(model.types().count(), 5);
    assert_eq!(model.terms().count(), 1);
    assert_eq!(model.containers().count(), 1);
    assert_eq!(model.operations().count(), 1);

    let report = model.validate();
    assert!(report.is_empty(), "unexpected problems: {:?}", report);
}

#[test]
fn test_shop_positions_and_inherited_key() {
    let model = import::from_str(SHOP, "shop.json").unwrap();

    let customer = model.find_type("Shop.Customer").found().unwrap();
    assert_eq!(customer.location().line, 7);
    assert_eq!(customer.location().source.as_deref(), Some("shop.json"));

    // Customer declares no key of its own; Shop.Party provides one.
    let key_parts = customer.key();
    let key: Vec<&str> = key_parts.iter().map(|part| part.as_ref()).collect();
    assert_eq!(key, ["Id"]);

    let main = match model.find_container("Main") {
        ContainerLookup::Found(handle) => handle,
        other => panic!("expected a single container, got {:?}", other),
    };
    assert_eq!(main.namespace(), "Shop");

    let customers = main.find_entity_set("Customers").found().unwrap();
    assert_eq!(customers.declared_type_name(), "Shop.Customer");
}

#[test]
fn test_search_finds_declared_names() {
    let model = import::from_str(SHOP, "shop.json").unwrap();

    let results = model.search("Custmer");
    assert!(!results.is_empty());
    let hit = results
        .iter()
        .find(|r| r.full_name == "Shop.Customer")
        .unwrap();
    assert_eq!(hit.kind, ElementKind::EntityType);
}

// =============================================================================
// Broken Model
// =============================================================================

#[test]
fn test_broken_document_error_inventory() {
    let model = import::from_str(BROKEN, "broken.json").unwrap();
    let report = model.validate();

    // Alpha and Beta derive from each other; each reports its own poison.
    assert_eq!(count(&report, ErrorCode::CyclicBaseType), 2);
    assert!(report
        .iter()
        .filter(|e| e.code == ErrorCode::CyclicBaseType)
        .all(|e| e.is_interface_critical()));

    // Dup is declared twice: one duplicate report, plus the collision the
    // binding table recorded for the name itself.
    assert_eq!(count(&report, ErrorCode::DuplicateSchemaElement), 1);

    // One ambiguity for Bad.Dup, one for the simple name 'Main' which is
    // claimed by containers in two namespaces.
    assert_eq!(count(&report, ErrorCode::AmbiguousBinding), 2);

    let gone = report
        .iter()
        .find(|e| e.code == ErrorCode::UnresolvedNavigationTarget)
        .unwrap();
    assert!(gone.message.contains("could not be found"));

    assert_eq!(count(&report, ErrorCode::InvalidPropertyType), 1);
    assert_eq!(count(&report, ErrorCode::ContainmentCycle), 2);
    assert_eq!(count(&report, ErrorCode::EntitySetTypeMustBeEntity), 1);

    // Alpha and Beta carry no key, but their bases are already poisoned;
    // piling a key complaint on top would be noise.
    assert_eq!(count(&report, ErrorCode::EntityKeyMissing), 0);

    assert_eq!(report.len(), 10, "full report: {:?}", report);
}

#[test]
fn test_broken_report_has_no_duplicate_entries() {
    let model = import::from_str(BROKEN, "broken.json").unwrap();
    let report = model.validate();

    let mut seen = HashSet::new();
    for error in &report {
        let entry = format!("{:?}|{}|{}", error.location, error.code, error.message);
        assert!(seen.insert(entry), "repeated entry: {}", error);
    }
}

#[test]
fn test_ambiguous_container_answers_neutrally() {
    let model = import::from_str(BROKEN, "broken.json").unwrap();

    let ambiguous = match model.find_container("Main") {
        ContainerLookup::Ambiguous(ambiguous) => ambiguous,
        other => panic!("expected an ambiguous name, got {:?}", other),
    };
    assert_eq!(ambiguous.candidates().len(), 2);
    assert!(ambiguous.find_entity_set("Extras").is_missing());

    // Qualified names still resolve past the collision.
    assert!(model.find_container("Bad.Main").found().is_some());
    assert!(model.find_container("AlsoBad.Main").found().is_some());
}

#[test]
fn test_broken_reference_graph_shows_containment_cycle() {
    let model = import::from_str(BROKEN, "broken.json").unwrap();
    let graph = ReferenceGraph::project(&model);

    // Poisoned bases and the unresolved navigation contribute no edges;
    // the two Dup declarations share one node.
    assert_eq!(graph.node_count(), 9);
    assert_eq!(graph.edge_count(), 3);

    assert!(graph.has_cycles());
    let groups = graph.cycle_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members, ["Bad.Left", "Bad.Right"]);
    assert!(!groups[0].is_self_referential);
}

// =============================================================================
// Cross-Model References
// =============================================================================

#[test]
fn test_app_reports_redeclarations_against_core() {
    let core = import::from_str(CORE, "core.json").unwrap();
    assert!(core.validate().is_empty());

    let app = import::from_str_with_references(APP, "app.json", vec![core]).unwrap();
    let report = app.validate();

    // The container and the signature-identical Describe overload clash;
    // the Edm.Int32 overload is a new signature and gets a pass.
    assert_eq!(count(&report, ErrorCode::AlreadyDefined), 2);
    assert_eq!(report.len(), 2, "full report: {:?}", report);
    assert!(report
        .iter()
        .any(|e| e.message.contains("entity container 'Core.Shared'")));
    assert!(report
        .iter()
        .any(|e| e.message.contains("operation 'Core.Describe'")));
}

#[test]
fn test_key_inherited_across_model_boundary() {
    let core = import::from_str(CORE, "core.json").unwrap();
    let app = import::from_str_with_references(APP, "app.json", vec![core]).unwrap();

    let document = app.find_type("App.Document").found().unwrap();
    let key_parts = document.key();
    let key: Vec<&str> = key_parts.iter().map(|part| part.as_ref()).collect();
    assert_eq!(key, ["Id"]);

    match document.base_type() {
        Some(TypeRef::Declared(base)) => assert_eq!(&*base.full_name(), "Core.Resource"),
        other => panic!("expected a resolved base, got {:?}", other),
    }
}

// =============================================================================
// Documents on Disk
// =============================================================================

#[test]
fn test_documents_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.json");
    std::fs::write(&path, SHOP).unwrap();

    let model = import::from_path(&path).unwrap();
    assert!(model.validate().is_empty());

    let customer = model.find_type("Shop.Customer").found().unwrap();
    assert_eq!(customer.location().source.as_deref(), Some("shop.json"));
}

#[test]
fn test_non_json_documents_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.yaml");
    std::fs::write(&path, "schemas: []").unwrap();

    let err = import::from_path(&path).unwrap_err();
    assert!(matches!(err, ModelError::UnsupportedFormat(_)));
}
