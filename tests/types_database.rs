//! Batch update behavior of the content types database against the in-memory store

use std::collections::BTreeSet;
use std::sync::Arc;

use content_types::{
    naming::unit_collection_name, DocumentStore, IndexSpec, MemoryStore, SchemaError,
    TypeDefinition, TypesDatabase,
};
use tokio_test::{assert_err, assert_ok};

fn definition(id: &str, display_name: &str) -> TypeDefinition {
    TypeDefinition::new(id, display_name, "Test definition")
        .with_unique_indexes(Some(vec![
            IndexSpec::from(vec!["compound_1", "compound_2"]),
            IndexSpec::from("single_1"),
        ]))
        .with_search_indexes(Some(["search_1"]))
}

fn def_1() -> TypeDefinition {
    definition("def_1", "Definition 1")
}

fn def_2() -> TypeDefinition {
    definition("def_2", "Definition 2")
}

fn def_3() -> TypeDefinition {
    definition("def_3", "Definition 3")
}

fn def_4() -> TypeDefinition {
    definition("def_4", "Definition 4")
}

fn setup() -> (Arc<MemoryStore>, TypesDatabase) {
    let store = Arc::new(MemoryStore::new());
    let types_db = TypesDatabase::new(store.clone());
    (store, types_db)
}

async fn assert_converged(types_db: &TypesDatabase, defs: &[TypeDefinition]) {
    let names = types_db.all_type_collection_names().await.unwrap();
    for d in defs {
        assert!(names.contains(&unit_collection_name(&d.id)));

        let indexes = types_db.collection_indexes(&d.id).await.unwrap();
        let expected = 1 + d.unique_indexes.len() + d.search_indexes.len();
        assert_eq!(indexes.len(), expected, "index count for {}", d.id);
    }
}

#[tokio::test]
async fn test_update_clean_database() {
    let (_store, types_db) = setup();
    let defs = vec![def_1(), def_2(), def_3(), def_4()];

    let summary = assert_ok!(types_db.update(&defs, false).await);
    assert_eq!(summary.created.len(), 4);

    let names = types_db.all_type_collection_names().await.unwrap();
    assert_eq!(names.len(), defs.len());
    assert_converged(&types_db, &defs).await;
}

#[tokio::test]
async fn test_update_no_changes() {
    let (store, types_db) = setup();
    let defs = vec![def_1(), def_2(), def_3(), def_4()];
    assert_ok!(types_db.update(&defs, false).await);
    let registry_before = types_db.registry().all_records().await.unwrap();
    let writes = store.index_writes();

    let same_defs = vec![def_4(), def_3(), def_2(), def_1()];
    let summary = assert_ok!(types_db.update(&same_defs, false).await);

    assert_eq!(summary.unchanged.len(), 4);
    assert_eq!(store.index_writes(), writes);
    assert_eq!(types_db.registry().all_records().await.unwrap(), registry_before);

    let names = types_db.all_type_collection_names().await.unwrap();
    assert_eq!(names.len(), same_defs.len());
    assert_converged(&types_db, &defs).await;
}

#[tokio::test]
async fn test_update_missing_no_error() {
    let (_store, types_db) = setup();
    let defs = vec![def_1(), def_2(), def_3()];
    assert_ok!(types_db.update(&defs, false).await);

    let new_defs = vec![def_4()];
    let summary = assert_ok!(types_db.update(&new_defs, false).await);

    let expected: BTreeSet<String> = defs.iter().map(|d| d.id.clone()).collect();
    assert_eq!(summary.missing, expected);

    // Old types are not deleted
    let names = types_db.all_type_collection_names().await.unwrap();
    assert_eq!(names.len(), defs.len() + new_defs.len());
    assert_converged(&types_db, &defs).await;
    assert_eq!(types_db.all_type_ids().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_update_missing_with_error() {
    let (_store, types_db) = setup();
    let defs = vec![def_1(), def_2(), def_3()];
    assert_ok!(types_db.update(&defs, false).await);

    let err = assert_err!(types_db.update(&[def_4()], true).await);
    let missing = err.missing_type_ids().expect("MissingDefinitions expected");
    assert_eq!(missing.len(), 3);
    for d in &defs {
        assert!(missing.contains(&d.id));
    }

    // The supplied definition was still applied
    assert!(types_db.type_definition("def_4").await.unwrap().is_some());
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn test_update_failed_create() {
    let (_store, types_db) = setup();
    let busted = TypeDefinition::new("!@#$%^&*()", "Busted", "Busted");
    let defs = vec![def_1(), busted.clone()];

    let err = assert_err!(types_db.update(&defs, false).await);
    assert_eq!(err.type_definitions(), vec![&busted]);
    assert!(matches!(err, SchemaError::UpdateFailed(_)));

    // The good definition was committed
    assert!(types_db.type_definition("def_1").await.unwrap().is_some());
    assert_converged(&types_db, &[def_1()]).await;
    assert_eq!(types_db.all_type_collection_names().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_failed_unique_indexes() {
    let (_store, types_db) = setup();
    let busted = TypeDefinition::new("busted", "Busted", "Busted")
        .with_unique_indexes(Some(["bad..dot..notation"]));
    let defs = vec![busted.clone(), def_1()];

    let err = assert_err!(types_db.update(&defs, false).await);
    assert_eq!(err.type_definitions(), vec![&busted]);

    match &err {
        SchemaError::UpdateFailed(failures) => {
            assert!(matches!(failures[0].error, SchemaError::IndexCreation(_)));
        }
        other => panic!("expected UpdateFailed, got {:?}", other),
    }

    assert!(types_db.type_definition("busted").await.unwrap().is_none());
    assert_converged(&types_db, &[def_1()]).await;
}

#[tokio::test]
async fn test_update_failed_search_indexes() {
    let (_store, types_db) = setup();
    let busted = TypeDefinition::new("busted", "Busted", "Busted")
        .with_search_indexes(Some(["bad..dot..notation"]));
    let defs = vec![busted.clone(), def_1()];

    let err = assert_err!(types_db.update(&defs, false).await);
    assert_eq!(err.type_definitions(), vec![&busted]);
}

#[tokio::test]
async fn test_update_failed_takes_precedence_over_missing() {
    let (_store, types_db) = setup();
    assert_ok!(types_db.update(&[def_1()], false).await);

    let busted = TypeDefinition::new("!busted", "Busted", "Busted");
    let err = assert_err!(types_db.update(&[busted, def_2()], true).await);
    assert!(matches!(err, SchemaError::UpdateFailed(_)));
}

#[tokio::test]
async fn test_index_replacement() {
    let (_store, types_db) = setup();
    let original = TypeDefinition::new("rpm", "RPM", "RPM Packages").with_unique_indexes(Some(vec![
        IndexSpec::from(vec!["f1", "f2"]),
        IndexSpec::from("f3"),
    ]));
    assert_ok!(types_db.update(&[original], false).await);

    let replaced =
        TypeDefinition::new("rpm", "RPM", "RPM Packages").with_unique_indexes(Some(["f4"]));
    let summary = assert_ok!(types_db.update(&[replaced], false).await);
    assert_eq!(summary.updated, vec!["rpm".to_string()]);

    let indexes = types_db.collection_indexes("rpm").await.unwrap();
    let unique: Vec<&str> = indexes
        .iter()
        .filter(|i| i.unique && !i.is_identity())
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(unique, vec!["f4_1"]);
    assert_eq!(indexes.len(), 2);

    assert_eq!(
        types_db.type_units_unique_indexes("rpm").await.unwrap(),
        Some(vec![vec!["f4".to_string()]])
    );
}

#[tokio::test]
async fn test_search_index_replacement() {
    let (_store, types_db) = setup();
    let original = TypeDefinition::new("rpm", "RPM", "RPM Packages").with_search_indexes(Some(vec![
        IndexSpec::from("s1"),
        IndexSpec::from(vec!["s2", "s3"]),
    ]));
    assert_ok!(types_db.update(&[original], false).await);
    assert_eq!(types_db.collection_indexes("rpm").await.unwrap().len(), 3);

    let replaced =
        TypeDefinition::new("rpm", "RPM", "RPM Packages").with_search_indexes(Some(["s4"]));
    let summary = assert_ok!(types_db.update(&[replaced], false).await);
    assert_eq!(summary.updated, vec!["rpm".to_string()]);

    let indexes = types_db.collection_indexes("rpm").await.unwrap();
    let search: Vec<&str> = indexes
        .iter()
        .filter(|i| !i.unique && !i.is_identity())
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(search, vec!["s4_1"]);
    assert_eq!(indexes.len(), 2);
}

#[tokio::test]
async fn test_unique_index_moved_to_search() {
    let (_store, types_db) = setup();
    let original =
        TypeDefinition::new("rpm", "RPM", "RPM Packages").with_unique_indexes(Some(["x"]));
    assert_ok!(types_db.update(&[original], false).await);

    let moved = TypeDefinition::new("rpm", "RPM", "RPM Packages")
        .with_unique_indexes(None::<Vec<&str>>)
        .with_search_indexes(Some(["x"]));
    assert_ok!(types_db.update(&[moved], false).await);

    let indexes = types_db.collection_indexes("rpm").await.unwrap();
    assert_eq!(indexes.len(), 2);
    let x = indexes.iter().find(|i| i.name == "x_1").unwrap();
    assert!(!x.unique);

    assert_eq!(
        types_db.type_units_search_indexes("rpm").await.unwrap(),
        Some(vec![vec!["x".to_string()]])
    );
    assert_eq!(types_db.type_units_unique_indexes("rpm").await.unwrap(), Some(vec![]));
}

#[tokio::test]
async fn test_all_type_collection_names() {
    let (_store, types_db) = setup();
    let type_def = TypeDefinition::new("rpm", "RPM", "RPM Packages")
        .with_unique_indexes(Some(["name"]))
        .with_search_indexes(Some(["name"]));
    assert_ok!(types_db.create_or_update_type(&type_def).await);

    let all_names = types_db.all_type_collection_names().await.unwrap();
    assert_eq!(all_names, vec![unit_collection_name("rpm")]);
}

#[tokio::test]
async fn test_all_type_collection_names_no_entries() {
    let (_store, types_db) = setup();
    let names = types_db.all_type_collection_names().await.unwrap();
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_collection_names_reflect_storage_not_registry() {
    let (store, types_db) = setup();
    store
        .ensure_collection(&unit_collection_name("orphan"))
        .await
        .unwrap();

    let names = types_db.all_type_collection_names().await.unwrap();
    assert_eq!(names, vec![unit_collection_name("orphan")]);
    assert!(types_db.all_type_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clean() {
    let (store, types_db) = setup();
    assert_ok!(types_db.update(&[def_1(), def_2()], false).await);

    assert_ok!(types_db.clean().await);

    assert!(types_db.all_type_collection_names().await.unwrap().is_empty());
    assert!(types_db.all_type_ids().await.unwrap().is_empty());
    assert!(store.list_collection_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_all_type_definitions_round_trip() {
    let (_store, types_db) = setup();
    let defs = vec![def_1().with_child_types(["def_2"]), def_2()];
    assert_ok!(types_db.update(&defs, false).await);

    let mut loaded = types_db.all_type_definitions().await.unwrap();
    loaded.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(loaded, defs);
}
