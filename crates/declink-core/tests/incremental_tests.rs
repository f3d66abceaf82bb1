//! Integration tests for incremental link indexing across sessions.

use std::fs;

use declink_core::config::LinkConfig;
use declink_core::declaration::{
    Declaration, Language, MarkerApplication, MarkerArgument, SourceFile, TypeReference,
};
use declink_core::facts::{LinkedName, SourceFileId, LINK_FACTS_SCHEMA_VERSION};
use declink_core::session::LinkSession;
use declink_core::store::{FactStore, JsonFactStore, MemoryFactStore};
use tempfile::TempDir;

fn tests_file(target: &str) -> SourceFile {
    SourceFile::new("F1.cs", Language::CSharp).with_declaration(
        Declaration::namespace("Shop.Tests").with_member(
            Declaration::type_decl("OrderServiceTests").with_marker(
                MarkerApplication::new("LinkedToAttribute")
                    .with_positional(MarkerArgument::Type(TypeReference::resolved(target))),
            ),
        ),
    )
}

fn service_file() -> SourceFile {
    SourceFile::new("F2.cs", Language::CSharp).with_declaration(
        Declaration::namespace("Shop").with_member(Declaration::type_decl("OrderService")),
    )
}

fn at(file: &str, name: &str) -> LinkedName {
    LinkedName::new(SourceFileId::new(file), name)
}

#[test]
fn test_edit_moves_link_to_new_target() {
    let mut session =
        LinkSession::open(LinkConfig::default(), MemoryFactStore::new(), Vec::new()).unwrap();
    session.rebuild(&[tests_file("Shop.OrderService"), service_file()]);

    assert_eq!(
        session.lookup("OrderServiceTests"),
        vec![at("F1.cs", "OrderService")]
    );
    assert_eq!(
        session.lookup("OrderService"),
        vec![at("F1.cs", "OrderServiceTests")]
    );

    session.update_file(&tests_file("Shop.OtherService"));

    assert!(session.lookup("OrderService").is_empty());
    assert_eq!(
        session.lookup("OtherService"),
        vec![at("F1.cs", "OrderServiceTests")]
    );
    assert_eq!(
        session.lookup("OrderServiceTests"),
        vec![at("F1.cs", "OtherService")]
    );
    assert!(session
        .index()
        .is_tracked(&SourceFileId::new("F2.cs")));
}

#[test]
fn test_json_store_survives_restart() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join(".declink");

    {
        let store = JsonFactStore::open(&root).unwrap();
        let mut session = LinkSession::open(LinkConfig::default(), store, Vec::new()).unwrap();
        assert!(session.needs_rebuild());
        session.rebuild(&[tests_file("Shop.OrderService"), service_file()]);
        session.close();
    }

    let store = JsonFactStore::open(&root).unwrap();
    let session = LinkSession::open(LinkConfig::default(), store, Vec::new()).unwrap();
    assert!(!session.needs_rebuild());
    assert_eq!(
        session.lookup("OrderService"),
        vec![at("F1.cs", "OrderServiceTests")]
    );
    assert_eq!(session.index().file_count(), 2);
}

#[test]
fn test_loaded_state_equals_rebuilt_state() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");
    let files = [tests_file("Shop.OrderService"), service_file()];

    let mut fresh = LinkSession::open(
        LinkConfig::default(),
        JsonFactStore::open(&root).unwrap(),
        Vec::new(),
    )
    .unwrap();
    fresh.rebuild(&files);
    let rebuilt_state = fresh.index().state().clone();
    fresh.close();

    let loaded = LinkSession::open(
        LinkConfig::default(),
        JsonFactStore::open(&root).unwrap(),
        Vec::new(),
    )
    .unwrap();
    assert_eq!(loaded.index().state(), &rebuilt_state);
}

#[test]
fn test_schema_mismatch_forces_rebuild() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");

    {
        let mut store = JsonFactStore::open(&root).unwrap();
        store.reset("0").unwrap();
        let mut facts = declink_core::facts::FileLinkFacts::new();
        facts.add("Stale", "Entry");
        store.put(&SourceFileId::new("old.cs"), &facts).unwrap();
    }

    let store = JsonFactStore::open(&root).unwrap();
    let session = LinkSession::open(LinkConfig::default(), store, Vec::new()).unwrap();
    assert!(session.needs_rebuild());
    assert!(session.lookup("Stale").is_empty());

    let store = session.close();
    assert_eq!(
        store.schema_version().unwrap().as_deref(),
        Some(LINK_FACTS_SCHEMA_VERSION)
    );
    assert!(store.enumerate().unwrap().is_empty());
}

#[test]
fn test_custom_marker_name_from_config() {
    let file = SourceFile::new("S.cs", Language::CSharp).with_declaration(
        Declaration::type_decl("CartSpec").with_marker(
            MarkerApplication::new("Specs.Subject").with_named(
                "Targets",
                MarkerArgument::Array(vec![
                    MarkerArgument::Type(TypeReference::resolved("Shop.Cart")),
                    MarkerArgument::Type(TypeReference::unresolved("Missing")),
                ]),
            ),
        ),
    );

    let mut session = LinkSession::open(
        LinkConfig::with_marker("SubjectAttribute"),
        MemoryFactStore::new(),
        Vec::new(),
    )
    .unwrap();
    session.update_file(&file);
    assert_eq!(session.lookup("Cart"), vec![at("S.cs", "CartSpec")]);
    assert!(session.lookup("Missing").is_empty());
}

#[test]
fn test_long_file_id_survives_restart() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");
    let id = format!(
        "src/Shop.Integration.Tests/{}/OrderServiceTests.cs",
        "Orders/Services/Checkout".repeat(8)
    );
    assert!(id.len() > 200);
    let file = SourceFile::new(id.as_str(), Language::CSharp).with_declaration(
        Declaration::type_decl("OrderServiceTests").with_marker(
            MarkerApplication::new("LinkedTo").with_positional(MarkerArgument::Type(
                TypeReference::resolved("Shop.OrderService"),
            )),
        ),
    );

    let mut session = LinkSession::open(
        LinkConfig::default(),
        JsonFactStore::open(&root).unwrap(),
        Vec::new(),
    )
    .unwrap();
    session.update_file(&file);
    assert_eq!(
        session.lookup("OrderService"),
        vec![at(&id, "OrderServiceTests")]
    );
    session.close();

    let reopened = LinkSession::open(
        LinkConfig::default(),
        JsonFactStore::open(&root).unwrap(),
        Vec::new(),
    )
    .unwrap();
    assert!(!reopened.needs_rebuild());
    assert_eq!(
        reopened.lookup("OrderService"),
        vec![at(&id, "OrderServiceTests")]
    );
}

#[test]
fn test_corrupt_entry_loads_as_empty_and_stays_tracked() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");
    let bad = SourceFileId::new("Broken.cs");

    {
        let store = JsonFactStore::open(&root).unwrap();
        let mut session = LinkSession::open(LinkConfig::default(), store, Vec::new()).unwrap();
        session.rebuild(&[tests_file("Shop.OrderService"), service_file()]);
        let store = session.close();
        fs::write(
            store.entry_path(&bad),
            br#"{"file": "Broken.cs", "facts": "garbage"}"#,
        )
        .unwrap();
    }

    let store = JsonFactStore::open(&root).unwrap();
    let session = LinkSession::open(LinkConfig::default(), store, Vec::new()).unwrap();
    assert!(!session.needs_rebuild());
    assert_eq!(
        session.lookup("OrderService"),
        vec![at("F1.cs", "OrderServiceTests")]
    );
    assert!(session.index().is_tracked(&bad));
    assert!(session
        .index()
        .state()
        .previous_names(&bad)
        .is_some_and(|names| names.is_empty()));
    assert_eq!(session.index().file_count(), 3);
}

#[test]
fn test_corrupt_meta_resets_store() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");

    {
        let store = JsonFactStore::open(&root).unwrap();
        let mut session = LinkSession::open(LinkConfig::default(), store, Vec::new()).unwrap();
        session.rebuild(&[tests_file("Shop.OrderService")]);
        session.close();
    }
    fs::write(root.join("meta.json"), b"not json at all").unwrap();

    let store = JsonFactStore::open(&root).unwrap();
    let session = LinkSession::open(LinkConfig::default(), store, Vec::new()).unwrap();
    assert!(session.needs_rebuild());
    assert!(session.lookup("OrderService").is_empty());
    assert_eq!(session.index().file_count(), 0);

    let store = session.close();
    assert!(store.enumerate().unwrap().is_empty());
    assert_eq!(
        store.schema_version().unwrap().as_deref(),
        Some(LINK_FACTS_SCHEMA_VERSION)
    );
}
