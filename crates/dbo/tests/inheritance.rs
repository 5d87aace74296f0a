//! Field merging, hook chains and discriminator subclasses across class
//! hierarchies.

mod fixtures;

use std::sync::{Arc, Mutex};

use dbo::field::SubclassNameField;
use dbo::prelude::*;
use dbo::FieldKind;
use fixtures::row;

fn field_names(class: &RecordClass) -> Vec<&str> {
    class.fields().iter().map(|s| s.name()).collect()
}

#[test]
fn most_derived_spec_wins_at_first_occurrence_position() {
    let catalog = Catalog::new();
    catalog
        .define("A")
        .field(FieldSpec::string("f").length(10))
        .field(FieldSpec::generic("g"))
        .build(&catalog)
        .expect("A");
    catalog
        .define("B")
        .parent("A")
        .field(FieldSpec::string("f").length(20))
        .build(&catalog)
        .expect("B");
    let c = catalog
        .define("C")
        .parent("B")
        .field(FieldSpec::number("f"))
        .field(FieldSpec::generic("h"))
        .build(&catalog)
        .expect("C");

    assert_eq!(field_names(&c), vec!["f", "g", "h"]);
    assert_eq!(c.field("f").expect("f").type_name(), "number");
    assert!(c.has_method("f_readable"));

    let b = catalog.class("B").expect("B");
    assert_eq!(field_names(&b), vec!["f", "g"]);
    assert_eq!(b.field("f").expect("f").declared_length(), Some(20));

    // Deterministic across calls.
    assert_eq!(field_names(&c), field_names(&c));
}

#[test]
fn subclass_methods_override_and_inherit() {
    let catalog = Catalog::new();
    catalog
        .define("Item")
        .field(FieldSpec::string("name"))
        .method("label", |_, _| Ok(Value::from("item")))
        .method("kind", |_, _| Ok(Value::from("generic")))
        .build(&catalog)
        .expect("Item");
    let special = catalog
        .define("Special")
        .parent("Item")
        .method("label", |_, _| Ok(Value::from("special")))
        .build(&catalog)
        .expect("Special");

    let mut record = special.new_record(Row::new()).expect("new");
    assert_eq!(record.call("label", &[]).expect("label"), Value::from("special"));
    assert_eq!(record.call("kind", &[]).expect("kind"), Value::from("generic"));
    record.call("name", &[Value::from("widget")]).expect("set");
    assert_eq!(record.call("name", &[]).expect("get"), Value::from("widget"));
}

#[test]
fn hook_chain_runs_ancestors_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let catalog = Catalog::new();
    let (base_log, mid_log, leaf_log) = (log.clone(), log.clone(), log.clone());
    catalog
        .define("Base")
        .hook(HookEvent::PostNew, move |_| {
            base_log.lock().unwrap().push("base");
            Ok(true)
        })
        .build(&catalog)
        .expect("Base");
    catalog
        .define("Mid")
        .parent("Base")
        .hook(HookEvent::PostNew, move |_| {
            mid_log.lock().unwrap().push("mid");
            Ok(true)
        })
        .build(&catalog)
        .expect("Mid");
    let leaf = catalog
        .define("Leaf")
        .parent("Mid")
        .hook(HookEvent::PostNew, move |_| {
            leaf_log.lock().unwrap().push("leaf");
            Ok(true)
        })
        .build(&catalog)
        .expect("Leaf");

    leaf.new_record(Row::new()).expect("new");
    assert_eq!(*log.lock().unwrap(), vec!["base", "mid", "leaf"]);
    assert_eq!(leaf.own_hooks(HookEvent::PostNew).len(), 1);
    assert_eq!(leaf.hook_chain(HookEvent::PostNew).len(), 3);
}

fn media_catalog() -> (Arc<Catalog>, TableSet) {
    let catalog = Catalog::new();
    catalog
        .define("Media")
        .field(FieldSpec::new(
            "kind",
            FieldKind::SubclassName(SubclassNameField::default().map("cd", "CompactDisc")),
        ))
        .field(FieldSpec::string("title"))
        .field(FieldSpec::number("rpm"))
        .build(&catalog)
        .expect("Media");
    catalog
        .define("Vinyl")
        .parent("Media")
        .method("spins", |record, _| Ok(record.raw_value("rpm")))
        .build(&catalog)
        .expect("Vinyl");
    catalog
        .define("CompactDisc")
        .parent("Media")
        .build(&catalog)
        .expect("CompactDisc");

    let mut tables = TableSet::new(&catalog, Arc::new(MemorySource::new()));
    tables.bind("Media", "media").expect("bind");
    tables.declare_tables();
    tables.create_tables().expect("create");
    (catalog, tables)
}

#[test]
fn discriminator_is_filled_at_construction() {
    let (catalog, _tables) = media_catalog();
    let vinyl = catalog
        .class("Vinyl")
        .expect("Vinyl")
        .new_record(Row::new())
        .expect("new");
    assert_eq!(vinyl.raw_value("kind"), Value::from("Vinyl"));

    let cd = catalog
        .class("CompactDisc")
        .expect("CompactDisc")
        .new_record(Row::new())
        .expect("new");
    assert_eq!(cd.raw_value("kind"), Value::from("cd"));
}

#[test]
fn fetch_through_the_base_class_builds_subclass_records() {
    let (catalog, _tables) = media_catalog();
    let vinyl_class = catalog.class("Vinyl").expect("Vinyl");
    let mut vinyl = vinyl_class
        .new_record(row(&[("title", Value::from("Kind of Blue")), ("rpm", Value::Int(33))]))
        .expect("new");
    vinyl.save_record().expect("save");
    let mut cd = catalog
        .class("CompactDisc")
        .expect("CompactDisc")
        .new_record(row(&[("title", Value::from("Blue Train"))]))
        .expect("new");
    cd.save_record().expect("save");

    let mut all = catalog
        .class("Media")
        .expect("Media")
        .fetch_all()
        .expect("fetch")
        .into_vec();
    let classes: Vec<&str> = all.iter().map(Record::class_name).collect();
    assert_eq!(classes, vec!["Vinyl", "CompactDisc"]);
    assert_eq!(all[0].call("spins", &[]).expect("spins"), Value::Int(33));
    assert!(all[1].call("spins", &[]).unwrap_err().is_config());
}

#[test]
fn unknown_discriminator_keeps_the_fetching_class() {
    let (catalog, tables) = media_catalog();
    let table = tables.table("Media").expect("table");
    let mut raw = row(&[("kind", Value::from("Cassette")), ("title", Value::from("Ascension"))]);
    table.insert_row(&mut raw).expect("insert");

    let fetched = catalog
        .class("Media")
        .expect("Media")
        .fetch_all()
        .expect("fetch");
    assert_eq!(fetched.first().expect("row").class_name(), "Media");
}

#[test]
fn discriminator_naming_an_unrelated_class_is_ignored() {
    let (catalog, tables) = media_catalog();
    catalog
        .define("Playlist")
        .field(FieldSpec::string("name"))
        .build(&catalog)
        .expect("Playlist");
    let table = tables.table("Media").expect("table");
    let mut raw = row(&[("kind", Value::from("Playlist")), ("title", Value::from("Giant Steps"))]);
    table.insert_row(&mut raw).expect("insert");

    let fetched = catalog
        .class("Media")
        .expect("Media")
        .fetch_all()
        .expect("fetch");
    assert_eq!(fetched.first().expect("row").class_name(), "Media");
}
