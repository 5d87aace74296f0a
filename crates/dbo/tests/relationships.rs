//! Foreign keys, line items and delete policies.

mod fixtures;

use std::sync::Arc;

use dbo::prelude::*;
use dbo::MethodResult;
use fixtures::{Store, row, store};

fn artist_with_discs(store: &Store, discs: &[&str]) -> Record {
    let artist = store.create("Artist", &[("name", Value::from("Sonny Rollins"))]);
    for title in discs {
        let mut disc = artist
            .new_line_item("discs", Row::new())
            .expect("new disc");
        disc.set("title", *title).expect("title");
        disc.save_record().expect("save disc");
    }
    artist
}

#[test]
fn line_items_count_and_fetch_related_records() {
    let store = store();
    let mut artist = artist_with_discs(&store, &["Saxophone Colossus", "Way Out West"]);

    assert_eq!(artist.count_line_items("discs", None).expect("count"), 2);
    assert_eq!(artist.call("count_discs", &[]).expect("count"), Value::Int(2));

    let discs = artist.line_items("discs", None).expect("discs");
    let titles: Vec<Value> = discs.iter().map(|d| d.raw_value("title")).collect();
    assert_eq!(
        titles,
        vec![Value::from("Saxophone Colossus"), Value::from("Way Out West")]
    );

    let narrowed = artist
        .line_items("discs", Some(&Criteria::eq("title", "Way Out West")))
        .expect("narrowed");
    assert_eq!(narrowed.len(), 1);
}

#[test]
fn new_line_item_is_transient_and_pre_linked() {
    let store = store();
    let artist = store.create("Artist", &[("name", Value::from("Dexter Gordon"))]);
    let disc = artist.new_line_item("discs", Row::new()).expect("new disc");

    assert!(!disc.has_id());
    assert_eq!(disc.raw("artist_id"), artist.id());
    assert_eq!(disc.class_name(), "Disc");
}

#[test]
fn line_items_of_an_unsaved_owner_are_empty() {
    let store = store();
    let artist = store.class("Artist").new_record(Row::new()).expect("new");
    assert!(artist.line_items("discs", None).expect("items").is_empty());
    assert_eq!(artist.count_line_items("discs", None).expect("count"), 0);
    assert!(matches!(
        artist.new_line_item("discs", Row::new()),
        Err(Error::InvalidState { .. })
    ));
}

#[test]
fn restrict_vetoes_delete_until_items_are_gone() {
    let store = store();
    let mut artist = artist_with_discs(&store, &["Tenor Madness"]);

    assert!(!artist.delete_record().expect("vetoed"));
    assert_eq!(store.source.row_count("artist"), 1);

    assert_eq!(artist.delete_line_items("discs").expect("delete discs"), 1);
    assert_eq!(artist.count_line_items("discs", None).expect("count"), 0);
    assert!(artist.delete_record().expect("delete"));
    assert_eq!(store.source.row_count("artist"), 0);
}

#[test]
fn cascade_deletes_items_through_their_own_lifecycle() {
    let store = store();
    let artist = artist_with_discs(&store, &["Night Train"]);
    let mut disc = artist
        .line_items("discs", None)
        .expect("discs")
        .into_iter()
        .next()
        .expect("one disc");
    for title in ["C Jam Blues", "Band Call"] {
        let mut track = disc.new_line_item("tracks", Row::new()).expect("track");
        track.set("title", title).expect("title");
        track.save_record().expect("save track");
    }
    assert_eq!(store.source.row_count("track"), 2);

    assert!(disc.delete_record().expect("delete disc"));
    assert_eq!(store.source.row_count("track"), 0);
    assert_eq!(store.source.row_count("disc"), 0);
}

#[test]
fn foreign_key_resolves_and_reports_missing_rows() {
    let store = store();
    let account = store.create("Account", &[("name", Value::from("Blue Note"))]);

    let mut order = store.class("Order").new_record(Row::new()).expect("order");
    assert!(order.related("account").expect("related").is_none());
    let err = order.required_related("account").unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Order.account"));

    order.set_related("account", Some(&account)).expect("link");
    assert_eq!(order.raw("account_id"), account.id());
    let resolved = order.required_related("account").expect("resolved");
    assert_eq!(resolved.raw_value("name"), Value::from("Blue Note"));

    match order.invoke("account", &[]).expect("invoke") {
        MethodResult::Record(Some(found)) => assert_eq!(found.id(), account.id()),
        other => panic!("unexpected {other:?}"),
    }

    order.set_related("account", None).expect("unlink");
    assert!(order.related("account").expect("related").is_none());
}

#[test]
fn required_related_failure_names_field_and_record_id() {
    let store = store();
    store.create("Order", &[]);
    let order = store.create("Order", &[("status", Value::from("cart"))]);
    let id = order.id().cloned().expect("saved");
    assert_eq!(id, Value::Int(2));

    let err = order.required_related("account").unwrap_err();
    assert!(err.is_not_found());
    let message = err.to_string();
    assert!(message.contains("Order.account"), "{message}");
    assert!(message.contains("record 2"), "{message}");
}

#[test]
fn dangling_foreign_key_is_invalid_but_not_fatal() {
    let store = store();
    let mut order = store.class("Order").new_record(Row::new()).expect("order");
    order.call("account_id", &[Value::Int(99)]).expect("set id");

    assert!(order.related("account").expect("related").is_none());
    let diag = order.invalid("account").expect("check").expect("diagnostic");
    assert_eq!(diag.field, "account");
    assert!(diag.message.contains("Account"));
    let err = order.required_related("account").unwrap_err();
    assert!(err.to_string().contains("99"));
}

#[test]
fn required_foreign_key_flags_unset_value() {
    let store = store();
    let disc = store.class("Disc").new_record(Row::new()).expect("disc");
    let diag = disc.invalid("artist").expect("check").expect("diagnostic");
    assert_eq!(diag.message, "artist is required");
}

#[test]
fn forwarded_method_runs_on_the_related_record() {
    let store = store();
    let artist = artist_with_discs(&store, &["The Bridge"]);
    let mut disc = artist
        .line_items("discs", None)
        .expect("discs")
        .into_iter()
        .next()
        .expect("disc");

    assert_eq!(
        disc.call("display_name", &[]).expect("forward"),
        Value::from("SONNY ROLLINS")
    );

    let mut orphan = store.class("Disc").new_record(Row::new()).expect("orphan");
    assert_eq!(orphan.call("display_name", &[]).expect("forward"), Value::Null);
}

#[test]
fn vetoed_delete_keeps_cascaded_items() {
    let catalog = Catalog::new();
    catalog
        .define("Crate")
        .field(FieldSpec::string("label"))
        .field(FieldSpec::line_items("records", "Vinyl", "bin").on_delete(DeletePolicy::Cascade))
        .hook(HookEvent::PreDelete, |record| {
            Ok(record.raw_value("label").as_str() != Some("keep"))
        })
        .build(&catalog)
        .expect("Crate");
    catalog
        .define("Vinyl")
        .field(FieldSpec::string("title"))
        .field(FieldSpec::foreign_key("bin", "Crate"))
        .build(&catalog)
        .expect("Vinyl");

    let source = Arc::new(MemorySource::new());
    let mut tables = TableSet::new(&catalog, source.clone());
    tables.bind("Crate", "crate").expect("bind");
    tables.bind("Vinyl", "vinyl").expect("bind");
    tables.declare_tables();
    tables.create_tables().expect("create");

    let mut bin = catalog
        .class("Crate")
        .expect("Crate")
        .new_record(row(&[("label", Value::from("keep"))]))
        .expect("new");
    bin.save_record().expect("save");
    for title in ["Mingus Ah Um", "Blues and Roots"] {
        let mut item = bin.new_line_item("records", Row::new()).expect("item");
        item.set("title", title).expect("title");
        item.save_record().expect("save item");
    }

    assert!(!bin.delete_record().expect("vetoed"));
    assert_eq!(source.row_count("vinyl"), 2);
    assert_eq!(source.row_count("crate"), 1);

    bin.set("label", "discard").expect("label");
    assert!(bin.delete_record().expect("delete"));
    assert_eq!(source.row_count("vinyl"), 0);
    assert_eq!(source.row_count("crate"), 0);
}
