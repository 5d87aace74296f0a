//! Behavior of the scalar, temporal, currency, total and alias field kinds.

mod fixtures;

use std::sync::Arc;

use dbo::prelude::*;
use dbo::{Column, ColumnSet, ColumnType, DataSource};
use fixtures::store;

#[test]
fn string_longer_than_its_length_is_invalid() {
    let store = store();
    let mut account = store.class("Account").new_record(Row::new()).expect("new");
    account.set("name", "x".repeat(41)).expect("set");

    let diag = account.invalid("name").expect("check").expect("diagnostic");
    assert_eq!(diag.field, "name");
    assert_eq!(diag.message, "name must be at most 40 characters long (got 41)");

    account.set("name", "x".repeat(40)).expect("set");
    assert!(account.invalid("name").expect("check").is_none());
}

#[test]
fn required_string_reports_empty_value() {
    let store = store();
    let account = store.class("Account").new_record(Row::new()).expect("new");
    let problems = account.validate().expect("validate");
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].to_string(), "name: name is required");
}

#[test]
fn string_coerces_non_text_input() {
    let store = store();
    let mut account = store.class("Account").new_record(Row::new()).expect("new");
    account.set("name", 42).expect("set");
    assert_eq!(account.raw_value("name"), Value::from("42"));
}

#[test]
fn number_coerces_numeric_text_and_flags_the_rest() {
    let store = store();
    let mut disc = store.class("Disc").new_record(Row::new()).expect("new");

    disc.set("year", "2001").expect("set");
    assert_eq!(disc.raw_value("year"), Value::Int(2001));
    assert!(disc.invalid("year").expect("check").is_none());

    disc.set("year", "abc").expect("set");
    assert_eq!(disc.raw_value("year"), Value::from("abc"));
    let diag = disc.invalid("year").expect("check").expect("diagnostic");
    assert_eq!(diag.message, "year must be a number (got 'abc')");
}

#[test]
fn number_readable_groups_digits() {
    let store = store();
    let mut track = store.class("Track").new_record(Row::new()).expect("new");
    track.set("seconds", 1_234_567).expect("set");
    assert_eq!(track.readable("seconds", None).expect("readable"), "1,234,567");
}

#[test]
fn currency_parses_dollars_and_displays_pennies() {
    let store = store();
    let mut disc = store.class("Disc").new_record(Row::new()).expect("new");

    disc.set("price", "$12.99").expect("set");
    assert_eq!(disc.raw_value("price"), Value::Int(1299));
    assert_eq!(disc.readable("price", None).expect("readable"), "$12.99");

    disc.set("price", 150_000).expect("set");
    assert_eq!(
        disc.call("price_readable", &[]).expect("readable"),
        Value::from("$1,500.00")
    );

    disc.call("price_readable", &[Value::from("7.5")]).expect("parse");
    assert_eq!(disc.raw_value("price"), Value::Int(750));

    disc.set("price", "$lots").expect("set");
    assert!(disc.invalid("price").expect("check").is_some());
}

#[test]
fn julian_day_accepts_human_dates() {
    let store = store();
    let mut order = store.class("Order").new_record(Row::new()).expect("new");

    order.set("placed", "2000-01-01").expect("set");
    assert_eq!(order.raw_value("placed"), Value::Int(2_451_545));
    assert_eq!(order.readable("placed", None).expect("readable"), "2000-01-01");
    assert_eq!(
        order
            .call("placed_readable", &[Value::from("%d %B %Y")])
            .expect("formatted"),
        Value::from("01 January 2000")
    );

    order.set("placed", "sometime").expect("set");
    assert!(order.invalid("placed").expect("check").is_some());
}

#[test]
fn out_of_range_julian_day_has_no_display_form() {
    let store = store();
    let mut order = store.class("Order").new_record(Row::new()).expect("new");
    order.set("placed", i64::MIN).expect("set");
    assert_eq!(order.readable("placed", None).expect("readable"), "");
    assert!(order.temporal("placed").expect("temporal").is_none());
}

#[test]
fn touch_sets_timestamp_to_now() {
    let store = store();
    let mut artist = store.class("Artist").new_record(Row::new()).expect("new");
    artist.set("updated", Value::Null).expect("clear");
    artist.call("touch_updated", &[]).expect("touch");
    let touched = artist.temporal("updated").expect("temporal").expect("set");
    let now = chrono::Utc::now().naive_utc();
    assert!((now - touched).num_seconds().abs() < 60);
}

#[test]
fn saved_total_recomputes_only_while_in_cart() {
    let store = store();
    let mut order = store.create("Order", &[("status", Value::from("cart"))]);
    for (quantity, price) in [(2, 1000), (1, 550)] {
        let mut line = order.new_line_item("lines", Row::new()).expect("line");
        line.set("quantity", quantity).expect("quantity");
        line.set("price", price).expect("price");
        line.save_record().expect("save line");
    }

    assert_eq!(order.get("total").expect("total"), Value::Int(2550));

    order.set("status", "paid").expect("status");
    order.save_record().expect("save order");

    let mut extra = order.new_line_item("lines", Row::new()).expect("line");
    extra.set("quantity", 1).expect("quantity");
    extra.set("price", 100).expect("price");
    extra.save_record().expect("save line");

    // Frozen once out of the cart.
    assert_eq!(order.get("total").expect("total"), Value::Int(2550));
    assert_eq!(
        order.total_difference("total").expect("difference"),
        Value::Int(100)
    );
    assert_eq!(order.raw_value("total"), Value::Int(2550));

    assert_eq!(order.call("reset_total", &[]).expect("reset"), Value::Int(2650));
    assert_eq!(order.get("total").expect("total"), Value::Int(2650));
}

#[test]
fn saved_total_requires_its_init_method() {
    let catalog = Catalog::new();
    let err = catalog
        .define("Cart")
        .field(FieldSpec::saved_total("total"))
        .build(&catalog)
        .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("init_total"));
}

#[test]
fn alias_delegates_reads_and_writes() {
    let catalog = Catalog::new();
    let class = catalog
        .define("Person")
        .field(FieldSpec::string("name"))
        .field(FieldSpec::alias("full_name", "name"))
        .build(&catalog)
        .expect("build");

    let mut person = class.new_record(Row::new()).expect("new");
    person.set("full_name", "Charles Mingus").expect("set through alias");
    assert_eq!(person.raw_value("name"), Value::from("Charles Mingus"));
    assert_eq!(person.get("full_name").expect("get"), Value::from("Charles Mingus"));
    assert!(!class.field_columns("person").contains("full_name"));
}

#[test]
fn unspecified_limits_come_from_the_existing_table() {
    let source = Arc::new(MemorySource::new());
    source
        .create_table(
            "label",
            &ColumnSet::from_columns(
                "label",
                vec![
                    Column::new("id", ColumnType::Int).primary_key(),
                    Column::new("name", ColumnType::Text).length(5).required(true),
                ],
            ),
        )
        .expect("create");

    let catalog = Catalog::new();
    let class = catalog
        .define("Label")
        .field(FieldSpec::string("name"))
        .build(&catalog)
        .expect("build");

    // No table bound yet: defaults apply and nothing is cached.
    let mut label = class.new_record(Row::new()).expect("new");
    assert!(label.invalid("name").expect("check").is_none());

    class.bind_table(Arc::new(Table::new("label", source.clone())));
    let diag = label.invalid("name").expect("check").expect("required");
    assert_eq!(diag.message, "name is required");

    label.set("name", "Impulse!").expect("set");
    let diag = label.invalid("name").expect("check").expect("too long");
    assert_eq!(diag.message, "name must be at most 5 characters long (got 8)");
}

#[test]
fn unknown_field_and_method_are_configuration_errors() {
    let store = store();
    let mut account = store.create("Account", &[("name", Value::from("ACME"))]);
    assert!(account.invalid("nope").unwrap_err().is_config());
    assert!(account.invoke("nope", &[]).unwrap_err().is_config());
    assert!(account.touch("name").unwrap_err().is_config());

    // Non-field names are stored as ad hoc values.
    account.set("note", "scratch").expect("ad hoc");
    assert_eq!(account.get("note").expect("get"), Value::from("scratch"));
}
