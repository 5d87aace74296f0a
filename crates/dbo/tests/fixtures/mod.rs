//! Shared music-store catalog for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use dbo::prelude::*;

/// A catalog with every table created on a fresh in-memory source.
pub struct Store {
    pub catalog: Arc<Catalog>,
    pub source: Arc<MemorySource>,
    pub tables: TableSet,
}

impl Store {
    pub fn class(&self, name: &str) -> Arc<RecordClass> {
        self.catalog.class(name).expect("class registered")
    }

    /// Construct, populate and save a record.
    pub fn create(&self, class: &str, values: &[(&str, Value)]) -> Record {
        let mut record = self.class(class).new_record(Row::new()).expect("new record");
        for (name, value) in values {
            record.set(name, value.clone()).expect("set field");
        }
        record.save_record().expect("save record");
        record
    }
}

pub fn row(values: &[(&str, Value)]) -> Row {
    values
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn define_classes(catalog: &Arc<Catalog>) {
    catalog
        .define("Account")
        .field(FieldSpec::string("name").length(40).required(true))
        .build(catalog)
        .expect("Account");

    catalog
        .define("Artist")
        .field(FieldSpec::string("name").length(64).required(true))
        .field(FieldSpec::line_items("discs", "Disc", "artist").on_delete(DeletePolicy::Restrict))
        .field(FieldSpec::timestamp("created").created())
        .field(FieldSpec::timestamp("updated").updated())
        .method("display_name", |record, _args| {
            Ok(Value::from(record.get("name")?.to_text().to_uppercase()))
        })
        .build(catalog)
        .expect("Artist");

    catalog
        .define("Disc")
        .field(FieldSpec::string("title").length(80).required(true))
        .field(
            FieldSpec::foreign_key("artist", "Artist")
                .required(true)
                .forward("display_name"),
        )
        .field(FieldSpec::number("year"))
        .field(FieldSpec::currency_uspennies("price"))
        .field(FieldSpec::line_items("tracks", "Track", "disc").on_delete(DeletePolicy::Cascade))
        .build(catalog)
        .expect("Disc");

    catalog
        .define("Track")
        .field(FieldSpec::string("title").length(80))
        .field(FieldSpec::foreign_key("disc", "Disc"))
        .field(FieldSpec::number("seconds"))
        .build(catalog)
        .expect("Track");

    catalog
        .define("Order")
        .field(FieldSpec::unique_code("code"))
        .field(FieldSpec::foreign_key("account", "Account"))
        .field(FieldSpec::string("status").length(16))
        .field(FieldSpec::saved_total_uspennies("total"))
        .field(FieldSpec::julian_day("placed"))
        .field(FieldSpec::line_items("lines", "OrderLine", "order").on_delete(DeletePolicy::Cascade))
        .method("status_is_cart", |record, _args| {
            Ok(Value::Bool(record.raw_value("status").as_str() == Some("cart")))
        })
        .method("init_total", |record, _args| {
            let mut total = 0;
            for line in &record.line_items("lines", None)? {
                let quantity = line.raw_value("quantity").as_i64().unwrap_or(0);
                let price = line.raw_value("price").as_i64().unwrap_or(0);
                total += quantity * price;
            }
            Ok(Value::Int(total))
        })
        .build(catalog)
        .expect("Order");

    catalog
        .define("OrderLine")
        .field(FieldSpec::foreign_key("order", "Order").required(true))
        .field(FieldSpec::foreign_key("disc", "Disc"))
        .field(FieldSpec::number("quantity"))
        .field(FieldSpec::currency_uspennies("price"))
        .build(catalog)
        .expect("OrderLine");
}

const TABLES: &[(&str, &str)] = &[
    ("Account", "account"),
    ("Artist", "artist"),
    ("Disc", "disc"),
    ("Track", "track"),
    ("Order", "orders"),
    ("OrderLine", "order_line"),
];

/// The music store with default configuration.
pub fn store() -> Store {
    store_with(DboConfig::default())
}

/// The music store with `config`.
pub fn store_with(config: DboConfig) -> Store {
    let catalog = Catalog::with_config(config);
    define_classes(&catalog);

    let source = Arc::new(MemorySource::new());
    let mut tables = TableSet::new(&catalog, source.clone());
    for (class, table) in TABLES {
        tables.bind(class, table).expect("bind table");
    }
    tables.declare_tables();
    tables.create_tables().expect("create tables");

    Store {
        catalog,
        source,
        tables,
    }
}
