//! Arrow schema definitions for the harvested tables

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema};

/// `<stem>_types_part_NNN.parquet` — one row per entity record scanned
pub fn types() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("openaire_id", DataType::Utf8, false),
            Field::new("openaire_type", DataType::Utf8, false),
            Field::new("origin_shard", DataType::Utf8, false),
            Field::new("origin_member", DataType::Utf8, false),
        ]))
    });
    &SCHEMA
}

/// `<stem>_dois_part_NNN.parquet` — one row per (entity, doi) pair
pub fn dois() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("openaire_id", DataType::Utf8, false),
            Field::new("doi", DataType::Utf8, false),
        ]))
    });
    &SCHEMA
}
